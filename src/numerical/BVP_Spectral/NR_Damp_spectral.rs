//! Damped Newton iteration in function space.
//!
//! Every iteration linearizes the operator at the iterate and solves the correction δ with the
//! spectral linear solver. With damping on, a trial factor λ starts at 1 and the simplified
//! Newton step at `u + λδ` (same linear operator, new residual) is computed; λ is accepted when
//! that step is shorter than `λδ` or already converged, otherwise λ is divided by
//! `2^(k + damp_factor)`. The error estimate is `||λδ|| / max(1, ||u||)`.
use crate::numerical::BVP_Spectral::display::{IterationReport, ProgressObserver};
use crate::numerical::BVP_Spectral::linear_solver::solve_linear;
use crate::numerical::BVP_Spectral::linearize::{LinearOperator, Linearization};
use crate::numerical::chebfun::Chebfun;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::Preferences;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::time::Instant;
use strum_macros::Display;
use tabled::{builder::Builder, settings::Style};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TerminationReason {
    Converged,
    MaxIterations,
    NoDampingFound,
}

/// one entry per Newton iteration, in order
#[derive(Debug, Clone, Default)]
pub struct NewtonHistory {
    pub update_norms: Vec<f64>,
    pub error_estimates: Vec<f64>,
    pub damping: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct NewtonResult {
    pub solution: Vec<Chebfun>,
    pub history: NewtonHistory,
    pub iterations: usize,
    pub converged: bool,
    pub termination: TerminationReason,
    pub residual_norm: f64,
    pub error_estimate: f64,
    pub dimension: usize,
    pub warnings: Vec<String>,
}

pub fn norm(fs: &[Chebfun]) -> f64 {
    fs.iter().map(|f| f.norm2().powi(2)).sum::<f64>().sqrt()
}

/// u + lambda * delta
pub fn axpy(u: &[Chebfun], lambda: f64, delta: &[Chebfun]) -> Vec<Chebfun> {
    u.iter()
        .zip(delta.iter())
        .map(|(ui, di)| (ui + &(di * lambda)).simplify())
        .collect()
}

pub struct SpectralNewton<'a> {
    lin: &'a Linearization,
    rhs: &'a [Chebfun],
    prefs: &'a Preferences,
    observer: &'a mut dyn ProgressObserver,
    pub y: Vec<Chebfun>,
    pub history: NewtonHistory,
    dimension: usize,
    warnings: Vec<String>,
    calc_statistics: HashMap<String, usize>,
}

impl<'a> SpectralNewton<'a> {
    pub fn new(
        lin: &'a Linearization,
        rhs: &'a [Chebfun],
        prefs: &'a Preferences,
        observer: &'a mut dyn ProgressObserver,
        initial_guess: Vec<Chebfun>,
    ) -> Self {
        SpectralNewton {
            lin,
            rhs,
            prefs,
            observer,
            y: initial_guess,
            history: NewtonHistory::default(),
            dimension: 0,
            warnings: Vec::new(),
            calc_statistics: HashMap::new(),
        }
    }

    /// Newton correction at `y` with the linear operator `op`; also returns the residual norm at `y`
    pub fn step(&mut self, op: &LinearOperator, y: &[Chebfun]) -> SolveResult<(Vec<Chebfun>, f64)> {
        let residual = self.lin.residual(y, self.rhs)?;
        let residual_norm = residual.norm();
        let rhs: Vec<Chebfun> = residual.interior.into_iter().map(|r| -r).collect();
        let bc_values: Vec<f64> = residual.boundary.iter().map(|g| -g).collect();
        let sol = solve_linear(op, &rhs, &bc_values, self.prefs, norm(y))?;
        *self
            .calc_statistics
            .entry("number of solving linear systems".to_string())
            .or_insert(0) += 1;
        if !sol.resolved {
            let msg = format!("Newton correction not resolved with {} points", sol.dimension);
            if !self.warnings.contains(&msg) {
                self.warnings.push(msg);
            }
        }
        self.dimension = sol.dimension;
        Ok((sol.components, residual_norm))
    }

    /// returns the accepted factor and the new iterate, None when no factor was found
    pub fn damped_step(
        &mut self,
        op: &LinearOperator,
        delta: &[Chebfun],
    ) -> SolveResult<Option<(f64, Vec<Chebfun>)>> {
        let mut lambda = 1.0;
        for k in 0..self.prefs.max_damp_iter {
            if k > 0 {
                info!("damped step number {}, damping coefficient = {}", k, lambda);
            }
            let step_norm = lambda * norm(delta);
            let trial = axpy(&self.y, lambda, delta);
            // simplified Newton step: frozen linear operator, residual at the trial point
            let next_norm = match self.step(op, &trial) {
                Ok((next, _)) => norm(&next),
                // the trial left the domain of the operator (e.g. ln of a negative value)
                Err(SolveError::SingularSystem(msg)) => {
                    debug!("trial point rejected: {}", msg);
                    f64::INFINITY
                }
                Err(e) => return Err(e),
            };
            let converged = next_norm / norm(&trial).max(1.0) < self.prefs.error_tolerance;
            if next_norm < step_norm || converged {
                info!(
                    "damping coefficient {} found (next step norm {:.3e}, damped step norm {:.3e})",
                    lambda, next_norm, step_norm
                );
                return Ok(Some((lambda, trial)));
            }
            lambda /= 2f64.powf(k as f64 + self.prefs.damp_factor);
        }
        warn!("no damping coefficient found (max damping iterations reached)");
        Ok(None)
    }

    pub fn main_loop(&mut self) -> SolveResult<NewtonResult> {
        info!("solving the boundary value problem with damped Newton iteration");
        let begin = Instant::now();
        let tol = self.prefs.error_tolerance;
        let mut termination = TerminationReason::MaxIterations;
        let mut iterations = 0;
        let mut best: Option<(f64, Vec<Chebfun>)> = None;
        for it in 1..=self.prefs.max_iterations {
            iterations = it;
            self.observer.on_iteration_start(it, &self.y);
            let op = self.lin.linear_operator(&self.y)?;
            *self
                .calc_statistics
                .entry("number of linearizations".to_string())
                .or_insert(0) += 1;
            let y_current = self.y.clone();
            let (delta, residual_norm) = self.step(&op, &y_current)?;
            if best.as_ref().is_none_or(|(r, _)| residual_norm < *r) {
                best = Some((residual_norm, y_current));
            }
            let (lambda, new_y) = if self.prefs.damped {
                match self.damped_step(&op, &delta)? {
                    Some(accepted) => accepted,
                    None => {
                        termination = TerminationReason::NoDampingFound;
                        break;
                    }
                }
            } else {
                (1.0, axpy(&self.y, 1.0, &delta))
            };
            let update_norm = lambda * norm(&delta);
            let error_estimate = update_norm / norm(&new_y).max(1.0);
            self.history.update_norms.push(update_norm);
            self.history.error_estimates.push(error_estimate);
            self.history.damping.push(lambda);
            self.y = new_y;
            self.observer.on_iteration_end(&IterationReport {
                iteration: it,
                iterate: &self.y,
                update_norm,
                error_estimate,
                lambda,
                residual_norm,
                dimension: self.dimension,
            });
            if error_estimate < tol || residual_norm < tol {
                info!("solution has converged after {} iterations", it);
                termination = TerminationReason::Converged;
                break;
            }
        }
        let final_residual = self.lin.residual(&self.y, self.rhs)?.norm();
        let converged = termination == TerminationReason::Converged;
        let mut residual_norm = final_residual;
        if !converged {
            let msg = match termination {
                TerminationReason::NoDampingFound => {
                    "Newton iteration stopped: no damping coefficient found".to_string()
                }
                _ => format!(
                    "Newton iteration did not converge in {} iterations",
                    self.prefs.max_iterations
                ),
            };
            warn!("{}", msg);
            self.warnings.push(msg);
            if let Some((r, y)) = best {
                if r < final_residual {
                    self.y = y;
                    residual_norm = r;
                }
            }
        }
        *self
            .calc_statistics
            .entry("number of iterations".to_string())
            .or_insert(0) = iterations;
        info!("Newton iteration took {} ms", begin.elapsed().as_millis());
        self.calc_statistics();
        Ok(NewtonResult {
            solution: self.y.clone(),
            history: self.history.clone(),
            iterations,
            converged,
            termination,
            residual_norm,
            // no accepted step: nothing bounds the error
            error_estimate: self
                .history
                .error_estimates
                .last()
                .copied()
                .unwrap_or(f64::INFINITY),
            dimension: self.dimension,
            warnings: self.warnings.clone(),
        })
    }

    fn calc_statistics(&self) {
        let mut stats = self.calc_statistics.clone();
        stats.insert("number of unknowns".to_string(), self.y.len());
        stats.insert("final discretization size".to_string(), self.dimension);
        let mut table = Builder::from(stats).build();
        table.with(Style::modern_rounded());
        info!("\n CALC STATISTICS \n {}", table.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::BVP_Spectral::chebop::Chebop;
    use crate::numerical::BVP_Spectral::display::NoDisplay;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm_and_axpy() {
        let d = (0.0, 2.0);
        let u = vec![Chebfun::constant(1.0, d), Chebfun::identity(d)];
        let du = vec![Chebfun::constant(2.0, d), Chebfun::constant(-1.0, d)];
        let w = axpy(&u, 0.5, &du);
        assert_relative_eq!(w[0].eval(1.3), 2.0, epsilon = 1e-14);
        assert_relative_eq!(w[1].eval(1.3), 0.8, epsilon = 1e-14);
        let one = vec![Chebfun::constant(1.0, d)];
        assert_relative_eq!(norm(&one), one[0].norm2());
    }

    #[test]
    fn test_main_loop_from_boundary_consistent_start() {
        // u'' - u^2 = 2 - x^4 has u = x^2
        let d = (0.0, 1.0);
        let op = Chebop::new(d, "(x, u) -> u'' - u^2")
            .unwrap()
            .with_lbc("u")
            .with_rbc("u - 1");
        let lin = Linearization::new(&op.resolve().unwrap()).unwrap();
        let rhs = vec![Chebfun::from_fn(|x| 2.0 - x.powi(4), d)];
        let prefs = Preferences::default();
        let mut observer = NoDisplay;
        let mut newton = SpectralNewton::new(&lin, &rhs, &prefs, &mut observer, vec![Chebfun::identity(d)]);
        let result = newton.main_loop().unwrap();
        assert!(result.converged);
        assert_eq!(result.termination, TerminationReason::Converged);
        assert_eq!(result.history.update_norms.len(), result.iterations);
        assert_relative_eq!(result.solution[0].eval(0.5), 0.25, epsilon = 1e-9);
        assert!(result.dimension >= prefs.min_dimension);
    }

    #[test]
    fn test_failed_damping_on_first_iteration() {
        let d = (0.0, 1.0);
        let op = Chebop::new(d, "(x, u) -> u'' - u^2")
            .unwrap()
            .with_lbc("u")
            .with_rbc("u - 1");
        let lin = Linearization::new(&op.resolve().unwrap()).unwrap();
        let rhs = vec![Chebfun::from_fn(|x| 2.0 - x.powi(4), d)];
        let prefs = Preferences {
            max_damp_iter: 0,
            ..Default::default()
        };
        let mut observer = NoDisplay;
        let mut newton = SpectralNewton::new(&lin, &rhs, &prefs, &mut observer, vec![Chebfun::identity(d)]);
        let result = newton.main_loop().unwrap();
        assert_eq!(result.termination, TerminationReason::NoDampingFound);
        assert!(!result.converged);
        assert!(result.history.error_estimates.is_empty());
        assert_eq!(result.error_estimate, f64::INFINITY);
        assert!(result.residual_norm.is_finite());
        assert!(!result.warnings.is_empty());
    }
}
