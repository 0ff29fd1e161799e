//! # solvebvp
//!
//! Entry point of the spectral boundary value solver. The operator is either a 1-D `Chebop`
//! (ordinary differential system with point conditions) or a 2-D `Chebop2` (linear PDE on a
//! rectangle). For the 1-D case the operator is resolved into a working copy, linearized about
//! the initial guess and then
//! - solved with one correction step when the operator and every condition are linear,
//! - otherwise solved by damped Newton iteration, started from a guess that satisfies the
//!   linearized boundary conditions when the caller gave none.
//!
//! The 2-D case goes to the low rank / matrix equation pipeline of `Chebop2`.
use crate::Utils::logger::init_logger;
use crate::numerical::BVP_Spectral::NR_Damp_spectral::{SpectralNewton, TerminationReason, norm};
use crate::numerical::BVP_Spectral::chebop::Chebop;
use crate::numerical::BVP_Spectral::display::ProgressObserver;
use crate::numerical::BVP_Spectral::linear_solver::solve_linear;
use crate::numerical::BVP_Spectral::linearize::{LinearityFlags, Linearization};
use crate::numerical::Chebop2::chebop2_operator::Chebop2;
use crate::numerical::Chebop2::construct_discretisation::{Chebop2Info, solve_pde};
use crate::numerical::chebfun::Chebfun;
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::Preferences;
use log::{info, warn};
use nalgebra::DMatrix;
use std::time::Instant;

pub enum BvpOperator<'a> {
    Ode(&'a Chebop),
    Pde(&'a Chebop2),
}

#[derive(Debug, Clone)]
pub enum Rhs {
    Zero,
    /// constants, one per equation
    Numeric(DMatrix<f64>),
    Function(Chebfun),
    Composite(Vec<Chebfun>),
    Field(Chebfun2),
}

#[derive(Debug, Clone)]
pub enum Solution {
    Single(Chebfun),
    Composite(Vec<Chebfun>),
    Field(Chebfun2),
}

impl Solution {
    /// the 1-D components, empty for a 2-D solution
    pub fn components(&self) -> Vec<Chebfun> {
        match self {
            Solution::Single(u) => vec![u.clone()],
            Solution::Composite(us) => us.clone(),
            Solution::Field(_) => Vec::new(),
        }
    }

    pub fn as_single(&self) -> Option<&Chebfun> {
        match self {
            Solution::Single(u) => Some(u),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Chebfun2> {
        match self {
            Solution::Field(u) => Some(u),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SolveInfo {
    pub flags: LinearityFlags,
    pub residual_norm: f64,
    pub error_estimate: f64,
    pub update_norms: Vec<f64>,
    pub error_estimates: Vec<f64>,
    pub damping: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
    /// None for problems solved without Newton iteration
    pub termination: Option<TerminationReason>,
    pub dimension: usize,
    pub num_vars: usize,
    pub warnings: Vec<String>,
    pub pde: Option<Chebop2Info>,
}

/// Right hand side as one function per equation. A numeric rhs must be a column of length
/// `num_eqs`; a row of that length is accepted after transposition.
pub fn rhs_components(
    rhs: &Rhs,
    num_eqs: usize,
    domain: (f64, f64),
    warnings: &mut Vec<String>,
) -> SolveResult<Vec<Chebfun>> {
    let mismatch = |found: (usize, usize)| SolveError::DimensionMismatch {
        what: "right hand side".to_string(),
        expected: (num_eqs, 1),
        found,
    };
    match rhs {
        Rhs::Zero => Ok(vec![Chebfun::zeros(domain); num_eqs]),
        Rhs::Numeric(m) => {
            let column = if m.shape() == (num_eqs, 1) {
                m.clone()
            } else if m.shape() == (1, num_eqs) {
                let msg = format!(
                    "right hand side of shape 1x{} transposed to {}x1",
                    num_eqs, num_eqs
                );
                warn!("{}", msg);
                warnings.push(msg);
                m.transpose()
            } else {
                return Err(mismatch(m.shape()));
            };
            Ok(column
                .iter()
                .map(|&c| Chebfun::constant(c, domain))
                .collect())
        }
        Rhs::Function(f) => {
            if num_eqs != 1 {
                return Err(mismatch((1, 1)));
            }
            Ok(vec![f.clone()])
        }
        Rhs::Composite(fs) => {
            if fs.len() != num_eqs {
                return Err(mismatch((fs.len(), 1)));
            }
            Ok(fs.clone())
        }
        Rhs::Field(f) => Err(mismatch(f.size())),
    }
}

fn pde_rhs(rhs: &Rhs, domain: [f64; 4]) -> SolveResult<Chebfun2> {
    match rhs {
        Rhs::Zero => Ok(Chebfun2::zeros(domain)),
        Rhs::Numeric(m) if m.shape() == (1, 1) => Ok(Chebfun2::constant(m[(0, 0)], domain)),
        Rhs::Field(f) => Ok(f.clone()),
        Rhs::Numeric(m) => Err(SolveError::DimensionMismatch {
            what: "right hand side of a PDE".to_string(),
            expected: (1, 1),
            found: m.shape(),
        }),
        Rhs::Function(_) | Rhs::Composite(_) => Err(SolveError::DimensionMismatch {
            what: "right hand side of a PDE".to_string(),
            expected: (1, 1),
            found: (0, 0),
        }),
    }
}

fn wrap(mut components: Vec<Chebfun>) -> Solution {
    if components.len() == 1 {
        Solution::Single(components.remove(0))
    } else {
        Solution::Composite(components)
    }
}

/// A start satisfying the boundary conditions: `u^(K_j) = 0` with the conditions linearized
/// about zero. Only the boundary functionals are evaluated at zero, so an operator singular
/// there (`ln(u)`, `1/u`) still gets a start. Falls back to zero when that problem cannot be
/// solved.
fn bc_consistent_start(lin: &Linearization, zero: Vec<Chebfun>, prefs: &Preferences) -> Vec<Chebfun> {
    let attempt = || -> SolveResult<Vec<Chebfun>> {
        let op = lin.highest_derivative_operator(&zero)?;
        let bc_values: Vec<f64> = lin.boundary_residual(&zero)?.iter().map(|g| -g).collect();
        let interior = vec![Chebfun::zeros(lin.domain); op.coeffs.len()];
        Ok(solve_linear(&op, &interior, &bc_values, prefs, 1.0)?.components)
    };
    match attempt() {
        Ok(start) => start,
        Err(e) => {
            warn!("no boundary consistent start ({}), starting from zero", e);
            zero
        }
    }
}

pub fn solve(
    op: BvpOperator,
    rhs: &Rhs,
    prefs: &Preferences,
    observer: &mut dyn ProgressObserver,
) -> SolveResult<(Solution, SolveInfo)> {
    if prefs.log_level.is_some() {
        init_logger(prefs.log_level.as_deref(), false)?;
    }
    prefs.check()?;
    match op {
        BvpOperator::Ode(chebop) => solve_ode(chebop, rhs, prefs, observer),
        BvpOperator::Pde(chebop2) => {
            let f = pde_rhs(rhs, chebop2.domain)?;
            let (u, pde_info) = solve_pde(chebop2, &f, prefs)?;
            let info = SolveInfo {
                flags: LinearityFlags {
                    op: true,
                    lbc: true,
                    rbc: true,
                    bc: true,
                    all: true,
                },
                converged: pde_info.resolved,
                dimension: pde_info.size.0.max(pde_info.size.1),
                num_vars: 1,
                warnings: pde_info.warnings.clone(),
                pde: Some(pde_info),
                ..Default::default()
            };
            Ok((Solution::Field(u), info))
        }
    }
}

fn solve_ode(
    chebop: &Chebop,
    rhs: &Rhs,
    prefs: &Preferences,
    observer: &mut dyn ProgressObserver,
) -> SolveResult<(Solution, SolveInfo)> {
    let begin = Instant::now();
    let resolved = chebop.resolve()?;
    let mut info = SolveInfo {
        num_vars: resolved.num_vars(),
        warnings: resolved.warnings.clone(),
        ..Default::default()
    };
    let lin = Linearization::new(&resolved)?;
    info.flags = lin.flags;
    let f = rhs_components(rhs, resolved.num_eqs(), resolved.domain, &mut info.warnings)?;

    let zero = vec![Chebfun::zeros(resolved.domain); resolved.num_vars()];
    let u0 = match &chebop.init {
        Some(init) => {
            if init.len() != resolved.num_vars() {
                return Err(SolveError::DimensionMismatch {
                    what: "initial guess".to_string(),
                    expected: (resolved.num_vars(), 1),
                    found: (init.len(), 1),
                });
            }
            init.clone()
        }
        None => zero.clone(),
    };

    if lin.flags.all {
        info!("operator and conditions are linear, solving with a single correction");
        let l = lin.linear_operator(&u0)?;
        let residual = lin.residual(&u0, &f)?;
        let interior: Vec<Chebfun> = residual.interior.into_iter().map(|r| -r).collect();
        let bc_values: Vec<f64> = residual.boundary.iter().map(|g| -g).collect();
        let sol = solve_linear(&l, &interior, &bc_values, prefs, norm(&u0))?;
        if !sol.resolved {
            info.warnings
                .push(format!("solution not resolved with {} points", sol.dimension));
        }
        let u: Vec<Chebfun> = u0
            .iter()
            .zip(sol.components.iter())
            .map(|(a, d)| (a + d).simplify())
            .collect();
        info.residual_norm = lin.residual(&u, &f)?.norm();
        info.dimension = sol.dimension;
        info.converged = sol.resolved;
        info!("linear problem solved in {} ms", begin.elapsed().as_millis());
        return Ok((wrap(u), info));
    }

    let start = if chebop.init.is_none() {
        bc_consistent_start(&lin, u0, prefs)
    } else {
        u0
    };
    let mut newton = SpectralNewton::new(&lin, &f, prefs, observer, start);
    let result = newton.main_loop()?;
    info.residual_norm = result.residual_norm;
    info.error_estimate = result.error_estimate;
    info.update_norms = result.history.update_norms;
    info.error_estimates = result.history.error_estimates;
    info.damping = result.history.damping;
    info.iterations = result.iterations;
    info.converged = result.converged;
    info.termination = Some(result.termination);
    info.dimension = result.dimension;
    info.warnings.extend(result.warnings);
    info!("nonlinear problem solved in {} ms", begin.elapsed().as_millis());
    Ok((wrap(result.solution), info))
}
