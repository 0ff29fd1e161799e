//! Spectral solve of a linear ODE system `L δ = f` with linear boundary rows.
//!
//! The block system has one block row per equation and one block column per unknown, each
//! block n x n. Equation i of order K_i gives up K_i rows to the boundary conditions:
//! ultraspherical keeps its first n - K_i rows (highest coefficients dropped), collocation
//! drops ⌈K_i/2⌉ leading and ⌊K_i/2⌋ trailing points. The boundary rows go on top.
use crate::numerical::BVP_Spectral::linearize::LinearOperator;
use crate::numerical::chebfun::Chebfun;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::{Discretization, Preferences};
use crate::numerical::spectral_basis::{
    barycentric_row, chebpts_on, convertmat, diffmat, diffmat_colloc, eval_functional,
    is_resolved, multmat, next_dimension,
};
use crate::somelinalg::LUsolver::lu_solve;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone)]
pub struct LinearSolution {
    pub components: Vec<Chebfun>,
    pub dimension: usize,
    pub resolved: bool,
}

fn reference_point(domain: (f64, f64), x: f64) -> f64 {
    (2.0 * x - domain.0 - domain.1) / (domain.1 - domain.0)
}

fn check_count(op: &LinearOperator) -> SolveResult<()> {
    let expected: usize = op.orders.iter().sum();
    if op.bc_rows.len() != expected {
        return Err(SolveError::BoundaryConditionCount {
            axis: "x".to_string(),
            expected,
            found: op.bc_rows.len(),
        });
    }
    Ok(())
}

fn assemble_ultraspherical(
    op: &LinearOperator,
    rhs: &[Chebfun],
    bc_values: &[f64],
    n: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let nv = op.num_vars();
    let scale = 2.0 / (op.domain.1 - op.domain.0);
    let mut a = DMatrix::zeros(nv * n, nv * n);
    let mut b = DVector::zeros(nv * n);
    for (r, bc) in op.bc_rows.iter().enumerate() {
        let t = reference_point(op.domain, bc.point);
        for (j, w) in bc.weights.iter().enumerate() {
            for (k, wk) in w.iter().enumerate() {
                if *wk != 0.0 {
                    let row = eval_functional(n, t, k) * (wk * scale.powi(k as i32));
                    for c in 0..n {
                        a[(r, j * n + c)] += row[c];
                    }
                }
            }
        }
        b[r] = bc_values[r];
    }
    let mut offset = op.bc_rows.len();
    for (i, eq) in op.coeffs.iter().enumerate() {
        let order = op.orders[i];
        let keep = n - order;
        for (j, row) in eq.iter().enumerate() {
            let mut block = DMatrix::zeros(n, n);
            for (k, coeff) in row.iter().enumerate() {
                if let Some(c) = coeff {
                    let d = diffmat(n, k) * scale.powi(k as i32);
                    block += convertmat(n, k, order) * multmat(n, &c.coeffs, k) * d;
                }
            }
            a.view_mut((offset, j * n), (keep, n))
                .copy_from(&block.rows(0, keep));
        }
        let f = convertmat(n, 0, order) * rhs[i].coeffs_padded(n);
        b.rows_mut(offset, keep).copy_from(&f.rows(0, keep));
        offset += keep;
    }
    (a, b)
}

fn assemble_collocation(
    op: &LinearOperator,
    rhs: &[Chebfun],
    bc_values: &[f64],
    n: usize,
) -> (DMatrix<f64>, DVector<f64>) {
    let nv = op.num_vars();
    let scale = 2.0 / (op.domain.1 - op.domain.0);
    let xs = chebpts_on(n, op.domain);
    let max_order = op
        .coeffs
        .iter()
        .flatten()
        .map(|row| row.len())
        .chain(op.bc_rows.iter().flat_map(|b| b.weights.iter().map(|w| w.len())))
        .max()
        .unwrap_or(1);
    let d1 = diffmat_colloc(n) * scale;
    let mut powers = vec![DMatrix::identity(n, n)];
    for k in 1..max_order {
        let next = &powers[k - 1] * &d1;
        powers.push(next);
    }
    let mut a = DMatrix::zeros(nv * n, nv * n);
    let mut b = DVector::zeros(nv * n);
    for (r, bc) in op.bc_rows.iter().enumerate() {
        let interp = barycentric_row(n, reference_point(op.domain, bc.point)).transpose();
        for (j, w) in bc.weights.iter().enumerate() {
            for (k, wk) in w.iter().enumerate() {
                if *wk != 0.0 {
                    let row = &interp * &powers[k] * *wk;
                    for c in 0..n {
                        a[(r, j * n + c)] += row[c];
                    }
                }
            }
        }
        b[r] = bc_values[r];
    }
    let mut offset = op.bc_rows.len();
    for (i, eq) in op.coeffs.iter().enumerate() {
        let order = op.orders[i];
        let lo = order.div_ceil(2);
        let keep = n - order;
        for (j, row) in eq.iter().enumerate() {
            let mut block = DMatrix::zeros(n, n);
            for (k, coeff) in row.iter().enumerate() {
                if let Some(c) = coeff {
                    let values = DVector::from_fn(n, |p, _| c.eval(xs[p]));
                    block += DMatrix::from_diagonal(&values) * &powers[k];
                }
            }
            a.view_mut((offset, j * n), (keep, n))
                .copy_from(&block.rows(lo, keep));
        }
        for p in 0..keep {
            b[offset + p] = rhs[i].eval(xs[lo + p]);
        }
        offset += keep;
    }
    (a, b)
}

fn components_from(
    x: &DVector<f64>,
    nv: usize,
    n: usize,
    domain: (f64, f64),
    discretization: Discretization,
) -> Vec<Chebfun> {
    (0..nv)
        .map(|j| {
            let block = x.rows(j * n, n).into_owned();
            match discretization {
                Discretization::Ultraspherical => Chebfun::new(block, domain),
                Discretization::Collocation => Chebfun::from_values(&block, domain),
            }
        })
        .collect()
}

/// Adaptive solve: n runs through min_dimension, 2n-1, ... up to max_dimension. `scale` is the
/// magnitude the trailing coefficients are compared against, besides the solution itself.
pub fn solve_linear(
    op: &LinearOperator,
    rhs: &[Chebfun],
    bc_values: &[f64],
    prefs: &Preferences,
    scale: f64,
) -> SolveResult<LinearSolution> {
    check_count(op)?;
    if rhs.len() != op.coeffs.len() || bc_values.len() != op.bc_rows.len() {
        return Err(SolveError::DimensionMismatch {
            what: "linear system data".to_string(),
            expected: (op.coeffs.len(), op.bc_rows.len()),
            found: (rhs.len(), bc_values.len()),
        });
    }
    let nv = op.num_vars();
    let max_order = op.orders.iter().copied().max().unwrap_or(0);
    let mut n = prefs.min_dimension.max(max_order + 2);
    let max_n = prefs.max_dimension.max(n);
    loop {
        let (a, b) = match prefs.discretization {
            Discretization::Ultraspherical => assemble_ultraspherical(op, rhs, bc_values, n),
            Discretization::Collocation => assemble_collocation(op, rhs, bc_values, n),
        };
        let x = lu_solve(&a, &b, "spectral linear system")?;
        let components = components_from(&x, nv, n, op.domain, prefs.discretization);
        let overall = components
            .iter()
            .map(|c| c.coeffs.amax())
            .fold(scale, f64::max);
        let resolved = components
            .iter()
            .all(|c| is_resolved(&c.coeffs, prefs.discretization_tol, overall));
        debug!("linear solve with n = {}, resolved {}", n, resolved);
        if resolved || n >= max_n {
            if !resolved {
                warn!("linear solution not resolved with {} points", n);
            }
            let components = components
                .iter()
                .map(|c| c.chop(prefs.discretization_tol))
                .collect();
            return Ok(LinearSolution {
                components,
                dimension: n,
                resolved,
            });
        }
        n = next_dimension(n).min(max_n);
    }
}
