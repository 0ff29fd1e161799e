//! Adaptive discretization and solve of a linear PDE with `Chebop2`.
//!
//! For a size m x n: build the matrix equation, discretize and canonicalize the boundary
//! conditions, eliminate, truncate, solve the reduced equation and recover the full coefficient
//! matrix. The size along an axis doubles until the trailing coefficients along that axis are
//! negligible or the maximum size is reached.
use crate::numerical::Chebop2::canonical_bc::{
    AxisConstraints, canonical_bc, corner_mismatch, discretize_constraints, eliminate,
    nonsingular_permute, permute_columns, recover, truncate,
};
use crate::numerical::Chebop2::chebop2_operator::Chebop2;
use crate::numerical::Chebop2::matrix_equation_builder::build_matrix_equation;
use crate::numerical::Chebop2::separable_format::{LowRankFactorization, separable_format};
use crate::numerical::chebfun::check_domain;
use crate::numerical::chebfun2::{Chebfun2, is_resolved_2d};
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::Preferences;
use crate::numerical::spectral_basis::next_dimension;
use crate::somelinalg::matrix_equation::solve_matrix_equation;
use log::{info, warn};
use nalgebra::DMatrix;
use std::time::Instant;

/// reduced problem after boundary elimination, with what is needed to recover the solution
#[derive(Debug, Clone)]
pub struct DiscretizedSystem {
    pub a: Vec<DMatrix<f64>>,
    pub b: Vec<DMatrix<f64>>,
    pub rhs: DMatrix<f64>,
    /// canonical constraints, columns permuted
    pub x_constraints: AxisConstraints,
    pub y_constraints: AxisConstraints,
    pub px: Vec<usize>,
    pub py: Vec<usize>,
    pub xsplit: bool,
    pub ysplit: bool,
    pub m: usize,
    pub n: usize,
    pub corner_mismatch: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Chebop2Info {
    pub rank: usize,
    pub xsplit: bool,
    pub ysplit: bool,
    /// final (m, n)
    pub size: (usize, usize),
    pub resolved: bool,
    pub corner_mismatch: f64,
    pub warnings: Vec<String>,
}

pub fn construct_discretisation(
    op: &Chebop2,
    fact: &LowRankFactorization,
    rhs: &Chebfun2,
    m: usize,
    n: usize,
    prefs: &Preferences,
) -> SolveResult<DiscretizedSystem> {
    let eq = build_matrix_equation(fact, rhs, op.xorder, op.yorder, op.domain, m, n)?;
    let (x, y, sides) = discretize_constraints(op, m, n)?;
    let mismatch = corner_mismatch(&sides, prefs.chebfun_eps.sqrt());

    let px = nonsingular_permute(&x.b, "x")?;
    let py = nonsingular_permute(&y.b, "y")?;
    // x constraints act on columns of X, their data is a function of y
    let (bx, gx) = canonical_bc(&permute_columns(&x.b, &px), &permute_columns(&x.g, &py), "x")?;
    let (by, gy) = canonical_bc(&permute_columns(&y.b, &py), &permute_columns(&y.g, &px), "y")?;
    let x_constraints = AxisConstraints { b: bx, g: gx };
    let y_constraints = AxisConstraints { b: by, g: gy };

    let mut a: Vec<DMatrix<f64>> = eq.a.iter().map(|ar| permute_columns(ar, &py)).collect();
    let mut b: Vec<DMatrix<f64>> = eq.b.iter().map(|br| permute_columns(br, &px)).collect();
    let mut f = eq.rhs;
    eliminate(&mut a, &mut b, &mut f, &x_constraints, &y_constraints);
    let (a, b, rhs) = truncate(&a, &b, &f, x_constraints.count(), y_constraints.count());

    Ok(DiscretizedSystem {
        a,
        b,
        rhs,
        x_constraints,
        y_constraints,
        px,
        py,
        xsplit: eq.xsplit,
        ysplit: eq.ysplit,
        m,
        n,
        corner_mismatch: mismatch,
    })
}

/// solves the reduced equation and returns the m x n coefficients of the solution
pub fn solve_discretized(sys: &DiscretizedSystem) -> SolveResult<DMatrix<f64>> {
    let x22 = solve_matrix_equation(&sys.a, &sys.b, &sys.rhs)?;
    recover(&x22, &sys.x_constraints, &sys.y_constraints, &sys.px, &sys.py)
}

/// a caller supplied factorization must have `rank` terms with factors of the operator's orders
fn check_factorization(fact: &LowRankFactorization, xorder: usize, yorder: usize) -> SolveResult<()> {
    if fact.rank == 0 {
        return Err(SolveError::DegenerateOperator);
    }
    if fact.u.len() != fact.rank || fact.s.len() != fact.rank || fact.v.len() != fact.rank {
        return Err(SolveError::InvalidInput(format!(
            "factorization of rank {} has {} y factors, {} weights and {} x factors",
            fact.rank,
            fact.u.len(),
            fact.s.len(),
            fact.v.len()
        )));
    }
    let bad_y = fact.u.iter().any(|u| u.len() != yorder + 1);
    let bad_x = fact.v.iter().any(|v| v.len() != xorder + 1);
    if bad_y || bad_x {
        return Err(SolveError::InvalidInput(format!(
            "factors must have {} (y) and {} (x) entries",
            yorder + 1,
            xorder + 1
        )));
    }
    Ok(())
}

pub fn solve_pde(
    op: &Chebop2,
    rhs: &Chebfun2,
    prefs: &Preferences,
) -> SolveResult<(Chebfun2, Chebop2Info)> {
    let begin = Instant::now();
    prefs.check()?;
    check_domain(op.x_domain())?;
    check_domain(op.y_domain())?;
    let fact = match &op.factorization {
        Some(f) => {
            check_factorization(f, op.xorder, op.yorder)?;
            f.clone()
        }
        None => separable_format(&op.coeffs, op.xorder, op.yorder, prefs.chebfun_eps)?,
    };
    let rhs = match &op.constant_term {
        Some(g) => {
            let (ny, nx) = rhs.size();
            let (gy, gx) = g.size();
            let (my, mx) = (ny.max(gy), nx.max(gx));
            Chebfun2::new(rhs.padded_coeffs(my, mx) - g.padded_coeffs(my, mx), rhs.domain)
        }
        None => rhs.clone(),
    };
    let mut info = Chebop2Info {
        rank: fact.rank,
        ..Default::default()
    };

    let min_m = prefs.min_dimension_2d.max(op.yorder + 2);
    let min_n = prefs.min_dimension_2d.max(op.xorder + 2);
    let max_m = prefs.max_dimension_2d.max(min_m);
    let max_n = prefs.max_dimension_2d.max(min_n);
    let (mut m, mut n) = (min_m, min_n);
    let mut corner_warned = false;
    loop {
        let sys = construct_discretisation(op, &fact, &rhs, m, n, prefs)?;
        if !corner_warned && sys.corner_mismatch > prefs.corner_threshold() {
            let msg = format!(
                "boundary data do not agree at the corners (mismatch {:.3e})",
                sys.corner_mismatch
            );
            warn!("{}", msg);
            info.warnings.push(msg);
            corner_warned = true;
        }
        info.corner_mismatch = sys.corner_mismatch;
        info.xsplit = sys.xsplit;
        info.ysplit = sys.ysplit;
        let x = solve_discretized(&sys)?;
        let (y_ok, x_ok) = is_resolved_2d(&x, prefs.discretization_tol, 0.0);
        let y_done = y_ok || m >= max_m;
        let x_done = x_ok || n >= max_n;
        if y_done && x_done {
            info.size = (m, n);
            info.resolved = y_ok && x_ok;
            if !info.resolved {
                let msg = format!("solution not resolved on a {}x{} discretization", m, n);
                warn!("{}", msg);
                info.warnings.push(msg);
            }
            info!(
                "PDE solved: rank {}, size {}x{}, {} ms",
                info.rank,
                m,
                n,
                begin.elapsed().as_millis()
            );
            return Ok((Chebfun2::new(x, op.domain).simplify(), info));
        }
        if !y_done {
            m = next_dimension(m).min(max_m);
        }
        if !x_done {
            n = next_dimension(n).min(max_n);
        }
    }
}
