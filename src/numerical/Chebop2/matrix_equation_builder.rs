//! Ultraspherical discretization of a separable operator as the matrix equation
//! `Σ_r A_r X B_r^T = F`, X the m x n Chebyshev coefficients of the solution.
//!
//! A_r acts along y and maps T coefficients to C^(yorder) coefficients, B_r acts along x and
//! maps to C^(xorder). Each term carries `sqrt(|s_r|)` on both sides.
use crate::numerical::Chebop2::separable_format::{FactorEntry, LowRankFactorization, parity_split};
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::spectral_basis::{convertmat, diffmat, multmat};
use log::debug;
use nalgebra::DMatrix;
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct MatrixEquation {
    /// m x m, acting on the y (row) index of X
    pub a: Vec<DMatrix<f64>>,
    /// n x n, acting on the x (column) index of X
    pub b: Vec<DMatrix<f64>>,
    /// m x n
    pub rhs: DMatrix<f64>,
    pub xsplit: bool,
    pub ysplit: bool,
}

/// `Σ_k c_k(t) d^k/dt^k` on `size` coefficients, result in C^(order); `scale` is 2/(interval length)
pub fn one_dimensional_block(
    factor: &[FactorEntry],
    order: usize,
    size: usize,
    scale: f64,
) -> DMatrix<f64> {
    let mut block = DMatrix::zeros(size, size);
    for (k, entry) in factor.iter().enumerate() {
        let d = diffmat(size, k) * scale.powi(k as i32);
        let term = match entry {
            FactorEntry::Empty => continue,
            FactorEntry::Scalar(c) => d * *c,
            FactorEntry::Function(f) => multmat(size, &f.coeffs, k) * d,
        };
        block += convertmat(size, k, order) * term;
    }
    block
}

/// discretizes every term of the factorization at size m x n
pub fn operator_pairs(
    fact: &LowRankFactorization,
    xorder: usize,
    yorder: usize,
    domain: [f64; 4],
    m: usize,
    n: usize,
) -> (Vec<DMatrix<f64>>, Vec<DMatrix<f64>>) {
    let [a, b, c, d] = domain;
    let xscale = 2.0 / (b - a);
    let yscale = 2.0 / (d - c);
    let pairs: Vec<(DMatrix<f64>, DMatrix<f64>)> = (0..fact.rank)
        .into_par_iter()
        .map(|r| {
            let s = fact.s[r];
            let root = s.abs().sqrt();
            let ay = one_dimensional_block(&fact.u[r], yorder, m, yscale) * (s.signum() * root);
            let bx = one_dimensional_block(&fact.v[r], xorder, n, xscale) * root;
            (ay, bx)
        })
        .collect();
    pairs.into_iter().unzip()
}

/// right hand side in the C^(yorder) x C^(xorder) basis
pub fn rhs_matrix(
    rhs: &Chebfun2,
    xorder: usize,
    yorder: usize,
    m: usize,
    n: usize,
) -> DMatrix<f64> {
    let cf = rhs.padded_coeffs(m, n);
    convertmat(m, 0, yorder) * cf * convertmat(n, 0, xorder).transpose()
}

pub fn build_matrix_equation(
    fact: &LowRankFactorization,
    rhs: &Chebfun2,
    xorder: usize,
    yorder: usize,
    domain: [f64; 4],
    m: usize,
    n: usize,
) -> SolveResult<MatrixEquation> {
    if rhs.domain != domain {
        return Err(SolveError::DimensionMismatch {
            what: format!(
                "right hand side domain {:?} against operator domain {:?}",
                rhs.domain, domain
            ),
            expected: (m, n),
            found: rhs.size(),
        });
    }
    let (a, b) = operator_pairs(fact, xorder, yorder, domain, m, n);
    let (xsplit, ysplit) = if fact.is_constant() {
        let tol = 1e3 * f64::EPSILON;
        (parity_split(&fact.v, tol), parity_split(&fact.u, tol))
    } else {
        (false, false)
    };
    debug!(
        "matrix equation {}x{} with {} terms, xsplit {}, ysplit {}",
        m, n, fact.rank, xsplit, ysplit
    );
    Ok(MatrixEquation {
        a,
        b,
        rhs: rhs_matrix(rhs, xorder, yorder, m, n),
        xsplit,
        ysplit,
    })
}
