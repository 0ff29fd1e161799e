//! Low rank (separable) form of a partial differential operator:
//! `L = Σ_r s_r (Σ_i u[r][i] ∂^i_y) ⊗ (Σ_j v[r][j] ∂^j_x)`.
//!
//! Constant coefficient tables are split with an SVD. Variable tables are split entry by
//! entry: a constant entry gives one term, a bivariate coefficient contributes one term per
//! rank-one piece of its column/pivot/row splitting.
use crate::numerical::Chebop2::chebop2_operator::{CoeffEntry, OperatorCoeffs};
use crate::numerical::chebfun::Chebfun;
use crate::numerical::errors::{SolveError, SolveResult};
use log::{debug, info};
use nalgebra::DMatrix;

#[derive(Debug, Clone)]
pub enum FactorEntry {
    Empty,
    Scalar(f64),
    Function(Chebfun),
}

impl FactorEntry {
    pub fn is_empty(&self) -> bool {
        matches!(self, FactorEntry::Empty)
    }

    /// magnitude used by the parity detection
    pub fn magnitude(&self) -> f64 {
        match self {
            FactorEntry::Empty => 0.0,
            FactorEntry::Scalar(c) => c.abs(),
            FactorEntry::Function(f) => f.coeffs.amax(),
        }
    }
}

/// `u[r]` holds the y factor of term r indexed by y derivative order (length yorder+1),
/// `v[r]` the x factor indexed by x derivative order (length xorder+1)
#[derive(Debug, Clone, Default)]
pub struct LowRankFactorization {
    pub u: Vec<Vec<FactorEntry>>,
    pub s: Vec<f64>,
    pub v: Vec<Vec<FactorEntry>>,
    pub rank: usize,
}

impl LowRankFactorization {
    fn push(&mut self, u: Vec<FactorEntry>, s: f64, v: Vec<FactorEntry>) {
        self.u.push(u);
        self.s.push(s);
        self.v.push(v);
        self.rank += 1;
    }

    pub fn is_constant(&self) -> bool {
        self.u
            .iter()
            .chain(self.v.iter())
            .flatten()
            .all(|e| !matches!(e, FactorEntry::Function(_)))
    }
}

fn dense_factorization(
    a: &DMatrix<f64>,
    yorder: usize,
    xorder: usize,
    tol: f64,
) -> SolveResult<LowRankFactorization> {
    // pad to the declared orders so every factor has the full length
    let a = DMatrix::from_fn(yorder + 1, xorder + 1, |i, j| {
        if i < a.nrows() && j < a.ncols() { a[(i, j)] } else { 0.0 }
    });
    let svd = a.clone().svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(SolveError::SingularSystem(
                "SVD of the coefficient table did not converge".to_string(),
            ));
        }
    };
    let sigma = svd.singular_values;
    let mut order: Vec<usize> = (0..sigma.len()).collect();
    order.sort_by(|&p, &q| {
        sigma[q]
            .partial_cmp(&sigma[p])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut fact = LowRankFactorization::default();
    for r in order {
        if sigma[r] <= tol {
            continue;
        }
        let uu = (0..=yorder).map(|i| FactorEntry::Scalar(u[(i, r)])).collect();
        let vv = (0..=xorder).map(|j| FactorEntry::Scalar(v_t[(r, j)])).collect();
        fact.push(uu, sigma[r], vv);
    }
    Ok(fact)
}

fn variable_factorization(
    cells: &[Vec<CoeffEntry>],
    yorder: usize,
    xorder: usize,
    tol: f64,
) -> LowRankFactorization {
    let mut fact = LowRankFactorization::default();
    let empty_u = || vec![FactorEntry::Empty; yorder + 1];
    let empty_v = || vec![FactorEntry::Empty; xorder + 1];
    for (i, row) in cells.iter().enumerate() {
        for (j, cell) in row.iter().enumerate() {
            match cell {
                CoeffEntry::Empty => {}
                CoeffEntry::Scalar(c) => {
                    if c.abs() <= tol {
                        continue;
                    }
                    let mut u = empty_u();
                    let mut v = empty_v();
                    u[i] = FactorEntry::Scalar(*c);
                    v[j] = FactorEntry::Scalar(1.0);
                    fact.push(u, 1.0, v);
                }
                CoeffEntry::Field(f) => {
                    let scale = f.vscale();
                    if scale <= tol {
                        continue;
                    }
                    let cdr = f.cdr(tol * scale.max(1.0));
                    debug!("coefficient of d^{}y d^{}x has rank {}", i, j, cdr.rank());
                    for s in 0..cdr.rank() {
                        let mut u = empty_u();
                        let mut v = empty_v();
                        u[i] = FactorEntry::Function(cdr.cols[s].clone());
                        v[j] = FactorEntry::Function(cdr.rows[s].clone());
                        fact.push(u, cdr.pivots[s], v);
                    }
                }
            }
        }
    }
    fact
}

/// Splits the coefficients into a sum of tensor products. `tol` is the absolute threshold
/// relative to the largest coefficient (dense) or to each coefficient's scale (variable).
/// Rank 0 means the operator is identically zero.
pub fn separable_format(
    coeffs: &OperatorCoeffs,
    xorder: usize,
    yorder: usize,
    tol: f64,
) -> SolveResult<LowRankFactorization> {
    let fact = match coeffs {
        OperatorCoeffs::Dense(a) => {
            let scale = a.amax().max(1.0);
            dense_factorization(a, yorder, xorder, tol * scale)?
        }
        OperatorCoeffs::Variable(cells) => variable_factorization(cells, yorder, xorder, tol),
    };
    if fact.rank == 0 {
        return Err(SolveError::DegenerateOperator);
    }
    info!("operator split into {} separable terms", fact.rank);
    Ok(fact)
}

/// true when the even or the odd derivative orders vanish in every term, so the
/// discretization decouples by parity along that axis
pub fn parity_split(factors: &[Vec<FactorEntry>], tol: f64) -> bool {
    let mut even = 0.0f64;
    let mut odd = 0.0f64;
    for term in factors {
        for (k, e) in term.iter().enumerate() {
            if k % 2 == 0 {
                even = even.max(e.magnitude());
            } else {
                odd = odd.max(e.magnitude());
            }
        }
    }
    even <= tol || odd <= tol
}
