//! Generalized Sylvester equations `Σ_r A_r X B_r^T = F`.
//!
//! One term is solved directly with two LU solves. Two terms are reduced to the standard
//! Sylvester equation `A X + X B = C` and solved by Bartels–Stewart on real Schur forms.
//! More terms, or a two-term equation whose reduction fails, are solved in Kronecker form:
//! with column-major `vec`, `vec(A X B^T) = (B ⊗ A) vec(X)`.
use crate::numerical::errors::{SolveError, SolveResult};
use crate::somelinalg::LUsolver::{faer_dense_solve, lu_solve, lu_solve_matrix};
use log::{debug, info};
use nalgebra::{DMatrix, DVector};

const SCHUR_MAX_ITER: usize = 10_000;

/// A = Q T Q^T with T upper quasi-triangular
fn real_schur(A: &DMatrix<f64>, context: &str) -> SolveResult<(DMatrix<f64>, DMatrix<f64>)> {
    A.clone()
        .try_schur(f64::EPSILON, SCHUR_MAX_ITER)
        .map(|schur| schur.unpack())
        .ok_or_else(|| SolveError::SingularSystem(format!("{}: Schur form did not converge", context)))
}

/// Solves `A X + X B = C` (Bartels–Stewart). Both matrices are brought to real Schur form,
/// then the columns of the transformed unknown are found left to right: one shifted solve
/// `(T + s_jj I) y_j` per 1x1 block of the right factor and one coupled solve of twice the size
/// per 2x2 block.
pub fn solve_sylvester(
    A: &DMatrix<f64>,
    B: &DMatrix<f64>,
    C: &DMatrix<f64>,
) -> SolveResult<DMatrix<f64>> {
    let (m, n) = C.shape();
    if A.shape() != (m, m) || B.shape() != (n, n) {
        return Err(SolveError::DimensionMismatch {
            what: "Sylvester equation".to_string(),
            expected: (m, n),
            found: (A.nrows(), B.nrows()),
        });
    }
    let (Q, T) = real_schur(A, "Sylvester equation (left factor)")?;
    let (Z, S) = real_schur(B, "Sylvester equation (right factor)")?;
    let D = Q.transpose() * C * &Z;
    let tiny = f64::EPSILON * S.amax().max(1.0);
    let mut Y: DMatrix<f64> = DMatrix::zeros(m, n);
    // D_j minus the contribution of the columns already solved
    let reduced = |Y: &DMatrix<f64>, j: usize, upto: usize| {
        let mut r = D.column(j).into_owned();
        for k in 0..upto {
            r -= Y.column(k) * S[(k, j)];
        }
        r
    };
    let mut j = 0;
    while j < n {
        if j + 1 < n && S[(j + 1, j)].abs() > tiny {
            let (r1, r2) = (reduced(&Y, j, j), reduced(&Y, j + 1, j));
            let coupling = [[S[(j, j)], S[(j + 1, j)]], [S[(j, j + 1)], S[(j + 1, j + 1)]]];
            let M = DMatrix::from_fn(2 * m, 2 * m, |r, c| {
                let (bi, i) = (r / m, r % m);
                let (bj, k) = (c / m, c % m);
                let t = if bi == bj { T[(i, k)] } else { 0.0 };
                let s = if i == k { coupling[bi][bj] } else { 0.0 };
                t + s
            });
            let rhs = DVector::from_iterator(2 * m, r1.iter().chain(r2.iter()).copied());
            let y = lu_solve(&M, &rhs, "Sylvester equation (2x2 block)")?;
            Y.set_column(j, &y.rows(0, m).into_owned());
            Y.set_column(j + 1, &y.rows(m, m).into_owned());
            j += 2;
        } else {
            let rhs = reduced(&Y, j, j);
            let M = &T + DMatrix::identity(m, m) * S[(j, j)];
            let y = lu_solve(&M, &rhs, "Sylvester equation (column)")?;
            Y.set_column(j, &y);
            j += 1;
        }
    }
    Ok(Q * Y * Z.transpose())
}

/// `A1 X B1^T + A2 X B2^T = F` with `A2` and `B1` invertible, reduced to
/// `(A2^{-1} A1) X + X (B1^{-1} B2)^T = A2^{-1} F B1^{-T}`
fn two_term_reduction(
    A1: &DMatrix<f64>,
    B1: &DMatrix<f64>,
    A2: &DMatrix<f64>,
    B2: &DMatrix<f64>,
    F: &DMatrix<f64>,
) -> SolveResult<DMatrix<f64>> {
    let A = lu_solve_matrix(A2, A1, "two-term equation (left reduction)")?;
    let G = lu_solve_matrix(A2, F, "two-term equation (left reduction)")?;
    let B = lu_solve_matrix(B1, B2, "two-term equation (right reduction)")?.transpose();
    let C = lu_solve_matrix(B1, &G.transpose(), "two-term equation (right reduction)")?.transpose();
    solve_sylvester(&A, &B, &C)
}

/// largest entry of `Σ A_r X B_r^T - F`, relative to the size of the terms
fn relative_residual(A: &[DMatrix<f64>], B: &[DMatrix<f64>], X: &DMatrix<f64>, F: &DMatrix<f64>) -> f64 {
    let mut R = -F.clone();
    let mut scale = F.amax();
    for (a, b) in A.iter().zip(B.iter()) {
        R += a * X * b.transpose();
        scale = scale.max(a.amax() * X.amax() * b.amax());
    }
    R.amax() / scale.max(f64::MIN_POSITIVE)
}

/// Bartels–Stewart for two terms, trying either term as the one to invert; the result is
/// accepted only when it satisfies the original equation
fn solve_two_terms(A: &[DMatrix<f64>], B: &[DMatrix<f64>], F: &DMatrix<f64>) -> SolveResult<DMatrix<f64>> {
    let mut last = SolveError::SingularSystem("two-term equation".to_string());
    for (p, q) in [(0, 1), (1, 0)] {
        match two_term_reduction(&A[p], &B[p], &A[q], &B[q], F) {
            Ok(X) => {
                let residual = relative_residual(A, B, &X, F);
                if residual.is_finite() && residual < 1e-8 {
                    return Ok(X);
                }
                last = SolveError::SingularSystem(format!(
                    "two-term equation: relative residual {:.3e}",
                    residual
                ));
            }
            Err(e) => last = e,
        }
    }
    Err(last)
}

pub fn solve_matrix_equation(
    A: &[DMatrix<f64>],
    B: &[DMatrix<f64>],
    F: &DMatrix<f64>,
) -> SolveResult<DMatrix<f64>> {
    let (m, n) = F.shape();
    if A.is_empty() || A.len() != B.len() {
        return Err(SolveError::DimensionMismatch {
            what: "matrix equation terms".to_string(),
            expected: (A.len(), A.len()),
            found: (A.len(), B.len()),
        });
    }
    for (a, b) in A.iter().zip(B.iter()) {
        if a.shape() != (m, m) || b.shape() != (n, n) {
            return Err(SolveError::DimensionMismatch {
                what: "matrix equation operator".to_string(),
                expected: (m, n),
                found: (a.nrows(), b.nrows()),
            });
        }
    }
    if m == 0 || n == 0 {
        return Ok(DMatrix::zeros(m, n));
    }
    if A.len() == 1 {
        // X = A^{-1} F B^{-T}
        let Y = lu_solve_matrix(&A[0], F, "matrix equation (left factor)")?;
        let Xt = lu_solve_matrix(&B[0], &Y.transpose(), "matrix equation (right factor)")?;
        return Ok(Xt.transpose());
    }
    if A.len() == 2 {
        match solve_two_terms(A, B, F) {
            Ok(X) => return Ok(X),
            Err(e) => debug!("Bartels–Stewart failed ({}), using the Kronecker form", e),
        }
    }
    info!(
        "solving matrix equation with {} terms in Kronecker form, {} unknowns",
        A.len(),
        m * n
    );
    let mut K = DMatrix::zeros(m * n, m * n);
    for (a, b) in A.iter().zip(B.iter()) {
        K += b.kronecker(a);
    }
    let rhs = DVector::from_column_slice(F.as_slice());
    let x = faer_dense_solve(&K, &rhs, "matrix equation (Kronecker form)")?;
    Ok(DMatrix::from_column_slice(m, n, x.as_slice()))
}
