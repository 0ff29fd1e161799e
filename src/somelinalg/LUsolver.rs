//! dense direct solvers: nalgebra LU for moderate blocks, faer partial pivoting LU for the large
//! Kronecker systems of the 2-D matrix equations
use crate::numerical::errors::{SolveError, SolveResult};
use faer::{Mat, linalg::solvers::Solve};
use log::info;
use nalgebra::{DMatrix, DVector};

/// solve A x = b with nalgebra LU (partial pivoting)
pub fn lu_solve(A: &DMatrix<f64>, b: &DVector<f64>, context: &str) -> SolveResult<DVector<f64>> {
    if A.nrows() != A.ncols() || A.nrows() != b.len() {
        return Err(SolveError::DimensionMismatch {
            what: context.to_string(),
            expected: (A.nrows(), A.nrows()),
            found: (A.ncols(), b.len()),
        });
    }
    let x = A
        .clone()
        .lu()
        .solve(b)
        .ok_or_else(|| SolveError::SingularSystem(context.to_string()))?;
    check_finite(x.iter(), context)?;
    Ok(x)
}

/// solve A X = B for a matrix right hand side
pub fn lu_solve_matrix(
    A: &DMatrix<f64>,
    B: &DMatrix<f64>,
    context: &str,
) -> SolveResult<DMatrix<f64>> {
    if A.nrows() != A.ncols() || A.nrows() != B.nrows() {
        return Err(SolveError::DimensionMismatch {
            what: context.to_string(),
            expected: (A.nrows(), A.nrows()),
            found: (A.ncols(), B.nrows()),
        });
    }
    let X = A
        .clone()
        .lu()
        .solve(B)
        .ok_or_else(|| SolveError::SingularSystem(context.to_string()))?;
    check_finite(X.iter(), context)?;
    Ok(X)
}

/// solve A x = b with faer partial pivoting LU
pub fn faer_dense_solve(
    A: &DMatrix<f64>,
    b: &DVector<f64>,
    context: &str,
) -> SolveResult<DVector<f64>> {
    let n = A.nrows();
    if A.ncols() != n || b.len() != n {
        return Err(SolveError::DimensionMismatch {
            what: context.to_string(),
            expected: (n, n),
            found: (A.ncols(), b.len()),
        });
    }
    info!("faer partial pivoting LU of size {}", n);
    let mat = Mat::from_fn(n, n, |i, j| A[(i, j)]);
    let rhs = Mat::from_fn(n, 1, |i, _| b[i]);
    let lu = mat.as_ref().partial_piv_lu();
    let sol = lu.solve(&rhs);
    let x = DVector::from_fn(n, |i, _| sol[(i, 0)]);
    check_finite(x.iter(), context)?;
    // the factorization does not report singularity, check the residual instead
    let residual = (A * &x - b).amax();
    let scale = A.amax().max(1.0) * x.amax().max(1.0);
    if residual > 1e-6 * scale {
        return Err(SolveError::SingularSystem(format!(
            "{} (residual {:.3e})",
            context, residual
        )));
    }
    Ok(x)
}

fn check_finite<'a, I: Iterator<Item = &'a f64>>(mut values: I, context: &str) -> SolveResult<()> {
    if values.all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SolveError::SingularSystem(format!(
            "{}: non-finite solution",
            context
        )))
    }
}
