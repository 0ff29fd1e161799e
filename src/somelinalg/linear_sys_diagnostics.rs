//! rank checks of boundary condition blocks
use nalgebra::DMatrix;

/// singular values sorted in descending order
pub fn sorted_singular_values(A: &DMatrix<f64>) -> Vec<f64> {
    let mut sigma: Vec<f64> = A.singular_values().iter().cloned().collect();
    sigma.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    sigma
}

/// number of singular values above `tol * max(1, sigma_max)`
pub fn numerical_rank(A: &DMatrix<f64>, tol: f64) -> usize {
    if A.nrows() == 0 || A.ncols() == 0 {
        return 0;
    }
    let sigma = sorted_singular_values(A);
    let threshold = tol * sigma.first().cloned().unwrap_or(0.0).max(1.0);
    sigma.iter().filter(|s| **s > threshold).count()
}
