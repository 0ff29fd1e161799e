//! # Spectral basis toolkit
//!
//! Building blocks shared by the 1-D and 2-D solvers. Everything works with Chebyshev
//! coefficients stored low degree first on the reference interval [-1, 1]; callers map to
//! physical domains by scaling derivatives with (2/(b-a))^k.
//!
//! - Chebyshev points of the second kind in ascending order and the transforms between values
//!   at these points and Chebyshev coefficients
//! - ultraspherical operators (Olver & Townsend): differentiation `D_k: T -> C^(k)`,
//!   conversion `S: C^(k1) -> C^(k2)` and multiplication `M_λ[a]` in the `C^(λ)` basis
//! - evaluation functionals of derivatives, used for boundary rows
//! - collocation differentiation and barycentric interpolation rows
use nalgebra::{DMatrix, DVector};
use rustfft::{FftPlanner, num_complex::Complex};
use std::f64::consts::PI;

/// n Chebyshev points of the second kind on [-1, 1], ascending
pub fn chebpts(n: usize) -> DVector<f64> {
    if n == 1 {
        return DVector::from_element(1, 0.0);
    }
    let big_n = (n - 1) as f64;
    DVector::from_fn(n, |j, _| {
        // symmetric form keeps the points exactly antisymmetric
        let m = 2.0 * j as f64 - big_n;
        (PI * m / (2.0 * big_n)).sin()
    })
}

/// Chebyshev points mapped to [a, b]
pub fn chebpts_on(n: usize, domain: (f64, f64)) -> DVector<f64> {
    let (a, b) = domain;
    chebpts(n).map(|t| 0.5 * (b - a) * t + 0.5 * (a + b))
}

/// `2 Σ'' x_m cos(pi k m / N)` for k = 0..=N (type-I DCT, end terms halved), computed with an
/// FFT of the even extension of length 2N
fn dct1_doubled(x: &[f64]) -> Vec<f64> {
    let big_n = x.len() - 1;
    let mut buffer: Vec<Complex<f64>> = (0..2 * big_n)
        .map(|m| Complex::new(x[if m <= big_n { m } else { 2 * big_n - m }], 0.0))
        .collect();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(2 * big_n);
    fft.process(&mut buffer);
    buffer.iter().take(big_n + 1).map(|c| c.re).collect()
}

/// values at `chebpts(n)` -> Chebyshev coefficients
pub fn vals2coeffs(values: &DVector<f64>) -> DVector<f64> {
    let n = values.len();
    if n <= 1 {
        return values.clone();
    }
    let big_n = n - 1;
    // ascending point j is cos(pi*(N-j)/N)
    let descending: Vec<f64> = values.iter().rev().copied().collect();
    let w = dct1_doubled(&descending);
    DVector::from_fn(n, |k, _| {
        let c = w[k] / big_n as f64;
        if k == 0 || k == big_n { 0.5 * c } else { c }
    })
}

/// Chebyshev coefficients -> values at `chebpts(len)`
pub fn coeffs2vals(coeffs: &DVector<f64>) -> DVector<f64> {
    let n = coeffs.len();
    if n <= 1 {
        return coeffs.clone();
    }
    let big_n = n - 1;
    let e = dct1_doubled(coeffs.as_slice());
    let (first, last) = (coeffs[0], coeffs[big_n]);
    DVector::from_fn(n, |j, _| {
        let m = big_n - j;
        let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
        0.5 * (e[m] + first + sign * last)
    })
}

/// Clenshaw evaluation of a Chebyshev series at t in [-1, 1]
pub fn clenshaw(coeffs: &[f64], t: f64) -> f64 {
    let n = coeffs.len();
    if n == 0 {
        return 0.0;
    }
    let mut b1 = 0.0;
    let mut b2 = 0.0;
    for k in (1..n).rev() {
        let b0 = coeffs[k] + 2.0 * t * b1 - b2;
        b2 = b1;
        b1 = b0;
    }
    coeffs[0] + t * b1 - b2
}

/// coefficients of the derivative of a Chebyshev series (reference interval)
pub fn derivative_coeffs(coeffs: &DVector<f64>) -> DVector<f64> {
    let n = coeffs.len();
    if n <= 1 {
        return DVector::zeros(1);
    }
    let mut d = DVector::zeros(n + 1);
    for k in (1..n).rev() {
        d[k - 1] = d[k + 1] + 2.0 * k as f64 * coeffs[k];
    }
    d[0] *= 0.5;
    d.rows(0, n - 1).into_owned()
}

/// ultraspherical differentiation `D_k: T -> C^(k)` of size n x n, reference interval
pub fn diffmat(n: usize, k: usize) -> DMatrix<f64> {
    if k == 0 {
        return DMatrix::identity(n, n);
    }
    let factorial: f64 = (1..k).map(|i| i as f64).product();
    let scale = 2f64.powi(k as i32 - 1) * factorial;
    let mut d = DMatrix::zeros(n, n);
    for j in 0..n {
        if j + k < n {
            d[(j, j + k)] = scale * (j + k) as f64;
        }
    }
    d
}

// one step of conversion C^(lambda) -> C^(lambda+1)
fn convert_step(n: usize, lambda: usize) -> DMatrix<f64> {
    let mut s = DMatrix::zeros(n, n);
    if lambda == 0 {
        for j in 0..n {
            s[(j, j)] = if j == 0 { 1.0 } else { 0.5 };
            if j + 2 < n {
                s[(j, j + 2)] = -0.5;
            }
        }
    } else {
        let l = lambda as f64;
        for j in 0..n {
            s[(j, j)] = l / (l + j as f64);
            if j + 2 < n {
                s[(j, j + 2)] = -l / (l + (j + 2) as f64);
            }
        }
    }
    s
}

/// conversion `C^(k1) -> C^(k2)`, identity when k1 >= k2
pub fn convertmat(n: usize, k1: usize, k2: usize) -> DMatrix<f64> {
    let mut s = DMatrix::identity(n, n);
    for lambda in k1..k2 {
        s = convert_step(n, lambda) * s;
    }
    s
}

/// multiplication by `a` (Chebyshev coefficients) in the Chebyshev T basis
pub fn multmat_cheb(n: usize, a: &DVector<f64>) -> DMatrix<f64> {
    let coef = |l: usize| if l < a.len() { a[l] } else { 0.0 };
    DMatrix::from_fn(n, n, |j, k| {
        let mut m = 0.5 * coef(k + j);
        if j >= k {
            m += 0.5 * coef(j - k);
        }
        if k >= j && j >= 1 {
            m += 0.5 * coef(k - j);
        }
        m
    })
}

/// multiplication by `a` acting on `C^(lambda)` coefficients
pub fn multmat(n: usize, a: &DVector<f64>, lambda: usize) -> DMatrix<f64> {
    let m0 = multmat_cheb(n, a);
    if lambda == 0 {
        return m0;
    }
    let s = convertmat(n, 0, lambda);
    // M = S M0 S^{-1}; S is upper triangular with a nonzero diagonal
    match s.transpose().solve_lower_triangular(&m0.transpose()) {
        Some(y_t) => &s * y_t.transpose(),
        None => {
            log::error!("conversion matrix is singular, falling back to T-basis multiplication");
            m0
        }
    }
}

/// dense derivative in the T basis (reference interval)
pub fn tderiv_matrix(n: usize) -> DMatrix<f64> {
    DMatrix::from_fn(n, n, |i, j| {
        if j > i && (j - i) % 2 == 1 {
            let v = 2.0 * j as f64;
            if i == 0 { 0.5 * v } else { v }
        } else {
            0.0
        }
    })
}

/// row functional u -> u^(k)(t) acting on n Chebyshev coefficients (reference interval)
pub fn eval_functional(n: usize, t: f64, k: usize) -> DVector<f64> {
    let row = if (t - 1.0).abs() < 1e-15 {
        DVector::from_element(n, 1.0)
    } else if (t + 1.0).abs() < 1e-15 {
        DVector::from_fn(n, |j, _| if j % 2 == 0 { 1.0 } else { -1.0 })
    } else {
        let theta = t.clamp(-1.0, 1.0).acos();
        DVector::from_fn(n, |j, _| (j as f64 * theta).cos())
    };
    if k == 0 {
        return row;
    }
    let dt = tderiv_matrix(n);
    let mut r = row.transpose();
    for _ in 0..k {
        r = r * &dt;
    }
    r.transpose()
}

/// collocation differentiation matrix on `chebpts(n)` (reference interval)
pub fn diffmat_colloc(n: usize) -> DMatrix<f64> {
    if n <= 1 {
        return DMatrix::zeros(n, n);
    }
    let x = chebpts(n);
    let c = |i: usize| if i == 0 || i == n - 1 { 2.0 } else { 1.0 };
    let mut d = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let sign = if (i + j) % 2 == 0 { 1.0 } else { -1.0 };
                d[(i, j)] = c(i) / c(j) * sign / (x[i] - x[j]);
            }
        }
    }
    for i in 0..n {
        let s: f64 = (0..n).filter(|&j| j != i).map(|j| d[(i, j)]).sum();
        d[(i, i)] = -s;
    }
    d
}

/// barycentric interpolation row: values at `chebpts(n)` -> value at t
pub fn barycentric_row(n: usize, t: f64) -> DVector<f64> {
    let x = chebpts(n);
    if let Some(idx) = x.iter().position(|&xj| (xj - t).abs() < 1e-15) {
        let mut row = DVector::zeros(n);
        row[idx] = 1.0;
        return row;
    }
    let w = |j: usize| {
        let s = if j % 2 == 0 { 1.0 } else { -1.0 };
        if j == 0 || j == n - 1 { 0.5 * s } else { s }
    };
    let terms = DVector::from_fn(n, |j, _| w(j) / (t - x[j]));
    let denom: f64 = terms.sum();
    terms / denom
}

/// true when the trailing coefficients are below `tol` relative to the largest one
pub fn is_resolved(coeffs: &DVector<f64>, tol: f64, scale: f64) -> bool {
    let n = coeffs.len();
    let own = coeffs.amax();
    let scale = own.max(scale);
    if scale == 0.0 {
        return true;
    }
    if n < 3 {
        return false;
    }
    let tail = (n / 8).max(2);
    let tail_max = coeffs.rows(n - tail, tail).amax();
    tail_max <= tol * scale
}

/// length after dropping trailing coefficients below `tol` relative to `scale`
pub fn chop_length(coeffs: &DVector<f64>, tol: f64, scale: f64) -> usize {
    let scale = coeffs.amax().max(scale);
    match coeffs.iter().rposition(|c| c.abs() > tol * scale) {
        Some(last) => last + 1,
        None => 1,
    }
}

/// next size in the doubling sequence 9, 17, 33, 65, ...
pub fn next_dimension(n: usize) -> usize {
    2 * (n - 1) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transforms_invert_each_other() {
        let n = 17;
        let x = chebpts(n);
        let vals = x.map(|t| (2.0 * t).exp() * t.sin());
        let coeffs = vals2coeffs(&vals);
        let back = coeffs2vals(&coeffs);
        for j in 0..n {
            assert_relative_eq!(back[j], vals[j], epsilon = 1e-13);
        }
        for &t in &[-0.7, 0.1, 0.93] {
            assert_relative_eq!(clenshaw(coeffs.as_slice(), t), (2.0 * t).exp() * t.sin(), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_fft_transform_matches_cosine_sums() {
        let n = 33;
        let big_n = (n - 1) as f64;
        let x = chebpts(n);
        let vals = x.map(|t| 1.0 / (1.0 + 4.0 * t * t));
        let coeffs = vals2coeffs(&vals);
        for k in [0, 1, 2, 7, 32] {
            let mut direct: f64 = (0..n)
                .map(|j| {
                    let w = if j == 0 || j == n - 1 { 0.5 } else { 1.0 };
                    w * vals[j] * (PI * (k * (n - 1 - j)) as f64 / big_n).cos()
                })
                .sum::<f64>()
                * 2.0
                / big_n;
            if k == 0 || k == n - 1 {
                direct *= 0.5;
            }
            assert_relative_eq!(coeffs[k], direct, epsilon = 1e-14);
        }
        // a large transform stays accurate
        let big = chebpts(4097).map(|t| (3.0 * t).cos());
        let back = coeffs2vals(&vals2coeffs(&big));
        assert!((back - &big).amax() < 1e-13);
    }

    #[test]
    fn test_polynomial_coefficients() {
        // x^2 = (T0 + T2)/2
        let x = chebpts(5);
        let c = vals2coeffs(&x.map(|t| t * t));
        assert_relative_eq!(c[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(c[1], 0.0, epsilon = 1e-14);
        assert_relative_eq!(c[2], 0.5, epsilon = 1e-14);
        assert_relative_eq!(c[4], 0.0, epsilon = 1e-14);
        assert!(x[0] < x[1] && x[3] < x[4]);
        assert_eq!(x[0], -1.0);
        assert_eq!(x[4], 1.0);
    }

    #[test]
    fn test_derivative_coeffs_of_t3() {
        // T3' = 3 T0 + 6 T2
        let c = DVector::from_vec(vec![0.0, 0.0, 0.0, 1.0]);
        let d = derivative_coeffs(&c);
        assert_eq!(d.len(), 3);
        assert_relative_eq!(d[0], 3.0);
        assert_relative_eq!(d[1], 0.0);
        assert_relative_eq!(d[2], 6.0);
        let dt = tderiv_matrix(4) * &c;
        assert_relative_eq!(dt[0], 3.0);
        assert_relative_eq!(dt[2], 6.0);
    }

    #[test]
    fn test_ultraspherical_derivative_consistency() {
        // S_0 * (T-basis derivative) == D_1 for polynomials of degree < n
        let n = 8;
        let c = DVector::from_fn(n, |k, _| 1.0 / (k as f64 + 1.0));
        let via_t = convertmat(n, 0, 1) * (tderiv_matrix(n) * &c);
        let via_d = diffmat(n, 1) * &c;
        for j in 0..n {
            assert_relative_eq!(via_t[j], via_d[j], epsilon = 1e-12);
        }
        // second derivative: S_1 S_0 D_T^2 == D_2
        let dt = tderiv_matrix(n);
        let via_t2 = convertmat(n, 0, 2) * (&dt * (&dt * &c));
        let via_d2 = diffmat(n, 2) * &c;
        for j in 0..n {
            assert_relative_eq!(via_t2[j], via_d2[j], epsilon = 1e-11);
        }
    }

    #[test]
    fn test_multiplication_matrices() {
        // x * x = x^2 in T basis
        let n = 6;
        let x = DVector::from_vec(vec![0.0, 1.0]);
        let prod = multmat_cheb(n, &x) * DVector::from_vec(vec![0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert_relative_eq!(prod[0], 0.5, epsilon = 1e-15);
        assert_relative_eq!(prod[2], 0.5, epsilon = 1e-15);
        // C^(1) multiplication commutes with conversion
        let a = DVector::from_vec(vec![1.0, 0.5, 0.25]);
        let u = DVector::from_vec(vec![0.3, -0.2, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let n = u.len();
        let s = convertmat(n, 0, 1);
        let lhs = multmat(n, &a, 1) * (&s * &u);
        let rhs = &s * (multmat_cheb(n, &a) * &u);
        for j in 0..n - 2 {
            assert_relative_eq!(lhs[j], rhs[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_functionals_and_collocation() {
        let n = 9;
        let c = vals2coeffs(&chebpts(n).map(|t| t.powi(3)));
        // (x^3)'' at 0.5 = 3
        let r = eval_functional(n, 0.5, 2);
        assert_relative_eq!(r.dot(&c), 3.0, epsilon = 1e-11);
        // endpoint values of derivative
        let r = eval_functional(n, -1.0, 1);
        assert_relative_eq!(r.dot(&c), 3.0, epsilon = 1e-11);
        // collocation derivative of x^3
        let x = chebpts(n);
        let d = diffmat_colloc(n) * x.map(|t| t.powi(3));
        for j in 0..n {
            assert_relative_eq!(d[j], 3.0 * x[j] * x[j], epsilon = 1e-11);
        }
        let b = barycentric_row(n, 0.3);
        assert_relative_eq!(b.dot(&x.map(|t| t.powi(3))), 0.027, epsilon = 1e-13);
        assert_relative_eq!(b.sum(), 1.0, epsilon = 1e-13);
    }

    #[test]
    fn test_resolution_checks() {
        let mut c = DVector::from_fn(17, |k, _| 0.5f64.powi(k as i32));
        assert!(!is_resolved(&c, 1e-13, 0.0));
        for k in 8..17 {
            c[k] = 0.0;
        }
        assert!(is_resolved(&c, 1e-13, 0.0));
        assert_eq!(chop_length(&c, 1e-13, 0.0), 8);
        assert_eq!(next_dimension(17), 33);
    }
}
