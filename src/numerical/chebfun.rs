//! # Chebfun
//!
//! A smooth function on an interval `[a, b]` stored as a truncated Chebyshev series,
//! coefficients low degree first. Construction from a closure is adaptive: the function is
//! sampled on 17, 33, 65, ... Chebyshev points until the trailing coefficients fall to
//! rounding level, then the series is chopped.
//!
//! Only the arithmetic the solvers need is provided: evaluation, differentiation, integration,
//! norms, `+`, `-` and scaling.
use crate::numerical::spectral_basis::{
    chebpts_on, chop_length, clenshaw, coeffs2vals, derivative_coeffs, is_resolved,
    next_dimension, vals2coeffs,
};
use crate::numerical::errors::{SolveError, SolveResult};
use log::warn;
use nalgebra::DVector;
use std::ops::{Add, Mul, Neg, Sub};

/// relative tolerance of adaptive construction
pub const CHEBFUN_TOL: f64 = 50.0 * f64::EPSILON;
const MIN_SAMPLES: usize = 17;
const MAX_SAMPLES: usize = 4097;

#[derive(Debug, Clone, PartialEq)]
pub struct Chebfun {
    pub coeffs: DVector<f64>,
    pub domain: (f64, f64),
}

/// a domain `(a, b)` must be finite with `a < b`
pub fn check_domain(domain: (f64, f64)) -> SolveResult<()> {
    let (a, b) = domain;
    if a.is_finite() && b.is_finite() && a < b {
        Ok(())
    } else {
        Err(SolveError::InvalidInput(format!(
            "domain ({}, {}) is not a finite interval with a < b",
            a, b
        )))
    }
}

impl Chebfun {
    pub fn new(coeffs: DVector<f64>, domain: (f64, f64)) -> Self {
        let coeffs = if coeffs.is_empty() {
            DVector::zeros(1)
        } else {
            coeffs
        };
        Chebfun { coeffs, domain }
    }

    pub fn zeros(domain: (f64, f64)) -> Self {
        Chebfun::new(DVector::zeros(1), domain)
    }

    pub fn constant(value: f64, domain: (f64, f64)) -> Self {
        Chebfun::new(DVector::from_element(1, value), domain)
    }

    /// the independent variable x on the domain
    pub fn identity(domain: (f64, f64)) -> Self {
        let (a, b) = domain;
        Chebfun::new(DVector::from_vec(vec![0.5 * (a + b), 0.5 * (b - a)]), domain)
    }

    /// interpolant of values given at `chebpts_on(len, domain)`
    pub fn from_values(values: &DVector<f64>, domain: (f64, f64)) -> Self {
        Chebfun::new(vals2coeffs(values), domain)
    }

    /// adaptive construction
    pub fn from_fn<F: Fn(f64) -> f64>(f: F, domain: (f64, f64)) -> Self {
        Chebfun::from_fn_scaled(f, domain, 0.0)
    }

    /// Adaptive construction with resolution measured against `max(vscale, max |f|)`.
    /// Samples at rounding level relative to `vscale` give the zero function, so a residual
    /// of an accurate iterate costs a single 17 point sample.
    pub fn from_fn_scaled<F: Fn(f64) -> f64>(f: F, domain: (f64, f64), vscale: f64) -> Self {
        let mut n = MIN_SAMPLES;
        loop {
            let values = chebpts_on(n, domain).map(&f);
            if !values.iter().all(|v| v.is_finite()) {
                // nothing to refine, callers check the coefficients
                return Chebfun::from_values(&values, domain);
            }
            let own = values.amax();
            if own <= CHEBFUN_TOL * vscale {
                return Chebfun::zeros(domain);
            }
            let coeffs = vals2coeffs(&values);
            let scale = own.max(vscale);
            if is_resolved(&coeffs, CHEBFUN_TOL, scale) || n >= MAX_SAMPLES {
                if n >= MAX_SAMPLES && !is_resolved(&coeffs, CHEBFUN_TOL, scale) {
                    warn!("function not resolved with {} Chebyshev points", n);
                }
                let len = chop_length(&coeffs, CHEBFUN_TOL, scale);
                return Chebfun::new(coeffs.rows(0, len).into_owned(), domain);
            }
            n = next_dimension(n);
        }
    }

    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    fn to_reference(&self, x: f64) -> f64 {
        let (a, b) = self.domain;
        (2.0 * x - a - b) / (b - a)
    }

    pub fn eval(&self, x: f64) -> f64 {
        clenshaw(self.coeffs.as_slice(), self.to_reference(x))
    }

    pub fn eval_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x)).collect()
    }

    /// values at `chebpts_on(n, domain)`
    pub fn values(&self, n: usize) -> DVector<f64> {
        coeffs2vals(&self.coeffs_padded(n))
    }

    /// coefficients zero padded or truncated to length n
    pub fn coeffs_padded(&self, n: usize) -> DVector<f64> {
        DVector::from_fn(n, |k, _| if k < self.len() { self.coeffs[k] } else { 0.0 })
    }

    /// k-th derivative
    pub fn diff(&self, k: usize) -> Chebfun {
        let (a, b) = self.domain;
        let scale = 2.0 / (b - a);
        let mut coeffs = self.coeffs.clone();
        for _ in 0..k {
            coeffs = derivative_coeffs(&coeffs) * scale;
        }
        Chebfun::new(coeffs, self.domain)
    }

    /// definite integral over the domain
    pub fn sum(&self) -> f64 {
        let (a, b) = self.domain;
        let s: f64 = self
            .coeffs
            .iter()
            .enumerate()
            .filter(|(k, _)| k % 2 == 0)
            .map(|(k, c)| c * 2.0 / (1.0 - (k * k) as f64))
            .sum();
        0.5 * (b - a) * s
    }

    /// pointwise product, exact for the product polynomial
    pub fn times(&self, other: &Chebfun) -> Chebfun {
        let n = self.len() + other.len();
        let values = self.values(n).component_mul(&other.values(n));
        Chebfun::from_values(&values, self.domain).simplify()
    }

    /// L2 norm over the domain
    pub fn norm2(&self) -> f64 {
        self.times(self).sum().max(0.0).sqrt()
    }

    /// largest absolute value at the Chebyshev points of the representation
    pub fn vscale(&self) -> f64 {
        self.values(self.len().max(2)).amax()
    }

    /// drop trailing coefficients below `tol` relative to the largest one
    pub fn chop(&self, tol: f64) -> Chebfun {
        let len = chop_length(&self.coeffs, tol, 0.0);
        Chebfun::new(self.coeffs.rows(0, len).into_owned(), self.domain)
    }

    pub fn simplify(&self) -> Chebfun {
        self.chop(CHEBFUN_TOL)
    }

    /// values on a uniform grid of `npts` points, including both endpoints
    pub fn sample_uniform(&self, npts: usize) -> (Vec<f64>, Vec<f64>) {
        let (a, b) = self.domain;
        let x: Vec<f64> = (0..npts)
            .map(|i| {
                if npts == 1 {
                    a
                } else {
                    a + (b - a) * i as f64 / (npts - 1) as f64
                }
            })
            .collect();
        let y = self.eval_many(&x);
        (x, y)
    }

    fn zip_coeffs(&self, other: &Chebfun, op: impl Fn(f64, f64) -> f64) -> Chebfun {
        let n = self.len().max(other.len());
        let a = self.coeffs_padded(n);
        let b = other.coeffs_padded(n);
        Chebfun::new(a.zip_map(&b, op), self.domain)
    }
}

impl Add for &Chebfun {
    type Output = Chebfun;
    fn add(self, rhs: &Chebfun) -> Chebfun {
        self.zip_coeffs(rhs, |a, b| a + b)
    }
}

impl Add for Chebfun {
    type Output = Chebfun;
    fn add(self, rhs: Chebfun) -> Chebfun {
        &self + &rhs
    }
}

impl Sub for &Chebfun {
    type Output = Chebfun;
    fn sub(self, rhs: &Chebfun) -> Chebfun {
        self.zip_coeffs(rhs, |a, b| a - b)
    }
}

impl Sub for Chebfun {
    type Output = Chebfun;
    fn sub(self, rhs: Chebfun) -> Chebfun {
        &self - &rhs
    }
}

impl Mul<f64> for &Chebfun {
    type Output = Chebfun;
    fn mul(self, rhs: f64) -> Chebfun {
        Chebfun::new(&self.coeffs * rhs, self.domain)
    }
}

impl Mul<f64> for Chebfun {
    type Output = Chebfun;
    fn mul(self, rhs: f64) -> Chebfun {
        &self * rhs
    }
}

impl Neg for Chebfun {
    type Output = Chebfun;
    fn neg(self) -> Chebfun {
        self * -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_adaptive_construction() {
        let f = Chebfun::from_fn(|x| (x.sin() + 2.0).ln(), (0.0, 3.0));
        for &x in &[0.0, 0.4, 1.7, 3.0] {
            assert_relative_eq!(f.eval(x), (x.sin() + 2.0).ln(), epsilon = 1e-13);
        }
        assert!(f.len() > 10 && f.len() < 100);
        // polynomials are chopped to their degree
        let p = Chebfun::from_fn(|x| 1.0 + x * x, (-1.0, 1.0));
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn test_rounding_level_samples_with_external_scale() {
        // residual of u' - u at u = exp is pure rounding noise
        let u = Chebfun::from_fn(|x| x.exp(), (0.0, 1.0));
        let du = u.diff(1);
        let r = Chebfun::from_fn_scaled(|x| du.eval(x) - u.eval(x), (0.0, 1.0), u.vscale());
        assert!(r.len() <= 17);
        assert!(r.coeffs.amax() < 1e-12);
        // real content below the scale is still resolved
        let small = Chebfun::from_fn_scaled(|x| 1e-6 * x.sin(), (0.0, 1.0), 1.0);
        assert_relative_eq!(small.eval(0.5), 1e-6 * 0.5f64.sin(), epsilon = 1e-15);
        // a non-finite sample is returned at once
        let bad = Chebfun::from_fn_scaled(|x| (x - 0.5).ln(), (0.0, 1.0), 1.0);
        assert!(bad.coeffs.iter().any(|c| !c.is_finite()));
        assert!(bad.len() <= 17);
    }

    #[test]
    fn test_domain_check() {
        assert!(check_domain((0.0, 1.0)).is_ok());
        assert!(matches!(check_domain((1.0, 1.0)), Err(SolveError::InvalidInput(_))));
        assert!(matches!(check_domain((1.0, -1.0)), Err(SolveError::InvalidInput(_))));
        assert!(check_domain((f64::NEG_INFINITY, 0.0)).is_err());
    }

    #[test]
    fn test_calculus() {
        let f = Chebfun::from_fn(|x| x.exp(), (-1.0, 2.0));
        let df = f.diff(1);
        assert_relative_eq!(df.eval(0.5), 0.5f64.exp(), epsilon = 1e-11);
        let d2 = f.diff(2);
        assert_relative_eq!(d2.eval(1.5), 1.5f64.exp(), epsilon = 1e-9);
        assert_relative_eq!(f.sum(), 2f64.exp() - (-1f64).exp(), epsilon = 1e-12);
        let s = Chebfun::from_fn(|x| x.sin(), (0.0, PI));
        assert_relative_eq!(s.norm2(), (PI / 2.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let x = Chebfun::identity((0.0, 2.0));
        assert_relative_eq!(x.eval(1.3), 1.3, epsilon = 1e-15);
        let c = Chebfun::constant(2.0, (0.0, 2.0));
        let y = &(&x * 3.0) - &c;
        assert_relative_eq!(y.eval(1.0), 1.0, epsilon = 1e-14);
        let sq = x.times(&x);
        assert_relative_eq!(sq.eval(1.5), 2.25, epsilon = 1e-14);
        let z = -(x.clone() + c);
        assert_relative_eq!(z.eval(0.5), -2.5, epsilon = 1e-14);
        assert_relative_eq!(sq.vscale(), 4.0, epsilon = 1e-14);
        let (grid, vals) = sq.sample_uniform(5);
        assert_eq!(grid.len(), 5);
        assert_relative_eq!(vals[4], 4.0, epsilon = 1e-14);
    }
}
