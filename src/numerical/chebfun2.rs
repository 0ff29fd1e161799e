//! # Chebfun2
//!
//! A smooth function on the rectangle `[a, b] x [c, d]` as a bivariate Chebyshev series
//! `f(x, y) = Σ_ij C[i, j] T_i(y) T_j(x)`: rows of `C` follow the degree in y, columns the
//! degree in x.
//!
//! `cdr` splits the function into a sum of rank-one terms `Σ_s d_s c_s(y) r_s(x)` (column
//! functions, pivots, row functions). It is computed from the SVD of the coefficient matrix,
//! which gives the same factorization as the continuous one up to the normalization of the
//! factors.
use crate::numerical::chebfun::{CHEBFUN_TOL, Chebfun};
use crate::numerical::spectral_basis::{
    chebpts_on, clenshaw, coeffs2vals, derivative_coeffs, next_dimension, vals2coeffs,
};
use log::{error, warn};
use nalgebra::{DMatrix, DVector};

const MIN_SAMPLES_2D: usize = 9;
const MAX_SAMPLES_2D: usize = 257;

#[derive(Debug, Clone, PartialEq)]
pub struct Chebfun2 {
    /// ny x nx coefficients
    pub coeffs: DMatrix<f64>,
    /// [a, b, c, d]: x in [a, b], y in [c, d]
    pub domain: [f64; 4],
}

/// rank-one splitting of a Chebfun2
#[derive(Debug, Clone)]
pub struct Cdr {
    /// column functions c_s(y)
    pub cols: Vec<Chebfun>,
    pub pivots: Vec<f64>,
    /// row functions r_s(x)
    pub rows: Vec<Chebfun>,
}

impl Cdr {
    pub fn rank(&self) -> usize {
        self.pivots.len()
    }
}

/// values on a tensor grid (rows: y points, columns: x points) -> coefficients
pub fn vals2coeffs2(values: &DMatrix<f64>) -> DMatrix<f64> {
    let (ny, nx) = values.shape();
    let mut c = DMatrix::zeros(ny, nx);
    for j in 0..nx {
        c.set_column(j, &vals2coeffs(&values.column(j).into_owned()));
    }
    for i in 0..ny {
        let row = vals2coeffs(&c.row(i).transpose());
        c.set_row(i, &row.transpose());
    }
    c
}

/// coefficients -> values on the tensor grid of the same size
pub fn coeffs2vals2(coeffs: &DMatrix<f64>) -> DMatrix<f64> {
    let (ny, nx) = coeffs.shape();
    let mut v = DMatrix::zeros(ny, nx);
    for j in 0..nx {
        v.set_column(j, &coeffs2vals(&coeffs.column(j).into_owned()));
    }
    for i in 0..ny {
        let row = coeffs2vals(&v.row(i).transpose());
        v.set_row(i, &row.transpose());
    }
    v
}

/// trailing rows (y) and columns (x) of the coefficients below `tol` relative to `scale`
pub fn is_resolved_2d(coeffs: &DMatrix<f64>, tol: f64, scale: f64) -> (bool, bool) {
    let (ny, nx) = coeffs.shape();
    let scale = coeffs.amax().max(scale);
    if scale == 0.0 {
        return (true, true);
    }
    let tail_y = (ny / 8).max(2).min(ny);
    let tail_x = (nx / 8).max(2).min(nx);
    let y_ok = ny >= 3 && coeffs.rows(ny - tail_y, tail_y).amax() <= tol * scale;
    let x_ok = nx >= 3 && coeffs.columns(nx - tail_x, tail_x).amax() <= tol * scale;
    (y_ok, x_ok)
}

impl Chebfun2 {
    pub fn new(coeffs: DMatrix<f64>, domain: [f64; 4]) -> Self {
        let coeffs = if coeffs.is_empty() {
            DMatrix::zeros(1, 1)
        } else {
            coeffs
        };
        Chebfun2 { coeffs, domain }
    }

    pub fn constant(value: f64, domain: [f64; 4]) -> Self {
        Chebfun2::new(DMatrix::from_element(1, 1, value), domain)
    }

    pub fn zeros(domain: [f64; 4]) -> Self {
        Chebfun2::constant(0.0, domain)
    }

    pub fn x_domain(&self) -> (f64, f64) {
        (self.domain[0], self.domain[1])
    }

    pub fn y_domain(&self) -> (f64, f64) {
        (self.domain[2], self.domain[3])
    }

    /// (ny, nx)
    pub fn size(&self) -> (usize, usize) {
        self.coeffs.shape()
    }

    fn sample(f: &dyn Fn(f64, f64) -> f64, domain: [f64; 4], ny: usize, nx: usize) -> DMatrix<f64> {
        let xs = chebpts_on(nx, (domain[0], domain[1]));
        let ys = chebpts_on(ny, (domain[2], domain[3]));
        DMatrix::from_fn(ny, nx, |i, j| f(xs[j], ys[i]))
    }

    /// adaptive construction: each axis is refined until its trailing coefficients vanish
    pub fn from_fn<F: Fn(f64, f64) -> f64>(f: F, domain: [f64; 4]) -> Self {
        let (mut ny, mut nx) = (MIN_SAMPLES_2D, MIN_SAMPLES_2D);
        loop {
            let values = Self::sample(&f, domain, ny, nx);
            let coeffs = vals2coeffs2(&values);
            let scale = values.amax();
            let (y_ok, x_ok) = is_resolved_2d(&coeffs, CHEBFUN_TOL, scale);
            let y_done = y_ok || ny >= MAX_SAMPLES_2D;
            let x_done = x_ok || nx >= MAX_SAMPLES_2D;
            if y_done && x_done {
                if !(y_ok && x_ok) {
                    warn!("bivariate function not resolved on a {}x{} grid", ny, nx);
                }
                return Chebfun2::new(coeffs, domain).simplify_with_scale(scale);
            }
            if !y_done {
                ny = next_dimension(ny);
            }
            if !x_done {
                nx = next_dimension(nx);
            }
        }
    }

    fn simplify_with_scale(&self, scale: f64) -> Chebfun2 {
        let threshold = CHEBFUN_TOL * self.coeffs.amax().max(scale);
        let (ny, nx) = self.coeffs.shape();
        let keep_y = (0..ny)
            .rev()
            .find(|&i| self.coeffs.row(i).amax() > threshold)
            .map_or(1, |i| i + 1);
        let keep_x = (0..nx)
            .rev()
            .find(|&j| self.coeffs.column(j).amax() > threshold)
            .map_or(1, |j| j + 1);
        Chebfun2::new(
            self.coeffs.view((0, 0), (keep_y, keep_x)).into_owned(),
            self.domain,
        )
    }

    pub fn simplify(&self) -> Chebfun2 {
        self.simplify_with_scale(0.0)
    }

    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let [a, b, c, d] = self.domain;
        let tx = (2.0 * x - a - b) / (b - a);
        let ty = (2.0 * y - c - d) / (d - c);
        let ny = self.coeffs.nrows();
        let in_y: Vec<f64> = (0..ny)
            .map(|i| {
                let row: Vec<f64> = self.coeffs.row(i).iter().cloned().collect();
                clenshaw(&row, tx)
            })
            .collect();
        clenshaw(&in_y, ty)
    }

    /// coefficients zero padded or truncated to m x n
    pub fn padded_coeffs(&self, m: usize, n: usize) -> DMatrix<f64> {
        let (ny, nx) = self.coeffs.shape();
        DMatrix::from_fn(m, n, |i, j| {
            if i < ny && j < nx {
                self.coeffs[(i, j)]
            } else {
                0.0
            }
        })
    }

    /// largest absolute value on the Chebyshev grid of the representation
    pub fn vscale(&self) -> f64 {
        let (ny, nx) = self.coeffs.shape();
        coeffs2vals2(&self.padded_coeffs(ny.max(2), nx.max(2))).amax()
    }

    /// partial derivative d^ky/dy^ky d^kx/dx^kx
    pub fn diff(&self, kx: usize, ky: usize) -> Chebfun2 {
        let [a, b, c, d] = self.domain;
        let mut coeffs = self.coeffs.clone();
        for _ in 0..ky {
            let cols: Vec<DVector<f64>> = (0..coeffs.ncols())
                .map(|j| derivative_coeffs(&coeffs.column(j).into_owned()) * (2.0 / (d - c)))
                .collect();
            coeffs = DMatrix::from_columns(&cols);
        }
        for _ in 0..kx {
            let rows: Vec<DVector<f64>> = (0..coeffs.nrows())
                .map(|i| derivative_coeffs(&coeffs.row(i).transpose()) * (2.0 / (b - a)))
                .collect();
            coeffs = DMatrix::from_columns(&rows).transpose();
        }
        Chebfun2::new(coeffs, self.domain)
    }

    /// rank-one splitting, terms with pivot below `tol` are dropped
    pub fn cdr(&self, tol: f64) -> Cdr {
        let svd = self.coeffs.clone().svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => {
                error!("SVD of Chebfun2 coefficients did not return singular vectors");
                return Cdr {
                    cols: Vec::new(),
                    pivots: Vec::new(),
                    rows: Vec::new(),
                };
            }
        };
        let sigma = svd.singular_values;
        let mut order: Vec<usize> = (0..sigma.len()).collect();
        order.sort_by(|&p, &q| {
            sigma[q]
                .partial_cmp(&sigma[p])
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut cdr = Cdr {
            cols: Vec::new(),
            pivots: Vec::new(),
            rows: Vec::new(),
        };
        for s in order {
            if sigma[s] <= tol {
                continue;
            }
            cdr.cols
                .push(Chebfun::new(u.column(s).into_owned(), self.y_domain()));
            cdr.pivots.push(sigma[s]);
            cdr.rows
                .push(Chebfun::new(v_t.row(s).transpose(), self.x_domain()));
        }
        cdr
    }

    /// values on a uniform nx x ny grid as (x, y, f) triples
    pub fn sample_uniform(&self, nx: usize, ny: usize) -> Vec<(f64, f64, f64)> {
        let [a, b, c, d] = self.domain;
        let step = |lo: f64, hi: f64, k: usize, n: usize| {
            if n <= 1 {
                lo
            } else {
                lo + (hi - lo) * k as f64 / (n - 1) as f64
            }
        };
        let mut out = Vec::with_capacity(nx * ny);
        for i in 0..ny {
            for j in 0..nx {
                let x = step(a, b, j, nx);
                let y = step(c, d, i, ny);
                out.push((x, y, self.eval(x, y)));
            }
        }
        out
    }
}
