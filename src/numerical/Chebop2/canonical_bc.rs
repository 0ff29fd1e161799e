//! Boundary condition elimination for the matrix equation `Σ_r A_r X B_r^T = F`.
//!
//! Conditions on the down/up sides read `By X = Gy`, conditions on the left/right sides read
//! `X Bx^T = Gx^T`. After a column permutation moving a nonsingular window to the front, each
//! constraint set is brought into a form whose leading block is unit upper triangular. The
//! leading `ky` (`kx`) coefficients of X are then eliminated from every term, the system is
//! truncated to the remaining unknowns, and after the solve the eliminated blocks are recovered
//! from the constraints.
use crate::numerical::Chebop2::chebop2_operator::{Chebop2, Side, SideCondition};
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::spectral_basis::{eval_functional, is_resolved};
use crate::somelinalg::linear_sys_diagnostics::numerical_rank;
use itertools::iproduct;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

/// discretized conditions of one side
#[derive(Debug, Clone)]
pub struct SideRows {
    pub side: Side,
    /// one row per condition, acting on the coefficients along the constrained axis
    pub rows: DMatrix<f64>,
    /// one row per condition, coefficients of the data along the side
    pub values: DMatrix<f64>,
}

/// all conditions of one axis
#[derive(Debug, Clone)]
pub struct AxisConstraints {
    pub b: DMatrix<f64>,
    pub g: DMatrix<f64>,
}

impl AxisConstraints {
    pub fn count(&self) -> usize {
        self.b.nrows()
    }
}

fn condition_row(cond: &SideCondition, size: usize, t: f64, scale: f64) -> DVector<f64> {
    let mut row = DVector::zeros(size);
    for (k, w) in cond.weights.iter().enumerate() {
        if *w != 0.0 {
            row += eval_functional(size, t, k) * (w * scale.powi(k as i32));
        }
    }
    row
}

/// rows act on `size` coefficients normal to the side, values are padded to `other` coefficients
pub fn discretize_side(op: &Chebop2, side: Side, m: usize, n: usize) -> SideRows {
    let [a, b, c, d] = op.domain;
    let (size, other, t, scale) = match side {
        Side::Left => (n, m, -1.0, 2.0 / (b - a)),
        Side::Right => (n, m, 1.0, 2.0 / (b - a)),
        Side::Down => (m, n, -1.0, 2.0 / (d - c)),
        Side::Up => (m, n, 1.0, 2.0 / (d - c)),
    };
    let conds = op.side_conditions(side);
    let mut rows = DMatrix::zeros(conds.len(), size);
    let mut values = DMatrix::zeros(conds.len(), other);
    for (p, cond) in conds.iter().enumerate() {
        rows.set_row(p, &condition_row(cond, size, t, scale).transpose());
        values.set_row(p, &cond.value.coeffs(other).transpose());
    }
    SideRows { side, rows, values }
}

fn stack(first: &SideRows, second: &SideRows) -> AxisConstraints {
    let k = first.rows.nrows() + second.rows.nrows();
    let b = DMatrix::from_fn(k, first.rows.ncols(), |i, j| {
        if i < first.rows.nrows() {
            first.rows[(i, j)]
        } else {
            second.rows[(i - first.rows.nrows(), j)]
        }
    });
    let g = DMatrix::from_fn(k, first.values.ncols(), |i, j| {
        if i < first.values.nrows() {
            first.values[(i, j)]
        } else {
            second.values[(i - first.values.nrows(), j)]
        }
    });
    AxisConstraints { b, g }
}

/// Discretized conditions of both axes at size m x n, with the count check against the
/// operator orders. Returns (x constraints, y constraints, per side rows).
pub fn discretize_constraints(
    op: &Chebop2,
    m: usize,
    n: usize,
) -> SolveResult<(AxisConstraints, AxisConstraints, Vec<SideRows>)> {
    let left = discretize_side(op, Side::Left, m, n);
    let right = discretize_side(op, Side::Right, m, n);
    let down = discretize_side(op, Side::Down, m, n);
    let up = discretize_side(op, Side::Up, m, n);
    let x = stack(&left, &right);
    let y = stack(&down, &up);
    if x.count() != op.xorder {
        return Err(SolveError::BoundaryConditionCount {
            axis: "x".to_string(),
            expected: op.xorder,
            found: x.count(),
        });
    }
    if y.count() != op.yorder {
        return Err(SolveError::BoundaryConditionCount {
            axis: "y".to_string(),
            expected: op.yorder,
            found: y.count(),
        });
    }
    Ok((x, y, vec![left, right, down, up]))
}

/// Accumulated disagreement of adjacent boundary data at the four corners. Only pairs whose
/// data is resolved (tail below `tail_tol`) take part.
pub fn corner_mismatch(sides: &[SideRows], tail_tol: f64) -> f64 {
    let x_sides = sides.iter().filter(|s| s.side.is_x_side());
    let y_sides = sides.iter().filter(|s| !s.side.is_x_side());
    let mut mismatch = 0.0;
    for (xs, ys) in iproduct!(x_sides, y_sides) {
        for (p, q) in iproduct!(0..xs.rows.nrows(), 0..ys.rows.nrows()) {
            let gx = xs.values.row(p).transpose();
            let gy = ys.values.row(q).transpose();
            if !is_resolved(&gx, tail_tol, 0.0) || !is_resolved(&gy, tail_tol, 0.0) {
                continue;
            }
            // condition q applied to the data of p against condition p applied to q
            let lhs = ys.rows.row(q).transpose().dot(&gx);
            let rhs = xs.rows.row(p).transpose().dot(&gy);
            mismatch += (lhs - rhs).abs();
        }
    }
    mismatch
}

/// columns reordered so that column j of the result is column `perm[j]` of `mat`
pub fn permute_columns(mat: &DMatrix<f64>, perm: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(mat.nrows(), mat.ncols(), |i, j| mat[(i, perm[j])])
}

/// Finds a window of K consecutive columns of the K x N matrix `b` with full rank and returns
/// the permutation moving it to the front, the other columns keep their order.
pub fn nonsingular_permute(b: &DMatrix<f64>, axis: &str) -> SolveResult<Vec<usize>> {
    let (k, n) = b.shape();
    if k == 0 {
        return Ok((0..n).collect());
    }
    let tol = 10.0 * n as f64 * f64::EPSILON;
    for s in 0..=(n.saturating_sub(k)) {
        if s + k > n {
            break;
        }
        let window = b.columns(s, k).into_owned();
        if numerical_rank(&window, tol) == k {
            debug!("{} constraints: nonsingular window starts at column {}", axis, s);
            let mut perm: Vec<usize> = (s..s + k).collect();
            perm.extend((0..n).filter(|j| *j < s || *j >= s + k));
            return Ok(perm);
        }
    }
    Err(SolveError::LinearlyDependentBCs {
        axis: axis.to_string(),
    })
}

/// Row operations on (b, g) making the leading K x K block of `b` unit upper triangular.
/// `b` must already be permuted.
pub fn canonical_bc(
    b: &DMatrix<f64>,
    g: &DMatrix<f64>,
    axis: &str,
) -> SolveResult<(DMatrix<f64>, DMatrix<f64>)> {
    let k = b.nrows();
    if k == 0 {
        return Ok((b.clone(), g.clone()));
    }
    let singular = || SolveError::LinearlyDependentBCs {
        axis: axis.to_string(),
    };
    let lead = b.columns(0, k).into_owned();
    let (p, l, u) = lead.lu().unpack();
    let mut pb = b.clone();
    let mut pg = g.clone();
    p.permute_rows(&mut pb);
    p.permute_rows(&mut pg);
    let mut bc = l.solve_lower_triangular(&pb).ok_or_else(singular)?;
    let mut gc = l.solve_lower_triangular(&pg).ok_or_else(singular)?;
    for i in 0..k {
        let pivot = u[(i, i)];
        if pivot.abs() <= f64::EPSILON * u.amax() {
            return Err(singular());
        }
        let inv = 1.0 / pivot;
        bc.row_mut(i).scale_mut(inv);
        gc.row_mut(i).scale_mut(inv);
    }
    Ok((bc, gc))
}

/// Removes the first K unknowns along one axis from every term.
///
/// `c_terms` act on the constrained axis, `e_terms` are their partners on the other axis, `f`
/// has one row per row of the `c_terms`; `b` and `g` are the canonical constraints.
pub fn zero_dof(
    c_terms: &mut [DMatrix<f64>],
    e_terms: &[DMatrix<f64>],
    f: &mut DMatrix<f64>,
    b: &DMatrix<f64>,
    g: &DMatrix<f64>,
) {
    let k = b.nrows();
    if k == 0 {
        return;
    }
    let tol = 10.0 * f64::EPSILON;
    for (c, e) in c_terms.iter_mut().zip(e_terms.iter()) {
        let ge = g * e.transpose();
        for ii in 0..k {
            for kk in 0..c.nrows() {
                let coef = c[(kk, ii)];
                if coef.abs() <= tol {
                    continue;
                }
                for col in 0..c.ncols() {
                    c[(kk, col)] -= coef * b[(ii, col)];
                }
                for col in 0..f.ncols() {
                    f[(kk, col)] -= coef * ge[(ii, col)];
                }
            }
        }
    }
}

/// Eliminates both axes in place: y first on (A, F), then x on (B, F^T).
pub fn eliminate(
    a: &mut [DMatrix<f64>],
    b: &mut [DMatrix<f64>],
    f: &mut DMatrix<f64>,
    x: &AxisConstraints,
    y: &AxisConstraints,
) {
    zero_dof(a, b, f, &y.b, &y.g);
    let mut ft = f.transpose();
    zero_dof(b, a, &mut ft, &x.b, &x.g);
    *f = ft.transpose();
}

/// drops the eliminated unknowns and the matching equations
pub fn truncate(
    a: &[DMatrix<f64>],
    b: &[DMatrix<f64>],
    f: &DMatrix<f64>,
    kx: usize,
    ky: usize,
) -> (Vec<DMatrix<f64>>, Vec<DMatrix<f64>>, DMatrix<f64>) {
    let (m, n) = f.shape();
    let my = m - ky;
    let nx = n - kx;
    let a_red = a
        .iter()
        .map(|ar| ar.view((0, ky), (my, my)).into_owned())
        .collect();
    let b_red = b
        .iter()
        .map(|br| br.view((0, kx), (nx, nx)).into_owned())
        .collect();
    (a_red, b_red, f.view((0, 0), (my, nx)).into_owned())
}

/// Rebuilds the full m x n coefficient matrix from the reduced solution and the canonical
/// constraints, then undoes the column permutations `px`, `py`.
pub fn recover(
    x22: &DMatrix<f64>,
    x: &AxisConstraints,
    y: &AxisConstraints,
    px: &[usize],
    py: &[usize],
) -> SolveResult<DMatrix<f64>> {
    let kx = x.count();
    let ky = y.count();
    let m = x22.nrows() + ky;
    let n = x22.ncols() + kx;
    let singular = |what: &str| SolveError::SingularSystem(format!("recovery of {}", what));

    // X21 Bx1^T = Gx[:, ky..]^T - X22 Bx2^T
    let x21 = if kx == 0 {
        DMatrix::zeros(m - ky, 0)
    } else {
        let bx1 = x.b.columns(0, kx).into_owned();
        let bx2 = x.b.columns(kx, n - kx).into_owned();
        let rhs = x.g.columns(ky, m - ky).transpose() - x22 * bx2.transpose();
        bx1.solve_upper_triangular(&rhs.transpose())
            .ok_or_else(|| singular("X21"))?
            .transpose()
    };
    // By1 [X11 X12] = Gy - By2 [X21 X22]
    let (x11, x12) = if ky == 0 {
        (DMatrix::zeros(0, kx), DMatrix::zeros(0, n - kx))
    } else {
        let by1 = y.b.columns(0, ky).into_owned();
        let by2 = y.b.columns(ky, m - ky).into_owned();
        let r12 = y.g.columns(kx, n - kx).into_owned() - &by2 * x22;
        let x12 = by1
            .solve_upper_triangular(&r12)
            .ok_or_else(|| singular("X12"))?;
        let x11 = if kx == 0 {
            DMatrix::zeros(ky, 0)
        } else {
            let r11 = y.g.columns(0, kx).into_owned() - &by2 * &x21;
            by1.solve_upper_triangular(&r11)
                .ok_or_else(|| singular("X11"))?
        };
        (x11, x12)
    };

    let mut permuted = DMatrix::zeros(m, n);
    permuted.view_mut((0, 0), (ky, kx)).copy_from(&x11);
    permuted.view_mut((0, kx), (ky, n - kx)).copy_from(&x12);
    permuted.view_mut((ky, 0), (m - ky, kx)).copy_from(&x21);
    permuted.view_mut((ky, kx), (m - ky, n - kx)).copy_from(x22);

    let mut out = DMatrix::zeros(m, n);
    for i in 0..m {
        for j in 0..n {
            out[(py[i], px[j])] = permuted[(i, j)];
        }
    }
    if !out.iter().all(|v| v.is_finite()) {
        warn!("recovered coefficients are not finite");
        return Err(singular("coefficients"));
    }
    Ok(out)
}
