#[cfg(test)]
mod tests {
    use crate::numerical::Chebop2::canonical_bc::{
        canonical_bc, nonsingular_permute, permute_columns, zero_dof,
    };
    use crate::numerical::Chebop2::chebop2_operator::{
        BoundaryValue, Chebop2, CoeffEntry, OperatorCoeffs, Side, SideCondition,
    };
    use crate::numerical::Chebop2::separable_format::{
        FactorEntry, LowRankFactorization, separable_format,
    };
    use crate::numerical::chebfun::Chebfun;
    use crate::numerical::chebfun2::Chebfun2;
    use crate::numerical::errors::SolveError;
    use crate::numerical::preferences::Preferences;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use rand::Rng;

    const SQUARE: [f64; 4] = [-1.0, 1.0, -1.0, 1.0];

    fn zero_dirichlet(op: Chebop2) -> Chebop2 {
        op.with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0))
    }

    fn max_error<F: Fn(f64, f64) -> f64>(u: &Chebfun2, exact: F) -> f64 {
        u.sample_uniform(11, 11)
            .iter()
            .map(|(x, y, v)| (v - exact(*x, *y)).abs())
            .fold(0.0, f64::max)
    }

    fn random_matrix(rows: usize, cols: usize) -> DMatrix<f64> {
        let mut rng = rand::rng();
        DMatrix::from_fn(rows, cols, |_, _| rng.random::<f64>() - 0.5)
    }

    #[test]
    fn test_poisson_polynomial_solution() {
        let op = zero_dirichlet(Chebop2::from_str(SQUARE, "u_xx + u_yy").unwrap());
        assert_eq!((op.xorder, op.yorder), (2, 2));
        let f = Chebfun2::from_fn(|x, y| 2.0 * (x * x + y * y) - 4.0, SQUARE);
        let (u, info) = op.solve(&f, &Preferences::default()).unwrap();
        let exact = |x: f64, y: f64| (1.0 - x * x) * (1.0 - y * y);
        assert!(max_error(&u, exact) < 1e-10);
        assert_eq!(info.rank, 2);
        assert!(info.resolved);
        assert!(info.xsplit && info.ysplit);
        assert!(info.warnings.is_empty());
        // boundary values
        for &t in &[-0.7, 0.0, 0.4] {
            assert!(u.eval(-1.0, t).abs() < 1e-10);
            assert!(u.eval(t, 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_precomputed_factorization_is_used() {
        // 2 u_xx + 2 u_yy given as two separable terms; the coefficient table says u_xx + u_yy
        let lap = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let unit = |k: usize| {
            (0..3)
                .map(|i| if i == k { FactorEntry::Scalar(1.0) } else { FactorEntry::Empty })
                .collect::<Vec<_>>()
        };
        let fact = LowRankFactorization {
            u: vec![unit(0), unit(2)],
            s: vec![2.0, 2.0],
            v: vec![unit(2), unit(0)],
            rank: 2,
        };
        let op = zero_dirichlet(
            Chebop2::new(SQUARE, OperatorCoeffs::Dense(lap.clone())).with_factorization(fact.clone()),
        );
        let f = Chebfun2::from_fn(|x, y| 2.0 * (x * x + y * y) - 4.0, SQUARE);
        let (u, info) = op.solve(&f, &Preferences::default()).unwrap();
        assert_eq!(info.rank, 2);
        assert!(info.resolved);
        assert!(max_error(&u, |x, y| 0.5 * (1.0 - x * x) * (1.0 - y * y)) < 1e-10);

        // three terms (u_xx split in halves) go through the Kronecker form
        let kron = LowRankFactorization {
            u: vec![unit(0), unit(0), unit(2)],
            s: vec![0.5, 0.5, 1.0],
            v: vec![unit(2), unit(2), unit(0)],
            rank: 3,
        };
        let op3 = zero_dirichlet(
            Chebop2::new(SQUARE, OperatorCoeffs::Dense(lap.clone())).with_factorization(kron),
        );
        let (u3, info3) = op3.solve(&f, &Preferences::default()).unwrap();
        assert_eq!(info3.rank, 3);
        assert!(max_error(&u3, |x, y| (1.0 - x * x) * (1.0 - y * y)) < 1e-10);
        assert_relative_eq!(u3.eval(0.5, 0.5), 0.5625, epsilon = 1e-10);

        // factors of the wrong length are rejected
        let mut short = fact;
        short.v[1].pop();
        let op = zero_dirichlet(Chebop2::new(SQUARE, OperatorCoeffs::Dense(lap)).with_factorization(short));
        assert!(matches!(
            op.solve(&f, &Preferences::default()),
            Err(SolveError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_degenerate_rectangle_is_invalid() {
        assert!(matches!(
            Chebop2::from_str([0.0, 1.0, 2.0, 2.0], "u_xx + u_yy"),
            Err(SolveError::InvalidInput(_))
        ));
        let flat = [1.0, 1.0, -1.0, 1.0];
        let op = zero_dirichlet(Chebop2::new(flat, OperatorCoeffs::Dense(DMatrix::identity(1, 1))));
        assert!(matches!(
            op.solve(&Chebfun2::zeros(flat), &Preferences::default()),
            Err(SolveError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_laplace_dense_coefficients() {
        let dom = [0.0, 1.0, 0.0, 2.0];
        let a = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let op = Chebop2::new(dom, OperatorCoeffs::Dense(a))
            .with_dirichlet_everywhere(|x, y| x * x - y * y);
        let (u, info) = op.solve(&Chebfun2::zeros(dom), &Preferences::default()).unwrap();
        assert!(max_error(&u, |x, y| x * x - y * y) < 1e-10);
        assert!(info.corner_mismatch < 1e-10);
    }

    #[test]
    fn test_rank_one_without_y_conditions() {
        // u_xx = 2 cos(y), u = x^2 cos(y); no conditions on the down and up sides
        let op = Chebop2::from_str(SQUARE, "u_xx").unwrap();
        assert_eq!(op.yorder, 0);
        let side = Chebfun::from_fn(|y| y.cos(), (-1.0, 1.0));
        let op = op
            .with_dirichlet(Side::Left, BoundaryValue::Function(side.clone()))
            .with_dirichlet(Side::Right, BoundaryValue::Function(side));
        let f = Chebfun2::from_fn(|_, y| 2.0 * y.cos(), SQUARE);
        let (u, info) = op.solve(&f, &Preferences::default()).unwrap();
        assert_eq!(info.rank, 1);
        assert!(max_error(&u, |x, y| x * x * y.cos()) < 1e-10);
    }

    #[test]
    fn test_variable_coefficient() {
        let op = zero_dirichlet(Chebop2::from_str(SQUARE, "u_xx + u_yy + x*y*u").unwrap());
        let exact = |x: f64, y: f64| (1.0 - x * x) * (1.0 - y * y);
        let f = Chebfun2::from_fn(
            |x, y| -2.0 * (1.0 - y * y) - 2.0 * (1.0 - x * x) + x * y * exact(x, y),
            SQUARE,
        );
        let (u, info) = op.solve(&f, &Preferences::default()).unwrap();
        assert_eq!(info.rank, 3);
        assert!(!info.xsplit && !info.ysplit);
        assert!(max_error(&u, exact) < 1e-10);
        // the operator applied to the solution gives back the right hand side
        let residual = op.apply(&u);
        assert_relative_eq!(residual.eval(0.3, -0.2), f.eval(0.3, -0.2), epsilon = 1e-8);
    }

    #[test]
    fn test_mixed_conditions() {
        // u = x*y + x is harmonic; Neumann data u_x = y + 1 on the right side
        let dom = [-1.0, 1.0, -1.0, 1.0];
        let op = Chebop2::from_str(dom, "(s, t, v) -> v_ss + v_tt").unwrap();
        let left = Chebfun::from_fn(|y| -y - 1.0, (-1.0, 1.0));
        let flux = Chebfun::from_fn(|y| y + 1.0, (-1.0, 1.0));
        let up = Chebfun::from_fn(|x| 2.0 * x, (-1.0, 1.0));
        let op = op
            .with_dirichlet(Side::Left, BoundaryValue::Function(left))
            .with_neumann(Side::Right, BoundaryValue::Function(flux))
            .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Function(up));
        let (u, info) = op.solve(&Chebfun2::zeros(dom), &Preferences::default()).unwrap();
        assert!(max_error(&u, |x, y| x * y + x) < 1e-10);
        assert!(info.warnings.is_empty());
    }

    #[test]
    fn test_constant_term_moves_to_rhs() {
        let op = zero_dirichlet(
            Chebop2::from_str(SQUARE, "u_xx + u_yy + 4 - 2*x^2 - 2*y^2").unwrap(),
        );
        assert!(op.constant_term.is_some());
        let (u, _) = op.solve(&Chebfun2::zeros(SQUARE), &Preferences::default()).unwrap();
        assert!(max_error(&u, |x, y| (1.0 - x * x) * (1.0 - y * y)) < 1e-10);
    }

    #[test]
    fn test_operator_text_errors() {
        assert!(matches!(
            Chebop2::from_str(SQUARE, "u*u_xx + u_yy"),
            Err(SolveError::NonlinearPde(_))
        ));
        assert!(matches!(
            Chebop2::from_str(SQUARE, "u_xx + w"),
            Err(SolveError::UnknownSymbol(_))
        ));
        assert!(matches!(
            Chebop2::from_str(SQUARE, "(x, u) -> u_xx"),
            Err(SolveError::Parse(_))
        ));
    }

    #[test]
    fn test_dependent_conditions_fail() {
        let op = Chebop2::from_str(SQUARE, "u_xx + u_yy")
            .unwrap()
            .with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Left, BoundaryValue::Constant(1.0))
            .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0));
        let f = Chebfun2::zeros(SQUARE);
        match op.solve(&f, &Preferences::default()) {
            Err(SolveError::LinearlyDependentBCs { axis }) => assert_eq!(axis, "x"),
            other => panic!("expected dependent conditions, got {:?}", other.map(|r| r.1)),
        }
    }

    #[test]
    fn test_condition_count_checked() {
        let op = Chebop2::from_str(SQUARE, "u_xx + u_yy")
            .unwrap()
            .with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0));
        match op.solve(&Chebfun2::zeros(SQUARE), &Preferences::default()) {
            Err(SolveError::BoundaryConditionCount {
                axis,
                expected,
                found,
            }) => {
                assert_eq!(axis, "y");
                assert_eq!((expected, found), (2, 1));
            }
            other => panic!("expected a count error, got {:?}", other.map(|r| r.1)),
        }
    }

    #[test]
    fn test_corner_mismatch_is_reported() {
        let op = Chebop2::from_str(SQUARE, "u_xx + u_yy")
            .unwrap()
            .with_dirichlet(Side::Left, BoundaryValue::Constant(1.0))
            .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0));
        let prefs = Preferences::default().with_dimensions_2d(9, 17);
        let (_, info) = op.solve(&Chebfun2::zeros(SQUARE), &prefs).unwrap();
        assert!(info.corner_mismatch > 1.0);
        assert!(info.warnings.iter().any(|w| w.contains("corners")));
    }

    #[test]
    fn test_degenerate_operator() {
        let tiny = DMatrix::from_element(2, 2, 1e-20);
        assert!(matches!(
            separable_format(&OperatorCoeffs::Dense(tiny), 1, 1, f64::EPSILON),
            Err(SolveError::DegenerateOperator)
        ));
        let cells = vec![vec![CoeffEntry::Empty, CoeffEntry::Scalar(1e-30)]];
        assert!(matches!(
            separable_format(&OperatorCoeffs::Variable(cells), 1, 0, f64::EPSILON),
            Err(SolveError::DegenerateOperator)
        ));
    }

    #[test]
    fn test_full_rank_table() {
        let n = 5;
        let a = random_matrix(n, n) + DMatrix::identity(n, n) * 2.0;
        let fact = separable_format(&OperatorCoeffs::Dense(a.clone()), n - 1, n - 1, f64::EPSILON)
            .unwrap();
        assert_eq!(fact.rank, n);
        assert!(fact.s.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_canonical_form_and_zero_dof_idempotence() {
        let (k, size, other) = (2, 8, 6);
        let b = random_matrix(k, size);
        let g = random_matrix(k, other);
        let perm = nonsingular_permute(&b, "y").unwrap();
        let (bc, gc) = canonical_bc(&permute_columns(&b, &perm), &g, "y").unwrap();
        for i in 0..k {
            assert_relative_eq!(bc[(i, i)], 1.0, epsilon = 1e-12);
            for j in 0..i {
                assert!(bc[(i, j)].abs() < 1e-12);
            }
        }
        let mut a_terms = vec![random_matrix(size, size), random_matrix(size, size)];
        let e_terms = vec![random_matrix(other, other), random_matrix(other, other)];
        let mut f = random_matrix(size, other);
        zero_dof(&mut a_terms, &e_terms, &mut f, &bc, &gc);
        for a in &a_terms {
            assert!(a.columns(0, k).amax() < 1e-12);
        }
        let (a_once, f_once) = (a_terms.clone(), f.clone());
        zero_dof(&mut a_terms, &e_terms, &mut f, &bc, &gc);
        for (a, a1) in a_terms.iter().zip(a_once.iter()) {
            assert!((a - a1).amax() < 1e-12);
        }
        assert!((f - f_once).amax() < 1e-12);
    }

    #[test]
    fn test_dependent_rows_have_no_window() {
        let row = [1.0, -1.0, 1.0, -1.0, 1.0];
        let b = DMatrix::from_fn(2, 5, |_, j| row[j]);
        assert!(matches!(
            nonsingular_permute(&b, "x"),
            Err(SolveError::LinearlyDependentBCs { .. })
        ));
        let cond = SideCondition {
            weights: vec![1.0],
            value: BoundaryValue::Constant(0.0),
        };
        let op = Chebop2::from_str(SQUARE, "u_x + u_y")
            .unwrap()
            .with_condition(Side::Left, cond.clone())
            .with_condition(Side::Down, cond);
        assert_eq!((op.xorder, op.yorder), (1, 1));
    }
}
