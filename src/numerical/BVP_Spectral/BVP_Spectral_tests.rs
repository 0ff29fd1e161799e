#[cfg(test)]
mod tests {
    use crate::numerical::BVP_Spectral::NR_Damp_spectral::TerminationReason;
    use crate::numerical::BVP_Spectral::chebop::Chebop;
    use crate::numerical::BVP_Spectral::display::{NoDisplay, RecordingDisplay};
    use crate::numerical::BVP_Spectral::solvebvp::{BvpOperator, Rhs, Solution, solve};
    use crate::numerical::Chebop2::chebop2_operator::{BoundaryValue, Chebop2, Side};
    use crate::numerical::chebfun::Chebfun;
    use crate::numerical::chebfun2::Chebfun2;
    use crate::numerical::errors::SolveError;
    use crate::numerical::preferences::{Discretization, Preferences};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;
    use std::f64::consts::PI;

    fn grid(domain: (f64, f64), n: usize) -> Vec<f64> {
        (0..=n)
            .map(|i| domain.0 + (domain.1 - domain.0) * i as f64 / n as f64)
            .collect()
    }

    fn max_error<F: Fn(f64) -> f64>(u: &Chebfun, exact: F) -> f64 {
        grid(u.domain, 50)
            .into_iter()
            .map(|x| (u.eval(x) - exact(x)).abs())
            .fold(0.0, f64::max)
    }

    /// update norms strictly decrease once the full Newton steps begin
    fn assert_tail_decreasing(update_norms: &[f64], damping: &[f64]) {
        let start = damping.iter().rposition(|&l| l < 1.0).map_or(0, |k| k + 1);
        let tail = &update_norms[start.min(update_norms.len())..];
        assert!(tail.len() >= 2, "undamped tail too short: {:?}", update_norms);
        for w in tail.windows(2) {
            assert!(w[1] < w[0], "update norms not decreasing: {:?}", update_norms);
        }
    }

    #[test]
    fn test_exponential_both_discretizations() {
        let op = Chebop::new((0.0, 1.0), "(x, u) -> u' - u")
            .unwrap()
            .with_lbc("u - 1");
        for disc in [Discretization::Ultraspherical, Discretization::Collocation] {
            let prefs = Preferences::default().with_discretization(disc);
            let (sol, info) = op.solve(&Rhs::Zero, &prefs).unwrap();
            assert!(info.flags.all);
            assert!(info.termination.is_none());
            let u = sol.as_single().unwrap();
            assert!(max_error(u, f64::exp) < 1e-10);
            assert_relative_eq!(u.eval(0.0), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cubic_from_function_rhs() {
        let domain = (-1.0, 2.0);
        let op = Chebop::new(domain, "(x, u) -> u''")
            .unwrap()
            .with_lbc("u + 1")
            .with_rbc("u - 8");
        let rhs = Rhs::Function(Chebfun::from_fn(|x| 6.0 * x, domain));
        let (sol, info) = op.solve(&rhs, &Preferences::default()).unwrap();
        assert!(info.converged);
        assert!(info.residual_norm < 1e-9);
        assert!(max_error(sol.as_single().unwrap(), |x| x * x * x) < 1e-10);
    }

    #[test]
    fn test_harmonic_system() {
        let domain = (0.0, PI);
        let op = Chebop::new(domain, "(x, u, v) -> u' - v; v' + u")
            .unwrap()
            .with_lbc("u; v - 1");
        for disc in [Discretization::Ultraspherical, Discretization::Collocation] {
            let prefs = Preferences::default().with_discretization(disc);
            let (sol, info) = op.solve(&Rhs::Zero, &prefs).unwrap();
            assert_eq!(info.num_vars, 2);
            let Solution::Composite(parts) = sol else {
                panic!("a system returns its components")
            };
            assert!(max_error(&parts[0], f64::sin) < 1e-10);
            assert!(max_error(&parts[1], f64::cos) < 1e-10);
        }
    }

    #[test]
    fn test_indexed_unknowns() {
        let domain = (0.0, 1.0);
        let op = Chebop::new(domain, "(x, y) -> y[1]' - y[2]; y[2]' - y[1]")
            .unwrap()
            .with_lbc("y[1] - 1")
            .with_rbc("y[2] - 1.1752011936438014");
        let (sol, _) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
        let parts = sol.components();
        // y1 = cosh(x), y2 = sinh(x)
        assert!(max_error(&parts[0], f64::cosh) < 1e-10);
        assert!(max_error(&parts[1], f64::sinh) < 1e-10);
    }

    #[test]
    fn test_gaussian_with_logarithmic_nonlinearity() {
        // y'' = -2 (1 + 2 ln y) y, exact exp(-x^2)
        let op = Chebop::new((0.0, 1.0), "(x, y) -> y'' + 2*(1 + 2*ln(y))*y")
            .unwrap()
            .with_lbc("y - 1")
            .with_rbc("y - exp(-1)");
        let (sol, info) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
        assert!(!info.flags.op);
        assert!(info.converged);
        assert_eq!(info.termination, Some(TerminationReason::Converged));
        assert!(info.iterations <= 20);
        assert!(info.residual_norm < 1e-7);
        assert!(max_error(sol.as_single().unwrap(), |x| (-x * x).exp()) < 1e-8);
        assert_eq!(info.update_norms.len(), info.iterations);
        assert_eq!(info.damping.len(), info.iterations);
    }

    #[test]
    fn test_cubic_nonlinearity_undamped_and_collocation() {
        // u'' = 2 u^3, exact 1/(x+1)
        let op = Chebop::new((0.0, 1.0), "(x, u) -> u'' - 2*u^3")
            .unwrap()
            .with_lbc("u - 1")
            .with_rbc("u - 0.5");
        let exact = |x: f64| 1.0 / (x + 1.0);
        let prefs = Preferences::default().with_damping(false);
        let (sol, info) = op.solve(&Rhs::Zero, &prefs).unwrap();
        assert!(info.converged);
        assert!(info.damping.iter().all(|&l| l == 1.0));
        assert!(max_error(sol.as_single().unwrap(), exact) < 1e-8);

        let prefs = Preferences::default().with_discretization(Discretization::Collocation);
        let (sol, info) = op.solve(&Rhs::Zero, &prefs).unwrap();
        assert!(info.converged);
        assert!(max_error(sol.as_single().unwrap(), exact) < 1e-8);
    }

    #[test]
    fn test_autonomous_quadratic() {
        // u'' + u^2 = 0, exact -6/(x+2)^2
        let op = Chebop::new((0.0, 1.0), "u -> u'' + u^2")
            .unwrap()
            .with_lbc("u + 1.5")
            .with_rbc("u + 6/9");
        let mut observer = RecordingDisplay::default();
        let (sol, info) = solve(
            BvpOperator::Ode(&op),
            &Rhs::Zero,
            &Preferences::default(),
            &mut observer,
        )
        .unwrap();
        assert!(info.converged);
        let exact = |x: f64| -6.0 / ((x + 2.0) * (x + 2.0));
        assert!(max_error(sol.as_single().unwrap(), exact) < 1e-8);
        assert_eq!(observer.started, (1..=info.iterations).collect::<Vec<_>>());
        assert_eq!(observer.update_norms, info.update_norms);
        assert_tail_decreasing(&observer.update_norms, &info.damping);
    }

    #[test]
    fn test_quadratic_dirichlet_from_zero_guess() {
        // u'' + u^2 = 0, u(-1) = u(1) = 0 is solved by u = 0
        let domain = (-1.0, 1.0);
        let op = Chebop::new(domain, "(x, u) -> u'' + u^2")
            .unwrap()
            .with_lbc("u")
            .with_rbc("u")
            .with_init(vec![Chebfun::zeros(domain)]);
        let (sol, info) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
        assert!(info.converged);
        assert!(info.iterations <= 20);
        assert!(info.residual_norm < 1e-10);
        assert!(max_error(sol.as_single().unwrap(), |_| 0.0) < 1e-10);

        // with a forcing term the iteration has a real tail: u = 1 - x^2
        let f = Chebfun::from_fn(|x| -2.0 + (1.0 - x * x).powi(2), domain);
        let (sol, info) = op.solve(&Rhs::Function(f), &Preferences::default()).unwrap();
        assert!(info.converged);
        assert!(info.iterations <= 20);
        assert!(info.residual_norm < 1e-10);
        assert!(max_error(sol.as_single().unwrap(), |x| 1.0 - x * x) < 1e-10);
        assert_tail_decreasing(&info.update_norms, &info.damping);
    }

    #[test]
    fn test_initial_guess_is_used_and_checked() {
        let domain = (0.0, 1.0);
        let op = Chebop::new(domain, "(x, u) -> u'' - 2*u^3")
            .unwrap()
            .with_lbc("u - 1")
            .with_rbc("u - 0.5")
            .with_init(vec![Chebfun::from_fn(|x| 1.0 / (x + 1.0) + 0.01 * x * (1.0 - x), domain)]);
        let (sol, info) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
        assert!(info.converged);
        assert!(max_error(sol.as_single().unwrap(), |x| 1.0 / (x + 1.0)) < 1e-8);

        let op = Chebop::new(domain, "(x, u, v) -> u' - v^2; v' + u")
            .unwrap()
            .with_lbc("u; v - 1")
            .with_init(vec![Chebfun::zeros(domain)]);
        assert!(matches!(
            op.solve(&Rhs::Zero, &Preferences::default()),
            Err(SolveError::DimensionMismatch { expected: (2, 1), found: (1, 1), .. })
        ));
    }

    #[test]
    fn test_iteration_cap_is_recoverable() {
        let op = Chebop::new((0.0, 1.0), "(x, y) -> y'' + 2*(1 + 2*ln(y))*y")
            .unwrap()
            .with_lbc("y - 1")
            .with_rbc("y - exp(-1)");
        let prefs = Preferences::default().with_max_iterations(1);
        let (sol, info) = op.solve(&Rhs::Zero, &prefs).unwrap();
        assert!(!info.converged);
        assert_eq!(info.termination, Some(TerminationReason::MaxIterations));
        assert_eq!(info.iterations, 1);
        assert!(!info.warnings.is_empty());
        assert!(sol.as_single().is_some());
    }

    #[test]
    fn test_rhs_reshape_and_mismatch() {
        let op = Chebop::new((0.0, 1.0), "(x, u, v) -> u' - v; v' + u")
            .unwrap()
            .with_lbc("u; v - 1");
        let row = Rhs::Numeric(DMatrix::from_row_slice(1, 2, &[0.0, 0.0]));
        let (sol, info) = op.solve(&row, &Preferences::default()).unwrap();
        assert!(info.warnings.iter().any(|w| w.contains("transposed")));
        assert!(max_error(&sol.components()[0], f64::sin) < 1e-10);

        let wrong = Rhs::Numeric(DMatrix::zeros(3, 1));
        assert!(matches!(
            op.solve(&wrong, &Preferences::default()),
            Err(SolveError::DimensionMismatch { found: (3, 1), .. })
        ));
    }

    #[test]
    fn test_unknown_count_warning_without_header() {
        let op = Chebop::new((0.0, 1.0), "u'' + u")
            .unwrap()
            .with_lbc("u")
            .with_rbc("u - 1");
        let (sol, info) = solve(
            BvpOperator::Ode(&op),
            &Rhs::Zero,
            &Preferences::default(),
            &mut NoDisplay,
        )
        .unwrap();
        assert_eq!(info.num_vars, 1);
        assert_eq!(info.warnings.len(), 1);
        let exact = |x: f64| x.sin() / 1f64.sin();
        assert!(max_error(sol.as_single().unwrap(), exact) < 1e-10);
        // the caller's operator keeps its (absent) argument list
        assert!(op.args.is_empty());
    }

    #[test]
    fn test_condition_count_and_interior_point() {
        let op = Chebop::new((0.0, 1.0), "(x, u) -> u''")
            .unwrap()
            .with_lbc("u");
        assert!(matches!(
            op.solve(&Rhs::Zero, &Preferences::default()),
            Err(SolveError::BoundaryConditionCount { expected: 2, found: 1, .. })
        ));
        // u'' = 0 with u(0) = 0 and u(0.5) = 1  ->  u = 2x
        let op = op.with_bc(0.5, "u - 1");
        let (sol, _) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
        assert_relative_eq!(sol.as_single().unwrap().eval(0.8), 1.6, epsilon = 1e-10);
    }

    #[test]
    fn test_pde_dispatch() {
        let dom = [-1.0, 1.0, -1.0, 1.0];
        let op = Chebop2::from_str(dom, "(x, y, u) -> u_xx + u_yy")
            .unwrap()
            .with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
            .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0));
        let f = Chebfun2::from_fn(|x, y| -2.0 * (1.0 - y * y) - 2.0 * (1.0 - x * x), dom);
        let (sol, info) = solve(
            BvpOperator::Pde(&op),
            &Rhs::Field(f),
            &Preferences::default(),
            &mut NoDisplay,
        )
        .unwrap();
        assert!(info.flags.all);
        let pde = info.pde.unwrap();
        assert_eq!(pde.rank, 2);
        let u = sol.as_field().unwrap();
        for &(x, y) in &[(0.0, 0.0), (0.3, -0.6), (-0.9, 0.2)] {
            assert_relative_eq!(
                u.eval(x, y),
                (1.0 - x * x) * (1.0 - y * y),
                epsilon = 1e-10
            );
        }
        assert!(matches!(
            solve(
                BvpOperator::Pde(&op),
                &Rhs::Composite(vec![]),
                &Preferences::default(),
                &mut NoDisplay
            ),
            Err(SolveError::DimensionMismatch { .. })
        ));
    }
}
