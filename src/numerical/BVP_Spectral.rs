mod BVP_Spectral_tests;

/// operator text, boundary conditions and resolution of the unknowns
/// Example
/// ```
/// use RustedChebop::numerical::BVP_Spectral::chebop::Chebop;
/// use RustedChebop::numerical::BVP_Spectral::solvebvp::Rhs;
/// use RustedChebop::numerical::preferences::Preferences;
/// // u'' = 6x, u(0) = 0, u(1) = 1  ->  u = x^3
/// let op = Chebop::new((0.0, 1.0), "(x, u) -> u''").unwrap()
///     .with_lbc("u")
///     .with_rbc("u - 1");
/// let rhs = Rhs::Function(RustedChebop::numerical::chebfun::Chebfun::from_fn(|x| 6.0 * x, (0.0, 1.0)));
/// let (sol, info) = op.solve(&rhs, &Preferences::default()).unwrap();
/// assert!(info.flags.all);
/// assert!((sol.as_single().unwrap().eval(0.5) - 0.125).abs() < 1e-10);
/// ```
pub mod chebop;
/// observers of the Newton iteration
pub mod display;
/// adaptive ultraspherical / collocation solve of linear ODE systems
pub mod linear_solver;
pub mod linearize;
/// damped Newton iteration
pub mod NR_Damp_spectral;
/// dispatch between linear, nonlinear and 2-D problems
pub mod solvebvp;
