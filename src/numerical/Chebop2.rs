mod Chebop2_tests;

/// boundary condition discretization, canonical form, elimination and recovery
pub mod canonical_bc;
/// Example
/// ```
/// use RustedChebop::numerical::Chebop2::chebop2_operator::{Chebop2, Side, BoundaryValue};
/// use RustedChebop::numerical::chebfun2::Chebfun2;
/// use RustedChebop::numerical::preferences::Preferences;
/// // Poisson equation on the unit square with zero boundary values
/// let dom = [-1.0, 1.0, -1.0, 1.0];
/// let op = Chebop2::from_str(dom, "u_xx + u_yy").unwrap()
///     .with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
///     .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
///     .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
///     .with_dirichlet(Side::Up, BoundaryValue::Constant(0.0));
/// let f = Chebfun2::from_fn(|x, y| 2.0 * (x * x + y * y) - 4.0, dom);
/// let (u, _info) = op.solve(&f, &Preferences::default()).unwrap();
/// assert!((u.eval(0.0, 0.0) - 1.0).abs() < 1e-10);
/// ```
pub mod chebop2_operator;
/// adaptive m x n driver
pub mod construct_discretisation;
pub mod matrix_equation_builder;
/// low rank splitting of the coefficient table
pub mod separable_format;
