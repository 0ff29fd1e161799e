/// error type of the spectral solvers
pub mod errors;
/// solver preferences: tolerances, discretization, dimensions, damping; loaded from TOML
/// Example
/// ```
/// use RustedChebop::numerical::preferences::{Discretization, Preferences};
/// let prefs = Preferences::from_toml_str("[solver]\ndiscretization = \"collocation\"\n").unwrap();
/// assert_eq!(prefs.discretization, Discretization::Collocation);
/// ```
pub mod preferences;
/// Chebyshev points, coefficient transforms, ultraspherical and collocation operators
pub mod spectral_basis;
/// smooth functions on an interval represented by Chebyshev coefficients
pub mod chebfun;
/// smooth functions on a rectangle, tensor Chebyshev coefficients and low rank splitting
pub mod chebfun2;
/// linear PDEs on a rectangle: low rank operator splitting, matrix equation, boundary elimination
pub mod Chebop2;
/// ordinary boundary value problems: linear spectral solve and damped Newton iteration
pub mod BVP_Spectral;
/// problems with exact solutions used in tests and benchmarks
pub mod Examples_and_utils;
