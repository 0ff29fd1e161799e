//! some linear algebra functions used throughout the code
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
/// dense LU solvers (nalgebra, faer)
pub mod LUsolver;
/// diagnostics for linear systems and matrices: numerical rank, conditioning
pub mod linear_sys_diagnostics;
/// generalized Sylvester equations of the 2-D spectral discretizations
pub mod matrix_equation;
