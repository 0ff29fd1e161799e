//! examples of usage of RustedChebop
/// ODE boundary value problems and PDEs on rectangles
pub mod bvp_examples;
