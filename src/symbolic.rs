/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedChebop::symbolic::symbolic_engine::Expr;
/// let parsed_expression = Expr::parse_expression("u'' + x*u^2").unwrap();
/// let df = parsed_expression.diff_simplified("u");
/// println!("dF/du = {}", df);
/// ```
/// ________________________________________________________________________________________________________________________________
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// 1) symbolic expression tree, substitution and simplification
/// 2) analytical derivatives
/// 3) compilation of symbolic expressions into fast evaluable trees
///# Example
/// ```
/// use RustedChebop::symbolic::symbolic_engine::Expr;
/// let f = Expr::parse_expression("exp(x)+ln(y)").unwrap();
/// let df_dx = f.diff("x");
/// let lambda = df_dx.compile(&["x", "y"]).unwrap();
/// assert!((lambda.eval(&[0.0, 1.0]) - 1.0).abs() < 1e-14);
/// ```
/// ________________________________________________________________________________________________________________________________________________
pub mod symbolic_engine;
pub mod symbolic_engine_derivatives;
pub mod symbolic_lambdify;
