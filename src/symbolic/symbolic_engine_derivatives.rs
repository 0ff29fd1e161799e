//! # Symbolic Engine Derivatives Module
//!
//! Analytical differentiation of `Expr` trees. Linearization of differential operators relies on
//! it: the Fréchet derivative of an operator with respect to `u^(k)` is the partial derivative of
//! its expression with respect to the symbol of that derivative.
use crate::symbolic::symbolic_engine::Expr;

impl Expr {
    /// Computes the analytical derivative of the expression with respect to a variable.
    ///
    /// Power rule, product rule, quotient rule and chain rule; for `f^g` with an exponent that
    /// depends on `var` the general rule `f^g (g' ln f + g f'/f)` is used.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let x = Expr::Var("x".to_string());
    /// let f = x.clone().pow(Expr::Const(2.0)); // x^2
    /// let df_dx = f.diff("x"); // 2*x
    /// ```
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Var(name) => {
                if name == var {
                    Expr::Const(1.0)
                } else {
                    Expr::Const(0.0)
                }
            }
            Expr::Const(_) => Expr::Const(0.0),
            Expr::Add(lhs, rhs) => Expr::Add(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Sub(lhs, rhs) => Expr::Sub(Box::new(lhs.diff(var)), Box::new(rhs.diff(var))),
            Expr::Mul(lhs, rhs) => Expr::Add(
                Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                Box::new(Expr::Mul(lhs.clone(), Box::new(rhs.diff(var)))),
            ),
            Expr::Div(lhs, rhs) => Expr::Div(
                Box::new(Expr::Sub(
                    Box::new(Expr::Mul(Box::new(lhs.diff(var)), rhs.clone())),
                    Box::new(Expr::Mul(Box::new(rhs.diff(var)), lhs.clone())),
                )),
                Box::new(Expr::Mul(rhs.clone(), rhs.clone())),
            ),
            Expr::Pow(base, exp) if !exp.contains_variable(var) => Expr::Mul(
                Box::new(Expr::Mul(
                    exp.clone(),
                    Box::new(Expr::Pow(
                        base.clone(),
                        Box::new(Expr::Sub(exp.clone(), Box::new(Expr::Const(1.0)))),
                    )),
                )),
                Box::new(base.diff(var)),
            ),
            Expr::Pow(base, exp) => Expr::Mul(
                Box::new(self.clone()),
                Box::new(Expr::Add(
                    Box::new(Expr::Mul(
                        Box::new(exp.diff(var)),
                        Box::new(Expr::Ln(base.clone())),
                    )),
                    Box::new(Expr::Div(
                        Box::new(Expr::Mul(exp.clone(), Box::new(base.diff(var)))),
                        base.clone(),
                    )),
                )),
            ),
            Expr::Exp(expr) => {
                Expr::Mul(Box::new(Expr::Exp(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::Ln(expr) => Expr::Div(Box::new(expr.diff(var)), expr.clone()),
            Expr::sin(expr) => {
                Expr::Mul(Box::new(Expr::cos(expr.clone())), Box::new(expr.diff(var)))
            }
            Expr::cos(expr) => Expr::Mul(
                Box::new(Expr::Mul(
                    Box::new(Expr::Const(-1.0)),
                    Box::new(Expr::sin(expr.clone())),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::tg(expr) => Expr::Mul(
                Box::new(Expr::Div(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(
                        Box::new(Expr::cos(expr.clone())),
                        Box::new(Expr::Const(2.0)),
                    )),
                )),
                Box::new(expr.diff(var)),
            ),
            Expr::arctg(expr) => Expr::Div(
                Box::new(expr.diff(var)),
                Box::new(Expr::Add(
                    Box::new(Expr::Const(1.0)),
                    Box::new(Expr::Pow(expr.clone(), Box::new(Expr::Const(2.0)))),
                )),
            ),
        }
    } // end of diff

    /// derivative followed by simplification
    pub fn diff_simplified(&self, var: &str) -> Expr {
        self.diff(var).simplify()
    }

    /// partial derivatives with respect to each of `vars`
    pub fn diff_multi_args(&self, vars: &[&str]) -> Vec<Expr> {
        vars.iter().map(|v| self.diff_simplified(v)).collect()
    }

    /// Evaluates the expression directly, `vars` and `values` aligned.
    /// Variables absent from `vars` evaluate to NaN.
    pub fn eval_expression(&self, vars: &[&str], values: &[f64]) -> f64 {
        match self {
            Expr::Var(name) => match vars.iter().position(|v| v == name) {
                Some(i) => values[i],
                None => f64::NAN,
            },
            Expr::Const(val) => *val,
            Expr::Add(l, r) => l.eval_expression(vars, values) + r.eval_expression(vars, values),
            Expr::Sub(l, r) => l.eval_expression(vars, values) - r.eval_expression(vars, values),
            Expr::Mul(l, r) => l.eval_expression(vars, values) * r.eval_expression(vars, values),
            Expr::Div(l, r) => l.eval_expression(vars, values) / r.eval_expression(vars, values),
            Expr::Pow(b, e) => b
                .eval_expression(vars, values)
                .powf(e.eval_expression(vars, values)),
            Expr::Exp(e) => e.eval_expression(vars, values).exp(),
            Expr::Ln(e) => e.eval_expression(vars, values).ln(),
            Expr::sin(e) => e.eval_expression(vars, values).sin(),
            Expr::cos(e) => e.eval_expression(vars, values).cos(),
            Expr::tg(e) => e.eval_expression(vars, values).tan(),
            Expr::arctg(e) => e.eval_expression(vars, values).atan(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    #[test]
    fn test_diff_rules() {
        // d/dx (x^3 + sin(x)) = 3x^2 + cos(x)
        let f = var("x").pow(Expr::Const(3.0)) + Expr::sin(var("x").boxed());
        let df = f.diff_simplified("x");
        let v = df.eval_expression(&["x"], &[0.5]);
        assert_relative_eq!(v, 3.0 * 0.25 + 0.5f64.cos(), epsilon = 1e-14);
        // quotient rule
        let g = var("x") / (Expr::Const(1.0) + var("x"));
        let dg = g.diff("x").eval_expression(&["x"], &[2.0]);
        assert_relative_eq!(dg, 1.0 / 9.0, epsilon = 1e-14);
    }

    #[test]
    fn test_partial_derivatives_of_operator() {
        // F = u'' + x*u^2 ; dF/du'' = 1, dF/du = 2xu, dF/du' = 0
        let f = var("u''") + var("x") * var("u").pow(Expr::Const(2.0));
        let parts = f.diff_multi_args(&["u''", "u'", "u"]);
        assert_eq!(parts[0], Expr::Const(1.0));
        assert_eq!(parts[1], Expr::Const(0.0));
        assert_relative_eq!(parts[2].eval_expression(&["x", "u"], &[2.0, 3.0]), 12.0);
    }

    #[test]
    fn test_general_power_rule() {
        // d/dx x^x = x^x (ln x + 1)
        let f = var("x").pow(var("x"));
        let d = f.diff("x").eval_expression(&["x"], &[2.0]);
        assert_relative_eq!(d, 4.0 * (2f64.ln() + 1.0), epsilon = 1e-12);
    }
}
