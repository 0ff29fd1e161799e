//! Compilation of `Expr` into a `Lambda` tree with variables resolved to argument positions.
//! Coefficients of linearized operators are evaluated at thousands of Chebyshev points, so name
//! lookup is done once at compile time.
use crate::symbolic::symbolic_engine::Expr;

#[derive(Debug, Clone)]
pub enum Lambda {
    Var(usize),
    Const(f64),
    Add(Box<Lambda>, Box<Lambda>),
    Sub(Box<Lambda>, Box<Lambda>),
    Mul(Box<Lambda>, Box<Lambda>),
    Div(Box<Lambda>, Box<Lambda>),
    Pow(Box<Lambda>, Box<Lambda>),
    Exp(Box<Lambda>),
    Ln(Box<Lambda>),
    Sin(Box<Lambda>),
    Cos(Box<Lambda>),
    Tg(Box<Lambda>),
    ArcTg(Box<Lambda>),
}

impl Expr {
    /// compile with `vars` as the argument order; an unlisted variable is an error
    pub fn compile(&self, vars: &[&str]) -> Result<Lambda, String> {
        let c = |e: &Expr| e.compile(vars).map(Box::new);
        Ok(match self {
            Expr::Var(name) => {
                let idx = vars
                    .iter()
                    .position(|&v| v == name)
                    .ok_or_else(|| name.clone())?;
                Lambda::Var(idx)
            }
            Expr::Const(v) => Lambda::Const(*v),
            Expr::Add(a, b) => Lambda::Add(c(a)?, c(b)?),
            Expr::Sub(a, b) => Lambda::Sub(c(a)?, c(b)?),
            Expr::Mul(a, b) => Lambda::Mul(c(a)?, c(b)?),
            Expr::Div(a, b) => Lambda::Div(c(a)?, c(b)?),
            Expr::Pow(a, b) => Lambda::Pow(c(a)?, c(b)?),
            Expr::Exp(e) => Lambda::Exp(c(e)?),
            Expr::Ln(e) => Lambda::Ln(c(e)?),
            Expr::sin(e) => Lambda::Sin(c(e)?),
            Expr::cos(e) => Lambda::Cos(c(e)?),
            Expr::tg(e) => Lambda::Tg(c(e)?),
            Expr::arctg(e) => Lambda::ArcTg(c(e)?),
        })
    }

    /// closure of the arguments `vars`
    pub fn lambdify_borrowed_thread_safe(
        &self,
        vars: &[&str],
    ) -> Result<Box<dyn Fn(&[f64]) -> f64 + Send + Sync>, String> {
        let lambda = self.compile(vars)?;
        Ok(Box::new(lambda.as_closure()))
    }
}

impl Lambda {
    #[inline(always)]
    pub fn eval(&self, args: &[f64]) -> f64 {
        match self {
            Lambda::Var(i) => args[*i],
            Lambda::Const(v) => *v,
            Lambda::Add(a, b) => a.eval(args) + b.eval(args),
            Lambda::Sub(a, b) => a.eval(args) - b.eval(args),
            Lambda::Mul(a, b) => a.eval(args) * b.eval(args),
            Lambda::Div(a, b) => a.eval(args) / b.eval(args),
            Lambda::Pow(a, b) => {
                let base = a.eval(args);
                match b.as_ref() {
                    // integer exponents keep negative bases real
                    Lambda::Const(p) if p.fract() == 0.0 && p.abs() < 64.0 => base.powi(*p as i32),
                    _ => base.powf(b.eval(args)),
                }
            }
            Lambda::Exp(e) => e.eval(args).exp(),
            Lambda::Ln(e) => e.eval(args).ln(),
            Lambda::Sin(e) => e.eval(args).sin(),
            Lambda::Cos(e) => e.eval(args).cos(),
            Lambda::Tg(e) => e.eval(args).tan(),
            Lambda::ArcTg(e) => e.eval(args).atan(),
        }
    }

    pub fn as_closure(self) -> impl Fn(&[f64]) -> f64 + Send + Sync {
        move |args| self.eval(args)
    }
}
