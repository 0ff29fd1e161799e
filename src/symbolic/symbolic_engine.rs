//! # Symbolic Engine Module
//!
//! Symbolic expressions used to describe differential operators and boundary conditions.
//! Operators arrive as text (`"u'' + x*u^2"`), are parsed into an `Expr` tree and then
//! differentiated analytically with respect to every unknown and each of its derivatives.
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)`; derivative symbols are ordinary variables with primes
//!   (`u'`, `u''`) or 2-D subscripts (`u_xx`)
//! - **Constants**: `Const(f64)`
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow`
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, `tg`, `arctg`
//!
//! ### Key Methods
//! - `Symbols(symbols: &str)` - create several variables from a comma separated string
//! - `IndexedVar(index, name)` - indexed unknowns `u[0]`, `u[1]`
//! - `diff(var)` - analytical derivative (see `symbolic_engine_derivatives`)
//! - `simplify()` - constant folding and algebraic identities
//! - `set_variable()`, `substitute_variable()` - substitution
//! - `compile()` - conversion into an evaluable `Lambda` (see `symbolic_lambdify`)
#![allow(non_camel_case_types)]

use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Core symbolic expression enum: an abstract syntax tree with boxed children.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "u", "u''", "u[1]'")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    sin(Box<Expr>),
    cos(Box<Expr>),
    /// tangent, mathematical notation 'tg'
    tg(Box<Expr>),
    /// arctangent, mathematical notation 'arctg'
    arctg(Box<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), self.boxed())
    }
}

impl Expr {
    /// create variables from a comma separated string: "x, u, v"
    pub fn Symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Expr::Var(s.to_string()))
            .collect()
    }

    /// indexed unknown `name[index]`
    pub fn IndexedVar(index: usize, var_name: &str) -> Expr {
        Expr::Var(format!("{}[{}]", var_name, index))
    }

    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(v) if *v == 0.0)
    }

    /// value of a constant expression
    pub fn as_const(&self) -> Option<f64> {
        match self {
            Expr::Const(v) => Some(*v),
            _ => None,
        }
    }

    fn map_children(&self, f: &dyn Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(l, r) => Expr::Add(f(l).boxed(), f(r).boxed()),
            Expr::Sub(l, r) => Expr::Sub(f(l).boxed(), f(r).boxed()),
            Expr::Mul(l, r) => Expr::Mul(f(l).boxed(), f(r).boxed()),
            Expr::Div(l, r) => Expr::Div(f(l).boxed(), f(r).boxed()),
            Expr::Pow(l, r) => Expr::Pow(f(l).boxed(), f(r).boxed()),
            Expr::Exp(e) => Expr::Exp(f(e).boxed()),
            Expr::Ln(e) => Expr::Ln(f(e).boxed()),
            Expr::sin(e) => Expr::sin(f(e).boxed()),
            Expr::cos(e) => Expr::cos(f(e).boxed()),
            Expr::tg(e) => Expr::tg(f(e).boxed()),
            Expr::arctg(e) => Expr::arctg(f(e).boxed()),
        }
    }

    /// replace every occurrence of `var` by `expr`
    pub fn substitute_variable(&self, var: &str, expr: &Expr) -> Expr {
        match self {
            Expr::Var(name) if name == var => expr.clone(),
            _ => self.map_children(&|e| e.substitute_variable(var, expr)),
        }
    }

    /// replace `var` by a constant
    pub fn set_variable(&self, var: &str, value: f64) -> Expr {
        self.substitute_variable(var, &Expr::Const(value))
    }

    pub fn set_variable_from_map(&self, var_map: &HashMap<String, f64>) -> Expr {
        match self {
            Expr::Var(name) => match var_map.get(name) {
                Some(v) => Expr::Const(*v),
                None => self.clone(),
            },
            _ => self.map_children(&|e| e.set_variable_from_map(var_map)),
        }
    }

    pub fn rename_variable(&self, old_var: &str, new_var: &str) -> Expr {
        self.substitute_variable(old_var, &Expr::Var(new_var.to_string()))
    }

    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => l.contains_variable(var_name) || r.contains_variable(var_name),
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::arctg(e) => e.contains_variable(var_name),
        }
    }

    /// true when any of `vars` occurs in the expression
    pub fn contains_any(&self, vars: &[String]) -> bool {
        vars.iter().any(|v| self.contains_variable(v))
    }

    fn collect_variables(&self, acc: &mut BTreeSet<String>) {
        match self {
            Expr::Var(name) => {
                acc.insert(name.clone());
            }
            Expr::Const(_) => {}
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Pow(l, r) => {
                l.collect_variables(acc);
                r.collect_variables(acc);
            }
            Expr::Exp(e)
            | Expr::Ln(e)
            | Expr::sin(e)
            | Expr::cos(e)
            | Expr::tg(e)
            | Expr::arctg(e) => e.collect_variables(acc),
        }
    }

    /// sorted names of all variables of the expression
    pub fn all_arguments_are_variables(&self) -> Vec<String> {
        let mut acc = BTreeSet::new();
        self.collect_variables(&mut acc);
        acc.into_iter().collect()
    }

    /// Constant folding plus the usual identities: `x + 0 = x`, `x * 1 = x`, `0 * x = 0`,
    /// `x ^ 1 = x`, `x ^ 0 = 1`, `x / 1 = x`, `0 / x = 0`, and folding of functions of constants.
    pub fn simplify(&self) -> Expr {
        match self {
            Expr::Var(_) | Expr::Const(_) => self.clone(),
            Expr::Add(lhs, rhs) => match (lhs.simplify(), rhs.simplify()) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a + b),
                (Expr::Const(a), e) | (e, Expr::Const(a)) if a == 0.0 => e,
                (l, r) => Expr::Add(l.boxed(), r.boxed()),
            },
            Expr::Sub(lhs, rhs) => match (lhs.simplify(), rhs.simplify()) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a - b),
                (e, Expr::Const(b)) if b == 0.0 => e,
                (Expr::Const(a), e) if a == 0.0 => Expr::Mul(Expr::Const(-1.0).boxed(), e.boxed()),
                (l, r) if l == r => Expr::Const(0.0),
                (l, r) => Expr::Sub(l.boxed(), r.boxed()),
            },
            Expr::Mul(lhs, rhs) => match (lhs.simplify(), rhs.simplify()) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a * b),
                (Expr::Const(a), _) | (_, Expr::Const(a)) if a == 0.0 => Expr::Const(0.0),
                (Expr::Const(a), e) | (e, Expr::Const(a)) if a == 1.0 => e,
                // c1 * (c2 * e) = (c1 c2) * e
                (Expr::Const(a), Expr::Mul(inner_l, inner_r))
                    if matches!(*inner_l, Expr::Const(_)) =>
                {
                    let b = inner_l.as_const().unwrap_or(1.0);
                    Expr::Mul(Expr::Const(a * b).boxed(), inner_r)
                }
                (e, Expr::Const(a)) => Expr::Mul(Expr::Const(a).boxed(), e.boxed()),
                (l, r) => Expr::Mul(l.boxed(), r.boxed()),
            },
            Expr::Div(lhs, rhs) => match (lhs.simplify(), rhs.simplify()) {
                (Expr::Const(a), Expr::Const(b)) if b != 0.0 => Expr::Const(a / b),
                (Expr::Const(a), _) if a == 0.0 => Expr::Const(0.0),
                (e, Expr::Const(b)) if b == 1.0 => e,
                (l, r) if l == r => Expr::Const(1.0),
                (l, r) => Expr::Div(l.boxed(), r.boxed()),
            },
            Expr::Pow(base, exp) => match (base.simplify(), exp.simplify()) {
                (Expr::Const(a), Expr::Const(b)) => Expr::Const(a.powf(b)),
                (_, Expr::Const(b)) if b == 0.0 => Expr::Const(1.0),
                (e, Expr::Const(b)) if b == 1.0 => e,
                (Expr::Const(a), _) if a == 1.0 => Expr::Const(1.0),
                (l, r) => Expr::Pow(l.boxed(), r.boxed()),
            },
            Expr::Exp(e) => match e.simplify() {
                Expr::Const(a) => Expr::Const(a.exp()),
                Expr::Ln(inner) => *inner,
                s => Expr::Exp(s.boxed()),
            },
            Expr::Ln(e) => match e.simplify() {
                Expr::Const(a) if a > 0.0 => Expr::Const(a.ln()),
                Expr::Exp(inner) => *inner,
                s => Expr::Ln(s.boxed()),
            },
            Expr::sin(e) => match e.simplify() {
                Expr::Const(a) => Expr::Const(a.sin()),
                s => Expr::sin(s.boxed()),
            },
            Expr::cos(e) => match e.simplify() {
                Expr::Const(a) => Expr::Const(a.cos()),
                s => Expr::cos(s.boxed()),
            },
            Expr::tg(e) => match e.simplify() {
                Expr::Const(a) => Expr::Const(a.tan()),
                s => Expr::tg(s.boxed()),
            },
            Expr::arctg(e) => match e.simplify() {
                Expr::Const(a) => Expr::Const(a.atan()),
                s => Expr::arctg(s.boxed()),
            },
        }
    }
}

/// creates variables in scope: `symbols!(x, u)`
#[macro_export]
macro_rules! symbols {
    ($($name:ident),+ $(,)?) => {
        ($($crate::symbolic::symbolic_engine::Expr::Var(stringify!($name).to_string())),+)
    };
}
