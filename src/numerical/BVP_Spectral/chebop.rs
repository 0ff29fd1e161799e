//! # Chebop
//!
//! A (system of) ordinary differential operators on an interval with boundary conditions,
//! written as text:
//!
//! ```text
//! (x, u) -> u'' + x*u          one unknown, independent variable x
//! (x, u, v) -> u' - v; v' + u  a system, one equation per unknown
//! (x, u) -> u[1]' - u[2]; u[2]' + u[1]   indexed unknowns, 1-based
//! u -> u'' + u^2               autonomous: no independent variable in the list
//! ```
//!
//! Derivatives are primes after the unknown's name. Boundary conditions are expressions that
//! vanish at the left end, the right end, or at a given point, e.g. `"u - 1"` or `"u' + v"`.
//!
//! The caller's `Chebop` is never changed by a solve: `resolve` produces a separate
//! `ResolvedOperator` with the number of unknowns, their names and the parsed expressions.
use crate::numerical::BVP_Spectral::solvebvp::{BvpOperator, Rhs, Solution, SolveInfo, solve};
use crate::numerical::BVP_Spectral::display::{LogDisplay, NoDisplay};
use crate::numerical::chebfun::{Chebfun, check_domain};
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::Preferences;
use crate::symbolic::symbolic_engine::Expr;
use log::warn;
use regex::Regex;

#[derive(Debug, Clone)]
pub struct Chebop {
    pub domain: (f64, f64),
    /// argument list of the header, empty when the text has none
    pub args: Vec<String>,
    pub equations: Vec<Expr>,
    pub lbc: Vec<String>,
    pub rbc: Vec<String>,
    /// (point, condition)
    pub bc: Vec<(f64, String)>,
    pub init: Option<Vec<Chebfun>>,
    pub num_vars: Option<usize>,
    pub source: Option<String>,
}

/// where a boundary condition is imposed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BcLocation {
    Left,
    Right,
    Point(f64),
}

#[derive(Debug, Clone)]
pub struct BoundaryExpr {
    pub location: BcLocation,
    pub expr: Expr,
}

impl BoundaryExpr {
    pub fn point(&self, domain: (f64, f64)) -> f64 {
        match self.location {
            BcLocation::Left => domain.0,
            BcLocation::Right => domain.1,
            BcLocation::Point(p) => p,
        }
    }
}

/// working copy of a `Chebop` used by the solvers
#[derive(Debug, Clone)]
pub struct ResolvedOperator {
    pub domain: (f64, f64),
    pub indep: String,
    pub unknowns: Vec<String>,
    pub equations: Vec<Expr>,
    pub bcs: Vec<BoundaryExpr>,
    /// the header had no independent variable
    pub autonomous: bool,
    pub warnings: Vec<String>,
}

impl ResolvedOperator {
    pub fn num_vars(&self) -> usize {
        self.unknowns.len()
    }

    pub fn num_eqs(&self) -> usize {
        self.equations.len()
    }
}

/// `"[a; b]"` or `"a; b"` -> ["a", "b"]; only a matching outer bracket pair is removed
fn split_list(text: &str) -> Vec<String> {
    let text = text.trim();
    let body = text
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(text);
    body.split(';')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// symbol of the k-th derivative of an unknown
pub fn derivative_symbol(unknown: &str, k: usize) -> String {
    format!("{}{}", unknown, "'".repeat(k))
}

/// `u''` -> ("u", 2)
pub fn split_primes(symbol: &str) -> (&str, usize) {
    let base = symbol.trim_end_matches('\'');
    (base, symbol.len() - base.len())
}

/// largest `name[k]` index used in the text
pub fn scan_indexed_usage(text: &str, name: &str) -> Option<usize> {
    let pattern = format!(r"{}\[(\d+)\]", regex::escape(name));
    let re = Regex::new(&pattern).ok()?;
    re.captures_iter(text)
        .filter_map(|c| c.get(1).and_then(|m| m.as_str().parse::<usize>().ok()))
        .max()
}

impl Chebop {
    pub fn new(domain: (f64, f64), text: &str) -> SolveResult<Self> {
        check_domain(domain)?;
        let (args, body) = match text.split_once("->") {
            Some((header, body)) => {
                let args: Vec<String> = header
                    .trim()
                    .trim_start_matches('(')
                    .trim_end_matches(')')
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                if args.is_empty() {
                    return Err(SolveError::Parse(format!("empty argument list in {}", text)));
                }
                (args, body.to_string())
            }
            None => (Vec::new(), text.to_string()),
        };
        let equations = split_list(&body)
            .iter()
            .map(|e| Expr::parse_expression(e).map_err(SolveError::Parse))
            .collect::<SolveResult<Vec<Expr>>>()?;
        if equations.is_empty() {
            return Err(SolveError::Parse(format!("no equations in {}", text)));
        }
        Ok(Chebop {
            domain,
            args,
            equations,
            lbc: Vec::new(),
            rbc: Vec::new(),
            bc: Vec::new(),
            init: None,
            num_vars: None,
            source: Some(text.to_string()),
        })
    }

    /// conditions at the left end, several may be separated by `;`
    pub fn with_lbc(mut self, text: &str) -> Self {
        self.lbc.extend(split_list(text));
        self
    }

    pub fn with_rbc(mut self, text: &str) -> Self {
        self.rbc.extend(split_list(text));
        self
    }

    /// condition at an arbitrary point of the domain
    pub fn with_bc(mut self, point: f64, text: &str) -> Self {
        for c in split_list(text) {
            self.bc.push((point, c));
        }
        self
    }

    pub fn with_init(mut self, init: Vec<Chebfun>) -> Self {
        self.init = Some(init);
        self
    }

    pub fn with_num_vars(mut self, n: usize) -> Self {
        self.num_vars = Some(n);
        self
    }

    /// Number and names of the unknowns.
    ///
    /// More than two arguments: every argument after the first is an unknown. Otherwise the
    /// explicit count wins, then the largest `name[k]` index in the text. Without an argument
    /// list there is one unknown `u` (or the explicit count of them) and a warning.
    pub fn resolve(&self) -> SolveResult<ResolvedOperator> {
        let mut warnings = Vec::new();
        let source = self.source.clone().unwrap_or_default();
        let indexed = |base: &str, count: usize| -> Vec<String> {
            (1..=count).map(|k| format!("{}[{}]", base, k)).collect()
        };
        let count_for = |base: &str| -> usize {
            match self.num_vars {
                Some(n) => n,
                None => scan_indexed_usage(&source, base).unwrap_or(1),
            }
        };
        let names_for = |base: &str| -> Vec<String> {
            let n = count_for(base);
            if n > 1 || scan_indexed_usage(&source, base).is_some() {
                indexed(base, n)
            } else {
                vec![base.to_string()]
            }
        };
        let (indep, unknowns, autonomous) = match self.args.len() {
            0 => {
                let n = match self.num_vars {
                    Some(n) => n,
                    None => {
                        let msg = "cannot determine the number of unknowns from the operator, \
                                   assuming 1; set it with with_num_vars"
                            .to_string();
                        warn!("{}", msg);
                        warnings.push(msg);
                        1
                    }
                };
                let unknowns = if n > 1 {
                    indexed("u", n)
                } else {
                    vec!["u".to_string()]
                };
                ("x".to_string(), unknowns, false)
            }
            1 => {
                let base = self.args[0].clone();
                let indep = if base == "x" { "t" } else { "x" };
                (indep.to_string(), names_for(&base), true)
            }
            2 => (self.args[0].clone(), names_for(&self.args[1]), false),
            _ => (self.args[0].clone(), self.args[1..].to_vec(), false),
        };
        if unknowns.is_empty() {
            return Err(SolveError::DimensionMismatch {
                what: "number of unknowns".to_string(),
                expected: (1, 1),
                found: (0, 1),
            });
        }
        if self.equations.len() != unknowns.len() {
            return Err(SolveError::DimensionMismatch {
                what: "equations against unknowns".to_string(),
                expected: (unknowns.len(), 1),
                found: (self.equations.len(), 1),
            });
        }
        let parse = |text: &str, location: BcLocation| -> SolveResult<BoundaryExpr> {
            Ok(BoundaryExpr {
                location,
                expr: Expr::parse_expression(text).map_err(SolveError::Parse)?,
            })
        };
        let mut bcs = Vec::new();
        for c in &self.lbc {
            bcs.push(parse(c, BcLocation::Left)?);
        }
        for c in &self.rbc {
            bcs.push(parse(c, BcLocation::Right)?);
        }
        for (p, c) in &self.bc {
            if *p < self.domain.0 || *p > self.domain.1 {
                warn!("condition point {} lies outside the domain {:?}", p, self.domain);
            }
            bcs.push(parse(c, BcLocation::Point(*p))?);
        }
        Ok(ResolvedOperator {
            domain: self.domain,
            indep,
            unknowns,
            equations: self.equations.clone(),
            bcs,
            autonomous,
            warnings,
        })
    }

    /// solves `N(u) = rhs`, progress is logged when a display pause is configured
    pub fn solve(&self, rhs: &Rhs, prefs: &Preferences) -> SolveResult<(Solution, SolveInfo)> {
        match prefs.display_pause_ms {
            Some(ms) => solve(BvpOperator::Ode(self), rhs, prefs, &mut LogDisplay::new(ms)),
            None => solve(BvpOperator::Ode(self), rhs, prefs, &mut NoDisplay),
        }
    }
}
