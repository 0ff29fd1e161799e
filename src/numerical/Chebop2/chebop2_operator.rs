//! Linear partial differential operators on rectangles and their boundary conditions.
//!
//! The operator is stored as a table of coefficients: entry `A[i][j]` multiplies
//! `∂^i/∂y^i ∂^j/∂x^j u`. Entries are tagged cells (`CoeffEntry`); a table whose entries are all
//! constants may be given as a dense matrix instead.
use crate::numerical::Chebop2::construct_discretisation::{Chebop2Info, solve_pde};
use crate::numerical::Chebop2::separable_format::LowRankFactorization;
use crate::numerical::chebfun::{Chebfun, check_domain};
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::numerical::preferences::Preferences;
use crate::symbolic::symbolic_engine::Expr;
use log::{info, warn};
use nalgebra::DMatrix;
use regex::Regex;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone)]
pub enum CoeffEntry {
    Empty,
    Scalar(f64),
    Field(Chebfun2),
}

impl CoeffEntry {
    pub fn is_empty(&self) -> bool {
        match self {
            CoeffEntry::Empty => true,
            CoeffEntry::Scalar(c) => *c == 0.0,
            CoeffEntry::Field(_) => false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum OperatorCoeffs {
    /// constant coefficients, (yorder+1) x (xorder+1)
    Dense(DMatrix<f64>),
    /// rows: y derivative order, columns: x derivative order
    Variable(Vec<Vec<CoeffEntry>>),
}

impl OperatorCoeffs {
    /// (yorder, xorder) from the last non-empty row and column
    pub fn orders(&self) -> (usize, usize) {
        let mut yorder = 0;
        let mut xorder = 0;
        match self {
            OperatorCoeffs::Dense(a) => {
                for i in 0..a.nrows() {
                    for j in 0..a.ncols() {
                        if a[(i, j)] != 0.0 {
                            yorder = yorder.max(i);
                            xorder = xorder.max(j);
                        }
                    }
                }
            }
            OperatorCoeffs::Variable(cells) => {
                for (i, row) in cells.iter().enumerate() {
                    for (j, cell) in row.iter().enumerate() {
                        if !cell.is_empty() {
                            yorder = yorder.max(i);
                            xorder = xorder.max(j);
                        }
                    }
                }
            }
        }
        (yorder, xorder)
    }

    pub fn is_constant(&self) -> bool {
        match self {
            OperatorCoeffs::Dense(_) => true,
            OperatorCoeffs::Variable(cells) => cells
                .iter()
                .flatten()
                .all(|c| !matches!(c, CoeffEntry::Field(_))),
        }
    }
}

/// sides of the rectangle [a, b] x [c, d]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum Side {
    /// x = a
    #[strum(to_string = "left")]
    Left,
    /// x = b
    #[strum(to_string = "right")]
    Right,
    /// y = c
    #[strum(to_string = "down")]
    Down,
    /// y = d
    #[strum(to_string = "up")]
    Up,
}

impl Side {
    /// sides x = const constrain the x direction
    pub fn is_x_side(&self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

#[derive(Debug, Clone)]
pub enum BoundaryValue {
    Constant(f64),
    /// function along the side: of y for left/right, of x for down/up
    Function(Chebfun),
}

impl BoundaryValue {
    /// Chebyshev coefficients along the side, zero padded or truncated to `len`
    pub fn coeffs(&self, len: usize) -> nalgebra::DVector<f64> {
        match self {
            BoundaryValue::Constant(c) => {
                nalgebra::DVector::from_fn(len, |k, _| if k == 0 { *c } else { 0.0 })
            }
            BoundaryValue::Function(f) => f.coeffs_padded(len),
        }
    }
}

/// `Σ_k weights[k] ∂^k u / ∂ν^k = value` on a side, ν the coordinate normal to the side
#[derive(Debug, Clone)]
pub struct SideCondition {
    pub weights: Vec<f64>,
    pub value: BoundaryValue,
}

#[derive(Debug, Clone)]
pub struct BoundaryCondition {
    pub side: Side,
    pub conditions: Vec<SideCondition>,
}

#[derive(Debug, Clone)]
pub struct Chebop2 {
    /// [a, b, c, d]
    pub domain: [f64; 4],
    pub coeffs: OperatorCoeffs,
    pub xorder: usize,
    pub yorder: usize,
    /// precomputed low rank form of the coefficients
    pub factorization: Option<LowRankFactorization>,
    pub lbc: Vec<SideCondition>,
    pub rbc: Vec<SideCondition>,
    pub dbc: Vec<SideCondition>,
    pub ubc: Vec<SideCondition>,
    /// part of the operator independent of u, moved to the right hand side
    pub constant_term: Option<Chebfun2>,
    pub source: Option<String>,
}

struct OperatorSymbols {
    x: String,
    y: String,
    u: String,
}

fn split_header(text: &str) -> SolveResult<(OperatorSymbols, String)> {
    match text.split_once("->") {
        Some((header, body)) => {
            let args: Vec<String> = header
                .trim()
                .trim_start_matches('(')
                .trim_end_matches(')')
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if args.len() != 3 {
                return Err(SolveError::Parse(format!(
                    "expected argument list (x, y, u), found {}",
                    header.trim()
                )));
            }
            Ok((
                OperatorSymbols {
                    x: args[0].clone(),
                    y: args[1].clone(),
                    u: args[2].clone(),
                },
                body.to_string(),
            ))
        }
        None => Ok((
            OperatorSymbols {
                x: "x".to_string(),
                y: "y".to_string(),
                u: "u".to_string(),
            },
            text.to_string(),
        )),
    }
}

impl Chebop2 {
    pub fn new(domain: [f64; 4], coeffs: OperatorCoeffs) -> Self {
        let (yorder, xorder) = coeffs.orders();
        Chebop2 {
            domain,
            coeffs,
            xorder,
            yorder,
            factorization: None,
            lbc: Vec::new(),
            rbc: Vec::new(),
            dbc: Vec::new(),
            ubc: Vec::new(),
            constant_term: None,
            source: None,
        }
    }

    /// Parses an operator such as `"u_xx + u_yy + x*y*u"` or `"(s, t, v) -> v_ss + exp(t)*v_t"`.
    /// Derivatives are written as the unknown followed by `_` and the differentiation variables.
    /// Only linear operators are accepted.
    pub fn from_str(domain: [f64; 4], text: &str) -> SolveResult<Self> {
        check_domain((domain[0], domain[1]))?;
        check_domain((domain[2], domain[3]))?;
        let (symbols, body) = split_header(text)?;
        if symbols.x.chars().count() != 1 || symbols.y.chars().count() != 1 || symbols.x == symbols.y {
            return Err(SolveError::Parse(format!(
                "coordinates must be two distinct single letters, found {} and {}",
                symbols.x, symbols.y
            )));
        }
        let expr = Expr::parse_expression(&body).map_err(SolveError::Parse)?;
        let pattern = format!(
            r"^{}(?:_([{}{}]+))?$",
            regex::escape(&symbols.u),
            regex::escape(&symbols.x),
            regex::escape(&symbols.y)
        );
        let derivative_symbol = Regex::new(&pattern).map_err(|e| SolveError::Parse(e.to_string()))?;

        // (symbol, y order, x order)
        let mut unknowns: Vec<(String, usize, usize)> = Vec::new();
        for var in expr.all_arguments_are_variables() {
            if var == symbols.x || var == symbols.y {
                continue;
            }
            let caps = derivative_symbol
                .captures(&var)
                .ok_or_else(|| SolveError::UnknownSymbol(var.clone()))?;
            let (mut i, mut j) = (0, 0);
            if let Some(sub) = caps.get(1) {
                for ch in sub.as_str().chars() {
                    if ch.to_string() == symbols.x {
                        j += 1;
                    } else {
                        i += 1;
                    }
                }
            }
            unknowns.push((var, i, j));
        }
        let unknown_names: Vec<String> = unknowns.iter().map(|(s, _, _)| s.clone()).collect();
        let yorder = unknowns.iter().map(|u| u.1).max().unwrap_or(0);
        let xorder = unknowns.iter().map(|u| u.2).max().unwrap_or(0);
        let mut table: Vec<Vec<Expr>> = vec![vec![Expr::Const(0.0); xorder + 1]; yorder + 1];
        for (sym, i, j) in &unknowns {
            let coeff = expr.diff(sym).simplify();
            if coeff.contains_any(&unknown_names) {
                return Err(SolveError::NonlinearPde(sym.clone()));
            }
            table[*i][*j] = (table[*i][*j].clone() + coeff).simplify();
        }

        let xy = [symbols.x.as_str(), symbols.y.as_str()];
        let to_field = |e: &Expr| -> SolveResult<Chebfun2> {
            let lambda = e.compile(&xy).map_err(SolveError::UnknownSymbol)?;
            Ok(Chebfun2::from_fn(|x, y| lambda.eval(&[x, y]), domain))
        };
        let mut cells = vec![vec![CoeffEntry::Empty; xorder + 1]; yorder + 1];
        for i in 0..=yorder {
            for j in 0..=xorder {
                cells[i][j] = match table[i][j].as_const() {
                    Some(c) if c == 0.0 => CoeffEntry::Empty,
                    Some(c) => CoeffEntry::Scalar(c),
                    None => CoeffEntry::Field(to_field(&table[i][j])?),
                };
            }
        }

        let mut zero_u = expr.clone();
        for name in &unknown_names {
            zero_u = zero_u.set_variable(name, 0.0);
        }
        let zero_u = zero_u.simplify();
        let constant_term = match zero_u.as_const() {
            Some(c) if c == 0.0 => None,
            _ => {
                info!("operator has a term independent of the unknown: {}", zero_u);
                Some(to_field(&zero_u)?)
            }
        };

        let mut op = Chebop2::new(domain, OperatorCoeffs::Variable(cells));
        op.constant_term = constant_term;
        op.source = Some(text.to_string());
        Ok(op)
    }

    pub fn x_domain(&self) -> (f64, f64) {
        (self.domain[0], self.domain[1])
    }

    pub fn y_domain(&self) -> (f64, f64) {
        (self.domain[2], self.domain[3])
    }

    pub fn side_conditions(&self, side: Side) -> &[SideCondition] {
        match side {
            Side::Left => &self.lbc,
            Side::Right => &self.rbc,
            Side::Down => &self.dbc,
            Side::Up => &self.ubc,
        }
    }

    fn side_conditions_mut(&mut self, side: Side) -> &mut Vec<SideCondition> {
        match side {
            Side::Left => &mut self.lbc,
            Side::Right => &mut self.rbc,
            Side::Down => &mut self.dbc,
            Side::Up => &mut self.ubc,
        }
    }

    pub fn with_condition(mut self, side: Side, condition: SideCondition) -> Self {
        if let BoundaryValue::Function(f) = &condition.value {
            let expected = if side.is_x_side() {
                self.y_domain()
            } else {
                self.x_domain()
            };
            if f.domain != expected {
                warn!(
                    "boundary data on the {} side is defined on {:?}, the side spans {:?}",
                    side, f.domain, expected
                );
            }
        }
        self.side_conditions_mut(side).push(condition);
        self
    }

    pub fn with_dirichlet(self, side: Side, value: BoundaryValue) -> Self {
        self.with_condition(
            side,
            SideCondition {
                weights: vec![1.0],
                value,
            },
        )
    }

    /// first derivative along the coordinate normal to the side
    pub fn with_neumann(self, side: Side, value: BoundaryValue) -> Self {
        self.with_condition(
            side,
            SideCondition {
                weights: vec![0.0, 1.0],
                value,
            },
        )
    }

    /// Dirichlet data taken from a function of (x, y) on every side
    pub fn with_dirichlet_everywhere<F: Fn(f64, f64) -> f64>(self, g: F) -> Self {
        let [a, b, c, d] = self.domain;
        let left = Chebfun::from_fn(|y| g(a, y), (c, d));
        let right = Chebfun::from_fn(|y| g(b, y), (c, d));
        let down = Chebfun::from_fn(|x| g(x, c), (a, b));
        let up = Chebfun::from_fn(|x| g(x, d), (a, b));
        self.with_dirichlet(Side::Left, BoundaryValue::Function(left))
            .with_dirichlet(Side::Right, BoundaryValue::Function(right))
            .with_dirichlet(Side::Down, BoundaryValue::Function(down))
            .with_dirichlet(Side::Up, BoundaryValue::Function(up))
    }

    pub fn with_factorization(mut self, factorization: LowRankFactorization) -> Self {
        self.factorization = Some(factorization);
        self
    }

    pub fn solve(&self, rhs: &Chebfun2, prefs: &Preferences) -> SolveResult<(Chebfun2, Chebop2Info)> {
        solve_pde(self, rhs, prefs)
    }

    /// applies the operator to a function, used to check residuals
    pub fn apply(&self, u: &Chebfun2) -> Chebfun2 {
        let domain = self.domain;
        let mut terms: Vec<(Chebfun2, CoeffEntry)> = Vec::new();
        match &self.coeffs {
            OperatorCoeffs::Dense(a) => {
                for i in 0..a.nrows() {
                    for j in 0..a.ncols() {
                        if a[(i, j)] != 0.0 {
                            terms.push((u.diff(j, i), CoeffEntry::Scalar(a[(i, j)])));
                        }
                    }
                }
            }
            OperatorCoeffs::Variable(cells) => {
                for (i, row) in cells.iter().enumerate() {
                    for (j, cell) in row.iter().enumerate() {
                        if !cell.is_empty() {
                            terms.push((u.diff(j, i), cell.clone()));
                        }
                    }
                }
            }
        }
        let constant = self.constant_term.clone();
        Chebfun2::from_fn(
            |x, y| {
                let mut s: f64 = terms
                    .iter()
                    .map(|(du, c)| {
                        let coeff = match c {
                            CoeffEntry::Empty => 0.0,
                            CoeffEntry::Scalar(v) => *v,
                            CoeffEntry::Field(f) => f.eval(x, y),
                        };
                        coeff * du.eval(x, y)
                    })
                    .sum();
                if let Some(g) = &constant {
                    s += g.eval(x, y);
                }
                s
            },
            domain,
        )
    }
}
