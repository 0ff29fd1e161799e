//! Linearization of a resolved operator about an iterate.
//!
//! For equation `F_i(x, u_1, u_1', ..., u_N^(K))` the coefficient of `δ_j^(k)` in the linear
//! operator is `a_ijk = ∂F_i/∂(u_j^(k))`, obtained by symbolic differentiation with respect to
//! the derivative symbols and evaluated at the iterate. Boundary conditions are linearized the
//! same way at their points. The operator (or a condition) is linear when none of its partial
//! derivatives still depends on an unknown.
use crate::numerical::BVP_Spectral::chebop::{
    BcLocation, ResolvedOperator, derivative_symbol, split_primes,
};
use crate::numerical::chebfun::Chebfun;
use crate::numerical::errors::{SolveError, SolveResult};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_lambdify::Lambda;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinearityFlags {
    pub op: bool,
    pub lbc: bool,
    pub rbc: bool,
    pub bc: bool,
    pub all: bool,
}

#[derive(Debug, Clone)]
enum Partial {
    Constant(f64),
    Varying(Lambda),
}

#[derive(Debug, Clone)]
struct CompiledBc {
    point: f64,
    func: Lambda,
    /// [unknown][order]
    partials: Vec<Vec<Option<Partial>>>,
}

/// one linear boundary row: `Σ_jk weights[j][k] δ_j^(k)(point) = value`
#[derive(Debug, Clone)]
pub struct BcRow {
    pub point: f64,
    pub weights: Vec<Vec<f64>>,
}

/// linear operator `Σ_jk a_ijk(x) d^k/dx^k` per equation i
#[derive(Debug, Clone)]
pub struct LinearOperator {
    pub domain: (f64, f64),
    /// [equation][unknown][order]
    pub coeffs: Vec<Vec<Vec<Option<Chebfun>>>>,
    /// differential order of each equation
    pub orders: Vec<usize>,
    pub bc_rows: Vec<BcRow>,
}

impl LinearOperator {
    pub fn num_vars(&self) -> usize {
        self.coeffs.first().map_or(0, |row| row.len())
    }
}

#[derive(Debug, Clone)]
pub struct Residual {
    pub interior: Vec<Chebfun>,
    pub boundary: Vec<f64>,
}

impl Residual {
    pub fn norm(&self) -> f64 {
        let interior: f64 = self.interior.iter().map(|r| r.norm2().powi(2)).sum();
        let boundary: f64 = self.boundary.iter().map(|g| g * g).sum();
        (interior + boundary).sqrt()
    }
}

/// symbolic part of the linearization, built once per solve
#[derive(Debug, Clone)]
pub struct Linearization {
    pub domain: (f64, f64),
    /// [indep, u, u', ..., v, v', ...]
    vars: Vec<String>,
    /// slots[j][k]: position of u_j^(k) in `vars`
    slots: Vec<Vec<usize>>,
    /// highest derivative of each unknown in the equations
    pub unknown_orders: Vec<usize>,
    pub eq_orders: Vec<usize>,
    equations: Vec<Lambda>,
    partials: Vec<Vec<Vec<Option<Partial>>>>,
    bcs: Vec<CompiledBc>,
    pub flags: LinearityFlags,
}

fn max_orders(exprs: &[&Expr], op: &ResolvedOperator) -> SolveResult<Vec<usize>> {
    let mut orders = vec![0; op.num_vars()];
    for e in exprs {
        for var in e.all_arguments_are_variables() {
            if var == op.indep {
                continue;
            }
            let (base, k) = split_primes(&var);
            match op.unknowns.iter().position(|u| u == base) {
                Some(j) => orders[j] = orders[j].max(k),
                None => return Err(SolveError::UnknownSymbol(var)),
            }
        }
    }
    Ok(orders)
}

impl Linearization {
    pub fn new(op: &ResolvedOperator) -> SolveResult<Self> {
        let eq_refs: Vec<&Expr> = op.equations.iter().collect();
        let unknown_orders = max_orders(&eq_refs, op)?;
        let mut all_refs = eq_refs.clone();
        all_refs.extend(op.bcs.iter().map(|b| &b.expr));
        let slot_orders = max_orders(&all_refs, op)?;

        let mut vars = vec![op.indep.clone()];
        let mut slots = Vec::with_capacity(op.num_vars());
        for (j, u) in op.unknowns.iter().enumerate() {
            let mut s = Vec::new();
            for k in 0..=slot_orders[j] {
                s.push(vars.len());
                vars.push(derivative_symbol(u, k));
            }
            slots.push(s);
        }
        let unknown_symbols: Vec<String> = vars[1..].to_vec();
        let var_refs: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
        let compile = |e: &Expr| e.compile(&var_refs).map_err(SolveError::UnknownSymbol);

        // ∂e/∂(u_j^(k)) for every slot; the flag turns false when one still depends on u
        let differentiate = |e: &Expr, linear: &mut bool| -> SolveResult<Vec<Vec<Option<Partial>>>> {
            let mut out = Vec::with_capacity(slots.len());
            for (j, s) in slots.iter().enumerate() {
                let mut row = Vec::with_capacity(s.len());
                for k in 0..s.len() {
                    let sym = derivative_symbol(&op.unknowns[j], k);
                    let d = e.diff(&sym).simplify();
                    if d.contains_any(&unknown_symbols) {
                        *linear = false;
                    }
                    row.push(match d.as_const() {
                        Some(c) if c == 0.0 => None,
                        Some(c) => Some(Partial::Constant(c)),
                        None => Some(Partial::Varying(compile(&d)?)),
                    });
                }
                out.push(row);
            }
            Ok(out)
        };

        let mut flags = LinearityFlags {
            op: true,
            lbc: true,
            rbc: true,
            bc: true,
            all: true,
        };
        let mut equations = Vec::new();
        let mut partials = Vec::new();
        let mut eq_orders = Vec::new();
        for e in &op.equations {
            equations.push(compile(e)?);
            let p = differentiate(e, &mut flags.op)?;
            let order = p
                .iter()
                .flat_map(|row| row.iter().enumerate().filter(|(_, c)| c.is_some()).map(|(k, _)| k))
                .max()
                .unwrap_or(0);
            eq_orders.push(order);
            partials.push(p);
        }
        let mut bcs = Vec::new();
        for b in &op.bcs {
            let flag = match b.location {
                BcLocation::Left => &mut flags.lbc,
                BcLocation::Right => &mut flags.rbc,
                BcLocation::Point(_) => &mut flags.bc,
            };
            let p = differentiate(&b.expr, flag)?;
            bcs.push(CompiledBc {
                point: b.point(op.domain),
                func: compile(&b.expr)?,
                partials: p,
            });
        }
        flags.all = flags.op && flags.lbc && flags.rbc && flags.bc;
        debug!("linearity flags {:?}, equation orders {:?}", flags, eq_orders);
        Ok(Linearization {
            domain: op.domain,
            vars,
            slots,
            unknown_orders,
            eq_orders,
            equations,
            partials,
            bcs,
            flags,
        })
    }

    pub fn num_vars(&self) -> usize {
        self.slots.len()
    }

    fn derivatives(&self, u: &[Chebfun]) -> SolveResult<Vec<Vec<Chebfun>>> {
        if u.len() != self.num_vars() {
            return Err(SolveError::DimensionMismatch {
                what: "iterate".to_string(),
                expected: (self.num_vars(), 1),
                found: (u.len(), 1),
            });
        }
        Ok(u.iter()
            .zip(self.slots.iter())
            .map(|(uj, s)| (0..s.len()).map(|k| uj.diff(k)).collect())
            .collect())
    }

    fn point_values(&self, derivs: &[Vec<Chebfun>], x: f64) -> Vec<f64> {
        let mut vals = vec![0.0; self.vars.len()];
        vals[0] = x;
        for (j, s) in self.slots.iter().enumerate() {
            for (k, &slot) in s.iter().enumerate() {
                vals[slot] = derivs[j][k].eval(x);
            }
        }
        vals
    }

    fn to_chebfun(&self, partial: &Partial, derivs: &[Vec<Chebfun>]) -> Chebfun {
        match partial {
            Partial::Constant(c) => Chebfun::constant(*c, self.domain),
            Partial::Varying(l) => {
                Chebfun::from_fn(|x| l.eval(&self.point_values(derivs, x)), self.domain)
            }
        }
    }

    /// `F(u) - rhs` in the interior and `g(u)` at the condition points. The interior residual
    /// is resolved relative to the scale of the iterate and the right hand side (at least 1).
    pub fn residual(&self, u: &[Chebfun], rhs: &[Chebfun]) -> SolveResult<Residual> {
        let derivs = self.derivatives(u)?;
        let vscale = u
            .iter()
            .chain(rhs.iter())
            .map(|f| f.vscale())
            .fold(1.0, f64::max);
        let mut interior = Vec::with_capacity(self.equations.len());
        for (i, eq) in self.equations.iter().enumerate() {
            let f = &rhs[i];
            let r = Chebfun::from_fn_scaled(
                |x| eq.eval(&self.point_values(&derivs, x)) - f.eval(x),
                self.domain,
                vscale,
            );
            if !r.coeffs.iter().all(|c| c.is_finite()) {
                return Err(SolveError::SingularSystem(format!(
                    "residual of equation {} is not finite at the iterate",
                    i + 1
                )));
            }
            interior.push(r);
        }
        let boundary = self.boundary_values(&derivs);
        Ok(Residual { interior, boundary })
    }

    fn boundary_values(&self, derivs: &[Vec<Chebfun>]) -> Vec<f64> {
        self.bcs
            .iter()
            .map(|b| b.func.eval(&self.point_values(derivs, b.point)))
            .collect()
    }

    /// `g(u)` at the condition points only; the interior equations are not evaluated
    pub fn boundary_residual(&self, u: &[Chebfun]) -> SolveResult<Vec<f64>> {
        let derivs = self.derivatives(u)?;
        let boundary = self.boundary_values(&derivs);
        if let Some(k) = boundary.iter().position(|g| !g.is_finite()) {
            return Err(SolveError::SingularSystem(format!(
                "boundary condition {} is not finite at the iterate",
                k + 1
            )));
        }
        Ok(boundary)
    }

    fn bc_rows(&self, derivs: &[Vec<Chebfun>]) -> Vec<BcRow> {
        self.bcs
            .iter()
            .map(|b| {
                let vals = self.point_values(derivs, b.point);
                BcRow {
                    point: b.point,
                    weights: b
                        .partials
                        .iter()
                        .map(|row| {
                            row.iter()
                                .map(|p| match p {
                                    None => 0.0,
                                    Some(Partial::Constant(c)) => *c,
                                    Some(Partial::Varying(l)) => l.eval(&vals),
                                })
                                .collect()
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Fréchet derivative at `u`
    pub fn linear_operator(&self, u: &[Chebfun]) -> SolveResult<LinearOperator> {
        let derivs = self.derivatives(u)?;
        let coeffs = self
            .partials
            .iter()
            .map(|eq| {
                eq.iter()
                    .map(|row| {
                        row.iter()
                            .map(|p| p.as_ref().map(|p| self.to_chebfun(p, &derivs)))
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(LinearOperator {
            domain: self.domain,
            coeffs,
            orders: self.eq_orders.clone(),
            bc_rows: self.bc_rows(&derivs),
        })
    }

    /// `u_j^(K_j) = 0` for every unknown with the conditions linearized at `u`; its solution
    /// is a start satisfying the boundary conditions
    pub fn highest_derivative_operator(&self, u: &[Chebfun]) -> SolveResult<LinearOperator> {
        let derivs = self.derivatives(u)?;
        let n = self.num_vars();
        let coeffs = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        (0..self.slots[j].len())
                            .map(|k| {
                                if i == j && k == self.unknown_orders[j] {
                                    Some(Chebfun::constant(1.0, self.domain))
                                } else {
                                    None
                                }
                            })
                            .collect()
                    })
                    .collect()
            })
            .collect();
        Ok(LinearOperator {
            domain: self.domain,
            coeffs,
            orders: self.unknown_orders.clone(),
            bc_rows: self.bc_rows(&derivs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::BVP_Spectral::chebop::Chebop;
    use approx::assert_relative_eq;

    #[test]
    fn test_coefficients_and_flags() {
        let op = Chebop::new((0.0, 1.0), "(x, u) -> u'' + x*u^2")
            .unwrap()
            .with_lbc("u - 1")
            .with_rbc("u'*u");
        let lin = Linearization::new(&op.resolve().unwrap()).unwrap();
        assert!(!lin.flags.op);
        assert!(lin.flags.lbc);
        assert!(!lin.flags.rbc);
        assert!(!lin.flags.all);
        assert_eq!(lin.eq_orders, vec![2]);

        let u = vec![Chebfun::constant(2.0, (0.0, 1.0))];
        let l = lin.linear_operator(&u).unwrap();
        // ∂/∂u (x u^2) = 2 x u = 4x
        let a0 = l.coeffs[0][0][0].as_ref().unwrap();
        assert_relative_eq!(a0.eval(0.5), 2.0, epsilon = 1e-13);
        assert!(l.coeffs[0][0][1].is_none());
        assert_relative_eq!(l.coeffs[0][0][2].as_ref().unwrap().eval(0.3), 1.0);
        // u' u at the right end: weights (u', u) = (0, 2)
        assert_relative_eq!(l.bc_rows[1].weights[0][0], 0.0);
        assert_relative_eq!(l.bc_rows[1].weights[0][1], 2.0);

        let rhs = vec![Chebfun::zeros((0.0, 1.0))];
        let r = lin.residual(&u, &rhs).unwrap();
        assert_relative_eq!(r.interior[0].eval(0.25), 1.0, epsilon = 1e-13);
        assert_relative_eq!(r.boundary[0], 1.0);
        assert_relative_eq!(r.boundary[1], 0.0);
    }

    #[test]
    fn test_linear_system_flags() {
        let op = Chebop::new((0.0, 1.0), "(x, u, v) -> u' - v; v' + exp(x)*u")
            .unwrap()
            .with_lbc("u; v - 1");
        let lin = Linearization::new(&op.resolve().unwrap()).unwrap();
        assert!(lin.flags.all);
        assert_eq!(lin.unknown_orders, vec![1, 1]);
        let bad = Chebop::new((0.0, 1.0), "(x, u) -> u'' + w").unwrap();
        assert!(matches!(
            Linearization::new(&bad.resolve().unwrap()),
            Err(SolveError::UnknownSymbol(_))
        ));
    }
}
