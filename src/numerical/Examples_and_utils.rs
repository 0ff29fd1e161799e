/// a collection of boundary value problems with exact solutions for testing purposes
use crate::numerical::BVP_Spectral::chebop::Chebop;
use crate::numerical::Chebop2::chebop2_operator::Chebop2;
use crate::numerical::chebfun::Chebfun;
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::SolveResult;
use strum_macros::{Display, EnumIter};

//EXAMPLES OF EXACT SOLUTIONS OF BVPs
/*
two-point boundary value problem:
y''= -2*(1+2*ln(y))*y
y(0) = 1, y(1) = exp(-1)
exact solution: y(x)=exp(-x^2)

inverse cubic:
u'' = 2*u^3, u(0) = 1, u(1) = 1/2
exact solution: u = 1/(x+1)

quadratic decay (autonomous):
u'' + u^2 = 0, u(0) = -3/2, u(1) = -2/3
exact solution: u = -6/(x+2)^2

harmonic oscillator as a first order system:
u' = v, v' = -u, u(0) = 0, v(0) = 1
exact solution: u = sin(x), v = cos(x)

exponential growth:
u' = u, u(0) = 1
exact solution: u = exp(x)
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum NonlinEquation {
    TwoPointBVP,
    InverseCubic,
    QuadraticDecay,
    Harmonic,
    Exponential,
}

impl NonlinEquation {
    /// operator text in the `(x, u) -> ...` notation
    pub fn setup(&self) -> &'static str {
        match self {
            NonlinEquation::TwoPointBVP => "(x, y) -> y'' + 2*(1 + 2*ln(y))*y",
            NonlinEquation::InverseCubic => "(x, u) -> u'' - 2*u^3",
            NonlinEquation::QuadraticDecay => "u -> u'' + u^2",
            NonlinEquation::Harmonic => "(x, u, v) -> u' - v; v' + u",
            NonlinEquation::Exponential => "(x, u) -> u' - u",
        }
    }

    pub fn values(&self) -> Vec<String> {
        match self {
            NonlinEquation::TwoPointBVP => vec!["y".to_string()],
            NonlinEquation::Harmonic => vec!["u".to_string(), "v".to_string()],
            _ => vec!["u".to_string()],
        }
    }

    pub fn boundary_conditions(&self) -> (Vec<&'static str>, Vec<&'static str>) {
        match self {
            NonlinEquation::TwoPointBVP => (vec!["y - 1"], vec!["y - exp(-1)"]),
            NonlinEquation::InverseCubic => (vec!["u - 1"], vec!["u - 0.5"]),
            NonlinEquation::QuadraticDecay => (vec!["u + 1.5"], vec!["u + 6/9"]),
            NonlinEquation::Harmonic => (vec!["u", "v - 1"], vec![]),
            NonlinEquation::Exponential => (vec!["u - 1"], vec![]),
        }
    }

    pub fn span(&self) -> (f64, f64) {
        match self {
            NonlinEquation::Harmonic => (0.0, std::f64::consts::PI),
            _ => (0.0, 1.0),
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, NonlinEquation::Harmonic | NonlinEquation::Exponential)
    }

    /// exact solution at `x`, one value per unknown
    pub fn exact_solution(&self, x: f64) -> Vec<f64> {
        match self {
            NonlinEquation::TwoPointBVP => vec![(-x * x).exp()],
            NonlinEquation::InverseCubic => vec![1.0 / (x + 1.0)],
            NonlinEquation::QuadraticDecay => vec![-6.0 / ((x + 2.0) * (x + 2.0))],
            NonlinEquation::Harmonic => vec![x.sin(), x.cos()],
            NonlinEquation::Exponential => vec![x.exp()],
        }
    }

    pub fn chebop(&self) -> SolveResult<Chebop> {
        let (lbc, rbc) = self.boundary_conditions();
        let mut op = Chebop::new(self.span(), self.setup())?;
        for c in lbc {
            op = op.with_lbc(c);
        }
        for c in rbc {
            op = op.with_rbc(c);
        }
        Ok(op)
    }

    /// largest deviation from the exact solution on `npts` uniform points
    pub fn max_error(&self, solution: &[Chebfun], npts: usize) -> f64 {
        let (a, b) = self.span();
        let mut err: f64 = 0.0;
        for i in 0..npts {
            let x = a + (b - a) * i as f64 / (npts - 1).max(1) as f64;
            let exact = self.exact_solution(x);
            for (u, e) in solution.iter().zip(exact.iter()) {
                err = err.max((u.eval(x) - e).abs());
            }
        }
        err
    }
}

/// linear PDEs on a rectangle with exact solutions
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, Display)]
pub enum PdeExample {
    /// u_xx + u_yy = -2(1-y^2) - 2(1-x^2), u = (1-x^2)(1-y^2)
    Poisson,
    /// u_xx + u_yy = 0 with boundary data x*y, u = x*y
    Laplace,
    /// u_xx + u_yy + x*y*u with u = x*y (1+x) on [0,1]x[0,1]
    VariableCoefficient,
}

impl PdeExample {
    pub fn domain(&self) -> [f64; 4] {
        match self {
            PdeExample::VariableCoefficient => [0.0, 1.0, 0.0, 1.0],
            _ => [-1.0, 1.0, -1.0, 1.0],
        }
    }

    pub fn exact_solution(&self, x: f64, y: f64) -> f64 {
        match self {
            PdeExample::Poisson => (1.0 - x * x) * (1.0 - y * y),
            PdeExample::Laplace => x * y,
            PdeExample::VariableCoefficient => x * y * (1.0 + x),
        }
    }

    pub fn operator(&self) -> SolveResult<Chebop2> {
        let text = match self {
            PdeExample::VariableCoefficient => "(x, y, u) -> u_xx + u_yy + x*y*u",
            _ => "(x, y, u) -> u_xx + u_yy",
        };
        let op = Chebop2::from_str(self.domain(), text)?;
        let exact = *self;
        Ok(op.with_dirichlet_everywhere(move |x, y| exact.exact_solution(x, y)))
    }

    pub fn rhs(&self) -> Chebfun2 {
        let dom = self.domain();
        match self {
            PdeExample::Poisson => {
                Chebfun2::from_fn(|x, y| -2.0 * (1.0 - y * y) - 2.0 * (1.0 - x * x), dom)
            }
            PdeExample::Laplace => Chebfun2::zeros(dom),
            PdeExample::VariableCoefficient => {
                Chebfun2::from_fn(|x, y| 2.0 * y + x * y * x * y * (1.0 + x), dom)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::BVP_Spectral::solvebvp::Rhs;
    use crate::numerical::preferences::Preferences;
    use strum::IntoEnumIterator;

    #[test]
    fn test_all_ode_examples() {
        for eq in NonlinEquation::iter() {
            let op = eq.chebop().unwrap();
            let (sol, info) = op.solve(&Rhs::Zero, &Preferences::default()).unwrap();
            assert_eq!(info.flags.all, eq.is_linear(), "{}", eq);
            assert_eq!(info.num_vars, eq.values().len());
            assert!(info.converged, "{} did not converge", eq);
            assert!(eq.max_error(&sol.components(), 41) < 1e-8, "{}", eq);
        }
    }

    #[test]
    fn test_all_pde_examples() {
        for ex in PdeExample::iter() {
            let op = ex.operator().unwrap();
            let (u, info) = op.solve(&ex.rhs(), &Preferences::default()).unwrap();
            assert!(info.resolved, "{}", ex);
            let [a, b, c, d] = ex.domain();
            for &(s, t) in &[(0.25, 0.5), (0.8, 0.1), (0.5, 0.9)] {
                let (x, y) = (a + s * (b - a), c + t * (d - c));
                assert!((u.eval(x, y) - ex.exact_solution(x, y)).abs() < 1e-9, "{}", ex);
            }
        }
    }
}
