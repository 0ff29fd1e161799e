#![allow(non_snake_case)]
use crate::Utils::logger::{init_logger, save_chebfun2_to_csv, save_chebfuns_to_csv};
use crate::numerical::BVP_Spectral::chebop::Chebop;
use crate::numerical::BVP_Spectral::display::LogDisplay;
use crate::numerical::BVP_Spectral::solvebvp::{BvpOperator, Rhs, solve};
use crate::numerical::Chebop2::chebop2_operator::{BoundaryValue, Chebop2, Side};
use crate::numerical::Examples_and_utils::{NonlinEquation, PdeExample};
use crate::numerical::chebfun::Chebfun;
use crate::numerical::chebfun2::Chebfun2;
use crate::numerical::errors::SolveResult;
use crate::numerical::preferences::{Discretization, Preferences};
use log::info;
use nalgebra::DMatrix;
use strum::IntoEnumIterator;

pub fn bvp_examples(example: usize) -> SolveResult<()> {
    init_logger(Some("info"), false)?;
    match example {
        0 => {
            // linear problem: u'' + u = x, u(0) = 0, u(1) = 1
            let op = Chebop::new((0.0, 1.0), "(x, u) -> u'' + u")?
                .with_lbc("u")
                .with_rbc("u - 1");
            let rhs = Rhs::Function(Chebfun::identity((0.0, 1.0)));
            let (sol, info) = op.solve(&rhs, &Preferences::default())?;
            info!("flags {:?}, residual {:.3e}", info.flags, info.residual_norm);
            save_chebfuns_to_csv("linear_bvp.csv", "x", &["u".to_string()], &sol.components(), 101)?;
        }
        1 => {
            // every catalogued problem with both discretizations
            for eq in NonlinEquation::iter() {
                for disc in Discretization::iter() {
                    let prefs = Preferences::default().with_discretization(disc);
                    let (sol, info) = eq.chebop()?.solve(&Rhs::Zero, &prefs)?;
                    info!(
                        "{} ({}): {} iterations, max error {:.3e}",
                        eq,
                        disc,
                        info.iterations,
                        eq.max_error(&sol.components(), 101)
                    );
                }
            }
        }
        2 => {
            // Newton iteration with the progress display
            let op = NonlinEquation::TwoPointBVP.chebop()?;
            let prefs = Preferences::default().with_error_tolerance(1e-12);
            let (sol, info) = solve(BvpOperator::Ode(&op), &Rhs::Zero, &prefs, &mut LogDisplay::new(200))?;
            info!("update norms {:?}, damping {:?}", info.update_norms, info.damping);
            save_chebfuns_to_csv("two_point_bvp.csv", "x", &["y".to_string()], &sol.components(), 101)?;
        }
        3 => {
            // system with a constant right hand side given as a row: u' - v = 1, v' + u = 0
            let op = Chebop::new((0.0, 2.0), "(t, u, v) -> u' - v; v' + u")?.with_lbc("u; v");
            let rhs = Rhs::Numeric(DMatrix::from_row_slice(1, 2, &[1.0, 0.0]));
            let (sol, info) = op.solve(&rhs, &Preferences::default())?;
            info!("warnings {:?}", info.warnings);
            save_chebfuns_to_csv(
                "system_bvp.csv",
                "t",
                &["u".to_string(), "v".to_string()],
                &sol.components(),
                101,
            )?;
        }
        4 => {
            // Poisson equation with the catalogued solutions
            for ex in PdeExample::iter() {
                let (u, info) = ex.operator()?.solve(&ex.rhs(), &Preferences::default())?;
                info!("{}: rank {}, size {:?}, u(0.5, 0.5) = {}", ex, info.rank, info.size, u.eval(0.5, 0.5));
            }
        }
        5 => {
            // Helmholtz equation with Neumann data on the top side
            let dom = [0.0, 1.0, 0.0, 1.0];
            let op = Chebop2::from_str(dom, "(x, y, u) -> u_xx + u_yy + 10*u")?
                .with_dirichlet(Side::Left, BoundaryValue::Constant(0.0))
                .with_dirichlet(Side::Right, BoundaryValue::Constant(0.0))
                .with_dirichlet(Side::Down, BoundaryValue::Constant(0.0))
                .with_neumann(Side::Up, BoundaryValue::Constant(0.0));
            let f = Chebfun2::constant(1.0, dom);
            let (u, info) = op.solve(&f, &Preferences::default())?;
            info!("Helmholtz: {:?}", info);
            save_chebfun2_to_csv("helmholtz.csv", &u, 41, 41)?;
        }
        _ => {
            info!("no example with number {}", example);
        }
    }
    Ok(())
}
