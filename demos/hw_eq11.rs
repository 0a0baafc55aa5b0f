//! Hairer-Wanner VII p.2 Eq. (1.1) solved with Radau5.
//!
//! Usage: cargo run --example hw_eq11 -- [dense|sparse] [nworkers]

use radau::prelude::*;

struct HwEq11;

impl ODE for HwEq11 {
    fn ode(&self, x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        dydx[0] = -50.0 * (y[0] - x.cos());
        Ok(())
    }

    fn has_jac(&self) -> bool {
        true
    }

    fn jac(&self, _x: Float, _y: &[Float], jac: &mut Triplet) -> Result<(), EvalError> {
        jac.put(0, 0, -50.0);
        Ok(())
    }
}

fn exact(x: Float) -> Float {
    let c = 2500.0 / 2501.0;
    c * (x.cos() + x.sin() / 50.0) - c * (-50.0 * x).exp()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let backend = args.next().unwrap_or_else(|| "dense".to_string());
    let nworkers = args.next().and_then(|s| s.parse::<usize>().ok());

    let parallel = match nworkers {
        Some(n) => Some(ParallelContext::new(n)?),
        None => None,
    };
    let conf = Config::builder()
        .backend(backend)
        .maybe_parallel(parallel)
        .save_xy(true)
        .build()?;

    let xf = 1.5;
    let mut solver = Solver::new(conf, 1, &HwEq11)?;
    let mut y = vec![0.0];
    solver.solve(&mut y, 0.0, xf)?;

    println!("backend: {}", solver.config().ls_kind());
    println!("{}", solver.stat());
    println!();
    println!("{:>10} {:>14} {:>14}", "x", "y", "error");
    for (x, yi) in solver.out().iter() {
        println!("{:>10.6} {:>14.8} {:>14.3e}", x, yi[0], (yi[0] - exact(x)).abs());
    }
    println!();
    println!("y(xf) = {}, error = {:.3e}", y[0], (y[0] - exact(xf)).abs());
    Ok(())
}
