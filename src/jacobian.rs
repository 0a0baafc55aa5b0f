//! Jacobian evaluation.

use crate::{
    Float,
    error::EvalError,
    matrix::Triplet,
    ode::{ODE, eval},
    stat::Stat,
};

/// Forward-difference approximation of `df/dy` at `(x, y)`.
///
/// Column `j` is perturbed by `sqrt(uround·max(1e-5, |y_j|))`. `f0` must
/// hold `f(x, y)`; `ywork` and `fwork` are scratch vectors of length `n`.
/// Only nonzero entries are stored in `jac`.
pub(crate) fn numerical_jacobian<F: ODE + ?Sized>(
    f: &F,
    x: Float,
    y: &[Float],
    f0: &[Float],
    uround: Float,
    ywork: &mut [Float],
    fwork: &mut [Float],
    jac: &mut Triplet,
    stat: &mut Stat,
) -> Result<(), EvalError> {
    let n = y.len();
    ywork.copy_from_slice(y);
    for j in 0..n {
        let ysafe = ywork[j];
        let delt = (uround * ysafe.abs().max(1e-5)).sqrt();
        ywork[j] = ysafe + delt;
        stat.nfeval += 1;
        eval(f, x, ywork, fwork)?;
        for i in 0..n {
            let d = (fwork[i] - f0[i]) / delt;
            if d != 0.0 {
                jac.put(i, j, d);
            }
        }
        ywork[j] = ysafe;
    }
    Ok(())
}

/// Analytical Jacobian from the problem, checked for non-finite entries.
pub(crate) fn analytical_jacobian<F: ODE + ?Sized>(
    f: &F,
    x: Float,
    y: &[Float],
    jac: &mut Triplet,
) -> Result<(), EvalError> {
    f.jac(x, y, jac)?;
    match jac.iter().find(|(_, _, v)| !v.is_finite()) {
        Some((i, _, _)) => Err(EvalError::NonFinite(i)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Robertson;

    impl ODE for Robertson {
        fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
            dydx[0] = -0.04 * y[0] + 1e4 * y[1] * y[2];
            dydx[2] = 3e7 * y[1] * y[1];
            dydx[1] = -dydx[0] - dydx[2];
            Ok(())
        }

        fn has_jac(&self) -> bool {
            true
        }

        fn jac(&self, _x: Float, y: &[Float], jac: &mut Triplet) -> Result<(), EvalError> {
            jac.put(0, 0, -0.04);
            jac.put(0, 1, 1e4 * y[2]);
            jac.put(0, 2, 1e4 * y[1]);
            jac.put(1, 0, 0.04);
            jac.put(1, 1, -1e4 * y[2] - 6e7 * y[1]);
            jac.put(1, 2, -1e4 * y[1]);
            jac.put(2, 1, 6e7 * y[1]);
            Ok(())
        }
    }

    #[test]
    fn finite_differences_match_analytical_jacobian() {
        let f = Robertson;
        let x = 0.0;
        let y = [0.9, 1e-5, 0.1];
        let mut f0 = [0.0; 3];
        eval(&f, x, &y, &mut f0).unwrap();

        let mut stat = Stat::default();
        let mut num = Triplet::new(3, 3);
        let (mut yw, mut fw) = ([0.0; 3], [0.0; 3]);
        numerical_jacobian(&f, x, &y, &f0, Float::EPSILON, &mut yw, &mut fw, &mut num, &mut stat)
            .unwrap();
        assert_eq!(stat.nfeval, 3);
        assert_eq!(yw, y);

        let mut ana = Triplet::new(3, 3);
        analytical_jacobian(&f, x, &y, &mut ana).unwrap();
        let (a, b) = (num.to_dense(), ana.to_dense());
        for i in 0..3 {
            for j in 0..3 {
                let tol = 1e-5 * (1.0 + b[(i, j)].abs());
                assert!((a[(i, j)] - b[(i, j)]).abs() < tol, "({}, {})", i, j);
            }
        }
    }
}
