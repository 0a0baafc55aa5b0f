#![allow(dead_code)]

use std::cell::Cell;

use radau::prelude::*;

/// Hairer-Wanner VII p.2 Eq. (1.1): y' = -50(y - cos x), y(0) = 0.
pub struct HwEq11 {
    pub analytical: bool,
}

impl HwEq11 {
    pub const XF: Float = 1.5;

    pub fn exact(x: Float) -> Float {
        let c = 2500.0 / 2501.0;
        c * (x.cos() + x.sin() / 50.0) - c * (-50.0 * x).exp()
    }
}

impl ODE for HwEq11 {
    fn ode(&self, x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        dydx[0] = -50.0 * (y[0] - x.cos());
        Ok(())
    }

    fn has_jac(&self) -> bool {
        self.analytical
    }

    fn jac(&self, _x: Float, _y: &[Float], jac: &mut Triplet) -> Result<(), EvalError> {
        jac.put(0, 0, -50.0);
        Ok(())
    }
}

/// y' = -y
pub struct Decay;

impl ODE for Decay {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        dydx[0] = -y[0];
        Ok(())
    }
}

/// y' = -50y, undefined for negative y.
pub struct PositiveDecay;

impl ODE for PositiveDecay {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        if y[0] < 0.0 {
            return Err(EvalError::Domain(format!("negative concentration {}", y[0])));
        }
        dydx[0] = -50.0 * y[0];
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

/// Tank drained at unit rate. Negative levels are outside the model.
pub struct Drain;

impl ODE for Drain {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        if y[0] < 0.0 {
            return Err(EvalError::Domain(format!("negative level {}", y[0])));
        }
        dydx[0] = -1.0;
        Ok(())
    }
}

/// Tank drained at unit rate, throttled linearly once the level falls
/// below `THROTTLE`. Negative levels are outside the model.
pub struct ThrottledDrain;

impl ThrottledDrain {
    pub const THROTTLE: Float = 1e-3;
}

impl ODE for ThrottledDrain {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        if y[0] < 0.0 {
            return Err(EvalError::Domain(format!("negative level {}", y[0])));
        }
        dydx[0] = -(y[0] / Self::THROTTLE).min(1.0);
        Ok(())
    }
}

/// Harmonic oscillator y0' = y1, y1' = -y0.
pub struct Oscillator;

impl ODE for Oscillator {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        dydx[0] = y[1];
        dydx[1] = -y[0];
        Ok(())
    }
}

/// Robertson's chemical kinetics.
pub struct Robertson;

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

/// Method-of-lines heat equation on (0, 1) with zero boundary values.
pub struct Heat {
    pub n: usize,
}

impl Heat {
    fn dx2(&self) -> Float {
        let h = 1.0 / (self.n + 1) as Float;
        h * h
    }

    pub fn initial(&self) -> Vec<Float> {
        let h = 1.0 / (self.n + 1) as Float;
        (1..=self.n)
            .map(|i| (std::f64::consts::PI as Float * i as Float * h).sin())
            .collect()
    }

    /// Decay rate of the lowest discrete mode.
    pub fn lambda(&self) -> Float {
        let s = (std::f64::consts::PI as Float / (2 * (self.n + 1)) as Float).sin();
        -4.0 * s * s / self.dx2()
    }
}

impl ODE for Heat {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        let n = self.n;
        for i in 0..n {
            let left = if i > 0 { y[i - 1] } else { 0.0 };
            let right = if i + 1 < n { y[i + 1] } else { 0.0 };
            dydx[i] = (left - 2.0 * y[i] + right) / self.dx2();
        }
        Ok(())
    }

    fn has_jac(&self) -> bool {
        true
    }

    fn jac(&self, _x: Float, _y: &[Float], jac: &mut Triplet) -> Result<(), EvalError> {
        let d = 1.0 / self.dx2();
        for i in 0..self.n {
            jac.put(i, i, -2.0 * d);
            if i > 0 {
                jac.put(i, i - 1, d);
            }
            if i + 1 < self.n {
                jac.put(i, i + 1, d);
            }
        }
        Ok(())
    }
}

/// Index-1 DAE: y0' = y1, 0 = y1 + y0, so y0 = e^{-x}.
pub struct AlgebraicDecay;

impl ODE for AlgebraicDecay {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        dydx[0] = y[1];
        dydx[1] = y[1] + y[0];
        Ok(())
    }

    fn mass(&self) -> Option<Triplet> {
        let mut m = Triplet::new(2, 2);
        m.put(0, 0, 1.0);
        Some(m)
    }
}

/// y' = -y that cancels its own solve after a number of evaluations.
pub struct SelfCancelling {
    pub token: CancelToken,
    pub after: usize,
    pub calls: Cell<usize>,
}

impl ODE for SelfCancelling {
    fn ode(&self, _x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError> {
        self.calls.set(self.calls.get() + 1);
        if self.calls.get() == self.after {
            self.token.cancel();
        }
        dydx[0] = -y[0];
        Ok(())
    }
}

pub fn assert_stat_invariants(stat: &Stat) {
    assert_eq!(stat.nsteps, stat.naccepted + stat.nrejected, "{}", stat);
    assert!(stat.ndecomp <= stat.nlinsol, "{}", stat);
}
