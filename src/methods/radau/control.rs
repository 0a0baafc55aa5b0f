//! Step-size selection.

use crate::{Float, config::Config, error::NonConvergence};

/// Error-based step-size controller with Gustafsson's predictive correction.
///
/// Every proposal is kept inside `[hmin, hmax]`. The only exception is the
/// final step, which the integrator may shorten below `hmin` to land on
/// `xf`.
#[derive(Debug, Clone)]
pub(crate) struct StepController {
    safety: Float,
    /// Bounds of `h/hnew`: `1/scale_max` and `1/scale_min`.
    facr: Float,
    facl: Float,
    first_reject_factor: Float,
    predictive: bool,
    hmin: Float,
    hmax: Float,
    cfac: Float,
    nit: usize,
    hacc: Float,
    erracc: Float,
}

impl StepController {
    pub(crate) fn new(conf: &Config, hmax: Float) -> Self {
        let nit = conf.newton_maxiter;
        Self {
            safety: conf.safety_factor,
            facr: 1.0 / conf.scale_max,
            facl: 1.0 / conf.scale_min,
            first_reject_factor: conf.first_reject_factor,
            predictive: conf.predictive,
            hmin: conf.hmin,
            hmax,
            cfac: conf.safety_factor * (1 + 2 * nit) as Float,
            nit,
            hacc: 0.0,
            erracc: 1e-2,
        }
    }

    pub(crate) fn hmax(&self) -> Float {
        self.hmax
    }

    /// Quotient `h/hnew` suggested by the scaled error `err` of a step that
    /// needed `newt` Newton iterations. Slowly converging steps get a smaller
    /// safety factor.
    pub(crate) fn quotient(&self, err: Float, newt: usize) -> Float {
        let fac = self.safety.min(self.cfac / (newt + 2 * self.nit) as Float);
        (err.powf(0.25) / fac).clamp(self.facr, self.facl)
    }

    /// Next step size after an accepted step of size `h`. `naccepted`
    /// includes the step just accepted.
    pub(crate) fn accept(&mut self, h: Float, err: Float, quot: Float, naccepted: usize) -> Float {
        let mut quot = quot;
        if self.predictive {
            if naccepted > 1 {
                let facgus = (self.hacc / h) * (err * err / self.erracc).powf(0.25) / self.safety;
                quot = quot.max(facgus.clamp(self.facr, self.facl));
            }
            self.hacc = h;
            self.erracc = err.max(1e-2);
        }
        h / quot
    }

    /// Next step size after the error test failed. The very first step is
    /// cut by `first_reject_factor` instead.
    pub(crate) fn reject(&self, h: Float, quot: Float, first: bool) -> Result<Float, NonConvergence> {
        if first {
            self.reduce(h, h * self.first_reject_factor)
        } else {
            self.reduce(h, h / quot)
        }
    }

    /// Clamps a reduced step size to `hmin`; the reduction must make
    /// progress, otherwise the step size is too small.
    pub(crate) fn reduce(&self, h: Float, hnew: Float) -> Result<Float, NonConvergence> {
        let floor = if h < self.hmin { 0.0 } else { self.hmin };
        let hnew = hnew.max(floor).min(self.hmax);
        if hnew < h && hnew > 0.0 {
            Ok(hnew)
        } else {
            Err(NonConvergence::StepSizeTooSmall)
        }
    }

    /// Bounds a proposal made after an accepted step.
    pub(crate) fn limit(&self, hnew: Float) -> Float {
        hnew.clamp(self.hmin, self.hmax.max(self.hmin))
    }
}
