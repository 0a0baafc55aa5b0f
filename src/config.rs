//! Configuration of the integrator.

use bon::bon;

use crate::{
    Float,
    error::{ConfigError, Error},
    linsol::{LinSolKind, ParallelContext},
    methods::Method,
    tolerance::Tolerance,
};

/// Immutable solver parameters.
///
/// Built with [`Config::builder`]; every field has a default and the whole
/// set is validated when `build()` is called. The first invalid field is
/// reported as a [`ConfigError`]; values are never clamped.
///
/// # Example
/// ```ignore
/// let conf = Config::builder()
///     .method(Method::Radau5)
///     .backend("sparse")
///     .rtol(1e-6)
///     .atol(1e-8)
///     .save_xy(true)
///     .build()?;
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) method: Method,
    rtol: Tolerance,
    atol: Tolerance,
    /// Tolerances actually used by the error control (see [`Config::builder`]).
    pub(crate) rtol_int: Tolerance,
    pub(crate) atol_int: Tolerance,
    pub(crate) h0: Float,
    pub(crate) hmin: Float,
    pub(crate) hmax: Option<Float>,
    pub(crate) safety_factor: Float,
    pub(crate) scale_min: Float,
    pub(crate) scale_max: Float,
    pub(crate) first_reject_factor: Float,
    pub(crate) newton_maxiter: usize,
    pub(crate) newton_tol: Float,
    pub(crate) theta_max: Float,
    pub(crate) keep_h_min: Float,
    pub(crate) keep_h_max: Float,
    pub(crate) jac_max_age: Option<usize>,
    pub(crate) predictive: bool,
    pub(crate) zero_start: bool,
    pub(crate) nmax: usize,
    pub(crate) max_rejections: usize,
    pub(crate) max_eval_failures: usize,
    pub(crate) max_singular: usize,
    pub(crate) numerical_jacobian: bool,
    pub(crate) uround: Float,
    pub(crate) ls_kind: LinSolKind,
    pub(crate) parallel: Option<ParallelContext>,
    pub(crate) save_xy: bool,
    pub(crate) dense_dx: Option<Float>,
}

#[bon]
impl Config {
    /// Validated configuration.
    ///
    /// The user tolerances are transformed the way RADAU5 does it,
    /// `rtol' = 0.1·rtol^(2/3)` and `atol' = rtol'·atol/rtol`, so that the
    /// order-3 embedded error estimate tracks the requested accuracy of the
    /// order-5 solution.
    #[builder]
    pub fn new(
        /// Integration method.
        #[builder(default)]
        method: Method,
        /// Relative tolerance, scalar or per component.
        #[builder(default = Tolerance::Scalar(1e-4), into)]
        rtol: Tolerance,
        /// Absolute tolerance, scalar or per component.
        #[builder(default = Tolerance::Scalar(1e-4), into)]
        atol: Tolerance,
        /// Initial step size. A solve starts with `min(h0, hmax)`.
        #[builder(default = 1e-4)]
        h0: Float,
        /// Minimum step size.
        #[builder(default = 1e-10)]
        hmin: Float,
        /// Maximal step size. Default: the whole interval `xf - x0`.
        hmax: Option<Float>,
        /// Safety factor in step-size prediction.
        #[builder(default = 0.9)]
        safety_factor: Float,
        /// Lower bound of `hnew/h`.
        #[builder(default = 0.2)]
        scale_min: Float,
        /// Upper bound of `hnew/h`.
        #[builder(default = 8.0)]
        scale_max: Float,
        /// Step multiplier applied when the very first step is rejected.
        #[builder(default = 0.1)]
        first_reject_factor: Float,
        /// Max number of iterations in the Newton solver.
        #[builder(default = 7)]
        newton_maxiter: usize,
        /// Newton stopping tolerance. Default:
        /// `max(10·uround/rtol', min(0.03, sqrt(rtol')))`.
        newton_tol: Option<Float>,
        /// Largest Newton contraction rate for which the Jacobian is kept.
        #[builder(default = 1e-3)]
        theta_max: Float,
        /// The step size (and factorization) is kept when
        /// `keep_h_min <= hnew/h <= keep_h_max`.
        #[builder(default = 1.0)]
        keep_h_min: Float,
        #[builder(default = 1.2)]
        keep_h_max: Float,
        /// Recompute the Jacobian after this many accepted steps even if the
        /// Newton iteration still converges fast.
        jac_max_age: Option<usize>,
        /// Use Gustafsson's predictive step-size controller.
        #[builder(default = true)]
        predictive: bool,
        /// Start every Newton iteration from zero instead of extrapolating
        /// the previous step.
        #[builder(default)]
        zero_start: bool,
        /// Maximum number of steps.
        #[builder(default = 1000)]
        nmax: usize,
        /// Maximum number of consecutive rejected steps.
        #[builder(default = 50)]
        max_rejections: usize,
        /// Maximum number of consecutive failed evaluations.
        #[builder(default = 10)]
        max_eval_failures: usize,
        /// Maximum number of consecutive singular iteration matrices.
        #[builder(default = 5)]
        max_singular: usize,
        /// Approximate the Jacobian by finite differences when the problem
        /// does not provide one.
        #[builder(default = true)]
        numerical_jacobian: bool,
        /// The rounding unit, typically machine epsilon.
        #[builder(default = Float::EPSILON)]
        uround: Float,
        /// Linear solver backend: `"dense"` or `"sparse"`.
        #[builder(default = String::from("dense"), into)]
        backend: String,
        /// Workers sharing the sparse factorization.
        parallel: Option<ParallelContext>,
        /// Retain the accepted `(x, y)` samples.
        #[builder(default)]
        save_xy: bool,
        /// Spacing of dense-output samples.
        dense_dx: Option<Float>,
    ) -> Result<Self, Error> {
        check_tolerance(&rtol, ConfigError::RtolMustBePositive)?;
        check_tolerance(&atol, ConfigError::AtolMustBePositive)?;
        if let (Some(nr), Some(na)) = (rtol.len(), atol.len()) {
            if nr != na {
                return Err(ConfigError::ToleranceLengthMismatch(nr, na).into());
            }
        }
        if !(hmin > 0.0) {
            return Err(ConfigError::HminMustBePositive(hmin).into());
        }
        if !(h0 >= hmin) {
            return Err(ConfigError::H0BelowHmin { h0, hmin }.into());
        }
        if let Some(hmax) = hmax {
            if !(hmax >= h0) {
                return Err(ConfigError::HmaxBelowH0 { h0, hmax }.into());
            }
        }
        if !(safety_factor > 0.0 && safety_factor < 1.0) {
            return Err(ConfigError::SafetyFactorOutOfRange(safety_factor).into());
        }
        if !(scale_min > 0.0 && scale_min < 1.0) {
            return Err(ConfigError::ScaleMinOutOfRange(scale_min).into());
        }
        if !(scale_max > 1.0) {
            return Err(ConfigError::ScaleMaxOutOfRange(scale_max).into());
        }
        if !(first_reject_factor > 0.0 && first_reject_factor < 1.0) {
            return Err(ConfigError::FirstRejectFactorOutOfRange(first_reject_factor).into());
        }
        if newton_maxiter == 0 {
            return Err(ConfigError::NewtonMaxIterMustBePositive(newton_maxiter).into());
        }
        if let Some(tol) = newton_tol {
            if !(tol > 0.0) {
                return Err(ConfigError::NewtonTolMustBePositive(tol).into());
            }
        }
        if !(theta_max > 0.0 && theta_max < 1.0) {
            return Err(ConfigError::ThetaMaxOutOfRange(theta_max).into());
        }
        if !(keep_h_min <= 1.0 && keep_h_max >= 1.0 && keep_h_min > 0.0) {
            return Err(ConfigError::KeepHOutOfRange(keep_h_min, keep_h_max).into());
        }
        if !(uround > 0.0 && uround < 1.0) {
            return Err(ConfigError::URoundOutOfRange(uround).into());
        }
        if nmax == 0 {
            return Err(ConfigError::NMaxMustBePositive(nmax).into());
        }
        if max_rejections == 0 {
            return Err(ConfigError::MaxRejectionsMustBePositive(max_rejections).into());
        }
        if max_singular == 0 {
            return Err(ConfigError::MaxSingularMustBePositive(max_singular).into());
        }
        if jac_max_age == Some(0) {
            return Err(ConfigError::JacMaxAgeMustBePositive(0).into());
        }
        if let Some(dx) = dense_dx {
            if !(dx > 0.0) {
                return Err(ConfigError::DenseDxMustBePositive(dx).into());
            }
        }
        let ls_kind: LinSolKind = backend.parse()?;
        if parallel.is_some() && ls_kind != LinSolKind::Sparse {
            return Err(ConfigError::ParallelRequiresSparse(backend).into());
        }

        let rtol_int = rtol.map(|r| 0.1 * r.powf(2.0 / 3.0));
        let quot = atol.zip(&rtol, |a, r| a / r);
        let atol_int = quot.zip(&rtol_int, |q, r| q * r);
        let newton_tol = newton_tol.unwrap_or_else(|| {
            let r = rtol_int.min();
            (10.0 * uround / r).max((0.03 as Float).min(r.sqrt()))
        });

        Ok(Self {
            method,
            rtol,
            atol,
            rtol_int,
            atol_int,
            h0,
            hmin,
            hmax,
            safety_factor,
            scale_min,
            scale_max,
            first_reject_factor,
            newton_maxiter,
            newton_tol,
            theta_max,
            keep_h_min,
            keep_h_max,
            jac_max_age,
            predictive,
            zero_start,
            nmax,
            max_rejections,
            max_eval_failures,
            max_singular,
            numerical_jacobian,
            uround,
            ls_kind,
            parallel,
            save_xy,
            dense_dx,
        })
    }
}

impl Config {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Relative tolerance as given by the user.
    pub fn rtol(&self) -> &Tolerance {
        &self.rtol
    }

    /// Absolute tolerance as given by the user.
    pub fn atol(&self) -> &Tolerance {
        &self.atol
    }

    pub fn h0(&self) -> Float {
        self.h0
    }

    pub fn hmin(&self) -> Float {
        self.hmin
    }

    pub fn hmax(&self) -> Option<Float> {
        self.hmax
    }

    pub fn newton_tol(&self) -> Float {
        self.newton_tol
    }

    pub fn nmax(&self) -> usize {
        self.nmax
    }

    pub fn ls_kind(&self) -> LinSolKind {
        self.ls_kind
    }

    pub fn parallel(&self) -> Option<&ParallelContext> {
        self.parallel.as_ref()
    }

    pub fn save_xy(&self) -> bool {
        self.save_xy
    }

    pub fn dense_dx(&self) -> Option<Float> {
        self.dense_dx
    }

    /// Error weights `w_i = atol'_i + rtol'_i·|y_i|`.
    pub(crate) fn scale(&self, y: &[Float], scal: &mut [Float]) {
        for (i, (s, yi)) in scal.iter_mut().zip(y).enumerate() {
            *s = self.atol_int[i] + self.rtol_int[i] * yi.abs();
        }
    }
}

fn check_tolerance(tol: &Tolerance, err: fn(Float) -> ConfigError) -> Result<(), ConfigError> {
    let bad = match tol {
        Tolerance::Scalar(v) => (!(*v > 0.0)).then_some(*v),
        Tolerance::Vector(vs) => vs.iter().copied().find(|v| !(*v > 0.0)),
    };
    match bad {
        Some(v) => Err(err(v)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let conf = Config::builder().build().unwrap();
        assert_eq!(conf.method(), Method::Radau5);
        assert_eq!(conf.ls_kind(), LinSolKind::Dense);
        assert_eq!(conf.h0(), 1e-4);
        assert_eq!(conf.hmin(), 1e-10);
        assert!(!conf.save_xy());
        // rtol' = 0.1·(1e-4)^(2/3)
        let r = 0.1 * (1e-4 as Float).powf(2.0 / 3.0);
        assert!((conf.rtol_int[0] - r).abs() < 1e-15);
        assert!((conf.atol_int[0] - r).abs() < 1e-15);
        assert!((conf.newton_tol() - (0.03 as Float).min(r.sqrt())).abs() < 1e-15);
    }

    #[test]
    fn first_invalid_field_is_named() {
        let err = Config::builder().rtol(-1.0).atol(-2.0).build().unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::RtolMustBePositive(-1.0)));

        let err = Config::builder().atol(vec![1e-6, 0.0]).build().unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::AtolMustBePositive(0.0)));

        let err = Config::builder().hmin(1e-2).h0(1e-3).build().unwrap_err();
        assert_eq!(
            err,
            Error::Config(ConfigError::H0BelowHmin { h0: 1e-3, hmin: 1e-2 })
        );

        let err = Config::builder().h0(1.0).hmax(0.5).build().unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::HmaxBelowH0 { h0: 1.0, hmax: 0.5 }));

        let err = Config::builder().safety_factor(1.0).build().unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::SafetyFactorOutOfRange(1.0)));

        let err = Config::builder().newton_maxiter(0).build().unwrap_err();
        assert_eq!(err, Error::Config(ConfigError::NewtonMaxIterMustBePositive(0)));
    }

    #[test]
    fn backend_is_selected_by_name() {
        let conf = Config::builder().backend("sparse").build().unwrap();
        assert_eq!(conf.ls_kind(), LinSolKind::Sparse);

        let err = Config::builder().backend("umfpack").build().unwrap_err();
        assert_eq!(
            err,
            Error::Config(ConfigError::UnknownBackend("umfpack".to_string()))
        );
    }

    #[test]
    fn parallel_context_requires_sparse_backend() {
        let ctx = ParallelContext::new(2).unwrap();
        let err = Config::builder().parallel(ctx.clone()).build().unwrap_err();
        assert_eq!(
            err,
            Error::Config(ConfigError::ParallelRequiresSparse("dense".to_string()))
        );
        let conf = Config::builder().backend("sparse").parallel(ctx).build().unwrap();
        assert_eq!(conf.parallel().map(ParallelContext::nworkers), Some(2));
    }

    #[test]
    fn vector_tolerances_are_transformed_per_component() {
        let conf = Config::builder()
            .rtol(vec![1e-3, 1e-6])
            .atol(vec![1e-6, 1e-6])
            .build()
            .unwrap();
        let mut scal = vec![0.0; 2];
        conf.scale(&[2.0, -2.0], &mut scal);
        for i in 0..2 {
            let r = 0.1 * conf.rtol()[i].powf(2.0 / 3.0);
            let a = r * conf.atol()[i] / conf.rtol()[i];
            assert!((scal[i] - (a + 2.0 * r)).abs() < 1e-15);
        }
    }
}
