//! User-supplied ODE system.

use crate::{Float, error::EvalError, matrix::Triplet};

/// User-supplied ODE system `M·y' = f(x, y)`.
///
/// Implement this trait for your problem to provide the right-hand side
/// function. The integrator repeatedly calls `ode` with the current abscissa
/// `x` and state `y` and expects you to fill `dydx` with the derivative
/// values. Evaluators must be deterministic: the integrator may evaluate the
/// same `(x, y)` more than once.
///
/// Returning an [`EvalError`] (or writing NaN/Inf) rejects the current step
/// and makes the integrator retry with a smaller step size.
///
/// # Example
///
/// ```ignore
/// struct VanDerPol { eps: f64 }
/// impl ODE for VanDerPol {
///     fn ode(&self, _x: f64, y: &[f64], dydx: &mut [f64]) -> Result<(), EvalError> {
///         dydx[0] = y[1];
///         dydx[1] = ((1.0 - y[0]*y[0])*y[1] - y[0]) / self.eps;
///         Ok(())
///     }
/// }
/// ```
pub trait ODE {
    /// Right-hand side `f(x, y)`.
    fn ode(&self, x: Float, y: &[Float], dydx: &mut [Float]) -> Result<(), EvalError>;

    /// Whether [`ODE::jac`] is implemented. When `false`, the Jacobian is
    /// approximated by forward differences (if the configuration allows it).
    fn has_jac(&self) -> bool {
        false
    }

    /// Analytical Jacobian `df/dy` at `(x, y)`. `jac` is cleared before the
    /// call; only nonzero entries need to be added.
    fn jac(&self, x: Float, y: &[Float], jac: &mut Triplet) -> Result<(), EvalError> {
        let _ = (x, y, jac);
        Err(EvalError::Unsupported)
    }

    /// Constant mass matrix `M`. `None` means the identity.
    fn mass(&self) -> Option<Triplet> {
        None
    }
}

/// Evaluates `f(x, y)` and rejects non-finite results.
pub(crate) fn eval<F: ODE + ?Sized>(
    f: &F,
    x: Float,
    y: &[Float],
    dydx: &mut [Float],
) -> Result<(), EvalError> {
    f.ode(x, y, dydx)?;
    match dydx.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(EvalError::NonFinite(i)),
        None => Ok(()),
    }
}
