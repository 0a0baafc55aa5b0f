//! Radau5: 3-stage, order-5 Radau IIA implicit Runge-Kutta method.
//!
//! Solves stiff ODEs and index-1 DAEs `M·y' = f(x, y)` with adaptive step
//! size, simplified Newton iterations on the transformed stage system and
//! dense output.
//! Reference: Hairer & Wanner, Solving ODEs II (Radau IIA).

pub(crate) mod coeffs;
mod control;
mod dense;
mod newton;

pub(crate) use control::StepController;
pub(crate) use dense::DenseRadau;
pub(crate) use newton::{NewtonOutcome, NewtonStageSolver};
