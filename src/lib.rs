//! Radau IIA(5) integrator for stiff ODEs and index-1 DAEs `M·y' = f(x, y)`.
//!
//! The linear algebra of the Newton iterations is delegated to a pluggable
//! backend: dense LU, or a sparse LU that can be shared by the workers of a
//! caller-supplied [`ParallelContext`].

mod cancel;
mod config;
mod error;
mod interpolate;
mod jacobian;
mod methods;
mod ode;
mod output;
mod solver;
mod stat;
mod tolerance;

pub mod linsol;
pub mod matrix;
pub mod prelude;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::{ConfigError, Error, EvalError, LinSolError, NonConvergence};
pub use interpolate::Interpolate;
pub use linsol::{LinSolKind, ParallelContext};
pub use matrix::Triplet;
pub use methods::Method;
pub use ode::ODE;
pub use output::Output;
pub use solver::Solver;
pub use stat::Stat;
pub use tolerance::Tolerance;

// Prevent selecting two incompatible float precision features at once.
#[cfg(all(feature = "f32", feature = "f64"))]
compile_error!(
    "features 'f32' and 'f64' cannot both be enabled; pick exactly one Float precision feature"
);

/// Change this to f128, f64, f32 as desired.
#[cfg(feature = "f32")]
pub type Float = f32;
#[cfg(feature = "f64")]
pub type Float = f64;
