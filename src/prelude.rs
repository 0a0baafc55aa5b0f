//! Convenient prelude: import the most commonly used traits and types.
//!
//! Bring this into scope with:
//!
//! ```rust
//! use radau::prelude::*;
//! ```

pub use crate::{
    CancelToken, Config, Error, EvalError, Float, Method, ODE, ParallelContext, Solver, Stat,
    Triplet,
};
