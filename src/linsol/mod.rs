//! Linear-solver backends for the Newton iteration matrices.
//!
//! Every backend factorizes a square matrix given in [`Triplet`] form and
//! solves with the factors. The factors live inside the backend; callers
//! hold an opaque [`Handle`] that becomes stale as soon as the backend is
//! refactorized or freed.

mod dense;
mod parallel;
mod sparse;

use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    Float,
    error::{ConfigError, LinSolError},
    matrix::Triplet,
};

pub use dense::DenseSolver;
pub use parallel::ParallelContext;
pub use sparse::SparseSolver;

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Opaque reference to the factors held by a [`LinSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u64);

impl Handle {
    pub(crate) fn fresh() -> Self {
        Handle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
    }
}

/// Names the linear-algebra implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinSolKind {
    /// Dense LU with partial pivoting.
    #[default]
    Dense,
    /// Sparse LU; shared by the workers of a [`ParallelContext`] when one
    /// is supplied.
    Sparse,
}

impl LinSolKind {
    pub fn name(&self) -> &'static str {
        match self {
            LinSolKind::Dense => "dense",
            LinSolKind::Sparse => "sparse",
        }
    }
}

impl fmt::Display for LinSolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LinSolKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense" => Ok(LinSolKind::Dense),
            "sparse" => Ok(LinSolKind::Sparse),
            _ => Err(ConfigError::UnknownBackend(s.to_string())),
        }
    }
}

/// Factorize-and-solve capability shared by all backends.
pub trait LinSolver: Send {
    fn kind(&self) -> LinSolKind;

    /// Factorizes `a`, invalidating any previous handle.
    fn factorize(&mut self, a: &Triplet) -> Result<Handle, LinSolError>;

    /// Overwrites `rhs` with the solution of `A·x = rhs`.
    fn solve(&self, handle: Handle, rhs: &mut [Float]) -> Result<(), LinSolError>;

    /// Releases the factors. Outstanding handles become stale.
    fn free(&mut self);
}

/// Builds the backend named by `kind` for `n x n` systems. Pivots below
/// `tol·‖A‖∞` are treated as singular.
pub fn new_lin_solver(
    kind: LinSolKind,
    n: usize,
    tol: Float,
    ctx: Option<&ParallelContext>,
) -> Box<dyn LinSolver> {
    match kind {
        LinSolKind::Dense => Box::new(DenseSolver::new(n, tol)),
        LinSolKind::Sparse => Box::new(SparseSolver::new(n, tol, ctx.cloned())),
    }
}

fn check_square(a: &Triplet, n: usize) -> Result<(), LinSolError> {
    if a.nrow() != n || a.ncol() != n {
        return Err(LinSolError::DimensionMismatch {
            expected: n,
            rows: a.nrow(),
            cols: a.ncol(),
        });
    }
    Ok(())
}
