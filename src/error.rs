//! Errors for the Radau integrator

use thiserror::Error;

use crate::Float;

/// Failure reported by a right-hand side or Jacobian evaluator.
///
/// A returned `EvalError` does not abort the integration by itself: the
/// step is rejected, the step size is halved and the step is retried. Only
/// after `max_eval_failures` consecutive failures is it escalated as
/// [`Error::Evaluation`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The state is outside the domain of the model.
    #[error("domain error: {0}")]
    Domain(String),
    /// The evaluator produced NaN or an infinity.
    #[error("non-finite value in component {0}")]
    NonFinite(usize),
    /// The capability (e.g. an analytical Jacobian) is not provided.
    #[error("evaluator not provided")]
    Unsupported,
}

/// Validation errors returned while building a [`crate::Config`] or
/// starting a solve. Each variant names the first invalid field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("rtol must be positive (got {0})")]
    RtolMustBePositive(Float),
    #[error("atol must be positive (got {0})")]
    AtolMustBePositive(Float),
    #[error("rtol and atol must have matching lengths (got {0} and {1})")]
    ToleranceLengthMismatch(usize, usize),
    #[error("hmin must be positive (got {0})")]
    HminMustBePositive(Float),
    #[error("h0 must satisfy hmin <= h0 (got h0 = {h0}, hmin = {hmin})")]
    H0BelowHmin { h0: Float, hmin: Float },
    #[error("hmax must satisfy h0 <= hmax (got h0 = {h0}, hmax = {hmax})")]
    HmaxBelowH0 { h0: Float, hmax: Float },
    #[error("safety_factor must be in (0, 1) (got {0})")]
    SafetyFactorOutOfRange(Float),
    #[error("scale_min must be in (0, 1) (got {0})")]
    ScaleMinOutOfRange(Float),
    #[error("scale_max must be greater than 1 (got {0})")]
    ScaleMaxOutOfRange(Float),
    #[error("first_reject_factor must be in (0, 1) (got {0})")]
    FirstRejectFactorOutOfRange(Float),
    #[error("newton_maxiter must be positive (got {0})")]
    NewtonMaxIterMustBePositive(usize),
    #[error("newton_tol must be positive (got {0})")]
    NewtonTolMustBePositive(Float),
    #[error("theta_max must be in (0, 1) (got {0})")]
    ThetaMaxOutOfRange(Float),
    #[error("keep_h_min <= 1 <= keep_h_max is required (got {0}, {1})")]
    KeepHOutOfRange(Float, Float),
    #[error("uround must be in (0, 1) (got {0})")]
    URoundOutOfRange(Float),
    #[error("nmax must be positive (got {0})")]
    NMaxMustBePositive(usize),
    #[error("max_rejections must be positive (got {0})")]
    MaxRejectionsMustBePositive(usize),
    #[error("max_singular must be positive (got {0})")]
    MaxSingularMustBePositive(usize),
    #[error("jac_max_age must be positive (got {0})")]
    JacMaxAgeMustBePositive(usize),
    #[error("dense_dx must be positive (got {0})")]
    DenseDxMustBePositive(Float),
    #[error("unknown linear solver backend {0:?}")]
    UnknownBackend(String),
    #[error("a parallel context requires the sparse backend (got {0:?})")]
    ParallelRequiresSparse(String),
    #[error("the problem has no Jacobian and numerical_jacobian is disabled")]
    MissingJacobian,
    #[error("mass matrix must be {expected}x{expected} (got {rows}x{cols})")]
    MassShape {
        expected: usize,
        rows: usize,
        cols: usize,
    },
    #[error("ndim must be positive")]
    NdimMustBePositive,
    #[error("state has length {got} but the solver was built for ndim = {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("xf must be greater than x0 (got x0 = {x0}, xf = {xf})")]
    InvalidSpan { x0: Float, xf: Float },
}

/// Errors reported by a linear-solver backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinSolError {
    #[error("matrix is numerically singular (column {0})")]
    Singular(usize),
    #[error("matrix must be square with dimension {expected} (got {rows}x{cols})")]
    DimensionMismatch {
        expected: usize,
        rows: usize,
        cols: usize,
    },
    #[error("right-hand side has length {got}, expected {expected}")]
    RhsLength { expected: usize, got: usize },
    #[error("solve called before factorize")]
    NotFactorized,
    #[error("factorization handle is stale")]
    StaleHandle,
    #[error("non-finite entry in the matrix at ({0}, {1})")]
    NonFinite(usize, usize),
    #[error("worker pool failure: {0}")]
    Workers(String),
    #[error("sparse backend: {0}")]
    Backend(String),
}

/// Why the integration could not make progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonConvergence {
    /// The step size would have to shrink below `hmin` (or below the
    /// resolution of `x`) to continue.
    StepSizeTooSmall,
    /// More consecutive rejections than `max_rejections`.
    TooManyRejections,
}

impl std::fmt::Display for NonConvergence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonConvergence::StepSizeTooSmall => write!(f, "step size too small"),
            NonConvergence::TooManyRejections => write!(f, "too many consecutive rejections"),
        }
    }
}

/// Errors returned by [`crate::Config`] construction and [`crate::Solver`].
///
/// Every runtime variant carries the abscissa `x` of the last accepted
/// state and the step size `h` that was being attempted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("evaluation failed at x = {x}, h = {h}: {source}")]
    Evaluation {
        x: Float,
        h: Float,
        #[source]
        source: EvalError,
    },
    #[error("singular iteration matrix at x = {x}, h = {h}")]
    SingularMatrix { x: Float, h: Float },
    #[error("no convergence at x = {x}, h = {h}: {reason}")]
    NonConvergence {
        x: Float,
        h: Float,
        reason: NonConvergence,
    },
    #[error("step budget nmax = {nmax} exceeded at x = {x}, h = {h}")]
    BudgetExceeded { x: Float, h: Float, nmax: usize },
    #[error("cancelled at x = {x}, h = {h}")]
    Cancelled { x: Float, h: Float },
    #[error("linear solver failed at x = {x}, h = {h}: {source}")]
    LinearSolver {
        x: Float,
        h: Float,
        #[source]
        source: LinSolError,
    },
}
