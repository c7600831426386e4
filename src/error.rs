use thiserror::Error;

pub type PricingResult<T> = Result<T, PricingError>;

/// Library-wide error type.
///
/// Three kinds are distinguished so callers can react differently:
/// [`AssertionFailure`] flags a library bug, [`IllegalArgument`] a violated
/// precondition on the caller's side, and [`IllegalResult`] an intermediate
/// computation that produced an invalid value. None of them is retried
/// internally; all unwind to the caller.
#[derive(Debug, Error)]
pub enum PricingError {
    #[error(transparent)]
    Assertion(#[from] AssertionFailure),

    #[error(transparent)]
    IllegalArgument(#[from] IllegalArgument),

    #[error(transparent)]
    IllegalResult(#[from] IllegalResult),
}

/// Violated internal invariant. Seeing one of these is a bug in this crate,
/// not in calling code.
#[derive(Debug, Error)]
pub enum AssertionFailure {
    #[error("internal assertion failed: {0}")]
    Message(String),

    #[error("tabulated state for expiry index {0} missing during rollback")]
    MissingTabulation(usize),
}

/// A documented precondition was violated by the caller.
#[derive(Debug, Error)]
pub enum IllegalArgument {
    #[error("date serial {serial} outside the allowed range [{min}, {max}]")]
    DateOutOfRange { serial: i64, min: i64, max: i64 },

    #[error("date {date} outside curve range [{min}, {max}]")]
    CurveRangeViolation {
        date: String,
        min: String,
        max: String,
    },

    #[error("invalid date range for history: {0}")]
    InvalidHistoryRange(String),

    #[error("history dates must be sorted: {0}")]
    UnsortedDates(String),

    #[error("inconsistent duplicate entry in history at {0}")]
    InconsistentDuplicate(String),

    #[error("matrix is not symmetric positive definite: {0}")]
    NotPositiveDefinite(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid bracket [{xmin}, {xmax}]: {reason}")]
    InvalidBracket {
        xmin: f64,
        xmax: f64,
        reason: String,
    },

    #[error("word size ({0}) must be 31 or 32")]
    UnsupportedWordSize(u32),

    #[error("exponent ({0}) is not an allowed Mersenne exponent")]
    ImproperMersenneExponent(u32),

    #[error("creator id ({0}) must fit into 16 bits")]
    CreatorIdOverflow(u32),

    #[error("cannot set a price on an over-the-counter instrument")]
    PriceNotSettable,

    #[error("price not set")]
    PriceNotSet,

    #[error("time grid does not contain t = {0}")]
    TimeNotOnGrid(f64),

    #[error("model state queried at t = {0}, which is not a calibration time")]
    NotACalibrationTime(f64),

    #[error("{0}")]
    Message(String),
}

/// An intermediate computation produced an invalid value.
#[derive(Debug, Error)]
pub enum IllegalResult {
    #[error("{algorithm}: maximum number of function evaluations ({max_evaluations}) exceeded")]
    EvaluationBudgetExceeded {
        algorithm: &'static str,
        max_evaluations: usize,
    },

    #[error("{algorithm}: did not converge to accuracy {accuracy} within {max_evaluations} evaluations")]
    RootNotFound {
        algorithm: &'static str,
        accuracy: f64,
        max_evaluations: usize,
    },

    #[error("no irreducible characteristic polynomial found after {candidates} candidates (w = {word_size}, p = {exponent})")]
    MtParameterSearchExhausted {
        candidates: usize,
        word_size: u32,
        exponent: u32,
    },

    #[error("negative implied density at strike {strike} not recoverable")]
    NegativeDensity { strike: f64 },

    #[error("implied rates not monotone at calibration expiry {expiry}")]
    NonMonotoneRates { expiry: String },

    #[error("optimizer stopped without meeting any end criterion")]
    OptimizerStalled,

    #[error("{0}")]
    Message(String),
}

impl PricingError {
    /// Shorthand for an untyped assertion failure.
    pub fn assertion(msg: impl Into<String>) -> Self {
        AssertionFailure::Message(msg.into()).into()
    }

    /// Shorthand for an untyped illegal argument.
    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        IllegalArgument::Message(msg.into()).into()
    }

    /// Shorthand for an untyped illegal result.
    pub fn illegal_result(msg: impl Into<String>) -> Self {
        IllegalResult::Message(msg.into()).into()
    }
}
