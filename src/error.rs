use thiserror::Error;

pub type EconormResult<T> = Result<T, EconormError>;

#[derive(Debug, Error)]
pub enum EconormError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Fx(#[from] FxError),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Cpi(#[from] CpiError),
}

/// Hard failures of the normalizer core. Everything else the normalizer
/// handles fail-soft by attaching a quality warning to the result.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Missing FX rate for '{currency}' (base '{base}')")]
    MissingFxRate { currency: String, base: String },

    #[error("Currency conversion requested but no FX table was supplied")]
    MissingFxTable,

    #[error("Conversion not supported: {0}")]
    UnsupportedConversion(String),

    #[error("Time target '{target}' requested but no source time basis could be inferred")]
    InvalidTimeBasis { target: String },
}

/// Errors of the FX acquisition subsystem.
#[derive(Debug, Error)]
pub enum FxError {
    #[error("FX source '{source_id}' failed: {reason}")]
    SourceFailure { source_id: String, reason: String },

    #[error("All {attempted} FX sources failed and no fallback table is configured")]
    Unavailable { attempted: usize },

    #[error("Invalid FX rate for '{code}': {rate}")]
    InvalidRate { code: String, rate: f64 },

    #[error("Malformed FX response from '{source_id}': {reason}")]
    MalformedResponse { source_id: String, reason: String },

    #[error("FX fetch cancelled")]
    Cancelled,
}

/// Errors raised by the aggregation helpers.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Cannot aggregate an empty series")]
    EmptyInput,

    #[error("Unit mismatch: expected '{expected}', found '{found}' (pass normalize_first to reconcile)")]
    UnitMismatch { expected: String, found: String },

    #[error("{kind} mean requires strictly positive values, found {value}")]
    NonPositiveValue { kind: String, value: f64 },

    #[error("Weighted mean received {weights} weights for {values} values")]
    WeightCountMismatch { weights: usize, values: usize },

    #[error("Weights must sum to a positive value, got {0}")]
    ZeroWeightSum(f64),

    #[error("Moving-average window must be at least 1")]
    EmptyWindow,

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Errors raised by the CPI deflation table.
#[derive(Debug, Error)]
pub enum CpiError {
    #[error("No CPI level recorded for year {0}")]
    UnknownYear(i32),

    #[error("CPI level for year {year} must be positive, got {level}")]
    InvalidLevel { year: i32, level: f64 },
}
