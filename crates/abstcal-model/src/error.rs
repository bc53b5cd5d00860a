use thiserror::Error;

/// Errors surfaced by the abstinence calculation pipeline.
///
/// Configuration errors are raised before any dataset mutation; missing
/// per-subject data never lands here (it degrades the affected result to
/// not-applicable instead).
#[derive(Debug, Error)]
pub enum AbstcalError {
    #[error("invalid outlier range: min {min} is greater than max {max}")]
    InvalidRange { min: String, max: String },
    #[error("half-life must be greater than zero, got {0}")]
    InvalidHalfLife(f64),
    #[error("keep-mean duplicate resolution requires a numeric amount field")]
    NonNumericMean,
    #[error("malformed lapse definition: {0:?}")]
    MalformedLapseDefinition(String),
    #[error("{supplied} custom variable names supplied for {expected} abstinence variables")]
    NameCountMismatch { expected: usize, supplied: usize },
    #[error("{0} dataset is required for abstinence calculation")]
    MissingDataset(&'static str),
    #[error("visit {0:?} is not in the expected visit order")]
    UnknownVisit(String),
    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, AbstcalError>;
