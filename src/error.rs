//! Error taxonomy shared by the encoder, the scoring service and batch I/O.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced to callers of the scoring library.
///
/// Non-fatal conditions (an unknown region, a model without probability
/// output) are reported as [`crate::types::ScoringWarning`] values instead.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The model artifact could not be loaded before scoring was attempted.
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    /// Feature count or column order differs from what the model expects,
    /// or the model returned output of the wrong shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A categorical field was supplied with a non-string value.
    #[error("invalid category for `{field}`: expected a string, got {found}")]
    InvalidCategory { field: &'static str, found: String },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("`{field}` = {value} is outside the accepted range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The model did not answer within the host's deadline.
    #[error("inference timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    /// Error raised by the inference runtime, passed through verbatim.
    #[error("model error: {0}")]
    Model(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = ScoringError> = std::result::Result<T, E>;
