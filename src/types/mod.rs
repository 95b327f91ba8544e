//! Type definitions for records, predictions and scoring diagnostics

pub mod prediction;
pub mod record;

pub use prediction::{PredictionResult, ScoringWarning, Verdict};
pub use record::{InputBounds, RawRecord};
