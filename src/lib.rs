//! Fraud Scoring Library
//!
//! Encodes customer/transaction records into the feature vector a
//! pre-trained fraud classifier expects, scores them one at a time or in
//! batches, and builds the annotated tables and reports that front-ends
//! export.

pub mod batch;
pub mod config;
pub mod error;
pub mod feature_encoder;
pub mod metrics;
pub mod models;
pub mod report;
pub mod types;

pub use config::AppConfig;
pub use error::{Result, ScoringError};
pub use feature_encoder::{EncodedBatch, FeatureEncoder, FeatureVector};
pub use models::{Model, ModelLoader, ScoringService};
pub use report::RecordReport;
pub use types::{PredictionResult, RawRecord, ScoringWarning, Verdict};
