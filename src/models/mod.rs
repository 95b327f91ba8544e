//! Model capability and the scoring service built on top of it

pub mod linear;
pub mod loader;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod scoring;

pub use linear::{LinearKind, LinearModel};
pub use loader::ModelLoader;
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
pub use scoring::{run_with_timeout, BatchScore, ScoringService, SingleScore};

use crate::error::Result;
use crate::feature_encoder::FeatureVector;

/// A pre-trained binary classifier.
///
/// Both operations are batch-shaped: one call scores every row and returns
/// one output per row, in input order. Implementations must not mutate
/// observable state during inference so one instance can serve concurrent
/// requests.
pub trait Model: Send + Sync {
    /// Model name, for logs and warnings.
    fn name(&self) -> &str;

    /// Number of input columns the model was fit on, when known.
    fn feature_count(&self) -> Option<usize> {
        None
    }

    /// Input column names in fit order, when the artifact records them.
    fn feature_names(&self) -> Option<Vec<String>> {
        None
    }

    /// Predict a class label (0 or 1) per row.
    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>>;

    /// Predict `[p(class 0), p(class 1)]` per row.
    ///
    /// Returns `Ok(None)` when the model has no probability output.
    fn predict_proba(&self, _rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
        Ok(None)
    }
}
