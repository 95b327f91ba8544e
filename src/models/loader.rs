//! Model artifact loader

use crate::error::{Result, ScoringError};
use crate::models::{LinearModel, Model};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

/// Loads a model artifact once at startup, picking the format from the
/// file extension.
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of ONNX threads
    pub fn with_threads(onnx_threads: usize) -> Self {
        Self {
            onnx_threads: onnx_threads.max(1),
        }
    }

    /// Load the model at `path`.
    ///
    /// Every failure is reported as [`ScoringError::ModelUnavailable`] with
    /// the path and the underlying reason.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Arc<dyn Model>> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        self.load_inner(path).map_err(|e| {
            let reason = match e {
                ScoringError::ModelUnavailable(reason) => reason,
                other => format!("{}: {}", path.display(), other),
            };
            error!(path = %path.display(), reason = %reason, "Failed to load model");
            ScoringError::ModelUnavailable(reason)
        })
    }

    fn load_inner(&self, path: &Path) -> Result<Arc<dyn Model>> {
        if !path.exists() {
            return Err(ScoringError::ModelUnavailable(format!(
                "model file not found: {}",
                path.display()
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Ok(Arc::new(LinearModel::load(path)?)),
            Some("onnx") => self.load_onnx(path),
            _ => Err(ScoringError::ModelUnavailable(format!(
                "unsupported model format: {} (expected .json or .onnx)",
                path.display()
            ))),
        }
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(&self, path: &Path) -> Result<Arc<dyn Model>> {
        Ok(Arc::new(crate::models::OnnxModel::load(
            path,
            self.onnx_threads,
        )?))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(&self, path: &Path) -> Result<Arc<dyn Model>> {
        Err(ScoringError::ModelUnavailable(format!(
            "{}: built without ONNX support (enable the `onnx` feature), {} thread(s) requested",
            path.display(),
            self.onnx_threads
        )))
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}
