//! ONNX classifiers run through ONNX Runtime

use crate::error::{Result, ScoringError};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT};
use crate::models::Model;
use ort::memory::Allocator;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionOutputs};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, DynValue, Tensor};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Binary classifier exported to ONNX, e.g. by skl2onnx.
///
/// Expects one float input of shape `[batch, 8]`, an int64 `label` output
/// and, optionally, a probability output either as a `[batch, 2]` tensor or
/// as `seq(map(int64, float))`.
pub struct OnnxModel {
    name: String,
    /// ONNX Runtime needs exclusive access to the session during `run`
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    proba_output: Option<String>,
}

impl OnnxModel {
    /// Load an ONNX model from file.
    pub fn load<P: AsRef<Path>>(path: P, threads: usize) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx")
            .to_string();

        ort::init().commit().map_err(runtime_error)?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(threads))
            .and_then(|b| b.commit_from_file(path))
            .map_err(|e| {
                ScoringError::ModelUnavailable(format!("{}: {}", path.display(), e))
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| {
                ScoringError::ModelUnavailable(format!("{}: model has no outputs", path.display()))
            })?;

        let proba_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        info!(
            model = %name,
            input = %input_name,
            label_output = %label_output,
            proba_output = ?proba_output,
            threads = threads,
            "ONNX model loaded"
        );

        Ok(Self {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            proba_output,
        })
    }

    /// Run the session and hand the outputs to `extract`.
    fn run<T>(
        &self,
        rows: &[FeatureVector],
        extract: impl FnOnce(&SessionOutputs) -> Result<T>,
    ) -> Result<T> {
        let data: Vec<f32> = rows.iter().flat_map(|r| r.to_f32()).collect();
        let shape = vec![rows.len() as i64, FEATURE_COUNT as i64];
        let input = Tensor::from_array((shape, data)).map_err(runtime_error)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ScoringError::Model(format!("session lock poisoned: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(runtime_error)?;

        extract(&outputs)
    }
}

impl Model for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> Option<usize> {
        Some(FEATURE_COUNT)
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
        self.run(rows, |outputs| {
            let output = outputs.get(self.label_output.as_str()).ok_or_else(|| {
                ScoringError::Model(format!("missing output `{}`", self.label_output))
            })?;
            let (_, labels) = output.try_extract_tensor::<i64>().map_err(runtime_error)?;
            Ok(labels.to_vec())
        })
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
        let Some(proba_output) = &self.proba_output else {
            return Ok(None);
        };

        self.run(rows, |outputs| {
            let output = outputs.get(proba_output.as_str()).ok_or_else(|| {
                ScoringError::Model(format!("missing output `{}`", proba_output))
            })?;

            // Plain tensor output (zipmap disabled)
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                let dims: Vec<i64> = shape.iter().copied().collect();
                return probabilities_from_tensor(&dims, data, rows.len()).map(Some);
            }

            // seq(map(int64, float)), scikit-learn's default zipmap export
            if DynSequenceValueType::can_downcast(&output.dtype()) {
                return probabilities_from_sequence(output).map(Some);
            }

            Err(ScoringError::Model(format!(
                "unsupported probability output type for `{}`",
                proba_output
            )))
        })
    }
}

fn probabilities_from_tensor(dims: &[i64], data: &[f32], rows: usize) -> Result<Vec<[f64; 2]>> {
    match dims {
        [n, 2] if *n as usize == rows => Ok(data
            .chunks_exact(2)
            .map(|p| [p[0] as f64, p[1] as f64])
            .collect()),
        // Single column holding p(fraud)
        [n, 1] if *n as usize == rows => Ok(data
            .iter()
            .map(|&p| [1.0 - p as f64, p as f64])
            .collect()),
        _ => Err(ScoringError::ShapeMismatch(format!(
            "probability tensor has shape {:?}, expected [{}, 2]",
            dims, rows
        ))),
    }
}

fn probabilities_from_sequence(output: &DynValue) -> Result<Vec<[f64; 2]>> {
    let allocator = Allocator::default();
    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(runtime_error)?;
    let maps = sequence
        .try_extract_sequence::<DynMapValueType>(&allocator)
        .map_err(runtime_error)?;

    let mut probabilities = Vec::with_capacity(maps.len());
    for map in &maps {
        let mut proba = [0.0; 2];
        for (class_id, p) in map.try_extract_key_values::<i64, f32>().map_err(runtime_error)? {
            match class_id {
                0 | 1 => proba[class_id as usize] = p as f64,
                other => {
                    return Err(ScoringError::ShapeMismatch(format!(
                        "unexpected class {} in probability map",
                        other
                    )))
                }
            }
        }
        probabilities.push(proba);
    }

    debug!(rows = probabilities.len(), "Extracted probabilities from seq(map)");
    Ok(probabilities)
}

fn runtime_error(e: ort::Error) -> ScoringError {
    ScoringError::Model(e.to_string())
}
