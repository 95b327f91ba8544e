//! Scoring service: runs a loaded model over encoded feature vectors

use crate::error::{Result, ScoringError};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::models::Model;
use crate::types::{PredictionResult, ScoringWarning, Verdict};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Result of scoring one feature vector.
#[derive(Debug, Clone)]
pub struct SingleScore {
    pub result: PredictionResult,
    /// Set when the model could not provide a probability
    pub warning: Option<ScoringWarning>,
}

/// Result of scoring a batch; `results[i]` belongs to input row `i`.
#[derive(Debug, Clone, Default)]
pub struct BatchScore {
    pub results: Vec<PredictionResult>,
    pub warnings: Vec<ScoringWarning>,
    /// Time spent in the model call
    pub elapsed: Duration,
}

enum ModelHandle {
    Ready(Arc<dyn Model>),
    Unavailable(String),
}

/// Stateless scoring front for a shared, read-only model.
///
/// The service never loads the model itself: the host hands it either a
/// loaded model or the reason loading failed.
pub struct ScoringService {
    model: ModelHandle,
}

impl ScoringService {
    /// Create a scoring service over a loaded model.
    pub fn new(model: Arc<dyn Model>) -> Self {
        Self {
            model: ModelHandle::Ready(model),
        }
    }

    /// Create a service whose every scoring call fails with
    /// [`ScoringError::ModelUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            model: ModelHandle::Unavailable(reason.into()),
        }
    }

    /// Create a service from the outcome of a model load.
    pub fn from_load(loaded: Result<Arc<dyn Model>>) -> Self {
        match loaded {
            Ok(model) => Self::new(model),
            Err(ScoringError::ModelUnavailable(reason)) => Self::unavailable(reason),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }

    /// Whether a model is loaded.
    pub fn is_ready(&self) -> bool {
        matches!(self.model, ModelHandle::Ready(_))
    }

    /// Name of the loaded model, if any.
    pub fn model_name(&self) -> Option<&str> {
        match &self.model {
            ModelHandle::Ready(model) => Some(model.name()),
            ModelHandle::Unavailable(_) => None,
        }
    }

    fn model(&self) -> Result<&dyn Model> {
        match &self.model {
            ModelHandle::Ready(model) => Ok(model.as_ref()),
            ModelHandle::Unavailable(reason) => Err(ScoringError::ModelUnavailable(reason.clone())),
        }
    }

    /// Score a single feature vector.
    ///
    /// Uses the model's probabilities when available; otherwise the plain
    /// label with a confidence of 100% and a
    /// [`ScoringWarning::ProbabilityUnavailable`] warning.
    pub fn score_one(&self, vector: &FeatureVector) -> Result<SingleScore> {
        let batch = self.score_batch(std::slice::from_ref(vector))?;
        let result = batch.results.first().copied().ok_or_else(|| {
            ScoringError::ShapeMismatch("model returned no prediction".to_string())
        })?;

        Ok(SingleScore {
            result,
            warning: batch.warnings.into_iter().next(),
        })
    }

    /// Score a batch of feature vectors with one model call.
    ///
    /// Output order always matches input order.
    pub fn score_batch(&self, vectors: &[FeatureVector]) -> Result<BatchScore> {
        let model = self.model()?;
        check_model_shape(model)?;

        if vectors.is_empty() {
            return Ok(BatchScore::default());
        }

        let start = Instant::now();
        let mut warnings = Vec::new();

        let results = match model.predict_proba(vectors)? {
            Some(probabilities) => {
                check_row_count(model, probabilities.len(), vectors.len())?;
                probabilities
                    .into_iter()
                    .enumerate()
                    .map(|(row, proba)| {
                        if proba.iter().all(|p| p.is_finite()) {
                            Ok(PredictionResult::from_probabilities(proba))
                        } else {
                            Err(ScoringError::Model(format!(
                                "model `{}` returned non-finite probabilities {:?} for row {}",
                                model.name(),
                                proba,
                                row
                            )))
                        }
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            None => {
                warn!(
                    model = %model.name(),
                    "Model has no probability output, reporting 100% confidence"
                );
                warnings.push(ScoringWarning::ProbabilityUnavailable {
                    model: model.name().to_string(),
                });

                let labels = model.predict(vectors)?;
                check_row_count(model, labels.len(), vectors.len())?;
                labels
                    .into_iter()
                    .enumerate()
                    .map(|(row, label)| {
                        Verdict::from_label(label)
                            .map(|verdict| PredictionResult::new(verdict, 100.0))
                            .ok_or_else(|| {
                                ScoringError::ShapeMismatch(format!(
                                    "model `{}` returned label {} for row {}, expected 0 or 1",
                                    model.name(),
                                    label,
                                    row
                                ))
                            })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        let elapsed = start.elapsed();
        debug!(
            model = %model.name(),
            rows = results.len(),
            elapsed_us = elapsed.as_micros(),
            "Batch scored"
        );

        Ok(BatchScore {
            results,
            warnings,
            elapsed,
        })
    }
}

/// Run a scoring call on a dedicated thread, giving up after `timeout`.
///
/// A call that misses the deadline is left running on its detached thread.
/// Neither the caller nor runtime shutdown waits for it.
pub async fn run_with_timeout<T, F>(timeout: Duration, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::Builder::new()
        .name("inference".to_string())
        .spawn(move || {
            // Receiver is gone once the deadline passed
            let _ = tx.send(f());
        })?;

    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(ScoringError::Model(
            "inference thread exited without a result".to_string(),
        )),
        Err(_) => {
            warn!(timeout_ms = timeout.as_millis() as u64, "Inference timed out");
            Err(ScoringError::Timeout(timeout))
        }
    }
}

fn check_model_shape(model: &dyn Model) -> Result<()> {
    if let Some(count) = model.feature_count() {
        if count != FEATURE_COUNT {
            return Err(ScoringError::ShapeMismatch(format!(
                "model `{}` expects {} features, encoder produces {}",
                model.name(),
                count,
                FEATURE_COUNT
            )));
        }
    }

    if let Some(names) = model.feature_names() {
        let differs = names.len() != FEATURE_COUNT
            || names.iter().zip(FEATURE_NAMES.iter()).any(|(a, b)| a != b);
        if differs {
            return Err(ScoringError::ShapeMismatch(format!(
                "model `{}` was fit on columns {:?}, encoder produces {:?}",
                model.name(),
                names,
                FEATURE_NAMES
            )));
        }
    }

    Ok(())
}

fn check_row_count(model: &dyn Model, got: usize, expected: usize) -> Result<()> {
    if got != expected {
        return Err(ScoringError::ShapeMismatch(format!(
            "model `{}` returned {} predictions for {} rows",
            model.name(),
            got,
            expected
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_encoder::FeatureEncoder;
    use crate::types::record::sample_record;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns fixed probabilities for every row.
    struct ProbaStub {
        proba: [f64; 2],
    }

    impl Model for ProbaStub {
        fn name(&self) -> &str {
            "proba_stub"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Ok(vec![i64::from(self.proba[1] > self.proba[0]); rows.len()])
        }

        fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
            Ok(Some(vec![self.proba; rows.len()]))
        }
    }

    /// Label-only model returning a fixed label.
    struct LabelStub {
        label: i64,
    }

    impl Model for LabelStub {
        fn name(&self) -> &str {
            "label_stub"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Ok(vec![self.label; rows.len()])
        }
    }

    /// Flags rows whose age is odd, counting model calls.
    struct AgeParityStub {
        calls: AtomicUsize,
    }

    impl Model for AgeParityStub {
        fn name(&self) -> &str {
            "age_parity"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(rows.iter().map(|r| (r.age() as i64) % 2).collect())
        }

        fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(
                rows.iter()
                    .map(|r| {
                        let p = r.age() / 100.0;
                        [1.0 - p, p]
                    })
                    .collect(),
            ))
        }
    }

    /// Fraud probability falls with the region encoding, so an unknown
    /// region scores as certain fraud.
    struct RegionStub;

    impl Model for RegionStub {
        fn name(&self) -> &str {
            "region_stub"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Ok(rows
                .iter()
                .map(|r| i64::from(r.region_encoded() < 0.25))
                .collect())
        }

        fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
            Ok(Some(
                rows.iter()
                    .map(|r| {
                        let p = 2.0 * r.region_encoded();
                        [p, 1.0 - p]
                    })
                    .collect(),
            ))
        }
    }

    /// Sleeps before answering.
    struct SlowStub {
        delay: Duration,
    }

    impl Model for SlowStub {
        fn name(&self) -> &str {
            "slow"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            std::thread::sleep(self.delay);
            Ok(vec![0; rows.len()])
        }
    }

    struct ShortOutputStub;

    impl Model for ShortOutputStub {
        fn name(&self) -> &str {
            "short"
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Ok(vec![0; rows.len().saturating_sub(1)])
        }
    }

    struct WideModelStub;

    impl Model for WideModelStub {
        fn name(&self) -> &str {
            "wide"
        }

        fn feature_count(&self) -> Option<usize> {
            Some(9)
        }

        fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Ok(vec![0; rows.len()])
        }
    }

    struct FailingStub;

    impl Model for FailingStub {
        fn name(&self) -> &str {
            "failing"
        }

        fn predict(&self, _rows: &[FeatureVector]) -> Result<Vec<i64>> {
            Err(ScoringError::Model(
                "X has 7 features, but model is expecting 8 features as input".to_string(),
            ))
        }
    }

    fn vector_with_age(age: f64) -> FeatureVector {
        FeatureVector::from_values([age, 1.0, 50000.0, 0.3950, 0.0, 650.0, 200.0, 4.0])
    }

    #[test]
    fn test_score_one_with_probabilities() {
        let service = ScoringService::new(Arc::new(ProbaStub { proba: [0.2, 0.8] }));
        let score = service.score_one(&vector_with_age(30.0)).unwrap();

        assert_eq!(score.result.label(), 1);
        assert!((score.result.confidence - 80.0).abs() < 1e-9);
        assert!(score.warning.is_none());
    }

    #[test]
    fn test_score_one_without_probabilities() {
        let service = ScoringService::new(Arc::new(LabelStub { label: 0 }));
        let score = service.score_one(&vector_with_age(30.0)).unwrap();

        assert_eq!(score.result.verdict, Verdict::NotFraud);
        assert_eq!(score.result.confidence, 100.0);
        assert_eq!(
            score.warning,
            Some(ScoringWarning::ProbabilityUnavailable {
                model: "label_stub".to_string()
            })
        );
    }

    #[test]
    fn test_end_to_end_single_record() {
        let encoder = FeatureEncoder::new();
        let vector = encoder.encode(&sample_record());
        assert_eq!(
            vector.values(),
            &[45.0, 1.0, 60000.0, 0.395, 1.0, 720.0, 1500.0, 3.0]
        );

        let service = ScoringService::new(Arc::new(ProbaStub { proba: [0.1, 0.9] }));
        let score = service.score_one(&vector).unwrap();

        assert_eq!(score.result.verdict, Verdict::Fraud);
        assert!((score.result.confidence - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_batch_preserves_order_with_single_call() {
        let stub = Arc::new(AgeParityStub {
            calls: AtomicUsize::new(0),
        });
        let service = ScoringService::new(stub.clone());
        let vectors: Vec<_> = [10.0, 75.0, 20.0, 90.0, 35.0]
            .iter()
            .map(|&age| vector_with_age(age))
            .collect();

        let batch = service.score_batch(&vectors).unwrap();

        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
        let labels: Vec<u8> = batch.results.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec![0, 1, 0, 1, 0]);
        let confidences: Vec<f64> = batch
            .results
            .iter()
            .map(|r| (r.confidence * 10.0).round() / 10.0)
            .collect();
        assert_eq!(confidences, vec![90.0, 75.0, 80.0, 90.0, 65.0]);
    }

    #[test]
    fn test_end_to_end_batch_with_unknown_region() {
        let encoder = FeatureEncoder::new();
        let mut records = vec![sample_record(), sample_record(), sample_record()];
        records[1].region = "Gotham".to_string();
        records[2].region = "Miami".to_string();

        let encoded = encoder.encode_batch(&records);
        assert_eq!(encoded.vectors[0].region_encoded(), 0.3950);
        assert_eq!(encoded.vectors[1].region_encoded(), 0.0);
        assert_eq!(encoded.vectors[2].region_encoded(), 0.2881);

        let service = ScoringService::new(Arc::new(RegionStub));
        let batch = service.score_batch(&encoded.vectors).unwrap();
        let labels: Vec<u8> = batch.results.iter().map(|r| r.label()).collect();
        assert_eq!(labels, vec![0, 1, 0]);
        let confidences: Vec<f64> = batch
            .results
            .iter()
            .map(|r| (r.confidence * 10.0).round() / 10.0)
            .collect();
        assert_eq!(confidences, vec![79.0, 100.0, 57.6]);
    }

    #[test]
    fn test_empty_batch() {
        let service = ScoringService::new(Arc::new(LabelStub { label: 1 }));
        let batch = service.score_batch(&[]).unwrap();
        assert!(batch.results.is_empty());
        assert!(batch.warnings.is_empty());
    }

    #[test]
    fn test_unavailable_model() {
        let service = ScoringService::unavailable("models/model.json: file not found");
        assert!(!service.is_ready());
        assert!(service.model_name().is_none());

        match service.score_one(&vector_with_age(40.0)) {
            Err(ScoringError::ModelUnavailable(reason)) => {
                assert!(reason.contains("file not found"))
            }
            other => panic!("expected ModelUnavailable, got {:?}", other),
        }
    }

    #[test]
    fn test_from_load_failure() {
        let service = ScoringService::from_load(Err(ScoringError::ModelUnavailable(
            "bad artifact".to_string(),
        )));
        assert!(matches!(
            service.score_batch(&[vector_with_age(1.0)]),
            Err(ScoringError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_feature_count_mismatch() {
        let service = ScoringService::new(Arc::new(WideModelStub));
        assert!(matches!(
            service.score_one(&vector_with_age(40.0)),
            Err(ScoringError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_column_order_mismatch() {
        let mut model = crate::models::LinearModel {
            name: "reordered".to_string(),
            kind: crate::models::LinearKind::Logistic,
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            coefficients: vec![0.0; FEATURE_COUNT],
            intercept: 0.0,
        };
        model.feature_names.swap(2, 3);

        let service = ScoringService::new(Arc::new(model));
        assert!(matches!(
            service.score_one(&vector_with_age(40.0)),
            Err(ScoringError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_output_row_count_mismatch() {
        let service = ScoringService::new(Arc::new(ShortOutputStub));
        let vectors = vec![vector_with_age(1.0), vector_with_age(2.0)];
        assert!(matches!(
            service.score_batch(&vectors),
            Err(ScoringError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_invalid_label() {
        let service = ScoringService::new(Arc::new(LabelStub { label: 3 }));
        assert!(matches!(
            service.score_one(&vector_with_age(1.0)),
            Err(ScoringError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_model_error_is_propagated_verbatim() {
        let service = ScoringService::new(Arc::new(FailingStub));
        let err = service.score_one(&vector_with_age(1.0)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "model error: X has 7 features, but model is expecting 8 features as input"
        );
    }

    #[test]
    fn test_service_is_shareable_across_threads() {
        let service = Arc::new(ScoringService::new(Arc::new(ProbaStub { proba: [0.3, 0.7] })));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let service = service.clone();
                std::thread::spawn(move || service.score_one(&vector_with_age(i as f64)))
            })
            .collect();

        for handle in handles {
            let score = handle.join().unwrap().unwrap();
            assert_eq!(score.result.verdict, Verdict::Fraud);
        }
    }

    #[tokio::test]
    async fn test_timeout_does_not_wait_for_stuck_model() {
        let service = Arc::new(ScoringService::new(Arc::new(SlowStub {
            delay: Duration::from_secs(3),
        })));
        let vector = vector_with_age(40.0);

        let start = Instant::now();
        let result =
            run_with_timeout(Duration::from_millis(200), move || service.score_one(&vector)).await;

        assert!(matches!(result, Err(ScoringError::Timeout(_))));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("inference timed out after 200 ms".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout_returns_result_in_time() {
        let service = Arc::new(ScoringService::new(Arc::new(SlowStub {
            delay: Duration::from_millis(10),
        })));
        let vectors = vec![vector_with_age(40.0), vector_with_age(41.0)];

        let batch = run_with_timeout(Duration::from_secs(5), move || service.score_batch(&vectors))
            .await
            .unwrap();
        assert_eq!(batch.results.len(), 2);
    }

    #[tokio::test]
    async fn test_timeout_passes_model_errors_through() {
        let service = Arc::new(ScoringService::new(Arc::new(FailingStub)));
        let vector = vector_with_age(40.0);

        let result = run_with_timeout(Duration::from_secs(5), move || service.score_one(&vector)).await;
        assert!(matches!(result, Err(ScoringError::Model(_))));
    }
}
