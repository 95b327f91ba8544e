//! Scoring statistics for the batch and single-record front-ends.

use crate::feature_encoder::EncodedBatch;
use crate::models::BatchScore;
use crate::types::ScoringWarning;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;
use tracing::info;

/// Metrics collector for scoring calls
pub struct ScoringMetrics {
    /// Total rows scored
    pub rows_scored: AtomicU64,
    /// Rows with a fraud verdict
    pub fraud_verdicts: AtomicU64,
    /// Rows whose region fell back to the default encoding
    pub region_fallbacks: AtomicU64,
    /// Scoring calls made without probability output
    pub capability_warnings: AtomicU64,
    /// Model call times (in microseconds)
    call_times: RwLock<Vec<u64>>,
    /// Confidence distribution buckets (0-10%, ..., 90-100%)
    confidence_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ScoringMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            rows_scored: AtomicU64::new(0),
            fraud_verdicts: AtomicU64::new(0),
            region_fallbacks: AtomicU64::new(0),
            capability_warnings: AtomicU64::new(0),
            call_times: RwLock::new(Vec::with_capacity(64)),
            confidence_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record the warnings raised while encoding a batch
    pub fn record_encoding(&self, batch: &EncodedBatch) {
        let fallbacks = batch
            .warnings
            .iter()
            .filter(|w| matches!(w, ScoringWarning::UnknownRegion { .. }))
            .count();
        self.region_fallbacks
            .fetch_add(fallbacks as u64, Ordering::Relaxed);
    }

    /// Record a scoring call
    pub fn record_scores(&self, score: &BatchScore) {
        let fraud = score.results.iter().filter(|r| r.is_fraud()).count();
        self.rows_scored
            .fetch_add(score.results.len() as u64, Ordering::Relaxed);
        self.fraud_verdicts.fetch_add(fraud as u64, Ordering::Relaxed);

        let capability = score
            .warnings
            .iter()
            .filter(|w| matches!(w, ScoringWarning::ProbabilityUnavailable { .. }))
            .count();
        self.capability_warnings
            .fetch_add(capability as u64, Ordering::Relaxed);

        if let Ok(mut times) = self.call_times.write() {
            times.push(score.elapsed.as_micros() as u64);
            // Keep only the most recent 1000 calls
            if times.len() > 1000 {
                times.drain(0..500);
            }
        }

        if let Ok(mut buckets) = self.confidence_buckets.write() {
            for result in &score.results {
                let bucket = ((result.confidence / 10.0) as usize).min(9);
                buckets[bucket] += 1;
            }
        }
    }

    /// Get model call time statistics
    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.call_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();

        LatencyStats {
            calls: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: sorted[((count as f64 * 0.95) as usize).min(count - 1)],
            max_us: sorted[count - 1],
        }
    }

    /// Share of scored rows flagged as fraud, in percent
    pub fn fraud_rate(&self) -> f64 {
        let rows = self.rows_scored.load(Ordering::Relaxed);
        if rows == 0 {
            return 0.0;
        }
        self.fraud_verdicts.load(Ordering::Relaxed) as f64 / rows as f64 * 100.0
    }

    /// Get confidence distribution
    pub fn get_confidence_distribution(&self) -> [u64; 10] {
        self.confidence_buckets
            .read()
            .map(|b| *b)
            .unwrap_or_default()
    }

    /// Log summary statistics
    pub fn log_summary(&self) {
        let rows = self.rows_scored.load(Ordering::Relaxed);
        let fraud = self.fraud_verdicts.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();

        info!(
            rows_scored = rows,
            fraud_verdicts = fraud,
            fraud_rate = format!("{:.1}%", self.fraud_rate()),
            region_fallbacks = self.region_fallbacks.load(Ordering::Relaxed),
            capability_warnings = self.capability_warnings.load(Ordering::Relaxed),
            elapsed_ms = self.start_time.elapsed().as_millis() as u64,
            "Scoring summary"
        );
        info!(
            calls = latency.calls,
            mean_us = latency.mean_us,
            p50_us = latency.p50_us,
            p95_us = latency.p95_us,
            max_us = latency.max_us,
            "Model call latency"
        );

        let distribution = self.get_confidence_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate().filter(|(_, &c)| c > 0) {
            let pct = count as f64 / total as f64 * 100.0;
            let bar = "█".repeat(((pct / 5.0) as usize).min(20));
            info!(
                "confidence {:>3}-{:<3}%: {:>6} ({:>5.1}%) {}",
                i * 10,
                (i + 1) * 10,
                count,
                pct,
                bar
            );
        }
    }
}

impl Default for ScoringMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model call time statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatencyStats {
    pub calls: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub max_us: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PredictionResult, Verdict};
    use std::time::Duration;

    fn batch(verdicts: &[(Verdict, f64)], micros: u64) -> BatchScore {
        BatchScore {
            results: verdicts
                .iter()
                .map(|&(v, c)| PredictionResult::new(v, c))
                .collect(),
            warnings: Vec::new(),
            elapsed: Duration::from_micros(micros),
        }
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = ScoringMetrics::new();

        metrics.record_scores(&batch(&[(Verdict::Fraud, 95.0), (Verdict::NotFraud, 62.0)], 100));
        metrics.record_scores(&batch(&[(Verdict::NotFraud, 100.0)], 300));

        assert_eq!(metrics.rows_scored.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.fraud_verdicts.load(Ordering::Relaxed), 1);
        assert!((metrics.fraud_rate() - 33.333).abs() < 0.01);

        let distribution = metrics.get_confidence_distribution();
        assert_eq!(distribution[6], 1);
        assert_eq!(distribution[9], 2);

        let latency = metrics.get_latency_stats();
        assert_eq!(latency.calls, 2);
        assert_eq!(latency.mean_us, 200);
        assert_eq!(latency.max_us, 300);
    }

    #[test]
    fn test_warning_counters() {
        let metrics = ScoringMetrics::new();
        let encoded = EncodedBatch {
            vectors: Vec::new(),
            warnings: vec![
                ScoringWarning::UnknownRegion {
                    row: Some(0),
                    region: "Dallas".to_string(),
                },
                ScoringWarning::UnknownRegion {
                    row: Some(4),
                    region: "Austin".to_string(),
                },
            ],
        };
        metrics.record_encoding(&encoded);

        let mut scored = batch(&[(Verdict::Fraud, 100.0)], 10);
        scored.warnings.push(ScoringWarning::ProbabilityUnavailable {
            model: "svc".to_string(),
        });
        metrics.record_scores(&scored);

        assert_eq!(metrics.region_fallbacks.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.capability_warnings.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ScoringMetrics::new();
        assert_eq!(metrics.get_latency_stats(), LatencyStats::default());
        assert_eq!(metrics.fraud_rate(), 0.0);
    }
}
