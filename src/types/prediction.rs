//! Prediction results and non-fatal scoring diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary verdict produced by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    NotFraud,
    Fraud,
}

impl Verdict {
    /// Map a raw model class label onto a verdict. Only 0 and 1 are valid.
    pub fn from_label(label: i64) -> Option<Self> {
        match label {
            0 => Some(Verdict::NotFraud),
            1 => Some(Verdict::Fraud),
            _ => None,
        }
    }

    pub fn label(self) -> u8 {
        match self {
            Verdict::NotFraud => 0,
            Verdict::Fraud => 1,
        }
    }
}

/// Label and confidence for one scored record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub verdict: Verdict,
    /// Confidence in the verdict, in percent (0.0 - 100.0)
    pub confidence: f64,
}

impl PredictionResult {
    pub fn new(verdict: Verdict, confidence: f64) -> Self {
        Self {
            verdict,
            confidence: confidence.clamp(0.0, 100.0),
        }
    }

    /// Pick the most probable class from a `[p(not fraud), p(fraud)]` pair.
    ///
    /// Ties resolve to `NotFraud`, matching an argmax over the class order.
    pub fn from_probabilities(proba: [f64; 2]) -> Self {
        let (verdict, p) = if proba[1] > proba[0] {
            (Verdict::Fraud, proba[1])
        } else {
            (Verdict::NotFraud, proba[0])
        };
        Self::new(verdict, p * 100.0)
    }

    pub fn label(&self) -> u8 {
        self.verdict.label()
    }

    pub fn is_fraud(&self) -> bool {
        self.verdict == Verdict::Fraud
    }
}

/// Non-fatal condition reported alongside scoring output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoringWarning {
    /// Region not in the encoding table; encoded as 0.0.
    UnknownRegion { row: Option<usize>, region: String },
    /// Model has no probability output; confidence reported as 100%.
    ProbabilityUnavailable { model: String },
}

impl fmt::Display for ScoringWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoringWarning::UnknownRegion {
                row: Some(row),
                region,
            } => write!(f, "row {}: unknown region {:?} encoded as 0.0", row, region),
            ScoringWarning::UnknownRegion { row: None, region } => {
                write!(f, "unknown region {:?} encoded as 0.0", region)
            }
            ScoringWarning::ProbabilityUnavailable { model } => write!(
                f,
                "model {:?} has no probability output, confidence reported as 100%",
                model
            ),
        }
    }
}
