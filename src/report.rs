//! Single-record prediction reports, handed to an external renderer

use crate::config::LabelsConfig;
use crate::types::{PredictionResult, RawRecord, ScoringWarning, Verdict};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One input field as shown in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportField {
    pub name: String,
    pub label: String,
    pub value: String,
}

/// Report for one scored record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordReport {
    /// Unique report identifier
    pub report_id: String,

    /// Report generation timestamp
    pub generated_at: DateTime<Utc>,

    /// Input fields, in input form order
    pub fields: Vec<ReportField>,

    pub verdict: Verdict,

    /// Raw class label (1 = fraud)
    pub label: u8,

    /// Confidence in percent
    pub confidence: f64,

    /// Human-readable verdict
    pub verdict_text: String,

    /// Name of the model that produced the verdict
    pub model: String,

    /// Non-fatal diagnostics raised while scoring
    pub warnings: Vec<String>,
}

impl RecordReport {
    /// Create a new report for a scored record
    pub fn new(record: &RawRecord, result: &PredictionResult, labels: &LabelsConfig) -> Self {
        let fields = record
            .fields()
            .into_iter()
            .map(|(name, label, value)| ReportField {
                name: name.to_string(),
                label: label.to_string(),
                value,
            })
            .collect();

        Self {
            report_id: uuid::Uuid::new_v4().to_string(),
            generated_at: Utc::now(),
            fields,
            verdict: result.verdict,
            label: result.label(),
            confidence: result.confidence,
            verdict_text: labels.text(result.verdict).to_string(),
            model: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Record which model produced the verdict
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Attach scoring warnings to the report
    pub fn with_warnings<'a>(
        mut self,
        warnings: impl IntoIterator<Item = &'a ScoringWarning>,
    ) -> Self {
        self.warnings.extend(warnings.into_iter().map(|w| w.to_string()));
        self
    }
}
