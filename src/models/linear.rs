//! Linear classifiers exported as JSON

use crate::error::{Result, ScoringError};
use crate::feature_encoder::FeatureVector;
use crate::models::Model;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Decision rule applied on top of the linear score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinearKind {
    /// Logistic regression: probabilities via the sigmoid of the score
    Logistic,
    /// Linear SVM: labels only, no probability output
    LinearSvc,
}

/// Linear model artifact: `score = coefficients · x + intercept`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    #[serde(default = "default_name")]
    pub name: String,
    pub kind: LinearKind,
    /// Input columns in fit order; empty when the exporter did not record them
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

fn default_name() -> String {
    "linear".to_string()
}

impl LinearModel {
    /// Parse a JSON model artifact.
    pub fn from_json(json: &str) -> Result<Self> {
        let model: LinearModel = serde_json::from_str(json)?;
        if model.coefficients.is_empty() {
            return Err(ScoringError::ShapeMismatch(format!(
                "model `{}` has no coefficients",
                model.name
            )));
        }
        if !model.feature_names.is_empty() && model.feature_names.len() != model.coefficients.len()
        {
            return Err(ScoringError::ShapeMismatch(format!(
                "model `{}` lists {} feature names for {} coefficients",
                model.name,
                model.feature_names.len(),
                model.coefficients.len()
            )));
        }
        Ok(model)
    }

    /// Load a JSON model artifact from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let model = Self::from_json(&std::fs::read_to_string(path)?)?;
        info!(
            model = %model.name,
            kind = ?model.kind,
            features = model.coefficients.len(),
            path = %path.display(),
            "Linear model loaded"
        );
        Ok(model)
    }

    fn decision(&self, row: &FeatureVector) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(ScoringError::ShapeMismatch(format!(
                "model `{}` expects {} features, got {}",
                self.name,
                self.coefficients.len(),
                row.len()
            )));
        }
        let dot: f64 = self
            .coefficients
            .iter()
            .zip(row.values())
            .map(|(w, x)| w * x)
            .sum();
        Ok(dot + self.intercept)
    }
}

impl Model for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_count(&self) -> Option<usize> {
        Some(self.coefficients.len())
    }

    fn feature_names(&self) -> Option<Vec<String>> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(self.feature_names.clone())
        }
    }

    fn predict(&self, rows: &[FeatureVector]) -> Result<Vec<i64>> {
        rows.iter()
            .map(|row| self.decision(row).map(|score| if score > 0.0 { 1 } else { 0 }))
            .collect()
    }

    fn predict_proba(&self, rows: &[FeatureVector]) -> Result<Option<Vec<[f64; 2]>>> {
        match self.kind {
            LinearKind::LinearSvc => Ok(None),
            LinearKind::Logistic => rows
                .iter()
                .map(|row| {
                    self.decision(row).map(|score| {
                        let p = sigmoid(score);
                        [1.0 - p, p]
                    })
                })
                .collect::<Result<Vec<_>>>()
                .map(Some),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
