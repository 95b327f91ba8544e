//! Configuration management for the fraud scoring tools

use crate::types::{InputBounds, Verdict};
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub encoding: EncodingConfig,
    pub labels: LabelsConfig,
    pub scoring: ScoringConfig,
    pub logging: LoggingConfig,
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the model artifact (`.json` or `.onnx`)
    pub path: String,
    /// Number of threads for ONNX inference (default: 1)
    pub onnx_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "models/model.json".to_string(),
            onnx_threads: 1,
        }
    }
}

/// Input constraints for interactively entered records
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub max_age: i64,
    /// Lower bound of the credit score scale
    pub credit_score_min: f64,
    /// Upper bound of the credit score scale (1000 or 100 depending on the
    /// data the model was fit on)
    pub credit_score_max: f64,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let bounds = InputBounds::default();
        Self {
            max_age: bounds.max_age,
            credit_score_min: bounds.credit_score_min,
            credit_score_max: bounds.credit_score_max,
        }
    }
}

impl EncodingConfig {
    pub fn bounds(&self) -> InputBounds {
        InputBounds {
            max_age: self.max_age,
            credit_score_min: self.credit_score_min,
            credit_score_max: self.credit_score_max,
        }
    }
}

/// Human-readable verdict strings written into exports
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabelsConfig {
    pub clean: String,
    pub fraud: String,
}

impl Default for LabelsConfig {
    fn default() -> Self {
        Self {
            clean: "✅ Ce client est clean.".to_string(),
            fraud: "🚨 Ce client est passible de fraude !".to_string(),
        }
    }
}

impl LabelsConfig {
    pub fn text(&self, verdict: Verdict) -> &str {
        match verdict {
            Verdict::NotFraud => &self.clean,
            Verdict::Fraud => &self.fraud,
        }
    }
}

/// Host-side scoring settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Inference timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, or fall back to defaults when the
    /// file does not exist. A file that exists but fails to parse is an error.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_path(path)
                .with_context(|| format!("Failed to load {}", path.display()))
        } else {
            info!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.encoding.credit_score_min > self.encoding.credit_score_max {
            anyhow::bail!(
                "encoding.credit_score_min ({}) is greater than encoding.credit_score_max ({})",
                self.encoding.credit_score_min,
                self.encoding.credit_score_max
            );
        }
        if self.scoring.timeout_ms == 0 {
            anyhow::bail!("scoring.timeout_ms must be greater than 0");
        }
        Ok(())
    }
}
