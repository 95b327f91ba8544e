//! Fraud Scoring CLI - Main Entry Point
//!
//! Scores a single record (printing a JSON report) or a CSV batch (writing
//! the table back with a verdict column) against a pre-trained model.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fraud_scoring::{
    batch::{self, BatchSummary},
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    feature_encoder::{FeatureEncoder, FEATURE_NAMES},
    metrics::ScoringMetrics,
    models::{run_with_timeout, ModelLoader, ScoringService},
    RawRecord, RecordReport,
};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fraud-score", version, about = "Score transactions with a pre-trained fraud model")]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Model artifact, overrides `model.path`
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one record given as a JSON object and print a report
    Predict {
        /// JSON file, or `-` for stdin
        #[arg(long, default_value = "-")]
        record: String,
    },
    /// Score every row of a CSV file
    Batch {
        #[arg(long)]
        input: PathBuf,
        /// Output CSV (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Input columns already hold encoded features
        #[arg(long)]
        encoded: bool,
    },
    /// Print the feature order expected by the model
    Features,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&cli.config)?;
    init_logging(&config.logging)?;

    let encoder = FeatureEncoder::new();
    let timeout = Duration::from_millis(config.scoring.timeout_ms);

    match cli.command {
        Command::Features => {
            for (i, name) in FEATURE_NAMES.iter().enumerate() {
                println!("{} {}", i, name);
            }
        }
        Command::Predict { record } => {
            let service = load_service(cli.model, &config);
            let input = read_input(&record)?;
            let value: serde_json::Value =
                serde_json::from_str(&input).context("Record is not valid JSON")?;
            let record = RawRecord::from_json(&value)?;
            record.check_bounds(&config.encoding.bounds())?;

            let (vector, region_warning) = encoder.encode_checked(&record);
            let scorer = service.clone();
            let score = run_with_timeout(timeout, move || scorer.score_one(&vector)).await?;

            let report = RecordReport::new(&record, &score.result, &config.labels)
                .with_model(service.model_name().unwrap_or_default())
                .with_warnings(region_warning.iter().chain(score.warning.iter()));

            info!(
                report_id = %report.report_id,
                label = report.label,
                confidence = report.confidence,
                "Record scored"
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Batch {
            input,
            output,
            encoded,
        } => {
            let service = load_service(cli.model, &config);
            let file = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let metrics = ScoringMetrics::new();

            let (table, vectors) = if encoded {
                batch::read_encoded(file)?
            } else {
                let (table, records) = batch::read_records(file)?;
                let encoded = encoder.encode_batch(&records);
                metrics.record_encoding(&encoded);
                if !encoded.warnings.is_empty() {
                    warn!(
                        rows = encoded.warnings.len(),
                        "Rows with unknown regions were encoded with the default value"
                    );
                }
                (table, encoded.vectors)
            };

            info!(rows = vectors.len(), input = %input.display(), "Scoring batch");
            let scorer = service.clone();
            let scored = run_with_timeout(timeout, move || scorer.score_batch(&vectors)).await?;
            metrics.record_scores(&scored);

            let annotated = batch::annotate(&table, &scored.results, &config.labels)?;
            match &output {
                Some(path) => {
                    let out = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    batch::write_csv(out, &annotated)?;
                    info!(output = %path.display(), "Predictions written");
                }
                None => batch::write_csv(std::io::stdout().lock(), &annotated)?,
            }

            let summary = BatchSummary::from_results(&scored.results);
            info!(
                rows = summary.rows,
                fraud = summary.fraud,
                not_fraud = summary.not_fraud,
                fraud_rate = format!("{:.1}%", summary.fraud_rate()),
                mean_confidence = format!("{:.1}%", summary.mean_confidence),
                "Batch complete"
            );
            metrics.log_summary();
        }
    }

    Ok(())
}

/// Load the model once. A failed load still yields a service, so the
/// request reports the load failure as a terminal scoring error.
fn load_service(model: Option<PathBuf>, config: &AppConfig) -> Arc<ScoringService> {
    let model_path = model.unwrap_or_else(|| PathBuf::from(&config.model.path));
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let service = ScoringService::from_load(loader.load(&model_path));
    if let Some(name) = service.model_name() {
        info!(model = %name, path = %model_path.display(), "Model ready");
    }
    Arc::new(service)
}

fn read_input(source: &str) -> Result<String> {
    if source == "-" {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read record from stdin")?;
        Ok(input)
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))
    }
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "fraud_scoring={level},fraud_score={level}",
            level = config.level
        ))
    })?;

    // stdout carries reports and CSV output
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
    Ok(())
}
