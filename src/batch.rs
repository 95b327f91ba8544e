//! CSV batch input and annotated output tables

use crate::config::LabelsConfig;
use crate::error::{Result, ScoringError};
use crate::feature_encoder::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
use crate::types::{PredictionResult, RawRecord, Verdict};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use serde::Serialize;
use std::io::{Read, Write};
use tracing::debug;

/// Name of the column appended to scored tables.
pub const PREDICTION_COLUMN: &str = "Prediction";

/// A CSV table kept as text so it can be written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl BatchTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn read_table<R: Read>(reader: R) -> Result<BatchTable> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(BatchTable { headers, rows })
}

/// Read a CSV of raw records (one column per record field, any order).
pub fn read_records<R: Read>(reader: R) -> Result<(BatchTable, Vec<RawRecord>)> {
    let table = read_table(reader)?;
    let records = table
        .rows
        .iter()
        .map(|row| row.deserialize::<RawRecord>(Some(&table.headers)))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    debug!(rows = records.len(), "Read raw record table");
    Ok((table, records))
}

/// Read a CSV that already holds encoded features.
///
/// The header must list the feature columns in model input order.
pub fn read_encoded<R: Read>(reader: R) -> Result<(BatchTable, Vec<FeatureVector>)> {
    let table = read_table(reader)?;

    let header: Vec<&str> = table.headers.iter().collect();
    if header != FEATURE_NAMES {
        return Err(ScoringError::ShapeMismatch(format!(
            "encoded table columns {:?} do not match feature order {:?}",
            header, FEATURE_NAMES
        )));
    }

    let vectors = table
        .rows
        .iter()
        .enumerate()
        .map(|(row, record)| parse_encoded_row(row, record))
        .collect::<Result<Vec<_>>>()?;

    debug!(rows = vectors.len(), "Read encoded feature table");
    Ok((table, vectors))
}

fn parse_encoded_row(row: usize, record: &StringRecord) -> Result<FeatureVector> {
    let mut values = [0.0; FEATURE_COUNT];
    for (i, (field, name)) in record.iter().zip(FEATURE_NAMES).enumerate() {
        values[i] = field.parse().map_err(|_| ScoringError::InvalidField {
            field: name,
            reason: format!("row {}: {:?} is not a number", row, field),
        })?;
    }
    Ok(FeatureVector::from_values(values))
}

/// Append the verdict text of each result to its row.
pub fn annotate(
    table: &BatchTable,
    results: &[PredictionResult],
    labels: &LabelsConfig,
) -> Result<BatchTable> {
    if table.rows.len() != results.len() {
        return Err(ScoringError::ShapeMismatch(format!(
            "{} predictions for {} table rows",
            results.len(),
            table.rows.len()
        )));
    }

    let mut headers = table.headers.clone();
    headers.push_field(PREDICTION_COLUMN);

    let rows = table
        .rows
        .iter()
        .zip(results)
        .map(|(row, result)| {
            let mut row = row.clone();
            row.push_field(labels.text(result.verdict));
            row
        })
        .collect();

    Ok(BatchTable { headers, rows })
}

/// Write a table as CSV, header first, no index column.
pub fn write_csv<W: Write>(writer: W, table: &BatchTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Verdict counts for a scored batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub rows: usize,
    pub fraud: usize,
    pub not_fraud: usize,
    /// Mean confidence in percent, 0 for an empty batch
    pub mean_confidence: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[PredictionResult]) -> Self {
        let fraud = results
            .iter()
            .filter(|r| r.verdict == Verdict::Fraud)
            .count();
        let mean_confidence = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.confidence).sum::<f64>() / results.len() as f64
        };

        Self {
            rows: results.len(),
            fraud,
            not_fraud: results.len() - fraud,
            mean_confidence,
        }
    }

    /// Share of rows flagged as fraud, in percent.
    pub fn fraud_rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.fraud as f64 / self.rows as f64 * 100.0
        }
    }
}
