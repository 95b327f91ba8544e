//! Feature encoding for fraud model inference.
//!
//! Turns raw records into the fixed-order numeric vector the classifier was
//! fit on. Column order is part of the model contract: a reordered vector is
//! not rejected by most models, it just scores wrong.

use crate::types::{RawRecord, ScoringWarning};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Number of features produced per record.
pub const FEATURE_COUNT: usize = 8;

/// Feature names, in model input order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "salary",
    "region",
    "card_type",
    "credit_score",
    "transaction_amount",
    "account_age",
];

/// Target encoding of the regions seen in training.
pub const REGION_ENCODING: [(&str, f64); 3] =
    [("Houston", 0.3950), ("Orlando", 0.3168), ("Miami", 0.2881)];

/// Value used for regions missing from [`REGION_ENCODING`].
pub const UNKNOWN_REGION: f64 = 0.0;

/// Encoded model input for one record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.0
    }

    pub fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Single-precision copy for runtimes that take `f32` tensors.
    pub fn to_f32(&self) -> [f32; FEATURE_COUNT] {
        self.0.map(|v| v as f32)
    }

    pub fn age(&self) -> f64 {
        self.0[0]
    }

    pub fn gender_encoded(&self) -> f64 {
        self.0[1]
    }

    pub fn salary(&self) -> f64 {
        self.0[2]
    }

    pub fn region_encoded(&self) -> f64 {
        self.0[3]
    }

    pub fn card_encoded(&self) -> f64 {
        self.0[4]
    }

    pub fn credit_score(&self) -> f64 {
        self.0[5]
    }

    pub fn transaction_amount(&self) -> f64 {
        self.0[6]
    }

    pub fn account_age(&self) -> f64 {
        self.0[7]
    }
}

/// Output of [`FeatureEncoder::encode_batch`].
#[derive(Debug, Clone, Default)]
pub struct EncodedBatch {
    /// One vector per input record, same order
    pub vectors: Vec<FeatureVector>,
    /// Rows whose region fell back to [`UNKNOWN_REGION`]
    pub warnings: Vec<ScoringWarning>,
}

/// Encodes raw records into model input features.
///
/// Performs no bounds checking: values are passed through as given.
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Create a new feature encoder.
    pub fn new() -> Self {
        Self
    }

    /// Encode a single record.
    ///
    /// An unknown region is encoded as [`UNKNOWN_REGION`] and logged; it is
    /// never an error.
    pub fn encode(&self, record: &RawRecord) -> FeatureVector {
        self.encode_row(record, None).0
    }

    /// Encode a record and report a region fallback, if any.
    pub fn encode_checked(&self, record: &RawRecord) -> (FeatureVector, Option<ScoringWarning>) {
        self.encode_row(record, None)
    }

    /// Encode every record independently, preserving order.
    pub fn encode_batch(&self, records: &[RawRecord]) -> EncodedBatch {
        let mut batch = EncodedBatch {
            vectors: Vec::with_capacity(records.len()),
            warnings: Vec::new(),
        };

        for (row, record) in records.iter().enumerate() {
            let (vector, warning) = self.encode_row(record, Some(row));
            batch.vectors.push(vector);
            batch.warnings.extend(warning);
        }

        batch
    }

    fn encode_row(
        &self,
        record: &RawRecord,
        row: Option<usize>,
    ) -> (FeatureVector, Option<ScoringWarning>) {
        let (region, warning) = match region_value(&record.region) {
            Some(value) => (value, None),
            None => {
                warn!(
                    row = ?row,
                    region = %record.region,
                    "Unknown region, encoding as {}",
                    UNKNOWN_REGION
                );
                let warning = ScoringWarning::UnknownRegion {
                    row,
                    region: record.region.clone(),
                };
                (UNKNOWN_REGION, Some(warning))
            }
        };

        let vector = FeatureVector([
            record.age as f64,
            gender_value(&record.gender),
            record.salary,
            region,
            card_value(&record.card_type),
            record.credit_score,
            record.transaction_amount,
            record.account_age,
        ]);

        (vector, warning)
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Get feature names in model input order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &FEATURE_NAMES
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn gender_value(gender: &str) -> f64 {
    if gender.to_lowercase() == "male" {
        1.0
    } else {
        0.0
    }
}

fn card_value(card_type: &str) -> f64 {
    if card_type == "Visa" {
        1.0
    } else {
        0.0
    }
}

/// Look up the target encoding of a region (exact, case-sensitive match).
pub fn region_value(region: &str) -> Option<f64> {
    REGION_ENCODING
        .iter()
        .find(|(name, _)| *name == region)
        .map(|&(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::sample_record;

    fn record_with(f: impl FnOnce(&mut RawRecord)) -> RawRecord {
        let mut record = sample_record();
        f(&mut record);
        record
    }

    #[test]
    fn test_feature_order() {
        let encoder = FeatureEncoder::new();
        let features = encoder.encode(&sample_record());

        assert_eq!(features.len(), encoder.feature_count());
        assert_eq!(
            features.values(),
            &[45.0, 1.0, 60000.0, 0.395, 1.0, 720.0, 1500.0, 3.0]
        );
    }

    #[test]
    fn test_feature_names() {
        let encoder = FeatureEncoder::new();
        assert_eq!(encoder.feature_names().len(), 8);
        assert_eq!(encoder.feature_names()[3], "region");
    }

    #[test]
    fn test_gender_is_case_insensitive() {
        let encoder = FeatureEncoder::new();
        let cases = [
            ("male", 1.0),
            ("MALE", 1.0),
            ("Male", 1.0),
            ("Femme", 0.0),
            ("Female", 0.0),
        ];
        for (gender, expected) in cases {
            let features = encoder.encode(&record_with(|r| r.gender = gender.to_string()));
            assert_eq!(features.gender_encoded(), expected, "gender {}", gender);
        }
    }

    #[test]
    fn test_card_type() {
        let encoder = FeatureEncoder::new();
        let visa = encoder.encode(&record_with(|r| r.card_type = "Visa".to_string()));
        let mastercard = encoder.encode(&record_with(|r| r.card_type = "MasterCard".to_string()));
        assert_eq!(visa.card_encoded(), 1.0);
        assert_eq!(mastercard.card_encoded(), 0.0);
    }

    #[test]
    fn test_region_encoding() {
        let encoder = FeatureEncoder::new();
        let miami = encoder.encode(&record_with(|r| r.region = "Miami".to_string()));
        let orlando = encoder.encode(&record_with(|r| r.region = "Orlando".to_string()));
        assert_eq!(miami.region_encoded(), 0.2881);
        assert_eq!(orlando.region_encoded(), 0.3168);
    }

    #[test]
    fn test_unknown_region_falls_back() {
        let encoder = FeatureEncoder::new();
        let record = record_with(|r| r.region = "Unknown".to_string());

        let (features, warning) = encoder.encode_checked(&record);
        assert_eq!(features.region_encoded(), 0.0);
        assert_eq!(
            warning,
            Some(ScoringWarning::UnknownRegion {
                row: None,
                region: "Unknown".to_string()
            })
        );
    }

    #[test]
    fn test_no_bounds_checking() {
        let encoder = FeatureEncoder::new();
        let features = encoder.encode(&record_with(|r| {
            r.age = -4;
            r.credit_score = 5000.0;
        }));
        assert_eq!(features.age(), -4.0);
        assert_eq!(features.credit_score(), 5000.0);
    }

    #[test]
    fn test_batch_with_unknown_region() {
        let encoder = FeatureEncoder::new();
        let records = vec![
            record_with(|r| r.region = "Miami".to_string()),
            record_with(|r| r.region = "Atlantis".to_string()),
            record_with(|r| r.region = "Orlando".to_string()),
        ];

        let batch = encoder.encode_batch(&records);

        assert_eq!(batch.vectors.len(), 3);
        assert_eq!(batch.vectors[0].region_encoded(), 0.2881);
        assert_eq!(batch.vectors[1].region_encoded(), 0.0);
        assert_eq!(batch.vectors[2].region_encoded(), 0.3168);
        assert_eq!(
            batch.warnings,
            vec![ScoringWarning::UnknownRegion {
                row: Some(1),
                region: "Atlantis".to_string()
            }]
        );
    }

    #[test]
    fn test_region_lookup_is_case_sensitive() {
        assert_eq!(region_value("Houston"), Some(0.3950));
        assert_eq!(region_value("houston"), None);
    }
}
