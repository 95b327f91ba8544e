//! Raw customer/transaction records as entered by a user or read from a dataset row

use crate::error::{Result, ScoringError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One customer/transaction observation, before encoding.
///
/// Field names follow the batch CSV header; the camelCase forms used by
/// JSON front-ends are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Age in years
    pub age: i64,

    /// "Male" or anything else
    pub gender: String,

    /// Customer region, e.g. "Houston"
    pub region: String,

    /// Annual salary
    pub salary: f64,

    /// "Visa" or "MasterCard"
    #[serde(alias = "cardType")]
    pub card_type: String,

    /// Credit score, on the scale configured in `[encoding]`
    #[serde(alias = "creditScore")]
    pub credit_score: f64,

    /// Amount of the transaction being assessed
    #[serde(alias = "transactionAmount")]
    pub transaction_amount: f64,

    /// Account age in years
    #[serde(alias = "accountAge")]
    pub account_age: f64,
}

impl RawRecord {
    /// Build a record from a loosely typed JSON object.
    ///
    /// Categorical fields must be strings; any other JSON type fails with
    /// [`ScoringError::InvalidCategory`]. Unknown region strings are accepted
    /// here and handled by the encoder.
    pub fn from_json(value: &Value) -> Result<Self> {
        let fields = value.as_object().ok_or_else(|| ScoringError::InvalidField {
            field: "record",
            reason: format!("expected a JSON object, got {}", json_type(value)),
        })?;

        Ok(Self {
            age: integer_field(fields, "age", None)?,
            gender: category_field(fields, "gender", None)?,
            region: category_field(fields, "region", None)?,
            salary: number_field(fields, "salary", None)?,
            card_type: category_field(fields, "card_type", Some("cardType"))?,
            credit_score: number_field(fields, "credit_score", Some("creditScore"))?,
            transaction_amount: number_field(
                fields,
                "transaction_amount",
                Some("transactionAmount"),
            )?,
            account_age: number_field(fields, "account_age", Some("accountAge"))?,
        })
    }

    /// Field name, display label and value, in input form order.
    ///
    /// This is not the model input order: the form lists region before
    /// salary.
    pub fn fields(&self) -> Vec<(&'static str, &'static str, String)> {
        vec![
            ("age", "Age", self.age.to_string()),
            ("gender", "Gender", self.gender.clone()),
            ("region", "Region", self.region.clone()),
            ("salary", "Salary", format!("{:.2}", self.salary)),
            ("card_type", "Card type", self.card_type.clone()),
            ("credit_score", "Credit score", format!("{}", self.credit_score)),
            (
                "transaction_amount",
                "Transaction amount",
                format!("{:.2}", self.transaction_amount),
            ),
            (
                "account_age",
                "Account age (years)",
                format!("{}", self.account_age),
            ),
        ]
    }

    /// Check the record against the numeric input constraints of the
    /// single-record form. The encoder never calls this.
    pub fn check_bounds(&self, bounds: &InputBounds) -> Result<()> {
        check_range("age", self.age as f64, 0.0, bounds.max_age as f64)?;
        check_range("salary", self.salary, 0.0, f64::MAX)?;
        check_range(
            "credit_score",
            self.credit_score,
            bounds.credit_score_min,
            bounds.credit_score_max,
        )?;
        check_range("transaction_amount", self.transaction_amount, 0.0, f64::MAX)?;
        check_range("account_age", self.account_age, 0.0, f64::MAX)?;
        Ok(())
    }
}

/// Numeric limits applied to interactively entered records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputBounds {
    pub max_age: i64,
    pub credit_score_min: f64,
    pub credit_score_max: f64,
}

impl Default for InputBounds {
    fn default() -> Self {
        Self {
            max_age: 120,
            credit_score_min: 0.0,
            credit_score_max: 1000.0,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_nan() || value < min || value > max {
        return Err(ScoringError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn lookup<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
    alias: Option<&str>,
) -> Result<&'a Value> {
    fields
        .get(name)
        .or_else(|| alias.and_then(|a| fields.get(a)))
        .ok_or(ScoringError::MissingField(name))
}

fn category_field(
    fields: &Map<String, Value>,
    name: &'static str,
    alias: Option<&str>,
) -> Result<String> {
    match lookup(fields, name, alias)? {
        Value::String(s) => Ok(s.clone()),
        other => Err(ScoringError::InvalidCategory {
            field: name,
            found: json_type(other).to_string(),
        }),
    }
}

fn number_field(
    fields: &Map<String, Value>,
    name: &'static str,
    alias: Option<&str>,
) -> Result<f64> {
    let value = lookup(fields, name, alias)?;
    value.as_f64().ok_or_else(|| ScoringError::InvalidField {
        field: name,
        reason: format!("expected a number, got {}", json_type(value)),
    })
}

fn integer_field(
    fields: &Map<String, Value>,
    name: &'static str,
    alias: Option<&str>,
) -> Result<i64> {
    let value = lookup(fields, name, alias)?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f.is_finite() => Ok(f as i64),
        _ => Err(ScoringError::InvalidField {
            field: name,
            reason: format!("expected an integer, got {}", value),
        }),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> RawRecord {
    RawRecord {
        age: 45,
        gender: "Male".to_string(),
        region: "Houston".to_string(),
        salary: 60000.0,
        card_type: "Visa".to_string(),
        credit_score: 720.0,
        transaction_amount: 1500.0,
        account_age: 3.0,
    }
}
