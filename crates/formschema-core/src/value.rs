//! Scalar values carried by repeating client entries
//!
//! Client payloads arrive as loosely typed key/value maps. Every value is
//! narrowed to a [`FieldValue`] and converted against the target field type
//! before it is written into a physical form field.

use crate::schema::FieldType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Date formats accepted when converting text into a date
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%m%d%Y"];

/// Date format written into form fields
const RENDER_DATE_FORMAT: &str = "%m/%d/%Y";

const TRUE_WORDS: &[&str] = &["yes", "y", "true", "t", "1", "x"];
const FALSE_WORDS: &[&str] = &["no", "n", "false", "f", "0", ""];

/// One logical repeating record, e.g. a single address
pub type Entry = BTreeMap<String, FieldValue>;

/// Largest magnitude below which every whole `f64` is exactly an integer
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Tagged scalar value
///
/// JSON booleans and numbers map to their own variants and every string to
/// [`FieldValue::Text`], date-like or not. Dates only appear through
/// [`FieldValue::coerce`] against a date field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawValue")]
pub enum FieldValue {
    Boolean(bool),
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

/// Wire shape of an incoming value
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Boolean(bool),
    Number(f64),
    Text(String),
}

impl From<RawValue> for FieldValue {
    fn from(raw: RawValue) -> Self {
        match raw {
            RawValue::Boolean(b) => Self::Boolean(b),
            RawValue::Number(n) => Self::Number(n),
            RawValue::Text(s) => Self::Text(s),
        }
    }
}

/// A value that cannot be represented as the requested field type
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot convert {value:?} to {target}")]
pub struct ConversionError {
    pub value: FieldValue,
    pub target: FieldType,
}

impl FieldValue {
    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Name of the variant, used in log output
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::Date(_) => "date",
            Self::Text(_) => "text",
        }
    }

    /// Convert this value into the representation expected by `target`
    pub fn coerce(self, target: FieldType) -> Result<Self, ConversionError> {
        let converted = match (&self, target) {
            (
                _,
                FieldType::Text | FieldType::Selection | FieldType::Signature | FieldType::Unknown,
            ) => Some(Self::Text(self.render())),
            (Self::Boolean(_), FieldType::Boolean) => Some(self.clone()),
            (Self::Text(s), FieldType::Boolean) => parse_bool(s).map(Self::Boolean),
            (Self::Number(n), FieldType::Boolean) if *n == 0.0 || *n == 1.0 => {
                Some(Self::Boolean(*n == 1.0))
            }
            (Self::Date(_), FieldType::Date) => Some(self.clone()),
            (Self::Text(s), FieldType::Date) => parse_date(s).map(Self::Date),
            (Self::Number(_), FieldType::Number) => Some(self.clone()),
            (Self::Text(s), FieldType::Number) => s.trim().parse::<f64>().ok().map(Self::Number),
            _ => None,
        };

        converted.ok_or(ConversionError {
            value: self,
            target,
        })
    }

    /// String written into a physical form field
    ///
    /// Booleans render as checkbox export values (`Yes` / `Off`).
    pub fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Boolean(true) => "Yes".to_string(),
            Self::Boolean(false) => "Off".to_string(),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER => {
                format!("{}", *n as i64)
            }
            Self::Number(n) => n.to_string(),
            Self::Date(d) => d.format(RENDER_DATE_FORMAT).to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    let lowered = s.trim().to_lowercase();
    if TRUE_WORDS.contains(&lowered.as_str()) {
        Some(true)
    } else if FALSE_WORDS.contains(&lowered.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}
