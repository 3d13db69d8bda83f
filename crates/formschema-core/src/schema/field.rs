//! Field descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of value a form field accepts
///
/// The PDF widget codes `Tx`, `Ch` and `Btn` deserialize as text, selection
/// and boolean respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[serde(alias = "Tx")]
    Text,
    #[serde(alias = "Ch")]
    Selection,
    #[serde(alias = "Btn")]
    Boolean,
    Date,
    Number,
    Signature,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Text => "text",
            FieldType::Selection => "selection",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Signature => "signature",
            FieldType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One field a target form understands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Identifier, unique within a schema
    pub field_id: String,

    pub field_type: FieldType,

    /// Human readable name
    pub field_name: String,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,

    /// Extra attributes such as `maxLength`
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl FieldDescriptor {
    /// Create a descriptor with no optional attributes
    pub fn new(
        field_id: impl Into<String>,
        field_type: FieldType,
        field_name: impl Into<String>,
        required: bool,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            field_type,
            field_name: field_name.into(),
            required,
            page_number: None,
            tooltip: None,
            properties: serde_json::Map::new(),
        }
    }

    /// Set the page the field appears on
    pub fn with_page(mut self, page: u32) -> Self {
        self.page_number = Some(page);
        self
    }

    /// Set tooltip text
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// Add a free-form property
    pub fn with_property(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}
