//! Repeatable field mapping descriptor

use crate::pattern::{self, FieldPattern, InvalidPattern};
use crate::schema::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Invalid repeatable mapping definition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error(transparent)]
    Pattern(#[from] InvalidPattern),

    #[error("Mapping '{field_name}' has invalid field_indices: {message}")]
    FieldIndices { field_name: String, message: String },
}

/// How one logical repeating attribute is laid out on a form
///
/// Holds no client data. `pdf_field_pattern` names the primary slots;
/// `supplemental_page_pattern`, when set, receives entries beyond
/// `max_entries`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableFieldMapping {
    /// Attribute name inside each client entry
    pub field_name: String,

    /// Physical pattern, e.g. `Pt3Line{index}a_EmployerName[0]`
    pub pdf_field_pattern: String,

    pub field_type: FieldType,

    /// Number of primary slots on the base page
    pub max_entries: usize,

    /// Physical line numbers to use instead of `1..=max_entries`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_indices: Option<Vec<usize>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplemental_page_pattern: Option<String>,

    /// Schema field this mapping writes, checked by `FormSchema::check_mapping`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_id: Option<String>,
}

impl RepeatableFieldMapping {
    /// Create a mapping without overrides or supplemental pattern
    pub fn new(
        field_name: impl Into<String>,
        pdf_field_pattern: impl Into<String>,
        field_type: FieldType,
        max_entries: usize,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            pdf_field_pattern: pdf_field_pattern.into(),
            field_type,
            max_entries,
            field_indices: None,
            supplemental_page_pattern: None,
            field_id: None,
        }
    }

    /// Use explicit physical line numbers
    pub fn with_field_indices(mut self, indices: Vec<usize>) -> Self {
        self.field_indices = Some(indices);
        self
    }

    /// Route overflow entries to a supplemental page pattern
    pub fn with_supplemental(mut self, pattern: impl Into<String>) -> Self {
        self.supplemental_page_pattern = Some(pattern.into());
        self
    }

    /// Link this mapping to a schema field
    pub fn with_field_id(mut self, field_id: impl Into<String>) -> Self {
        self.field_id = Some(field_id.into());
        self
    }

    /// Validate both patterns and the override list
    ///
    /// Every primary slot `0..max_entries` must land on a distinct, positive
    /// physical index, counting the one-based fallback past the end of
    /// `field_indices`.
    pub fn validate(&self) -> Result<(), MappingError> {
        FieldPattern::parse(&self.pdf_field_pattern)?;
        if let Some(ref supplemental) = self.supplemental_page_pattern {
            FieldPattern::parse(supplemental)?;
        }

        let Some(ref indices) = self.field_indices else {
            return Ok(());
        };
        let covered = indices.len().min(self.max_entries);

        let mut seen = HashSet::new();
        for &index in &indices[..covered] {
            if index == 0 {
                return Err(self.bad_indices("physical indices start at 1"));
            }
            if !seen.insert(index) {
                return Err(self.bad_indices(format!("index {} is used twice", index)));
            }
            // Slots past the override list fall back to `covered + 1..=max_entries`
            if index > covered && index <= self.max_entries {
                return Err(self.bad_indices(format!(
                    "index {} collides with the one-based fallback",
                    index
                )));
            }
        }

        Ok(())
    }

    fn bad_indices(&self, message: impl Into<String>) -> MappingError {
        MappingError::FieldIndices {
            field_name: self.field_name.clone(),
            message: message.into(),
        }
    }

    /// Primary physical field name for a logical index
    pub fn pdf_field_name(&self, index: usize) -> Result<String, InvalidPattern> {
        pattern::resolve(
            &self.pdf_field_pattern,
            index,
            self.field_indices.as_deref(),
        )
    }

    /// Supplemental field name for an overflow index
    pub fn supplemental_field_name(&self, index: usize) -> Result<Option<String>, InvalidPattern> {
        pattern::resolve_supplemental(self.supplemental_page_pattern.as_deref(), index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let mapping = RepeatableFieldMapping::new(
            "employer_name",
            "Pt3Line{index}a_EmployerName[0]",
            FieldType::Text,
            3,
        )
        .with_field_indices(vec![2, 4, 6])
        .with_supplemental("Pt9Line{index}_Employer[0]");

        assert!(mapping.validate().is_ok());
        assert_eq!(mapping.pdf_field_name(0).unwrap(), "Pt3Line2a_EmployerName[0]");
        assert_eq!(mapping.pdf_field_name(3).unwrap(), "Pt3Line4a_EmployerName[0]");
        assert_eq!(
            mapping.supplemental_field_name(0).unwrap().as_deref(),
            Some("Pt9Line1_Employer[0]")
        );
    }

    #[test]
    fn test_validate_rejects_bad_supplemental() {
        let mapping = RepeatableFieldMapping::new("x", "A{index}", FieldType::Text, 1)
            .with_supplemental("B");
        assert!(mapping.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_colliding_indices() {
        let base = RepeatableFieldMapping::new("x", "Line{index}", FieldType::Text, 3);

        // Slot 0 -> 3, slots 1 and 2 fall back to 2 and 3
        let short = base.clone().with_field_indices(vec![3]);
        assert!(matches!(
            short.validate(),
            Err(MappingError::FieldIndices { .. })
        ));

        let duplicate = base.clone().with_field_indices(vec![2, 2, 6]);
        assert!(duplicate.validate().is_err());

        let zero = base.clone().with_field_indices(vec![0, 4, 6]);
        assert!(zero.validate().is_err());

        assert!(base.clone().with_field_indices(vec![5]).validate().is_ok());
        assert!(base.with_field_indices(vec![2, 4, 6, 2]).validate().is_ok());
    }

    #[test]
    fn test_deserialize_minimal() {
        let mapping: RepeatableFieldMapping = serde_json::from_str(
            r#"{"field_name": "start_date", "pdf_field_pattern": "Pt3Line{index}b_StartDate[0]",
                "field_type": "date", "max_entries": 3}"#,
        )
        .unwrap();
        assert_eq!(mapping.field_type, FieldType::Date);
        assert!(mapping.field_indices.is_none());
    }
}
