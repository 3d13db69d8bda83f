//! Repeatable sections grouping several attribute mappings

use super::field::{MappingError, RepeatableFieldMapping};
use super::mapper::{SectionMapping, map_section};
use crate::pattern::InvalidPattern;
use crate::value::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry as MapEntry;
use thiserror::Error;

/// Section definition or mapping errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SectionError {
    #[error("Invalid section '{section_id}': {message}")]
    Invalid { section_id: String, message: String },

    #[error(transparent)]
    Pattern(#[from] InvalidPattern),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("Physical field '{field}' is produced by more than one mapping")]
    Collision { field: String },
}

/// A repeating block of a form, e.g. employment history
///
/// Each attribute of an entry (employer, start date, ...) has its own
/// [`RepeatableFieldMapping`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatableSection {
    pub section_id: String,

    pub section_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Page where the primary slots live
    pub base_page_number: u32,

    /// Attribute name to mapping
    pub field_mappings: BTreeMap<String, RepeatableFieldMapping>,

    /// Slots available on the base page
    pub max_entries_per_page: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplemental_page_template: Option<String>,
}

impl RepeatableSection {
    fn invalid(&self, message: impl Into<String>) -> SectionError {
        SectionError::Invalid {
            section_id: self.section_id.clone(),
            message: message.into(),
        }
    }

    /// Check the section definition and every pattern it holds
    pub fn validate(&self) -> Result<(), SectionError> {
        if self.section_id.trim().is_empty() {
            return Err(self.invalid("section_id cannot be empty"));
        }
        if self.section_id.contains(' ') {
            return Err(self.invalid("section_id cannot contain spaces"));
        }
        if self.section_name.trim().is_empty() {
            return Err(self.invalid("section_name cannot be empty"));
        }
        if self.base_page_number == 0 {
            return Err(self.invalid("base_page_number must be positive"));
        }
        if self.max_entries_per_page == 0 {
            return Err(self.invalid("max_entries_per_page must be positive"));
        }
        if let Some(ref template) = self.supplemental_page_template {
            if template.trim().is_empty() {
                return Err(self.invalid("supplemental_page_template cannot be empty if provided"));
            }
        }

        for (attribute, mapping) in &self.field_mappings {
            if mapping.max_entries > self.max_entries_per_page {
                return Err(self.invalid(format!(
                    "mapping '{}' allows {} entries but the page holds {}",
                    attribute, mapping.max_entries, self.max_entries_per_page
                )));
            }
            mapping.validate()?;
        }

        Ok(())
    }

    /// Map every attribute of `entries` and merge the results
    pub fn map_entries(&self, entries: &[Entry]) -> Result<SectionMapping, SectionError> {
        let mut merged = SectionMapping::new();

        for mapping in self.field_mappings.values() {
            let mapped = map_section(entries, mapping)?;

            for (name, value) in mapped.fields {
                match merged.fields.entry(name) {
                    MapEntry::Occupied(slot) => {
                        return Err(SectionError::Collision {
                            field: slot.key().clone(),
                        });
                    }
                    MapEntry::Vacant(slot) => {
                        slot.insert(value);
                    }
                }
            }
            merged.dropped.extend(mapped.dropped);
        }

        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use crate::value::FieldValue;

    fn employment_section() -> RepeatableSection {
        let employer = RepeatableFieldMapping::new(
            "employer_name",
            "Pt3Line{index}a_EmployerName[0]",
            FieldType::Text,
            3,
        );
        let start = RepeatableFieldMapping::new(
            "start_date",
            "Pt3Line{index}b_StartDate[0]",
            FieldType::Date,
            3,
        );

        RepeatableSection {
            section_id: "employment_history".to_string(),
            section_name: "Employment History".to_string(),
            description: None,
            base_page_number: 3,
            field_mappings: BTreeMap::from([
                ("employer_name".to_string(), employer),
                ("start_date".to_string(), start),
            ]),
            max_entries_per_page: 3,
            supplemental_page_template: None,
        }
    }

    fn job(employer: &str, start: &str) -> Entry {
        Entry::from([
            ("employer_name".to_string(), FieldValue::text(employer)),
            ("start_date".to_string(), FieldValue::text(start)),
        ])
    }

    #[test]
    fn test_map_entries_merges_attributes() {
        let section = employment_section();
        section.validate().unwrap();

        let entries = vec![job("Acme", "2019-02-01"), job("Globex", "2021-06-15")];
        let result = section.map_entries(&entries).unwrap();

        assert!(result.is_complete());
        let rendered = result.rendered();
        assert_eq!(rendered["Pt3Line1a_EmployerName[0]"], "Acme");
        assert_eq!(rendered["Pt3Line1b_StartDate[0]"], "02/01/2019");
        assert_eq!(rendered["Pt3Line2a_EmployerName[0]"], "Globex");
        assert_eq!(rendered.len(), 4);
    }

    #[test]
    fn test_collision_inside_section() {
        let mut section = employment_section();
        if let Some(start) = section.field_mappings.get_mut("start_date") {
            start.pdf_field_pattern = "Pt3Line{index}a_EmployerName[0]".to_string();
        }

        let err = section
            .map_entries(&[job("Acme", "2019-02-01")])
            .unwrap_err();
        assert!(matches!(err, SectionError::Collision { .. }));
    }

    #[test]
    fn test_validate_rules() {
        let mut section = employment_section();
        section.section_id = "employment history".to_string();
        assert!(matches!(
            section.validate(),
            Err(SectionError::Invalid { .. })
        ));

        let mut section = employment_section();
        section.max_entries_per_page = 2;
        assert!(section.validate().is_err());

        let mut section = employment_section();
        section.base_page_number = 0;
        assert!(section.validate().is_err());

        let mut section = employment_section();
        if let Some(mapping) = section.field_mappings.get_mut("start_date") {
            mapping.field_indices = Some(vec![1, 1]);
        }
        assert!(matches!(
            section.validate(),
            Err(SectionError::Mapping(MappingError::FieldIndices { .. }))
        ));
    }
}
