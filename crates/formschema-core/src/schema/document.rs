//! Stored form schema documents

use super::field::{FieldDescriptor, FieldType};
use super::version::{SchemaVersion, VersionNumber};
use crate::mapping::RepeatableFieldMapping;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// A versioned field schema for one form type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSchema {
    /// Unique document identifier
    pub id: String,

    /// Form type, e.g. `i485`
    pub form_type: String,

    pub schema_version: SchemaVersion,

    pub fields: Vec<FieldDescriptor>,

    /// Always equal to `fields.len()`
    pub total_fields: usize,

    /// Latest released version when this one was drafted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<VersionNumber>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Disagreement between a repeatable mapping and the schema it targets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingMismatch {
    #[error("Mapping '{mapping}' has no field_id reference")]
    Unlinked { mapping: String },

    #[error("Mapping '{mapping}' references unknown field '{field_id}'")]
    UnknownField { mapping: String, field_id: String },

    #[error("Mapping '{mapping}' is typed {mapping_type} but field '{field_id}' is {schema_type}")]
    TypeMismatch {
        mapping: String,
        field_id: String,
        mapping_type: FieldType,
        schema_type: FieldType,
    },
}

impl FormSchema {
    /// Create a new draft document
    pub fn new_draft(
        form_type: impl Into<String>,
        version: VersionNumber,
        fields: Vec<FieldDescriptor>,
    ) -> Self {
        let now = Utc::now();
        let total_fields = fields.len();
        Self {
            id: Uuid::new_v4().to_string(),
            form_type: form_type.into(),
            schema_version: SchemaVersion::draft(version),
            fields,
            total_fields,
            previous_version: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record the released version this draft follows
    pub fn with_previous_version(mut self, previous: Option<VersionNumber>) -> Self {
        self.previous_version = previous;
        self
    }

    /// Whether `next` is an allowed rewrite of this released document
    ///
    /// Only metadata may move: `updated_at`, and `deprecated` from false to
    /// true. Content, version and release stamp stay as released.
    pub fn permits_rewrite(&self, next: &FormSchema) -> bool {
        let (current, proposed) = (&self.schema_version, &next.schema_version);
        self.form_type == next.form_type
            && current.number() == proposed.number()
            && current.released == proposed.released
            && (!current.deprecated || proposed.deprecated)
            && self.fields == next.fields
            && self.previous_version == next.previous_version
            && self.created_at == next.created_at
    }

    /// Whether this document is still a draft
    pub fn is_draft(&self) -> bool {
        self.schema_version.is_draft()
    }

    /// Version triple of this document
    pub fn version(&self) -> VersionNumber {
        self.schema_version.number()
    }

    /// Replace the field list, keeping `total_fields` in step
    pub fn set_fields(&mut self, fields: Vec<FieldDescriptor>, at: DateTime<Utc>) {
        self.total_fields = fields.len();
        self.fields = fields;
        self.updated_at = at;
    }

    /// Look up a field by id
    pub fn field(&self, field_id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.field_id == field_id)
    }

    /// Check that a repeatable mapping agrees with this schema
    ///
    /// The mapping must name a schema field through `field_id` and carry the
    /// same field type.
    pub fn check_mapping(&self, mapping: &RepeatableFieldMapping) -> Result<(), MappingMismatch> {
        let field_id = mapping
            .field_id
            .as_deref()
            .ok_or_else(|| MappingMismatch::Unlinked {
                mapping: mapping.field_name.clone(),
            })?;

        let field = self
            .field(field_id)
            .ok_or_else(|| MappingMismatch::UnknownField {
                mapping: mapping.field_name.clone(),
                field_id: field_id.to_string(),
            })?;

        if field.field_type != mapping.field_type {
            return Err(MappingMismatch::TypeMismatch {
                mapping: mapping.field_name.clone(),
                field_id: field_id.to_string(),
                mapping_type: mapping.field_type,
                schema_type: field.field_type,
            });
        }

        Ok(())
    }
}
