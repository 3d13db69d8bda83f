//! Schema document storage abstraction and implementations
//!
//! Provides trait-based storage for schema documents with an in-memory
//! implementation and a local filesystem implementation. Uniqueness rules
//! (one draft per form type, one document per version) and draft-only
//! conditional writes are enforced here, atomically, so that callers never
//! race a read-then-write check.

mod collection;
mod local;
mod memory;

pub use local::LocalSchemaStore;
pub use memory::MemorySchemaStore;

use crate::schema::{FieldDescriptor, FormSchema, VersionNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Schema validation failed: {0}")]
    Validation(String),

    #[error("A draft already exists for form type '{form_type}'")]
    DraftConflict { form_type: String },

    #[error("Version {version} already exists for form type '{form_type}'")]
    DuplicateVersion {
        form_type: String,
        version: VersionNumber,
    },

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage path not available")]
    PathUnavailable,
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a write that only applies to drafts
#[derive(Debug, Clone, PartialEq)]
pub enum DraftWrite<T> {
    /// The document was a draft and the write was applied
    Applied(T),
    /// The document exists but is released; nothing changed
    NotDraft,
    /// No document has this id
    Missing,
}

/// Schema document storage trait for different backends
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SchemaStore: Send + Sync {
    /// Insert a new document
    ///
    /// Fails with `DraftConflict` if the document is a draft and the form
    /// type already has one, and with `DuplicateVersion` if the version triple
    /// is taken.
    async fn insert(&self, doc: FormSchema) -> StoreResult<FormSchema>;

    /// Load a document by id
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<FormSchema>>;

    /// Highest released version of a form type
    async fn find_latest_released(&self, form_type: &str) -> StoreResult<Option<FormSchema>>;

    /// Exact version lookup, draft or released
    async fn find_by_version(
        &self,
        form_type: &str,
        version: VersionNumber,
    ) -> StoreResult<Option<FormSchema>>;

    /// All drafts of a form type
    async fn find_drafts(&self, form_type: &str) -> StoreResult<Vec<FormSchema>>;

    /// All documents of a form type, ascending by version
    async fn find_all(&self, form_type: &str) -> StoreResult<Vec<FormSchema>>;

    /// Replace a document wholesale
    async fn replace(&self, id: &str, doc: FormSchema) -> StoreResult<()>;

    /// Delete a document, returning whether it existed
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// Replace the fields of a draft in one conditional write
    async fn update_draft_fields(
        &self,
        id: &str,
        fields: Vec<FieldDescriptor>,
        at: DateTime<Utc>,
    ) -> StoreResult<DraftWrite<FormSchema>>;

    /// Stamp the release time of a draft in one conditional write
    async fn release_draft(&self, id: &str, at: DateTime<Utc>)
    -> StoreResult<DraftWrite<FormSchema>>;

    /// Delete a document only if it is a draft
    async fn delete_draft(&self, id: &str) -> StoreResult<DraftWrite<()>>;
}

/// Validate the shape of a document before it is persisted
pub fn validate_document(doc: &FormSchema) -> StoreResult<()> {
    if doc.id.trim().is_empty() {
        return Err(StoreError::Validation("id is required".to_string()));
    }
    if doc.form_type.trim().is_empty() {
        return Err(StoreError::Validation("form_type is required".to_string()));
    }
    if doc.fields.is_empty() {
        return Err(StoreError::Validation(
            "fields must contain at least one field".to_string(),
        ));
    }
    if doc.total_fields != doc.fields.len() {
        return Err(StoreError::Validation(format!(
            "total_fields is {} but {} fields are present",
            doc.total_fields,
            doc.fields.len()
        )));
    }

    let mut seen = HashSet::new();
    for field in &doc.fields {
        if field.field_id.trim().is_empty() {
            return Err(StoreError::Validation("field_id cannot be empty".to_string()));
        }
        if !seen.insert(field.field_id.as_str()) {
            return Err(StoreError::Validation(format!(
                "duplicate field_id '{}'",
                field.field_id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;

    fn doc(fields: Vec<FieldDescriptor>) -> FormSchema {
        FormSchema::new_draft("i485", VersionNumber::initial(), fields)
    }

    #[test]
    fn test_validate_accepts_well_formed() {
        let doc = doc(vec![FieldDescriptor::new("a", FieldType::Text, "A", true)]);
        assert!(validate_document(&doc).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_fields() {
        let err = validate_document(&doc(vec![])).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_inconsistent_total() {
        let mut doc = doc(vec![FieldDescriptor::new("a", FieldType::Text, "A", true)]);
        doc.total_fields = 5;
        assert!(matches!(
            validate_document(&doc),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_field_ids() {
        let doc = doc(vec![
            FieldDescriptor::new("a", FieldType::Text, "A", true),
            FieldDescriptor::new("a", FieldType::Date, "A again", false),
        ]);
        assert!(matches!(
            validate_document(&doc),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_missing_form_type() {
        let mut doc = doc(vec![FieldDescriptor::new("a", FieldType::Text, "A", true)]);
        doc.form_type = "  ".to_string();
        assert!(validate_document(&doc).is_err());
    }
}
