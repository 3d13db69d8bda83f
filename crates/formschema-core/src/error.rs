//! Error types for the schema registry
//!
//! State-machine violations (`DraftConflict`, `NotDraft`, `NotReleased`) are
//! always reported to the caller. Storage validation failures keep their
//! message unchanged.

use crate::pattern::InvalidPattern;
use crate::schema::VersionNumber;
use crate::store::StoreError;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by the versioned schema service
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed physical field pattern
    #[error(transparent)]
    InvalidPattern(#[from] InvalidPattern),

    /// Document rejected at the storage boundary
    #[error("Schema validation failed: {0}")]
    Validation(String),

    /// A draft already exists for the form type
    #[error("A draft already exists for form type '{form_type}'")]
    DraftConflict { form_type: String },

    /// The target document is released and cannot change
    #[error("Schema {schema_id} is released and cannot be modified")]
    NotDraft { schema_id: String },

    /// The target document is still a draft
    #[error("Schema {schema_id} is a draft and has not been released")]
    NotReleased { schema_id: String },

    #[error("Schema not found: {0}")]
    NotFound(String),

    #[error("Version {version} already exists for form type '{form_type}'")]
    DuplicateVersion {
        form_type: String,
        version: VersionNumber,
    },

    /// A storage call did not finish within the configured timeout
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Storage error: {0}")]
    Storage(StoreError),
}

impl RegistryError {
    /// Get the error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidPattern(_) => "INVALID_PATTERN",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::DraftConflict { .. } => "DRAFT_CONFLICT",
            Self::NotDraft { .. } => "NOT_DRAFT",
            Self::NotReleased { .. } => "NOT_RELEASED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::DuplicateVersion { .. } => "DUPLICATE_VERSION",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn not_draft(schema_id: impl Into<String>) -> Self {
        Self::NotDraft {
            schema_id: schema_id.into(),
        }
    }
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => Self::Validation(message),
            StoreError::DraftConflict { form_type } => Self::DraftConflict { form_type },
            StoreError::DuplicateVersion { form_type, version } => {
                Self::DuplicateVersion { form_type, version }
            }
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_typed_variants() {
        let err: RegistryError = StoreError::DraftConflict {
            form_type: "i485".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "DRAFT_CONFLICT");

        let err: RegistryError = StoreError::Validation("fields empty".to_string()).into();
        assert_eq!(err.to_string(), "Schema validation failed: fields empty");

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err: RegistryError = StoreError::Io(io).into();
        assert!(matches!(err, RegistryError::Storage(StoreError::Io(_))));
    }
}
