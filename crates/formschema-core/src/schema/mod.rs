//! Form schema data model
//!
//! Defines the documents held by the registry:
//! - FormSchema: versioned list of field descriptors for a form type
//! - SchemaVersion: semantic version plus release timestamp and deprecation flag
//! - FieldDescriptor: one field the target form understands
//! - VersionDiff: field-level changes between two versions, with entry migration

mod diff;
mod document;
mod field;
mod version;

pub use diff::{ChangeType, FieldChange, MigratedEntry, VersionDiff, diff_fields};
pub use document::{FormSchema, MappingMismatch};
pub use field::{FieldDescriptor, FieldType};
pub use version::{ParseVersionError, SchemaVersion, VersionNumber};
