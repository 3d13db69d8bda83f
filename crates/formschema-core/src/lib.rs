//! Form schema registry and repeatable field mapping
//!
//! This crate provides:
//! - Field pattern resolution (`Pt4Line{index}_Street[0]` → physical field names)
//! - Repeatable section mapping with capacity limits and supplemental overflow
//! - Versioned form schemas with a draft/released lifecycle, deprecation and
//!   entry migration between versions
//! - Storage backends (in-memory and local JSON files)
//! - Registry configuration

pub mod config;
pub mod error;
pub mod mapping;
pub mod pattern;
pub mod schema;
pub mod service;
pub mod store;
pub mod value;

pub use config::{ConfigError, LoggingConfig, RegistryConfig, StorageBackend, StorageConfig};
pub use error::{RegistryError, RegistryResult};
pub use mapping::{
    DropReason, EntryDropped, MappingError, RepeatableFieldMapping, RepeatableSection,
    SectionError, SectionMapping, map_section,
};
pub use pattern::{FieldPattern, InvalidPattern};
pub use schema::{
    ChangeType, FieldChange, FieldDescriptor, FieldType, FormSchema, MappingMismatch,
    MigratedEntry, SchemaVersion, VersionDiff, VersionNumber,
};
pub use service::{VersionBump, VersionedSchemaService};
pub use store::{
    DraftWrite, LocalSchemaStore, MemorySchemaStore, SchemaStore, StoreError, StoreResult,
};
pub use value::{ConversionError, Entry, FieldValue};
