//! Versioned schema service
//!
//! Drives the draft/released lifecycle of schema documents on top of a
//! [`SchemaStore`]. Every state check that matters for correctness happens
//! inside a single conditional store call; the service only derives version
//! numbers and translates outcomes into typed errors.

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::schema::{FieldDescriptor, FormSchema, MigratedEntry, VersionDiff, VersionNumber};
use crate::store::{DraftWrite, SchemaStore, StoreResult};
use crate::value::Entry;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// How a new draft's version is derived from the latest released one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    /// `{major, minor + 1, 0}`
    #[default]
    Minor,
    /// `{major + 1, 0, 0}`
    Major,
}

impl VersionBump {
    /// Version for a new draft given the latest released version, if any
    ///
    /// Fails with `Validation` when the bumped component is already at its
    /// maximum.
    pub fn next(self, latest_released: Option<VersionNumber>) -> RegistryResult<VersionNumber> {
        let Some(latest) = latest_released else {
            return Ok(VersionNumber::initial());
        };

        let next = match self {
            VersionBump::Minor => latest.next_minor(),
            VersionBump::Major => latest.next_major(),
        };
        next.ok_or_else(|| {
            RegistryError::Validation(format!("version {} cannot be bumped further", latest))
        })
    }
}

/// Lifecycle operations for versioned form schemas
pub struct VersionedSchemaService {
    store: Arc<dyn SchemaStore>,
    operation_timeout: Duration,
}

impl VersionedSchemaService {
    /// Create a service with the default operation timeout
    pub fn new(store: Arc<dyn SchemaStore>) -> Self {
        Self::with_timeout(store, RegistryConfig::default().operation_timeout)
    }

    /// Create a service with a custom per-call timeout
    pub fn with_timeout(store: Arc<dyn SchemaStore>, operation_timeout: Duration) -> Self {
        Self {
            store,
            operation_timeout,
        }
    }

    /// Open the configured store and wrap it
    pub fn from_config(config: &RegistryConfig) -> RegistryResult<Self> {
        let store = config.storage.open()?;
        Ok(Self::with_timeout(store, config.operation_timeout))
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn SchemaStore> {
        &self.store
    }

    /// Run one store call under the operation timeout
    async fn call<T, F>(&self, operation: &'static str, fut: F) -> RegistryResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match timeout(self.operation_timeout, fut).await {
            Ok(result) => result.map_err(RegistryError::from),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(RegistryError::Timeout {
                    operation,
                    timeout: self.operation_timeout,
                })
            }
        }
    }

    /// Create the next minor draft of a form type
    pub async fn create_schema(
        &self,
        form_type: &str,
        fields: Vec<FieldDescriptor>,
    ) -> RegistryResult<FormSchema> {
        self.create_schema_with(form_type, fields, VersionBump::Minor)
            .await
    }

    /// Create a new draft, deriving its version with `bump`
    ///
    /// Fails with `DraftConflict` when the form type already has a draft,
    /// including when another caller creates one concurrently.
    pub async fn create_schema_with(
        &self,
        form_type: &str,
        fields: Vec<FieldDescriptor>,
        bump: VersionBump,
    ) -> RegistryResult<FormSchema> {
        let latest = self
            .call(
                "find_latest_released",
                self.store.find_latest_released(form_type),
            )
            .await?;

        let previous = latest.as_ref().map(FormSchema::version);
        let version = bump.next(previous)?;
        let draft =
            FormSchema::new_draft(form_type, version, fields).with_previous_version(previous);

        let created = self.call("insert", self.store.insert(draft)).await?;
        info!(
            form_type = %created.form_type,
            schema_id = %created.id,
            version = %created.version(),
            total_fields = created.total_fields,
            "Created draft schema"
        );
        Ok(created)
    }

    /// Replace the fields of a draft
    pub async fn update_schema_fields(
        &self,
        id: &str,
        fields: Vec<FieldDescriptor>,
    ) -> RegistryResult<FormSchema> {
        let outcome = self
            .call(
                "update_draft_fields",
                self.store.update_draft_fields(id, fields, Utc::now()),
            )
            .await?;

        let updated = applied(id, outcome)?;
        debug!(
            schema_id = %updated.id,
            total_fields = updated.total_fields,
            "Updated draft fields"
        );
        Ok(updated)
    }

    /// Release a draft, freezing it permanently
    pub async fn release_schema(&self, id: &str) -> RegistryResult<FormSchema> {
        let outcome = self
            .call("release_draft", self.store.release_draft(id, Utc::now()))
            .await?;

        let released = applied(id, outcome)?;
        info!(
            form_type = %released.form_type,
            schema_id = %released.id,
            version = %released.version(),
            "Released schema"
        );
        Ok(released)
    }

    /// All versions of a form type, ascending
    pub async fn list_schemas(
        &self,
        form_type: &str,
        include_drafts: bool,
    ) -> RegistryResult<Vec<FormSchema>> {
        let mut docs = self
            .call("find_all", self.store.find_all(form_type))
            .await?;

        if !include_drafts {
            docs.retain(|doc| !doc.is_draft());
        }
        docs.sort_by_key(FormSchema::version);
        Ok(docs)
    }

    /// Latest released version, or the exact version in any state
    pub async fn get_schema(
        &self,
        form_type: &str,
        version: Option<VersionNumber>,
    ) -> RegistryResult<Option<FormSchema>> {
        match version {
            Some(version) => {
                self.call(
                    "find_by_version",
                    self.store.find_by_version(form_type, version),
                )
                .await
            }
            None => {
                self.call(
                    "find_latest_released",
                    self.store.find_latest_released(form_type),
                )
                .await
            }
        }
    }

    /// Load a document by id
    pub async fn get_schema_by_id(&self, id: &str) -> RegistryResult<Option<FormSchema>> {
        self.call("find_by_id", self.store.find_by_id(id)).await
    }

    /// Delete a draft; returns `false` when no document has this id
    pub async fn delete_draft_schema(&self, id: &str) -> RegistryResult<bool> {
        let outcome = self
            .call("delete_draft", self.store.delete_draft(id))
            .await?;

        match outcome {
            DraftWrite::Applied(()) => {
                info!(schema_id = %id, "Deleted draft schema");
                Ok(true)
            }
            DraftWrite::Missing => Ok(false),
            DraftWrite::NotDraft => Err(RegistryError::not_draft(id)),
        }
    }

    /// Field-level differences between two versions of a form type
    pub async fn compare_versions(
        &self,
        form_type: &str,
        from: VersionNumber,
        to: VersionNumber,
    ) -> RegistryResult<VersionDiff> {
        let old = self.require_version(form_type, from).await?;
        let new = self.require_version(form_type, to).await?;

        Ok(VersionDiff::between(form_type, from, to, &old.fields, &new.fields))
    }

    /// Carry one entry keyed by `field_id` from one version to another
    pub async fn migrate_entry(
        &self,
        form_type: &str,
        from: VersionNumber,
        to: VersionNumber,
        entry: &Entry,
    ) -> RegistryResult<MigratedEntry> {
        let diff = self.compare_versions(form_type, from, to).await?;
        let migrated = diff.migrate_entry(entry);

        if !migrated.is_lossless() {
            warn!(
                form_type,
                from = %from,
                to = %to,
                dropped = migrated.dropped.len(),
                "Entry lost values during migration"
            );
        }
        Ok(migrated)
    }

    /// Mark a released version as deprecated
    ///
    /// Deprecating twice is a no-op. Drafts cannot be deprecated.
    pub async fn deprecate_version(
        &self,
        form_type: &str,
        version: VersionNumber,
    ) -> RegistryResult<FormSchema> {
        let doc = self.require_version(form_type, version).await?;
        if doc.is_draft() {
            return Err(RegistryError::NotReleased { schema_id: doc.id });
        }
        if doc.schema_version.deprecated {
            return Ok(doc);
        }

        let mut deprecated = doc;
        deprecated.schema_version.deprecated = true;
        deprecated.updated_at = Utc::now();
        self.call(
            "replace",
            self.store.replace(&deprecated.id, deprecated.clone()),
        )
        .await?;

        info!(
            form_type,
            schema_id = %deprecated.id,
            version = %version,
            "Deprecated schema"
        );
        Ok(deprecated)
    }

    /// Newest released, non-deprecated version usable in place of `target`
    ///
    /// A version qualifies when it shares the major of `target` and is not
    /// older than it.
    pub async fn find_compatible_version(
        &self,
        form_type: &str,
        target: VersionNumber,
    ) -> RegistryResult<Option<FormSchema>> {
        let docs = self.list_schemas(form_type, false).await?;
        Ok(docs
            .into_iter()
            .filter(|doc| !doc.schema_version.deprecated)
            .filter(|doc| doc.version().is_compatible_with(target))
            .max_by_key(FormSchema::version))
    }

    async fn require_version(
        &self,
        form_type: &str,
        version: VersionNumber,
    ) -> RegistryResult<FormSchema> {
        self.get_schema(form_type, Some(version))
            .await?
            .ok_or_else(|| RegistryError::NotFound(format!("{} {}", form_type, version)))
    }
}

/// Translate a draft-only write outcome into the document or a typed error
fn applied(id: &str, outcome: DraftWrite<FormSchema>) -> RegistryResult<FormSchema> {
    match outcome {
        DraftWrite::Applied(doc) => Ok(doc),
        DraftWrite::NotDraft => Err(RegistryError::not_draft(id)),
        DraftWrite::Missing => Err(RegistryError::NotFound(id.to_string())),
    }
}
