//! In-memory schema storage
//!
//! Process-local store backed by a lock-guarded map. Every operation takes
//! the lock once, so conditional writes are atomic with respect to other
//! callers.

use super::collection::Collection;
use super::{DraftWrite, SchemaStore, StoreResult};
use crate::schema::{FieldDescriptor, FormSchema, VersionNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

/// In-memory schema storage
#[derive(Debug, Default)]
pub struct MemorySchemaStore {
    docs: RwLock<Collection>,
}

impl MemorySchemaStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    /// Whether the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SchemaStore for MemorySchemaStore {
    async fn insert(&self, doc: FormSchema) -> StoreResult<FormSchema> {
        let mut docs = self.docs.write();
        docs.check_insert(&doc)?;
        debug!(form_type = %doc.form_type, version = %doc.schema_version, "Inserted schema {}", doc.id);
        docs.put(doc.clone());
        Ok(doc)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<FormSchema>> {
        Ok(self.docs.read().get(id).cloned())
    }

    async fn find_latest_released(&self, form_type: &str) -> StoreResult<Option<FormSchema>> {
        Ok(self.docs.read().latest_released(form_type))
    }

    async fn find_by_version(
        &self,
        form_type: &str,
        version: VersionNumber,
    ) -> StoreResult<Option<FormSchema>> {
        Ok(self.docs.read().by_version(form_type, version))
    }

    async fn find_drafts(&self, form_type: &str) -> StoreResult<Vec<FormSchema>> {
        Ok(self.docs.read().drafts(form_type))
    }

    async fn find_all(&self, form_type: &str) -> StoreResult<Vec<FormSchema>> {
        Ok(self.docs.read().all(form_type))
    }

    async fn replace(&self, id: &str, doc: FormSchema) -> StoreResult<()> {
        let mut docs = self.docs.write();
        docs.check_replace(id, &doc)?;
        docs.put(doc);
        debug!("Replaced schema {}", id);
        Ok(())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let removed = self.docs.write().remove(id).is_some();
        if removed {
            debug!("Deleted schema {}", id);
        }
        Ok(removed)
    }

    async fn update_draft_fields(
        &self,
        id: &str,
        fields: Vec<FieldDescriptor>,
        at: DateTime<Utc>,
    ) -> StoreResult<DraftWrite<FormSchema>> {
        let mut docs = self.docs.write();
        let outcome = docs.draft_transition(id, |doc| {
            let mut updated = doc.clone();
            updated.set_fields(fields, at);
            updated
        })?;

        if let DraftWrite::Applied(ref updated) = outcome {
            docs.put(updated.clone());
            debug!(total_fields = updated.total_fields, "Updated fields of draft {}", id);
        }
        Ok(outcome)
    }

    async fn release_draft(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<DraftWrite<FormSchema>> {
        let mut docs = self.docs.write();
        let outcome = docs.draft_transition(id, |doc| {
            let mut released = doc.clone();
            released.schema_version.released = Some(at);
            released.updated_at = at;
            released
        })?;

        if let DraftWrite::Applied(ref released) = outcome {
            docs.put(released.clone());
            debug!(version = %released.schema_version, "Released schema {}", id);
        }
        Ok(outcome)
    }

    async fn delete_draft(&self, id: &str) -> StoreResult<DraftWrite<()>> {
        let mut docs = self.docs.write();
        let outcome = match docs.get(id).map(|doc| doc.is_draft()) {
            None => DraftWrite::Missing,
            Some(false) => DraftWrite::NotDraft,
            Some(true) => {
                docs.remove(id);
                debug!("Deleted draft {}", id);
                DraftWrite::Applied(())
            }
        };
        Ok(outcome)
    }
}
