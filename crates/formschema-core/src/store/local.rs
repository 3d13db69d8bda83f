//! Local filesystem schema storage
//!
//! Stores each schema document as a JSON file named after its id. The
//! directory is indexed into memory on first use; writes go to a temporary
//! file that is renamed into place, so a document on disk is always either
//! the old or the new version.
//!
//! While a write is in flight the index is taken out of its lock and only
//! put back once disk and index agree again. A write that fails or is
//! dropped half way leaves the lock empty, and the next call re-indexes the
//! directory.

use super::collection::Collection;
use super::{DraftWrite, SchemaStore, StoreError, StoreResult};
use crate::schema::{FieldDescriptor, FormSchema, VersionNumber};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Local filesystem schema storage
///
/// Documents are stored in:
/// - `~/.formschema/schemas/` (default)
/// - Custom path if specified
pub struct LocalSchemaStore {
    /// Base directory for document files
    base_path: PathBuf,

    /// Index of the directory, loaded lazily; the lock also serialises writes
    index: Mutex<Option<Collection>>,
}

impl LocalSchemaStore {
    /// Create storage with default path (~/.formschema/schemas)
    pub fn new() -> StoreResult<Self> {
        let base_path = dirs::home_dir()
            .ok_or(StoreError::PathUnavailable)?
            .join(".formschema")
            .join("schemas");

        Ok(Self::with_path(base_path))
    }

    /// Create storage with custom base path
    pub fn with_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            index: Mutex::new(None),
        }
    }

    /// Base directory of this store
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    fn doc_path(&self, id: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    /// Lock the index, loading it from disk on first use
    async fn lock(&self) -> StoreResult<MutexGuard<'_, Option<Collection>>> {
        let mut guard = self.index.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_index().await?);
        }
        Ok(guard)
    }

    async fn load_index(&self) -> StoreResult<Collection> {
        fs::create_dir_all(&self.base_path).await?;

        let mut collection = Collection::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();

            // Only process .json files
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            match read_doc(&path).await {
                Ok(doc) => collection.put(doc),
                Err(e) => warn!("Failed to read schema document from {:?}: {}", path, e),
            }
        }

        info!(
            "Indexed {} schema documents from {:?}",
            collection.len(),
            self.base_path
        );
        Ok(collection)
    }

    async fn write_doc(&self, doc: &FormSchema) -> StoreResult<()> {
        let path = self.doc_path(&doc.id);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(doc)?;

        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        debug!("Saved schema {} to {:?}", doc.id, path);
        Ok(())
    }

    async fn remove_doc(&self, id: &str) -> StoreResult<()> {
        let path = self.doc_path(id);
        fs::remove_file(&path).await?;
        debug!("Deleted schema {} at {:?}", id, path);
        Ok(())
    }

    /// Write `doc` to disk, then to the index
    async fn persist(&self, slot: &mut Option<Collection>, doc: &FormSchema) -> StoreResult<()> {
        let mut index = detach(slot);
        self.write_doc(doc).await?;
        index.put(doc.clone());
        *slot = Some(index);
        Ok(())
    }

    /// Remove `id` from disk, then from the index
    async fn unpersist(&self, slot: &mut Option<Collection>, id: &str) -> StoreResult<()> {
        let mut index = detach(slot);
        self.remove_doc(id).await?;
        index.remove(id);
        *slot = Some(index);
        Ok(())
    }

    /// Persist a draft-only write and apply it to the index
    async fn commit_transition(
        &self,
        slot: &mut Option<Collection>,
        outcome: DraftWrite<FormSchema>,
    ) -> StoreResult<DraftWrite<FormSchema>> {
        if let DraftWrite::Applied(ref doc) = outcome {
            self.persist(slot, doc).await?;
        }
        Ok(outcome)
    }
}

async fn read_doc(path: &Path) -> StoreResult<FormSchema> {
    let content = fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&content)?)
}

/// Borrow the loaded index out of its guard
fn loaded(guard: &mut Option<Collection>) -> &mut Collection {
    guard.get_or_insert_with(Collection::new)
}

/// Take the index out of its guard for the duration of a disk write
fn detach(guard: &mut Option<Collection>) -> Collection {
    guard.take().unwrap_or_default()
}

#[async_trait]
impl SchemaStore for LocalSchemaStore {
    async fn insert(&self, doc: FormSchema) -> StoreResult<FormSchema> {
        let mut guard = self.lock().await?;
        loaded(&mut guard).check_insert(&doc)?;
        self.persist(&mut guard, &doc).await?;
        Ok(doc)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<FormSchema>> {
        let mut guard = self.lock().await?;
        Ok(loaded(&mut guard).get(id).cloned())
    }

    async fn find_latest_released(&self, form_type: &str) -> StoreResult<Option<FormSchema>> {
        let mut guard = self.lock().await?;
        Ok(loaded(&mut guard).latest_released(form_type))
    }

    async fn find_by_version(
        &self,
        form_type: &str,
        version: VersionNumber,
    ) -> StoreResult<Option<FormSchema>> {
        let mut guard = self.lock().await?;
        Ok(loaded(&mut guard).by_version(form_type, version))
    }

    async fn find_drafts(&self, form_type: &str) -> StoreResult<Vec<FormSchema>> {
        let mut guard = self.lock().await?;
        Ok(loaded(&mut guard).drafts(form_type))
    }

    async fn find_all(&self, form_type: &str) -> StoreResult<Vec<FormSchema>> {
        let mut guard = self.lock().await?;
        Ok(loaded(&mut guard).all(form_type))
    }

    async fn replace(&self, id: &str, doc: FormSchema) -> StoreResult<()> {
        let mut guard = self.lock().await?;
        loaded(&mut guard).check_replace(id, &doc)?;
        self.persist(&mut guard, &doc).await
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut guard = self.lock().await?;
        if loaded(&mut guard).get(id).is_none() {
            return Ok(false);
        }

        self.unpersist(&mut guard, id).await?;
        Ok(true)
    }

    async fn update_draft_fields(
        &self,
        id: &str,
        fields: Vec<FieldDescriptor>,
        at: DateTime<Utc>,
    ) -> StoreResult<DraftWrite<FormSchema>> {
        let mut guard = self.lock().await?;
        let outcome = loaded(&mut guard).draft_transition(id, |doc| {
            let mut updated = doc.clone();
            updated.set_fields(fields, at);
            updated
        })?;
        self.commit_transition(&mut guard, outcome).await
    }

    async fn release_draft(
        &self,
        id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<DraftWrite<FormSchema>> {
        let mut guard = self.lock().await?;
        let outcome = loaded(&mut guard).draft_transition(id, |doc| {
            let mut released = doc.clone();
            released.schema_version.released = Some(at);
            released.updated_at = at;
            released
        })?;
        self.commit_transition(&mut guard, outcome).await
    }

    async fn delete_draft(&self, id: &str) -> StoreResult<DraftWrite<()>> {
        let mut guard = self.lock().await?;
        match loaded(&mut guard).get(id).map(|doc| doc.is_draft()) {
            None => Ok(DraftWrite::Missing),
            Some(false) => Ok(DraftWrite::NotDraft),
            Some(true) => {
                self.unpersist(&mut guard, id).await?;
                Ok(DraftWrite::Applied(()))
            }
        }
    }
}
