//! In-memory document collection shared by the store backends
//!
//! Every check here runs while the caller holds its backend's write lock, so
//! a check followed by `put` is one atomic step from the outside.

use super::{DraftWrite, StoreError, StoreResult, validate_document};
use crate::schema::{FormSchema, VersionNumber};
use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub(crate) struct Collection {
    docs: HashMap<String, FormSchema>,
}

impl Collection {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }

    pub(crate) fn get(&self, id: &str) -> Option<&FormSchema> {
        self.docs.get(id)
    }

    pub(crate) fn put(&mut self, doc: FormSchema) {
        self.docs.insert(doc.id.clone(), doc);
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<FormSchema> {
        self.docs.remove(id)
    }

    fn of_type<'a>(&'a self, form_type: &'a str) -> impl Iterator<Item = &'a FormSchema> + 'a {
        self.docs.values().filter(move |d| d.form_type == form_type)
    }

    /// Uniqueness checks shared by insert and replace; `exclude` is the id
    /// being replaced
    fn check_unique(&self, doc: &FormSchema, exclude: Option<&str>) -> StoreResult<()> {
        let others: Vec<&FormSchema> = self
            .of_type(&doc.form_type)
            .filter(|d| Some(d.id.as_str()) != exclude)
            .collect();

        // A second draft is a conflict even when it also repeats a version
        if doc.is_draft() && others.iter().any(|d| d.is_draft()) {
            return Err(StoreError::DraftConflict {
                form_type: doc.form_type.clone(),
            });
        }

        if others.iter().any(|d| d.version() == doc.version()) {
            return Err(StoreError::DuplicateVersion {
                form_type: doc.form_type.clone(),
                version: doc.version(),
            });
        }

        Ok(())
    }

    pub(crate) fn check_insert(&self, doc: &FormSchema) -> StoreResult<()> {
        validate_document(doc)?;
        if self.docs.contains_key(&doc.id) {
            return Err(StoreError::Validation(format!(
                "document id '{}' already exists",
                doc.id
            )));
        }
        self.check_unique(doc, None)
    }

    pub(crate) fn check_replace(&self, id: &str, doc: &FormSchema) -> StoreResult<()> {
        validate_document(doc)?;
        if doc.id != id {
            return Err(StoreError::Validation(format!(
                "document id '{}' does not match '{}'",
                doc.id, id
            )));
        }
        let existing = self
            .docs
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !existing.is_draft() && !existing.permits_rewrite(doc) {
            return Err(StoreError::Validation(format!(
                "released schema '{}' is immutable",
                id
            )));
        }
        self.check_unique(doc, Some(id))
    }

    /// Compute the result of a draft-only write without applying it
    pub(crate) fn draft_transition<F>(&self, id: &str, change: F) -> StoreResult<DraftWrite<FormSchema>>
    where
        F: FnOnce(&FormSchema) -> FormSchema,
    {
        match self.docs.get(id) {
            None => Ok(DraftWrite::Missing),
            Some(doc) if !doc.is_draft() => Ok(DraftWrite::NotDraft),
            Some(doc) => {
                let updated = change(doc);
                validate_document(&updated)?;
                Ok(DraftWrite::Applied(updated))
            }
        }
    }

    pub(crate) fn latest_released(&self, form_type: &str) -> Option<FormSchema> {
        self.of_type(form_type)
            .filter(|d| !d.is_draft())
            .max_by_key(|d| d.version())
            .cloned()
    }

    pub(crate) fn by_version(&self, form_type: &str, version: VersionNumber) -> Option<FormSchema> {
        self.of_type(form_type)
            .find(|d| d.version() == version)
            .cloned()
    }

    pub(crate) fn drafts(&self, form_type: &str) -> Vec<FormSchema> {
        let mut drafts: Vec<FormSchema> = self
            .of_type(form_type)
            .filter(|d| d.is_draft())
            .cloned()
            .collect();
        drafts.sort_by_key(|d| d.version());
        drafts
    }

    pub(crate) fn all(&self, form_type: &str) -> Vec<FormSchema> {
        let mut docs: Vec<FormSchema> = self.of_type(form_type).cloned().collect();
        docs.sort_by_key(|d| d.version());
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldDescriptor, FieldType};
    use chrono::Utc;

    fn draft(form_type: &str, version: VersionNumber) -> FormSchema {
        FormSchema::new_draft(
            form_type,
            version,
            vec![FieldDescriptor::new("a", FieldType::Text, "A", true)],
        )
    }

    fn released(form_type: &str, version: VersionNumber) -> FormSchema {
        let mut doc = draft(form_type, version);
        doc.schema_version.released = Some(Utc::now());
        doc
    }

    #[test]
    fn test_second_draft_conflicts() {
        let mut collection = Collection::new();
        let first = draft("i485", VersionNumber::new(1, 0, 0));
        collection.check_insert(&first).unwrap();
        collection.put(first);

        let second = draft("i485", VersionNumber::new(1, 1, 0));
        assert!(matches!(
            collection.check_insert(&second),
            Err(StoreError::DraftConflict { .. })
        ));

        let other_form = draft("i130", VersionNumber::new(1, 0, 0));
        assert!(collection.check_insert(&other_form).is_ok());
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let mut collection = Collection::new();
        collection.put(released("i485", VersionNumber::new(1, 0, 0)));

        let dup = released("i485", VersionNumber::new(1, 0, 0));
        assert!(matches!(
            collection.check_insert(&dup),
            Err(StoreError::DuplicateVersion { .. })
        ));
    }

    #[test]
    fn test_latest_released_skips_drafts() {
        let mut collection = Collection::new();
        collection.put(released("i485", VersionNumber::new(1, 0, 0)));
        collection.put(released("i485", VersionNumber::new(1, 2, 0)));
        collection.put(draft("i485", VersionNumber::new(1, 3, 0)));

        let latest = collection.latest_released("i485").unwrap();
        assert_eq!(latest.version(), VersionNumber::new(1, 2, 0));
        assert_eq!(collection.drafts("i485").len(), 1);
        assert_eq!(collection.all("i485").len(), 3);
        assert!(collection.latest_released("i130").is_none());
    }

    #[test]
    fn test_replace_cannot_reopen_released() {
        let mut collection = Collection::new();
        let doc = released("i485", VersionNumber::new(1, 0, 0));
        let id = doc.id.clone();
        collection.put(doc.clone());

        let mut reopened = doc.clone();
        reopened.schema_version.released = None;
        reopened.set_fields(
            vec![
                FieldDescriptor::new("a", FieldType::Text, "A", true),
                FieldDescriptor::new("b", FieldType::Text, "B", false),
            ],
            Utc::now(),
        );
        assert!(matches!(
            collection.check_replace(&id, &reopened),
            Err(StoreError::Validation(_))
        ));

        let mut deprecated = doc;
        deprecated.schema_version.deprecated = true;
        assert!(collection.check_replace(&id, &deprecated).is_ok());
    }

    #[test]
    fn test_draft_transition_outcomes() {
        let mut collection = Collection::new();
        let draft_doc = draft("i485", VersionNumber::new(1, 0, 0));
        let released_doc = released("i485", VersionNumber::new(0, 9, 0));
        let draft_id = draft_doc.id.clone();
        let released_id = released_doc.id.clone();
        collection.put(draft_doc);
        collection.put(released_doc);

        assert_eq!(
            collection.draft_transition("nope", |d| d.clone()).unwrap(),
            DraftWrite::Missing
        );
        assert_eq!(
            collection.draft_transition(&released_id, |d| d.clone()).unwrap(),
            DraftWrite::NotDraft
        );
        assert!(matches!(
            collection.draft_transition(&draft_id, |d| d.clone()).unwrap(),
            DraftWrite::Applied(_)
        ));
    }
}
