//! Field-level differences between schema versions
//!
//! A [`VersionDiff`] also carries what it takes to move filled-in data
//! across the change: whether the change is breaking, human-readable
//! migration notes, and [`VersionDiff::migrate_entry`].

use super::field::FieldDescriptor;
use super::version::VersionNumber;
use crate::value::Entry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How a field changed between two versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Removed,
    Modified,
}

/// A single field change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field_id: String,
    pub change_type: ChangeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<FieldDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<FieldDescriptor>,
}

impl FieldChange {
    /// Whether data valid for the old field may be rejected by the new one
    ///
    /// Removing a field, changing its type, or making it required breaks
    /// existing data; everything else is additive.
    pub fn is_breaking(&self) -> bool {
        match (self.change_type, &self.previous, &self.current) {
            (ChangeType::Removed, _, _) => true,
            (ChangeType::Added, _, Some(current)) => current.required,
            (ChangeType::Modified, Some(previous), Some(current)) => {
                previous.field_type != current.field_type || (!previous.required && current.required)
            }
            _ => false,
        }
    }

    fn note(&self) -> String {
        let id = &self.field_id;
        match (self.change_type, &self.previous, &self.current) {
            (ChangeType::Added, _, Some(current)) if current.required => {
                format!("Required field '{}' added; existing data has no value for it", id)
            }
            (ChangeType::Added, _, _) => format!("Field '{}' added", id),
            (ChangeType::Removed, _, _) => format!("Field '{}' removed; its values are dropped", id),
            (ChangeType::Modified, Some(previous), Some(current))
                if previous.field_type != current.field_type =>
            {
                format!(
                    "Field '{}' changed from {} to {}; values are converted",
                    id, previous.field_type, current.field_type
                )
            }
            (ChangeType::Modified, Some(previous), Some(current))
                if !previous.required && current.required =>
            {
                format!("Field '{}' is now required", id)
            }
            (ChangeType::Modified, _, _) => format!("Field '{}' updated", id),
        }
    }
}

/// Differences between two versions of one form type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDiff {
    pub form_type: String,
    pub from_version: VersionNumber,
    pub to_version: VersionNumber,
    pub changes: Vec<FieldChange>,

    /// Set across a major version change or when any change is breaking
    #[serde(default)]
    pub breaking_changes: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub migration_notes: Vec<String>,
}

/// An entry carried from one version to another
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigratedEntry {
    pub entry: Entry,

    /// Field id to the reason its value was not carried over
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub dropped: BTreeMap<String, String>,
}

impl MigratedEntry {
    /// Whether every value survived
    pub fn is_lossless(&self) -> bool {
        self.dropped.is_empty()
    }
}

impl VersionDiff {
    /// Diff two field lists and derive the breaking flag and notes
    pub fn between(
        form_type: impl Into<String>,
        from_version: VersionNumber,
        to_version: VersionNumber,
        old: &[FieldDescriptor],
        new: &[FieldDescriptor],
    ) -> Self {
        let changes = diff_fields(old, new);
        let major_change = from_version.major != to_version.major;

        let mut migration_notes = Vec::new();
        if major_change {
            migration_notes.push(format!(
                "Major version change from {} to {}",
                from_version, to_version
            ));
        }
        migration_notes.extend(changes.iter().map(FieldChange::note));

        Self {
            form_type: form_type.into(),
            from_version,
            to_version,
            breaking_changes: major_change || changes.iter().any(FieldChange::is_breaking),
            changes,
            migration_notes,
        }
    }

    /// Carry an entry keyed by `field_id` across this change
    ///
    /// Values of removed fields are dropped, values of fields whose type
    /// changed are converted to the new type, everything else passes through
    /// untouched. A value that cannot be converted is dropped and reported.
    pub fn migrate_entry(&self, entry: &Entry) -> MigratedEntry {
        let mut migrated = MigratedEntry {
            entry: entry.clone(),
            dropped: BTreeMap::new(),
        };

        for change in &self.changes {
            let Some(value) = migrated.entry.remove(&change.field_id) else {
                continue;
            };

            match (change.change_type, &change.current) {
                (ChangeType::Removed, _) => {
                    migrated
                        .dropped
                        .insert(change.field_id.clone(), "field removed".to_string());
                }
                (_, Some(current)) => match value.coerce(current.field_type) {
                    Ok(value) => {
                        migrated.entry.insert(change.field_id.clone(), value);
                    }
                    Err(e) => {
                        migrated.dropped.insert(change.field_id.clone(), e.to_string());
                    }
                },
                (_, None) => {
                    migrated.entry.insert(change.field_id.clone(), value);
                }
            }
        }

        migrated
    }

    /// Whether the two versions have identical fields
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changes of one kind
    pub fn count(&self, change_type: ChangeType) -> usize {
        self.changes
            .iter()
            .filter(|c| c.change_type == change_type)
            .count()
    }
}

/// Compare two field lists by `field_id`
///
/// Changes follow the order of `new` for added and modified fields, then the
/// order of `old` for removed ones.
pub fn diff_fields(old: &[FieldDescriptor], new: &[FieldDescriptor]) -> Vec<FieldChange> {
    let old_by_id: HashMap<&str, &FieldDescriptor> =
        old.iter().map(|f| (f.field_id.as_str(), f)).collect();
    let new_by_id: HashMap<&str, &FieldDescriptor> =
        new.iter().map(|f| (f.field_id.as_str(), f)).collect();

    let mut changes = Vec::new();

    for field in new {
        match old_by_id.get(field.field_id.as_str()) {
            None => changes.push(FieldChange {
                field_id: field.field_id.clone(),
                change_type: ChangeType::Added,
                previous: None,
                current: Some(field.clone()),
            }),
            Some(previous) if *previous != field => changes.push(FieldChange {
                field_id: field.field_id.clone(),
                change_type: ChangeType::Modified,
                previous: Some((*previous).clone()),
                current: Some(field.clone()),
            }),
            Some(_) => {}
        }
    }

    for field in old {
        if !new_by_id.contains_key(field.field_id.as_str()) {
            changes.push(FieldChange {
                field_id: field.field_id.clone(),
                change_type: ChangeType::Removed,
                previous: Some(field.clone()),
                current: None,
            });
        }
    }

    changes
}
