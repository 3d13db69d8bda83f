//! Repeatable section mapping command

use super::{print_json, read_json};
use anyhow::{Context, Result};
use formschema_core::{Entry, EntryDropped, RepeatableSection};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Resolved field map as printed by `formschema map`
#[derive(Debug, Serialize)]
pub struct MapOutput {
    pub section_id: String,
    /// Physical field name to the string written into the form
    pub fields: BTreeMap<String, String>,
    pub dropped: Vec<EntryDropped>,
}

/// Map the entries file through the section file
pub fn resolve(section: &Path, entries: &Path) -> Result<MapOutput> {
    let section: RepeatableSection = read_json(section)?;
    section
        .validate()
        .with_context(|| format!("Section {} is not valid", section.section_id))?;

    let entries: Vec<Entry> =
        read_json(entries).context("Expected a JSON array of entry objects")?;

    let mapped = section.map_entries(&entries)?;
    if !mapped.is_complete() {
        tracing::warn!(
            section_id = %section.section_id,
            dropped = mapped.dropped.len(),
            "Some entries could not be placed"
        );
    }

    Ok(MapOutput {
        fields: mapped.rendered(),
        section_id: section.section_id,
        dropped: mapped.dropped,
    })
}

/// Run `formschema map`
pub fn run(section: &Path, entries: &Path) -> Result<()> {
    let output = resolve(section, entries)?;
    print_json(&output)
}
