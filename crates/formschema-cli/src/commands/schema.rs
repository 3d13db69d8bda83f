//! Schema lifecycle commands

use super::{print_json, read_json};
use anyhow::{Context, Result, bail};
use formschema_core::{Entry, FieldDescriptor, VersionBump, VersionNumber, VersionedSchemaService};
use serde_json::json;
use std::path::Path;

fn read_fields(path: &Path) -> Result<Vec<FieldDescriptor>> {
    read_json(path).context("Expected a JSON array of field descriptors")
}

/// Create a new draft
pub async fn create(
    service: &VersionedSchemaService,
    form_type: &str,
    fields: &Path,
    bump: VersionBump,
) -> Result<()> {
    let fields = read_fields(fields)?;
    let draft = service
        .create_schema_with(form_type, fields, bump)
        .await
        .with_context(|| format!("Failed to create draft for {}", form_type))?;
    print_json(&draft)
}

/// Replace the fields of a draft
pub async fn update(service: &VersionedSchemaService, id: &str, fields: &Path) -> Result<()> {
    let fields = read_fields(fields)?;
    let updated = service
        .update_schema_fields(id, fields)
        .await
        .with_context(|| format!("Failed to update schema {}", id))?;
    print_json(&updated)
}

/// Release a draft
pub async fn release(service: &VersionedSchemaService, id: &str) -> Result<()> {
    let released = service
        .release_schema(id)
        .await
        .with_context(|| format!("Failed to release schema {}", id))?;
    print_json(&released)
}

/// List versions of a form type
pub async fn list(
    service: &VersionedSchemaService,
    form_type: &str,
    include_drafts: bool,
) -> Result<()> {
    let docs = service.list_schemas(form_type, include_drafts).await?;
    let summary: Vec<_> = docs
        .iter()
        .map(|doc| {
            json!({
                "id": doc.id,
                "version": doc.version().to_string(),
                "released": doc.schema_version.released,
                "deprecated": doc.schema_version.deprecated,
                "total_fields": doc.total_fields,
            })
        })
        .collect();
    print_json(&summary)
}

/// Show one schema
pub async fn get(
    service: &VersionedSchemaService,
    form_type: &str,
    version: Option<VersionNumber>,
) -> Result<()> {
    match service.get_schema(form_type, version).await? {
        Some(doc) => print_json(&doc),
        None => match version {
            Some(version) => bail!("No schema {} for form type {}", version, form_type),
            None => bail!("No released schema for form type {}", form_type),
        },
    }
}

/// Delete a draft
pub async fn delete(service: &VersionedSchemaService, id: &str) -> Result<()> {
    let deleted = service
        .delete_draft_schema(id)
        .await
        .with_context(|| format!("Failed to delete schema {}", id))?;
    print_json(&json!({ "id": id, "deleted": deleted }))
}

/// Show field changes between two versions
pub async fn diff(
    service: &VersionedSchemaService,
    form_type: &str,
    from: VersionNumber,
    to: VersionNumber,
) -> Result<()> {
    let diff = service.compare_versions(form_type, from, to).await?;
    print_json(&diff)
}

/// Deprecate a released version
pub async fn deprecate(
    service: &VersionedSchemaService,
    form_type: &str,
    version: VersionNumber,
) -> Result<()> {
    let doc = service
        .deprecate_version(form_type, version)
        .await
        .with_context(|| format!("Failed to deprecate {} {}", form_type, version))?;
    print_json(&doc)
}

/// Show the newest version compatible with `version`
pub async fn compatible(
    service: &VersionedSchemaService,
    form_type: &str,
    version: VersionNumber,
) -> Result<()> {
    match service.find_compatible_version(form_type, version).await? {
        Some(doc) => print_json(&json!({
            "id": doc.id,
            "version": doc.version().to_string(),
        })),
        None => bail!("No usable version of {} compatible with {}", form_type, version),
    }
}

/// Carry an entry file across versions
pub async fn migrate(
    service: &VersionedSchemaService,
    form_type: &str,
    from: VersionNumber,
    to: VersionNumber,
    entry: &Path,
) -> Result<()> {
    let entry: Entry = read_json(entry).context("Expected a JSON object keyed by field_id")?;
    let migrated = service.migrate_entry(form_type, from, to, &entry).await?;
    print_json(&migrated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formschema_core::FieldType;
    use tempfile::TempDir;

    #[test]
    fn test_read_fields_accepts_widget_codes() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fields.json");
        std::fs::write(
            &path,
            r#"[
                {"field_id": "family_name", "field_type": "Tx", "field_name": "Family Name", "required": true},
                {"field_id": "is_married", "field_type": "Btn", "field_name": "Married", "required": false}
            ]"#,
        )
        .unwrap();

        let fields = read_fields(&path).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field_type, FieldType::Text);
        assert_eq!(fields[1].field_type, FieldType::Boolean);
    }

    #[test]
    fn test_read_fields_rejects_object() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fields.json");
        std::fs::write(&path, r#"{"field_id": "x"}"#).unwrap();

        assert!(read_fields(&path).is_err());
    }
}
