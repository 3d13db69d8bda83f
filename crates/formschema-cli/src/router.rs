//! Command routing logic for CLI

use crate::args::{Cli, Commands, SchemaAction};
use crate::commands;
use anyhow::Result;
use formschema_core::{RegistryConfig, VersionBump, VersionedSchemaService};

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli, config: RegistryConfig) -> Result<()> {
    match cli.command {
        Commands::Schema { action } => {
            let service = VersionedSchemaService::from_config(&config)?;
            route_schema(&service, action).await
        }
        Commands::Map { section, entries } => commands::map::run(&section, &entries),
    }
}

async fn route_schema(service: &VersionedSchemaService, action: SchemaAction) -> Result<()> {
    match action {
        SchemaAction::Create {
            form_type,
            fields,
            major,
        } => {
            let bump = if major {
                VersionBump::Major
            } else {
                VersionBump::Minor
            };
            commands::schema::create(service, &form_type, &fields, bump).await
        }
        SchemaAction::Update { id, fields } => commands::schema::update(service, &id, &fields).await,
        SchemaAction::Release { id } => commands::schema::release(service, &id).await,
        SchemaAction::List { form_type, drafts } => {
            commands::schema::list(service, &form_type, drafts).await
        }
        SchemaAction::Get { form_type, version } => {
            commands::schema::get(service, &form_type, version).await
        }
        SchemaAction::Delete { id } => commands::schema::delete(service, &id).await,
        SchemaAction::Diff {
            form_type,
            from,
            to,
        } => commands::schema::diff(service, &form_type, from, to).await,
        SchemaAction::Deprecate { form_type, version } => {
            commands::schema::deprecate(service, &form_type, version).await
        }
        SchemaAction::Compatible { form_type, version } => {
            commands::schema::compatible(service, &form_type, version).await
        }
        SchemaAction::Migrate {
            form_type,
            from,
            to,
            entry,
        } => commands::schema::migrate(service, &form_type, from, to, &entry).await,
    }
}
