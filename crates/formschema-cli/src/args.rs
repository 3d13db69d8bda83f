//! CLI argument definitions using clap
//!
//! - formschema schema create i485 --fields fields.json
//! - formschema schema release <id>
//! - formschema schema get i485 --version 1.2.0
//! - formschema schema migrate i485 1.0.0 2.0.0 --entry entry.json
//! - formschema map --section section.json --entries entries.json

use clap::{Parser, Subcommand};
use formschema_core::VersionNumber;
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "formschema.toml";

#[derive(Parser)]
#[command(name = "formschema")]
#[command(about = "Versioned form schema registry and repeatable field mapper")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (json, toml or yaml)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage versioned form schemas
    Schema {
        #[command(subcommand)]
        action: SchemaAction,
    },

    /// Resolve repeatable entries onto physical form fields
    Map {
        /// JSON file with the repeatable section definition
        #[arg(long)]
        section: PathBuf,

        /// JSON file with the list of entries
        #[arg(long)]
        entries: PathBuf,
    },
}

#[derive(Subcommand, Clone)]
pub enum SchemaAction {
    /// Create a new draft for a form type
    Create {
        form_type: String,

        /// JSON file with the field descriptors
        #[arg(long)]
        fields: PathBuf,

        /// Start a new major version instead of the next minor
        #[arg(long)]
        major: bool,
    },

    /// Replace the fields of a draft
    Update {
        id: String,

        /// JSON file with the field descriptors
        #[arg(long)]
        fields: PathBuf,
    },

    /// Release a draft
    Release { id: String },

    /// List versions of a form type
    List {
        form_type: String,

        /// Include the current draft
        #[arg(long)]
        drafts: bool,
    },

    /// Show the latest released schema, or an exact version
    Get {
        form_type: String,

        #[arg(long)]
        version: Option<VersionNumber>,
    },

    /// Delete a draft
    Delete { id: String },

    /// Show field changes between two versions
    Diff {
        form_type: String,
        from: VersionNumber,
        to: VersionNumber,
    },

    /// Mark a released version as deprecated
    Deprecate {
        form_type: String,
        version: VersionNumber,
    },

    /// Find the newest non-deprecated version usable in place of another
    Compatible {
        form_type: String,
        version: VersionNumber,
    },

    /// Carry an entry from one version to another
    Migrate {
        form_type: String,
        from: VersionNumber,
        to: VersionNumber,

        /// JSON file with one entry object keyed by field_id
        #[arg(long)]
        entry: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema_get_with_version() {
        let cli = Cli::try_parse_from(["formschema", "schema", "get", "i485", "--version", "1.2.0"])
            .unwrap();

        match cli.command {
            Commands::Schema {
                action: SchemaAction::Get { form_type, version },
            } => {
                assert_eq!(form_type, "i485");
                assert_eq!(version, Some(VersionNumber::new(1, 2, 0)));
            }
            _ => panic!("expected schema get"),
        }
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "formschema",
            "map",
            "--section",
            "s.json",
            "--entries",
            "e.json",
            "--verbose",
            "--config",
            "custom.yaml",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("custom.yaml"));
    }

    #[test]
    fn test_parse_schema_migrate() {
        let cli = Cli::try_parse_from([
            "formschema",
            "schema",
            "migrate",
            "i485",
            "1.0.0",
            "2.0.0",
            "--entry",
            "entry.json",
        ])
        .unwrap();

        match cli.command {
            Commands::Schema {
                action: SchemaAction::Migrate { from, to, entry, .. },
            } => {
                assert_eq!(from, VersionNumber::new(1, 0, 0));
                assert_eq!(to, VersionNumber::new(2, 0, 0));
                assert_eq!(entry, PathBuf::from("entry.json"));
            }
            _ => panic!("expected schema migrate"),
        }
    }

    #[test]
    fn test_invalid_version_rejected() {
        let result = Cli::try_parse_from(["formschema", "schema", "diff", "i485", "1.0", "1.1.0"]);
        assert!(result.is_err());
    }
}
