use serde::Deserialize;

use crate::error::ReconError;
use crate::import::DEFAULT_DB_NAME;
use crate::migration::EXIOBASE_ECOINVENT_MIGRATION;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One import run, usually stored as `*.import.toml` next to its inputs.
/// Relative paths resolve against the config file's directory.
#[derive(Debug, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Directory holding `datapackage.json`.
    pub source: String,
    pub registry: RegistryConfig,
    #[serde(default)]
    pub migration: MigrationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_db_name() -> String {
    DEFAULT_DB_NAME.to_string()
}

// ---------------------------------------------------------------------------
// Registry + migration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// JSON file with the reference flow list.
    pub file: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "biosphere3".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationConfig {
    #[serde(default = "default_migration")]
    pub name: String,
    /// Directory of stored rule sets. Falls back to the user settings.
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_migration() -> String {
    EXIOBASE_ECOINVENT_MIGRATION.to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            name: default_migration(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ImportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ImportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.db_name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("db_name must not be empty".into()));
        }

        if self.registry.namespace.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "registry.namespace must not be empty".into(),
            ));
        }

        // Migration names double as file stems in the rule store
        let name = &self.migration.name;
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(ReconError::ConfigValidation(format!(
                "invalid migration name '{name}'"
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source = "exiobase"

[registry]
file = "biosphere3.json"
"#;

    #[test]
    fn parse_minimal_uses_defaults() {
        let config = ImportConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.db_name, "EXIOBASE 3.3.17 hybrid");
        assert_eq!(config.source, "exiobase");
        assert_eq!(config.registry.namespace, "biosphere3");
        assert_eq!(config.migration.name, "exiobase-3-ecoinvent-3.6");
        assert!(config.migration.dir.is_none());
        assert!(config.output.dir.is_none());
    }

    #[test]
    fn parse_full() {
        let input = r#"
db_name = "EXIOBASE 3.8 hybrid"
source = "data/exio38"

[registry]
file = "flows.json"
namespace = "ecoinvent-3.9-biosphere"

[migration]
name = "exiobase-3-ecoinvent-3.9"
dir = "migrations"

[output]
dir = "out"
"#;
        let config = ImportConfig::from_toml(input).unwrap();
        assert_eq!(config.db_name, "EXIOBASE 3.8 hybrid");
        assert_eq!(config.registry.namespace, "ecoinvent-3.9-biosphere");
        assert_eq!(config.migration.dir.as_deref(), Some("migrations"));
        assert_eq!(config.output.dir.as_deref(), Some("out"));
    }

    #[test]
    fn reject_empty_db_name() {
        let input = format!("db_name = \"  \"\n{MINIMAL}");
        let err = ImportConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("db_name"));
    }

    #[test]
    fn reject_path_like_migration_name() {
        let input = format!("{MINIMAL}\n[migration]\nname = \"../secrets\"\n");
        let err = ImportConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("invalid migration name"));
    }

    #[test]
    fn reject_missing_registry() {
        let err = ImportConfig::from_toml("source = \"x\"\n").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }
}
