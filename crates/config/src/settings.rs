// User settings
// Loaded from ~/.config/lcigrid/settings.toml

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {message}")]
    Read { path: String, message: String },
    #[error("error parsing {path}: {message}")]
    Parse { path: String, message: String },
    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
    #[error("invalid directory name '{0}'")]
    BadDirName(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root for everything lcigrid writes. Defaults to the platform data dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Workbook output. Defaults to `<data_dir>/export`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// Stored migration rule sets. Defaults to `<data_dir>/migrations`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations_dir: Option<PathBuf>,

    pub default_migration: String,

    pub biosphere_namespace: String,

    pub default_database: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            export_dir: None,
            migrations_dir: None,
            default_migration: "exiobase-3-ecoinvent-3.6".to_string(),
            biosphere_namespace: "biosphere3".to_string(),
            default_database: "EXIOBASE 3.3.17 hybrid".to_string(),
        }
    }
}

const DEFAULT_FILE: &str = r#"# lcigrid settings

# Where exports and stored rule sets live (default: platform data dir)
# data_dir = "/path/to/lcigrid"
# export_dir = "/path/to/exports"
# migrations_dir = "/path/to/migrations"

# Migration rule set applied to extension flows on import
default_migration = "exiobase-3-ecoinvent-3.6"

# Namespace of the canonical biosphere flow list
biosphere_namespace = "biosphere3"

# Database name used when importing without --db-name
default_database = "EXIOBASE 3.3.17 hybrid"
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lcigrid")
            .join("settings.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    /// Load settings from disk, falling back to defaults.
    ///
    /// A missing file is created with commented defaults. A broken file is
    /// reported and ignored.
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml(&contents).map_err(|e| SettingsError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_error = |message: String| SettingsError::Write {
            path: path.display().to_string(),
            message,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
        let text = toml::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?;
        fs::write(path, text).map_err(|e| write_error(e.to_string()))
    }

    fn create_default_file(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::warn!("cannot create config directory: {e}");
                return;
            }
        }
        if let Err(e) = fs::write(path, DEFAULT_FILE) {
            tracing::warn!("cannot write default settings.toml: {e}");
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("lcigrid")
        })
    }

    /// `<data_dir>/<name>`, created if missing.
    pub fn request_dir(&self, name: &str) -> Result<PathBuf, SettingsError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(SettingsError::BadDirName(name.to_string()));
        }
        let dir = self.data_dir().join(name);
        fs::create_dir_all(&dir).map_err(|e| SettingsError::Write {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(dir)
    }

    pub fn export_dir(&self) -> Result<PathBuf, SettingsError> {
        match &self.export_dir {
            Some(dir) => {
                fs::create_dir_all(dir).map_err(|e| SettingsError::Write {
                    path: dir.display().to_string(),
                    message: e.to_string(),
                })?;
                Ok(dir.clone())
            }
            None => self.request_dir("export"),
        }
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.migrations_dir
            .clone()
            .unwrap_or_else(|| self.data_dir().join("migrations"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_file_parses_to_defaults() {
        let settings = Settings::from_toml(DEFAULT_FILE).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml("biosphere_namespace = \"ecoinvent-3.9\"\n").unwrap();
        assert_eq!(settings.biosphere_namespace, "ecoinvent-3.9");
        assert_eq!(settings.default_migration, "exiobase-3-ecoinvent-3.6");
    }

    #[test]
    fn request_dir_creates_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: Some(tmp.path().to_path_buf()),
            ..Settings::default()
        };
        let dir = settings.request_dir("export").unwrap();
        assert_eq!(dir, tmp.path().join("export"));
        assert!(dir.is_dir());
        assert_eq!(settings.export_dir().unwrap(), dir);
        assert_eq!(settings.migrations_dir(), tmp.path().join("migrations"));
    }

    #[test]
    fn request_dir_rejects_paths() {
        let settings = Settings::default();
        assert!(matches!(settings.request_dir("../x"), Err(SettingsError::BadDirName(_))));
        assert!(matches!(settings.request_dir(""), Err(SettingsError::BadDirName(_))));
    }

    #[test]
    fn save_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("settings.toml");
        let settings = Settings {
            export_dir: Some(tmp.path().join("out")),
            default_database: "EXIOBASE 3.8".to_string(),
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn broken_file_is_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("settings.toml");
        fs::write(&path, "default_migration = [").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(SettingsError::Parse { .. })));
    }
}
