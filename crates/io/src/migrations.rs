// Migration rule sets stored as `<dir>/<identifier>.json`

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lcigrid_recon::migration::{MigrationData, MigrationStore};
use lcigrid_recon::MigrationError;

#[derive(Debug, Clone)]
pub struct MigrationDir {
    dir: PathBuf,
}

impl MigrationDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, identifier: &str) -> PathBuf {
        self.dir.join(format!("{identifier}.json"))
    }

    /// Identifiers of every stored rule set, sorted.
    pub fn list(&self) -> Result<Vec<String>, MigrationError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MigrationError::Io(format!("{}: {e}", self.dir.display()))),
        };
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl MigrationStore for MigrationDir {
    fn get_migration(&self, identifier: &str) -> Result<MigrationData, MigrationError> {
        let path = self.path_for(identifier);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(MigrationError::NotFound(identifier.to_string()))
            }
            Err(e) => return Err(MigrationError::Io(format!("{}: {e}", path.display()))),
        };
        tracing::debug!(path = %path.display(), "reading migration");
        serde_json::from_str(&text).map_err(|e| MigrationError::Parse {
            id: identifier.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcigrid_core::Categories;
    use lcigrid_recon::MigrationTable;

    #[test]
    fn loads_rules_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("exiobase-3-ecoinvent-3.6.json"),
            r#"{"fields": ["name", "categories"],
                "data": [[["Nitrogen oxides", "air"], {"name": "Nitrogen oxides", "categories": ["air"]}]]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = MigrationDir::new(dir.path());
        assert_eq!(store.list().unwrap(), vec!["exiobase-3-ecoinvent-3.6".to_string()]);

        let table = MigrationTable::load(&store, "exiobase-3-ecoinvent-3.6").unwrap();
        let rule = table.get("Nitrogen oxides", &Categories::new(["air"])).unwrap();
        assert_eq!(rule.len(), 1);
        assert_eq!(rule[0].amount, 1.0);
    }

    #[test]
    fn missing_rule_set_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = MigrationDir::new(dir.path());
        let err = store.get_migration("exiobase-3-ecoinvent-3.6").unwrap_err();
        assert!(matches!(err, MigrationError::NotFound(_)));
    }

    #[test]
    fn malformed_rule_set_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{\"data\": 5}").unwrap();
        let err = MigrationDir::new(dir.path()).get_migration("broken").unwrap_err();
        assert!(matches!(err, MigrationError::Parse { ref id, .. } if id == "broken"));
    }
}
