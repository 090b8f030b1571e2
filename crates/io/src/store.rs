//! JSON-backed read-only stores: the canonical flow list and the dataset
//! metadata store.

use std::collections::BTreeMap;
use std::path::Path;

use lcigrid_core::{Categories, Dataset, Flow, FlowKind, Key};
use lcigrid_recon::CanonicalRegistry;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

pub const DEFAULT_BIOSPHERE_NAMESPACE: &str = "biosphere3";

pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| LoadError::Json {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

// ============================================================================
// Canonical flows
// ============================================================================

#[derive(Debug, Deserialize)]
struct FlowRecord {
    name: String,
    #[serde(default)]
    categories: Categories,
    code: String,
    #[serde(default)]
    unit: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<FlowKind>,
}

impl FlowRecord {
    fn into_flow(self, namespace: &str) -> Flow {
        Flow {
            key: Key::new(namespace, self.code),
            name: self.name,
            categories: self.categories,
            unit: self.unit,
            kind: self.kind.unwrap_or(FlowKind::Biosphere),
        }
    }
}

/// Parse a JSON array of `{name, categories, code, unit?, type?}` records
/// into flows under `namespace`.
pub fn parse_flows(json: &str, namespace: &str) -> Result<Vec<Flow>, serde_json::Error> {
    let records: Vec<FlowRecord> = serde_json::from_str(json)?;
    Ok(records.into_iter().map(|r| r.into_flow(namespace)).collect())
}

pub fn load_flows(path: &Path, namespace: &str) -> Result<Vec<Flow>, LoadError> {
    let records: Vec<FlowRecord> = read_json(path)?;
    Ok(records.into_iter().map(|r| r.into_flow(namespace)).collect())
}

pub fn load_registry(path: &Path, namespace: &str) -> Result<CanonicalRegistry, LoadError> {
    let registry = CanonicalRegistry::build(load_flows(path, namespace)?)?;
    tracing::info!(path = %path.display(), flows = registry.len(), "loaded canonical registry");
    Ok(registry)
}

// ============================================================================
// Metadata store
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawStore {
    databases: BTreeMap<String, Vec<StoredDataset>>,
}

#[derive(Debug, Deserialize)]
struct StoredDataset {
    code: String,
    #[serde(flatten)]
    dataset: Dataset,
}

#[derive(Serialize)]
struct StoreRef<'a> {
    databases: BTreeMap<&'a str, Vec<DatasetRef<'a>>>,
}

#[derive(Serialize)]
struct DatasetRef<'a> {
    code: &'a str,
    #[serde(flatten)]
    dataset: &'a Dataset,
}

/// Dataset records grouped by database, addressed by `(database, code)`.
#[derive(Debug, Default)]
pub struct MetadataStore {
    databases: BTreeMap<String, BTreeMap<String, Dataset>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawStore = serde_json::from_str(json)?;
        Ok(Self::from_raw(raw))
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let store = Self::from_raw(read_json(path)?);
        tracing::info!(
            path = %path.display(),
            databases = store.databases.len(),
            "loaded metadata store"
        );
        Ok(store)
    }

    /// Same shape [`MetadataStore::from_json`] reads.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let databases = self
            .databases
            .iter()
            .map(|(name, records)| {
                let records = records
                    .iter()
                    .map(|(code, dataset)| DatasetRef { code, dataset })
                    .collect();
                (name.as_str(), records)
            })
            .collect();
        serde_json::to_string_pretty(&StoreRef { databases })
    }

    pub fn save(&self, path: &Path) -> Result<(), LoadError> {
        let write_error = |message: String| LoadError::Write {
            path: path.display().to_string(),
            message,
        };
        let json = self.to_json().map_err(|e| write_error(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| write_error(e.to_string()))
    }

    fn from_raw(raw: RawStore) -> Self {
        let databases = raw
            .databases
            .into_iter()
            .map(|(name, records)| {
                let records = records.into_iter().map(|r| (r.code, r.dataset)).collect();
                (name, records)
            })
            .collect();
        Self { databases }
    }

    /// Register a database, even an empty one.
    pub fn add_database(&mut self, name: impl Into<String>) {
        self.databases.entry(name.into()).or_default();
    }

    pub fn insert(&mut self, key: Key, dataset: Dataset) {
        self.databases
            .entry(key.namespace)
            .or_default()
            .insert(key.local_id, dataset);
    }

    pub fn contains(&self, database: &str) -> bool {
        self.databases.contains_key(database)
    }

    pub fn databases(&self) -> impl Iterator<Item = &str> + '_ {
        self.databases.keys().map(String::as_str)
    }

    pub fn get(&self, key: &Key) -> Option<&Dataset> {
        self.databases.get(&key.namespace)?.get(&key.local_id)
    }

    /// Display name, if the dataset exists and has one.
    pub fn name_of(&self, key: &Key) -> Option<String> {
        self.get(key)?.name.clone()
    }

    /// Every dataset of `database` in code order, or `None` if the database
    /// does not exist.
    pub fn datasets<'a>(
        &'a self,
        database: &'a str,
    ) -> Option<impl Iterator<Item = (Key, &'a Dataset)> + 'a> {
        let records = self.databases.get(database)?;
        Some(
            records
                .iter()
                .map(move |(code, ds)| (Key::new(database, code.as_str()), ds)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flows_default_to_biosphere_kind() {
        let flows = parse_flows(
            r#"[{"name": "Lead", "categories": ["water"], "code": "pb", "unit": "kilogram"},
                {"name": "Ammonia", "categories": "air", "code": "nh3", "type": "emission"}]"#,
            DEFAULT_BIOSPHERE_NAMESPACE,
        )
        .unwrap();
        assert_eq!(flows[0].key, Key::new("biosphere3", "pb"));
        assert_eq!(flows[0].kind, FlowKind::Biosphere);
        assert_eq!(flows[1].categories, Categories::new(["air"]));
        assert_eq!(flows[1].unit, None);
    }

    #[test]
    fn duplicate_flows_fail_registry_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flows.json");
        std::fs::write(
            &path,
            r#"[{"name": "Lead", "categories": ["water"], "code": "a"},
                {"name": "Lead", "categories": ["water"], "code": "b"}]"#,
        )
        .unwrap();
        let err = load_registry(&path, "biosphere3").unwrap_err();
        assert!(matches!(err, LoadError::Registry(_)));
    }

    #[test]
    fn metadata_store_lookup() {
        let store = MetadataStore::from_json(
            r#"{"databases": {
                "ei": [{"code": "a1", "name": "steel production", "reference product": "steel",
                        "unit": "kilogram", "location": "DE"}],
                "biosphere3": [{"code": "co2", "name": "Carbon dioxide", "categories": ["air"],
                                "type": "emission"}],
                "empty": []
            }}"#,
        )
        .unwrap();

        assert!(store.contains("empty"));
        assert!(!store.contains("missing"));
        let ds = store.get(&Key::new("ei", "a1")).unwrap();
        assert_eq!(ds.reference_product.as_deref(), Some("steel"));
        assert_eq!(
            store.name_of(&Key::new("biosphere3", "co2")).as_deref(),
            Some("Carbon dioxide")
        );
        assert_eq!(store.name_of(&Key::new("ei", "zz")), None);
        assert_eq!(store.datasets("ei").unwrap().count(), 1);
        assert!(store.datasets("missing").is_none());
    }

    #[test]
    fn saved_store_loads_back() {
        let mut store = MetadataStore::new();
        store.add_database("empty");
        store.insert(
            Key::new("EXIOBASE", "A_STEEL"),
            Dataset {
                name: Some("Manufacture of basic iron and steel".into()),
                location: Some("DE".into()),
                kind: Some(FlowKind::Process),
                ..Dataset::default()
            },
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        store.save(&path).unwrap();
        let loaded = MetadataStore::load(&path).unwrap();

        assert!(loaded.contains("empty"));
        let ds = loaded.get(&Key::new("EXIOBASE", "A_STEEL")).unwrap();
        assert_eq!(ds.location.as_deref(), Some("DE"));
        assert_eq!(ds.kind, Some(FlowKind::Process));
    }
}
