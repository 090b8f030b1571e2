//! Interface to the tidy input-output datapackage.
//!
//! The engine never reads files itself; it pulls metadata tables and numeric
//! observation streams through [`ObservationSource`].

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use serde::Serialize;

use crate::error::SourceError;

// Numeric resources
pub const PRODUCTION_EXCHANGES: &str = "production-exchanges";
pub const EXTENSION_EXCHANGES: &str = "extension-exchanges";
pub const TECHNOSPHERE_EXCHANGES: &str = "hiot";

// Metadata resources
pub const ACTIVITIES: &str = "activities";
pub const PRODUCTS: &str = "products";
pub const EXTENSIONS: &str = "extensions";

/// One row of a metadata table. `id` and `name` are required; every other
/// column is kept verbatim in `fields`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataRecord {
    pub id: String,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

impl MetadataRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Field value, treating an empty cell as absent.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn compartment(&self) -> Option<&str> {
        self.get("compartment")
    }

    pub fn unit(&self) -> Option<&str> {
        self.get("unit")
    }
}

/// A single numeric cell: row entity, column entity, value.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub row: Rc<MetadataRecord>,
    pub col: Rc<MetadataRecord>,
    pub amount: Option<f64>,
}

/// Forward-only cursor over a numeric resource.
pub type Observations = Box<dyn Iterator<Item = Result<Observation, SourceError>>>;

pub trait ObservationSource {
    fn metadata(&self, resource: &str) -> Result<Vec<MetadataRecord>, SourceError>;

    /// Open a numeric resource. Each call opens a fresh cursor.
    fn observations(&self, resource: &str) -> Result<Observations, SourceError>;
}

/// In-memory source, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    metadata: HashMap<String, Vec<MetadataRecord>>,
    numeric: HashMap<String, Vec<Observation>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, resource: &str, records: Vec<MetadataRecord>) -> Self {
        self.metadata.insert(resource.to_string(), records);
        self
    }

    pub fn with_observations(mut self, resource: &str, observations: Vec<Observation>) -> Self {
        self.numeric.insert(resource.to_string(), observations);
        self
    }
}

impl ObservationSource for MemorySource {
    fn metadata(&self, resource: &str) -> Result<Vec<MetadataRecord>, SourceError> {
        self.metadata
            .get(resource)
            .cloned()
            .ok_or_else(|| SourceError::MissingResource(resource.to_string()))
    }

    fn observations(&self, resource: &str) -> Result<Observations, SourceError> {
        let rows = self
            .numeric
            .get(resource)
            .cloned()
            .ok_or_else(|| SourceError::MissingResource(resource.to_string()))?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}
