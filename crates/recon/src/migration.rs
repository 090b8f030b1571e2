//! Disaggregation rules from a source nomenclature to the canonical one.
//!
//! A rule set is a list of `(source, target)` pairs. The source is
//! `[name, categories]`; the target is one descriptor or a list of them. Each
//! descriptor overrides fields of the source flow record (`name`, `categories`,
//! `amount`); whatever it omits is inherited from the source, with the source
//! amount fixed at 1. So `{"amount": 1000}` is a pure unit conversion and
//! `[{"name": "Lead", "categories": "air", "amount": 0.5}, ...]` splits one
//! flow into several.
//!
//! Categories may arrive as a bare string or a list; both are normalized to
//! [`Categories`] here and nowhere else.

use std::collections::HashMap;

use lcigrid_core::Categories;
use serde::Deserialize;

use crate::error::MigrationError;

/// Identifier of the EXIOBASE 3 → ecoinvent 3.6 elementary flow rules.
pub const EXIOBASE_ECOINVENT_MIGRATION: &str = "exiobase-3-ecoinvent-3.6";

/// One normalized target of a rule: `amount` is the disaggregation scale.
#[derive(Debug, Clone, PartialEq)]
pub struct Disaggregation {
    pub name: String,
    pub categories: Categories,
    pub amount: f64,
}

// ---------------------------------------------------------------------------
// Stored form
// ---------------------------------------------------------------------------

/// A rule set as stored, before normalization.
#[derive(Debug, Deserialize)]
pub struct MigrationData {
    #[serde(default)]
    pub fields: Vec<String>,
    pub data: Vec<(RawSource, RawTarget)>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawSource {
    WithCategories((String, Categories)),
    NameOnly((String,)),
}

impl RawSource {
    fn into_parts(self) -> (String, Categories) {
        match self {
            Self::WithCategories((name, categories)) => (name, categories),
            Self::NameOnly((name,)) => (name, Categories::empty()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RawTarget {
    Many(Vec<RawDescriptor>),
    One(RawDescriptor),
}

#[derive(Debug, Default, Deserialize)]
pub struct RawDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Option<Categories>,
    #[serde(default)]
    pub amount: Option<f64>,
}

impl RawDescriptor {
    /// Apply this descriptor on top of the source flow record.
    fn resolve(self, source_name: &str, source_categories: &Categories) -> Disaggregation {
        Disaggregation {
            name: self.name.unwrap_or_else(|| source_name.to_string()),
            categories: self.categories.unwrap_or_else(|| source_categories.clone()),
            amount: self.amount.unwrap_or(1.0),
        }
    }
}

/// Where rule sets are fetched from, by identifier.
pub trait MigrationStore {
    fn get_migration(&self, identifier: &str) -> Result<MigrationData, MigrationError>;
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// Read-only rule lookup keyed by exact `(name, categories)`.
#[derive(Debug, Default)]
pub struct MigrationTable {
    rules: HashMap<String, HashMap<Categories, Vec<Disaggregation>>>,
}

impl MigrationTable {
    /// Fetch and normalize a rule set. A missing rule set is fatal.
    pub fn load(store: &dyn MigrationStore, identifier: &str) -> Result<Self, MigrationError> {
        let data = store.get_migration(identifier)?;
        let table = Self::from_data(data)?;
        tracing::debug!(migration = identifier, rules = table.len(), "loaded migration rules");
        Ok(table)
    }

    pub fn from_data(data: MigrationData) -> Result<Self, MigrationError> {
        let mut table = Self::default();
        for (source, target) in data.data {
            let (name, categories) = source.into_parts();
            let descriptors = match target {
                RawTarget::One(d) => vec![d],
                RawTarget::Many(list) => list,
            };
            if descriptors.is_empty() {
                return Err(MigrationError::EmptyRule { name, categories });
            }
            let resolved = descriptors
                .into_iter()
                .map(|d| d.resolve(&name, &categories))
                .collect();
            // Later rules for the same source replace earlier ones.
            table.rules.entry(name).or_default().insert(categories, resolved);
        }
        Ok(table)
    }

    pub fn get(&self, name: &str, categories: &Categories) -> Option<&[Disaggregation]> {
        self.rules.get(name)?.get(categories).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
