//! Canonical flow lookup by `(name, categories)`.

use std::collections::HashMap;

use lcigrid_core::{Categories, Flow, Key};

use crate::error::RegistryError;

/// Read-only index over a reference flow collection (e.g. `biosphere3`).
///
/// Built once per import and shared by reference. Matching is exact: the
/// category path is compared as an ordered tuple and there is no fuzzy or
/// prefix fallback. A miss is an ordinary outcome.
#[derive(Debug, Default)]
pub struct CanonicalRegistry {
    by_name: HashMap<String, HashMap<Categories, Key>>,
    len: usize,
}

impl CanonicalRegistry {
    pub fn build(flows: impl IntoIterator<Item = Flow>) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for flow in flows {
            registry.insert(flow)?;
        }
        Ok(registry)
    }

    fn insert(&mut self, flow: Flow) -> Result<(), RegistryError> {
        let by_categories = self.by_name.entry(flow.name.clone()).or_default();
        if let Some(first) = by_categories.get(&flow.categories) {
            return Err(RegistryError::DuplicateFlow {
                name: flow.name,
                categories: flow.categories,
                first: first.clone(),
                second: flow.key,
            });
        }
        by_categories.insert(flow.categories, flow.key);
        self.len += 1;
        Ok(())
    }

    pub fn lookup(&self, name: &str, categories: &Categories) -> Option<&Key> {
        self.by_name.get(name)?.get(categories)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Categories, &Key)> + '_ {
        self.by_name.iter().flat_map(|(name, by_categories)| {
            by_categories
                .iter()
                .map(move |(categories, key)| (name.as_str(), categories, key))
        })
    }
}
