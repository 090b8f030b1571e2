//! Source extension flow → canonical flow resolution.
//!
//! Two joins, both lossy:
//!
//! 1. source `(name, compartment)` against the [`MigrationTable`]. A source
//!    flow with no rule is dropped entirely.
//! 2. each rule descriptor against the [`CanonicalRegistry`]. A descriptor
//!    with no canonical flow is dropped on its own; its siblings survive.
//!
//! Neither drop is an error. Both are counted in [`ReconSummary`] and logged
//! at debug level.

use std::collections::{HashMap, HashSet};

use lcigrid_core::{Categories, Key};
use serde::Serialize;

use crate::migration::MigrationTable;
use crate::registry::CanonicalRegistry;
use crate::source::MetadataRecord;

/// Source-side identity of an extension flow, exactly as the numeric table
/// refers to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourceFlowKey {
    pub name: String,
    pub compartment: Option<String>,
}

impl SourceFlowKey {
    pub fn new(name: impl Into<String>, compartment: Option<&str>) -> Self {
        Self {
            name: name.into(),
            compartment: compartment.map(str::to_string),
        }
    }

    pub fn of(record: &MetadataRecord) -> Self {
        Self::new(record.name.as_str(), record.compartment())
    }

    /// The flow record handed to the migration step: categories are the
    /// compartment, or empty.
    pub fn categories(&self) -> Categories {
        Categories::from_compartment(self.compartment.as_deref())
    }
}

/// Drop accounting for one reconciliation build.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    /// Distinct source extension flows seen in metadata.
    pub source_flows: usize,
    /// Source flows with no migration rule (excluded entirely).
    pub unmigrated: usize,
    /// Descriptors produced by matching rules.
    pub descriptors: usize,
    /// Descriptors with no canonical registry match (excluded individually).
    pub unmatched_descriptors: usize,
    /// Surviving `(canonical flow, scale)` links.
    pub links: usize,
    /// Source flows whose every descriptor was unmatched.
    pub emptied: usize,
}

/// `source flow → [(canonical flow, scale)]`.
///
/// Only flows with at least one surviving link have an entry. Flows without
/// a migration rule, and flows whose descriptors all missed the registry, are
/// absent and emit nothing.
#[derive(Debug, Default)]
pub struct Reconciliation {
    entries: HashMap<SourceFlowKey, Vec<(Key, f64)>>,
    summary: ReconSummary,
}

impl Reconciliation {
    pub fn build(
        extensions: &[MetadataRecord],
        migrations: &MigrationTable,
        registry: &CanonicalRegistry,
    ) -> Self {
        let mut reconciliation = Self::default();
        let mut seen = HashSet::new();

        for record in extensions {
            let key = SourceFlowKey::of(record);
            if !seen.insert(key.clone()) {
                continue;
            }
            reconciliation.summary.source_flows += 1;

            let categories = key.categories();
            let Some(rule) = migrations.get(&key.name, &categories) else {
                tracing::debug!(name = %key.name, categories = %categories, "no migration rule");
                reconciliation.summary.unmigrated += 1;
                continue;
            };

            let mut links = Vec::with_capacity(rule.len());
            for target in rule {
                reconciliation.summary.descriptors += 1;
                match registry.lookup(&target.name, &target.categories) {
                    Some(canonical) => links.push((canonical.clone(), target.amount)),
                    None => {
                        tracing::debug!(
                            source = %key.name,
                            target = %target.name,
                            categories = %target.categories,
                            "no canonical flow for descriptor"
                        );
                        reconciliation.summary.unmatched_descriptors += 1;
                    }
                }
            }

            if links.is_empty() {
                reconciliation.summary.emptied += 1;
                continue;
            }
            reconciliation.summary.links += links.len();
            reconciliation.entries.insert(key, links);
        }

        tracing::info!(
            source_flows = reconciliation.summary.source_flows,
            unmigrated = reconciliation.summary.unmigrated,
            unmatched = reconciliation.summary.unmatched_descriptors,
            links = reconciliation.summary.links,
            "reconciled extension flows"
        );
        reconciliation
    }

    pub fn get(&self, key: &SourceFlowKey) -> Option<&[(Key, f64)]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Links for the flow a metadata row refers to; empty when unmapped.
    pub fn links_for(&self, record: &MetadataRecord) -> &[(Key, f64)] {
        self.get(&SourceFlowKey::of(record)).unwrap_or(&[])
    }

    pub fn contains(&self, key: &SourceFlowKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn summary(&self) -> &ReconSummary {
        &self.summary
    }
}
