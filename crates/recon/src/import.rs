use std::collections::BTreeMap;

use lcigrid_core::{Dataset, FlowKind, Key};
use serde::Serialize;

use crate::engine::{Reconciliation, ReconSummary};
use crate::error::SourceError;
use crate::migration::MigrationTable;
use crate::registry::CanonicalRegistry;
use crate::source::{MetadataRecord, ObservationSource, ACTIVITIES, EXTENSIONS, PRODUCTS};
use crate::stream::ExchangeStream;
use crate::units::normalize_unit;

pub const DEFAULT_DB_NAME: &str = "EXIOBASE 3.3.17 hybrid";
pub const EXIOBASE_FORMAT: &str = "Exiobase 3.3.17 hybrid mrio_common_metadata tidy datapackage";

/// Everything an external database writer needs for one import.
pub struct ImportRun {
    pub meta: ImportMeta,
    pub summary: ReconSummary,
    pub datasets: BTreeMap<Key, Dataset>,
    /// One-shot; hand it to the writer and let it drain.
    pub exchanges: ExchangeStream,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportMeta {
    pub db_name: String,
    pub format: String,
    pub engine_version: String,
    pub run_at: String,
}

/// Hybrid input-output table importer.
///
/// Lookup tables are borrowed: they are built once by the caller and stay
/// read-only for the whole run.
pub struct Importer<'a> {
    db_name: String,
    source: &'a dyn ObservationSource,
    migrations: &'a MigrationTable,
    registry: &'a CanonicalRegistry,
}

impl<'a> Importer<'a> {
    pub fn new(
        source: &'a dyn ObservationSource,
        db_name: impl Into<String>,
        migrations: &'a MigrationTable,
        registry: &'a CanonicalRegistry,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            source,
            migrations,
            registry,
        }
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    fn key(&self, record: &MetadataRecord) -> Key {
        Key::new(self.db_name.as_str(), record.id.as_str())
    }

    /// Activities become process datasets. Units are not meaningful for
    /// activities in the hybrid tables.
    pub fn datasets(&self) -> Result<BTreeMap<Key, Dataset>, SourceError> {
        let records = self.source.metadata(ACTIVITIES)?;
        Ok(records
            .iter()
            .map(|record| {
                let dataset = Dataset {
                    name: Some(record.name.clone()),
                    unit: Some("(n/a)".to_string()),
                    location: record.get("location").map(str::to_string),
                    kind: Some(FlowKind::Process),
                    format: Some(EXIOBASE_FORMAT.to_string()),
                    ..Dataset::default()
                };
                (self.key(record), dataset)
            })
            .collect())
    }

    /// Product records with normalized units. Not written as datasets.
    // TODO: include products in `ImportRun::datasets` once the database
    // writer accepts product nodes alongside processes.
    pub fn products(&self) -> Result<BTreeMap<Key, Dataset>, SourceError> {
        let records = self.source.metadata(PRODUCTS)?;
        Ok(records
            .iter()
            .map(|record| {
                let dataset = Dataset {
                    name: Some(record.name.clone()),
                    unit: record.unit().map(|u| normalize_unit(u).to_string()),
                    location: record.get("location").map(str::to_string),
                    kind: Some(FlowKind::Product),
                    format: Some(EXIOBASE_FORMAT.to_string()),
                    ..Dataset::default()
                };
                (self.key(record), dataset)
            })
            .collect())
    }

    pub fn reconcile(&self) -> Result<Reconciliation, SourceError> {
        let extensions = self.source.metadata(EXTENSIONS)?;
        Ok(Reconciliation::build(&extensions, self.migrations, self.registry))
    }

    pub fn exchanges(&self, reconciliation: Reconciliation) -> Result<ExchangeStream, SourceError> {
        ExchangeStream::open(self.source, &self.db_name, reconciliation)
    }

    /// Read metadata, reconcile extensions and open the exchange stream.
    pub fn run(&self) -> Result<ImportRun, SourceError> {
        let datasets = self.datasets()?;
        let reconciliation = self.reconcile()?;
        let summary = reconciliation.summary().clone();
        let exchanges = self.exchanges(reconciliation)?;
        tracing::info!(db = %self.db_name, datasets = datasets.len(), "opened exchange stream");

        Ok(ImportRun {
            meta: ImportMeta {
                db_name: self.db_name.clone(),
                format: EXIOBASE_FORMAT.to_string(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
            },
            summary,
            datasets,
            exchanges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn activities_become_process_datasets() {
        let source = MemorySource::new().with_metadata(
            ACTIVITIES,
            vec![MetadataRecord::new("a1", "Cultivation of paddy rice").with_field("location", "AT")],
        );
        let migrations = MigrationTable::default();
        let registry = CanonicalRegistry::default();
        let importer = Importer::new(&source, DEFAULT_DB_NAME, &migrations, &registry);

        let datasets = importer.datasets().unwrap();
        let ds = &datasets[&Key::new(DEFAULT_DB_NAME, "a1")];
        assert_eq!(ds.name.as_deref(), Some("Cultivation of paddy rice"));
        assert_eq!(ds.unit.as_deref(), Some("(n/a)"));
        assert_eq!(ds.location.as_deref(), Some("AT"));
        assert_eq!(ds.kind, Some(FlowKind::Process));
        assert_eq!(ds.format.as_deref(), Some(EXIOBASE_FORMAT));
    }

    #[test]
    fn product_units_are_normalized() {
        let source = MemorySource::new().with_metadata(
            PRODUCTS,
            vec![
                MetadataRecord::new("p1", "Paddy rice").with_field("unit", "tonnes"),
                MetadataRecord::new("p2", "Electricity").with_field("unit", "TJ"),
                MetadataRecord::new("p3", "Services").with_field("unit", "Meuro"),
            ],
        );
        let migrations = MigrationTable::default();
        let registry = CanonicalRegistry::default();
        let importer = Importer::new(&source, "EXIO", &migrations, &registry);

        let products = importer.products().unwrap();
        let units: Vec<_> = products.values().map(|p| p.unit.clone().unwrap()).collect();
        assert_eq!(units, vec!["ton", "terajoule", "million euro"]);
    }
}
