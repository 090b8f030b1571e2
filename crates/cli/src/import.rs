//! `lcigrid import` and `lcigrid migrations`.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use lcigrid_config::Settings;
use lcigrid_core::ExchangeKind;
use lcigrid_io::store::load_registry;
use lcigrid_io::{safe_filename, DataPackage, MetadataStore, MigrationDir};
use lcigrid_recon::import::ImportMeta;
use lcigrid_recon::{ImportConfig, ImportRun, Importer, MigrationTable, ReconSummary};
use serde::Serialize;

use crate::exit_codes::{EXIT_IMPORT_REGISTRY, EXIT_IMPORT_WRITE};
use crate::CliError;

pub const DATASETS_FILE: &str = "datasets.json";
pub const EXCHANGES_FILE: &str = "exchanges.jsonl";
pub const REPORT_FILE: &str = "import.json";

/// Flag values; each one overrides the config file.
pub struct ImportArgs {
    pub config_file: Option<PathBuf>,
    pub source: Option<PathBuf>,
    pub registry: Option<PathBuf>,
    pub namespace: Option<String>,
    pub db_name: Option<String>,
    pub migration: Option<String>,
    pub migrations_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug)]
struct ResolvedImport {
    db_name: String,
    source: PathBuf,
    registry: PathBuf,
    namespace: String,
    migration: String,
    migrations_dir: PathBuf,
    output: PathBuf,
}

#[derive(Debug, Default, Serialize)]
struct ExchangeCounts {
    production: usize,
    technosphere: usize,
    biosphere: usize,
}

impl ExchangeCounts {
    fn add(&mut self, kind: ExchangeKind) {
        match kind {
            ExchangeKind::Production => self.production += 1,
            ExchangeKind::Technosphere => self.technosphere += 1,
            ExchangeKind::Biosphere => self.biosphere += 1,
        }
    }
}

#[derive(Serialize)]
struct ImportReport<'a> {
    meta: &'a ImportMeta,
    summary: &'a ReconSummary,
    datasets: usize,
    exchanges: &'a ExchangeCounts,
    output: String,
}

// ============================================================================
// Argument resolution
// ============================================================================

/// Flags, then the config file (paths relative to its directory), then settings.
fn resolve(settings: &Settings, args: ImportArgs) -> Result<ResolvedImport, CliError> {
    let config = match &args.config_file {
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| CliError::args(format!("cannot read {}: {e}", path.display())))?;
            let config = ImportConfig::from_toml(&text).map_err(CliError::recon)?;
            let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            Some((config, base))
        }
        None => None,
    };
    let relative = |p: &str| -> PathBuf {
        match &config {
            Some((_, base)) => base.join(p),
            None => PathBuf::from(p),
        }
    };

    let source = args
        .source
        .or_else(|| config.as_ref().map(|(c, _)| relative(c.source.as_str())))
        .ok_or_else(|| {
            CliError::args("no datapackage given")
                .with_hint("pass --source <dir> or an import config file")
        })?;
    let registry = args
        .registry
        .or_else(|| config.as_ref().map(|(c, _)| relative(c.registry.file.as_str())))
        .ok_or_else(|| {
            CliError::args("no canonical flow list given")
                .with_hint("pass --registry <file.json> or an import config file")
        })?;
    let namespace = args
        .namespace
        .or_else(|| config.as_ref().map(|(c, _)| c.registry.namespace.clone()))
        .unwrap_or_else(|| settings.biosphere_namespace.clone());
    let db_name = args
        .db_name
        .or_else(|| config.as_ref().map(|(c, _)| c.db_name.clone()))
        .unwrap_or_else(|| settings.default_database.clone());
    let migration = args
        .migration
        .or_else(|| config.as_ref().map(|(c, _)| c.migration.name.clone()))
        .unwrap_or_else(|| settings.default_migration.clone());
    let migrations_dir = args
        .migrations_dir
        .or_else(|| {
            config
                .as_ref()
                .and_then(|(c, _)| c.migration.dir.as_deref().map(|d| relative(d)))
        })
        .unwrap_or_else(|| settings.migrations_dir());

    if db_name.trim().is_empty() {
        return Err(CliError::args("database name must not be empty"));
    }

    let output = match args
        .output
        .or_else(|| config.as_ref().and_then(|(c, _)| c.output.dir.as_deref().map(|d| relative(d))))
    {
        Some(dir) => dir,
        None => settings
            .request_dir("imports")
            .map_err(CliError::settings)?
            .join(safe_filename(&db_name)),
    };

    Ok(ResolvedImport {
        db_name,
        source,
        registry,
        namespace,
        migration,
        migrations_dir,
        output,
    })
}

// ============================================================================
// import
// ============================================================================

pub fn cmd_import(settings: &Settings, args: ImportArgs, json: bool) -> Result<(), CliError> {
    let resolved = resolve(settings, args)?;
    tracing::debug!(?resolved, "resolved import");

    let package = DataPackage::open(&resolved.source).map_err(CliError::source)?;
    let rule_store = MigrationDir::new(&resolved.migrations_dir);
    let migrations =
        MigrationTable::load(&rule_store, &resolved.migration).map_err(CliError::migration)?;
    let registry = load_registry(&resolved.registry, &resolved.namespace)
        .map_err(|e| CliError::new(EXIT_IMPORT_REGISTRY, e.to_string()))?;

    let importer = Importer::new(&package, resolved.db_name.as_str(), &migrations, &registry);
    let ImportRun {
        meta,
        summary,
        datasets,
        exchanges,
    } = importer.run().map_err(CliError::source)?;

    let out = &resolved.output;
    fs::create_dir_all(out).map_err(|e| write_error(out, e))?;

    let dataset_count = datasets.len();
    let mut store = MetadataStore::new();
    store.add_database(resolved.db_name.as_str());
    for (key, dataset) in datasets {
        store.insert(key, dataset);
    }
    store
        .save(&out.join(DATASETS_FILE))
        .map_err(|e| CliError::new(EXIT_IMPORT_WRITE, e.to_string()))?;

    // Drain the exchange stream straight to disk, one JSON object per line
    let exchanges_path = out.join(EXCHANGES_FILE);
    let file = File::create(&exchanges_path).map_err(|e| write_error(&exchanges_path, e))?;
    let mut writer = BufWriter::new(file);
    let mut counts = ExchangeCounts::default();
    for exchange in exchanges {
        let exchange = exchange.map_err(CliError::source)?;
        serde_json::to_writer(&mut writer, &exchange)
            .map_err(|e| CliError::new(EXIT_IMPORT_WRITE, e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| write_error(&exchanges_path, e))?;
        counts.add(exchange.kind);
    }
    writer.flush().map_err(|e| write_error(&exchanges_path, e))?;

    let report = ImportReport {
        meta: &meta,
        summary: &summary,
        datasets: dataset_count,
        exchanges: &counts,
        output: out.display().to_string(),
    };
    let report_json = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
    let report_path = out.join(REPORT_FILE);
    fs::write(&report_path, &report_json).map_err(|e| write_error(&report_path, e))?;

    if json {
        println!("{report_json}");
    }

    eprintln!(
        "imported '{}': {} datasets, {} production, {} technosphere, {} biosphere exchanges",
        meta.db_name, dataset_count, counts.production, counts.technosphere, counts.biosphere,
    );
    eprintln!(
        "extension flows: {} seen, {} without migration, {} of {} descriptors unmatched, {} emptied",
        summary.source_flows,
        summary.unmigrated,
        summary.unmatched_descriptors,
        summary.descriptors,
        summary.emptied,
    );
    eprintln!("wrote {}", out.display());
    Ok(())
}

fn write_error(path: &Path, err: std::io::Error) -> CliError {
    CliError::new(EXIT_IMPORT_WRITE, format!("cannot write {}: {err}", path.display()))
}

// ============================================================================
// migrations
// ============================================================================

pub fn cmd_migrations(settings: &Settings, dir: Option<PathBuf>) -> Result<(), CliError> {
    let dir = dir.unwrap_or_else(|| settings.migrations_dir());
    let store = MigrationDir::new(&dir);
    let names = store.list().map_err(CliError::migration)?;
    if names.is_empty() {
        eprintln!("no migrations in {}", dir.display());
    }
    for name in names {
        println!("{name}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> ImportArgs {
        ImportArgs {
            config_file: None,
            source: None,
            registry: None,
            namespace: None,
            db_name: None,
            migration: None,
            migrations_dir: None,
            output: None,
        }
    }

    #[test]
    fn config_paths_resolve_against_config_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = tmp.path().join("exio.import.toml");
        fs::write(
            &config,
            r#"
source = "exiobase"

[registry]
file = "flows/biosphere3.json"

[migration]
dir = "rules"

[output]
dir = "out"
"#,
        )
        .unwrap();

        let args = ImportArgs {
            config_file: Some(config),
            db_name: Some("EXIOBASE 3.8 hybrid".into()),
            ..empty_args()
        };
        let resolved = resolve(&Settings::default(), args).unwrap();
        assert_eq!(resolved.source, tmp.path().join("exiobase"));
        assert_eq!(resolved.registry, tmp.path().join("flows/biosphere3.json"));
        assert_eq!(resolved.migrations_dir, tmp.path().join("rules"));
        assert_eq!(resolved.output, tmp.path().join("out"));
        assert_eq!(resolved.db_name, "EXIOBASE 3.8 hybrid");
        assert_eq!(resolved.migration, "exiobase-3-ecoinvent-3.6");
    }

    #[test]
    fn flags_fall_back_to_settings() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            data_dir: Some(tmp.path().to_path_buf()),
            biosphere_namespace: "ecoinvent-3.9-biosphere".into(),
            ..Settings::default()
        };
        let args = ImportArgs {
            source: Some("pkg".into()),
            registry: Some("flows.json".into()),
            ..empty_args()
        };
        let resolved = resolve(&settings, args).unwrap();
        assert_eq!(resolved.namespace, "ecoinvent-3.9-biosphere");
        assert_eq!(resolved.db_name, "EXIOBASE 3.3.17 hybrid");
        assert_eq!(resolved.migrations_dir, tmp.path().join("migrations"));
        assert_eq!(
            resolved.output,
            tmp.path().join("imports").join("EXIOBASE-3317-hybrid")
        );
    }

    #[test]
    fn missing_source_is_usage_error() {
        let args = ImportArgs {
            registry: Some("flows.json".into()),
            ..empty_args()
        };
        let err = resolve(&Settings::default(), args).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_USAGE);
        assert!(err.hint.is_some());
    }
}
