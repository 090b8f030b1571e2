//! Workbook commands: `export`, `activities`, `match-report`, `lcia-report`.

use std::path::{Path, PathBuf};

use lcigrid_config::Settings;
use lcigrid_io::reports::{
    write_lci_activities, write_lci_matching, write_lcia_matching, write_report_file,
    MatchingMethod, MatchingRecord, ACTIVITIES_PREFIX, DB_MATCHING_PREFIX, LCIA_MATCHING_PREFIX,
};
use lcigrid_io::{lci_matrices_to_excel, LciBundle, MetadataStore};
use serde::de::DeserializeOwned;

use crate::exit_codes::EXIT_EXPORT_LOAD;
use crate::CliError;

fn output_dir(settings: &Settings, output: Option<PathBuf>) -> Result<PathBuf, CliError> {
    match output {
        Some(dir) => {
            std::fs::create_dir_all(&dir).map_err(|e| {
                CliError::args(format!("cannot create {}: {e}", dir.display()))
            })?;
            Ok(dir)
        }
        None => settings.export_dir().map_err(CliError::settings),
    }
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CliError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        CliError::new(EXIT_EXPORT_LOAD, format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        CliError::new(EXIT_EXPORT_LOAD, format!("{}: invalid JSON: {e}", path.display()))
    })
}

// ============================================================================
// export
// ============================================================================

pub fn cmd_export(
    settings: &Settings,
    bundle: PathBuf,
    store: PathBuf,
    database: String,
    include_descendants: bool,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let bundle = LciBundle::load(&bundle).map_err(CliError::load)?;
    let store = MetadataStore::load(&store).map_err(CliError::load)?;
    let dir = output_dir(settings, output)?;

    let report = lci_matrices_to_excel(&bundle, &store, &database, include_descendants, &dir)
        .map_err(CliError::export)?;

    if json {
        let out = serde_json::to_string_pretty(&report)
            .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;
        println!("{out}");
    }

    eprintln!(
        "exported '{}': {} activities, {} products, {} biosphere flows ({} pruned), {} cells",
        database,
        report.activities,
        report.products,
        report.biosphere_flows,
        report.pruned_flows,
        report.cells_written,
    );
    if report.skipped_entries > 0 {
        eprintln!(
            "note: {} matrix entries outside the exported activities were skipped",
            report.skipped_entries
        );
    }
    if let Some(path) = &report.path {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

// ============================================================================
// Reports
// ============================================================================

pub fn cmd_activities(
    settings: &Settings,
    store: PathBuf,
    database: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let store = MetadataStore::load(&store).map_err(CliError::load)?;
    let dir = output_dir(settings, output)?;

    let mut count = 0;
    let path = write_report_file(&dir, ACTIVITIES_PREFIX, &database, |sink| {
        count = write_lci_activities(sink, &store, &database)?;
        Ok(count)
    })
    .map_err(CliError::export)?;

    eprintln!("{count} activities");
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_match_report(
    settings: &Settings,
    input: PathBuf,
    name: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let records: Vec<MatchingRecord> = read_records(&input)?;
    let dir = output_dir(settings, output)?;

    let path = write_report_file(&dir, DB_MATCHING_PREFIX, &name, |sink| {
        write_lci_matching(sink, &records)
    })
    .map_err(CliError::export)?;

    let (matched, total) = records
        .iter()
        .flat_map(|ds| &ds.exchanges)
        .fold((0, 0), |(m, t), exc| (m + usize::from(exc.is_matched()), t + 1));
    eprintln!("{} datasets, {matched} of {total} exchanges linked", records.len());
    eprintln!("wrote {}", path.display());
    Ok(())
}

pub fn cmd_lcia_report(
    settings: &Settings,
    input: PathBuf,
    name: String,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let methods: Vec<MatchingMethod> = read_records(&input)?;
    let dir = output_dir(settings, output)?;

    let path = write_report_file(&dir, LCIA_MATCHING_PREFIX, &name, |sink| {
        write_lcia_matching(sink, &methods)
    })
    .map_err(CliError::export)?;

    eprintln!("{} methods", methods.len());
    eprintln!("wrote {}", path.display());
    Ok(())
}
