//! Human-review workbooks: activity listings and matching reports.
//!
//! All three share one sheet named `matching` and a bold 12pt header style.
//! Missing fields are written as `(unknown)`; categories are joined with `:`.

use std::path::{Path, PathBuf};

use lcigrid_core::{Categories, Dataset, Key};
use serde::Deserialize;

use crate::error::ExportError;
use crate::paths::xlsx_path;
use crate::sink::{SheetId, SpreadsheetSink, Style, XlsxSink};
use crate::store::MetadataStore;

pub const ACTIVITIES_PREFIX: &str = "activities-";
pub const DB_MATCHING_PREFIX: &str = "db-matching-";
pub const LCIA_MATCHING_PREFIX: &str = "lcia-matching-";

const UNKNOWN: &str = "(unknown)";

/// A dataset or exchange as it stands during linking. `input` is set once the
/// record has been matched to something.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub categories: Option<Categories>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub input: Option<Key>,
    #[serde(default)]
    pub exchanges: Vec<MatchingRecord>,
}

impl MatchingRecord {
    pub fn is_matched(&self) -> bool {
        self.input.is_some()
    }
}

/// An impact assessment method and its characterization factors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchingMethod {
    pub name: Vec<String>,
    #[serde(default)]
    pub exchanges: Vec<MatchingRecord>,
}

fn text(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

fn categories(value: &Option<Categories>) -> String {
    match value {
        Some(c) => c.join(":"),
        None => UNKNOWN.to_string(),
    }
}

fn write_headers(
    sink: &mut dyn SpreadsheetSink,
    sheet: SheetId,
    row: usize,
    columns: &[&str],
) -> Result<(), ExportError> {
    for (index, column) in columns.iter().enumerate() {
        sink.write_string(sheet, row, index, column, Some(Style::header()))?;
    }
    Ok(())
}

fn sorted_by_name(records: &[MatchingRecord]) -> Vec<&MatchingRecord> {
    let mut sorted: Vec<&MatchingRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));
    sorted
}

// ============================================================================
// Activities
// ============================================================================

/// One row per dataset of `database`, sorted by `(name, categories)`.
/// Returns the number of datasets written.
pub fn write_lci_activities(
    sink: &mut dyn SpreadsheetSink,
    store: &MetadataStore,
    database: &str,
) -> Result<usize, ExportError> {
    let mut datasets: Vec<&Dataset> = store
        .datasets(database)
        .ok_or_else(|| ExportError::DatabaseNotFound(database.to_string()))?
        .map(|(_, ds)| ds)
        .collect();
    datasets.sort_by(|a, b| (&a.name, &a.categories).cmp(&(&b.name, &b.categories)));

    let sheet = sink.add_sheet("matching")?;
    for (range, width) in [("A:A", 60.0), ("B:B", 60.0), ("C:C", 12.0), ("D:D", 40.0), ("E:E", 12.0)] {
        sink.set_columns(sheet, range, width)?;
    }
    write_headers(
        sink,
        sheet,
        0,
        &["Name", "Reference product", "Unit", "Categories", "Location"],
    )?;

    for (index, ds) in datasets.iter().enumerate() {
        let row = index + 1;
        let cats = if ds.categories.is_empty() {
            UNKNOWN.to_string()
        } else {
            ds.categories.join(":")
        };
        sink.write_string(sheet, row, 0, text(&ds.name), None)?;
        sink.write_string(sheet, row, 1, text(&ds.reference_product), None)?;
        sink.write_string(sheet, row, 2, text(&ds.unit), None)?;
        sink.write_string(sheet, row, 3, &cats, None)?;
        sink.write_string(sheet, row, 4, text(&ds.location), None)?;
    }
    sink.close()?;
    Ok(datasets.len())
}

// ============================================================================
// Database matching
// ============================================================================

/// Per dataset: a bold dataset row, a header row, its exchanges sorted by
/// name with a `Matched` flag, then a blank row. Returns rows used.
pub fn write_lci_matching(
    sink: &mut dyn SpreadsheetSink,
    datasets: &[MatchingRecord],
) -> Result<usize, ExportError> {
    let sheet = sink.add_sheet("matching")?;
    for (range, width) in [("A:A", 60.0), ("B:B", 12.0), ("C:C", 40.0), ("D:D", 12.0), ("E:E", 12.0)] {
        sink.set_columns(sheet, range, width)?;
    }

    let mut row = 0;
    for ds in datasets {
        sink.write_string(sheet, row, 0, text(&ds.name), Some(Style::header()))?;
        sink.write_string(sheet, row, 1, text(&ds.unit), None)?;
        sink.write_string(sheet, row, 2, &categories(&ds.categories), None)?;
        sink.write_string(sheet, row, 3, text(&ds.location), None)?;
        write_headers(
            sink,
            sheet,
            row + 1,
            &["Name", "Unit", "Categories", "Location", "Type", "Matched"],
        )?;
        row += 2;

        for exc in sorted_by_name(&ds.exchanges) {
            sink.write_string(sheet, row, 0, text(&exc.name), None)?;
            sink.write_string(sheet, row, 1, text(&exc.unit), None)?;
            sink.write_string(sheet, row, 2, &categories(&exc.categories), None)?;
            sink.write_string(sheet, row, 3, text(&exc.location), None)?;
            sink.write_string(sheet, row, 4, text(&exc.kind), None)?;
            sink.write_boolean(sheet, row, 5, exc.is_matched(), None)?;
            row += 1;
        }
        row += 1;
    }
    sink.close()?;
    Ok(row)
}

// ============================================================================
// LCIA matching
// ============================================================================

/// Per method: the name tuple across a bold row, a header row, its CFs
/// sorted by name, then a blank row. Returns rows used.
pub fn write_lcia_matching(
    sink: &mut dyn SpreadsheetSink,
    methods: &[MatchingMethod],
) -> Result<usize, ExportError> {
    let sheet = sink.add_sheet("matching")?;
    for (range, width) in [("A:A", 60.0), ("B:B", 12.0), ("C:C", 40.0)] {
        sink.set_columns(sheet, range, width)?;
    }

    let mut row = 0;
    for method in methods {
        for (index, part) in method.name.iter().enumerate() {
            sink.write_string(sheet, row, index, part, Some(Style::header()))?;
        }
        write_headers(sink, sheet, row + 1, &["Name", "Unit", "Categories", "Matched"])?;
        row += 2;

        for cf in sorted_by_name(&method.exchanges) {
            sink.write_string(sheet, row, 0, text(&cf.name), None)?;
            sink.write_string(sheet, row, 1, text(&cf.unit), None)?;
            sink.write_string(sheet, row, 2, &categories(&cf.categories), None)?;
            sink.write_boolean(sheet, row, 3, cf.is_matched(), None)?;
            row += 1;
        }
        row += 1;
    }
    sink.close()?;
    Ok(row)
}

/// Run `write` against an `.xlsx` file `<dir>/<prefix><safe name>.xlsx`.
pub fn write_report_file<F>(dir: &Path, prefix: &str, name: &str, write: F) -> Result<PathBuf, ExportError>
where
    F: FnOnce(&mut dyn SpreadsheetSink) -> Result<usize, ExportError>,
{
    let path = xlsx_path(dir, prefix, name);
    let mut sink = XlsxSink::new(&path);
    let rows = write(&mut sink)?;
    tracing::info!(path = %path.display(), rows, "wrote report");
    Ok(path)
}
