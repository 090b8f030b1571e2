//! LCI matrices to a labeled workbook.
//!
//! Sheets, in order:
//! - `technosphere`: products down, activities across
//! - `biosphere`: biosphere flows down, activities across
//! - `technosphere-labels` / `biosphere-labels`: metadata per sorted entry
//!
//! Every axis is ordered by [`LabelOrder`], so row/column positions are the
//! sorted positions, not the solver's.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use lcigrid_core::{Key, LabelOrder, SparseMatrix, UNKNOWN_LABEL};
use serde::Serialize;

use crate::bundle::LciBundle;
use crate::error::ExportError;
use crate::paths::xlsx_path;
use crate::sink::{SheetId, SpreadsheetSink, Style, XlsxSink};
use crate::store::MetadataStore;

pub const TECHNOSPHERE_LABELS_COMMENT: &str = "Only for ecoinvent 3, where names =/= products.";

const TECHNOSPHERE_COLUMNS: [&str; 6] =
    ["Index", "Name", "Reference product", "Unit", "Categories", "Location"];
const BIOSPHERE_COLUMNS: [&str; 4] = ["Index", "Name", "Unit", "Categories"];

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Set when the workbook was written to disk.
    pub path: Option<PathBuf>,
    pub activities: usize,
    pub products: usize,
    pub biosphere_flows: usize,
    /// Biosphere flows dropped because their row sums to exactly zero.
    pub pruned_flows: usize,
    /// Matrix cells written across both matrix sheets.
    pub cells_written: usize,
    /// Nonzero entries whose row or column was filtered out.
    pub skipped_entries: usize,
}

/// Export `bundle` for `database` into `sink`, then close the sink.
///
/// With `include_descendants` off, only activities of `database` itself get a
/// column; entries of upstream activities are skipped.
pub fn export_matrices(
    bundle: &LciBundle,
    store: &MetadataStore,
    database: &str,
    include_descendants: bool,
    sink: &mut dyn SpreadsheetSink,
) -> Result<ExportReport, ExportError> {
    if !store.contains(database) {
        return Err(ExportError::DatabaseNotFound(database.to_string()));
    }
    tracing::info!(database, "starting matrix export");

    let activity_index: HashMap<Key, usize> = if include_descendants {
        bundle.activity_dict.clone()
    } else {
        bundle
            .activity_dict
            .iter()
            .filter(|(key, _)| key.namespace == database)
            .map(|(key, &idx)| (key.clone(), idx))
            .collect()
    };

    // A row summing to exactly zero is dropped, so {+5, -5} goes as well
    let sums = bundle.biosphere_matrix.row_sums();
    let biosphere_index: HashMap<Key, usize> = bundle
        .biosphere_dict
        .iter()
        .filter(|(_, &idx)| sums.get(idx).is_some_and(|&s| s != 0.0))
        .map(|(key, &idx)| (key.clone(), idx))
        .collect();

    let mut report = ExportReport {
        pruned_flows: bundle.biosphere_dict.len() - biosphere_index.len(),
        ..ExportReport::default()
    };

    tracing::info!("sorting labels");
    let resolve = |key: &Key| store.name_of(key);
    let activities = LabelOrder::build(&activity_index, resolve)?;
    let products = LabelOrder::build(&bundle.product_dict, resolve)?;
    let biosphere = LabelOrder::build(&biosphere_index, resolve)?;
    report.activities = activities.len();
    report.products = products.len();
    report.biosphere_flows = biosphere.len();

    tracing::info!(entries = bundle.technosphere_matrix.nnz(), "writing technosphere matrix");
    write_matrix_sheet(
        sink,
        "technosphere",
        &bundle.technosphere_matrix,
        &products,
        &activities,
        &mut report,
    )?;

    tracing::info!(entries = bundle.biosphere_matrix.nnz(), "writing biosphere matrix");
    write_matrix_sheet(
        sink,
        "biosphere",
        &bundle.biosphere_matrix,
        &biosphere,
        &activities,
        &mut report,
    )?;

    tracing::info!("writing metadata");
    write_technosphere_labels(sink, store, &activities)?;
    write_biosphere_labels(sink, store, &biosphere)?;

    sink.close()?;
    tracing::info!(
        cells = report.cells_written,
        skipped = report.skipped_entries,
        pruned = report.pruned_flows,
        "matrix export finished"
    );
    Ok(report)
}

/// Write `<export_dir>/<safe database name>.xlsx`.
pub fn lci_matrices_to_excel(
    bundle: &LciBundle,
    store: &MetadataStore,
    database: &str,
    include_descendants: bool,
    export_dir: &Path,
) -> Result<ExportReport, ExportError> {
    let path = xlsx_path(export_dir, "", database);
    let mut sink = XlsxSink::new(&path);
    let mut report = export_matrices(bundle, store, database, include_descendants, &mut sink)?;
    report.path = Some(path);
    Ok(report)
}

fn write_matrix_sheet(
    sink: &mut dyn SpreadsheetSink,
    name: &str,
    matrix: &SparseMatrix,
    rows: &LabelOrder,
    cols: &LabelOrder,
    report: &mut ExportReport,
) -> Result<(), ExportError> {
    let sheet = sink.add_sheet(name)?;
    sink.set_columns(sheet, "A:A", 50.0)?;

    for (index, label, _) in cols.iter() {
        sink.write_string(sheet, 0, index + 1, label, None)?;
    }
    for (index, label, _) in rows.iter() {
        sink.write_string(sheet, index + 1, 0, label, None)?;
    }

    for (row, col, value) in matrix.nonzeros() {
        match (rows.to_canonical(row), cols.to_canonical(col)) {
            (Some(r), Some(c)) => {
                sink.write_number(sheet, r + 1, c + 1, value, None)?;
                report.cells_written += 1;
            }
            _ => report.skipped_entries += 1,
        }
    }
    Ok(())
}

fn write_header(
    sink: &mut dyn SpreadsheetSink,
    sheet: SheetId,
    columns: &[&str],
) -> Result<(), ExportError> {
    for (index, column) in columns.iter().enumerate() {
        sink.write_string(sheet, 0, index, column, Some(Style::bold()))?;
    }
    Ok(())
}

fn write_technosphere_labels(
    sink: &mut dyn SpreadsheetSink,
    store: &MetadataStore,
    activities: &LabelOrder,
) -> Result<(), ExportError> {
    let sheet = sink.add_sheet("technosphere-labels")?;
    sink.set_columns(sheet, "B:B", 60.0)?;
    sink.set_columns(sheet, "C:C", 30.0)?;
    sink.set_columns(sheet, "D:D", 15.0)?;
    sink.set_columns(sheet, "E:E", 30.0)?;

    write_header(sink, sheet, &TECHNOSPHERE_COLUMNS)?;
    sink.write_comment(sheet, "C1", TECHNOSPHERE_LABELS_COMMENT)?;

    for (index, _, key) in activities.iter() {
        let ds = store.get(key).cloned().unwrap_or_default();
        let row = index + 1;
        sink.write_number(sheet, row, 0, (index + 1) as f64, None)?;
        sink.write_string(sheet, row, 1, non_empty(&ds.name).unwrap_or(UNKNOWN_LABEL), None)?;
        sink.write_string(sheet, row, 2, non_empty(&ds.reference_product).unwrap_or(""), None)?;
        sink.write_string(sheet, row, 3, non_empty(&ds.unit).unwrap_or(UNKNOWN_LABEL), None)?;
        sink.write_string(sheet, row, 4, &ds.categories.join(" - "), None)?;
        sink.write_string(sheet, row, 5, non_empty(&ds.location).unwrap_or(UNKNOWN_LABEL), None)?;
    }
    Ok(())
}

fn write_biosphere_labels(
    sink: &mut dyn SpreadsheetSink,
    store: &MetadataStore,
    biosphere: &LabelOrder,
) -> Result<(), ExportError> {
    let sheet = sink.add_sheet("biosphere-labels")?;
    sink.set_columns(sheet, "B:B", 60.0)?;
    sink.set_columns(sheet, "C:C", 15.0)?;
    sink.set_columns(sheet, "D:D", 30.0)?;

    write_header(sink, sheet, &BIOSPHERE_COLUMNS)?;

    for (index, _, key) in biosphere.iter() {
        let ds = store.get(key).cloned().unwrap_or_default();
        let row = index + 1;
        sink.write_number(sheet, row, 0, (index + 1) as f64, None)?;
        sink.write_string(sheet, row, 1, non_empty(&ds.name).unwrap_or(UNKNOWN_LABEL), None)?;
        sink.write_string(sheet, row, 2, non_empty(&ds.unit).unwrap_or(UNKNOWN_LABEL), None)?;
        sink.write_string(sheet, row, 3, &ds.categories.join(" - "), None)?;
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
