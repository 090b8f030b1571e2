//! Spreadsheet writer abstraction.
//!
//! Export code only talks to [`SpreadsheetSink`]. [`XlsxSink`] writes real
//! workbooks through `rust_xlsxwriter`; [`RecordingSink`] keeps every write in
//! memory so tests can assert on cells.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Format, Note, Workbook};

use crate::error::SinkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SheetId(pub usize);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Style {
    pub bold: bool,
    pub font_size: Option<f64>,
}

impl Style {
    pub fn bold() -> Self {
        Self {
            bold: true,
            font_size: None,
        }
    }

    /// Bold 12pt, used by the matching reports.
    pub fn header() -> Self {
        Self {
            bold: true,
            font_size: Some(12.0),
        }
    }
}

pub trait SpreadsheetSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError>;

    /// Width for columns `first..=last` (0-based).
    fn set_column_width(
        &mut self,
        sheet: SheetId,
        first: usize,
        last: usize,
        width: f64,
    ) -> Result<(), SinkError>;

    fn write_string(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: &str,
        style: Option<Style>,
    ) -> Result<(), SinkError>;

    fn write_number(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: f64,
        style: Option<Style>,
    ) -> Result<(), SinkError>;

    fn write_boolean(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: bool,
        style: Option<Style>,
    ) -> Result<(), SinkError>;

    /// Attach a comment to an A1-style cell reference such as `"C1"`.
    fn write_comment(&mut self, sheet: SheetId, cell_ref: &str, text: &str) -> Result<(), SinkError>;

    /// Flush the workbook. Nothing is guaranteed on disk before this returns.
    fn close(&mut self) -> Result<(), SinkError>;

    /// Width for an A1-style column range such as `"A:A"` or `"B:D"`.
    fn set_columns(&mut self, sheet: SheetId, range: &str, width: f64) -> Result<(), SinkError> {
        let (first, last) = parse_column_range(range)?;
        self.set_column_width(sheet, first, last, width)
    }
}

// ============================================================================
// A1 references
// ============================================================================

/// Parse a cell reference like "C1" or "$C$1" into 0-based (row, col).
pub fn parse_cell_ref(cell_ref: &str) -> Result<(usize, usize), SinkError> {
    let bad = || SinkError::BadCellRef(cell_ref.to_string());
    let cleaned = cell_ref.replace('$', "");
    let cleaned = cleaned.trim();

    let split = cleaned.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
    if split == 0 {
        return Err(bad());
    }
    let col = col_from_letters(&cleaned[..split]).ok_or_else(bad)?;
    let row: usize = cleaned[split..].parse().map_err(|_| bad())?;
    if row == 0 {
        return Err(bad());
    }
    Ok((row - 1, col))
}

/// Parse "A:A" or "B:D" into 0-based (first, last) columns.
pub fn parse_column_range(range: &str) -> Result<(usize, usize), SinkError> {
    let bad = || SinkError::BadColumnRange(range.to_string());
    let (first, last) = range.trim().split_once(':').ok_or_else(bad)?;
    let first = col_from_letters(first).ok_or_else(bad)?;
    let last = col_from_letters(last).ok_or_else(bad)?;
    if last < first {
        return Err(bad());
    }
    Ok((first, last))
}

/// Column letters to 0-based index (A=0, Z=25, AA=26, ...).
fn col_from_letters(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as usize - 'A' as usize + 1)?;
    }
    Some(col - 1)
}

// ============================================================================
// XlsxSink
// ============================================================================

/// Writes an `.xlsx` workbook to `path` on [`close`](SpreadsheetSink::close).
pub struct XlsxSink {
    workbook: Workbook,
    path: PathBuf,
    sheets: usize,
}

impl XlsxSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            workbook: Workbook::new(),
            path: path.as_ref().to_path_buf(),
            sheets: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn worksheet(&mut self, sheet: SheetId) -> Result<&mut rust_xlsxwriter::Worksheet, SinkError> {
        if sheet.0 >= self.sheets {
            return Err(SinkError::UnknownSheet(sheet.0));
        }
        Ok(self.workbook.worksheet_from_index(sheet.0)?)
    }
}

fn to_format(style: Style) -> Format {
    let mut format = Format::new();
    if style.bold {
        format = format.set_bold();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    format
}

// rust_xlsxwriter addresses cells as u32 rows / u16 columns
fn cell(row: usize, col: usize) -> Result<(u32, u16), SinkError> {
    match (u32::try_from(row), u16::try_from(col)) {
        (Ok(r), Ok(c)) => Ok((r, c)),
        _ => Err(SinkError::CellOutOfRange { row, col }),
    }
}

impl SpreadsheetSink for XlsxSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError> {
        self.workbook.add_worksheet().set_name(name)?;
        self.sheets += 1;
        Ok(SheetId(self.sheets - 1))
    }

    fn set_column_width(
        &mut self,
        sheet: SheetId,
        first: usize,
        last: usize,
        width: f64,
    ) -> Result<(), SinkError> {
        let ws = self.worksheet(sheet)?;
        for col in first..=last {
            let (_, c) = cell(0, col)?;
            ws.set_column_width(c, width)?;
        }
        Ok(())
    }

    fn write_string(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: &str,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        let (r, c) = cell(row, col)?;
        let ws = self.worksheet(sheet)?;
        match style {
            Some(style) => ws.write_string_with_format(r, c, value, &to_format(style))?,
            None => ws.write_string(r, c, value)?,
        };
        Ok(())
    }

    fn write_number(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: f64,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        let (r, c) = cell(row, col)?;
        let ws = self.worksheet(sheet)?;
        match style {
            Some(style) => ws.write_number_with_format(r, c, value, &to_format(style))?,
            None => ws.write_number(r, c, value)?,
        };
        Ok(())
    }

    fn write_boolean(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: bool,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        let (r, c) = cell(row, col)?;
        let ws = self.worksheet(sheet)?;
        match style {
            Some(style) => ws.write_boolean_with_format(r, c, value, &to_format(style))?,
            None => ws.write_boolean(r, c, value)?,
        };
        Ok(())
    }

    fn write_comment(&mut self, sheet: SheetId, cell_ref: &str, text: &str) -> Result<(), SinkError> {
        let (row, col) = parse_cell_ref(cell_ref)?;
        let (r, c) = cell(row, col)?;
        let note = Note::new(text);
        self.worksheet(sheet)?.insert_note(r, c, &note)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.workbook.save(&self.path)?;
        tracing::debug!(path = %self.path.display(), sheets = self.sheets, "saved workbook");
        Ok(())
    }
}

// ============================================================================
// RecordingSink
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCell {
    pub value: CellValue,
    pub style: Option<Style>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordedSheet {
    pub name: String,
    pub cells: BTreeMap<(usize, usize), RecordedCell>,
    pub widths: Vec<(usize, usize, f64)>,
    pub comments: Vec<(usize, usize, String)>,
    /// Every write in call order, including overwrites of the same cell.
    pub writes: usize,
}

impl RecordedSheet {
    pub fn value(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.cells.get(&(row, col)).map(|c| &c.value)
    }

    pub fn string(&self, row: usize, col: usize) -> Option<&str> {
        match self.value(row, col)? {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn number(&self, row: usize, col: usize) -> Option<f64> {
        match self.value(row, col)? {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn boolean(&self, row: usize, col: usize) -> Option<bool> {
        match self.value(row, col)? {
            CellValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn style(&self, row: usize, col: usize) -> Option<Style> {
        self.cells.get(&(row, col)).and_then(|c| c.style)
    }

    /// Cells holding numbers, keyed by position.
    pub fn numbers(&self) -> impl Iterator<Item = ((usize, usize), f64)> + '_ {
        self.cells.iter().filter_map(|(pos, c)| match c.value {
            CellValue::Number(n) => Some((*pos, n)),
            _ => None,
        })
    }
}

/// In-memory sink for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub sheets: Vec<RecordedSheet>,
    pub closed: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(&self, name: &str) -> Option<&RecordedSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    fn sheet_mut(&mut self, sheet: SheetId) -> Result<&mut RecordedSheet, SinkError> {
        self.sheets.get_mut(sheet.0).ok_or(SinkError::UnknownSheet(sheet.0))
    }

    fn record(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: CellValue,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        cell(row, col)?;
        let sheet = self.sheet_mut(sheet)?;
        sheet.cells.insert((row, col), RecordedCell { value, style });
        sheet.writes += 1;
        Ok(())
    }
}

impl SpreadsheetSink for RecordingSink {
    fn add_sheet(&mut self, name: &str) -> Result<SheetId, SinkError> {
        self.sheets.push(RecordedSheet {
            name: name.to_string(),
            ..RecordedSheet::default()
        });
        Ok(SheetId(self.sheets.len() - 1))
    }

    fn set_column_width(
        &mut self,
        sheet: SheetId,
        first: usize,
        last: usize,
        width: f64,
    ) -> Result<(), SinkError> {
        self.sheet_mut(sheet)?.widths.push((first, last, width));
        Ok(())
    }

    fn write_string(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: &str,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        self.record(sheet, row, col, CellValue::String(value.to_string()), style)
    }

    fn write_number(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: f64,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        self.record(sheet, row, col, CellValue::Number(value), style)
    }

    fn write_boolean(
        &mut self,
        sheet: SheetId,
        row: usize,
        col: usize,
        value: bool,
        style: Option<Style>,
    ) -> Result<(), SinkError> {
        self.record(sheet, row, col, CellValue::Boolean(value), style)
    }

    fn write_comment(&mut self, sheet: SheetId, cell_ref: &str, text: &str) -> Result<(), SinkError> {
        let (row, col) = parse_cell_ref(cell_ref)?;
        self.sheet_mut(sheet)?.comments.push((row, col, text.to_string()));
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }
}
