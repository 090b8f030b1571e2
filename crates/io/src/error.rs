use lcigrid_core::LabelError;
use lcigrid_recon::RegistryError;
use thiserror::Error;

/// Failures loading JSON stores and bundles from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("{path}: invalid JSON: {message}")]
    Json { path: String, message: String },
    #[error("cannot write {path}: {message}")]
    Write { path: String, message: String },
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// An index dict points past the matrix it indexes.
    #[error("{dict}: index {index} out of range (matrix has {bound})")]
    IndexOutOfRange {
        dict: &'static str,
        index: usize,
        bound: usize,
    },
    /// The same key appears twice in one index dict.
    #[error("{dict}: duplicate key {key}")]
    DuplicateKey { dict: &'static str, key: String },
}

/// Spreadsheet writer failures. Always fatal for the workbook being written.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("spreadsheet write failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error("invalid cell reference '{0}'")]
    BadCellRef(String),
    #[error("invalid column range '{0}'")]
    BadColumnRange(String),
    #[error("cell ({row}, {col}) is outside the worksheet limits")]
    CellOutOfRange { row: usize, col: usize },
    #[error("no sheet with id {0}")]
    UnknownSheet(usize),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("database '{0}' does not exist")]
    DatabaseNotFound(String),
    #[error(transparent)]
    Label(#[from] LabelError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

#[derive(Debug, Error)]
pub enum IlcdError {
    #[error("cannot open archive {path}: {message}")]
    Archive { path: String, message: String },
    #[error("{file}: XML error: {message}")]
    Xml { file: String, message: String },
    #[error("{file}: missing {field}")]
    MissingValue { file: String, field: &'static str },
    #[error("{file}: invalid {field} '{value}'")]
    BadValue {
        file: String,
        field: &'static str,
        value: String,
    },
}
