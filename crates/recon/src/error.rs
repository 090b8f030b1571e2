use lcigrid_core::{Categories, Key};
use thiserror::Error;

/// Canonical registry construction failures.
#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    /// Two reference flows share the same `(name, categories)`.
    #[error("duplicate canonical flow '{name}' {categories}: {first} and {second}")]
    DuplicateFlow {
        name: String,
        categories: Categories,
        first: Key,
        second: Key,
    },
}

/// Migration rule set loading failures. All of these abort an import.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No rule set is stored under the requested identifier.
    #[error("migration '{0}' not found")]
    NotFound(String),
    /// The rule set exists but cannot be decoded.
    #[error("migration '{id}': {message}")]
    Parse { id: String, message: String },
    /// A rule maps its source to an empty target list.
    #[error("migration rule for '{name}' {categories} has no targets")]
    EmptyRule { name: String, categories: Categories },
    #[error("IO error: {0}")]
    Io(String),
}

/// Failures reading the source datapackage. Structural problems are fatal;
/// absent mappings are not reported here.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("resource '{0}' not found")]
    MissingResource(String),
    #[error("resource '{resource}': missing column '{column}'")]
    MissingColumn { resource: String, column: String },
    #[error("resource '{resource}', line {line}: cannot parse amount '{value}'")]
    BadAmount { resource: String, line: u64, value: String },
    #[error("resource '{resource}': unknown {axis} id '{id}'")]
    UnknownId { resource: String, axis: &'static str, id: String },
    #[error("resource '{resource}': no amount for ({row}, {col})")]
    MissingAmount { resource: String, row: String, col: String },
    #[error("resource '{resource}': {message}")]
    Malformed { resource: String, message: String },
    #[error("resource '{resource}': CSV error: {message}")]
    Csv { resource: String, message: String },
    #[error("IO error: {0}")]
    Io(String),
}

/// Umbrella error for a whole import run.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (empty database name, bad identifier, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error(transparent)]
    Source(#[from] SourceError),
}
