//! CLI Exit Code Registry
//!
//! Single source of truth for `lcigrid` exit codes. Scripts branch on these.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 3-9     | import    | Datapackage, migration and registry      |
//! | 10-19   | export    | Stores, bundles and workbook writing     |
//! | 20-29   | ilcd      | ILCD archive extraction                  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the matching `CliError` constructor

use lcigrid_io::{ExportError, IlcdError, LoadError};
use lcigrid_recon::{MigrationError, ReconError, SourceError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options, bad settings file.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Import (3-9)
// =============================================================================

/// Datapackage unreadable or structurally broken (missing resource or
/// column, unparseable amount, unknown row/col id).
pub const EXIT_IMPORT_SOURCE: u8 = 3;

/// Migration rule set missing or undecodable.
pub const EXIT_IMPORT_MIGRATION: u8 = 4;

/// Canonical flow list unreadable or holding duplicate flows.
pub const EXIT_IMPORT_REGISTRY: u8 = 5;

/// Import config file invalid.
pub const EXIT_IMPORT_CONFIG: u8 = 6;

/// Import output could not be written.
pub const EXIT_IMPORT_WRITE: u8 = 7;

// =============================================================================
// Export (10-19)
// =============================================================================

/// Metadata store or LCI bundle unreadable.
pub const EXIT_EXPORT_LOAD: u8 = 10;

/// Requested database is not in the metadata store.
pub const EXIT_EXPORT_DB_NOT_FOUND: u8 = 11;

/// Workbook could not be written.
pub const EXIT_EXPORT_WRITE: u8 = 12;

/// Index dicts inconsistent with the matrices (out of range, duplicates).
pub const EXIT_EXPORT_LABELS: u8 = 13;

// =============================================================================
// ILCD (20-29)
// =============================================================================

/// Archive missing or not a zip file.
pub const EXIT_ILCD_ARCHIVE: u8 = 20;

/// A flow dataset inside the archive is malformed.
pub const EXIT_ILCD_PARSE: u8 = 21;

// =============================================================================
// Error mapping
// =============================================================================

pub fn source_exit_code(_err: &SourceError) -> u8 {
    EXIT_IMPORT_SOURCE
}

pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_IMPORT_CONFIG,
        ReconError::Registry(_) => EXIT_IMPORT_REGISTRY,
        ReconError::Migration(_) => EXIT_IMPORT_MIGRATION,
        ReconError::Source(e) => source_exit_code(e),
    }
}

pub fn migration_exit_code(_err: &MigrationError) -> u8 {
    EXIT_IMPORT_MIGRATION
}

pub fn load_exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::Registry(_) => EXIT_IMPORT_REGISTRY,
        LoadError::IndexOutOfRange { .. } | LoadError::DuplicateKey { .. } => EXIT_EXPORT_LABELS,
        LoadError::Write { .. } => EXIT_EXPORT_WRITE,
        LoadError::Io { .. } | LoadError::Json { .. } => EXIT_EXPORT_LOAD,
    }
}

pub fn export_exit_code(err: &ExportError) -> u8 {
    match err {
        ExportError::DatabaseNotFound(_) => EXIT_EXPORT_DB_NOT_FOUND,
        ExportError::Label(_) => EXIT_EXPORT_LABELS,
        ExportError::Sink(_) => EXIT_EXPORT_WRITE,
    }
}

pub fn ilcd_exit_code(err: &IlcdError) -> u8 {
    match err {
        IlcdError::Archive { .. } => EXIT_ILCD_ARCHIVE,
        _ => EXIT_ILCD_PARSE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_do_not_collide() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IMPORT_SOURCE,
            EXIT_IMPORT_MIGRATION,
            EXIT_IMPORT_REGISTRY,
            EXIT_IMPORT_CONFIG,
            EXIT_IMPORT_WRITE,
            EXIT_EXPORT_LOAD,
            EXIT_EXPORT_DB_NOT_FOUND,
            EXIT_EXPORT_WRITE,
            EXIT_EXPORT_LABELS,
            EXIT_ILCD_ARCHIVE,
            EXIT_ILCD_PARSE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn config_errors_map_to_config_code() {
        let err = ReconError::ConfigValidation("db_name must not be empty".into());
        assert_eq!(recon_exit_code(&err), EXIT_IMPORT_CONFIG);
        let err = ReconError::Migration(MigrationError::NotFound("x".into()));
        assert_eq!(recon_exit_code(&err), EXIT_IMPORT_MIGRATION);
    }

    #[test]
    fn missing_database_has_its_own_code() {
        let err = ExportError::DatabaseNotFound("ei".into());
        assert_eq!(export_exit_code(&err), EXIT_EXPORT_DB_NOT_FOUND);
    }
}
