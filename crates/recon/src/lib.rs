//! `lcigrid-recon`: cross-nomenclature exchange reconciliation.
//!
//! Pure engine crate: pulls records through the [`source::ObservationSource`]
//! and [`migration::MigrationStore`] traits and returns canonical exchanges.
//! No file formats live here.

pub mod config;
pub mod engine;
pub mod error;
pub mod import;
pub mod migration;
pub mod registry;
pub mod source;
pub mod stream;
pub mod units;

pub use config::ImportConfig;
pub use engine::{Reconciliation, ReconSummary, SourceFlowKey};
pub use error::{MigrationError, ReconError, RegistryError, SourceError};
pub use import::{ImportRun, Importer};
pub use migration::{Disaggregation, MigrationStore, MigrationTable};
pub use registry::CanonicalRegistry;
pub use source::{MetadataRecord, Observation, ObservationSource};
pub use stream::ExchangeStream;
