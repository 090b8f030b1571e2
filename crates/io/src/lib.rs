// File I/O: datapackages, JSON stores, Excel export

pub mod bundle;
pub mod datapackage;
pub mod error;
pub mod export;
pub mod ilcd;
pub mod migrations;
pub mod paths;
pub mod reports;
pub mod sink;
pub mod store;

pub use bundle::LciBundle;
pub use datapackage::DataPackage;
pub use error::{ExportError, IlcdError, LoadError, SinkError};
pub use export::{export_matrices, lci_matrices_to_excel, ExportReport};
pub use migrations::MigrationDir;
pub use paths::safe_filename;
pub use sink::{RecordingSink, SpreadsheetSink, Style, XlsxSink};
pub use store::MetadataStore;
