//! `lcigrid-core`: shared types for the import and export halves.
//!
//! Keys, flows, datasets and exchanges, the label ordering used for every
//! human-facing index space, and the sparse matrix format handed over by the
//! external solver.

pub mod labels;
pub mod matrix;
pub mod model;

pub use labels::{LabelError, LabelOrder, UNKNOWN_LABEL};
pub use matrix::{MatrixError, SparseMatrix};
pub use model::{Categories, Dataset, Exchange, ExchangeKind, Flow, FlowKind, Key};
