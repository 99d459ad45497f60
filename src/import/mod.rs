//! Dump import: the generic batch importer and the per-file pipeline that
//! feeds it from a [`SqlDumpReader`](crate::dump::SqlDumpReader).

pub mod error;
pub mod importer;
pub mod pipeline;

pub use error::{ImportError, ImportResult};
pub use importer::{
    DEFAULT_BATCH_SIZE, DEFAULT_PROGRESS_INTERVAL, ImportOutcome, ImportSettings, Importer,
    UpdateCriterion,
};
pub use pipeline::{ImportSummary, import_dump, import_file};
