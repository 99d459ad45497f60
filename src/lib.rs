// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # libgen-server
//!
//! Ingests Library Genesis MySQL dumps into a local catalog and matches files
//! on disk to catalog records by content hash.
//!
//! ## Architecture
//!
//! - **Dump reader** (`dump`): streaming tokenizer over plain, gzip or bzip2 dumps
//! - **Schema matcher** (`schema`): recognizes the non-fiction, fiction and scimag tables
//! - **Importer** (`import`): batched insert/update reconciliation against an existence bitset
//! - **Scanner** (`scan`): recursive MD5 matching of library directories
//! - **Catalog** (`catalog`): redb-backed storage of records, files and metadata
//!
//! ## Library usage
//!
//! ```no_run
//! use std::path::Path;
//! use libgen_server::catalog::{Domain, LocalDatabase};
//! use libgen_server::import::{ImportSettings, import_file};
//!
//! let mut db = LocalDatabase::create(Path::new("libgen.redb")).unwrap();
//! let summary = import_file(
//!     &mut db,
//!     Path::new("libgen.sql.gz"),
//!     Domain::NonFiction,
//!     &ImportSettings::default(),
//!     |added, updated| println!("added {added}, updated {updated}"),
//! )
//! .unwrap();
//! println!("{} rows added", summary.outcome.added);
//! ```

pub mod catalog;
pub mod config;
pub mod dump;
pub mod error;
pub mod import;
pub mod logging;
pub mod paths;
pub mod scan;
pub mod schema;
