//! Rich diagnostic error types for dump imports.

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::{CatalogError, Domain};
use crate::dump::DumpError;

/// Errors from importing a dump into the catalog.
#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error("no supported table definition found in the dump")]
    #[diagnostic(
        code(libgen::import::table_not_found),
        help(
            "The dump contains no CREATE TABLE statement for a Library Genesis \
             non-fiction, fiction, or scimag table."
        )
    )]
    TableNotFound,

    #[error("dump holds {found} data, but {expected} was requested")]
    #[diagnostic(
        code(libgen::import::format_mismatch),
        help("Pass the import format that matches the table found in the dump.")
    )]
    FormatMismatch { expected: Domain, found: Domain },

    #[error("table `{table}` has no data")]
    #[diagnostic(
        code(libgen::import::no_data),
        help("The dump declares the table but contains no INSERT statement for it.")
    )]
    NoData { table: String },
}

/// Convenience alias for import results.
pub type ImportResult<T> = std::result::Result<T, ImportError>;
