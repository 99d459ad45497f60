//! Rich diagnostic error types for the catalog.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from catalog storage operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("database file already exists: \"{path}\"")]
    #[diagnostic(
        code(libgen::catalog::already_exists),
        help(
            "Refusing to overwrite an existing catalog. Choose a different path \
             or delete the old file first."
        )
    )]
    AlreadyExists { path: String },

    #[error("database file not found: \"{path}\"")]
    #[diagnostic(
        code(libgen::catalog::not_found),
        help(
            "Create a catalog with `libgen database create <path>` and point the \
             configuration at it with `libgen config database <path>`."
        )
    )]
    NotFound { path: String },

    #[error("catalog metadata is missing")]
    #[diagnostic(
        code(libgen::catalog::metadata_missing),
        help(
            "The database file was not created by `libgen database create`. \
             Create a fresh catalog and import the dumps again."
        )
    )]
    MetadataMissing,

    #[error("redb error: {message}")]
    #[diagnostic(
        code(libgen::catalog::redb),
        help(
            "The embedded database reported an error. Check that no other import \
             or scan is running against the same catalog file."
        )
    )]
    Redb { message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(libgen::catalog::serde),
        help(
            "A stored record could not be encoded or decoded. The catalog may have \
             been written by an incompatible version."
        )
    )]
    Serialization { message: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(libgen::catalog::io),
        help("A filesystem operation failed. Check file paths and permissions.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias for catalog operation results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;
