//! Top-level error type for libgen-server.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives. [`LibgenError`] wraps them so the binary can surface any of them
//! with its code and help text intact.

use miette::Diagnostic;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::dump::DumpError;
use crate::import::ImportError;
use crate::paths::PathError;

#[derive(Debug, Error, Diagnostic)]
pub enum LibgenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Dump(#[from] DumpError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Path(#[from] PathError),

    #[error("cannot open log file: {path}")]
    #[diagnostic(
        code(libgen::logging::log_file),
        help("Check that the directory exists and is writable, or drop `--log-file`.")
    )]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type LibgenResult<T> = std::result::Result<T, LibgenError>;
