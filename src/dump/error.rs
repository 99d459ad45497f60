//! Rich diagnostic error types for the dump reader.

use miette::Diagnostic;
use thiserror::Error;

/// Errors from reading and tokenizing a SQL dump.
#[derive(Debug, Error, Diagnostic)]
pub enum DumpError {
    #[error("parse error at line {line}: {message}")]
    #[diagnostic(
        code(libgen::dump::parse_error),
        help(
            "The dump does not follow the expected CREATE TABLE / INSERT layout at \
             this position. Check that the file is a complete, uncorrupted MySQL dump."
        )
    )]
    Parse { line: u64, message: String },

    #[error("reader misuse: {message}")]
    #[diagnostic(
        code(libgen::dump::invalid_state),
        help(
            "Table definitions and rows can only be parsed right after a CREATE TABLE \
             or INSERT line has been read."
        )
    )]
    InvalidState { message: String },

    #[error("unsupported dump file: \"{path}\": {reason}")]
    #[diagnostic(
        code(libgen::dump::unsupported),
        help(
            "Dumps must be plain .sql files, .gz / .bz2 compressed files, or \
             .tar / .tar.gz / .tar.bz2 archives holding exactly one file."
        )
    )]
    Unsupported { path: String, reason: String },

    #[error("I/O error: {source}")]
    #[diagnostic(
        code(libgen::dump::io),
        help("Reading the dump failed. Check the file path, permissions, and archive integrity.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },
}

/// Raised from inside the byte stream when a tarball holds a second file.
#[derive(Debug, Error)]
#[error("archive `{archive}` holds more than one file (found `{entry}`)")]
pub struct ExtraArchiveEntry {
    pub archive: String,
    pub entry: String,
}

impl From<std::io::Error> for DumpError {
    fn from(source: std::io::Error) -> Self {
        let extra = source
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<ExtraArchiveEntry>());
        match extra {
            Some(extra) => Self::Unsupported {
                path: extra.archive.clone(),
                reason: format!("a second file `{}` follows the dump", extra.entry),
            },
            None => Self::Io { source },
        }
    }
}

/// Convenience alias for dump reader results.
pub type DumpResult<T> = std::result::Result<T, DumpError>;
