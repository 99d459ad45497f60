//! Library scanning: hash files on disk and match them to catalog records.
//!
//! The scanner only collects [`LibraryFile`](crate::catalog::LibraryFile)
//! associations; the caller stores them with one bulk
//! [`LocalDatabase::add_files`](crate::catalog::LocalDatabase::add_files).

pub mod hasher;
pub mod lister;
pub mod scanner;

pub use hasher::{ContentHasher, Md5Hasher};
pub use lister::{DirectoryLister, EntryKind, FsLister, ListedEntry};
pub use scanner::{LibraryScanner, ScanOutcome, ScanSummary};
