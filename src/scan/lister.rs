//! Directory listing for the scanner.

use std::io;
use std::path::{Path, PathBuf};

/// Kind of a listed entry the scanner descends into or hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Lists the files and subdirectories of one directory.
pub trait DirectoryLister {
    /// The outer error fails the whole directory; an inner error fails one
    /// entry. Entries that are neither files nor directories are left out.
    fn list(&self, directory: &Path) -> io::Result<Vec<io::Result<ListedEntry>>>;
}

/// Lists the real filesystem.
///
/// Symlinks to files are listed as files. Symlinks to directories are left
/// out so the walk cannot cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLister;

impl DirectoryLister for FsLister {
    fn list(&self, directory: &Path) -> io::Result<Vec<io::Result<ListedEntry>>> {
        let mut listed = Vec::new();
        for entry in std::fs::read_dir(directory)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    listed.push(Err(e));
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    listed.push(Err(e));
                    continue;
                }
            };
            let kind = if file_type.is_dir() {
                EntryKind::Directory
            } else if file_type.is_file() || (file_type.is_symlink() && path.is_file()) {
                EntryKind::File
            } else {
                continue;
            };
            listed.push(Ok(ListedEntry { path, kind }));
        }
        Ok(listed)
    }
}
