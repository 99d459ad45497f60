//! Recursive directory scanner matching files to catalog records by MD5.

use std::marker::PhantomData;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::catalog::{CatalogObject, CatalogResult, LibraryFile, ObjectCatalog};
use crate::scan::hasher::{ContentHasher, Md5Hasher};
use crate::scan::lister::{DirectoryLister, EntryKind, FsLister};

/// Per-scan counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub found: u64,
    pub not_found: u64,
    pub errors: u64,
}

/// Matched files plus counters. The files are not yet stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub files: Vec<LibraryFile>,
    pub summary: ScanSummary,
}

/// Scans one directory tree for files of domain `T`.
#[derive(Debug)]
pub struct LibraryScanner<T, H = Md5Hasher, L = FsLister> {
    root: PathBuf,
    hasher: H,
    lister: L,
    _object: PhantomData<fn() -> T>,
}

impl<T: CatalogObject> LibraryScanner<T> {
    /// Surrounding whitespace and trailing separators are trimmed from `root`.
    pub fn new(root: &Path) -> Self {
        Self::with_hasher(root, Md5Hasher)
    }
}

impl<T: CatalogObject, H: ContentHasher> LibraryScanner<T, H> {
    pub fn with_hasher(root: &Path, hasher: H) -> Self {
        Self {
            root: normalize_root(root),
            hasher,
            lister: FsLister,
            _object: PhantomData,
        }
    }
}

impl<T: CatalogObject, H: ContentHasher, L: DirectoryLister> LibraryScanner<T, H, L> {
    /// Replace how directories are listed.
    pub fn with_lister<M: DirectoryLister>(self, lister: M) -> LibraryScanner<T, H, M> {
        LibraryScanner {
            root: self.root,
            hasher: self.hasher,
            lister,
            _object: PhantomData,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree and resolve every regular file against `catalog`.
    ///
    /// Nothing is read from disk when the domain holds no records. Hashing,
    /// lookup and directory errors are logged and counted; only the initial
    /// record count can fail the scan.
    pub fn scan<C: ObjectCatalog<T>>(&self, catalog: &C) -> CatalogResult<ScanOutcome> {
        let count = catalog.count()?;
        tracing::info!(
            root = %self.root.display(),
            domain = %T::DOMAIN,
            records = count,
            "scanning library directory"
        );
        let mut outcome = ScanOutcome::default();
        if count == 0 {
            tracing::info!(domain = %T::DOMAIN, "catalog holds no records, nothing to match");
            return Ok(outcome);
        }
        self.scan_directory(&self.root, catalog, &mut outcome);
        tracing::info!(
            found = outcome.summary.found,
            not_found = outcome.summary.not_found,
            errors = outcome.summary.errors,
            "scan complete"
        );
        Ok(outcome)
    }

    fn scan_directory<C: ObjectCatalog<T>>(
        &self,
        directory: &Path,
        catalog: &C,
        outcome: &mut ScanOutcome,
    ) {
        let entries = match self.lister.list(directory) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %directory.display(), error = %e, "cannot read directory");
                outcome.summary.errors += 1;
                return;
            }
        };

        let mut files = Vec::new();
        let mut directories = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => match entry.kind {
                    EntryKind::File => files.push(entry.path),
                    EntryKind::Directory => directories.push(entry.path),
                },
                Err(e) => {
                    tracing::warn!(path = %directory.display(), error = %e, "cannot read entry");
                    outcome.summary.errors += 1;
                }
            }
        }
        files.sort();
        directories.sort();

        for file in &files {
            self.scan_file(file, catalog, outcome);
        }
        for subdirectory in &directories {
            self.scan_directory(subdirectory, catalog, outcome);
        }
    }

    fn scan_file<C: ObjectCatalog<T>>(&self, path: &Path, catalog: &C, outcome: &mut ScanOutcome) {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let md5 = match self.hasher.hash_file(path) {
            Ok(md5) => md5,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "cannot hash file");
                outcome.summary.errors += 1;
                return;
            }
        };
        match catalog.find_by_md5(&md5) {
            Ok(Some(object)) => {
                tracing::debug!(path = %relative.display(), md5 = %md5, "found");
                outcome.files.push(LibraryFile {
                    id: 0,
                    file_path: self.root.join(relative).to_string_lossy().into_owned(),
                    archive_entry: None,
                    domain: T::DOMAIN,
                    object_id: object.id(),
                });
                outcome.summary.found += 1;
            }
            Ok(None) => {
                tracing::debug!(path = %relative.display(), md5 = %md5, "not found");
                outcome.summary.not_found += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "catalog lookup failed");
                outcome.summary.errors += 1;
            }
        }
    }
}

fn normalize_root(root: &Path) -> PathBuf {
    let text = root.to_string_lossy();
    let text = text.trim();
    let trimmed = text.trim_end_matches(['/', MAIN_SEPARATOR]);
    if trimmed.is_empty() {
        PathBuf::from(text)
    } else {
        PathBuf::from(trimmed)
    }
}
