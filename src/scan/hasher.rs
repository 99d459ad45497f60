//! Content hashing for scanned files.

use std::fs::File;
use std::io;
use std::path::Path;

use md5::{Digest, Md5};

/// Computes the content hash the catalog matches files on.
pub trait ContentHasher {
    /// Lowercase hex digest of the file's bytes.
    fn hash_file(&self, path: &Path) -> io::Result<String>;
}

/// MD5, the hash Library Genesis publishes for every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl ContentHasher for Md5Hasher {
    fn hash_file(&self, path: &Path) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Md5::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }
}
