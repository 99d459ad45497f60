//! Dump sources: plain files, compressed files and single-file tarballs.
//!
//! The adapter is chosen by file extension; the reader above only ever sees a
//! `BufRead`. Tarballs are streamed entry by entry without being unpacked, and
//! must hold exactly one regular file.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::MultiBzDecoder;
use flate2::read::MultiGzDecoder;
use tar::Header;

use crate::dump::error::{DumpError, DumpResult, ExtraArchiveEntry};

/// Read buffer size for dump streams.
const READ_BUFFER_SIZE: usize = 1 << 16;

const TAR_BLOCK: u64 = 512;

/// Container format wrapping a dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpCompression {
    Plain,
    Gzip,
    Bzip2,
    Tar,
    TarGzip,
    TarBzip2,
}

impl DumpCompression {
    /// Detect the container from a file extension.
    pub fn detect(path: &Path) -> Self {
        let lower = path.to_string_lossy().to_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Self::TarGzip
        } else if lower.ends_with(".tar.bz2") || lower.ends_with(".tbz2") {
            Self::TarBzip2
        } else if lower.ends_with(".tar") {
            Self::Tar
        } else if lower.ends_with(".gz") {
            Self::Gzip
        } else if lower.ends_with(".bz2") {
            Self::Bzip2
        } else {
            Self::Plain
        }
    }
}

/// Open a dump file, transparently decompressing or unwrapping it.
pub fn open_dump_source(path: &Path) -> DumpResult<Box<dyn BufRead>> {
    if path.is_dir() {
        return Err(DumpError::Unsupported {
            path: path.display().to_string(),
            reason: "the path is a directory".into(),
        });
    }
    let file = File::open(path)?;
    let compression = DumpCompression::detect(path);
    tracing::debug!(path = %path.display(), ?compression, "opening dump");
    let reader: Box<dyn BufRead> = match compression {
        DumpCompression::Plain => buffered(file),
        DumpCompression::Gzip => buffered(MultiGzDecoder::new(file)),
        DumpCompression::Bzip2 => buffered(MultiBzDecoder::new(file)),
        DumpCompression::Tar => buffered(TarEntryReader::open(path, file)?),
        DumpCompression::TarGzip => {
            buffered(TarEntryReader::open(path, MultiGzDecoder::new(file))?)
        }
        DumpCompression::TarBzip2 => {
            buffered(TarEntryReader::open(path, MultiBzDecoder::new(file))?)
        }
    };
    Ok(reader)
}

fn buffered<R: Read + 'static>(inner: R) -> Box<dyn BufRead> {
    Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, inner))
}

/// Streams the only regular file of a tar archive.
///
/// Metadata entries (pax headers, GNU long names) and directories are
/// skipped. Reaching the end of the file checks the rest of the archive: a
/// second regular file fails the read with [`ExtraArchiveEntry`].
struct TarEntryReader<R> {
    inner: R,
    archive: String,
    remaining: u64,
    padding: u64,
    checked_tail: bool,
}

impl<R: Read> TarEntryReader<R> {
    fn open(path: &Path, mut inner: R) -> DumpResult<Self> {
        let archive = path.display().to_string();
        let Some(header) = next_file_header(&mut inner)? else {
            return Err(DumpError::Unsupported {
                path: archive,
                reason: "the archive holds no file".into(),
            });
        };
        let size = header.entry_size()?;
        tracing::debug!(
            archive = %archive,
            entry = %header.path().map(|p| p.display().to_string()).unwrap_or_default(),
            size,
            "streaming archive entry"
        );
        Ok(Self {
            inner,
            archive,
            remaining: size,
            padding: padding_for(size),
            checked_tail: false,
        })
    }

    fn check_tail(&mut self) -> io::Result<()> {
        self.checked_tail = true;
        skip_bytes(&mut self.inner, self.padding)?;
        if let Some(header) = next_file_header(&mut self.inner)? {
            let entry = header
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                ExtraArchiveEntry {
                    archive: self.archive.clone(),
                    entry,
                },
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for TarEntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            if !self.checked_tail {
                self.check_tail()?;
            }
            return Ok(0);
        }
        let limit = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let read = self.inner.read(&mut buf[..limit])?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive ends inside its file entry",
            ));
        }
        self.remaining -= read as u64;
        Ok(read)
    }
}

/// Read headers until the next regular file. `None` at the end of the archive.
fn next_file_header<R: Read>(inner: &mut R) -> io::Result<Option<Header>> {
    loop {
        let mut block = [0u8; TAR_BLOCK as usize];
        match inner.read_exact(&mut block) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        }
        if block.iter().all(|&b| b == 0) {
            return Ok(None);
        }
        let header = Header::from_byte_slice(&block).clone();
        if !checksum_matches(&header, &block) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "not a tar archive (header checksum mismatch)",
            ));
        }
        let entry_type = header.entry_type();
        if entry_type.is_file() {
            return Ok(Some(header));
        }
        let size = header.entry_size()?;
        skip_bytes(inner, size + padding_for(size))?;
    }
}

fn checksum_matches(header: &Header, block: &[u8]) -> bool {
    let Ok(stored) = header.cksum() else {
        return false;
    };
    let computed: u32 = block
        .iter()
        .enumerate()
        .map(|(i, &b)| if (148..156).contains(&i) { u32::from(b' ') } else { u32::from(b) })
        .sum();
    stored == computed
}

fn padding_for(size: u64) -> u64 {
    (TAR_BLOCK - size % TAR_BLOCK) % TAR_BLOCK
}

fn skip_bytes<R: Read>(inner: &mut R, count: u64) -> io::Result<()> {
    let skipped = io::copy(&mut Read::take(&mut *inner, count), &mut io::sink())?;
    if skipped < count {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "archive ends inside an entry",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "CREATE TABLE `updated` (\n  `ID` int(11) NOT NULL\n);\nINSERT INTO `updated` VALUES (1);\n";

    fn append_file<W: io::Write>(builder: &mut tar::Builder<W>, name: &str, content: &[u8]) {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, content).unwrap();
    }

    fn read_all(mut reader: Box<dyn BufRead>) -> io::Result<String> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        Ok(text)
    }

    #[test]
    fn detect_by_extension() {
        assert_eq!(
            DumpCompression::detect(Path::new("libgen.sql")),
            DumpCompression::Plain
        );
        assert_eq!(
            DumpCompression::detect(Path::new("libgen.SQL.GZ")),
            DumpCompression::Gzip
        );
        assert_eq!(
            DumpCompression::detect(Path::new("fiction.sql.bz2")),
            DumpCompression::Bzip2
        );
        assert_eq!(
            DumpCompression::detect(Path::new("libgen.tgz")),
            DumpCompression::TarGzip
        );
        assert_eq!(
            DumpCompression::detect(Path::new("libgen.sql.tar.gz")),
            DumpCompression::TarGzip
        );
        assert_eq!(
            DumpCompression::detect(Path::new("scimag.tar")),
            DumpCompression::Tar
        );
        assert_eq!(
            DumpCompression::detect(Path::new("scimag.tar.bz2")),
            DumpCompression::TarBzip2
        );
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = open_dump_source(dir.path()).err().unwrap();
        assert!(matches!(err, DumpError::Unsupported { .. }));
    }

    #[test]
    fn gzipped_tarball_streams_its_single_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("libgen.tgz");
        let encoder = flate2::write::GzEncoder::new(
            File::create(&path).unwrap(),
            flate2::Compression::default(),
        );
        let mut builder = tar::Builder::new(encoder);
        append_file(&mut builder, "libgen.sql", DUMP.as_bytes());
        builder.into_inner().unwrap().finish().unwrap();

        let text = read_all(open_dump_source(&path).unwrap()).unwrap();
        assert_eq!(text, DUMP);
    }

    #[test]
    fn empty_tarball_is_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.tar");
        let builder = tar::Builder::new(File::create(&path).unwrap());
        builder.into_inner().unwrap();

        let err = open_dump_source(&path).err().unwrap();
        assert!(matches!(err, DumpError::Unsupported { .. }));
    }

    #[test]
    fn second_file_in_tarball_is_unsupported() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("two.tar");
        let mut builder = tar::Builder::new(File::create(&path).unwrap());
        append_file(&mut builder, "libgen.sql", DUMP.as_bytes());
        append_file(&mut builder, "fiction.sql", DUMP.as_bytes());
        builder.into_inner().unwrap();

        let mut reader = open_dump_source(&path).unwrap();
        let mut text = String::new();
        let err = reader.read_to_string(&mut text).unwrap_err();
        assert!(matches!(
            DumpError::from(err),
            DumpError::Unsupported { .. }
        ));
    }
}
