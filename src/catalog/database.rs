//! Catalog database backed by redb.
//!
//! Each domain owns three tables: records keyed by internal id, a Library
//! Genesis id → internal id index, and an MD5 → internal id index. Every
//! batch is written in a single write transaction, so a batch is the unit of
//! crash consistency.

use std::path::{Path, PathBuf};

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::catalog::error::{CatalogError, CatalogResult};
use crate::catalog::existence::ExistenceIndex;
use crate::catalog::model::{
    CatalogObject, DatabaseMetadata, Domain, FictionBook, LibraryFile, NonFictionBook,
    SciMagArticle,
};
use crate::catalog::ObjectCatalog;

/// Catalog-wide metadata (single key → bincode blob).
const METADATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("metadata");

/// Latest modification stamp per domain tag.
const WATERMARK_TABLE: TableDefinition<&str, &str> = TableDefinition::new("watermarks");

/// Library files keyed by file id.
const FILES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("files");

const METADATA_KEY: &str = "metadata";

struct DomainTables {
    objects: TableDefinition<'static, u64, &'static [u8]>,
    libgen_ids: TableDefinition<'static, u32, u64>,
    md5: TableDefinition<'static, &'static str, u64>,
}

fn domain_tables(domain: Domain) -> DomainTables {
    match domain {
        Domain::NonFiction => DomainTables {
            objects: TableDefinition::new("nonfiction_objects"),
            libgen_ids: TableDefinition::new("nonfiction_libgen_ids"),
            md5: TableDefinition::new("nonfiction_md5"),
        },
        Domain::Fiction => DomainTables {
            objects: TableDefinition::new("fiction_objects"),
            libgen_ids: TableDefinition::new("fiction_libgen_ids"),
            md5: TableDefinition::new("fiction_md5"),
        },
        Domain::SciMag => DomainTables {
            objects: TableDefinition::new("scimag_objects"),
            libgen_ids: TableDefinition::new("scimag_libgen_ids"),
            md5: TableDefinition::new("scimag_md5"),
        },
    }
}

fn redb_error<E: std::fmt::Display>(operation: &'static str) -> impl FnOnce(E) -> CatalogError {
    move |e| CatalogError::Redb {
        message: format!("{operation} failed: {e}"),
    }
}

fn encode<S: Serialize>(value: &S) -> CatalogResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CatalogError::Serialization {
        message: format!("encode: {e}"),
    })
}

fn decode<D: DeserializeOwned>(bytes: &[u8]) -> CatalogResult<D> {
    bincode::deserialize(bytes).map_err(|e| CatalogError::Serialization {
        message: format!("decode: {e}"),
    })
}

/// The local catalog file.
pub struct LocalDatabase {
    db: Database,
    path: PathBuf,
}

impl LocalDatabase {
    /// Create a new catalog file with empty tables and default metadata.
    ///
    /// Fails if a file already exists at `path`.
    pub fn create(path: &Path) -> CatalogResult<Self> {
        if path.exists() {
            return Err(CatalogError::AlreadyExists {
                path: path.display().to_string(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::Io { source: e })?;
        }
        let db = Database::create(path).map_err(redb_error("create database"))?;
        let database = Self {
            db,
            path: path.to_path_buf(),
        };
        database.ensure_tables()?;
        database.update_metadata(&DatabaseMetadata::default())?;
        tracing::info!(path = %path.display(), "created catalog");
        Ok(database)
    }

    /// Open an existing catalog file.
    pub fn open(path: &Path) -> CatalogResult<Self> {
        if !path.is_file() {
            return Err(CatalogError::NotFound {
                path: path.display().to_string(),
            });
        }
        let db = Database::open(path).map_err(redb_error("open database"))?;
        let database = Self {
            db,
            path: path.to_path_buf(),
        };
        database.ensure_tables()?;
        Ok(database)
    }

    fn ensure_tables(&self) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(redb_error("begin_write"))?;
        {
            txn.open_table(METADATA_TABLE)
                .map_err(redb_error("open_table"))?;
            txn.open_table(WATERMARK_TABLE)
                .map_err(redb_error("open_table"))?;
            txn.open_table(FILES_TABLE).map_err(redb_error("open_table"))?;
            for domain in Domain::ALL {
                let tables = domain_tables(domain);
                txn.open_table(tables.objects)
                    .map_err(redb_error("open_table"))?;
                txn.open_table(tables.libgen_ids)
                    .map_err(redb_error("open_table"))?;
                txn.open_table(tables.md5).map_err(redb_error("open_table"))?;
            }
        }
        txn.commit().map_err(redb_error("commit"))
    }

    /// Read the catalog metadata.
    pub fn metadata(&self) -> CatalogResult<DatabaseMetadata> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(METADATA_TABLE)
            .map_err(redb_error("open_table"))?;
        let bytes = table
            .get(METADATA_KEY)
            .map_err(redb_error("get"))?
            .map(|guard| guard.value().to_vec())
            .ok_or(CatalogError::MetadataMissing)?;
        decode(&bytes)
    }

    /// Overwrite the catalog metadata.
    pub fn update_metadata(&self, metadata: &DatabaseMetadata) -> CatalogResult<()> {
        let bytes = encode(metadata)?;
        let txn = self.db.begin_write().map_err(redb_error("begin_write"))?;
        {
            let mut table = txn
                .open_table(METADATA_TABLE)
                .map_err(redb_error("open_table"))?;
            table
                .insert(METADATA_KEY, bytes.as_slice())
                .map_err(redb_error("insert"))?;
        }
        txn.commit().map_err(redb_error("commit"))
    }

    /// Fetch a record by internal id.
    pub fn get_object<T: CatalogObject>(&self, id: u64) -> CatalogResult<Option<T>> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(domain_tables(T::DOMAIN).objects)
            .map_err(redb_error("open_table"))?;
        let bytes = table
            .get(id)
            .map_err(redb_error("get"))?
            .map(|guard| guard.value().to_vec());
        bytes.map(|b| decode(&b)).transpose()
    }

    /// Store scanned library files in one transaction, assigning their ids and
    /// linking each matched record to its file.
    pub fn add_files(&mut self, files: &mut [LibraryFile]) -> CatalogResult<()> {
        let txn = self.db.begin_write().map_err(redb_error("begin_write"))?;
        {
            let mut table = txn
                .open_table(FILES_TABLE)
                .map_err(redb_error("open_table"))?;
            let mut next_id = table
                .last()
                .map_err(redb_error("last"))?
                .map_or(1, |(key, _)| key.value() + 1);
            for file in files.iter_mut() {
                file.id = next_id;
                next_id += 1;
                table
                    .insert(file.id, encode(&*file)?.as_slice())
                    .map_err(redb_error("insert"))?;
            }
        }
        for file in files.iter() {
            match file.domain {
                Domain::NonFiction => link_file::<NonFictionBook>(&txn, file)?,
                Domain::Fiction => link_file::<FictionBook>(&txn, file)?,
                Domain::SciMag => link_file::<SciMagArticle>(&txn, file)?,
            }
        }
        txn.commit().map_err(redb_error("commit"))?;
        tracing::info!(count = files.len(), "added library files");
        Ok(())
    }

    /// All stored library files, ordered by id.
    pub fn files(&self) -> CatalogResult<Vec<LibraryFile>> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(FILES_TABLE)
            .map_err(redb_error("open_table"))?;
        let mut files = Vec::new();
        for entry in table.iter().map_err(redb_error("iter"))? {
            let (_, value) = entry.map_err(redb_error("iter"))?;
            files.push(decode(value.value())?);
        }
        Ok(files)
    }
}

/// Point a record at its scanned file. A file referring to a missing record is
/// logged and left unlinked.
fn link_file<T: CatalogObject>(txn: &WriteTransaction, file: &LibraryFile) -> CatalogResult<()> {
    let mut table = txn
        .open_table(domain_tables(T::DOMAIN).objects)
        .map_err(redb_error("open_table"))?;
    let existing = table
        .get(file.object_id)
        .map_err(redb_error("get"))?
        .map(|guard| guard.value().to_vec());
    let Some(bytes) = existing else {
        tracing::warn!(
            object_id = file.object_id,
            domain = %T::DOMAIN,
            "library file refers to a missing record"
        );
        return Ok(());
    };
    let mut object: T = decode(&bytes)?;
    object.set_file_id(Some(file.id));
    table
        .insert(file.object_id, encode(&object)?.as_slice())
        .map_err(redb_error("insert"))?;
    Ok(())
}

/// Raise the domain's watermark if `candidate` is newer.
fn advance_watermark(
    txn: &WriteTransaction,
    domain: Domain,
    candidate: Option<&str>,
) -> CatalogResult<()> {
    let Some(candidate) = candidate.filter(|stamp| !stamp.is_empty()) else {
        return Ok(());
    };
    let mut table = txn
        .open_table(WATERMARK_TABLE)
        .map_err(redb_error("open_table"))?;
    let current = table
        .get(domain.as_str())
        .map_err(redb_error("get"))?
        .map(|guard| guard.value().to_string());
    if current.as_deref().is_none_or(|current| candidate > current) {
        table
            .insert(domain.as_str(), candidate)
            .map_err(redb_error("insert"))?;
    }
    Ok(())
}

impl<T: CatalogObject> ObjectCatalog<T> for LocalDatabase {
    fn count(&self) -> CatalogResult<u64> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(domain_tables(T::DOMAIN).objects)
            .map_err(redb_error("open_table"))?;
        table.len().map_err(redb_error("len"))
    }

    fn existence_index(&self) -> CatalogResult<ExistenceIndex> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(domain_tables(T::DOMAIN).libgen_ids)
            .map_err(redb_error("open_table"))?;
        let mut index = ExistenceIndex::new();
        for entry in table.iter().map_err(redb_error("iter"))? {
            let (key, _) = entry.map_err(redb_error("iter"))?;
            index.insert(key.value());
        }
        Ok(index)
    }

    fn find_id_by_libgen_id(&self, libgen_id: u32) -> CatalogResult<Option<u64>> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(domain_tables(T::DOMAIN).libgen_ids)
            .map_err(redb_error("open_table"))?;
        let id = table
            .get(libgen_id)
            .map_err(redb_error("get"))?
            .map(|guard| guard.value());
        Ok(id)
    }

    fn insert_batch(&mut self, objects: &mut [T]) -> CatalogResult<()> {
        let tables = domain_tables(T::DOMAIN);
        let txn = self.db.begin_write().map_err(redb_error("begin_write"))?;
        {
            let mut object_table = txn
                .open_table(tables.objects)
                .map_err(redb_error("open_table"))?;
            let mut libgen_table = txn
                .open_table(tables.libgen_ids)
                .map_err(redb_error("open_table"))?;
            let mut md5_table = txn
                .open_table(tables.md5)
                .map_err(redb_error("open_table"))?;
            let mut next_id = object_table
                .last()
                .map_err(redb_error("last"))?
                .map_or(1, |(key, _)| key.value() + 1);
            for object in objects.iter_mut() {
                object.set_id(next_id);
                next_id += 1;
                object_table
                    .insert(object.id(), encode(&*object)?.as_slice())
                    .map_err(redb_error("insert"))?;
                libgen_table
                    .insert(object.libgen_id(), object.id())
                    .map_err(redb_error("insert"))?;
                let md5 = object.md5().to_ascii_lowercase();
                if !md5.is_empty() {
                    md5_table
                        .insert(md5.as_str(), object.id())
                        .map_err(redb_error("insert"))?;
                }
            }
        }
        let newest = objects.iter().map(|o| o.modified_at()).max();
        advance_watermark(&txn, T::DOMAIN, newest)?;
        txn.commit().map_err(redb_error("commit"))
    }

    fn update_batch(&mut self, objects: &[T]) -> CatalogResult<()> {
        let tables = domain_tables(T::DOMAIN);
        let txn = self.db.begin_write().map_err(redb_error("begin_write"))?;
        {
            let mut object_table = txn
                .open_table(tables.objects)
                .map_err(redb_error("open_table"))?;
            let mut libgen_table = txn
                .open_table(tables.libgen_ids)
                .map_err(redb_error("open_table"))?;
            let mut md5_table = txn
                .open_table(tables.md5)
                .map_err(redb_error("open_table"))?;
            for object in objects {
                let mut stored = object.clone();
                let previous = object_table
                    .get(stored.id())
                    .map_err(redb_error("get"))?
                    .map(|guard| guard.value().to_vec());
                if let Some(bytes) = previous {
                    let previous: T = decode(&bytes)?;
                    // Dumps never carry file links; keep the scanned one.
                    if stored.file_id().is_none() {
                        stored.set_file_id(previous.file_id());
                    }
                    let previous_md5 = previous.md5().to_ascii_lowercase();
                    if !previous_md5.is_empty()
                        && previous_md5 != stored.md5().to_ascii_lowercase()
                    {
                        // Another record may own the old hash by now.
                        let owner = md5_table
                            .get(previous_md5.as_str())
                            .map_err(redb_error("get"))?
                            .map(|guard| guard.value());
                        if owner == Some(stored.id()) {
                            md5_table
                                .remove(previous_md5.as_str())
                                .map_err(redb_error("remove"))?;
                        }
                    }
                }
                object_table
                    .insert(stored.id(), encode(&stored)?.as_slice())
                    .map_err(redb_error("insert"))?;
                libgen_table
                    .insert(stored.libgen_id(), stored.id())
                    .map_err(redb_error("insert"))?;
                let md5 = stored.md5().to_ascii_lowercase();
                if !md5.is_empty() {
                    md5_table
                        .insert(md5.as_str(), stored.id())
                        .map_err(redb_error("insert"))?;
                }
            }
        }
        let newest = objects.iter().map(|o| o.modified_at()).max();
        advance_watermark(&txn, T::DOMAIN, newest)?;
        txn.commit().map_err(redb_error("commit"))
    }

    fn find_by_md5(&self, md5: &str) -> CatalogResult<Option<T>> {
        let id = {
            let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
            let table = txn
                .open_table(domain_tables(T::DOMAIN).md5)
                .map_err(redb_error("open_table"))?;
            table
                .get(md5.to_ascii_lowercase().as_str())
                .map_err(redb_error("get"))?
                .map(|guard| guard.value())
        };
        match id {
            Some(id) => self.get_object::<T>(id),
            None => Ok(None),
        }
    }

    fn last_modified(&self) -> CatalogResult<Option<String>> {
        let txn = self.db.begin_read().map_err(redb_error("begin_read"))?;
        let table = txn
            .open_table(WATERMARK_TABLE)
            .map_err(redb_error("open_table"))?;
        let stamp = table
            .get(T::DOMAIN.as_str())
            .map_err(redb_error("get"))?
            .map(|guard| guard.value().to_string());
        Ok(stamp)
    }
}

impl std::fmt::Debug for LocalDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDatabase")
            .field("path", &self.path)
            .finish()
    }
}
