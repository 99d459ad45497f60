//! Local catalog: record types, the per-domain storage contract, and its
//! redb-backed implementation.
//!
//! The importer and scanner only see [`ObjectCatalog`]; [`LocalDatabase`]
//! implements it for every [`CatalogObject`] type and adds the catalog-wide
//! operations (metadata, library files).

pub mod database;
pub mod error;
pub mod existence;
pub mod model;

pub use database::LocalDatabase;
pub use error::{CatalogError, CatalogResult};
pub use existence::ExistenceIndex;
pub use model::{
    CatalogObject, DatabaseMetadata, Domain, FictionBook, LibraryFile, NonFictionBook,
    SciMagArticle,
};

/// Per-domain catalog operations consumed by the importer and the scanner.
pub trait ObjectCatalog<T: CatalogObject> {
    /// Number of records stored for the domain.
    fn count(&self) -> CatalogResult<u64>;

    /// Bitset of every stored Library Genesis id. Only called when `count() > 0`.
    fn existence_index(&self) -> CatalogResult<ExistenceIndex>;

    /// Resolve an external id to the internal id of the stored record.
    fn find_id_by_libgen_id(&self, libgen_id: u32) -> CatalogResult<Option<u64>>;

    /// Store new records, assigning each its internal id.
    fn insert_batch(&mut self, objects: &mut [T]) -> CatalogResult<()>;

    /// Overwrite existing records; each object's `id()` must be set.
    fn update_batch(&mut self, objects: &[T]) -> CatalogResult<()>;

    /// Find a record by the MD5 of its file.
    fn find_by_md5(&self, md5: &str) -> CatalogResult<Option<T>>;

    /// Latest modification stamp stored for the domain.
    fn last_modified(&self) -> CatalogResult<Option<String>>;
}
