//! Core data types for the local catalog.
//!
//! Every importable record implements [`CatalogObject`]: a catalog-assigned
//! internal id, the stable Library Genesis id used for deduplication, an
//! optional link to a scanned file, and the MD5 hash the scanner matches on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Catalog categories, each with its own canonical dump schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    NonFiction,
    Fiction,
    SciMag,
}

impl Domain {
    /// Every supported domain, in a stable order.
    pub const ALL: [Domain; 3] = [Domain::NonFiction, Domain::Fiction, Domain::SciMag];

    /// Stable tag used in table names and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NonFiction => "nonfiction",
            Self::Fiction => "fiction",
            Self::SciMag => "scimag",
        }
    }

    /// Name of the import format / library on the command line.
    pub fn format_name(&self) -> &'static str {
        match self {
            Self::NonFiction => "libgen-nonfiction",
            Self::Fiction => "libgen-fiction",
            Self::SciMag => "libgen-scimag",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by every record the catalog stores.
///
/// The importer and scanner are generic over this trait; the concrete struct
/// is selected by [`CatalogObject::DOMAIN`], never by runtime type inspection.
pub trait CatalogObject: Default + Clone + Serialize + DeserializeOwned {
    /// The domain this record type belongs to.
    const DOMAIN: Domain;

    /// Internal id assigned by the catalog on insert (0 = not yet stored).
    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);

    /// External Library Genesis id, stable across dumps.
    fn libgen_id(&self) -> u32;

    /// Id of the library file linked to this record, if one was scanned.
    fn file_id(&self) -> Option<u64>;
    fn set_file_id(&mut self, file_id: Option<u64>);

    /// Lowercase hex MD5 of the record's file.
    fn md5(&self) -> &str;

    /// Last modification stamp (`YYYY-MM-DD HH:MM:SS`), empty when unknown.
    fn modified_at(&self) -> &str;
}

/// A Library Genesis non-fiction book (`updated` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NonFictionBook {
    pub id: u64,
    pub libgen_id: u32,
    pub file_id: Option<u64>,
    pub title: String,
    pub volume_info: String,
    pub series: String,
    pub periodical: String,
    pub authors: String,
    pub year: String,
    pub edition: String,
    pub publisher: String,
    pub city: String,
    pub pages: String,
    pub language: String,
    pub topic: String,
    pub identifier: String,
    pub issn: String,
    pub doi: String,
    pub commentary: String,
    pub size_in_bytes: u64,
    pub format: String,
    pub md5: String,
    pub cover_url: String,
    pub tags: String,
    pub visible: String,
    pub added_at: String,
    pub last_modified_at: String,
}

impl CatalogObject for NonFictionBook {
    const DOMAIN: Domain = Domain::NonFiction;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn libgen_id(&self) -> u32 {
        self.libgen_id
    }
    fn file_id(&self) -> Option<u64> {
        self.file_id
    }
    fn set_file_id(&mut self, file_id: Option<u64>) {
        self.file_id = file_id;
    }
    fn md5(&self) -> &str {
        &self.md5
    }
    fn modified_at(&self) -> &str {
        &self.last_modified_at
    }
}

/// A Library Genesis fiction book (`fiction` table).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FictionBook {
    pub id: u64,
    pub libgen_id: u32,
    pub file_id: Option<u64>,
    pub title: String,
    pub authors: String,
    pub series: String,
    pub edition: String,
    pub language: String,
    pub year: String,
    pub publisher: String,
    pub pages: String,
    pub identifier: String,
    pub commentary: String,
    pub size_in_bytes: u64,
    pub format: String,
    pub md5: String,
    pub cover_url: String,
    pub visible: String,
    pub added_at: String,
    pub last_modified_at: String,
}

impl CatalogObject for FictionBook {
    const DOMAIN: Domain = Domain::Fiction;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn libgen_id(&self) -> u32 {
        self.libgen_id
    }
    fn file_id(&self) -> Option<u64> {
        self.file_id
    }
    fn set_file_id(&mut self, file_id: Option<u64>) {
        self.file_id = file_id;
    }
    fn md5(&self) -> &str {
        &self.md5
    }
    fn modified_at(&self) -> &str {
        &self.last_modified_at
    }
}

/// A scientific article (`scimag` table).
///
/// Articles carry no modification stamp in the dumps, so `added_at` doubles
/// as the watermark field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SciMagArticle {
    pub id: u64,
    pub libgen_id: u32,
    pub file_id: Option<u64>,
    pub doi: String,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub volume: String,
    pub issue: String,
    pub first_page: String,
    pub last_page: String,
    pub journal: String,
    pub isbn: String,
    pub issnp: String,
    pub issne: String,
    pub md5: String,
    pub size_in_bytes: u64,
    pub pubmed_id: String,
    pub added_at: String,
}

impl CatalogObject for SciMagArticle {
    const DOMAIN: Domain = Domain::SciMag;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn libgen_id(&self) -> u32 {
        self.libgen_id
    }
    fn file_id(&self) -> Option<u64> {
        self.file_id
    }
    fn set_file_id(&mut self, file_id: Option<u64>) {
        self.file_id = file_id;
    }
    fn md5(&self) -> &str {
        &self.md5
    }
    fn modified_at(&self) -> &str {
        &self.added_at
    }
}

/// A file on disk (or inside an archive) matched to a catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryFile {
    /// Assigned by the catalog when the file is added (0 = not yet stored).
    pub id: u64,
    pub file_path: String,
    /// Entry path when the file lives inside an archive.
    pub archive_entry: Option<String>,
    pub domain: Domain,
    /// Internal id of the matched record.
    pub object_id: u64,
}

/// Catalog-wide metadata, written when the database is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub app_name: String,
    pub version: String,
    pub non_fiction_first_import_complete: bool,
    pub fiction_first_import_complete: bool,
    pub scimag_first_import_complete: bool,
}

impl DatabaseMetadata {
    pub const APP_NAME: &'static str = "LibgenServer";
    pub const CURRENT_VERSION: &'static str = "0.1";

    /// Whether a full import has completed for the domain.
    pub fn first_import_complete(&self, domain: Domain) -> bool {
        match domain {
            Domain::NonFiction => self.non_fiction_first_import_complete,
            Domain::Fiction => self.fiction_first_import_complete,
            Domain::SciMag => self.scimag_first_import_complete,
        }
    }

    pub fn mark_first_import_complete(&mut self, domain: Domain) {
        match domain {
            Domain::NonFiction => self.non_fiction_first_import_complete = true,
            Domain::Fiction => self.fiction_first_import_complete = true,
            Domain::SciMag => self.scimag_first_import_complete = true,
        }
    }
}

impl Default for DatabaseMetadata {
    fn default() -> Self {
        Self {
            app_name: Self::APP_NAME.into(),
            version: Self::CURRENT_VERSION.into(),
            non_fiction_first_import_complete: false,
            fiction_first_import_complete: false,
            scimag_first_import_complete: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_tags_are_stable() {
        assert_eq!(Domain::NonFiction.as_str(), "nonfiction");
        assert_eq!(Domain::SciMag.format_name(), "libgen-scimag");
        assert_eq!(Domain::Fiction.to_string(), "fiction");
    }

    #[test]
    fn metadata_flags_per_domain() {
        let mut meta = DatabaseMetadata::default();
        assert!(!meta.first_import_complete(Domain::Fiction));
        meta.mark_first_import_complete(Domain::Fiction);
        assert!(meta.first_import_complete(Domain::Fiction));
        assert!(!meta.first_import_complete(Domain::NonFiction));
        assert!(!meta.first_import_complete(Domain::SciMag));
    }

    #[test]
    fn scimag_watermark_is_added_at() {
        let article = SciMagArticle {
            added_at: "2019-01-01 00:00:00".into(),
            ..Default::default()
        };
        assert_eq!(article.modified_at(), "2019-01-01 00:00:00");
    }
}
