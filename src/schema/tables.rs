//! Canonical Library Genesis table schemas.
//!
//! Column sets follow the public `libgen`, `fiction` and `scimag` dumps.
//! Columns the catalog model does not keep are declared as ignored so that
//! full dumps still match.

use std::sync::OnceLock;

use crate::catalog::{Domain, FictionBook, NonFictionBook, SciMagArticle};
use crate::dump::ColumnType::{Integer, Text, Timestamp};
use crate::dump::SqlValue;
use crate::schema::definition::TableDefinition;

static NON_FICTION: OnceLock<TableDefinition<NonFictionBook>> = OnceLock::new();
static FICTION: OnceLock<TableDefinition<FictionBook>> = OnceLock::new();
static SCIMAG: OnceLock<TableDefinition<SciMagArticle>> = OnceLock::new();

/// Library Genesis ids are positive 32-bit integers; anything else becomes 0.
fn to_libgen_id(value: SqlValue) -> u32 {
    match value.as_i64().map(u32::try_from) {
        Some(Ok(id)) => id,
        _ => {
            tracing::warn!(value = ?value, "Library Genesis id out of range, storing 0");
            0
        }
    }
}

fn to_u64(value: SqlValue) -> u64 {
    value
        .as_i64()
        .and_then(|n| u64::try_from(n).ok())
        .unwrap_or_default()
}

/// Schema of the non-fiction `updated` table.
pub fn non_fiction_table() -> &'static TableDefinition<NonFictionBook> {
    NON_FICTION.get_or_init(|| {
        TableDefinition::<NonFictionBook>::new(Domain::NonFiction, &["updated", "nonfiction"])
            .column("ID", Integer, |b, v| b.libgen_id = to_libgen_id(v))
            .column("Title", Text, |b, v| b.title = v.into_text())
            .column("VolumeInfo", Text, |b, v| b.volume_info = v.into_text())
            .column("Series", Text, |b, v| b.series = v.into_text())
            .column("Periodical", Text, |b, v| b.periodical = v.into_text())
            .column("Author", Text, |b, v| b.authors = v.into_text())
            .column("Year", Text, |b, v| b.year = v.into_text())
            .column("Edition", Text, |b, v| b.edition = v.into_text())
            .column("Publisher", Text, |b, v| b.publisher = v.into_text())
            .column("City", Text, |b, v| b.city = v.into_text())
            .column("Pages", Text, |b, v| b.pages = v.into_text())
            .ignored("PagesInFile", Integer)
            .column("Language", Text, |b, v| b.language = v.into_text())
            .column("Topic", Text, |b, v| b.topic = v.into_text())
            .ignored("Library", Text)
            .ignored("Issue", Text)
            .column("Identifier", Text, |b, v| b.identifier = v.into_text())
            .column("ISSN", Text, |b, v| b.issn = v.into_text())
            .ignored("ASIN", Text)
            .ignored("UDC", Text)
            .ignored("LBC", Text)
            .ignored("DDC", Text)
            .ignored("LCC", Text)
            .column("Doi", Text, |b, v| b.doi = v.into_text())
            .ignored("Googlebookid", Text)
            .ignored("OpenLibraryID", Text)
            .column("Commentary", Text, |b, v| b.commentary = v.into_text())
            .ignored("DPI", Integer)
            .ignored("Color", Text)
            .ignored("Cleaned", Text)
            .ignored("Orientation", Text)
            .ignored("Paginated", Text)
            .ignored("Scanned", Text)
            .ignored("Bookmarked", Text)
            .ignored("Searchable", Text)
            .column("Filesize", Integer, |b, v| b.size_in_bytes = to_u64(v))
            .column("Extension", Text, |b, v| b.format = v.into_text())
            .column("MD5", Text, |b, v| b.md5 = v.into_text().to_ascii_lowercase())
            .ignored("Generic", Text)
            .column("Visible", Text, |b, v| b.visible = v.into_text())
            .ignored("Locator", Text)
            .ignored("Local", Integer)
            .column("TimeAdded", Timestamp, |b, v| b.added_at = v.into_text())
            .column("TimeLastModified", Timestamp, |b, v| {
                b.last_modified_at = v.into_text()
            })
            .column("Coverurl", Text, |b, v| b.cover_url = v.into_text())
            .column("Tags", Text, |b, v| b.tags = v.into_text())
            .ignored("IdentifierWODash", Text)
    })
}

/// Schema of the `fiction` table.
pub fn fiction_table() -> &'static TableDefinition<FictionBook> {
    FICTION.get_or_init(|| {
        TableDefinition::<FictionBook>::new(Domain::Fiction, &["fiction"])
            .column("ID", Integer, |b, v| b.libgen_id = to_libgen_id(v))
            .column("MD5", Text, |b, v| b.md5 = v.into_text().to_ascii_lowercase())
            .column("Title", Text, |b, v| b.title = v.into_text())
            .column("Author", Text, |b, v| b.authors = v.into_text())
            .column("Series", Text, |b, v| b.series = v.into_text())
            .column("Edition", Text, |b, v| b.edition = v.into_text())
            .column("Language", Text, |b, v| b.language = v.into_text())
            .column("Year", Text, |b, v| b.year = v.into_text())
            .column("Publisher", Text, |b, v| b.publisher = v.into_text())
            .column("Pages", Text, |b, v| b.pages = v.into_text())
            .column("Identifier", Text, |b, v| b.identifier = v.into_text())
            .ignored("GooglebookID", Text)
            .ignored("ASIN", Text)
            .column("Coverurl", Text, |b, v| b.cover_url = v.into_text())
            .column("Extension", Text, |b, v| b.format = v.into_text())
            .column("Filesize", Integer, |b, v| b.size_in_bytes = to_u64(v))
            .ignored("Library", Text)
            .ignored("Issue", Integer)
            .ignored("Locator", Text)
            .column("Commentary", Text, |b, v| b.commentary = v.into_text())
            .ignored("Generic", Text)
            .column("Visible", Text, |b, v| b.visible = v.into_text())
            .column("TimeAdded", Timestamp, |b, v| b.added_at = v.into_text())
            .column("TimeLastModified", Timestamp, |b, v| {
                b.last_modified_at = v.into_text()
            })
    })
}

/// Schema of the `scimag` table.
pub fn scimag_table() -> &'static TableDefinition<SciMagArticle> {
    SCIMAG.get_or_init(|| {
        TableDefinition::<SciMagArticle>::new(Domain::SciMag, &["scimag"])
            .column("ID", Integer, |a, v| a.libgen_id = to_libgen_id(v))
            .column("DOI", Text, |a, v| a.doi = v.into_text())
            .ignored("DOI2", Text)
            .column("Title", Text, |a, v| a.title = v.into_text())
            .column("Author", Text, |a, v| a.authors = v.into_text())
            .column("Year", Text, |a, v| a.year = v.into_text())
            .column("Month", Text, |a, v| a.month = v.into_text())
            .column("Day", Text, |a, v| a.day = v.into_text())
            .column("Volume", Text, |a, v| a.volume = v.into_text())
            .column("Issue", Text, |a, v| a.issue = v.into_text())
            .column("First_page", Text, |a, v| a.first_page = v.into_text())
            .column("Last_page", Text, |a, v| a.last_page = v.into_text())
            .column("Journal", Text, |a, v| a.journal = v.into_text())
            .column("ISBN", Text, |a, v| a.isbn = v.into_text())
            .column("ISSNP", Text, |a, v| a.issnp = v.into_text())
            .column("ISSNE", Text, |a, v| a.issne = v.into_text())
            .column("MD5", Text, |a, v| a.md5 = v.into_text().to_ascii_lowercase())
            .column("Filesize", Integer, |a, v| a.size_in_bytes = to_u64(v))
            .column("TimeAdded", Timestamp, |a, v| a.added_at = v.into_text())
            .ignored("JOURNALID", Text)
            .ignored("AbstractURL", Text)
            .ignored("Attribute1", Text)
            .ignored("Attribute2", Text)
            .ignored("Attribute3", Text)
            .ignored("Attribute4", Text)
            .ignored("Attribute5", Text)
            .ignored("Attribute6", Text)
            .ignored("visible", Text)
            .column("PubmedID", Text, |a, v| a.pubmed_id = v.into_text())
            .ignored("PMC", Text)
            .ignored("PII", Text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonfiction_setters_fill_record() {
        let setters = non_fiction_table().sorted_column_setters(["ID", "Title", "MD5", "Filesize"]);
        let mut book = NonFictionBook::default();
        let values = [
            SqlValue::Integer(42),
            SqlValue::Text("Algorithms".into()),
            SqlValue::Text("ABCDEF".into()),
            SqlValue::Text("1024".into()),
        ];
        for (setter, value) in setters.into_iter().zip(values) {
            if let Some(setter) = setter {
                setter(&mut book, value);
            }
        }
        assert_eq!(book.libgen_id, 42);
        assert_eq!(book.title, "Algorithms");
        assert_eq!(book.md5, "abcdef");
        assert_eq!(book.size_in_bytes, 1024);
    }

    #[test]
    fn out_of_range_id_falls_back_to_zero() {
        let setters = fiction_table().sorted_column_setters(["ID"]);
        let Some(setter) = setters[0] else {
            panic!("ID column has a setter");
        };
        for value in [
            SqlValue::Integer(-5),
            SqlValue::Integer(i64::from(u32::MAX) + 1),
            SqlValue::Text("abc".into()),
        ] {
            let mut book = FictionBook {
                libgen_id: 9,
                ..Default::default()
            };
            setter(&mut book, value);
            assert_eq!(book.libgen_id, 0);
        }
        assert_eq!(to_libgen_id(SqlValue::Integer(i64::from(u32::MAX))), u32::MAX);
    }

    #[test]
    fn registries_are_built_once() {
        assert!(std::ptr::eq(scimag_table(), scimag_table()));
        assert_eq!(scimag_table().domain(), Domain::SciMag);
        assert!(scimag_table().get_column("first_page").is_some());
    }
}
