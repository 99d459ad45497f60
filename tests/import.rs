//! End-to-end dump import tests against a real catalog file.
//!
//! Each test writes a small MySQL dump to a temp directory, imports it, and
//! inspects the resulting catalog.

use std::io::Write;
use std::path::{Path, PathBuf};

use libgen_server::catalog::{Domain, LocalDatabase, NonFictionBook, ObjectCatalog};
use libgen_server::import::{ImportError, ImportSettings, import_file};

const NON_FICTION_TABLE: &str = "\
-- MySQL dump 10.13  Distrib 5.7.26
/*!40101 SET NAMES utf8 */;
DROP TABLE IF EXISTS `updated`;
CREATE TABLE `updated` (
  `ID` int(15) unsigned NOT NULL AUTO_INCREMENT,
  `Title` varchar(2000) DEFAULT '',
  `MD5` char(32) DEFAULT NULL,
  `TimeLastModified` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP,
  PRIMARY KEY (`ID`),
  UNIQUE KEY `MD5_UNIQUE` (`MD5`)
) ENGINE=MyISAM DEFAULT CHARSET=utf8;
LOCK TABLES `updated` WRITE;
";

fn non_fiction_dump(values: &str) -> String {
    format!("{NON_FICTION_TABLE}INSERT INTO `updated` VALUES {values};\nUNLOCK TABLES;\n")
}

fn write_dump(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn new_database(dir: &Path) -> LocalDatabase {
    LocalDatabase::create(&dir.join("libgen.redb")).unwrap()
}

fn book_by_libgen_id(db: &LocalDatabase, libgen_id: u32) -> NonFictionBook {
    let id = ObjectCatalog::<NonFictionBook>::find_id_by_libgen_id(db, libgen_id)
        .unwrap()
        .unwrap();
    db.get_object(id).unwrap().unwrap()
}

#[test]
fn first_import_adds_every_row() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "libgen.sql",
        &non_fiction_dump(
            "(10,'Alpha','AA10','2020-01-01 00:00:00'),\
             (20,'Beta','aa20','2020-01-02 00:00:00'),\
             (30,'Gamma','aa30','2020-01-03 00:00:00')",
        ),
    );

    let mut reports = Vec::new();
    let summary = import_file(
        &mut db,
        &dump,
        Domain::NonFiction,
        &ImportSettings::default(),
        |added, updated| reports.push((added, updated)),
    )
    .unwrap();

    assert_eq!(summary.domain, Domain::NonFiction);
    assert_eq!(summary.table_name, "updated");
    assert_eq!(summary.outcome.added, 3);
    assert_eq!(summary.outcome.updated, 0);
    assert_eq!(reports.first(), Some(&(0, 0)));
    assert_eq!(reports.last(), Some(&(3, 0)));

    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 3);
    assert!(db.metadata().unwrap().first_import_complete(Domain::NonFiction));
    assert!(!db.metadata().unwrap().first_import_complete(Domain::Fiction));

    let alpha: NonFictionBook = db.find_by_md5("aa10").unwrap().unwrap();
    assert_eq!(alpha.libgen_id, 10);
    assert_eq!(alpha.title, "Alpha");
}

#[test]
fn reimport_updates_only_newer_rows() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let settings = ImportSettings::default();

    let first = write_dump(
        dir.path(),
        "first.sql",
        &non_fiction_dump(
            "(10,'Alpha','aa10','2020-01-01 00:00:00'),\
             (20,'Beta','aa20','2020-01-02 00:00:00'),\
             (30,'Gamma','aa30','2020-01-03 00:00:00')",
        ),
    );
    import_file(&mut db, &first, Domain::NonFiction, &settings, |_, _| {}).unwrap();
    let beta_id = ObjectCatalog::<NonFictionBook>::find_id_by_libgen_id(&db, 20)
        .unwrap()
        .unwrap();

    // Same content again: nothing is newer than the stored watermark.
    let summary = import_file(&mut db, &first, Domain::NonFiction, &settings, |_, _| {}).unwrap();
    assert_eq!(summary.outcome.added, 0);
    assert_eq!(summary.outcome.updated, 0);
    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 3);

    let second = write_dump(
        dir.path(),
        "second.sql",
        &non_fiction_dump(
            "(10,'Alpha','aa10','2020-01-01 00:00:00'),\
             (20,'Beta, 2nd edition','aa21','2021-06-01 12:00:00'),\
             (40,'Delta','aa40','2021-06-02 00:00:00')",
        ),
    );
    let summary = import_file(&mut db, &second, Domain::NonFiction, &settings, |_, _| {}).unwrap();
    assert_eq!(summary.outcome.added, 1);
    assert_eq!(summary.outcome.updated, 1);
    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 4);

    let beta = book_by_libgen_id(&db, 20);
    assert_eq!(beta.id, beta_id);
    assert_eq!(beta.title, "Beta, 2nd edition");
    assert!(ObjectCatalog::<NonFictionBook>::find_by_md5(&db, "aa20")
        .unwrap()
        .is_none());
    assert_eq!(book_by_libgen_id(&db, 40).title, "Delta");
    assert_eq!(
        ObjectCatalog::<NonFictionBook>::last_modified(&db).unwrap(),
        Some("2021-06-02 00:00:00".to_string())
    );
}

#[test]
fn small_batches_commit_everything() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let rows: Vec<String> = (1..=7)
        .map(|id| format!("({id},'Book {id}','md5-{id}','2020-01-01 00:00:00')"))
        .collect();
    let dump = write_dump(dir.path(), "libgen.sql", &non_fiction_dump(&rows.join(",")));
    let settings = ImportSettings {
        batch_size: 2,
        ..Default::default()
    };

    let summary = import_file(&mut db, &dump, Domain::NonFiction, &settings, |_, _| {}).unwrap();
    assert_eq!(summary.outcome.added, 7);
    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 7);
    assert_eq!(book_by_libgen_id(&db, 7).md5, "md5-7");
}

#[test]
fn gzip_dump_is_decompressed() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let path = dir.path().join("libgen.sql.gz");
    let mut encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    encoder
        .write_all(non_fiction_dump("(5,'Zipped','aa05','2020-01-01 00:00:00')").as_bytes())
        .unwrap();
    encoder.finish().unwrap();

    let summary = import_file(
        &mut db,
        &path,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap();
    assert_eq!(summary.outcome.added, 1);
    assert_eq!(book_by_libgen_id(&db, 5).title, "Zipped");
}

#[test]
fn single_file_tarball_is_imported() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = non_fiction_dump("(6,'Archived','aa06','2020-01-01 00:00:00')");
    let path = dir.path().join("libgen.tgz");
    let encoder = flate2::write::GzEncoder::new(
        std::fs::File::create(&path).unwrap(),
        flate2::Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(dump.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "libgen.sql", dump.as_bytes())
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    let summary = import_file(
        &mut db,
        &path,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap();
    assert_eq!(summary.outcome.added, 1);
    assert_eq!(book_by_libgen_id(&db, 6).title, "Archived");
}

#[test]
fn requesting_the_wrong_format_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "libgen.sql",
        &non_fiction_dump("(1,'One','aa01','2020-01-01 00:00:00')"),
    );

    let err = import_file(
        &mut db,
        &dump,
        Domain::Fiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap_err();
    assert!(matches!(
        err,
        ImportError::FormatMismatch {
            expected: Domain::Fiction,
            found: Domain::NonFiction,
        }
    ));
    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 0);
    assert!(!db.metadata().unwrap().first_import_complete(Domain::NonFiction));
}

#[test]
fn unknown_tables_are_skipped() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let content = format!(
        "CREATE TABLE `description` (\n  `md5` varchar(32) NOT NULL,\n  `descr` text\n) ENGINE=MyISAM;\n\
         INSERT INTO `description` VALUES ('aa01','ignored');\n{}",
        non_fiction_dump("(1,'One','aa01','2020-01-01 00:00:00')")
    );
    let dump = write_dump(dir.path(), "libgen.sql", &content);

    let summary = import_file(
        &mut db,
        &dump,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap();
    assert_eq!(summary.table_name, "updated");
    assert_eq!(summary.outcome.added, 1);
}

#[test]
fn dump_without_supported_table_fails() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "other.sql",
        "CREATE TABLE `topics` (\n  `id` int(11) NOT NULL\n);\nINSERT INTO `topics` VALUES (1);\n",
    );

    let err = import_file(
        &mut db,
        &dump,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap_err();
    assert!(matches!(err, ImportError::TableNotFound));
}

#[test]
fn table_without_inserts_has_no_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "empty.sql",
        &format!("{NON_FICTION_TABLE}UNLOCK TABLES;\n"),
    );

    let err = import_file(
        &mut db,
        &dump,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap_err();
    match err {
        ImportError::NoData { table } => assert_eq!(table, "updated"),
        other => panic!("expected NoData, got {other:?}"),
    }
    assert!(!db.metadata().unwrap().first_import_complete(Domain::NonFiction));
}

#[test]
fn malformed_row_aborts_after_committed_batches() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "broken.sql",
        &non_fiction_dump(
            "(1,'One','aa01','2020-01-01 00:00:00'),\
             (2,'Two','aa02','2020-01-01 00:00:00'),\
             (3,'Three','aa03')",
        ),
    );
    let settings = ImportSettings {
        batch_size: 1,
        ..Default::default()
    };

    let err = import_file(&mut db, &dump, Domain::NonFiction, &settings, |_, _| {}).unwrap_err();
    assert!(matches!(err, ImportError::Dump(_)));
    assert_eq!(ObjectCatalog::<NonFictionBook>::count(&db).unwrap(), 2);
    assert!(!db.metadata().unwrap().first_import_complete(Domain::NonFiction));
}

#[test]
fn nonfiction_alias_with_column_subset() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = new_database(dir.path());
    let dump = write_dump(
        dir.path(),
        "nonfiction.sql",
        "CREATE TABLE `nonfiction` (\n  `ID` int(11) NOT NULL,\n  `Title` text,\n  `Md5` text\n);\n\
         INSERT INTO `nonfiction` VALUES (10,'Ten','a10'),(20,'Twenty','a20'),(30,'Thirty','a30');\n",
    );

    let summary = import_file(
        &mut db,
        &dump,
        Domain::NonFiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap();
    assert_eq!(summary.domain, Domain::NonFiction);
    assert_eq!(summary.outcome.added, 3);
    assert_eq!(summary.outcome.updated, 0);
    assert_eq!(book_by_libgen_id(&db, 30).md5, "a30");
}
