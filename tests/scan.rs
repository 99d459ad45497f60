//! Library scanning against an imported catalog, with real MD5 hashing.

use libgen_server::catalog::{Domain, FictionBook, LocalDatabase, ObjectCatalog};
use libgen_server::import::{ImportSettings, import_file};
use libgen_server::scan::{LibraryScanner, ScanSummary};

// md5("hello") and md5("world").
const HELLO_MD5: &str = "5d41402abc4b2a76b9719d911017c592";
const WORLD_MD5: &str = "7d793037a0760186574b0282f2f435e7";

fn fiction_dump() -> String {
    format!(
        "CREATE TABLE `fiction` (\n  \
           `ID` int(10) unsigned NOT NULL AUTO_INCREMENT,\n  \
           `MD5` char(32) CHARACTER SET ascii DEFAULT NULL,\n  \
           `Title` varchar(2000) DEFAULT '',\n  \
           PRIMARY KEY (`ID`)\n\
         ) ENGINE=MyISAM DEFAULT CHARSET=utf8;\n\
         INSERT INTO `fiction` VALUES (1,'{}','Hello'),(2,'{}','World');\n",
        HELLO_MD5.to_uppercase(),
        WORLD_MD5
    )
}

fn imported_database(dir: &std::path::Path) -> LocalDatabase {
    let mut db = LocalDatabase::create(&dir.join("libgen.redb")).unwrap();
    let dump = dir.join("fiction.sql");
    std::fs::write(&dump, fiction_dump()).unwrap();
    import_file(
        &mut db,
        &dump,
        Domain::Fiction,
        &ImportSettings::default(),
        |_, _| {},
    )
    .unwrap();
    db
}

#[test]
fn scanned_files_are_linked_to_records() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut db = imported_database(dir.path());

    let library = dir.path().join("library");
    std::fs::create_dir_all(library.join("nested")).unwrap();
    std::fs::write(library.join("hello.epub"), "hello").unwrap();
    std::fs::write(library.join("stranger.epub"), "who am I").unwrap();
    std::fs::write(library.join("nested").join("world.fb2"), "world").unwrap();

    let scanner = LibraryScanner::<FictionBook>::new(&library);
    let mut outcome = scanner.scan(&db).unwrap();
    assert_eq!(
        outcome.summary,
        ScanSummary {
            found: 2,
            not_found: 1,
            errors: 0,
        }
    );

    db.add_files(&mut outcome.files).unwrap();
    let files = db.files().unwrap();
    assert_eq!(files.len(), 2);
    assert!(files.iter().all(|f| f.domain == Domain::Fiction));
    assert!(files[0].file_path.ends_with("hello.epub"));
    assert!(files[1].file_path.ends_with("world.fb2"));

    let hello: FictionBook = db.find_by_md5(HELLO_MD5).unwrap().unwrap();
    assert_eq!(hello.title, "Hello");
    assert_eq!(hello.file_id, Some(files[0].id));
    let world: FictionBook = db.find_by_md5(WORLD_MD5).unwrap().unwrap();
    assert_eq!(world.file_id, Some(files[1].id));
}

#[test]
fn other_domains_are_not_matched() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = imported_database(dir.path());
    let library = dir.path().join("library");
    std::fs::create_dir_all(&library).unwrap();
    std::fs::write(library.join("hello.pdf"), "hello").unwrap();

    let scanner = LibraryScanner::<libgen_server::catalog::NonFictionBook>::new(&library);
    let outcome = scanner.scan(&db).unwrap();
    assert_eq!(outcome.summary, ScanSummary::default());
    assert!(outcome.files.is_empty());
    assert_eq!(ObjectCatalog::<FictionBook>::count(&db).unwrap(), 2);
}
