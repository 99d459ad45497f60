//! libgen CLI: Library Genesis dump import and library scanning.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use miette::Result;

use libgen_server::catalog::{
    CatalogObject, Domain, FictionBook, LocalDatabase, NonFictionBook, ObjectCatalog,
    SciMagArticle,
};
use libgen_server::config::ServerConfig;
use libgen_server::error::LibgenResult;
use libgen_server::import::import_file;
use libgen_server::logging;
use libgen_server::paths::LibgenPaths;
use libgen_server::scan::{LibraryScanner, ScanSummary};

#[derive(Parser)]
#[command(name = "libgen", version, about = "Library Genesis dump importer and library scanner")]
struct Cli {
    /// Configuration file (defaults to the XDG config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Mirror log output into a file (`--log-file=<path>`). Without a value
    /// the file goes to the XDG state directory.
    #[arg(long, global = true, num_args = 0..=1, require_equals = true)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the catalog database file.
    Database {
        #[command(subcommand)]
        action: DatabaseAction,
    },

    /// Change configuration values.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Import a Library Genesis SQL dump (.sql, .gz, .bz2, or a one-file .tar/.tgz/.tar.bz2).
    Import {
        /// Dump format.
        format: Library,
        /// Dump file.
        file: PathBuf,
    },

    /// Match files in a directory tree to catalog records by MD5.
    Scan {
        /// Library the files belong to.
        library: Library,
        /// Directory to scan recursively.
        directory: PathBuf,
    },
}

#[derive(Subcommand)]
enum DatabaseAction {
    /// Create an empty catalog. Refuses to overwrite an existing file.
    Create {
        /// Database file to create (defaults to the XDG data directory).
        path: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Set the catalog database file.
    Database {
        /// Database file path.
        path: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Library {
    LibgenNonfiction,
    LibgenFiction,
    LibgenScimag,
}

impl From<Library> for Domain {
    fn from(library: Library) -> Self {
        match library {
            Library::LibgenNonfiction => Domain::NonFiction,
            Library::LibgenFiction => Domain::Fiction,
            Library::LibgenScimag => Domain::SciMag,
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();
    let log_file = match cli.log_file {
        Some(Some(path)) => Some(path),
        Some(None) => Some(xdg_paths()?.default_log_file()),
        None => None,
    };
    logging::init(log_file.as_deref())?;
    logging::log_environment();

    let config_path = match cli.config {
        Some(path) => path,
        None => xdg_paths()?.config_file(),
    };

    match cli.command {
        Commands::Database {
            action: DatabaseAction::Create { path },
        } => {
            let path = match path {
                Some(path) => path,
                None => xdg_paths()?.default_database_file(),
            };
            LocalDatabase::create(&path)?;
            println!("Created database {}", path.display());
        }
        Commands::Config {
            action: ConfigAction::Database { path },
        } => {
            let mut config = ServerConfig::load(&config_path)?;
            config.set_database_path(&path);
            config.save(&config_path)?;
            println!(
                "Database path set to {} in {}",
                path.display(),
                config_path.display()
            );
        }
        Commands::Import { format, file } => {
            let config = ServerConfig::load(&config_path)?;
            let mut database = open_database(&config)?;
            run_import(&mut database, &config, format.into(), &file)?;
        }
        Commands::Scan { library, directory } => {
            let config = ServerConfig::load(&config_path)?;
            let mut database = open_database(&config)?;
            let summary = match Domain::from(library) {
                Domain::NonFiction => run_scan::<NonFictionBook>(&mut database, &directory)?,
                Domain::Fiction => run_scan::<FictionBook>(&mut database, &directory)?,
                Domain::SciMag => run_scan::<SciMagArticle>(&mut database, &directory)?,
            };
            println!(
                "Scan complete. Found: {}, not found: {}, errors: {}.",
                summary.found, summary.not_found, summary.errors
            );
        }
    }

    Ok(())
}

/// Resolve the XDG directories and make sure they exist.
fn xdg_paths() -> LibgenResult<LibgenPaths> {
    let paths = LibgenPaths::resolve()?;
    paths.ensure_dirs()?;
    Ok(paths)
}

fn open_database(config: &ServerConfig) -> LibgenResult<LocalDatabase> {
    let path = config.database_path()?;
    tracing::info!(path = %path.display(), "opening database");
    Ok(LocalDatabase::open(&path)?)
}

fn run_import(
    database: &mut LocalDatabase,
    config: &ServerConfig,
    domain: Domain,
    file: &Path,
) -> LibgenResult<()> {
    let settings = config.import_settings();
    let mut stderr = std::io::stderr();
    let summary = import_file(database, file, domain, &settings, |added, updated| {
        if updated > 0 {
            let _ = write!(stderr, "\rBooks added: {added}, updated: {updated}.");
        } else {
            let _ = write!(stderr, "\rBooks added: {added}.");
        }
        let _ = stderr.flush();
    })?;
    eprintln!();
    println!(
        "Imported {} from table `{}`: {} added, {} updated.",
        summary.domain.format_name(),
        summary.table_name,
        summary.outcome.added,
        summary.outcome.updated
    );
    Ok(())
}

fn run_scan<T>(database: &mut LocalDatabase, directory: &Path) -> LibgenResult<ScanSummary>
where
    T: CatalogObject,
    LocalDatabase: ObjectCatalog<T>,
{
    let scanner = LibraryScanner::<T>::new(directory);
    let mut outcome = scanner.scan(&*database)?;
    if outcome.files.is_empty() {
        println!("No files to add to the library.");
    } else {
        database.add_files(&mut outcome.files)?;
        println!("Added {} files to the library.", outcome.files.len());
    }
    Ok(outcome.summary)
}
