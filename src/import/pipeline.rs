//! Per-file import driver: dump reader → schema matcher → importer → catalog.

use std::path::Path;

use crate::catalog::{CatalogObject, Domain, LocalDatabase};
use crate::dump::{LineCommand, ParsedTableDefinition, SqlDumpReader};
use crate::import::error::{ImportError, ImportResult};
use crate::import::importer::{ImportOutcome, ImportSettings, Importer};
use crate::schema::{
    TableDefinition, detect_table_type, fiction_table, non_fiction_table, scimag_table,
};

/// Result of importing one dump file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub domain: Domain,
    pub table_name: String,
    pub outcome: ImportOutcome,
}

/// Open `path` and import it into `database`.
pub fn import_file<P>(
    database: &mut LocalDatabase,
    path: &Path,
    expected: Domain,
    settings: &ImportSettings,
    progress: P,
) -> ImportResult<ImportSummary>
where
    P: FnMut(u64, u64),
{
    tracing::info!(path = %path.display(), format = expected.format_name(), "importing dump");
    let mut reader = SqlDumpReader::open(path)?;
    import_dump(database, &mut reader, expected, settings, progress)
}

/// Import the first supported table of a dump.
///
/// Tables that match no canonical schema are skipped. The first matching
/// table must belong to `expected`; its rows are imported and the domain's
/// first-import flag is set. Everything after that table is left unread.
pub fn import_dump<P>(
    database: &mut LocalDatabase,
    reader: &mut SqlDumpReader,
    expected: Domain,
    settings: &ImportSettings,
    progress: P,
) -> ImportResult<ImportSummary>
where
    P: FnMut(u64, u64),
{
    loop {
        if !advance_to(reader, LineCommand::CreateTable, None)? {
            return Err(ImportError::TableNotFound);
        }
        let table = reader.parse_table_definition()?;
        let Some(domain) = detect_table_type(&table) else {
            tracing::info!(
                table = %table.table_name,
                "table does not match any supported format, skipping"
            );
            continue;
        };
        if domain != expected {
            return Err(ImportError::FormatMismatch {
                expected,
                found: domain,
            });
        }
        tracing::info!(
            table = %table.table_name,
            format = domain.format_name(),
            "found matching import format"
        );

        if !advance_to(reader, LineCommand::Insert, Some(&table.table_name))? {
            return Err(ImportError::NoData {
                table: table.table_name,
            });
        }

        let outcome = match domain {
            Domain::NonFiction => {
                import_table(database, reader, non_fiction_table(), &table, settings, progress)?
            }
            Domain::Fiction => {
                import_table(database, reader, fiction_table(), &table, settings, progress)?
            }
            Domain::SciMag => {
                import_table(database, reader, scimag_table(), &table, settings, progress)?
            }
        };

        let mut metadata = database.metadata()?;
        metadata.mark_first_import_complete(domain);
        database.update_metadata(&metadata)?;
        tracing::info!(
            table = %table.table_name,
            added = outcome.added,
            updated = outcome.updated,
            "dump import complete"
        );
        return Ok(ImportSummary {
            domain,
            table_name: table.table_name,
            outcome,
        });
    }
}

/// Read lines until one of kind `command` (optionally for `table`) is current.
fn advance_to(
    reader: &mut SqlDumpReader,
    command: LineCommand,
    table: Option<&str>,
) -> ImportResult<bool> {
    while reader.read_line()? {
        if reader.current_line_command() == command
            && table.is_none_or(|name| reader.current_table_name() == Some(name))
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn import_table<T, P>(
    database: &mut LocalDatabase,
    reader: &mut SqlDumpReader,
    schema: &TableDefinition<T>,
    table: &ParsedTableDefinition,
    settings: &ImportSettings,
    progress: P,
) -> ImportResult<ImportOutcome>
where
    T: CatalogObject,
    P: FnMut(u64, u64),
{
    // An explicit INSERT column list wins over the declared column order.
    let setters = match reader.insert_columns() {
        Some(columns) => schema.sorted_column_setters(columns.iter().map(String::as_str)),
        None => schema.sorted_column_setters(table.column_names()),
    };
    let objects = reader.parse_import_objects(setters)?;
    let mut importer = Importer::<T, LocalDatabase>::for_catalog(database, *settings)?;
    importer.import(objects, progress)
}
