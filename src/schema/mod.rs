//! Schema matching: recognizing which catalog domain a dump table belongs to.
//!
//! Each domain has one canonical [`TableDefinition`]. A parsed table matches
//! when its name is registered for the domain and every column it declares
//! exists canonically with the same type. Dumps may omit canonical columns;
//! they may never add or retype one.

pub mod definition;
pub mod tables;

pub use definition::{CanonicalSchema, ColumnDefinition, TableDefinition};
pub use tables::{fiction_table, non_fiction_table, scimag_table};

use crate::catalog::Domain;
use crate::dump::ParsedTableDefinition;

/// Every canonical schema, one per domain.
pub fn registry() -> [&'static dyn CanonicalSchema; 3] {
    [non_fiction_table(), fiction_table(), scimag_table()]
}

/// Canonical schema registered under `table_name` (exact, case-sensitive).
pub fn find_schema(table_name: &str) -> Option<&'static dyn CanonicalSchema> {
    registry()
        .into_iter()
        .find(|schema| schema.table_names().contains(&table_name))
}

/// Detect the domain of a parsed table. `None` means the table is unknown or
/// its columns do not fit the canonical schema.
pub fn detect_table_type(table: &ParsedTableDefinition) -> Option<Domain> {
    let Some(schema) = find_schema(&table.table_name) else {
        tracing::debug!(table = %table.table_name, "no canonical schema for table");
        return None;
    };
    if !schema.is_compatible(table) {
        tracing::debug!(
            table = %table.table_name,
            domain = %schema.domain(),
            "table columns do not match the canonical schema"
        );
        return None;
    }
    Some(schema.domain())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::{ColumnType, ParsedColumnDefinition};

    fn table(name: &str, columns: &[(&str, ColumnType)]) -> ParsedTableDefinition {
        ParsedTableDefinition {
            table_name: name.into(),
            columns: columns
                .iter()
                .map(|(column_name, column_type)| ParsedColumnDefinition {
                    column_name: column_name.to_string(),
                    column_type: *column_type,
                })
                .collect(),
        }
    }

    #[test]
    fn detects_each_domain() {
        let nonfiction = table(
            "updated",
            &[
                ("ID", ColumnType::Integer),
                ("Title", ColumnType::Text),
                ("MD5", ColumnType::Text),
                ("TimeLastModified", ColumnType::Timestamp),
            ],
        );
        assert_eq!(detect_table_type(&nonfiction), Some(Domain::NonFiction));

        let fiction = table("fiction", &[("id", ColumnType::Integer)]);
        assert_eq!(detect_table_type(&fiction), Some(Domain::Fiction));

        let scimag = table(
            "scimag",
            &[("ID", ColumnType::Integer), ("DOI", ColumnType::Text)],
        );
        assert_eq!(detect_table_type(&scimag), Some(Domain::SciMag));
    }

    #[test]
    fn alias_table_name_is_registered() {
        let nonfiction = table("nonfiction", &[("ID", ColumnType::Integer)]);
        assert_eq!(detect_table_type(&nonfiction), Some(Domain::NonFiction));
    }

    #[test]
    fn table_name_is_case_sensitive() {
        let upper = table("Updated", &[("ID", ColumnType::Integer)]);
        assert_eq!(detect_table_type(&upper), None);
    }

    #[test]
    fn unknown_table_or_columns_are_rejected() {
        assert_eq!(
            detect_table_type(&table("topics", &[("ID", ColumnType::Integer)])),
            None
        );
        let extra = table(
            "updated",
            &[("ID", ColumnType::Integer), ("Rating", ColumnType::Text)],
        );
        assert_eq!(detect_table_type(&extra), None);
        let mistyped = table("updated", &[("ID", ColumnType::Text)]);
        assert_eq!(detect_table_type(&mistyped), None);
        let other = table("fiction", &[("ID", ColumnType::Other)]);
        assert_eq!(detect_table_type(&other), None);
    }
}
