//! Canonical column and table definitions.

use std::collections::HashMap;

use crate::catalog::Domain;
use crate::dump::{ColumnSetter, ColumnType, ParsedColumnDefinition, ParsedTableDefinition};

/// A canonical column: lower-case name and its dump type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub column_name: String,
    pub column_type: ColumnType,
}

impl ColumnDefinition {
    pub fn new(column_name: &str, column_type: ColumnType) -> Self {
        Self {
            column_name: column_name.to_lowercase(),
            column_type,
        }
    }

    /// Same name (ignoring case) and the same type tag.
    pub fn is_compatible(&self, parsed: &ParsedColumnDefinition) -> bool {
        self.column_name == parsed.column_name.to_lowercase()
            && self.column_type == parsed.column_type
    }
}

/// Canonical schema of one domain's dump table.
///
/// Columns map to an optional setter: canonical columns the catalog model does
/// not keep are still declared so that real dumps match, but their values are
/// dropped.
pub struct TableDefinition<T> {
    table_names: &'static [&'static str],
    domain: Domain,
    columns: HashMap<String, (ColumnDefinition, Option<ColumnSetter<T>>)>,
}

impl<T> TableDefinition<T> {
    pub fn new(domain: Domain, table_names: &'static [&'static str]) -> Self {
        Self {
            table_names,
            domain,
            columns: HashMap::new(),
        }
    }

    /// Declare a column that writes into the record.
    pub fn column(mut self, name: &str, column_type: ColumnType, setter: ColumnSetter<T>) -> Self {
        self.insert(name, column_type, Some(setter));
        self
    }

    /// Declare a column whose values are parsed and discarded.
    pub fn ignored(mut self, name: &str, column_type: ColumnType) -> Self {
        self.insert(name, column_type, None);
        self
    }

    fn insert(&mut self, name: &str, column_type: ColumnType, setter: Option<ColumnSetter<T>>) {
        let definition = ColumnDefinition::new(name, column_type);
        self.columns
            .insert(definition.column_name.clone(), (definition, setter));
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Dump table names this schema answers to.
    pub fn table_names(&self) -> &'static [&'static str] {
        self.table_names
    }

    /// Look up a canonical column by name, ignoring case.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns
            .get(&name.to_lowercase())
            .map(|(definition, _)| definition)
    }

    /// Whether every parsed column exists here with a matching type.
    pub fn is_compatible(&self, parsed: &ParsedTableDefinition) -> bool {
        parsed.columns.iter().all(|column| {
            self.columns
                .get(&column.column_name.to_lowercase())
                .is_some_and(|(definition, _)| definition.is_compatible(column))
        })
    }

    /// Setters aligned to the incoming column order. Unknown and ignored
    /// columns yield an empty slot.
    pub fn sorted_column_setters<'a>(
        &self,
        column_names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Option<ColumnSetter<T>>> {
        column_names
            .into_iter()
            .map(|name| {
                self.columns
                    .get(&name.to_lowercase())
                    .and_then(|(_, setter)| *setter)
            })
            .collect()
    }
}

impl<T> std::fmt::Debug for TableDefinition<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableDefinition")
            .field("table_names", &self.table_names)
            .field("domain", &self.domain)
            .field("columns", &self.columns.len())
            .finish()
    }
}

/// Type-erased view of a [`TableDefinition`], used by the schema registry.
pub trait CanonicalSchema: Sync {
    fn domain(&self) -> Domain;
    fn table_names(&self) -> &'static [&'static str];
    fn is_compatible(&self, parsed: &ParsedTableDefinition) -> bool;
}

impl<T> CanonicalSchema for TableDefinition<T> {
    fn domain(&self) -> Domain {
        self.domain
    }

    fn table_names(&self) -> &'static [&'static str] {
        self.table_names
    }

    fn is_compatible(&self, parsed: &ParsedTableDefinition) -> bool {
        TableDefinition::is_compatible(self, parsed)
    }
}
