//! Data types produced by the dump reader.

/// Classification of the most recently read dump line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCommand {
    None,
    CreateTable,
    Insert,
}

/// Dump-format primitive column types, collapsed to what the schema matcher
/// needs to tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Integer,
    Decimal,
    Text,
    Blob,
    Timestamp,
    /// Any type the reader does not recognize. Never matches a canonical column.
    Other,
}

impl ColumnType {
    /// Map a MySQL type name (case-insensitive, without length/modifiers).
    pub fn from_sql(type_name: &str) -> Self {
        match type_name.to_ascii_lowercase().as_str() {
            "tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => Self::Integer,
            "decimal" | "numeric" | "float" | "double" | "real" => Self::Decimal,
            "char" | "varchar" | "tinytext" | "text" | "mediumtext" | "longtext" | "enum"
            | "set" => Self::Text,
            "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => {
                Self::Blob
            }
            "date" | "time" | "datetime" | "timestamp" | "year" => Self::Timestamp,
            _ => Self::Other,
        }
    }
}

/// A column as declared by a dump's CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedColumnDefinition {
    /// Column name as written in the dump.
    pub column_name: String,
    pub column_type: ColumnType,
}

/// A table as declared by a dump's CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTableDefinition {
    pub table_name: String,
    pub columns: Vec<ParsedColumnDefinition>,
}

impl ParsedTableDefinition {
    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.column_name.as_str())
    }
}

/// A single literal from an INSERT row.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Decimal(f64),
    Text(String),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer view; text is parsed, decimals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Null => None,
            Self::Integer(value) => Some(*value),
            Self::Decimal(value) => Some(*value as i64),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Text view; `NULL` becomes the empty string.
    pub fn into_text(self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Decimal(value) => value.to_string(),
            Self::Text(text) => text,
        }
    }
}

/// Writes one positional row value into an object under construction.
pub type ColumnSetter<T> = fn(&mut T, SqlValue);
