//! Streaming reader for Library Genesis MySQL dumps.
//!
//! A dump is consumed line by line: [`SqlDumpReader::read_line`] classifies
//! each line, [`SqlDumpReader::parse_table_definition`] turns a CREATE TABLE
//! block into a [`ParsedTableDefinition`], and
//! [`SqlDumpReader::parse_import_objects`] yields the rows of an INSERT
//! statement lazily, one object at a time.

pub mod error;
pub mod model;
pub mod reader;
pub mod source;

pub use error::{DumpError, DumpResult};
pub use model::{
    ColumnSetter, ColumnType, LineCommand, ParsedColumnDefinition, ParsedTableDefinition,
    SqlValue,
};
pub use reader::{ImportObjects, SqlDumpReader};
pub use source::{DumpCompression, open_dump_source};
