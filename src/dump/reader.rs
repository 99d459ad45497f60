//! Streaming SQL dump reader.
//!
//! The reader is a forward-only cursor over a MySQL dump. It classifies one
//! line at a time and only buffers short lines (CREATE TABLE headers and
//! column definitions). INSERT statements are tokenized straight from the
//! stream, so at most one row is held in memory regardless of statement or
//! dump size.

use std::io::BufRead;
use std::iter::FusedIterator;
use std::path::Path;

use crate::dump::error::{DumpError, DumpResult};
use crate::dump::model::{
    ColumnSetter, ColumnType, LineCommand, ParsedColumnDefinition, ParsedTableDefinition,
    SqlValue,
};
use crate::dump::source::open_dump_source;

const INSERT_PREFIX: &[u8] = b"INSERT INTO ";
const CREATE_PREFIX: &[u8] = b"CREATE TABLE ";
const VALUES_KEYWORD: &[u8] = b"VALUES";

/// Upper bound on `INSERT INTO <table> (<columns>) VALUES` headers.
const MAX_INSERT_HEADER: usize = 64 * 1024;

/// Lines of a CREATE TABLE body that declare keys rather than columns.
const INDEX_CLAUSES: &[&str] = &[
    "PRIMARY KEY",
    "KEY ",
    "UNIQUE ",
    "FULLTEXT ",
    "SPATIAL ",
    "INDEX ",
    "CONSTRAINT ",
    "FOREIGN KEY",
    "CHECK ",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowState {
    /// Not inside an INSERT statement.
    Idle,
    /// Positioned before a row tuple.
    ExpectRow,
    /// Positioned after a row tuple, before `,` or `;`.
    AfterRow,
}

fn parse_error(line: u64, message: impl Into<String>) -> DumpError {
    DumpError::Parse {
        line,
        message: message.into(),
    }
}

/// Forward-only reader over a SQL dump.
///
/// Owns the underlying stream (and decompressor); both are released when the
/// reader is dropped.
pub struct SqlDumpReader {
    input: Box<dyn BufRead>,
    /// 1-based line of the next unread byte.
    line: u64,
    /// Line on which the current statement starts.
    statement_line: u64,
    command: LineCommand,
    table_name: Option<String>,
    insert_columns: Option<Vec<String>>,
    /// The current line still has unread bytes.
    line_open: bool,
    /// The CREATE TABLE header ended with `(` and the body follows.
    definition_pending: bool,
    row_state: RowState,
}

impl SqlDumpReader {
    /// Open a dump file, decompressing `.gz` / `.bz2` transparently.
    pub fn open(path: &Path) -> DumpResult<Self> {
        Ok(Self::from_boxed(open_dump_source(path)?))
    }

    /// Read a dump from any buffered source.
    pub fn new(input: impl BufRead + 'static) -> Self {
        Self::from_boxed(Box::new(input))
    }

    fn from_boxed(input: Box<dyn BufRead>) -> Self {
        Self {
            input,
            line: 1,
            statement_line: 1,
            command: LineCommand::None,
            table_name: None,
            insert_columns: None,
            line_open: false,
            definition_pending: false,
            row_state: RowState::Idle,
        }
    }

    /// Classification of the most recently read line.
    pub fn current_line_command(&self) -> LineCommand {
        self.command
    }

    /// Table named by the current CREATE TABLE or INSERT line.
    pub fn current_table_name(&self) -> Option<&str> {
        self.table_name.as_deref()
    }

    /// Explicit column list of the current INSERT statement, if it has one.
    pub fn insert_columns(&self) -> Option<&[String]> {
        self.insert_columns.as_deref()
    }

    /// Line number on which the current statement starts.
    pub fn line_number(&self) -> u64 {
        self.statement_line
    }

    /// Advance to the next line. Returns `false` at the end of the dump.
    ///
    /// Whatever is left of the previous line is skipped without buffering.
    pub fn read_line(&mut self) -> DumpResult<bool> {
        if self.line_open {
            self.skip_rest_of_line()?;
        }
        self.command = LineCommand::None;
        self.table_name = None;
        self.insert_columns = None;
        self.definition_pending = false;
        self.row_state = RowState::Idle;
        self.statement_line = self.line;

        if self.peek_byte()?.is_none() {
            return Ok(false);
        }

        let mut head = Vec::new();
        while let Some(byte) = self.next_byte()? {
            if byte == b'\n' {
                break;
            }
            head.push(byte);
            if head.len() == INSERT_PREFIX.len() && head.eq_ignore_ascii_case(INSERT_PREFIX) {
                self.line_open = true;
                self.begin_insert()?;
                return Ok(true);
            }
            if !prefix_compatible(&head, INSERT_PREFIX) && !prefix_compatible(&head, CREATE_PREFIX)
            {
                self.line_open = true;
                self.skip_rest_of_line()?;
                return Ok(true);
            }
        }

        let line = String::from_utf8_lossy(&head);
        let line = line.trim_end();
        if line.len() >= CREATE_PREFIX.len()
            && line.as_bytes()[..CREATE_PREFIX.len()].eq_ignore_ascii_case(CREATE_PREFIX)
        {
            self.begin_create_table(&line[CREATE_PREFIX.len()..])?;
        }
        Ok(true)
    }

    /// Parse the column definitions following the current CREATE TABLE line.
    pub fn parse_table_definition(&mut self) -> DumpResult<ParsedTableDefinition> {
        if self.command != LineCommand::CreateTable {
            return Err(DumpError::InvalidState {
                message: "parse_table_definition called without a CREATE TABLE line".into(),
            });
        }
        let table_name = self.table_name.clone().unwrap_or_default();
        if !self.definition_pending {
            return Err(parse_error(
                self.statement_line,
                format!("expected `(` at the end of the CREATE TABLE line for `{table_name}`"),
            ));
        }
        self.definition_pending = false;

        let mut columns: Vec<ParsedColumnDefinition> = Vec::new();
        loop {
            let line_number = self.line;
            let Some(line) = self.read_raw_line()? else {
                return Err(parse_error(
                    line_number,
                    format!("dump ends inside the definition of table `{table_name}`"),
                ));
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || is_index_clause(trimmed) {
                continue;
            }
            if trimmed.starts_with(')') {
                break;
            }
            let column = parse_column_line(trimmed).ok_or_else(|| {
                parse_error(
                    line_number,
                    format!("cannot parse column definition `{trimmed}`"),
                )
            })?;
            if columns
                .iter()
                .any(|c| c.column_name.eq_ignore_ascii_case(&column.column_name))
            {
                return Err(parse_error(
                    line_number,
                    format!("duplicate column `{}` in table `{table_name}`", column.column_name),
                ));
            }
            columns.push(column);
        }

        self.command = LineCommand::None;
        tracing::debug!(
            table = %table_name,
            columns = columns.len(),
            "parsed table definition"
        );
        Ok(ParsedTableDefinition {
            table_name,
            columns,
        })
    }

    /// Lazily parse the rows of the current INSERT statement.
    ///
    /// `setters` are positional: slot `i` receives the `i`-th value of every
    /// row (`None` discards it). The iterator carries on into directly
    /// following INSERT statements for the same table and ends at the first
    /// other line. It can be consumed once; after an error it yields nothing.
    pub fn parse_import_objects<T: Default>(
        &mut self,
        setters: Vec<Option<ColumnSetter<T>>>,
    ) -> DumpResult<ImportObjects<'_, T>> {
        if self.command != LineCommand::Insert || self.row_state != RowState::ExpectRow {
            return Err(DumpError::InvalidState {
                message: "parse_import_objects called without an INSERT line".into(),
            });
        }
        let table_name = self.table_name.clone().unwrap_or_default();
        let columns = self.insert_columns.clone();
        Ok(ImportObjects {
            reader: self,
            setters,
            table_name,
            columns,
            finished: false,
        })
    }

    // -----------------------------------------------------------------------
    // Statement headers
    // -----------------------------------------------------------------------

    fn begin_create_table(&mut self, rest: &str) -> DumpResult<()> {
        let rest = rest.trim_start();
        let rest = strip_prefix_ignore_case(rest, "IF NOT EXISTS ")
            .unwrap_or(rest)
            .trim_start();
        let (name, tail) = split_identifier(rest)
            .ok_or_else(|| parse_error(self.statement_line, "CREATE TABLE without a table name"))?;
        self.definition_pending = tail.trim() == "(";
        self.table_name = Some(name);
        self.command = LineCommand::CreateTable;
        Ok(())
    }

    /// Read `<table> [(<columns>)] VALUES` and stop before the first row.
    fn begin_insert(&mut self) -> DumpResult<()> {
        let mut header = Vec::new();
        let mut quoted = false;
        loop {
            let Some(byte) = self.peek_byte()? else {
                return Err(parse_error(self.line, "INSERT statement ends before VALUES"));
            };
            // Rows may start on the next line (`VALUES\n(1,...),\n(2,...);`).
            if !quoted
                && ends_with_values_keyword(&header)
                && (byte == b'(' || byte.is_ascii_whitespace())
            {
                break;
            }
            if byte == b'\n' {
                return Err(parse_error(self.line, "INSERT statement ends before VALUES"));
            }
            self.next_byte()?;
            if byte == b'`' {
                quoted = !quoted;
            }
            header.push(byte);
            if header.len() > MAX_INSERT_HEADER {
                return Err(parse_error(self.line, "INSERT header is too long"));
            }
        }

        let header = String::from_utf8_lossy(&header[..header.len() - VALUES_KEYWORD.len()])
            .into_owned();
        let (table_name, rest) = split_identifier(header.trim_start())
            .ok_or_else(|| parse_error(self.statement_line, "INSERT without a table name"))?;
        let rest = rest.trim();
        if !rest.is_empty() {
            let list = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .ok_or_else(|| parse_error(self.statement_line, "malformed INSERT column list"))?;
            let columns = parse_column_list(list).ok_or_else(|| {
                parse_error(self.statement_line, "malformed INSERT column list")
            })?;
            self.insert_columns = Some(columns);
        }

        self.table_name = Some(table_name);
        self.command = LineCommand::Insert;
        self.row_state = RowState::ExpectRow;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Rows
    // -----------------------------------------------------------------------

    fn next_row<T: Default>(
        &mut self,
        table_name: &str,
        columns: Option<&[String]>,
        setters: &[Option<ColumnSetter<T>>],
    ) -> DumpResult<Option<T>> {
        loop {
            match self.row_state {
                RowState::Idle => return Ok(None),
                RowState::ExpectRow => {
                    self.skip_whitespace()?;
                    let object = self.parse_row(setters)?;
                    self.row_state = RowState::AfterRow;
                    return Ok(Some(object));
                }
                RowState::AfterRow => {
                    self.skip_whitespace()?;
                    match self.next_byte()? {
                        Some(b',') => self.row_state = RowState::ExpectRow,
                        Some(b';') => {
                            self.row_state = RowState::Idle;
                            if !self.read_line()?
                                || self.command != LineCommand::Insert
                                || self.table_name.as_deref() != Some(table_name)
                            {
                                return Ok(None);
                            }
                            if self.insert_columns.as_deref() != columns {
                                return Err(parse_error(
                                    self.statement_line,
                                    format!("column list of `{table_name}` changed between INSERT statements"),
                                ));
                            }
                        }
                        Some(byte) => {
                            return Err(parse_error(
                                self.line,
                                format!("expected `,` or `;` after a row, found `{}`", byte as char),
                            ));
                        }
                        None => {
                            return Err(parse_error(
                                self.line,
                                "dump ends inside an INSERT statement",
                            ));
                        }
                    }
                }
            }
        }
    }

    fn parse_row<T: Default>(&mut self, setters: &[Option<ColumnSetter<T>>]) -> DumpResult<T> {
        match self.next_byte()? {
            Some(b'(') => {}
            Some(byte) => {
                return Err(parse_error(
                    self.line,
                    format!("expected `(` at the start of a row, found `{}`", byte as char),
                ));
            }
            None => return Err(parse_error(self.line, "dump ends inside an INSERT statement")),
        }

        let mut object = T::default();
        let mut index = 0usize;
        loop {
            self.skip_whitespace()?;
            let value = self.parse_value()?;
            let Some(slot) = setters.get(index) else {
                return Err(parse_error(
                    self.line,
                    format!("row has more values than the {} expected columns", setters.len()),
                ));
            };
            if let Some(setter) = slot {
                setter(&mut object, value);
            }
            index += 1;
            self.skip_whitespace()?;
            match self.next_byte()? {
                Some(b',') => {}
                Some(b')') => break,
                Some(byte) => {
                    return Err(parse_error(
                        self.line,
                        format!("expected `,` or `)` inside a row, found `{}`", byte as char),
                    ));
                }
                None => return Err(parse_error(self.line, "dump ends inside a row")),
            }
        }

        if index != setters.len() {
            return Err(parse_error(
                self.line,
                format!("row has {index} values, expected {}", setters.len()),
            ));
        }
        Ok(object)
    }

    fn parse_value(&mut self) -> DumpResult<SqlValue> {
        match self.peek_byte()? {
            Some(b'\'') => {
                self.next_byte()?;
                Ok(SqlValue::Text(self.parse_string()?))
            }
            Some(b'_') => {
                // Charset introducer: _utf8mb4'...' or _binary '...'
                self.read_word()?;
                self.skip_whitespace()?;
                match self.next_byte()? {
                    Some(b'\'') => Ok(SqlValue::Text(self.parse_string()?)),
                    _ => Err(parse_error(
                        self.line,
                        "expected a string after a charset introducer",
                    )),
                }
            }
            Some(byte) if byte.is_ascii_digit() || matches!(byte, b'-' | b'+' | b'.') => {
                self.parse_number()
            }
            Some(byte) if byte.is_ascii_alphabetic() => {
                let word = self.read_word()?;
                if word.eq_ignore_ascii_case("NULL") {
                    Ok(SqlValue::Null)
                } else if word.eq_ignore_ascii_case("TRUE") {
                    Ok(SqlValue::Integer(1))
                } else if word.eq_ignore_ascii_case("FALSE") {
                    Ok(SqlValue::Integer(0))
                } else {
                    Err(parse_error(self.line, format!("unexpected literal `{word}`")))
                }
            }
            Some(byte) => Err(parse_error(
                self.line,
                format!("unexpected character `{}` in a row", byte as char),
            )),
            None => Err(parse_error(self.line, "dump ends inside a row")),
        }
    }

    /// Parse a quoted string body; the opening quote is already consumed.
    fn parse_string(&mut self) -> DumpResult<String> {
        let start_line = self.line;
        let mut bytes = Vec::new();
        loop {
            let run = {
                let buf = self.input.fill_buf()?;
                if buf.is_empty() {
                    return Err(parse_error(start_line, "unterminated string literal"));
                }
                let run = buf
                    .iter()
                    .position(|&b| matches!(b, b'\\' | b'\'' | b'\n'))
                    .unwrap_or(buf.len());
                bytes.extend_from_slice(&buf[..run]);
                run
            };
            self.input.consume(run);

            match self.next_byte()? {
                None => return Err(parse_error(start_line, "unterminated string literal")),
                Some(b'\\') => {
                    let Some(escaped) = self.next_byte()? else {
                        return Err(parse_error(start_line, "unterminated string literal"));
                    };
                    match escaped {
                        b'0' => bytes.push(0),
                        b'b' => bytes.push(0x08),
                        b'n' => bytes.push(b'\n'),
                        b'r' => bytes.push(b'\r'),
                        b't' => bytes.push(b'\t'),
                        b'Z' => bytes.push(0x1a),
                        // LIKE wildcards keep their backslash.
                        b'%' | b'_' => bytes.extend_from_slice(&[b'\\', escaped]),
                        other => bytes.push(other),
                    }
                }
                Some(b'\'') => {
                    if self.peek_byte()? == Some(b'\'') {
                        self.next_byte()?;
                        bytes.push(b'\'');
                    } else {
                        break;
                    }
                }
                Some(other) => bytes.push(other),
            }
        }
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }

    fn parse_number(&mut self) -> DumpResult<SqlValue> {
        let mut literal = String::new();
        while let Some(byte) = self.peek_byte()? {
            let sign_allowed = literal.is_empty() || literal.ends_with(['e', 'E']);
            let accept = byte.is_ascii_alphanumeric()
                || byte == b'.'
                || (matches!(byte, b'-' | b'+') && sign_allowed);
            if !accept {
                break;
            }
            literal.push(byte as char);
            self.next_byte()?;
        }

        if let Some(digits) = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            let bytes = hex::decode(digits).map_err(|_| {
                parse_error(self.line, format!("invalid hex literal `{literal}`"))
            })?;
            return Ok(SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned()));
        }
        if let Ok(value) = literal.parse::<i64>() {
            return Ok(SqlValue::Integer(value));
        }
        literal
            .parse::<f64>()
            .map(SqlValue::Decimal)
            .map_err(|_| parse_error(self.line, format!("invalid number `{literal}`")))
    }

    // -----------------------------------------------------------------------
    // Byte cursor
    // -----------------------------------------------------------------------

    fn peek_byte(&mut self) -> DumpResult<Option<u8>> {
        Ok(self.input.fill_buf()?.first().copied())
    }

    fn next_byte(&mut self) -> DumpResult<Option<u8>> {
        let byte = self.peek_byte()?;
        if let Some(b) = byte {
            self.input.consume(1);
            if b == b'\n' {
                self.line += 1;
            }
        }
        Ok(byte)
    }

    fn skip_whitespace(&mut self) -> DumpResult<()> {
        while let Some(byte) = self.peek_byte()? {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.next_byte()?;
        }
        Ok(())
    }

    fn read_word(&mut self) -> DumpResult<String> {
        let mut word = String::new();
        while let Some(byte) = self.peek_byte()? {
            if !(byte.is_ascii_alphanumeric() || byte == b'_') {
                break;
            }
            word.push(byte as char);
            self.next_byte()?;
        }
        Ok(word)
    }

    /// Discard everything up to and including the next newline.
    fn skip_rest_of_line(&mut self) -> DumpResult<()> {
        loop {
            let (consumed, found) = {
                let buf = self.input.fill_buf()?;
                if buf.is_empty() {
                    break;
                }
                match buf.iter().position(|&b| b == b'\n') {
                    Some(pos) => (pos + 1, true),
                    None => (buf.len(), false),
                }
            };
            self.input.consume(consumed);
            if found {
                self.line += 1;
                break;
            }
        }
        self.line_open = false;
        Ok(())
    }

    /// Read one whole line. Only used for short CREATE TABLE body lines.
    fn read_raw_line(&mut self) -> DumpResult<Option<String>> {
        let mut bytes = Vec::new();
        let read = self.input.read_until(b'\n', &mut bytes)?;
        if read == 0 {
            return Ok(None);
        }
        if bytes.last() == Some(&b'\n') {
            self.line += 1;
        }
        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

impl std::fmt::Debug for SqlDumpReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlDumpReader")
            .field("line", &self.line)
            .field("command", &self.command)
            .field("table_name", &self.table_name)
            .finish()
    }
}

/// Single-pass iterator over the rows of one table's INSERT statements.
pub struct ImportObjects<'r, T> {
    reader: &'r mut SqlDumpReader,
    setters: Vec<Option<ColumnSetter<T>>>,
    table_name: String,
    columns: Option<Vec<String>>,
    finished: bool,
}

impl<T: Default> Iterator for ImportObjects<'_, T> {
    type Item = DumpResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self
            .reader
            .next_row(&self.table_name, self.columns.as_deref(), &self.setters);
        match result {
            Ok(Some(object)) => Some(Ok(object)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<T: Default> FusedIterator for ImportObjects<'_, T> {}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether `head` agrees with `prefix` on their common length.
fn prefix_compatible(head: &[u8], prefix: &[u8]) -> bool {
    let n = head.len().min(prefix.len());
    head[..n].eq_ignore_ascii_case(&prefix[..n])
}

fn ends_with_values_keyword(header: &[u8]) -> bool {
    let n = VALUES_KEYWORD.len();
    header.len() > n
        && header[header.len() - n..].eq_ignore_ascii_case(VALUES_KEYWORD)
        && matches!(header[header.len() - n - 1], b' ' | b'\t' | b')' | b'`')
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn is_index_clause(line: &str) -> bool {
    INDEX_CLAUSES
        .iter()
        .any(|clause| strip_prefix_ignore_case(line, clause).is_some())
}

/// Split a possibly backtick-quoted, possibly schema-qualified identifier off
/// the front of `input`. Returns the last name part and the remainder.
fn split_identifier(input: &str) -> Option<(String, &str)> {
    let (mut name, mut rest) = split_identifier_part(input)?;
    while let Some(after_dot) = rest.strip_prefix('.') {
        let (part, after) = split_identifier_part(after_dot)?;
        name = part;
        rest = after;
    }
    Some((name, rest))
}

fn split_identifier_part(input: &str) -> Option<(String, &str)> {
    if let Some(quoted) = input.strip_prefix('`') {
        let mut name = String::new();
        let mut chars = quoted.char_indices();
        while let Some((i, c)) = chars.next() {
            if c == '`' {
                if quoted[i + 1..].starts_with('`') {
                    name.push('`');
                    chars.next();
                    continue;
                }
                return Some((name, &quoted[i + 1..]));
            }
            name.push(c);
        }
        None
    } else {
        let end = input
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(input.len());
        if end == 0 {
            return None;
        }
        Some((input[..end].to_string(), &input[end..]))
    }
}

fn parse_column_list(list: &str) -> Option<Vec<String>> {
    let mut columns = Vec::new();
    let mut rest = list.trim_start();
    loop {
        let (name, after) = split_identifier(rest)?;
        columns.push(name);
        let after = after.trim_start();
        if after.is_empty() {
            return Some(columns);
        }
        rest = after.strip_prefix(',')?.trim_start();
    }
}

fn parse_column_line(line: &str) -> Option<ParsedColumnDefinition> {
    let (column_name, rest) = split_identifier(line)?;
    let rest = rest.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    Some(ParsedColumnDefinition {
        column_name,
        column_type: ColumnType::from_sql(&rest[..end]),
    })
}
