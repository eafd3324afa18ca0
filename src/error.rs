//! Error taxonomy shared by every stage of the pipeline.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the engine can report.
///
/// Each stage fails fast: the first error encountered is returned and no
/// partial result is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The tokenizer met a character it does not recognize.
    #[error("lex error: unexpected character {ch:?} at position {position}")]
    Lex { ch: char, position: usize },

    /// The tokenizer met a malformed literal (unterminated string, integer overflow).
    #[error("lex error: {message} at position {position}")]
    MalformedLiteral { message: String, position: usize },

    /// The parser expected one kind of token and found another.
    #[error("parse error: expected {expected}, found {found} at position {position}")]
    Parse {
        expected: String,
        found: String,
        position: usize,
    },

    /// A WHERE clause mixed AND and OR.
    #[error("parse error: AND and OR cannot be mixed in one WHERE clause (position {position})")]
    MixedConnectives { position: usize },

    #[error("table {0:?} does not exist")]
    UnknownTable(String),

    #[error("table {0:?} already exists")]
    DuplicateTable(String),

    #[error("column {column:?} does not exist in table {table:?}")]
    UnknownColumn { table: String, column: String },

    #[error("column {column:?} appears more than once for table {table:?}")]
    DuplicateColumn { table: String, column: String },

    #[error("expected {expected} values, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    #[error("type mismatch on column {column:?}: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },

    /// A column position past the end of the table's schema.
    #[error("table {table:?} has no column at position {position}")]
    ColumnOutOfRange { table: String, position: usize },

    /// A column index was handed a key of another type.
    #[error("index key type mismatch: expected {expected}, found {found}")]
    IndexKeyMismatch { expected: String, found: String },

    /// A row identifier that was never allocated or whose row was deleted.
    #[error("row {0} does not exist")]
    UnknownRow(usize),

    /// Only raised when VARCHAR length enforcement is enabled.
    #[error("value for column {column:?} is {len} characters long, limit is {max}")]
    ValueTooLong {
        column: String,
        max: usize,
        len: usize,
    },
}

impl Error {
    /// Returns `true` for errors raised while tokenizing.
    pub fn is_lex_error(&self) -> bool {
        matches!(self, Self::Lex { .. } | Self::MalformedLiteral { .. })
    }

    /// Returns `true` for errors raised while parsing, mixed connectives included.
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::MixedConnectives { .. })
    }

    pub(crate) fn parse(
        expected: impl Into<String>,
        found: impl std::fmt::Display,
        position: usize,
    ) -> Self {
        Self::Parse {
            expected: expected.into(),
            found: found.to_string(),
            position,
        }
    }

    pub(crate) fn unknown_column(table: &str, column: &str) -> Self {
        Self::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}
