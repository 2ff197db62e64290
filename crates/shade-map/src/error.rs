//! Error types for position tables, source maps and the mappings codec.

use std::fmt;

use thiserror::Error;

/// Lifecycle phase of a [`crate::PositionTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TablePhase {
    /// Accepting entries.
    Open,
    /// Sorted, deduplicated and read-only.
    Sealed,
}

impl fmt::Display for TablePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("open"),
            Self::Sealed => f.write_str("sealed"),
        }
    }
}

/// Errors from source map operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MapError {
    /// A table was used outside the phase the operation requires.
    #[error("{operation} requires a {required} position table, but it is {actual}")]
    InvalidState {
        operation: &'static str,
        required: TablePhase,
        actual: TablePhase,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("invalid source map document: {0}")]
    Document(String),

    #[error("unsupported source map version {0} (expected 3)")]
    UnsupportedVersion(u32),
}

/// Errors from encoding or decoding the compact mappings string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid base64 digit '{digit}' at offset {offset}")]
    InvalidDigit { digit: char, offset: usize },

    #[error("unterminated VLQ value at offset {offset}")]
    UnterminatedValue { offset: usize },

    #[error("VLQ value overflows at offset {offset}")]
    Overflow { offset: usize },

    #[error("segment on generated line {line} has {fields} fields (expected 1, 4 or 5)")]
    InvalidSegment { line: u32, fields: usize },

    #[error("segment on generated line {line} resolves to a negative {field}")]
    NegativeValue { line: u32, field: &'static str },

    #[error("name index {index} is out of range ({count} names)")]
    NameOutOfRange { index: i64, count: usize },

    #[error("generated line 0 cannot be encoded; lines are 1-based")]
    ZeroLine,
}

pub type Result<T> = std::result::Result<T, MapError>;
