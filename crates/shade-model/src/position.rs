//! Source positions and mapping entries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A position in one text of a translation chain.
///
/// `file` indexes the `sources` list of the map the position belongs to.
/// Lines are 1-based and columns are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub file: u32,
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    pub const fn new(file: u32, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// A position in a generated text. Generated texts are single files, so
    /// the file index is always zero.
    pub const fn generated(line: u32, column: u32) -> Self {
        Self::new(0, line, column)
    }

    /// The `(line, column)` key used to order generated positions.
    pub const fn line_col(&self) -> (u32, u32) {
        (self.line, self.column)
    }

    /// The same position with its column collapsed to the start of the line.
    #[must_use]
    pub const fn line_start(self) -> Self {
        Self::new(self.file, self.line, 0)
    }
}

impl Ord for SourcePosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.line
            .cmp(&other.line)
            .then(self.column.cmp(&other.column))
            .then(self.file.cmp(&other.file))
    }
}

impl PartialOrd for SourcePosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// "The token at `generated` originated from `original`."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub generated: SourcePosition,
    pub original: SourcePosition,
    pub name: Option<String>,
}

impl MappingEntry {
    pub fn new(generated: SourcePosition, original: SourcePosition) -> Self {
        Self {
            generated,
            original,
            name: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// How precisely original positions are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// Exact token columns.
    #[default]
    Token,
    /// Column 0 of the token's line.
    Line,
}

impl Granularity {
    pub fn apply(self, position: SourcePosition) -> SourcePosition {
        match self {
            Self::Token => position,
            Self::Line => position.line_start(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Line => "line",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "token" => Ok(Self::Token),
            "line" => Ok(Self::Line),
            other => Err(format!("unknown granularity '{other}' (expected token or line)")),
        }
    }
}
