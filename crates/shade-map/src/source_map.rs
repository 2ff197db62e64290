//! Sealed source maps and their v3 JSON document form.

use serde::{Deserialize, Serialize};
use shade_model::{Location, MappingEntry, SourcePosition};

use crate::codec;
use crate::error::{MapError, Result};
use crate::table::PositionTable;

const SOURCE_MAP_VERSION: u32 = 3;

/// A sealed, read-only map from positions in `file` to positions in
/// `sources`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMap {
    file: String,
    sources: Vec<String>,
    sources_content: Option<Vec<Option<String>>>,
    mappings: PositionTable,
}

impl SourceMap {
    /// Assembles a map, sealing `mappings` if it is still open.
    pub fn new(
        file: impl Into<String>,
        sources: Vec<String>,
        sources_content: Option<Vec<Option<String>>>,
        mappings: PositionTable,
    ) -> Self {
        Self {
            file: file.into(),
            sources,
            sources_content,
            mappings: mappings.sealed(),
        }
    }

    /// A map in which every listed position maps to itself.
    pub fn identity(
        file: impl Into<String>,
        sources: Vec<String>,
        positions: impl IntoIterator<Item = SourcePosition>,
    ) -> Self {
        let entries = positions.into_iter().map(|position| {
            MappingEntry::new(
                SourcePosition::generated(position.line, position.column),
                position,
            )
        });
        Self::new(file, sources, None, PositionTable::from_entries(entries))
    }

    /// Name of the generated file this map describes.
    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn sources_content(&self) -> Option<&[Option<String>]> {
        self.sources_content.as_deref()
    }

    pub fn mappings(&self) -> &PositionTable {
        &self.mappings
    }

    pub fn source_name(&self, index: u32) -> Option<&str> {
        self.sources.get(index as usize).map(String::as_str)
    }

    /// Nearest-preceding-entry lookup of a generated position.
    pub fn lookup(&self, generated: SourcePosition) -> Option<&MappingEntry> {
        self.mappings.find(generated)
    }

    /// Resolves a generated `(line, column)` to a named original location.
    pub fn resolve(&self, line: u32, column: u32) -> Option<Location> {
        let entry = self.lookup(SourcePosition::generated(line, column))?;
        let file = self.source_name(entry.original.file)?;
        Some(Location::new(
            file,
            entry.original.line,
            entry.original.column,
        ))
    }

    /// Drops embedded source text.
    #[must_use]
    pub fn without_sources_content(mut self) -> Self {
        self.sources_content = None;
        self
    }

    #[must_use]
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Rewrites every `sources` entry; mappings keep their source indices.
    #[must_use]
    pub fn map_sources(mut self, mut rename: impl FnMut(&str) -> String) -> Self {
        self.sources = self.sources.iter().map(|name| rename(name.as_str())).collect();
        self
    }

    pub fn to_document(&self) -> Result<SourceMapDocument> {
        let encoded = codec::encode(&self.mappings)?;
        Ok(SourceMapDocument {
            version: SOURCE_MAP_VERSION,
            file: self.file.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: encoded.names,
            mappings: encoded.mappings,
        })
    }

    pub fn from_document(document: SourceMapDocument) -> Result<Self> {
        if document.version != SOURCE_MAP_VERSION {
            return Err(MapError::UnsupportedVersion(document.version));
        }
        let mappings = codec::decode(&document.mappings, &document.names)?;
        Ok(Self {
            file: document.file,
            sources: document.sources,
            sources_content: document.sources_content,
            mappings,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let document = self.to_document()?;
        serde_json::to_string_pretty(&document).map_err(|err| MapError::Document(err.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let document: SourceMapDocument =
            serde_json::from_str(json).map_err(|err| MapError::Document(err.to_string()))?;
        Self::from_document(document)
    }
}

/// Serialized source map, revision 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapDocument {
    pub version: u32,
    #[serde(default)]
    pub file: String,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    #[serde(default)]
    pub names: Vec<String>,
    pub mappings: String,
}
