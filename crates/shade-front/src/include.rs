//! Resolution of `#include "file"` directives.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A resolved include: the name it is recorded under and its text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedSource {
    pub name: String,
    pub content: String,
}

/// Resolves include requests for the front end.
pub trait Includer: Send + Sync {
    /// Resolves `requested` as included from the file named `includer`.
    fn include(&self, requested: &str, includer: &str) -> Result<IncludedSource, String>;
}

/// Rejects every include.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullIncluder;

impl Includer for NullIncluder {
    fn include(&self, requested: &str, _includer: &str) -> Result<IncludedSource, String> {
        Err(format!("cannot include \"{requested}\": includes are disabled"))
    }
}

/// Reads includes from disk, relative to the including file's directory and
/// then to each extra search directory in order.
#[derive(Debug, Clone, Default)]
pub struct FileIncluder {
    search_dirs: Vec<PathBuf>,
}

impl FileIncluder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    fn candidates(&self, requested: &str, includer: &str) -> Vec<PathBuf> {
        let base = Path::new(includer).parent().unwrap_or_else(|| Path::new(""));
        std::iter::once(base.join(requested))
            .chain(self.search_dirs.iter().map(|dir| dir.join(requested)))
            .collect()
    }
}

impl Includer for FileIncluder {
    fn include(&self, requested: &str, includer: &str) -> Result<IncludedSource, String> {
        for candidate in self.candidates(requested, includer) {
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .map_err(|err| format!("cannot read {}: {err}", candidate.display()))?;
                return Ok(IncludedSource {
                    name: candidate.to_string_lossy().into_owned(),
                    content,
                });
            }
        }
        Err(format!("include file \"{requested}\" not found"))
    }
}

/// Serves includes from an in-memory table keyed by requested name.
#[derive(Debug, Clone, Default)]
pub struct MemoryIncluder {
    files: BTreeMap<String, String>,
}

impl MemoryIncluder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }
}

impl Includer for MemoryIncluder {
    fn include(&self, requested: &str, _includer: &str) -> Result<IncludedSource, String> {
        self.files
            .get(requested)
            .map(|content| IncludedSource {
                name: requested.to_string(),
                content: content.clone(),
            })
            .ok_or_else(|| format!("include file \"{requested}\" not found"))
    }
}
