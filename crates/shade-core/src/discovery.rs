//! Shader source discovery.

use std::path::{Path, PathBuf};

use shade_model::{ShaderStage, SourceLanguage};
use tracing::{debug, warn};

use crate::error::DiscoveryError;

/// A shader file with a recognised stage suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub stage: ShaderStage,
    pub language: SourceLanguage,
    /// File contents, used to decide which variants apply.
    pub text: String,
}

impl ShaderSource {
    pub fn read(path: &Path, stage: ShaderStage) -> Result<Self, DiscoveryError> {
        let text = std::fs::read_to_string(path).map_err(|source| DiscoveryError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            stage,
            language: SourceLanguage::from_path(path),
            text,
        })
    }

    pub fn mentions(&self, name: &str) -> bool {
        self.text.contains(name)
    }
}

/// Lists the shader files directly inside `dir`, sorted by file name.
///
/// Files without a stage suffix are skipped with a warning.
pub fn list_shader_files(dir: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    if !dir.is_dir() {
        return Err(DiscoveryError::NotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|source| DiscoveryError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::DirectoryRead {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if ShaderStage::from_path(&path).is_some() {
            files.push(path);
        } else {
            warn!(path = %path.display(), "skipping file without a shader stage suffix");
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Expands files and directories into shader sources, sorted by path and
/// without duplicates.
pub fn discover_sources(paths: &[PathBuf]) -> Result<Vec<ShaderSource>, DiscoveryError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(list_shader_files(path)?);
        } else if path.is_file() {
            if ShaderStage::from_path(path).is_some() {
                files.push(path.clone());
            } else {
                warn!(path = %path.display(), "skipping file without a shader stage suffix");
            }
        } else {
            return Err(DiscoveryError::NotFound { path: path.clone() });
        }
    }
    files.sort();
    files.dedup();

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        // Only files with a stage reach this point.
        if let Some(stage) = ShaderStage::from_path(&path) {
            sources.push(ShaderSource::read(&path, stage)?);
        }
    }
    debug!(count = sources.len(), "discovered shader sources");
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, "void main() {}\n").expect("write file");
        path
    }

    #[test]
    fn lists_stage_files_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        touch(dir.path(), "b.frag.glsl");
        touch(dir.path(), "a.vert");
        touch(dir.path(), "README.md");
        touch(dir.path(), "blit.comp.hlsl");
        fs::create_dir(dir.path().join("nested.vert")).expect("mkdir");

        let files = list_shader_files(dir.path()).expect("list");
        let names: Vec<_> = files
            .iter()
            .filter_map(|path| path.file_name()?.to_str())
            .collect();
        assert_eq!(names, ["a.vert", "b.frag.glsl", "blit.comp.hlsl"]);
    }

    #[test]
    fn discovers_files_and_directories_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vert = touch(dir.path(), "a.vert");
        touch(dir.path(), "a.frag.hlsl");

        let sources =
            discover_sources(&[dir.path().to_path_buf(), vert.clone()]).expect("discover");
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].stage, ShaderStage::Fragment);
        assert_eq!(sources[0].language, SourceLanguage::Hlsl);
        assert_eq!(sources[1].path, vert);
        assert!(sources[1].mentions("main"));
    }

    #[test]
    fn missing_paths_are_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing");
        assert!(matches!(
            discover_sources(&[missing]),
            Err(DiscoveryError::NotFound { .. })
        ));
    }
}
