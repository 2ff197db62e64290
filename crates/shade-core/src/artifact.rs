//! Artifact output with write-to-temp-then-rename.

use std::fs::File;
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shade_model::WorkItem;
use tracing::debug;

use crate::driver::Translation;
use crate::error::ArtifactError;

/// One written file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub sha256: String,
    pub bytes: usize,
}

/// The files written for a successful work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenArtifacts {
    pub output: WrittenFile,
    pub map: WrittenFile,
    /// The `.d` dependency file, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deps: Option<WrittenFile>,
}

/// How [`write_translation`] lays out its files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactOptions {
    /// Embed the surface sources in the map.
    pub embed_sources: bool,
    /// Option lines of the dependency file; `None` writes no dependency file.
    pub dependency_options: Option<Vec<String>>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Writes `contents` to `path` through a temporary sibling, so readers never
/// see a partially written file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<WrittenFile, ArtifactError> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Io {
            operation: "create directory",
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = temp_path(path);
    let result = File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        })
        .map_err(|source| ArtifactError::Io {
            operation: "write",
            path: temp_path.clone(),
            source,
        });
    if let Err(err) = result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err);
    }

    if let Err(source) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(ArtifactError::AtomicWriteFailed {
            temp_path,
            target_path: path.to_path_buf(),
            source,
        });
    }

    let sha256 = sha256_hex(contents);
    debug!(path = %path.display(), bytes = contents.len(), %sha256, "wrote artifact");
    Ok(WrittenFile {
        path: path.to_path_buf(),
        sha256,
        bytes: contents.len(),
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Writes a translation's output and source map into `output_dir`, plus a
/// dependency file when `options.dependency_options` is set.
///
/// The map's `file` names the output and its `sources` are relative to
/// `output_dir`. Surface sources are embedded only when
/// `options.embed_sources` is set. If a later file cannot be written the
/// earlier ones are removed again.
pub fn write_translation(
    output_dir: &Path,
    item: &WorkItem,
    translation: &Translation,
    options: &ArtifactOptions,
) -> Result<WrittenArtifacts, ArtifactError> {
    let output_path = output_dir.join(item.output_file_name());
    let map_path = output_dir.join(item.map_file_name());

    let mut map = translation
        .map
        .clone()
        .with_file(item.output_file_name())
        .map_sources(|source| relative_source(output_dir, source));
    if !options.embed_sources {
        map = map.without_sources_content();
    }
    let map_json = map.to_json().map_err(|source| ArtifactError::Map {
        path: map_path.clone(),
        source,
    })?;

    let output = write_atomic(&output_path, &translation.output)?;
    let map = match write_atomic(&map_path, map_json.as_bytes()) {
        Ok(map) => map,
        Err(err) => {
            let _ = std::fs::remove_file(&output_path);
            return Err(err);
        }
    };
    let deps = match &options.dependency_options {
        Some(lines) => {
            let deps_path = output_dir.join(format!("{}.d", item.output_file_name()));
            let contents = dependency_file(lines, &translation.dependencies);
            match write_atomic(&deps_path, contents.as_bytes()) {
                Ok(deps) => Some(deps),
                Err(err) => {
                    let _ = std::fs::remove_file(&output_path);
                    let _ = std::fs::remove_file(&map_path);
                    return Err(err);
                }
            }
        }
        None => None,
    };
    Ok(WrittenArtifacts { output, map, deps })
}

/// Dependency file body: build options, a `--` separator, then every file
/// the translation read.
pub fn dependency_file(options: &[String], dependencies: &[String]) -> String {
    let mut contents = String::new();
    for line in options {
        contents.push_str(line);
        contents.push('\n');
    }
    contents.push_str("--\n");
    for dependency in dependencies {
        contents.push_str(dependency);
        contents.push('\n');
    }
    contents
}

/// `source` as seen from `base`, with `/` separators. Falls back to the
/// absolute path when the two share no root.
fn relative_source(base: &Path, source: &str) -> String {
    let (Ok(base), Ok(target)) = (std::path::absolute(base), std::path::absolute(source)) else {
        return source.to_string();
    };
    let base = normalize(&base);
    let target = normalize(&target);
    if base.first() != target.first() {
        return target_display(&target);
    }
    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = vec!["..".to_string(); base.len() - common];
    parts.extend(
        target[common..]
            .iter()
            .map(|part| part.to_string_lossy().into_owned()),
    );
    parts.join("/")
}

/// Path components with `.` dropped and `..` applied.
fn normalize(path: &Path) -> Vec<std::ffi::OsString> {
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.len() > 1 {
                    parts.pop();
                }
            }
            other => parts.push(other.as_os_str().to_os_string()),
        }
    }
    parts
}

fn target_display(parts: &[std::ffi::OsString]) -> String {
    parts.iter().collect::<PathBuf>().to_string_lossy().into_owned()
}
