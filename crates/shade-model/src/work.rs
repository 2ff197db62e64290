use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::stage::{ShaderStage, SourceLanguage};
use crate::target::{Define, TargetProfile};

/// A named compile variant (`-relaxed`, `-webgl2`, `-inst`, `-tex4`, ...).
///
/// The empty variant is the plain translation.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variant {
    pub suffix: String,
    pub defines: Vec<Define>,
}

impl Variant {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
            defines: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_define(mut self, define: Define) -> Self {
        self.defines.push(define);
        self
    }

    /// Concatenates two variants (`-tex4` + `-inst` = `-tex4-inst`).
    #[must_use]
    pub fn join(&self, other: &Variant) -> Variant {
        let mut defines = self.defines.clone();
        defines.extend(other.defines.iter().cloned());
        Variant {
            suffix: format!("{}{}", self.suffix, other.suffix),
            defines,
        }
    }

    pub fn is_plain(&self) -> bool {
        self.suffix.is_empty()
    }
}

/// One (stage, target) translation unit of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub stage: ShaderStage,
    pub source: PathBuf,
    pub language: SourceLanguage,
    pub profile: TargetProfile,
    pub variant: Variant,
}

impl WorkItem {
    pub fn new(source: impl Into<PathBuf>, stage: ShaderStage, profile: TargetProfile) -> Self {
        let source = source.into();
        let language = SourceLanguage::from_path(&source);
        Self {
            stage,
            source,
            language,
            profile,
            variant: Variant::default(),
        }
    }

    #[must_use]
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    /// Deterministic ordering key for batch output.
    pub fn sort_key(&self) -> (ShaderStage, TargetProfile, &Path, &str) {
        (self.stage, self.profile, &self.source, &self.variant.suffix)
    }

    /// Source file name without a trailing `.glsl`/`.hlsl`.
    pub fn source_stem(&self) -> String {
        let name = self
            .source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("shader");
        match name.rsplit_once('.') {
            Some((stem, ext)) if SourceLanguage::from_extension(ext).is_some() => stem.to_string(),
            _ => name.to_string(),
        }
    }

    /// Base name of the generated artifacts (`basic.vert.essl100-webgl2`).
    pub fn artifact_stem(&self) -> String {
        format!(
            "{}.{}{}",
            self.source_stem(),
            self.profile.label(),
            self.variant.suffix
        )
    }

    /// File name of the generated target source.
    pub fn output_file_name(&self) -> String {
        format!("{}.{}", self.artifact_stem(), self.profile.kind.extension())
    }

    /// File name of the generated source map.
    pub fn map_file_name(&self) -> String {
        format!("{}.map", self.output_file_name())
    }

    /// Human-readable identifier used in logs and reports.
    pub fn label(&self) -> String {
        format!(
            "{} [{}] -> {}{}",
            self.source.display(),
            self.stage,
            self.profile.label(),
            self.variant.suffix
        )
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
