//! Batch configuration.
//!
//! A [`BatchConfig`] is usually loaded from a `shade.toml` file and then
//! extended by command-line flags:
//!
//! ```toml
//! sources = ["shaders"]
//! targets = ["glsl", "essl:300", "d3d11", "metal"]
//! exclude = ["comp:essl"]
//! system = "html5"
//! defines = ["QUALITY=2"]
//! relax = true
//! texture_units = [4, 8]
//! output_dir = "build/shaders"
//! ```

use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use shade_back::BackEndOptions;
use shade_model::{
    Define, Exclusion, Granularity, MatrixOrder, ShaderStage, TargetProfile, TargetSpec,
    TargetSystem,
};

use crate::driver::PipelineOptions;
use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Shader files, or directories scanned for shader files.
    pub sources: Vec<PathBuf>,
    /// Stages to translate. Empty means every stage found.
    #[serde(deserialize_with = "parse_list")]
    pub stages: Vec<ShaderStage>,
    pub targets: Vec<TargetSpec>,
    /// Stage/profile pairs removed from the cross product.
    pub exclude: Vec<Exclusion>,
    #[serde(deserialize_with = "parse_system")]
    pub system: TargetSystem,
    pub defines: Vec<Define>,
    /// Entry point of HLSL sources.
    pub entry_point: String,
    /// Also produce a `-relaxed` variant of every item.
    pub relax: bool,
    /// Produce `-inst`/`-noinst` variants of sources using
    /// `INSTANCED_RENDERING`.
    pub instanced_optional: bool,
    /// Produce one `-tex<N>` variant per count for sources using
    /// `MAX_TEXTURE_UNITS`.
    pub texture_units: Vec<u32>,
    pub granularity: Granularity,
    /// Embed the surface sources in every written source map.
    pub embed_sources: bool,
    /// Worker threads. `None` uses the available parallelism.
    pub concurrency: Option<usize>,
    pub output_dir: PathBuf,
    /// Translate everything but write nothing.
    pub dry_run: bool,
    pub matrix_order: MatrixOrder,
    /// First register number assigned to HLSL resources.
    pub binding_base: u32,
    /// Write a `.d` dependency file next to every output.
    pub deps: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            stages: Vec::new(),
            targets: Vec::new(),
            exclude: Vec::new(),
            system: TargetSystem::Unknown,
            defines: Vec::new(),
            entry_point: "main".to_string(),
            relax: false,
            instanced_optional: false,
            texture_units: Vec::new(),
            granularity: Granularity::Token,
            embed_sources: true,
            concurrency: None,
            output_dir: PathBuf::from("build"),
            dry_run: false,
            matrix_order: MatrixOrder::Column,
            binding_base: 0,
            deps: false,
        }
    }
}

impl BatchConfig {
    /// Loads a config file. Relative `sources` and `output_dir` are resolved
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })
    }

    fn rebase(&mut self, base: &Path) {
        for source in &mut self.sources {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
    }

    /// Checks the settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::Invalid("no targets configured".to_string()));
        }
        if self.concurrency == Some(0) {
            return Err(ConfigError::Invalid(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.texture_units.contains(&0) {
            return Err(ConfigError::Invalid(
                "texture unit counts must be at least 1".to_string(),
            ));
        }
        if self.entry_point.trim().is_empty() {
            return Err(ConfigError::Invalid("entry point is empty".to_string()));
        }
        Ok(())
    }

    /// Worker count, falling back to the machine's available parallelism.
    pub fn concurrency(&self) -> usize {
        self.concurrency
            .filter(|jobs| *jobs > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
    }

    pub fn includes_stage(&self, stage: ShaderStage) -> bool {
        self.stages.is_empty() || self.stages.contains(&stage)
    }

    pub fn is_excluded(&self, stage: ShaderStage, target: &TargetSpec) -> bool {
        self.exclude
            .iter()
            .any(|exclusion| exclusion.matches(stage, target.kind))
    }

    pub fn back_end_options(&self) -> BackEndOptions {
        BackEndOptions {
            matrix_order: self.matrix_order,
            binding_base: self.binding_base,
        }
    }

    /// Option lines recorded at the top of a dependency file, so build
    /// systems rebuild when any of them changes.
    pub fn dependency_options(&self, profile: &TargetProfile) -> Vec<String> {
        let mut options = vec![
            format!("target: {}", profile.label()),
            format!("system: {}", self.system),
        ];
        options.extend(self.defines.iter().map(|define| format!("define: {define}")));
        options.extend(
            self.texture_units
                .iter()
                .map(|count| format!("TextureUnitCount: {count}")),
        );
        if self.instanced_optional {
            options.push("instancedoptional".to_string());
        }
        if self.relax {
            options.push("relax".to_string());
        }
        options
    }

    /// Settings shared by every work item's pipeline.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            defines: self.defines.clone(),
            entry_point: self.entry_point.clone(),
            granularity: self.granularity,
            back_end: self.back_end_options(),
        }
    }
}

/// Accepts stage names (`vertex`) and suffixes (`vert`).
fn parse_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let values = Vec::<String>::deserialize(deserializer)?;
    values
        .iter()
        .map(|value| value.parse().map_err(D::Error::custom))
        .collect()
}

/// Accepts every platform alias; unknown names become `unknown`.
fn parse_system<'de, D>(deserializer: D) -> Result<TargetSystem, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Ok(TargetSystem::parse(&value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_model::ProfileKind;

    #[test]
    fn parses_a_full_config() {
        let config = BatchConfig::from_toml_str(
            r#"
            sources = ["shaders"]
            stages = ["vert", "fragment"]
            targets = ["glsl", "essl:300"]
            exclude = ["frag:glsl"]
            system = "osx"
            defines = ["QUALITY=2", "FAST"]
            relax = true
            texture_units = [4, 8]
            granularity = "line"
            embed_sources = false
            concurrency = 3
            matrix_order = "row"
            binding_base = 2
            "#,
        )
        .expect("parse config");

        assert_eq!(config.stages, [ShaderStage::Vertex, ShaderStage::Fragment]);
        assert_eq!(
            config.targets,
            [
                TargetSpec::new(ProfileKind::Glsl),
                TargetSpec::new(ProfileKind::Essl).with_version(300)
            ]
        );
        assert_eq!(config.system, TargetSystem::Macos);
        assert_eq!(config.defines[0], Define::with_value("QUALITY", "2"));
        assert_eq!(config.granularity, Granularity::Line);
        assert!(!config.embed_sources);
        assert_eq!(config.concurrency(), 3);
        assert!(config.is_excluded(ShaderStage::Fragment, &config.targets[0]));
        assert!(!config.is_excluded(ShaderStage::Vertex, &config.targets[0]));
        assert_eq!(config.back_end_options().binding_base, 2);
        assert_eq!(config.entry_point, "main");
        config.validate().expect("valid config");
    }

    #[test]
    fn dependency_options_list_every_build_setting() {
        let config = BatchConfig::from_toml_str(
            r#"
            targets = ["essl"]
            system = "wasm"
            defines = ["QUALITY=2"]
            texture_units = [4]
            instanced_optional = true
            deps = true
            "#,
        )
        .expect("parse config");
        assert!(config.deps);

        let profile = config.targets[0].resolve(config.system, ShaderStage::Fragment);
        assert_eq!(
            config.dependency_options(&profile),
            [
                "target: essl100",
                "system: html5",
                "define: QUALITY=2",
                "TextureUnitCount: 4",
                "instancedoptional",
            ]
        );
    }

    #[test]
    fn rejects_unknown_keys_and_profiles() {
        assert!(matches!(
            BatchConfig::from_toml_str("target = [\"glsl\"]"),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            BatchConfig::from_toml_str("targets = [\"vulkan\"]"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn validation_requires_targets() {
        let config = BatchConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn load_resolves_paths_next_to_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("shade.toml");
        std::fs::write(&path, "sources = [\"src\"]\ntargets = [\"metal\"]\n").expect("write");
        let config = BatchConfig::load(&path).expect("load");
        assert_eq!(config.sources, [dir.path().join("src")]);
        assert_eq!(config.output_dir, dir.path().join("build"));
    }
}
