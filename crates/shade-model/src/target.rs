//! Target profiles, platforms and preprocessor defines.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::stage::ShaderStage;

/// Output dialect family requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    Glsl,
    Essl,
    D3d9,
    D3d11,
    Metal,
    VarList,
    /// The encoded IR module itself.
    Spirv,
}

impl ProfileKind {
    pub const ALL: [ProfileKind; 7] = [
        ProfileKind::Glsl,
        ProfileKind::Essl,
        ProfileKind::D3d9,
        ProfileKind::D3d11,
        ProfileKind::Metal,
        ProfileKind::VarList,
        ProfileKind::Spirv,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Glsl => "glsl",
            Self::Essl => "essl",
            Self::D3d9 => "d3d9",
            Self::D3d11 => "d3d11",
            Self::Metal => "metal",
            Self::VarList => "varlist",
            Self::Spirv => "spirv",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Glsl => "Desktop OpenGL GLSL",
            Self::Essl => "OpenGL ES / WebGL GLSL",
            Self::D3d9 => "Direct3D 9 HLSL (shader model 3)",
            Self::D3d11 => "Direct3D 11 HLSL (shader model 4+)",
            Self::Metal => "Metal shading language",
            Self::VarList => "Interface variable listing",
            Self::Spirv => "Intermediate binary module",
        }
    }

    pub fn is_glsl_family(self) -> bool {
        matches!(self, Self::Glsl | Self::Essl)
    }

    pub fn is_hlsl(self) -> bool {
        matches!(self, Self::D3d9 | Self::D3d11)
    }

    /// Whether the artifact is the front end's IR rather than back-end text.
    pub fn is_intermediate(self) -> bool {
        self == Self::Spirv
    }

    /// Version used when the profile is requested without one.
    pub fn default_version(self, system: TargetSystem, stage: ShaderStage) -> u32 {
        match self {
            Self::Glsl if system == TargetSystem::Linux && stage.is_graphics_basic() => 110,
            Self::Glsl => 330,
            Self::Essl if stage.is_graphics_basic() => 100,
            Self::Essl => 310,
            Self::D3d9 => 9,
            Self::D3d11 => 11,
            Self::Metal | Self::VarList | Self::Spirv => 1,
        }
    }

    /// File extension of the generated source.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Glsl | Self::Essl => "glsl",
            Self::D3d9 | Self::D3d11 => "hlsl",
            Self::Metal => "metal",
            Self::VarList => "txt",
            Self::Spirv => "spv",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileKind {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| ModelError::UnknownProfile(value.to_string()))
    }
}

/// Platform the generated shaders are built for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSystem {
    Windows,
    WindowsApp,
    Macos,
    Linux,
    Ios,
    Android,
    Html5,
    Unity,
    #[default]
    Unknown,
}

impl TargetSystem {
    /// Parses a platform name. Unrecognised names map to `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "windows" => Self::Windows,
            "windowsapp" => Self::WindowsApp,
            "osx" | "macos" => Self::Macos,
            "linux" | "freebsd" => Self::Linux,
            "ios" => Self::Ios,
            "android" => Self::Android,
            "html5" | "debug-html5" | "html5worker" | "emscripten" | "wasm" => Self::Html5,
            "unity" => Self::Unity,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::WindowsApp => "windowsapp",
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Html5 => "html5",
            Self::Unity => "unity",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TargetSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A requested target: profile plus optional explicit version (`essl:300`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetSpec {
    pub kind: ProfileKind,
    pub version: Option<u32>,
}

impl TargetSpec {
    pub fn new(kind: ProfileKind) -> Self {
        Self {
            kind,
            version: None,
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Resolves the concrete profile for one stage on one platform.
    pub fn resolve(&self, system: TargetSystem, stage: ShaderStage) -> TargetProfile {
        TargetProfile {
            kind: self.kind,
            version: self
                .version
                .unwrap_or_else(|| self.kind.default_version(system, stage)),
            system,
            relaxed: false,
        }
    }
}

impl FromStr for TargetSpec {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.split_once(':') {
            Some((kind, version)) => {
                let kind: ProfileKind = kind.parse()?;
                let version =
                    version
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| ModelError::InvalidVersion {
                            profile: kind.to_string(),
                            value: version.to_string(),
                        })?;
                Ok(Self::new(kind).with_version(version))
            }
            None => Ok(Self::new(value.parse()?)),
        }
    }
}

impl TryFrom<String> for TargetSpec {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetSpec> for String {
    fn from(spec: TargetSpec) -> Self {
        spec.to_string()
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(version) => write!(f, "{}:{version}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A fully resolved target profile for one work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetProfile {
    pub kind: ProfileKind,
    pub version: u32,
    pub system: TargetSystem,
    /// Relaxed precision output (default precision `mediump`).
    pub relaxed: bool,
}

impl TargetProfile {
    pub fn new(kind: ProfileKind, version: u32) -> Self {
        Self {
            kind,
            version,
            system: TargetSystem::Unknown,
            relaxed: false,
        }
    }

    #[must_use]
    pub fn with_system(mut self, system: TargetSystem) -> Self {
        self.system = system;
        self
    }

    #[must_use]
    pub fn relaxed(mut self, relaxed: bool) -> Self {
        self.relaxed = relaxed;
        self
    }

    pub fn is_es(&self) -> bool {
        self.kind == ProfileKind::Essl
    }

    /// Short label used in artifact names and reports (`essl300`, `d3d11`).
    pub fn label(&self) -> String {
        match self.kind {
            ProfileKind::Glsl | ProfileKind::Essl => format!("{}{}", self.kind, self.version),
            ProfileKind::D3d9 if self.version == 9 => self.kind.to_string(),
            ProfileKind::D3d11 if self.version == 11 => self.kind.to_string(),
            ProfileKind::Metal | ProfileKind::VarList | ProfileKind::Spirv if self.version == 1 => {
                self.kind.to_string()
            }
            _ => format!("{}{}", self.kind, self.version),
        }
    }

    /// Defines injected into the front end so sources can branch per target.
    pub fn defines(&self) -> Vec<Define> {
        let version = self.version.to_string();
        match self.kind {
            ProfileKind::Glsl => vec![Define::with_value("GLSL", version)],
            ProfileKind::Essl => vec![
                Define::with_value("GLSL", version),
                Define::new("GL_ES"),
            ],
            ProfileKind::D3d9 | ProfileKind::D3d11 => vec![Define::with_value("HLSL", version)],
            ProfileKind::Metal => vec![Define::with_value("METAL", version)],
            ProfileKind::Spirv => vec![Define::with_value("SPIRV", version)],
            ProfileKind::VarList => Vec::new(),
        }
    }
}

impl fmt::Display for TargetProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())?;
        if self.relaxed {
            f.write_str(" (relaxed)")?;
        }
        Ok(())
    }
}

/// Matrix storage convention requested from the back end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixOrder {
    #[default]
    Column,
    Row,
}

impl FromStr for MatrixOrder {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "column" | "column_major" => Ok(Self::Column),
            "row" | "row_major" => Ok(Self::Row),
            other => Err(format!("unknown matrix order '{other}' (expected column or row)")),
        }
    }
}

/// An object-like preprocessor define (`NAME` or `NAME=VALUE`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

impl FromStr for Define {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (name, define_value) = match value.split_once('=') {
            Some((name, define_value)) => (name.trim(), Some(define_value.trim().to_string())),
            None => (value.trim(), None),
        };
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            && !name.starts_with(|ch: char| ch.is_ascii_digit());
        if !valid {
            return Err(ModelError::InvalidDefine(value.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            value: define_value,
        })
    }
}

impl TryFrom<String> for Define {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Define> for String {
    fn from(define: Define) -> Self {
        define.to_string()
    }
}

impl fmt::Display for Define {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={value}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A stage/profile pair removed from the batch cross product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Exclusion {
    pub stage: ShaderStage,
    pub profile: ProfileKind,
}

impl Exclusion {
    pub fn matches(&self, stage: ShaderStage, profile: ProfileKind) -> bool {
        self.stage == stage && self.profile == profile
    }
}

impl FromStr for Exclusion {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (stage, profile) = value
            .split_once(':')
            .ok_or_else(|| ModelError::InvalidExclusion(value.to_string()))?;
        Ok(Self {
            stage: stage.parse()?,
            profile: profile.parse()?,
        })
    }
}

impl TryFrom<String> for Exclusion {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Exclusion> for String {
    fn from(exclusion: Exclusion) -> Self {
        format!("{}:{}", exclusion.stage.suffix(), exclusion.profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_versions_follow_platform_and_stage() {
        let glsl = TargetSpec::new(ProfileKind::Glsl);
        assert_eq!(
            glsl.resolve(TargetSystem::Linux, ShaderStage::Vertex).version,
            110
        );
        assert_eq!(
            glsl.resolve(TargetSystem::Windows, ShaderStage::Vertex).version,
            330
        );
        assert_eq!(
            glsl.resolve(TargetSystem::Linux, ShaderStage::Compute).version,
            330
        );
        let essl = TargetSpec::new(ProfileKind::Essl);
        assert_eq!(
            essl.resolve(TargetSystem::Html5, ShaderStage::Fragment).version,
            100
        );
        assert_eq!(
            essl.resolve(TargetSystem::Html5, ShaderStage::Compute).version,
            310
        );
    }

    #[test]
    fn explicit_version_wins() {
        let spec: TargetSpec = "essl:300".parse().unwrap();
        let profile = spec.resolve(TargetSystem::Android, ShaderStage::Fragment);
        assert_eq!(profile.version, 300);
        assert_eq!(profile.label(), "essl300");
    }

    #[test]
    fn rejects_bad_specs() {
        assert!("vulkan".parse::<TargetSpec>().is_err());
        assert!("glsl:abc".parse::<TargetSpec>().is_err());
    }

    #[test]
    fn parses_defines() {
        let define: Define = "MAX_TEXTURE_UNITS=4".parse().unwrap();
        assert_eq!(define.name, "MAX_TEXTURE_UNITS");
        assert_eq!(define.value.as_deref(), Some("4"));
        assert!("4X".parse::<Define>().is_err());
        assert!("=1".parse::<Define>().is_err());
    }

    #[test]
    fn profile_defines() {
        let essl = TargetProfile::new(ProfileKind::Essl, 300);
        let names: Vec<String> = essl.defines().into_iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["GLSL=300", "GL_ES"]);
        assert!(TargetProfile::new(ProfileKind::VarList, 1).defines().is_empty());
    }

    #[test]
    fn spirv_profile_names_and_defines() {
        let spec: TargetSpec = "spirv".parse().unwrap();
        let profile = spec.resolve(TargetSystem::Windows, ShaderStage::Compute);
        assert_eq!(profile.label(), "spirv");
        assert_eq!(profile.kind.extension(), "spv");
        assert!(profile.kind.is_intermediate());
        assert_eq!(profile.defines(), vec![Define::with_value("SPIRV", "1")]);
    }

    #[test]
    fn system_names() {
        assert_eq!(TargetSystem::parse("osx"), TargetSystem::Macos);
        assert_eq!(TargetSystem::parse("debug-html5"), TargetSystem::Html5);
        assert_eq!(TargetSystem::parse("emscripten"), TargetSystem::Html5);
        assert_eq!(TargetSystem::parse("wasm"), TargetSystem::Html5);
        assert_eq!(TargetSystem::parse("amiga"), TargetSystem::Unknown);
    }
}
