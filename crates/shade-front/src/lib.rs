//! Front-end adapter: compiles one shader stage's surface source into IR
//! plus a map from IR positions back to the surface source.
//!
//! [`FrontEnd`] is the service boundary the pipeline drives;
//! [`ReferenceFrontEnd`] is the built-in implementation for the GLSL/HLSL
//! subset understood by this workspace.

pub mod error;
pub mod hlsl;
pub mod include;
pub mod lexer;
pub mod preprocess;
pub mod reference;
pub mod validate;

use shade_map::SourceMap;
use shade_model::{Define, Diagnostic, Granularity, ShaderStage, SourceLanguage};

pub use error::FrontEndError;
pub use include::{FileIncluder, IncludedSource, Includer, MemoryIncluder, NullIncluder};
pub use reference::ReferenceFrontEnd;

static NULL_INCLUDER: NullIncluder = NullIncluder;

/// Input to [`FrontEnd::compile`].
#[derive(Clone, Copy)]
pub struct FrontEndRequest<'a> {
    pub stage: ShaderStage,
    /// Name recorded for the main file in maps and diagnostics.
    pub source_name: &'a str,
    pub source: &'a str,
    pub language: SourceLanguage,
    /// HLSL entry point; GLSL always uses `main`.
    pub entry_point: &'a str,
    pub defines: &'a [Define],
    pub granularity: Granularity,
    pub includer: &'a dyn Includer,
}

impl<'a> FrontEndRequest<'a> {
    pub fn new(stage: ShaderStage, source_name: &'a str, source: &'a str) -> Self {
        Self {
            stage,
            source_name,
            source,
            language: SourceLanguage::Glsl,
            entry_point: "main",
            defines: &[],
            granularity: Granularity::Token,
            includer: &NULL_INCLUDER,
        }
    }

    #[must_use]
    pub fn language(mut self, language: SourceLanguage) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn entry_point(mut self, entry_point: &'a str) -> Self {
        self.entry_point = entry_point;
        self
    }

    #[must_use]
    pub fn defines(mut self, defines: &'a [Define]) -> Self {
        self.defines = defines;
        self
    }

    #[must_use]
    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    #[must_use]
    pub fn includer(mut self, includer: &'a dyn Includer) -> Self {
        self.includer = includer;
        self
    }
}

impl std::fmt::Debug for FrontEndRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrontEndRequest")
            .field("stage", &self.stage)
            .field("source_name", &self.source_name)
            .field("language", &self.language)
            .field("entry_point", &self.entry_point)
            .field("defines", &self.defines)
            .field("granularity", &self.granularity)
            .finish_non_exhaustive()
    }
}

/// Successful front-end result.
#[derive(Debug, Clone)]
pub struct FrontEndOutput {
    /// Encoded IR module.
    pub ir: Vec<u8>,
    /// IR positions -> surface positions. `sources` lists the main file and
    /// every included file, with their content embedded.
    pub map: SourceMap,
    /// Warnings.
    pub diagnostics: Vec<Diagnostic>,
}

/// A compiler from surface source to IR.
pub trait FrontEnd: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compiles one stage. Either the whole module is produced or a
    /// [`FrontEndError`] carrying every diagnostic.
    fn compile(&self, request: &FrontEndRequest<'_>) -> Result<FrontEndOutput, FrontEndError>;
}
