//! Back-end adapter: lowers a shade IR module to target source text and a
//! source map from that text back into the IR.
//!
//! Every generated token is recorded against the IR position it derives
//! from, so the map composes with the front-end map into a surface-source
//! map. Constructs the target cannot express are reported as diagnostics at
//! IR positions; the pipeline driver re-expresses them in surface terms.

mod dialect;
mod error;
mod format;
mod glsl;
mod hlsl;
mod metal;
mod program;
mod support;
mod tok;
mod varlist;

pub use dialect::DialectBackEnd;
pub use error::BackEndError;

use shade_map::SourceMap;
use shade_model::{Diagnostic, MatrixOrder, TargetProfile};

/// Lowering options that are not part of the target profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackEndOptions {
    /// Layout HLSL matrices are declared with.
    pub matrix_order: MatrixOrder,
    /// First register number assigned to HLSL resources.
    pub binding_base: u32,
}

/// One back-end invocation.
#[derive(Debug, Clone, Copy)]
pub struct BackEndRequest<'a> {
    pub ir: &'a [u8],
    pub profile: TargetProfile,
    pub options: BackEndOptions,
    /// File name recorded as the generated file of the output map.
    pub output_name: &'a str,
    /// Stem used for Metal struct and entry names (`basic.vert`).
    pub source_stem: &'a str,
}

impl<'a> BackEndRequest<'a> {
    pub fn new(ir: &'a [u8], profile: TargetProfile, output_name: &'a str) -> Self {
        Self {
            ir,
            profile,
            options: BackEndOptions::default(),
            output_name,
            source_stem: "shader",
        }
    }

    #[must_use]
    pub fn options(mut self, options: BackEndOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn source_stem(mut self, stem: &'a str) -> Self {
        self.source_stem = stem;
        self
    }
}

#[derive(Debug, Clone)]
pub struct BackEndOutput {
    pub text: String,
    /// Target text -> IR.
    pub map: SourceMap,
    /// Non-fatal diagnostics, located at IR positions.
    pub diagnostics: Vec<Diagnostic>,
}

/// A back end turns IR into target text plus a target -> IR map.
pub trait BackEnd: Send + Sync {
    fn name(&self) -> &'static str;

    fn compile(&self, request: &BackEndRequest<'_>) -> Result<BackEndOutput, BackEndError>;
}
