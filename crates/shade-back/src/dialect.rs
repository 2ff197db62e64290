//! The built-in back end: one lowering pass per target dialect sharing a
//! common printer.

use shade_ir::{IR_SOURCE_NAME, Module};
use shade_map::SourceMap;
use shade_model::ProfileKind;
use tracing::{debug, trace};

use crate::error::BackEndError;
use crate::format::render;
use crate::program::Program;
use crate::{BackEnd, BackEndOutput, BackEndRequest, glsl, hlsl, metal, support, varlist};

#[derive(Debug, Clone, Copy, Default)]
pub struct DialectBackEnd;

impl DialectBackEnd {
    pub fn new() -> Self {
        Self
    }
}

impl BackEnd for DialectBackEnd {
    fn name(&self) -> &'static str {
        "dialect"
    }

    fn compile(&self, request: &BackEndRequest<'_>) -> Result<BackEndOutput, BackEndError> {
        let module = Module::decode(request.ir)?;
        let program = Program::from_module(&module)
            .ok_or_else(|| BackEndError::message("IR module has no Source or EntryPoint"))?;
        trace!(
            stage = %program.stage,
            tokens = program.tokens.len(),
            "decoded IR module"
        );

        let profile = &request.profile;
        let unsupported = support::check(&program, profile);
        if !unsupported.is_empty() {
            return Err(BackEndError::new(unsupported));
        }

        let emission = match profile.kind {
            ProfileKind::Glsl | ProfileKind::Essl => glsl::lower(&program, profile),
            ProfileKind::D3d9 | ProfileKind::D3d11 => {
                hlsl::lower(&program, profile, &request.options)
            }
            ProfileKind::Metal => metal::lower(&program, request.source_stem),
            ProfileKind::VarList => varlist::lower(&program),
            ProfileKind::Spirv => {
                return Err(BackEndError::message(
                    "spirv output is the IR module itself and has no text lowering",
                ));
            }
        };
        let (text, table) = render(&emission);
        debug!(
            target_profile = %profile.label(),
            lines = text.lines().count(),
            mappings = table.len(),
            "back end generated target source"
        );

        let map = SourceMap::new(
            request.output_name,
            vec![IR_SOURCE_NAME.to_string()],
            None,
            table,
        );
        Ok(BackEndOutput {
            text,
            map,
            diagnostics: Vec::new(),
        })
    }
}
