//! Detection of IR constructs a target cannot express.

use shade_ir::IR_SOURCE_NAME;
use shade_model::{
    Diagnostic, DiagnosticOrigin, Location, ProfileKind, ShaderStage, SourcePosition,
    TargetProfile,
};

use crate::program::Program;
use crate::tok::is_call;

const EXPLICIT_LOD: [&str; 8] = [
    "textureLod",
    "textureGrad",
    "textureProjLod",
    "textureProjGrad",
    "texture2DLod",
    "textureCubeLod",
    "texture2DGradEXT",
    "textureCubeGradEXT",
];
const TEXEL_QUERIES: [&str; 2] = ["texelFetch", "textureSize"];
const DERIVATIVES: [&str; 3] = ["dFdx", "dFdy", "fwidth"];
const D3D9_MISSING_BUILTINS: [&str; 2] = ["gl_VertexID", "gl_InstanceID"];

/// Whether the profile has the GLSL 1.30 / ESSL 3.00 feature set.
pub fn is_modern_glsl(profile: &TargetProfile) -> bool {
    match profile.kind {
        ProfileKind::Glsl => profile.version >= 130,
        ProfileKind::Essl => profile.version >= 300,
        _ => false,
    }
}

/// Every construct in `program` that `profile` cannot express, as error
/// diagnostics located at IR positions.
pub fn check(program: &Program, profile: &TargetProfile) -> Vec<Diagnostic> {
    let mut errors = Vec::new();
    let mut report = |origin: SourcePosition, message: String| {
        errors.push(
            Diagnostic::error(DiagnosticOrigin::BackEnd, message).at(Location::new(
                IR_SOURCE_NAME,
                origin.line,
                origin.column,
            )),
        );
    };

    if let Some(minimum) = stage_unavailable(program.stage, profile) {
        report(
            program.entry_origin,
            format!(
                "{} shaders are not supported by {}{minimum}",
                program.stage,
                profile.label()
            ),
        );
    }

    let legacy = matches!(profile.kind, ProfileKind::Glsl | ProfileKind::Essl)
        && !is_modern_glsl(profile);
    let lod_extension = profile.kind == ProfileKind::Essl
        && program.has_extension("GL_EXT_shader_texture_lod");
    let derivative_extension = program.has_extension("GL_OES_standard_derivatives");

    for (index, token) in program.tokens.iter().enumerate() {
        if profile.kind == ProfileKind::D3d9 && D3D9_MISSING_BUILTINS.contains(&token.text.as_str())
        {
            report(
                token.origin,
                format!("{} is not available in {}", token.text, profile.label()),
            );
        }
        if !is_call(&program.tokens, index) {
            continue;
        }
        let name = token.text.as_str();

        if TEXEL_QUERIES.contains(&name) && (legacy || profile.kind == ProfileKind::D3d9) {
            report(
                token.origin,
                format!("{name} is not available in {}", profile.label()),
            );
        }

        if EXPLICIT_LOD.contains(&name) {
            let legacy_fragment =
                legacy && program.stage == ShaderStage::Fragment && !lod_extension;
            if legacy_fragment || profile.kind == ProfileKind::Metal {
                report(
                    token.origin,
                    format!(
                        "explicit-LOD or gradient sampling ({name}) is not supported in {} {} shaders",
                        profile.label(),
                        program.stage
                    ),
                );
            }
        }

        if DERIVATIVES.contains(&name) {
            if !matches!(program.stage, ShaderStage::Fragment) {
                report(
                    token.origin,
                    format!("{name} is only available in fragment shaders"),
                );
            } else if profile.kind == ProfileKind::Essl
                && profile.version < 300
                && !derivative_extension
            {
                report(
                    token.origin,
                    format!("{name} requires GL_OES_standard_derivatives in {}", profile.label()),
                );
            }
        }
    }

    errors
}

/// `Some(reason suffix)` when `stage` cannot be compiled for `profile`.
fn stage_unavailable(stage: ShaderStage, profile: &TargetProfile) -> Option<String> {
    use ShaderStage::{Compute, Fragment, Geometry, TessControl, TessEvaluation, Vertex};

    let minimum = match (profile.kind, stage) {
        (_, Vertex | Fragment)
        | (ProfileKind::VarList | ProfileKind::D3d11 | ProfileKind::Spirv, _) => None,
        (ProfileKind::D3d9, _) | (ProfileKind::Metal, Geometry | TessControl | TessEvaluation) => {
            return Some(String::new());
        }
        (ProfileKind::Metal, Compute) => None,
        (ProfileKind::Glsl, Geometry) => Some(150),
        (ProfileKind::Glsl, TessControl | TessEvaluation) => Some(400),
        (ProfileKind::Glsl, Compute) => Some(430),
        (ProfileKind::Essl, Compute) => Some(310),
        (ProfileKind::Essl, Geometry | TessControl | TessEvaluation) => Some(320),
    }?;
    (profile.version < minimum).then(|| format!(" (requires version {minimum})"))
}
