//! Lowering to desktop GLSL and OpenGL ES GLSL.

use std::collections::HashMap;

use shade_model::{ProfileKind, ShaderStage, TargetProfile};

use crate::format::{Emission, Line};
use crate::program::{PRECISION_QUALIFIERS, Program, Storage, parse_interface, split_items};
use crate::support::is_modern_glsl;
use crate::tok::{Tok, is_call, synth};

/// Extensions that are core in ESSL 3.00 and must not be re-enabled.
const CORE_IN_ESSL3: [&str; 4] = [
    "GL_OES_standard_derivatives",
    "GL_EXT_shader_texture_lod",
    "GL_EXT_frag_depth",
    "GL_EXT_draw_buffers",
];

/// Fragment output name used when `gl_FragColor` is unavailable.
const FRAG_COLOR_OUTPUT: &str = "frag_color";

pub fn lower(program: &Program, profile: &TargetProfile) -> Emission {
    let modern = is_modern_glsl(profile);
    let keep_precision = profile.kind == ProfileKind::Essl || profile.version >= 130;
    let stage = program.stage;

    let mut header = vec![Line::new(version_line(profile), program.source_origin)];
    for (text, origin) in &program.extensions {
        let name = text.split_whitespace().next().unwrap_or_default();
        if profile.is_es() && profile.version >= 300 && CORE_IN_ESSL3.contains(&name) {
            continue;
        }
        header.push(Line::new(format!("#extension {text}"), *origin));
    }

    let mut samplers: HashMap<String, bool> = HashMap::new();
    let mut fragment_outputs: Vec<String> = Vec::new();
    let mut tokens: Vec<Tok> = Vec::new();
    let mut has_float_precision = false;

    for item in split_items(&program.tokens) {
        if item.is_precision_statement() {
            has_float_precision |= item.tokens.iter().any(|token| token.is("float"));
            if keep_precision {
                tokens.extend(item.tokens);
            }
            continue;
        }

        let Some(interface) = parse_interface(&item) else {
            tokens.extend(item.tokens);
            continue;
        };
        if interface.is_sampler() {
            for var in &interface.vars {
                samplers.insert(var.name.text.clone(), interface.is_cube_sampler());
            }
        }

        // Legacy fragment shaders write gl_FragColor / gl_FragData instead.
        if !modern && stage == ShaderStage::Fragment && interface.storage == Storage::Out {
            fragment_outputs.extend(interface.vars.iter().map(|var| var.name.text.clone()));
            continue;
        }

        let storage = storage_keyword(interface.storage, stage, modern);
        for (index, token) in item.tokens.into_iter().enumerate() {
            if index == interface.storage_index && token.text != storage {
                tokens.push(token.renamed(storage));
            } else if keep_precision || !PRECISION_QUALIFIERS.contains(&token.text.as_str()) {
                tokens.push(token);
            }
        }
    }

    let uses_frag_color = tokens.iter().any(|token| token.is("gl_FragColor"));
    let mut body = Vec::with_capacity(tokens.len());
    for (index, token) in tokens.iter().enumerate() {
        if token.is_ident()
            && let Some(slot) = fragment_outputs.iter().position(|name| token.is(name))
        {
            if fragment_outputs.len() == 1 {
                body.push(token.renamed("gl_FragColor"));
            } else {
                body.push(token.renamed("gl_FragData"));
                body.push(Tok::punct("[", token.origin));
                body.push(Tok::number(slot.to_string(), token.origin));
                body.push(Tok::punct("]", token.origin));
            }
            continue;
        }
        if modern && token.is("gl_FragColor") {
            body.push(token.renamed(FRAG_COLOR_OUTPUT));
            continue;
        }
        if is_call(&tokens, index) {
            let cube = tokens
                .get(index + 2)
                .and_then(|arg| samplers.get(&arg.text))
                .copied()
                .unwrap_or(false);
            if let Some(name) = texture_function(&token.text, modern, cube, profile, program) {
                body.push(token.renamed(name));
                continue;
            }
        }
        body.push(token.clone());
    }

    let mut prelude = Vec::new();
    if profile.is_es() && stage == ShaderStage::Fragment && !has_float_precision {
        let precision = if profile.relaxed { "mediump" } else { "highp" };
        prelude.extend(synth(
            &format!("precision {precision} float ;"),
            program.source_origin,
        ));
    }
    if modern && stage == ShaderStage::Fragment && uses_frag_color {
        let origin = body
            .iter()
            .find(|token| token.is(FRAG_COLOR_OUTPUT))
            .map_or(program.source_origin, |token| token.origin);
        prelude.extend(synth(&format!("out vec4 {FRAG_COLOR_OUTPUT} ;"), origin));
    }
    prelude.extend(body);

    Emission {
        header,
        tokens: prelude,
    }
}

fn version_line(profile: &TargetProfile) -> String {
    if profile.is_es() && profile.version >= 300 {
        format!("#version {} es", profile.version)
    } else {
        format!("#version {}", profile.version)
    }
}

fn storage_keyword(storage: Storage, stage: ShaderStage, modern: bool) -> &'static str {
    match (storage, modern) {
        (Storage::Uniform, _) => "uniform",
        (storage, true) if storage.is_input(stage) => "in",
        (storage, true) if storage.is_output(stage) => "out",
        (Storage::In | Storage::Attribute, false) if stage == ShaderStage::Vertex => "attribute",
        (Storage::In | Storage::Varying, false) if stage == ShaderStage::Fragment => "varying",
        (Storage::Out | Storage::Varying, false) if stage == ShaderStage::Vertex => "varying",
        (Storage::In | Storage::Attribute, _) => "in",
        (Storage::Out | Storage::Varying, _) => "out",
    }
}

/// Version-appropriate spelling of a texture sampling function, or `None`
/// when the name needs no change.
fn texture_function(
    name: &str,
    modern: bool,
    cube: bool,
    profile: &TargetProfile,
    program: &Program,
) -> Option<&'static str> {
    if modern {
        return match name {
            "texture2D" | "textureCube" => Some("texture"),
            "texture2DLod" | "textureCubeLod" | "texture2DLodEXT" | "textureCubeLodEXT" => {
                Some("textureLod")
            }
            "texture2DGradEXT" | "textureCubeGradEXT" => Some("textureGrad"),
            _ => None,
        };
    }

    let ext = profile.is_es()
        && program.stage == ShaderStage::Fragment
        && program.has_extension("GL_EXT_shader_texture_lod");
    match (name, cube, ext) {
        ("texture", false, _) => Some("texture2D"),
        ("texture", true, _) => Some("textureCube"),
        ("textureLod", false, false) => Some("texture2DLod"),
        ("textureLod", true, false) => Some("textureCubeLod"),
        ("textureLod", false, true) => Some("texture2DLodEXT"),
        ("textureLod", true, true) => Some("textureCubeLodEXT"),
        ("textureGrad", false, _) => Some("texture2DGradEXT"),
        ("textureGrad", true, _) => Some("textureCubeGradEXT"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_keywords_follow_version() {
        use ShaderStage::{Fragment, Vertex};
        assert_eq!(storage_keyword(Storage::In, Vertex, false), "attribute");
        assert_eq!(storage_keyword(Storage::Attribute, Vertex, true), "in");
        assert_eq!(storage_keyword(Storage::Out, Vertex, false), "varying");
        assert_eq!(storage_keyword(Storage::Varying, Vertex, true), "out");
        assert_eq!(storage_keyword(Storage::In, Fragment, false), "varying");
        assert_eq!(storage_keyword(Storage::Varying, Fragment, true), "in");
        assert_eq!(storage_keyword(Storage::Uniform, Fragment, false), "uniform");
    }

    #[test]
    fn version_lines() {
        assert_eq!(version_line(&TargetProfile::new(ProfileKind::Essl, 300)), "#version 300 es");
        assert_eq!(version_line(&TargetProfile::new(ProfileKind::Essl, 100)), "#version 100");
        assert_eq!(version_line(&TargetProfile::new(ProfileKind::Glsl, 330)), "#version 330");
    }
}
