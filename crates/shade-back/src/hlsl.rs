//! Lowering to HLSL for Direct3D 9 (shader model 3) and Direct3D 11
//! (shader model 5).
//!
//! Stage inputs and outputs become `static` globals so the body can keep
//! reading and writing them by name. The entry function is renamed to
//! `<stage>_main` and called from a generated `main` that copies the
//! `StageInput` struct into the globals and the globals into `StageOutput`.

use std::collections::HashSet;

use shade_ir::TokenKind;
use shade_model::{MatrixOrder, ProfileKind, ShaderStage, SourcePosition, TargetProfile};

use crate::BackEndOptions;
use crate::format::{Emission, Line};
use crate::program::{
    Interface, Item, Program, Storage, is_local_size_declaration, local_size, parse_interface,
    split_items,
};
use crate::tok::{Tok, call_args, is_call, matching_close, synth};

const TYPE_RENAMES: [(&str, &str); 15] = [
    ("vec2", "float2"),
    ("vec3", "float3"),
    ("vec4", "float4"),
    ("ivec2", "int2"),
    ("ivec3", "int3"),
    ("ivec4", "int4"),
    ("uvec2", "uint2"),
    ("uvec3", "uint3"),
    ("uvec4", "uint4"),
    ("bvec2", "bool2"),
    ("bvec3", "bool3"),
    ("bvec4", "bool4"),
    ("mat2", "float2x2"),
    ("mat3", "float3x3"),
    ("mat4", "float4x4"),
];

const FUNCTION_RENAMES: [(&str, &str); 6] = [
    ("mix", "lerp"),
    ("fract", "frac"),
    ("dFdx", "ddx"),
    ("dFdy", "ddy"),
    ("inversesqrt", "rsqrt"),
    ("mod", "fmod"),
];

const INPUT_NAME: &str = "stage_input";
const OUTPUT_NAME: &str = "stage_output";
const TEXTURE_SIZE_HELPER: &str = "shade_texture_size";

struct Builtin {
    name: &'static str,
    ty: &'static str,
    stage: ShaderStage,
    output: bool,
    d3d11: Option<&'static str>,
    d3d9: Option<&'static str>,
}

const BUILTINS: [Builtin; 10] = [
    Builtin {
        name: "gl_Position",
        ty: "float4",
        stage: ShaderStage::Vertex,
        output: true,
        d3d11: Some("SV_Position"),
        d3d9: Some("POSITION"),
    },
    Builtin {
        name: "gl_PointSize",
        ty: "float",
        stage: ShaderStage::Vertex,
        output: true,
        d3d11: None,
        d3d9: Some("PSIZE"),
    },
    Builtin {
        name: "gl_VertexID",
        ty: "int",
        stage: ShaderStage::Vertex,
        output: false,
        d3d11: Some("SV_VertexID"),
        d3d9: None,
    },
    Builtin {
        name: "gl_InstanceID",
        ty: "int",
        stage: ShaderStage::Vertex,
        output: false,
        d3d11: Some("SV_InstanceID"),
        d3d9: None,
    },
    Builtin {
        name: "gl_FragCoord",
        ty: "float4",
        stage: ShaderStage::Fragment,
        output: false,
        d3d11: Some("SV_Position"),
        d3d9: Some("VPOS"),
    },
    Builtin {
        name: "gl_FragDepth",
        ty: "float",
        stage: ShaderStage::Fragment,
        output: true,
        d3d11: Some("SV_Depth"),
        d3d9: Some("DEPTH"),
    },
    Builtin {
        name: "gl_GlobalInvocationID",
        ty: "uint3",
        stage: ShaderStage::Compute,
        output: false,
        d3d11: Some("SV_DispatchThreadID"),
        d3d9: None,
    },
    Builtin {
        name: "gl_LocalInvocationID",
        ty: "uint3",
        stage: ShaderStage::Compute,
        output: false,
        d3d11: Some("SV_GroupThreadID"),
        d3d9: None,
    },
    Builtin {
        name: "gl_WorkGroupID",
        ty: "uint3",
        stage: ShaderStage::Compute,
        output: false,
        d3d11: Some("SV_GroupID"),
        d3d9: None,
    },
    Builtin {
        name: "gl_LocalInvocationIndex",
        ty: "uint",
        stage: ShaderStage::Compute,
        output: false,
        d3d11: Some("SV_GroupIndex"),
        d3d9: None,
    },
];

/// A member of `StageInput` or `StageOutput` and the global it is copied
/// from or to.
struct Field {
    ty: Tok,
    name: Tok,
    array: Vec<Tok>,
    semantic: String,
    global: Vec<Tok>,
}

impl Field {
    fn from_var(ty: &Tok, name: &Tok, array: &[Tok], semantic: String) -> Self {
        Self {
            ty: ty.clone(),
            name: name.clone(),
            array: array.to_vec(),
            semantic,
            global: vec![name.clone()],
        }
    }
}

struct Sampler {
    name: Tok,
    cube: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Sampling {
    Sample,
    Level,
    Grad,
    Fetch,
    Size,
}

impl Sampling {
    fn of(name: &str) -> Option<Self> {
        match name {
            "texture" | "texture2D" | "textureCube" => Some(Self::Sample),
            "textureLod" | "texture2DLod" | "textureCubeLod" | "texture2DLodEXT"
            | "textureCubeLodEXT" => Some(Self::Level),
            "textureGrad" | "texture2DGradEXT" | "textureCubeGradEXT" => Some(Self::Grad),
            "texelFetch" => Some(Self::Fetch),
            "textureSize" => Some(Self::Size),
            _ => None,
        }
    }
}

struct Lowering<'a> {
    profile: &'a TargetProfile,
    samplers: Vec<Sampler>,
    texture_size_origin: Option<SourcePosition>,
}

pub fn lower(program: &Program, profile: &TargetProfile, options: &BackEndOptions) -> Emission {
    let d3d11 = profile.kind == ProfileKind::D3d11;
    let stage = program.stage;
    let entry = program.entry_origin;

    let mut header = Vec::new();
    if options.matrix_order == MatrixOrder::Row {
        header.push(Line::new("#pragma pack_matrix(row_major)", program.source_origin));
    }

    let items = split_items(&program.tokens);
    let mut uniforms: Vec<Interface> = Vec::new();
    let mut samplers = Vec::new();
    let mut inputs: Vec<Field> = Vec::new();
    let mut outputs: Vec<Field> = Vec::new();
    let mut body_items: Vec<Item> = Vec::new();

    for item in &items {
        if item.is_precision_statement() || is_local_size_declaration(item) {
            continue;
        }
        let Some(interface) = parse_interface(item) else {
            body_items.push(item.clone());
            continue;
        };
        match interface.storage {
            Storage::Uniform if interface.is_sampler() => {
                samplers.extend(interface.vars.iter().map(|var| Sampler {
                    name: var.name.clone(),
                    cube: interface.is_cube_sampler(),
                }));
            }
            Storage::Uniform => uniforms.push(interface),
            storage if storage.is_input(stage) => {
                for var in &interface.vars {
                    let semantic = format!("TEXCOORD{}", semantic_slots(&inputs));
                    inputs.push(Field::from_var(&interface.ty, &var.name, &var.array, semantic));
                }
            }
            _ => {
                for var in &interface.vars {
                    let semantic = if stage == ShaderStage::Fragment {
                        target_semantic(d3d11, semantic_slots(&outputs))
                    } else {
                        format!("TEXCOORD{}", semantic_slots(&outputs))
                    };
                    outputs.push(Field::from_var(&interface.ty, &var.name, &var.array, semantic));
                }
            }
        }
    }

    // Builtins referenced by the body.
    let used: HashSet<&str> = program
        .tokens
        .iter()
        .filter(|token| token.is_ident())
        .map(|token| token.text.as_str())
        .collect();
    let mut statics: Vec<Field> = Vec::new();
    for builtin in BUILTINS.iter().filter(|builtin| builtin.stage == stage) {
        let Some(token) = program.tokens.iter().find(|token| token.is(builtin.name)) else {
            continue;
        };
        let ty = Tok::ident(builtin.ty, token.origin);
        let name = Tok::ident(builtin.name, token.origin);
        let semantic = if d3d11 { builtin.d3d11 } else { builtin.d3d9 };
        match semantic {
            Some(semantic) => {
                let field = Field::from_var(&ty, &name, &[], semantic.to_string());
                if builtin.output {
                    outputs.push(field);
                } else {
                    inputs.push(field);
                }
            }
            None => statics.push(Field::from_var(&ty, &name, &[], String::new())),
        }
    }
    if stage == ShaderStage::Fragment {
        if let Some(token) = program.tokens.iter().find(|token| token.is("gl_FragColor")) {
            let ty = Tok::ident("float4", token.origin);
            let semantic = target_semantic(d3d11, 0);
            outputs.push(Field::from_var(&ty, token, &[], semantic));
        }
        if used.contains("gl_FragData") {
            outputs.extend(frag_data_fields(&program.tokens, d3d11));
        }
    }

    let mut lowering = Lowering {
        profile,
        samplers,
        texture_size_origin: None,
    };
    let matrices = matrix_names(&program.tokens);
    let entry_name = format!("{}_main", stage.suffix());

    let mut body = Vec::new();
    for item in &body_items {
        let mut tokens = item.tokens.clone();
        if item.function_name() == Some("main")
            && let Some((name, _, _)) = item.function()
        {
            tokens[name] = tokens[name].renamed(entry_name.as_str());
        }
        if tokens.first().is_some_and(|token| token.is("const")) && item.function().is_none() {
            body.push(Tok::ident("static", tokens[0].origin));
        }
        let tokens = lowering.rewrite_calls(&tokens);
        let tokens = rewrite_matrix_products(tokens, &matrices, options.matrix_order);
        body.extend(tokens.iter().map(rename));
    }

    let mut tokens = Vec::new();
    tokens.extend(uniform_block(&uniforms, d3d11, options.binding_base));
    tokens.extend(lowering.sampler_declarations(options.binding_base));

    for field in inputs.iter().chain(&outputs).chain(&statics) {
        if field.global.len() == 1 {
            tokens.push(Tok::ident("static", field.name.origin));
            tokens.push(rename(&field.ty));
            tokens.push(field.name.clone());
            tokens.extend(field.array.iter().cloned());
            tokens.push(Tok::punct(";", field.name.origin));
        }
    }
    if let Some(count) = frag_data_count(&program.tokens).filter(|_| stage == ShaderStage::Fragment)
    {
        let origin = outputs
            .iter()
            .find(|field| field.global.len() > 1)
            .map_or(entry, |field| field.name.origin);
        tokens.extend(synth(
            &format!("static float4 gl_FragData [ {count} ] ;"),
            origin,
        ));
    }

    tokens.extend(stage_struct("StageInput", &inputs, entry));
    tokens.extend(stage_struct("StageOutput", &outputs, entry));
    if let Some(origin) = lowering.texture_size_origin {
        tokens.extend(lowering.texture_size_helpers(origin));
    }
    tokens.extend(body);
    tokens.extend(wrapper(
        program,
        &entry_name,
        &inputs,
        &outputs,
        local_size(&items),
    ));

    Emission { header, tokens }
}

/// Next free `TEXCOORD`/target slot after `fields`.
fn semantic_slots(fields: &[Field]) -> usize {
    fields
        .iter()
        .map(|field| {
            field
                .array
                .get(1)
                .and_then(|size| size.text.parse::<usize>().ok())
                .unwrap_or(1)
        })
        .sum()
}

fn target_semantic(d3d11: bool, slot: usize) -> String {
    if d3d11 {
        format!("SV_Target{slot}")
    } else {
        format!("COLOR{slot}")
    }
}

/// Highest literal `gl_FragData[n]` index plus one.
fn frag_data_count(tokens: &[Tok]) -> Option<usize> {
    let mut count = None;
    for (index, token) in tokens.iter().enumerate() {
        if !token.is("gl_FragData") {
            continue;
        }
        let slot = tokens
            .get(index + 2)
            .filter(|_| tokens.get(index + 1).is_some_and(|open| open.is("[")))
            .and_then(|slot| slot.text.parse::<usize>().ok())
            .unwrap_or(0);
        count = Some(count.unwrap_or(0).max(slot + 1));
    }
    count
}

fn frag_data_fields(tokens: &[Tok], d3d11: bool) -> Vec<Field> {
    let Some(origin) = tokens
        .iter()
        .find(|token| token.is("gl_FragData"))
        .map(|token| token.origin)
    else {
        return Vec::new();
    };
    let count = frag_data_count(tokens).unwrap_or(1);
    (0..count)
        .map(|slot| {
            let name = Tok::ident(format!("gl_FragData_{slot}"), origin);
            Field {
                ty: Tok::ident("float4", origin),
                name,
                array: Vec::new(),
                semantic: target_semantic(d3d11, slot),
                global: synth(&format!("gl_FragData [ {slot} ]"), origin),
            }
        })
        .collect()
}

/// Identifiers declared with a matrix type anywhere in the module.
fn matrix_names(tokens: &[Tok]) -> HashSet<String> {
    tokens
        .windows(2)
        .filter(|pair| {
            pair[0].text.starts_with("mat") && pair[0].is_ident() && pair[1].is_ident()
        })
        .map(|pair| pair[1].text.clone())
        .collect()
}

fn rename(token: &Tok) -> Tok {
    if !token.is_ident() {
        return token.clone();
    }
    TYPE_RENAMES
        .iter()
        .chain(FUNCTION_RENAMES.iter())
        .find(|(glsl, _)| token.is(glsl))
        .map_or_else(|| token.clone(), |(_, hlsl)| token.renamed(*hlsl))
}

fn uniform_block(uniforms: &[Interface], d3d11: bool, binding_base: u32) -> Vec<Tok> {
    let mut tokens = Vec::new();
    let Some(first) = uniforms.first() else {
        return tokens;
    };
    if d3d11 {
        tokens.extend(synth(
            &format!("cbuffer Uniforms : register ( b{binding_base} ) {{"),
            first.ty.origin,
        ));
    }
    for uniform in uniforms {
        for var in &uniform.vars {
            if !d3d11 {
                tokens.push(Tok::ident("uniform", var.name.origin));
            }
            tokens.push(rename(&uniform.ty));
            tokens.push(var.name.clone());
            tokens.extend(var.array.iter().cloned());
            tokens.push(Tok::punct(";", var.name.origin));
        }
    }
    if d3d11 {
        tokens.extend(synth("} ;", first.ty.origin));
    }
    tokens
}

fn stage_struct(name: &str, fields: &[Field], origin: SourcePosition) -> Vec<Tok> {
    if fields.is_empty() {
        return Vec::new();
    }
    let mut tokens = synth(&format!("struct {name} {{"), origin);
    for field in fields {
        tokens.push(rename(&field.ty));
        tokens.push(field.name.clone());
        tokens.extend(field.array.iter().cloned());
        tokens.push(Tok::punct(":", field.name.origin));
        tokens.push(Tok::ident(field.semantic.as_str(), field.name.origin));
        tokens.push(Tok::punct(";", field.name.origin));
    }
    tokens.extend(synth("} ;", origin));
    tokens
}

fn wrapper(
    program: &Program,
    entry_name: &str,
    inputs: &[Field],
    outputs: &[Field],
    local_size: [u32; 3],
) -> Vec<Tok> {
    let origin = program.entry_origin;
    let mut tokens = Vec::new();
    if program.stage == ShaderStage::Compute {
        let [x, y, z] = local_size;
        tokens.push(Tok::ident(format!("[numthreads({x}, {y}, {z})]"), origin));
    }
    let result = if outputs.is_empty() { "void" } else { "StageOutput" };
    let parameters = if inputs.is_empty() {
        String::new()
    } else {
        format!("StageInput {INPUT_NAME}")
    };
    tokens.extend(synth(&format!("{result} main ( {parameters} ) {{"), origin));
    for field in inputs {
        tokens.extend(field.global.iter().cloned());
        tokens.extend(synth(&format!("= {INPUT_NAME} ."), origin));
        tokens.push(field.name.clone());
        tokens.push(Tok::punct(";", origin));
    }
    tokens.extend(synth(&format!("{entry_name} ( ) ;"), origin));
    if !outputs.is_empty() {
        tokens.extend(synth(&format!("StageOutput {OUTPUT_NAME} ;"), origin));
        for field in outputs {
            tokens.extend(synth(&format!("{OUTPUT_NAME} ."), origin));
            tokens.push(field.name.clone());
            tokens.push(Tok::punct("=", origin));
            tokens.extend(field.global.iter().cloned());
            tokens.push(Tok::punct(";", origin));
        }
        tokens.extend(synth(&format!("return {OUTPUT_NAME} ;"), origin));
    }
    tokens.extend(synth("}", origin));
    tokens
}

/// Rewrites `a * b` into `mul(a, b)` when either operand is a matrix
/// variable. Row-major declarations swap the operands.
fn rewrite_matrix_products(
    tokens: Vec<Tok>,
    matrices: &HashSet<String>,
    order: MatrixOrder,
) -> Vec<Tok> {
    let mut out: Vec<Tok> = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        let left_is_operand = out.last().is_some_and(Tok::is_ident)
            && !out
                .len()
                .checked_sub(2)
                .is_some_and(|before| out[before].is("."));
        if token.is("*")
            && token.kind == TokenKind::Punct
            && left_is_operand
            && let Some(end) = operand_end(&tokens, index + 1)
        {
            let right = &tokens[index + 1..end];
            let left_is_matrix = out.last().is_some_and(|left| matrices.contains(&left.text));
            let right_is_matrix = right.len() == 1 && matrices.contains(&right[0].text);
            if (left_is_matrix || right_is_matrix)
                && let Some(left) = out.pop()
            {
                let right = rewrite_matrix_products(right.to_vec(), matrices, order);
                let (first, second) = match order {
                    MatrixOrder::Column => (vec![left], right),
                    MatrixOrder::Row => (right, vec![left]),
                };
                out.push(Tok::ident("mul", token.origin));
                out.push(Tok::punct("(", token.origin));
                out.extend(first);
                out.push(Tok::punct(",", token.origin));
                out.extend(second);
                out.push(Tok::punct(")", token.origin));
                index = end;
                continue;
            }
        }
        out.push(token.clone());
        index += 1;
    }
    out
}

/// End of the postfix expression starting at `start`: an identifier or
/// literal or parenthesised group, followed by calls, indexing and member
/// access.
fn operand_end(tokens: &[Tok], start: usize) -> Option<usize> {
    let first = tokens.get(start)?;
    let mut index = match first.kind {
        TokenKind::Ident | TokenKind::Number => start + 1,
        TokenKind::Punct if first.is("(") => matching_close(tokens, start)? + 1,
        TokenKind::Punct => return None,
    };
    loop {
        match tokens.get(index).map(|token| token.text.as_str()) {
            Some("(") if tokens[index - 1].is_ident() => {
                index = matching_close(tokens, index)? + 1;
            }
            Some("[") => index = matching_close(tokens, index)? + 1,
            Some(".") if tokens.get(index + 1).is_some_and(Tok::is_ident) => index += 2,
            _ => return Some(index),
        }
    }
}

impl Lowering<'_> {
    fn d3d11(&self) -> bool {
        self.profile.kind == ProfileKind::D3d11
    }

    fn sampler(&self, name: &str) -> Option<&Sampler> {
        self.samplers.iter().find(|sampler| sampler.name.is(name))
    }

    fn is_candidate(&self, name: &str) -> bool {
        name == "atan"
            || TYPE_RENAMES.iter().any(|(glsl, _)| *glsl == name)
            || Sampling::of(name).is_some()
    }

    fn rewrite_calls(&mut self, tokens: &[Tok]) -> Vec<Tok> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut index = 0;
        while index < tokens.len() {
            if is_call(tokens, index)
                && self.is_candidate(&tokens[index].text)
                && let Some((ranges, close)) = call_args(tokens, index + 1)
            {
                let args: Vec<Vec<Tok>> = ranges
                    .into_iter()
                    .map(|range| self.rewrite_calls(&tokens[range]))
                    .collect();
                if let Some(lowered) = self.lower_call(&tokens[index], &args) {
                    out.extend(lowered);
                    index = close + 1;
                    continue;
                }
            }
            out.push(tokens[index].clone());
            index += 1;
        }
        out
    }

    fn lower_call(&mut self, callee: &Tok, args: &[Vec<Tok>]) -> Option<Vec<Tok>> {
        let origin = callee.origin;
        if callee.is("atan") {
            return (args.len() == 2).then(|| call(callee.renamed("atan2"), args));
        }
        if let Some(width) = splat_width(&callee.text)
            && let [arg] = args
            && let [literal] = arg.as_slice()
            && literal.kind == TokenKind::Number
        {
            let repeated = vec![vec![literal.clone()]; width];
            return Some(call(callee.clone(), &repeated));
        }

        let sampling = Sampling::of(&callee.text)?;
        let [texture] = args.first()?.as_slice() else {
            return None;
        };
        let cube = self.sampler(&texture.text)?.cube;
        let rest = &args[1..];

        if !self.d3d11() {
            let function = match (sampling, cube, rest.len()) {
                (Sampling::Sample, false, 1) => "tex2D",
                (Sampling::Sample, true, 1) => "texCUBE",
                (Sampling::Sample, false, _) => "tex2Dbias",
                (Sampling::Sample, true, _) => "texCUBEbias",
                (Sampling::Level, false, _) => "tex2Dlod",
                (Sampling::Level, true, _) => "texCUBElod",
                (Sampling::Grad, false, _) => "tex2Dgrad",
                (Sampling::Grad, true, _) => "texCUBEgrad",
                (Sampling::Fetch | Sampling::Size, _, _) => return None,
            };
            let mut lowered_args = vec![vec![texture.clone()]];
            match (sampling, rest) {
                (Sampling::Level, [coord, lod]) | (Sampling::Sample, [coord, lod]) => {
                    lowered_args.push(float4(coord, lod, cube, origin));
                }
                _ => lowered_args.extend(rest.iter().cloned()),
            }
            return Some(call(callee.renamed(function), &lowered_args));
        }

        let sampler_state = Tok::ident(format!("_{}_sampler", texture.text), origin);
        let (method, method_args) = match sampling {
            Sampling::Sample if rest.len() > 1 => ("SampleBias", rest.to_vec()),
            Sampling::Sample => ("Sample", rest.to_vec()),
            Sampling::Level => ("SampleLevel", rest.to_vec()),
            Sampling::Grad => ("SampleGrad", rest.to_vec()),
            Sampling::Fetch => {
                let coord = rest.first()?;
                let lod = rest
                    .get(1)
                    .cloned()
                    .unwrap_or_else(|| vec![Tok::number("0", origin)]);
                let int3 = call(Tok::ident("int3", origin), &[coord.clone(), lod]);
                return Some(method_call(texture, callee.renamed("Load"), vec![int3]));
            }
            Sampling::Size => {
                self.texture_size_origin.get_or_insert(origin);
                let lod = rest
                    .first()
                    .cloned()
                    .unwrap_or_else(|| vec![Tok::number("0", origin)]);
                return Some(call(
                    callee.renamed(TEXTURE_SIZE_HELPER),
                    &[vec![texture.clone()], lod],
                ));
            }
        };
        let mut lowered_args = vec![vec![sampler_state]];
        lowered_args.extend(method_args);
        Some(method_call(texture, callee.renamed(method), lowered_args))
    }

    fn sampler_declarations(&self, binding_base: u32) -> Vec<Tok> {
        let mut tokens = Vec::new();
        for (slot, sampler) in self.samplers.iter().enumerate() {
            let register = binding_base as usize + slot;
            let origin = sampler.name.origin;
            let name = &sampler.name.text;
            let text = match (self.d3d11(), sampler.cube) {
                (true, false) => format!(
                    "Texture2D<float4> {name} : register ( t{register} ) ; SamplerState _{name}_sampler : register ( s{register} ) ;"
                ),
                (true, true) => format!(
                    "TextureCube<float4> {name} : register ( t{register} ) ; SamplerState _{name}_sampler : register ( s{register} ) ;"
                ),
                (false, false) => format!("sampler2D {name} : register ( s{register} ) ;"),
                (false, true) => format!("samplerCUBE {name} : register ( s{register} ) ;"),
            };
            let mut declaration = synth(&text, origin);
            for token in &mut declaration {
                if token.is(name) {
                    *token = sampler.name.clone();
                }
            }
            tokens.extend(declaration);
        }
        tokens
    }

    /// `textureSize` replacements built on `GetDimensions`.
    fn texture_size_helpers(&self, origin: SourcePosition) -> Vec<Tok> {
        let mut tokens = Vec::new();
        let mut kinds: Vec<bool> = self.samplers.iter().map(|sampler| sampler.cube).collect();
        kinds.sort_unstable();
        kinds.dedup();
        for cube in kinds {
            let texture = if cube { "TextureCube<float4>" } else { "Texture2D<float4>" };
            tokens.extend(synth(
                &format!(
                    "int2 {TEXTURE_SIZE_HELPER} ( {texture} t , int lod ) {{ uint width , height , levels ; t . GetDimensions ( lod , width , height , levels ) ; return int2 ( width , height ) ; }}"
                ),
                origin,
            ));
        }
        tokens
    }
}

/// Component count of a vector constructor that can be splatted.
fn splat_width(name: &str) -> Option<usize> {
    let digit = name
        .strip_prefix("vec")
        .or_else(|| name.strip_prefix("ivec"))
        .or_else(|| name.strip_prefix("uvec"))
        .or_else(|| name.strip_prefix("bvec"))?;
    digit.parse().ok().filter(|width| (2..=4).contains(width))
}

/// `float4(coord, 0.0, lod)` for 2D or `float4(coord, lod)` for cube
/// lookups in shader model 3.
fn float4(coord: &[Tok], lod: &[Tok], cube: bool, origin: SourcePosition) -> Vec<Tok> {
    let mut args = vec![coord.to_vec()];
    if !cube {
        args.push(vec![Tok::number("0.0", origin)]);
    }
    args.push(lod.to_vec());
    call(Tok::ident("float4", origin), &args)
}

fn call(callee: Tok, args: &[Vec<Tok>]) -> Vec<Tok> {
    let origin = callee.origin;
    let mut tokens = vec![callee, Tok::punct("(", origin)];
    for (index, arg) in args.iter().enumerate() {
        if index > 0 {
            tokens.push(Tok::punct(",", origin));
        }
        tokens.extend(arg.iter().cloned());
    }
    tokens.push(Tok::punct(")", origin));
    tokens
}

fn method_call(receiver: &Tok, method: Tok, args: Vec<Vec<Tok>>) -> Vec<Tok> {
    let mut tokens = vec![receiver.clone(), Tok::punct(".", method.origin)];
    tokens.extend(call(method, &args));
    tokens
}
