//! Lowering to the Metal shading language.
//!
//! Interface variables move into `<stem>_in`, `<stem>_out` and
//! `<stem>_uniforms` structs and the body reaches them through `input.`,
//! `output.` and `uniforms.`. The entry function becomes
//! `vertex|fragment|kernel <stem>_main`.

use shade_ir::TokenKind;
use shade_model::{ShaderStage, SourcePosition};

use crate::format::{Emission, Line};
use crate::program::{
    Interface, Program, Storage, Var, is_local_size_declaration, parse_interface, split_items,
};
use crate::tok::{Tok, call_args, is_call, matching_close, sanitize, synth};

const RENAMES: [(&str, &str); 19] = [
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
    ("dFdx", "dfdx"),
    ("dFdy", "dfdy"),
    ("inversesqrt", "rsqrt"),
    ("mod", "fmod"),
];

/// Builtins that become entry parameters: (name, type, attribute, stage).
const BUILTIN_PARAMETERS: [(&str, &str, &str, ShaderStage); 6] = [
    ("gl_VertexID", "uint", "[[vertex_id]]", ShaderStage::Vertex),
    ("gl_InstanceID", "uint", "[[instance_id]]", ShaderStage::Vertex),
    (
        "gl_GlobalInvocationID",
        "uint3",
        "[[thread_position_in_grid]]",
        ShaderStage::Compute,
    ),
    (
        "gl_LocalInvocationID",
        "uint3",
        "[[thread_position_in_threadgroup]]",
        ShaderStage::Compute,
    ),
    (
        "gl_WorkGroupID",
        "uint3",
        "[[threadgroup_position_in_grid]]",
        ShaderStage::Compute,
    ),
    (
        "gl_LocalInvocationIndex",
        "uint",
        "[[thread_index_in_threadgroup]]",
        ShaderStage::Compute,
    ),
];

/// Builtins that become struct members: (name, type, attribute, stage, output).
const BUILTIN_MEMBERS: [(&str, &str, &str, ShaderStage, bool); 5] = [
    ("gl_Position", "float4", "[[position]]", ShaderStage::Vertex, true),
    ("gl_PointSize", "float", "[[point_size]]", ShaderStage::Vertex, true),
    ("gl_FragCoord", "float4", "[[position]]", ShaderStage::Fragment, false),
    ("gl_FragColor", "float4", "[[color(0)]]", ShaderStage::Fragment, true),
    ("gl_FragDepth", "float", "[[depth(any)]]", ShaderStage::Fragment, true),
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Input,
    Output,
    Uniform,
}

impl Scope {
    fn receiver(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Output => "output",
            Self::Uniform => "uniforms",
        }
    }
}

struct Member {
    ty: Tok,
    var: Var,
    attribute: String,
}

struct Layout {
    stem: String,
    stage: ShaderStage,
    inputs: Vec<Member>,
    outputs: Vec<Member>,
    uniforms: Vec<Member>,
    samplers: Vec<(Tok, bool)>,
    parameters: Vec<(Tok, &'static str, &'static str)>,
}

impl Layout {
    fn scope_of(&self, name: &str) -> Option<Scope> {
        let find = |members: &[Member]| members.iter().any(|member| member.var.name.is(name));
        if find(&self.inputs) {
            Some(Scope::Input)
        } else if find(&self.outputs) {
            Some(Scope::Output)
        } else if find(&self.uniforms) {
            Some(Scope::Uniform)
        } else {
            None
        }
    }

    fn is_sampler(&self, name: &str) -> bool {
        self.samplers.iter().any(|(sampler, _)| sampler.is(name))
    }

    fn struct_name(&self, suffix: &str) -> String {
        format!("{}_{suffix}", self.stem)
    }

    fn returns_output(&self) -> bool {
        self.stage != ShaderStage::Compute
    }
}

pub fn lower(program: &Program, source_stem: &str) -> Emission {
    let stage = program.stage;
    let header = vec![
        Line::new("#include <metal_stdlib>", program.source_origin),
        Line::new("using namespace metal;", program.source_origin),
    ];

    let mut layout = Layout {
        stem: sanitize(source_stem),
        stage,
        inputs: Vec::new(),
        outputs: Vec::new(),
        uniforms: Vec::new(),
        samplers: Vec::new(),
        parameters: Vec::new(),
    };

    let items = split_items(&program.tokens);
    let mut others = Vec::new();
    let mut entry = None;
    for item in items {
        if item.is_precision_statement() || is_local_size_declaration(&item) {
            continue;
        }
        if item.function_name() == Some("main") {
            entry = Some(item);
            continue;
        }
        match parse_interface(&item) {
            Some(interface) => add_interface(&mut layout, &interface),
            None => others.push(item),
        }
    }
    add_builtins(&mut layout, &program.tokens);

    let mut tokens = Vec::new();
    for (suffix, members) in [
        ("uniforms", &layout.uniforms),
        ("in", &layout.inputs),
        ("out", &layout.outputs),
    ] {
        tokens.extend(member_struct(
            &layout.struct_name(suffix),
            members,
            program.entry_origin,
        ));
    }

    for item in &others {
        if item.tokens.first().is_some_and(|token| token.is("const")) && item.function().is_none() {
            tokens.push(item.tokens[0].renamed("constant"));
            tokens.extend(rewrite(&layout, &item.tokens[1..], false));
        } else {
            tokens.extend(rewrite(&layout, &item.tokens, false));
        }
    }
    if let Some(entry) = entry
        && let Some((_, open, close)) = entry.function()
    {
        tokens.extend(entry_signature(&layout, program.entry_origin));
        tokens.push(entry.tokens[open].clone());
        if layout.returns_output() {
            tokens.extend(synth(
                &format!("{} output ;", layout.struct_name("out")),
                program.entry_origin,
            ));
        }
        tokens.extend(rewrite(&layout, &entry.tokens[open + 1..close], true));
        if layout.returns_output() {
            tokens.extend(synth("return output ;", entry.tokens[close].origin));
        }
        tokens.push(entry.tokens[close].clone());
    }

    Emission { header, tokens }
}

fn add_interface(layout: &mut Layout, interface: &Interface) {
    let stage = layout.stage;
    for var in &interface.vars {
        if interface.storage == Storage::Uniform {
            if interface.is_sampler() {
                layout
                    .samplers
                    .push((var.name.clone(), interface.is_cube_sampler()));
            } else {
                layout.uniforms.push(Member {
                    ty: interface.ty.clone(),
                    var: var.clone(),
                    attribute: String::new(),
                });
            }
        } else if interface.storage.is_input(stage) {
            let slot = layout.inputs.len();
            let attribute = if stage == ShaderStage::Vertex {
                format!("[[attribute({slot})]]")
            } else {
                format!("[[user(locn{slot})]]")
            };
            layout.inputs.push(Member {
                ty: interface.ty.clone(),
                var: var.clone(),
                attribute,
            });
        } else {
            let slot = layout.outputs.len();
            let attribute = if stage == ShaderStage::Fragment {
                format!("[[color({slot})]]")
            } else {
                format!("[[user(locn{slot})]]")
            };
            layout.outputs.push(Member {
                ty: interface.ty.clone(),
                var: var.clone(),
                attribute,
            });
        }
    }
}

fn add_builtins(layout: &mut Layout, tokens: &[Tok]) {
    let first_use = |name: &str| tokens.iter().find(|token| token.is(name));
    for (name, ty, attribute, stage, output) in BUILTIN_MEMBERS {
        if stage != layout.stage {
            continue;
        }
        let Some(token) = first_use(name) else {
            continue;
        };
        let member = Member {
            ty: Tok::ident(ty, token.origin),
            var: Var {
                name: Tok::ident(name, token.origin),
                array: Vec::new(),
            },
            attribute: attribute.to_string(),
        };
        if output {
            layout.outputs.push(member);
        } else {
            layout.inputs.push(member);
        }
    }
    if layout.stage == ShaderStage::Fragment
        && let Some(token) = first_use("gl_FragData")
    {
        for slot in 0..frag_data_slots(tokens) {
            layout.outputs.push(Member {
                ty: Tok::ident("float4", token.origin),
                var: Var {
                    name: Tok::ident(format!("gl_FragData_{slot}"), token.origin),
                    array: Vec::new(),
                },
                attribute: format!("[[color({slot})]]"),
            });
        }
    }
    for (name, ty, attribute, stage) in BUILTIN_PARAMETERS {
        if stage == layout.stage
            && let Some(token) = first_use(name)
        {
            layout
                .parameters
                .push((Tok::ident(name, token.origin), ty, attribute));
        }
    }
}

fn frag_data_slots(tokens: &[Tok]) -> usize {
    tokens
        .windows(3)
        .filter(|window| window[0].is("gl_FragData") && window[1].is("["))
        .filter_map(|window| window[2].text.parse::<usize>().ok())
        .map(|slot| slot + 1)
        .max()
        .unwrap_or(1)
}

fn member_struct(name: &str, members: &[Member], origin: SourcePosition) -> Vec<Tok> {
    if members.is_empty() {
        return Vec::new();
    }
    let mut tokens = synth(&format!("struct {name} {{"), origin);
    for member in members {
        let at = member.var.name.origin;
        tokens.push(rename(&member.ty));
        tokens.push(member.var.name.clone());
        tokens.extend(member.var.array.iter().cloned());
        if !member.attribute.is_empty() {
            tokens.push(Tok::ident(member.attribute.as_str(), at));
        }
        tokens.push(Tok::punct(";", at));
    }
    tokens.extend(synth("} ;", origin));
    tokens
}

fn entry_signature(layout: &Layout, origin: SourcePosition) -> Vec<Tok> {
    let qualifier = match layout.stage {
        ShaderStage::Fragment => "fragment",
        ShaderStage::Compute => "kernel",
        _ => "vertex",
    };
    let result = if layout.returns_output() {
        layout.struct_name("out")
    } else {
        "void".to_string()
    };
    let mut parameters: Vec<Vec<Tok>> = Vec::new();
    if !layout.inputs.is_empty() {
        parameters.push(synth(
            &format!("{} input [[stage_in]]", layout.struct_name("in")),
            origin,
        ));
    }
    if !layout.uniforms.is_empty() {
        parameters.push(synth(
            &format!("constant {} & uniforms [[buffer(0)]]", layout.struct_name("uniforms")),
            origin,
        ));
    }
    for (slot, (sampler, cube)) in layout.samplers.iter().enumerate() {
        let texture = if *cube { "texturecube<float>" } else { "texture2d<float>" };
        let mut texture_parameter = vec![Tok::ident(texture, sampler.origin), sampler.clone()];
        texture_parameter.push(Tok::ident(format!("[[texture({slot})]]"), sampler.origin));
        parameters.push(texture_parameter);
        parameters.push(synth(
            &format!("sampler {}_sampler [[sampler({slot})]]", sampler.text),
            sampler.origin,
        ));
    }
    for (name, ty, attribute) in &layout.parameters {
        parameters.push(vec![
            Tok::ident(*ty, name.origin),
            name.clone(),
            Tok::ident(*attribute, name.origin),
        ]);
    }

    let mut tokens = synth(
        &format!("{qualifier} {result} {}_main (", layout.stem),
        origin,
    );
    for (index, parameter) in parameters.into_iter().enumerate() {
        if index > 0 {
            tokens.push(Tok::punct(",", origin));
        }
        tokens.extend(parameter);
    }
    tokens.push(Tok::punct(")", origin));
    tokens
}

fn rename(token: &Tok) -> Tok {
    if !token.is_ident() {
        return token.clone();
    }
    RENAMES
        .iter()
        .find(|(glsl, _)| token.is(glsl))
        .map_or_else(|| token.clone(), |(_, metal)| token.renamed(*metal))
}

/// Rewrites a token run: interface references, sampling calls, `return`
/// statements and vocabulary.
fn rewrite(layout: &Layout, tokens: &[Tok], in_entry: bool) -> Vec<Tok> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        let member_access = index > 0 && tokens[index - 1].is(".");

        if is_call(tokens, index)
            && let Some((lowered, next)) = lower_call(layout, tokens, index, in_entry)
        {
            out.extend(lowered);
            index = next;
            continue;
        }

        if token.is("gl_FragData")
            && tokens.get(index + 1).is_some_and(|next| next.is("["))
            && let Some(close) = matching_close(tokens, index + 1)
            && close == index + 3
        {
            let slot = &tokens[index + 2].text;
            out.extend(synth("output .", token.origin));
            out.push(token.renamed(format!("gl_FragData_{slot}")));
            index = close + 1;
            continue;
        }

        if token.is_ident()
            && !member_access
            && let Some(scope) = layout.scope_of(&token.text)
        {
            out.extend(synth(&format!("{} .", scope.receiver()), token.origin));
            out.push(token.clone());
            index += 1;
            continue;
        }

        if token.is("return")
            && in_entry
            && layout.returns_output()
            && tokens.get(index + 1).is_some_and(|next| next.is(";"))
        {
            out.push(token.clone());
            out.push(Tok::ident("output", token.origin));
            index += 1;
            continue;
        }

        out.push(rename(token));
        index += 1;
    }
    out
}

/// Lowers the call at `index`, returning the tokens and the index after
/// the call.
fn lower_call(
    layout: &Layout,
    tokens: &[Tok],
    index: usize,
    in_entry: bool,
) -> Option<(Vec<Tok>, usize)> {
    let callee = &tokens[index];
    if !matches!(
        callee.text.as_str(),
        "atan" | "texture" | "texture2D" | "textureCube" | "texelFetch" | "textureSize"
    ) {
        return None;
    }
    let (ranges, close) = call_args(tokens, index + 1)?;
    let args: Vec<Vec<Tok>> = ranges
        .into_iter()
        .map(|range| rewrite(layout, &tokens[range], in_entry))
        .collect();
    let origin = callee.origin;

    if callee.is("atan") {
        return (args.len() == 2).then(|| (call(callee.renamed("atan2"), &args), close + 1));
    }

    let [texture] = args.first()?.as_slice() else {
        return None;
    };
    if !layout.is_sampler(&texture.text) {
        return None;
    }
    let rest = &args[1..];
    let sampler_state = Tok::ident(format!("{}_sampler", texture.text), origin);
    let lowered = match callee.text.as_str() {
        "texture" | "texture2D" | "textureCube" => {
            let mut method_args = vec![vec![sampler_state]];
            method_args.push(rest.first()?.clone());
            if let Some(bias) = rest.get(1) {
                method_args.push(call(Tok::ident("bias", origin), std::slice::from_ref(bias)));
            }
            method_call(texture, callee.renamed("sample"), &method_args)
        }
        "texelFetch" => {
            let coord = call(Tok::ident("uint2", origin), std::slice::from_ref(rest.first()?));
            let mut method_args = vec![coord];
            method_args.extend(rest.get(1).cloned());
            method_call(texture, callee.renamed("read"), &method_args)
        }
        "textureSize" => {
            let lod = rest.first().cloned().unwrap_or_default();
            let width = method_call(
                texture,
                Tok::ident("get_width", origin),
                std::slice::from_ref(&lod),
            );
            let height = method_call(texture, Tok::ident("get_height", origin), &[lod]);
            call(callee.renamed("int2"), &[width, height])
        }
        _ => return None,
    };
    Some((lowered, close + 1))
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

fn method_call(receiver: &Tok, method: Tok, args: &[Vec<Tok>]) -> Vec<Tok> {
    let mut tokens = vec![receiver.clone(), Tok::new(TokenKind::Punct, ".", method.origin)];
    tokens.extend(call(method, args));
    tokens
}
