use shade_back::{BackEnd, BackEndOptions, BackEndRequest, DialectBackEnd};
use shade_ir::{IR_SOURCE_NAME, Instruction, Module, TOKEN_TEXT_OPERAND, ir_position};
use shade_model::{
    Location, MatrixOrder, ProfileKind, ShaderStage, SourceLanguage, SourcePosition, TargetProfile,
};

/// Encodes a GLSL-flavoured module whose body tokens are space-separated
/// in `body`. Tokens start at instruction 2 (after `Source` and
/// `EntryPoint`) plus one per extension.
fn module(stage: ShaderStage, version: u32, es: bool, extensions: &[&str], body: &str) -> Vec<u8> {
    let mut module = Module::new();
    module.push(Instruction::Source {
        language: SourceLanguage::Glsl,
        version,
        es,
    });
    module.push(Instruction::EntryPoint {
        stage,
        name: "main".to_string(),
    });
    for text in extensions {
        module.push(Instruction::Extension {
            text: (*text).to_string(),
        });
    }
    for word in body.split_whitespace() {
        let first = word.chars().next().unwrap();
        let instruction = if first.is_ascii_alphabetic() || first == '_' {
            Instruction::ident(word)
        } else if first.is_ascii_digit() {
            Instruction::number(word)
        } else {
            Instruction::punct(word)
        };
        module.push(instruction);
    }
    module.encode()
}

fn compile(ir: &[u8], profile: TargetProfile) -> shade_back::BackEndOutput {
    DialectBackEnd
        .compile(&BackEndRequest::new(ir, profile, "out.txt"))
        .unwrap()
}

fn compile_with(ir: &[u8], profile: TargetProfile, options: BackEndOptions) -> String {
    DialectBackEnd
        .compile(&BackEndRequest::new(ir, profile, "out.txt").options(options))
        .unwrap()
        .text
}

const VERTEX: &str = "void main ( ) { gl_Position = vec4 ( 1 , 2 , 3 , 4 ) ; }";
const FRAGMENT_LOD: &str = "uniform sampler2D tex ; varying vec2 uv ; void main ( ) { gl_FragColor = textureLod ( tex , uv , 0.0 ) ; }";
const HLSL_VERTEX: &str = "uniform mat4 mvp ; in vec3 pos ; void main ( ) { gl_Position = mvp * vec4 ( pos , 1.0 ) ; }";
const SAMPLING: &str = "uniform sampler2D tex ; in vec2 uv ; out vec4 color ; void main ( ) { color = texture ( tex , uv ) ; }";

#[test]
fn glsl_output_maps_every_token_to_ir() {
    let ir = module(ShaderStage::Vertex, 330, false, &[], VERTEX);
    let output = compile(&ir, TargetProfile::new(ProfileKind::Glsl, 330));
    assert_eq!(
        output.text,
        "#version 330\nvoid main() {\n    gl_Position = vec4(1, 2, 3, 4);\n}\n"
    );

    assert_eq!(output.map.file(), "out.txt");
    assert_eq!(output.map.sources(), [IR_SOURCE_NAME]);
    let header = output.map.lookup(SourcePosition::generated(1, 0)).unwrap();
    assert_eq!(header.original, ir_position(0, 0));
    // gl_Position is the sixth body token: instruction 7.
    let position = output.map.lookup(SourcePosition::generated(3, 4)).unwrap();
    assert_eq!(position.original, ir_position(7, TOKEN_TEXT_OPERAND));
    assert!(output.diagnostics.is_empty());
}

#[test]
fn explicit_lod_in_essl100_fragment_is_reported_at_the_ir_position() {
    let ir = module(ShaderStage::Fragment, 100, true, &[], FRAGMENT_LOD);
    let err = DialectBackEnd
        .compile(&BackEndRequest::new(
            &ir,
            TargetProfile::new(ProfileKind::Essl, 100),
            "lod.frag.essl100.glsl",
        ))
        .unwrap_err();
    assert_eq!(err.diagnostics.len(), 1);
    let diagnostic = &err.diagnostics[0];
    assert!(diagnostic.is_error());
    assert!(diagnostic.message.contains("textureLod"), "{}", diagnostic.message);
    // textureLod is instruction 17.
    assert_eq!(
        diagnostic.location,
        Some(Location::new(IR_SOURCE_NAME, 18, TOKEN_TEXT_OPERAND))
    );
}

#[test]
fn texture_lod_extension_enables_legacy_lod_sampling() {
    let ir = module(
        ShaderStage::Fragment,
        100,
        true,
        &["GL_EXT_shader_texture_lod : enable"],
        FRAGMENT_LOD,
    );
    let output = compile(&ir, TargetProfile::new(ProfileKind::Essl, 100));
    assert!(output.text.contains("#extension GL_EXT_shader_texture_lod : enable\n"));
    assert!(output.text.contains("precision highp float;\n"));
    assert!(output.text.contains("gl_FragColor = texture2DLodEXT(tex, uv, 0.0);"));
}

#[test]
fn essl300_output_uses_modern_interface() {
    let ir = module(ShaderStage::Fragment, 100, true, &[], FRAGMENT_LOD);
    let output = compile(&ir, TargetProfile::new(ProfileKind::Essl, 300));
    insta::assert_snapshot!(output.text, @r"
#version 300 es
precision highp float;
out vec4 frag_color;
uniform sampler2D tex;
in vec2 uv;
void main() {
    frag_color = textureLod(tex, uv, 0.0);
}
");
}

#[test]
fn relaxed_essl_defaults_to_mediump() {
    let ir = module(ShaderStage::Fragment, 100, true, &[], SAMPLING);
    let output = compile(&ir, TargetProfile::new(ProfileKind::Essl, 100).relaxed(true));
    assert!(output.text.starts_with("#version 100\nprecision mediump float;\n"));
}

#[test]
fn legacy_glsl_renames_outputs_and_sampling() {
    let ir = module(ShaderStage::Fragment, 330, false, &[], SAMPLING);
    let output = compile(&ir, TargetProfile::new(ProfileKind::Glsl, 110));
    assert_eq!(
        output.text,
        "#version 110\nuniform sampler2D tex;\nvarying vec2 uv;\nvoid main() {\n    gl_FragColor = texture2D(tex, uv);\n}\n"
    );
    let renamed = output.map.lookup(SourcePosition::generated(5, 4)).unwrap();
    assert_eq!(renamed.name.as_deref(), Some("color"));
}

#[test]
fn d3d11_vertex_wraps_the_entry_point() {
    let ir = module(ShaderStage::Vertex, 330, false, &[], HLSL_VERTEX);
    let output = compile(&ir, TargetProfile::new(ProfileKind::D3d11, 11));
    assert_eq!(
        output.text,
        "cbuffer Uniforms : register(b0) {
    float4x4 mvp;
};
static float3 pos;
static float4 gl_Position;
struct StageInput {
    float3 pos : TEXCOORD0;
};
struct StageOutput {
    float4 gl_Position : SV_Position;
};
void vert_main() {
    gl_Position = mul(mvp, float4(pos, 1.0));
}
StageOutput main(StageInput stage_input) {
    pos = stage_input.pos;
    vert_main();
    StageOutput stage_output;
    stage_output.gl_Position = gl_Position;
    return stage_output;
}
"
    );
}

#[test]
fn row_major_matrices_swap_products_and_add_pragma() {
    let ir = module(ShaderStage::Vertex, 330, false, &[], HLSL_VERTEX);
    let options = BackEndOptions {
        matrix_order: MatrixOrder::Row,
        binding_base: 0,
    };
    let text = compile_with(&ir, TargetProfile::new(ProfileKind::D3d11, 11), options);
    assert!(text.starts_with("#pragma pack_matrix(row_major)\n"));
    assert!(text.contains("gl_Position = mul(float4(pos, 1.0), mvp);"));
}

#[test]
fn d3d11_samplers_use_texture_objects_from_the_binding_base() {
    let ir = module(ShaderStage::Fragment, 330, false, &[], SAMPLING);
    let options = BackEndOptions {
        binding_base: 2,
        ..BackEndOptions::default()
    };
    let text = compile_with(&ir, TargetProfile::new(ProfileKind::D3d11, 11), options);
    assert!(text.contains("Texture2D<float4> tex : register(t2);\n"));
    assert!(text.contains("SamplerState _tex_sampler : register(s2);\n"));
    assert!(text.contains("color = tex.Sample(_tex_sampler, uv);"));
    assert!(text.contains("float4 color : SV_Target0;"));
}

#[test]
fn d3d9_samplers_use_legacy_intrinsics() {
    let ir = module(ShaderStage::Fragment, 330, false, &[], SAMPLING);
    let output = compile(&ir, TargetProfile::new(ProfileKind::D3d9, 9));
    assert!(output.text.contains("sampler2D tex : register(s0);\n"));
    assert!(output.text.contains("color = tex2D(tex, uv);"));
    assert!(output.text.contains("float4 color : COLOR0;"));
    assert!(output.text.contains("float2 uv : TEXCOORD0;"));
}

#[test]
fn d3d9_lod_sampling_packs_the_level() {
    let body = "uniform sampler2D tex ; in vec2 uv ; out vec4 color ; void main ( ) { color = textureLod ( tex , uv , 2.0 ) ; }";
    let ir = module(ShaderStage::Fragment, 330, false, &[], body);
    let output = compile(&ir, TargetProfile::new(ProfileKind::D3d9, 9));
    assert!(output.text.contains("color = tex2Dlod(tex, float4(uv, 0.0, 2.0));"));
}

#[test]
fn hlsl_renames_intrinsics() {
    let body = "in vec2 uv ; out vec4 color ; void main ( ) { color = vec4 ( fract ( uv ) , atan ( uv . y , uv . x ) , mix ( 0.0 , 1.0 , 0.5 ) ) ; }";
    let ir = module(ShaderStage::Fragment, 330, false, &[], body);
    let output = compile(&ir, TargetProfile::new(ProfileKind::D3d11, 11));
    assert!(
        output
            .text
            .contains("color = float4(frac(uv), atan2(uv.y, uv.x), lerp(0.0, 1.0, 0.5));"),
        "{}",
        output.text
    );
}

#[test]
fn hlsl_compute_declares_thread_group_size() {
    let body = "layout ( local_size_x = 8 , local_size_y = 4 ) in ; void main ( ) { uint i = gl_GlobalInvocationID . x ; }";
    let ir = module(ShaderStage::Compute, 430, false, &[], body);
    let output = compile(&ir, TargetProfile::new(ProfileKind::D3d11, 11));
    assert!(output.text.contains("uint3 gl_GlobalInvocationID : SV_DispatchThreadID;"));
    assert!(
        output
            .text
            .contains("[numthreads(8, 4, 1)] void main(StageInput stage_input) {")
    );
    assert!(output.text.contains("void comp_main() {"));
}

#[test]
fn metal_moves_interface_into_structs() {
    let body = "uniform mat4 mvp ; in vec3 pos ; out vec2 uv ; void main ( ) { uv = pos . xy ; gl_Position = mvp * vec4 ( pos , 1.0 ) ; }";
    let ir = module(ShaderStage::Vertex, 330, false, &[], body);
    let output = DialectBackEnd
        .compile(
            &BackEndRequest::new(&ir, TargetProfile::new(ProfileKind::Metal, 1), "basic.vert.metal")
                .source_stem("basic.vert"),
        )
        .unwrap();
    assert_eq!(
        output.text,
        "#include <metal_stdlib>
using namespace metal;
struct basic_vert_uniforms {
    float4x4 mvp;
};
struct basic_vert_in {
    float3 pos [[attribute(0)]];
};
struct basic_vert_out {
    float2 uv [[user(locn0)]];
    float4 gl_Position [[position]];
};
vertex basic_vert_out basic_vert_main(basic_vert_in input [[stage_in]], constant basic_vert_uniforms & uniforms [[buffer(0)]]) {
    basic_vert_out output;
    output.uv = input.pos.xy;
    output.gl_Position = uniforms.mvp * float4(input.pos, 1.0);
    return output;
}
"
    );
}

#[test]
fn metal_fragment_samples_through_sampler_parameters() {
    let ir = module(ShaderStage::Fragment, 330, false, &[], SAMPLING);
    let output = DialectBackEnd
        .compile(
            &BackEndRequest::new(&ir, TargetProfile::new(ProfileKind::Metal, 1), "blit.frag.metal")
                .source_stem("blit.frag"),
        )
        .unwrap();
    assert!(output.text.contains("texture2d<float> tex [[texture(0)]], sampler tex_sampler [[sampler(0)]]"));
    assert!(output.text.contains("output.color = tex.sample(tex_sampler, input.uv);"));
    assert!(output.text.contains("float4 color [[color(0)]];"));
}

#[test]
fn varlist_lists_declarations() {
    let body = "uniform mat4 mvp ; uniform vec4 lights [ 4 ] ; attribute vec3 pos ; varying vec2 uv ; void main ( ) { }";
    let ir = module(ShaderStage::Vertex, 110, false, &[], body);
    let output = compile(&ir, TargetProfile::new(ProfileKind::VarList, 1));
    assert_eq!(
        output.text,
        "vertex\nuniform mat4 mvp\nuniform vec4[] lights\nin vec3 pos\nout vec2 uv\n"
    );
}

#[test]
fn unsupported_stage_is_reported_at_the_entry_point() {
    let ir = module(ShaderStage::Compute, 430, false, &[], "void main ( ) { }");
    let err = DialectBackEnd
        .compile(&BackEndRequest::new(
            &ir,
            TargetProfile::new(ProfileKind::D3d9, 9),
            "out.hlsl",
        ))
        .unwrap_err();
    assert_eq!(
        err.diagnostics[0].location,
        Some(Location::new(IR_SOURCE_NAME, 2, 0))
    );
}

#[test]
fn malformed_ir_is_rejected() {
    let err = DialectBackEnd
        .compile(&BackEndRequest::new(
            &[1, 2, 3],
            TargetProfile::new(ProfileKind::Glsl, 330),
            "out.glsl",
        ))
        .unwrap_err();
    assert!(err.diagnostics[0].message.starts_with("malformed IR"));
}

#[test]
fn spirv_has_no_text_lowering() {
    let ir = module(ShaderStage::Vertex, 330, false, &[], VERTEX);
    let err = DialectBackEnd
        .compile(&BackEndRequest::new(
            &ir,
            TargetProfile::new(ProfileKind::Spirv, 1),
            "out.spv",
        ))
        .unwrap_err();
    assert!(err.diagnostics[0].message.contains("IR module itself"));
}
