use shade_front::{FrontEnd, FrontEndRequest, MemoryIncluder, ReferenceFrontEnd};
use shade_ir::{Instruction, Module, TOKEN_TEXT_OPERAND, ir_position};
use shade_model::{Define, Granularity, Location, ShaderStage, SourceLanguage, SourcePosition};

const VERTEX: &str = "void main(){ gl_Position = vec4(1,2,3,4); }";

fn token_index(module: &Module, text: &str) -> usize {
    module
        .tokens()
        .find(|(_, _, token)| *token == text)
        .map(|(index, _, _)| index)
        .unwrap()
}

#[test]
fn lowers_tokens_and_maps_them_to_surface_positions() {
    let request = FrontEndRequest::new(ShaderStage::Vertex, "basic.vert", VERTEX);
    let output = ReferenceFrontEnd.compile(&request).unwrap();
    let module = Module::decode(&output.ir).unwrap();

    assert_eq!(
        module.entry_point().map(|(_, stage, name)| (stage, name)),
        Some((ShaderStage::Vertex, "main"))
    );
    assert_eq!(module.tokens().count(), 19);

    let index = token_index(&module, "gl_Position");
    let entry = output
        .map
        .lookup(ir_position(index, TOKEN_TEXT_OPERAND))
        .unwrap();
    assert_eq!(entry.original, SourcePosition::new(0, 1, 13));
    assert_eq!(output.map.sources(), ["basic.vert"]);
    assert_eq!(
        output.map.sources_content(),
        Some(&[Some(VERTEX.to_string())][..])
    );
}

#[test]
fn line_granularity_records_line_starts() {
    let request = FrontEndRequest::new(ShaderStage::Vertex, "basic.vert", VERTEX)
        .granularity(Granularity::Line);
    let output = ReferenceFrontEnd.compile(&request).unwrap();
    assert!(output
        .map
        .mappings()
        .iter()
        .all(|entry| entry.original.column == 0));
}

#[test]
fn canonicalizes_hlsl() {
    let source = "float4 frag(float2 uv) { return lerp(float4(0,0,0,1), float4(uv, 0, 1), 0.5); }";
    let request = FrontEndRequest::new(ShaderStage::Fragment, "blit.frag.hlsl", source)
        .language(SourceLanguage::Hlsl)
        .entry_point("frag");
    let output = ReferenceFrontEnd.compile(&request).unwrap();
    let module = Module::decode(&output.ir).unwrap();

    let texts: Vec<&str> = module.tokens().map(|(_, _, text)| text).take(6).collect();
    assert_eq!(texts, vec!["vec4", "main", "(", "vec2", "uv", ")"]);
    assert_eq!(
        module.source().map(|(language, ..)| language),
        Some(SourceLanguage::Hlsl)
    );

    let index = token_index(&module, "mix");
    let entry = output.map.lookup(ir_position(index, TOKEN_TEXT_OPERAND)).unwrap();
    assert_eq!(entry.name.as_deref(), Some("lerp"));
}

#[test]
fn defines_select_source_branches() {
    let source = "#ifdef GL_ES\nprecision mediump float;\n#endif\nvoid main() { gl_FragColor = vec4(GLSL); }";
    let defines = [Define::with_value("GLSL", "100"), Define::new("GL_ES")];
    let request =
        FrontEndRequest::new(ShaderStage::Fragment, "a.frag", source).defines(&defines);
    let module = Module::decode(&ReferenceFrontEnd.compile(&request).unwrap().ir).unwrap();
    let texts: Vec<&str> = module.tokens().map(|(_, _, text)| text).collect();
    assert_eq!(&texts[..4], ["precision", "mediump", "float", ";"]);
    assert!(texts.contains(&"100"));
}

#[test]
fn includes_are_recorded_as_sources() {
    let includer = MemoryIncluder::new().with_file("common.glsl", "uniform vec4 tint;\n");
    let source = "#include \"common.glsl\"\nvoid main() { gl_FragColor = tint; }";
    let request =
        FrontEndRequest::new(ShaderStage::Fragment, "a.frag", source).includer(&includer);
    let output = ReferenceFrontEnd.compile(&request).unwrap();
    let module = Module::decode(&output.ir).unwrap();

    assert_eq!(output.map.sources(), ["a.frag", "common.glsl"]);
    let index = token_index(&module, "uniform");
    let location = output.map.resolve(index as u32 + 1, TOKEN_TEXT_OPERAND).unwrap();
    assert_eq!(location, Location::new("common.glsl", 1, 0));
}

#[test]
fn forwards_version_and_extensions() {
    let source = "#version 300 es\n#extension GL_EXT_shader_texture_lod : enable\nvoid main() {}";
    let request = FrontEndRequest::new(ShaderStage::Fragment, "a.frag", source);
    let module = Module::decode(&ReferenceFrontEnd.compile(&request).unwrap().ir).unwrap();
    assert_eq!(module.source(), Some((SourceLanguage::Glsl, 300, true)));
    assert!(matches!(
        &module.instructions()[2],
        Instruction::Extension { text } if text == "GL_EXT_shader_texture_lod : enable"
    ));
}

#[test]
fn failures_carry_every_diagnostic_with_locations() {
    let source = "void mian() {\n  x = (1;\n}\n#if 1\n";
    let request = FrontEndRequest::new(ShaderStage::Fragment, "broken.frag", source);
    let err = ReferenceFrontEnd.compile(&request).unwrap_err();
    let rendered: Vec<String> = err.diagnostics.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "broken.frag:4:0: error: unterminated conditional directive",
            "broken.frag:3:0: error: '}' does not close '('",
            "broken.frag:1:12: error: unclosed '{'",
            "broken.frag:1:0: error: entry point 'main' is not defined",
        ]
    );
}
