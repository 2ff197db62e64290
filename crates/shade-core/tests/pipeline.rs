use shade_back::{BackEnd, BackEndError, BackEndOutput, BackEndRequest, DialectBackEnd};
use shade_front::{FrontEnd, FrontEndError, FrontEndOutput, FrontEndRequest, ReferenceFrontEnd};
use shade_model::{
    DiagnosticOrigin, Granularity, Location, ProfileKind, ShaderStage, TargetProfile, WorkItem,
};
use shade_core::{CancelToken, DriverState, Outcome, PipelineDriver, PipelineOptions};

const VERTEX: &str = "void main(){ gl_Position = vec4(1,2,3,4); }";

const LOD_FRAGMENT: &str = "uniform sampler2D tex;
varying vec2 uv;
void main() {
    gl_FragColor = textureLod(tex, uv, 0.0);
}
";

fn translate(item: WorkItem, source: &str, options: &PipelineOptions) -> shade_core::PipelineResult {
    PipelineDriver::new(&ReferenceFrontEnd, &DialectBackEnd, options).translate(item, source)
}

fn glsl330_vertex() -> WorkItem {
    WorkItem::new(
        "basic.vert",
        ShaderStage::Vertex,
        TargetProfile::new(ProfileKind::Glsl, 330),
    )
}

#[test]
fn vertex_statement_maps_back_to_the_start_of_line_one() {
    let options = PipelineOptions {
        granularity: Granularity::Line,
        ..PipelineOptions::default()
    };
    let result = translate(glsl330_vertex(), VERTEX, &options);
    assert_eq!(result.state, DriverState::Done);

    let translation = result.translation().expect("success");
    let text = translation.text().expect("utf-8 output");
    assert!(
        text.contains("    gl_Position = vec4(1, 2, 3, 4);\n"),
        "{text}"
    );
    let line = text
        .lines()
        .position(|line| line.contains("gl_Position"))
        .expect("statement line") as u32
        + 1;

    assert_eq!(translation.map.file(), "basic.vert.glsl330.glsl");
    assert_eq!(translation.map.sources(), ["basic.vert"]);
    assert_eq!(
        translation.map.resolve(line, 4),
        Some(Location::new("basic.vert", 1, 0))
    );
    assert!(translation.gaps.is_empty());
}

#[test]
fn token_granularity_keeps_surface_columns() {
    let result = translate(glsl330_vertex(), VERTEX, &PipelineOptions::default());
    let translation = result.translation().expect("success");
    assert_eq!(
        translation.map.resolve(3, 4),
        Some(Location::new("basic.vert", 1, 13))
    );
    // The header is attributed to the start of the source.
    assert_eq!(
        translation.map.resolve(1, 0),
        Some(Location::new("basic.vert", 1, 0))
    );
}

#[test]
fn back_end_errors_point_at_the_surface_source() {
    let item = WorkItem::new(
        "lod.frag",
        ShaderStage::Fragment,
        TargetProfile::new(ProfileKind::Essl, 100),
    );
    let result = translate(item, LOD_FRAGMENT, &PipelineOptions::default());
    assert_eq!(result.state, DriverState::BackEndFailed);
    assert!(!result.is_success());

    let diagnostics = result.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.origin, DiagnosticOrigin::BackEnd);
    assert!(diagnostic.message.contains("textureLod"), "{}", diagnostic.message);
    assert_eq!(diagnostic.location, Some(Location::new("lod.frag", 4, 19)));
}

#[test]
fn the_same_source_succeeds_for_a_capable_target() {
    let item = WorkItem::new(
        "lod.frag",
        ShaderStage::Fragment,
        TargetProfile::new(ProfileKind::Glsl, 330),
    );
    let result = translate(item, LOD_FRAGMENT, &PipelineOptions::default());
    assert!(result.is_success(), "{:?}", result.diagnostics());
}

#[test]
fn front_end_errors_end_in_the_front_end_failed_state() {
    let item = WorkItem::new(
        "broken.vert",
        ShaderStage::Vertex,
        TargetProfile::new(ProfileKind::Glsl, 330),
    );
    let result = translate(item, "void main() {\n", &PipelineOptions::default());
    assert_eq!(result.state, DriverState::FrontEndFailed);
    let Outcome::Failure { diagnostics } = &result.outcome else {
        panic!("expected failure");
    };
    assert!(!diagnostics.is_empty());
    assert!(diagnostics.iter().all(|diagnostic| {
        diagnostic.origin == DiagnosticOrigin::FrontEnd
            && diagnostic
                .location
                .as_ref()
                .is_some_and(|location| location.file == "broken.vert")
    }));
}

#[test]
fn variant_defines_reach_the_front_end() {
    let source = "void main() {
#ifdef INSTANCED_RENDERING
    gl_Position = vec4(0.0);
#else
    gl_Position = vec4(1.0);
#endif
}
";
    let item = glsl330_vertex().with_variant(
        shade_model::Variant::new("-inst")
            .with_define(shade_model::Define::new("INSTANCED_RENDERING")),
    );
    let result = translate(item, source, &PipelineOptions::default());
    let text = result
        .translation()
        .and_then(shade_core::Translation::text)
        .expect("text output");
    assert!(text.contains("vec4(0.0)"), "{text}");
    assert!(!text.contains("vec4(1.0)"));
}

#[test]
fn cancelled_driver_never_starts() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = PipelineOptions::default();
    let result = PipelineDriver::new(&ReferenceFrontEnd, &DialectBackEnd, &options)
        .with_cancel(&cancel)
        .translate(glsl330_vertex(), VERTEX);
    assert_eq!(result.state, DriverState::Cancelled);
    assert_eq!(result.diagnostics()[0].origin, DiagnosticOrigin::Batch);
}

/// Raises the cancel token while compiling.
struct CancellingFrontEnd<'a> {
    cancel: &'a CancelToken,
}

impl FrontEnd for CancellingFrontEnd<'_> {
    fn name(&self) -> &'static str {
        "cancelling"
    }

    fn compile(&self, request: &FrontEndRequest<'_>) -> Result<FrontEndOutput, FrontEndError> {
        let output = ReferenceFrontEnd.compile(request);
        self.cancel.cancel();
        output
    }
}

struct UnreachableBackEnd;

impl BackEnd for UnreachableBackEnd {
    fn name(&self) -> &'static str {
        "unreachable"
    }

    fn compile(&self, _request: &BackEndRequest<'_>) -> Result<BackEndOutput, BackEndError> {
        panic!("back end ran after cancellation");
    }
}

#[test]
fn cancellation_during_the_front_end_skips_the_back_end() {
    let cancel = CancelToken::new();
    let front = CancellingFrontEnd { cancel: &cancel };
    let options = PipelineOptions::default();
    let result = PipelineDriver::new(&front, &UnreachableBackEnd, &options)
        .with_cancel(&cancel)
        .translate(glsl330_vertex(), VERTEX);
    assert_eq!(result.state, DriverState::Cancelled);
    assert!(!result.is_success());
    assert_eq!(result.diagnostics()[0].message, "cancelled");
}

#[test]
fn spirv_output_is_the_encoded_module() {
    let item = WorkItem::new(
        "basic.vert",
        ShaderStage::Vertex,
        TargetProfile::new(ProfileKind::Spirv, 1),
    );
    let options = PipelineOptions::default();
    let result = PipelineDriver::new(&ReferenceFrontEnd, &UnreachableBackEnd, &options)
        .translate(item, VERTEX);
    assert_eq!(result.state, DriverState::Done);

    let translation = result.translation().expect("success");
    let module = shade_ir::Module::decode(&translation.output).expect("decode module");
    assert!(!module.instructions().is_empty());
    assert_eq!(translation.map.sources(), ["basic.vert"]);
    assert_eq!(translation.dependencies, ["basic.vert"]);
    assert!(translation.gaps.is_empty());
}

#[test]
fn missing_source_files_fail_with_an_io_diagnostic() {
    let dir = tempfile::tempdir().expect("tempdir");
    let item = WorkItem::new(
        dir.path().join("missing.vert"),
        ShaderStage::Vertex,
        TargetProfile::new(ProfileKind::Glsl, 330),
    );
    let options = PipelineOptions::default();
    let result = PipelineDriver::new(&ReferenceFrontEnd, &DialectBackEnd, &options).run(item);
    assert_eq!(result.state, DriverState::FrontEndFailed);
    assert_eq!(result.diagnostics()[0].origin, DiagnosticOrigin::Io);
}
