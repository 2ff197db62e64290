use std::fs;
use std::path::{Path, PathBuf};

use shade_back::DialectBackEnd;
use shade_core::{
    BatchConfig, BatchOrchestrator, BatchReport, CancelToken, ItemStatus, run_batch, sha256_hex,
};
use shade_front::{FrontEnd, FrontEndError, FrontEndOutput, FrontEndRequest, ReferenceFrontEnd};
use shade_map::SourceMap;
use shade_model::ShaderStage;

const VERTEX: &str = "void main(){ gl_Position = vec4(1,2,3,4); }\n";

const LOD_FRAGMENT: &str = "uniform sampler2D tex;
varying vec2 uv;
void main() {
    gl_FragColor = textureLod(tex, uv, 0.0);
}
";

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, text).expect("write source");
    path
}

fn config(dir: &Path, targets: &[&str]) -> BatchConfig {
    write(dir, "basic.vert", VERTEX);
    write(dir, "lod.frag", LOD_FRAGMENT);
    BatchConfig {
        sources: vec![dir.to_path_buf()],
        targets: targets
            .iter()
            .map(|target| target.parse().expect("target"))
            .collect(),
        output_dir: dir.join("out"),
        concurrency: Some(4),
        ..BatchConfig::default()
    }
}

fn labels(report: &BatchReport) -> Vec<String> {
    report.items.iter().map(|item| item.label()).collect()
}

#[test]
fn failures_are_isolated_and_successes_are_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path(), &["essl:100", "glsl:330"]);
    let report = run_batch(&config, CancelToken::new()).expect("batch");

    assert_eq!(report.total, 4);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.failed, 1);
    assert!(!report.is_success());

    let stages_and_targets: Vec<(ShaderStage, &str)> = report
        .items
        .iter()
        .map(|item| (item.stage, item.target.as_str()))
        .collect();
    assert_eq!(
        stages_and_targets,
        [
            (ShaderStage::Vertex, "glsl330"),
            (ShaderStage::Vertex, "essl100"),
            (ShaderStage::Fragment, "glsl330"),
            (ShaderStage::Fragment, "essl100"),
        ]
    );

    let failed = &report.items[3];
    assert_eq!(failed.status, ItemStatus::Failed);
    assert!(failed.artifacts.is_none());
    let location = failed.diagnostics[0].location.as_ref().expect("location");
    assert!(location.file.ends_with("lod.frag"), "{}", location.file);
    assert_eq!((location.line, location.column), (4, 19));
    assert!(!config.output_dir.join("lod.frag.essl100.glsl").exists());

    let sibling = &report.items[2];
    assert_eq!(sibling.status, ItemStatus::Succeeded);
    let artifacts = sibling.artifacts.as_ref().expect("artifacts");
    assert_eq!(
        artifacts.output.path,
        config.output_dir.join("lod.frag.glsl330.glsl")
    );
    let text = fs::read(&artifacts.output.path).expect("read output");
    assert_eq!(artifacts.output.sha256, sha256_hex(&text));

    let json = fs::read_to_string(&artifacts.map.path).expect("read map");
    let map = SourceMap::from_json(&json).expect("parse map");
    assert_eq!(map.file(), "lod.frag.glsl330.glsl");
    assert_eq!(map.sources_content().map(<[Option<String>]>::len), Some(1));
}

#[test]
fn written_maps_resolve_generated_positions_to_the_source() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["glsl:330"]);
    config.stages = vec![ShaderStage::Vertex];
    config.embed_sources = false;

    let report = run_batch(&config, CancelToken::new()).expect("batch");
    assert!(report.is_success());
    assert_eq!(report.total, 1);

    let map_path = config.output_dir.join("basic.vert.glsl330.glsl.map");
    let map = SourceMap::from_json(&fs::read_to_string(map_path).expect("read map"))
        .expect("parse map");
    assert!(map.sources_content().is_none());
    assert_eq!(map.sources(), ["../basic.vert"]);
    let resolved = map.resolve(3, 4).expect("statement resolves");
    assert_eq!(resolved.file, "../basic.vert");
    assert_eq!((resolved.line, resolved.column), (1, 13));
}

#[test]
fn order_does_not_depend_on_concurrency() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["metal", "d3d11", "glsl:330", "varlist"]);
    config.dry_run = true;

    config.concurrency = Some(1);
    let serial = run_batch(&config, CancelToken::new()).expect("serial batch");
    config.concurrency = Some(8);
    let parallel = run_batch(&config, CancelToken::new()).expect("parallel batch");

    assert_eq!(serial, parallel);
    assert_eq!(labels(&serial).len(), 8);
}

#[test]
fn dry_runs_write_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["glsl:330"]);
    config.dry_run = true;

    let report = run_batch(&config, CancelToken::new()).expect("batch");
    assert!(report.is_success());
    assert!(report.dry_run);
    assert!(report.items.iter().all(|item| item.artifacts.is_none()));
    assert!(!config.output_dir.exists());
}

#[test]
fn cancelled_batches_report_every_item_as_failed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path(), &["glsl:330"]);
    let cancel = CancelToken::new();
    cancel.cancel();

    let orchestrator =
        BatchOrchestrator::new(&ReferenceFrontEnd, &DialectBackEnd, &config).with_cancel(cancel);
    let items = orchestrator.plan().expect("plan");
    assert_eq!(items.len(), 2);
    let report = orchestrator.run_items(items);

    assert!(report.cancelled);
    assert_eq!(report.failed, 2);
    assert!(
        report
            .diagnostics()
            .all(|(_, diagnostic)| diagnostic.message == "cancelled")
    );
    assert!(!config.output_dir.exists());
}

#[test]
fn report_serializes_to_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path(), &["essl:100"]);
    let report = run_batch(&config, CancelToken::new()).expect("batch");

    let path = dir.path().join("report.json");
    report.write(&path).expect("write report");
    let round: BatchReport =
        serde_json::from_str(&fs::read_to_string(&path).expect("read report")).expect("parse");
    assert_eq!(round, report);
    assert_eq!(round.failed, 1);
}

#[test]
fn colliding_artifact_names_fail_both_items() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = config(dir.path(), &["glsl:330"]);
    write(dir.path(), "basic.vert.glsl", VERTEX);

    let report = run_batch(&config, CancelToken::new()).expect("batch");
    assert_eq!(report.total, 3);
    assert_eq!(report.failed, 2);

    for item in &report.items[..2] {
        assert_eq!(item.stage, ShaderStage::Vertex);
        assert_eq!(item.status, ItemStatus::Failed);
        assert!(item.artifacts.is_none());
        assert!(
            item.diagnostics[0]
                .message
                .contains("artifact name basic.vert.glsl330.glsl is also produced by"),
            "{}",
            item.diagnostics[0].message
        );
    }
    assert!(!config.output_dir.join("basic.vert.glsl330.glsl").exists());

    let fragment = &report.items[2];
    assert_eq!(fragment.status, ItemStatus::Succeeded);
    assert!(config.output_dir.join("lod.frag.glsl330.glsl").exists());
}

/// Panics on the vertex shader, compiles everything else normally.
struct PanickingFrontEnd;

impl FrontEnd for PanickingFrontEnd {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn compile(&self, request: &FrontEndRequest<'_>) -> Result<FrontEndOutput, FrontEndError> {
        if request.source_name.ends_with("basic.vert") {
            panic!("front end crashed on {}", request.source_name);
        }
        ReferenceFrontEnd.compile(request)
    }
}

#[test]
fn a_panicking_item_does_not_lose_its_siblings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["glsl:330"]);
    config.concurrency = Some(1);

    let report = BatchOrchestrator::new(&PanickingFrontEnd, &DialectBackEnd, &config)
        .run()
        .expect("batch");
    assert_eq!(report.total, 2);

    let panicked = &report.items[0];
    assert_eq!(panicked.status, ItemStatus::Failed);
    assert!(
        panicked.diagnostics[0].message.contains("panicked: front end crashed"),
        "{}",
        panicked.diagnostics[0].message
    );

    let sibling = &report.items[1];
    assert_eq!(sibling.status, ItemStatus::Succeeded);
    let artifacts = sibling.artifacts.as_ref().expect("artifacts");
    assert!(artifacts.output.path.exists());
}

#[test]
fn spirv_targets_write_the_module_and_a_dependency_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["spirv"]);
    config.stages = vec![ShaderStage::Vertex];
    config.deps = true;

    let report = run_batch(&config, CancelToken::new()).expect("batch");
    assert!(report.is_success(), "{:?}", report.items);
    let item = &report.items[0];
    let source = dir.path().join("basic.vert").to_string_lossy().into_owned();
    assert_eq!(item.dependencies, [source.clone()]);

    let artifacts = item.artifacts.as_ref().expect("artifacts");
    assert_eq!(artifacts.output.path, config.output_dir.join("basic.vert.spirv.spv"));
    let module = fs::read(&artifacts.output.path).expect("read module");
    assert_eq!(module[..4], shade_ir::MAGIC.to_le_bytes());

    let deps = artifacts.deps.as_ref().expect("dependency file");
    assert_eq!(deps.path, config.output_dir.join("basic.vert.spirv.spv.d"));
    let contents = fs::read_to_string(&deps.path).expect("read dependency file");
    let (options, inputs) = contents.split_once("--\n").expect("separator");
    assert!(options.starts_with("target: spirv\n"), "{options}");
    assert_eq!(inputs.lines().collect::<Vec<_>>(), [source.as_str()]);
}

#[test]
fn dependency_files_are_opt_in() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = config(dir.path(), &["glsl:330"]);
    config.stages = vec![ShaderStage::Vertex];

    let report = run_batch(&config, CancelToken::new()).expect("batch");
    let artifacts = report.items[0].artifacts.as_ref().expect("artifacts");
    assert!(artifacts.deps.is_none());
    assert!(!config.output_dir.join("basic.vert.glsl330.glsl.d").exists());
}
