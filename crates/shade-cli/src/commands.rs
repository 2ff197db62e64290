use std::time::Instant;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use tracing::{info, info_span, warn};

use shade_core::{BatchReport, CancelToken, run_batch};
use shade_map::SourceMap;
use shade_model::{ProfileKind, ShaderStage, SourcePosition, TargetSpec, TargetSystem};
use shade_cli::cli::{BuildArgs, LookupArgs, ProfilesArgs};
use shade_cli::overrides::batch_config;

use crate::summary::{apply_table_style, header_cell};

pub fn run_build(args: &BuildArgs) -> Result<BatchReport> {
    let started = Instant::now();
    let config = batch_config(args)?;
    let span = info_span!("build", output_dir = %config.output_dir.display());
    let _guard = span.enter();

    let report = run_batch(&config, CancelToken::new()).context("discover shader sources")?;
    if report.total == 0 {
        warn!("no work items: no shader sources matched the configured stages and targets");
    }
    if let Some(path) = &args.report {
        report
            .write(path)
            .with_context(|| format!("write report {}", path.display()))?;
        info!(path = %path.display(), "wrote batch report");
    }
    info!(
        duration_ms = started.elapsed().as_millis() as u64,
        succeeded = report.succeeded,
        failed = report.failed,
        "build finished"
    );
    Ok(report)
}

pub fn run_profiles(args: &ProfilesArgs) -> Result<()> {
    let system = args
        .system
        .as_deref()
        .map_or(TargetSystem::Unknown, TargetSystem::parse);
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Profile"),
        header_cell("Description"),
        header_cell("Vertex/Fragment"),
        header_cell("Other stages"),
        header_cell("Extension"),
    ]);
    apply_table_style(&mut table);
    for kind in ProfileKind::ALL {
        let spec = TargetSpec::new(kind);
        let basic = spec.resolve(system, ShaderStage::Vertex);
        let other = spec.resolve(system, ShaderStage::Compute);
        table.add_row(vec![
            kind.to_string(),
            kind.description().to_string(),
            basic.label(),
            other.label(),
            format!(".{}", kind.extension()),
        ]);
    }
    println!("System: {system}");
    println!("{table}");
    Ok(())
}

pub fn run_lookup(args: &LookupArgs) -> Result<()> {
    let json = std::fs::read_to_string(&args.map)
        .with_context(|| format!("read source map {}", args.map.display()))?;
    let map = SourceMap::from_json(&json)
        .with_context(|| format!("parse source map {}", args.map.display()))?;

    let Some(entry) = map.lookup(SourcePosition::generated(args.line, args.column)) else {
        bail!(
            "{}:{}:{} has no mapping",
            map.file(),
            args.line,
            args.column
        );
    };
    let file = map
        .source_name(entry.original.file)
        .context("mapping refers to a missing source")?;
    match &entry.name {
        Some(name) => println!(
            "{file}:{}:{} ({name})",
            entry.original.line, entry.original.column
        ),
        None => println!("{file}:{}:{}", entry.original.line, entry.original.column),
    }
    Ok(())
}
