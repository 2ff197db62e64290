//! Merges `shade build` flags into a [`BatchConfig`].

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use shade_core::BatchConfig;
use shade_model::TargetSystem;

use crate::cli::BuildArgs;

/// Loads the config file named by `--config` (if any) and applies the
/// command-line flags on top. List flags extend the file's lists; scalar
/// flags replace its values.
pub fn batch_config(args: &BuildArgs) -> Result<BatchConfig> {
    let mut config = match &args.config {
        Some(path) => BatchConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => BatchConfig::default(),
    };

    config.sources.extend(args.sources.iter().cloned());
    extend_unique(&mut config.targets, &args.targets);
    extend_unique(&mut config.stages, &args.stages);
    extend_unique(&mut config.exclude, &args.exclude);
    config.defines.extend(args.defines.iter().cloned());
    extend_unique(&mut config.texture_units, &args.texture_units);

    if let Some(system) = &args.system {
        config.system = TargetSystem::parse(system);
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(jobs) = args.jobs {
        config.concurrency = Some(jobs);
    }
    if let Some(entry_point) = &args.entry_point {
        config.entry_point.clone_from(entry_point);
    }
    if let Some(granularity) = args.granularity {
        config.granularity = granularity.into();
    }
    if let Some(order) = args.matrix_order {
        config.matrix_order = order.into();
    }
    if let Some(base) = args.binding_base {
        config.binding_base = base;
    }
    config.relax |= args.relax;
    config.instanced_optional |= args.instanced_optional;
    config.dry_run |= args.dry_run;
    config.deps |= args.deps;
    if args.no_embed_sources {
        config.embed_sources = false;
    }

    if config.sources.is_empty() {
        config.sources.push(PathBuf::from("."));
    }
    if config.targets.is_empty() {
        bail!("no targets given; pass --target or set `targets` in the config file");
    }
    config.validate().context("invalid batch configuration")?;
    Ok(config)
}

fn extend_unique<T: PartialEq + Clone>(values: &mut Vec<T>, extra: &[T]) {
    for value in extra {
        if !values.contains(value) {
            values.push(value.clone());
        }
    }
}
