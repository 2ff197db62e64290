//! Work-item enumeration: sources x targets, minus exclusions, expanded
//! into variants.

use std::collections::BTreeMap;

use shade_model::{
    Define, ProfileKind, TargetProfile, TargetSpec, TargetSystem, Variant, WorkItem,
};
use tracing::debug;

use crate::config::BatchConfig;
use crate::discovery::ShaderSource;

pub const INSTANCING_DEFINE: &str = "INSTANCED_RENDERING";
pub const TEXTURE_UNITS_DEFINE: &str = "MAX_TEXTURE_UNITS";

/// First ESSL version accepted by WebGL 2.
const WEBGL2_ESSL_VERSION: u32 = 300;

/// Enumerates every work item of a batch, sorted by
/// [`WorkItem::sort_key`].
pub fn plan_work_items(sources: &[ShaderSource], config: &BatchConfig) -> Vec<WorkItem> {
    let mut items = Vec::new();
    for source in sources {
        if !config.includes_stage(source.stage) {
            debug!(path = %source.path.display(), stage = %source.stage, "stage filtered out");
            continue;
        }
        for target in &config.targets {
            if config.is_excluded(source.stage, target) {
                debug!(
                    path = %source.path.display(),
                    stage = %source.stage,
                    target = %target,
                    "target excluded"
                );
                continue;
            }
            for (profile, variant) in expand_variants(source, target, config) {
                items.push(
                    WorkItem::new(&source.path, source.stage, profile)
                        .with_variant(variant),
                );
            }
        }
    }
    items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    items.dedup();
    items
}

/// Items whose artifact file name is also produced by another item, mapped
/// to the labels of those other items.
///
/// Distinct sources can share a stem (`basic.vert` and `basic.vert.glsl`,
/// or `a/x.vert` and `b/x.vert`); such items cannot both be written.
pub fn artifact_name_clashes(items: &[WorkItem]) -> BTreeMap<usize, Vec<String>> {
    let mut by_name: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, item) in items.iter().enumerate() {
        by_name.entry(item.output_file_name()).or_default().push(index);
    }
    let mut clashes = BTreeMap::new();
    for indices in by_name.values().filter(|indices| indices.len() > 1) {
        for &index in indices {
            let others = indices
                .iter()
                .filter(|&&other| other != index)
                .map(|&other| items[other].label())
                .collect();
            clashes.insert(index, others);
        }
    }
    clashes
}

/// Profiles and variants one (source, target) pair expands into.
///
/// Variant suffixes are applied in a fixed order: `-tex<N>`,
/// `-inst`/`-noinst`, then `-webgl2` or `-relaxed`. `varlist` targets
/// never expand.
pub fn expand_variants(
    source: &ShaderSource,
    target: &TargetSpec,
    config: &BatchConfig,
) -> Vec<(TargetProfile, Variant)> {
    let base = target.resolve(config.system, source.stage);
    if base.kind == ProfileKind::VarList {
        return vec![(base, Variant::default())];
    }

    let mut features = vec![Variant::default()];
    if !config.texture_units.is_empty() && source.mentions(TEXTURE_UNITS_DEFINE) {
        let counts: Vec<Variant> = config
            .texture_units
            .iter()
            .map(|count| {
                Variant::new(format!("-tex{count}"))
                    .with_define(Define::with_value(TEXTURE_UNITS_DEFINE, count.to_string()))
            })
            .collect();
        features = cross(&features, &counts);
    }
    if config.instanced_optional && source.mentions(INSTANCING_DEFINE) {
        let instancing = [
            Variant::new("-noinst"),
            Variant::new("-inst").with_define(Define::new(INSTANCING_DEFINE)),
        ];
        features = cross(&features, &instancing);
    }

    let precisions = precision_variants(base, config);
    features
        .iter()
        .flat_map(|feature| {
            precisions
                .iter()
                .map(move |(profile, precision)| (*profile, feature.join(precision)))
        })
        .collect()
}

/// The plain, `-webgl2` and `-relaxed` builds of one profile.
///
/// WebGL 2 builds use ESSL 300 and are never relaxed. An html5 ESSL target
/// already at 300 or above only gets the WebGL 2 build.
fn precision_variants(base: TargetProfile, config: &BatchConfig) -> Vec<(TargetProfile, Variant)> {
    let mut variants = Vec::new();
    if config.system == TargetSystem::Html5 && base.kind == ProfileKind::Essl {
        let mut webgl2 = base;
        webgl2.version = WEBGL2_ESSL_VERSION;
        variants.push((webgl2, Variant::new("-webgl2")));
        if base.version >= WEBGL2_ESSL_VERSION {
            return variants;
        }
    }
    variants.push((base, Variant::default()));
    if config.relax {
        variants.push((base.relaxed(true), Variant::new("-relaxed")));
    }
    variants
}

fn cross(variants: &[Variant], suffixes: &[Variant]) -> Vec<Variant> {
    variants
        .iter()
        .flat_map(|variant| suffixes.iter().map(move |suffix| variant.join(suffix)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shade_model::{Exclusion, ShaderStage, SourceLanguage};
    use std::path::PathBuf;

    fn source(name: &str, stage: ShaderStage, text: &str) -> ShaderSource {
        ShaderSource {
            path: PathBuf::from(name),
            stage,
            language: SourceLanguage::Glsl,
            text: text.to_string(),
        }
    }

    fn config(targets: &[&str]) -> BatchConfig {
        BatchConfig {
            targets: targets
                .iter()
                .map(|target| target.parse().expect("target"))
                .collect(),
            ..BatchConfig::default()
        }
    }

    fn names(items: &[WorkItem]) -> Vec<String> {
        items.iter().map(WorkItem::output_file_name).collect()
    }

    #[test]
    fn cross_product_minus_exclusions_sorted_by_stage_then_profile() {
        let sources = [
            source("a.frag", ShaderStage::Fragment, ""),
            source("a.vert", ShaderStage::Vertex, ""),
        ];
        let mut config = config(&["metal", "glsl:330", "d3d11"]);
        config.exclude = vec![Exclusion {
            stage: ShaderStage::Fragment,
            profile: ProfileKind::Metal,
        }];

        let items = plan_work_items(&sources, &config);
        assert_eq!(
            names(&items),
            [
                "a.vert.glsl330.glsl",
                "a.vert.d3d11.hlsl",
                "a.vert.metal.metal",
                "a.frag.glsl330.glsl",
                "a.frag.d3d11.hlsl",
            ]
        );
    }

    #[test]
    fn html5_adds_a_webgl2_variant() {
        let sources = [source("a.frag", ShaderStage::Fragment, "")];
        let mut config = config(&["essl", "essl:300"]);
        config.system = TargetSystem::Html5;

        let items = plan_work_items(&sources, &config);
        assert_eq!(
            names(&items),
            [
                "a.frag.essl100.glsl",
                "a.frag.essl300-webgl2.glsl",
            ]
        );
    }

    #[test]
    fn webgl2_builds_are_never_relaxed() {
        let sources = [source("a.frag", ShaderStage::Fragment, "")];
        let mut config = config(&["essl"]);
        config.system = TargetSystem::Html5;
        config.relax = true;

        let items = plan_work_items(&sources, &config);
        assert_eq!(
            names(&items),
            [
                "a.frag.essl100.glsl",
                "a.frag.essl100-relaxed.glsl",
                "a.frag.essl300-webgl2.glsl",
            ]
        );
        let webgl2 = items
            .iter()
            .find(|item| item.variant.suffix == "-webgl2")
            .expect("webgl2 variant");
        assert!(!webgl2.profile.relaxed);
        assert_eq!(webgl2.profile.version, 300);
    }

    #[test]
    fn html5_essl300_only_builds_for_webgl2() {
        let sources = [source("a.frag", ShaderStage::Fragment, "")];
        let mut config = config(&["essl:310"]);
        config.system = TargetSystem::Html5;
        config.relax = true;

        let items = plan_work_items(&sources, &config);
        assert_eq!(names(&items), ["a.frag.essl300-webgl2.glsl"]);
    }

    #[test]
    fn wasm_counts_as_html5() {
        let sources = [source("a.frag", ShaderStage::Fragment, "")];
        let mut config = config(&["essl"]);
        config.system = TargetSystem::parse("wasm");

        let items = plan_work_items(&sources, &config);
        assert_eq!(
            names(&items),
            ["a.frag.essl100.glsl", "a.frag.essl300-webgl2.glsl"]
        );
    }

    #[test]
    fn varlist_never_expands() {
        let text = "#ifdef INSTANCED_RENDERING\n#endif\nuniform vec4 lights[MAX_TEXTURE_UNITS];";
        let sources = [source("lit.vert", ShaderStage::Vertex, text)];
        let mut config = config(&["varlist"]);
        config.system = TargetSystem::Html5;
        config.relax = true;
        config.instanced_optional = true;
        config.texture_units = vec![4, 8];

        let items = plan_work_items(&sources, &config);
        assert_eq!(items.len(), 1);
        assert!(items[0].variant.suffix.is_empty());
        assert!(items[0].variant.defines.is_empty());
        assert!(!items[0].profile.relaxed);
    }

    #[test]
    fn shared_stems_are_reported_as_clashes() {
        let sources = [
            source("a/x.vert", ShaderStage::Vertex, ""),
            source("b/x.vert", ShaderStage::Vertex, ""),
            source("basic.vert", ShaderStage::Vertex, ""),
        ];
        let config = config(&["glsl:330"]);

        let items = plan_work_items(&sources, &config);
        let clashes = artifact_name_clashes(&items);
        assert_eq!(clashes.len(), 2);
        let clashing: Vec<&str> = clashes
            .keys()
            .map(|&index| items[index].source.to_str().expect("utf-8 path"))
            .collect();
        assert!(clashing.contains(&"a/x.vert"));
        assert!(clashing.contains(&"b/x.vert"));
        for others in clashes.values() {
            assert_eq!(others.len(), 1);
        }
    }

    #[test]
    fn feature_variants_compose() {
        let text = "#ifdef INSTANCED_RENDERING\n#endif\nuniform vec4 lights[MAX_TEXTURE_UNITS];";
        let sources = [source("lit.vert", ShaderStage::Vertex, text)];
        let mut config = config(&["glsl:330"]);
        config.relax = true;
        config.instanced_optional = true;
        config.texture_units = vec![4, 8];

        let items = plan_work_items(&sources, &config);
        assert_eq!(items.len(), 8);
        let relaxed_inst = items
            .iter()
            .find(|item| item.variant.suffix == "-tex8-inst-relaxed")
            .expect("tex8 inst relaxed variant");
        assert!(relaxed_inst.profile.relaxed);
        assert_eq!(
            relaxed_inst.variant.defines,
            [
                Define::with_value(TEXTURE_UNITS_DEFINE, "8"),
                Define::new(INSTANCING_DEFINE)
            ]
        );
    }

    #[test]
    fn feature_variants_need_the_source_to_use_them() {
        let sources = [source("plain.vert", ShaderStage::Vertex, "void main() {}")];
        let mut config = config(&["glsl:330"]);
        config.instanced_optional = true;
        config.texture_units = vec![4];

        let items = plan_work_items(&sources, &config);
        assert_eq!(names(&items), ["plain.vert.glsl330.glsl"]);
    }

    #[test]
    fn stage_filter_limits_sources() {
        let sources = [
            source("a.vert", ShaderStage::Vertex, ""),
            source("a.comp", ShaderStage::Compute, ""),
        ];
        let mut config = config(&["glsl:430"]);
        config.stages = vec![ShaderStage::Compute];
        let items = plan_work_items(&sources, &config);
        assert_eq!(names(&items), ["a.comp.glsl430.glsl"]);
    }
}
