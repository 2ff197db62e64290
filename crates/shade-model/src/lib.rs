pub mod diagnostic;
pub mod error;
pub mod position;
pub mod stage;
pub mod target;
pub mod work;

pub use diagnostic::{Diagnostic, DiagnosticOrigin, Location, Severity};
pub use error::{ModelError, Result};
pub use position::{Granularity, MappingEntry, SourcePosition};
pub use stage::{ShaderStage, SourceLanguage};
pub use target::{
    Define, Exclusion, MatrixOrder, ProfileKind, TargetProfile, TargetSpec, TargetSystem,
};
pub use work::{Variant, WorkItem};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_names_include_profile_and_variant() {
        let profile = TargetProfile::new(ProfileKind::Essl, 300).with_system(TargetSystem::Html5);
        let item = WorkItem::new("shaders/basic.vert.glsl", ShaderStage::Vertex, profile)
            .with_variant(Variant::new("-webgl2"));
        assert_eq!(item.source_stem(), "basic.vert");
        assert_eq!(item.output_file_name(), "basic.vert.essl300-webgl2.glsl");
        assert_eq!(item.map_file_name(), "basic.vert.essl300-webgl2.glsl.map");
    }

    #[test]
    fn work_items_sort_by_stage_then_profile() {
        let glsl = TargetProfile::new(ProfileKind::Glsl, 330);
        let hlsl = TargetProfile::new(ProfileKind::D3d11, 11);
        let mut items = vec![
            WorkItem::new("a.frag", ShaderStage::Fragment, glsl),
            WorkItem::new("a.vert", ShaderStage::Vertex, hlsl),
            WorkItem::new("a.vert", ShaderStage::Vertex, glsl),
        ];
        items.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        let labels: Vec<(ShaderStage, ProfileKind)> = items
            .iter()
            .map(|item| (item.stage, item.profile.kind))
            .collect();
        assert_eq!(
            labels,
            vec![
                (ShaderStage::Vertex, ProfileKind::Glsl),
                (ShaderStage::Vertex, ProfileKind::D3d11),
                (ShaderStage::Fragment, ProfileKind::Glsl),
            ]
        );
    }

    #[test]
    fn diagnostic_serializes() {
        let diagnostic = Diagnostic::error(DiagnosticOrigin::BackEnd, "unsupported")
            .at(Location::new("a.frag", 3, 7));
        let json = serde_json::to_string(&diagnostic).expect("serialize diagnostic");
        let round: Diagnostic = serde_json::from_str(&json).expect("deserialize diagnostic");
        assert_eq!(round, diagnostic);
        assert_eq!(diagnostic.to_string(), "a.frag:3:7: error: unsupported");
    }

    #[test]
    fn variants_join() {
        let tex = Variant::new("-tex4").with_define(Define::with_value("MAX_TEXTURE_UNITS", "4"));
        let inst = Variant::new("-inst").with_define(Define::new("INSTANCED_RENDERING"));
        let joined = tex.join(&inst);
        assert_eq!(joined.suffix, "-tex4-inst");
        assert_eq!(joined.defines.len(), 2);
    }
}
