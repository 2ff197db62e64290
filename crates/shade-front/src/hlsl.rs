//! Canonicalization of HLSL vocabulary to the GLSL-flavoured IR vocabulary.

/// HLSL spelling -> IR spelling.
const RENAMES: &[(&str, &str)] = &[
    ("float2", "vec2"),
    ("float3", "vec3"),
    ("float4", "vec4"),
    ("half", "float"),
    ("half2", "vec2"),
    ("half3", "vec3"),
    ("half4", "vec4"),
    ("int2", "ivec2"),
    ("int3", "ivec3"),
    ("int4", "ivec4"),
    ("uint2", "uvec2"),
    ("uint3", "uvec3"),
    ("uint4", "uvec4"),
    ("bool2", "bvec2"),
    ("bool3", "bvec3"),
    ("bool4", "bvec4"),
    ("float2x2", "mat2"),
    ("float3x3", "mat3"),
    ("float4x4", "mat4"),
    ("lerp", "mix"),
    ("frac", "fract"),
    ("ddx", "dFdx"),
    ("ddy", "dFdy"),
    ("rsqrt", "inversesqrt"),
    ("fmod", "mod"),
    ("atan2", "atan"),
    ("static", "const"),
    ("tex2D", "texture"),
    ("texCUBE", "texture"),
    ("tex2Dlod", "textureLod"),
    ("tex2Dgrad", "textureGrad"),
];

/// The IR spelling of an HLSL identifier, or `None` when it is unchanged.
/// The entry point becomes `main`.
pub fn canonical_name(ident: &str, entry_point: &str) -> Option<&'static str> {
    if ident == entry_point && entry_point != "main" {
        return Some("main");
    }
    RENAMES
        .iter()
        .find(|(hlsl, _)| *hlsl == ident)
        .map(|(_, ir)| *ir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renames_types_intrinsics_and_entry() {
        assert_eq!(canonical_name("float4", "frag"), Some("vec4"));
        assert_eq!(canonical_name("lerp", "frag"), Some("mix"));
        assert_eq!(canonical_name("frag", "frag"), Some("main"));
        assert_eq!(canonical_name("main", "main"), None);
        assert_eq!(canonical_name("color", "frag"), None);
    }
}
