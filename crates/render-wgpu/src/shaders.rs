/// WGSL shader for the lit, textured heightfield.
///
/// Vertex layout matches `procgfx_content::Vertex`, uniforms match
/// `procgfx_render::SceneUniforms`.
pub const HEIGHTFIELD_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    light: vec4<f32>,
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@group(0) @binding(1)
var albedo: texture_2d<f32>;

@group(0) @binding(2)
var albedo_sampler: sampler;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) normal: vec3<f32>,
    @location(1) uv: vec2<f32>,
};

@vertex
fn vs_main(vertex: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * vec4<f32>(vertex.position, 1.0);
    out.normal = vertex.normal;
    out.uv = vertex.uv;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(albedo, albedo_sampler, in.uv);
    let diffuse = max(dot(normalize(in.normal), uniforms.light.xyz), 0.0);
    let lighting = uniforms.light.w + diffuse * (1.0 - uniforms.light.w);
    return vec4<f32>(base.rgb * lighting, base.a);
}
"#;

pub const VS_ENTRY: &str = "vs_main";
pub const FS_ENTRY: &str = "fs_main";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_points_are_declared() {
        assert!(HEIGHTFIELD_SHADER.contains(&format!("fn {VS_ENTRY}(")));
        assert!(HEIGHTFIELD_SHADER.contains(&format!("fn {FS_ENTRY}(")));
    }

    #[test]
    fn bindings_are_unique() {
        for binding in 0..3 {
            let tag = format!("@binding({binding})");
            assert_eq!(HEIGHTFIELD_SHADER.matches(&tag).count(), 1, "{tag}");
        }
    }
}
