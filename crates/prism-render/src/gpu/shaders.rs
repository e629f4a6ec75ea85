//! WGSL shader source for the wgpu device.

/// Metallic-roughness shading with a single directional light.
///
/// Vertex inputs arrive as four `vec4` streams: position, normal, texcoord
/// and tangent. Lighting happens in view space.
pub const SHADER_SOURCE: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    model_view_proj: mat4x4<f32>,
    model_view: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    light_direction: vec4<f32>,
    light_intensity: vec4<f32>,
    base_color_factor: vec4<f32>,
    emissive_factor: vec4<f32>,
    // metallic, roughness, normal mapping, gamma encode
    params: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> u: Uniforms;

@group(1) @binding(0) var base_color_texture: texture_2d<f32>;
@group(1) @binding(1) var base_color_sampler: sampler;
@group(1) @binding(2) var metallic_roughness_texture: texture_2d<f32>;
@group(1) @binding(3) var metallic_roughness_sampler: sampler;
@group(1) @binding(4) var emissive_texture: texture_2d<f32>;
@group(1) @binding(5) var emissive_sampler: sampler;
@group(1) @binding(6) var normal_texture: texture_2d<f32>;
@group(1) @binding(7) var normal_sampler: sampler;

struct VertexInput {
    @location(0) position: vec4<f32>,
    @location(1) normal: vec4<f32>,
    @location(2) uv: vec4<f32>,
    @location(3) tangent: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) view_position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec4<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    let position = vec4<f32>(in.position.xyz, 1.0);
    out.clip_position = u.model_view_proj * position;
    out.view_position = (u.model_view * position).xyz;
    out.normal = (u.normal_matrix * vec4<f32>(in.normal.xyz, 0.0)).xyz;
    out.tangent = vec4<f32>((u.model_view * vec4<f32>(in.tangent.xyz, 0.0)).xyz, in.tangent.w);
    out.uv = in.uv.xy;
    return out;
}

const PI: f32 = 3.14159265359;
const AMBIENT: f32 = 0.03;

fn srgb_to_linear(c: vec3<f32>) -> vec3<f32> {
    return pow(c, vec3<f32>(2.2));
}

fn distribution_ggx(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let d = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    return a2 / max(PI * d * d, 1e-7);
}

fn geometry_smith(n_dot_v: f32, n_dot_l: f32, roughness: f32) -> f32 {
    let r = roughness + 1.0;
    let k = r * r / 8.0;
    let gv = n_dot_v / (n_dot_v * (1.0 - k) + k);
    let gl = n_dot_l / (n_dot_l * (1.0 - k) + k);
    return gv * gl;
}

fn fresnel_schlick(cos_theta: f32, f0: vec3<f32>) -> vec3<f32> {
    return f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - cos_theta, 5.0);
}

@fragment
fn fs_main(in: VertexOutput, @builtin(front_facing) front_facing: bool) -> @location(0) vec4<f32> {
    // sample up front to stay in uniform control flow
    let base_sample = textureSample(base_color_texture, base_color_sampler, in.uv);
    let mr_sample = textureSample(metallic_roughness_texture, metallic_roughness_sampler, in.uv);
    let emissive_sample = textureSample(emissive_texture, emissive_sampler, in.uv);
    let normal_sample = textureSample(normal_texture, normal_sampler, in.uv);

    let base_color = vec4<f32>(srgb_to_linear(base_sample.rgb), base_sample.a) * u.base_color_factor;
    let metallic = clamp(u.params.x * mr_sample.b, 0.0, 1.0);
    let roughness = clamp(u.params.y * mr_sample.g, 0.04, 1.0);
    let emissive = srgb_to_linear(emissive_sample.rgb) * u.emissive_factor.rgb;

    var n = normalize(in.normal);
    if !front_facing {
        n = -n;
    }
    if u.params.z > 0.5 && dot(in.tangent.xyz, in.tangent.xyz) > 0.0 {
        let t = normalize(in.tangent.xyz - n * dot(n, in.tangent.xyz));
        let b = cross(n, t) * in.tangent.w;
        let tn = normal_sample.rgb * 2.0 - vec3<f32>(1.0);
        n = normalize(t * tn.x + b * tn.y + n * tn.z);
    }

    let v = normalize(-in.view_position);
    let l = normalize(u.light_direction.xyz);
    let h = normalize(v + l);
    let n_dot_l = max(dot(n, l), 0.0);
    let n_dot_v = max(dot(n, v), 1e-4);
    let n_dot_h = max(dot(n, h), 0.0);

    let f0 = mix(vec3<f32>(0.04), base_color.rgb, metallic);
    let f = fresnel_schlick(max(dot(h, v), 0.0), f0);
    let specular = distribution_ggx(n_dot_h, roughness * roughness)
        * geometry_smith(n_dot_v, n_dot_l, roughness)
        * f / max(4.0 * n_dot_v * n_dot_l, 1e-4);
    let kd = (vec3<f32>(1.0) - f) * (1.0 - metallic);
    let diffuse = kd * base_color.rgb / PI;

    var color = (diffuse + specular) * u.light_intensity.rgb * n_dot_l
        + base_color.rgb * AMBIENT
        + emissive;
    if u.params.w > 0.5 {
        color = pow(clamp(color, vec3<f32>(0.0), vec3<f32>(1.0)), vec3<f32>(1.0 / 2.2));
    }
    return vec4<f32>(color, base_color.a);
}
"#;
