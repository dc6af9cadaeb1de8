//! GLSL sources for the fixed program set and the naga compile path.
//!
//! All shaders are Vulkan-flavored GLSL 450 compiled at context creation via
//! `wgpu::ShaderSource::Glsl`. Compile or validation failures are fatal: the
//! device error scope around module creation surfaces the compiler diagnostic
//! to the caller instead of the process-global uncaptured-error hook.

use std::borrow::Cow;

use anyhow::{anyhow, Result};
use wgpu::naga::ShaderStage;

/// Compiles one GLSL stage, converting any validation error into a fatal
/// `Err` carrying the diagnostic text.
pub(crate) fn compile_shader(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> Result<wgpu::ShaderModule> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    });
    if let Some(error) = pollster::block_on(device.pop_error_scope()) {
        return Err(anyhow!("failed to compile shader '{label}': {error}"));
    }
    Ok(module)
}

/// Full-screen triangle with the viewport inscribed, driven by
/// `gl_VertexIndex` so no vertex buffers are bound. The vertex transform only
/// bends the texture coordinates; clip-space positions stay fixed.
pub(crate) const VS_TRANSFORM: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform Params {
    mat4 vertTransform;
};

layout(location = 0) out vec2 texCoord;

const vec2 POSITIONS[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    uint vertexIndex = uint(gl_VertexIndex);
    vec2 position = POSITIONS[vertexIndex];
    texCoord = ((vertTransform * vec4(position, 0.0, 1.0)).xy + vec2(1.0)) * 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

pub(crate) const VS_PLAIN: &str = r"#version 450
layout(location = 0) out vec2 texCoord;

const vec2 POSITIONS[3] = vec2[3](
    vec2(-1.0, -1.0),
    vec2(3.0, -1.0),
    vec2(-1.0, 3.0)
);

void main() {
    uint vertexIndex = uint(gl_VertexIndex);
    vec2 position = POSITIONS[vertexIndex];
    texCoord = (position + vec2(1.0)) * 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Sharp passthrough with an optional rounded-rectangle mask. With a positive
/// corner radius the signed rounded-box distance in framebuffer pixels gates
/// the fragment, feathered over one device pixel; the carve pipeline blends
/// with that coverage while the base pipeline always receives radius zero.
pub(crate) const FS_NO_BLUR: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform Params {
    mat4 vertTransform;
    mat4 texTransform;
    vec4 rect;
    float cornerRadius;
};

layout(set = 1, binding = 0) uniform texture2D colorTexture;
layout(set = 1, binding = 1) uniform sampler colorSampler;

layout(location = 0) in vec2 texCoord;
layout(location = 0) out vec4 fragColor;

void main() {
    vec2 transTexCoord = (texTransform * vec4(texCoord, 0.0, 1.0)).xy;
    vec4 color = texture(sampler2D(colorTexture, colorSampler), transTexCoord);
    float coverage = 1.0;
    if (cornerRadius > 0.0) {
        vec2 halfSize = rect.zw * 0.5;
        vec2 fromCenter = gl_FragCoord.xy - (rect.xy + halfSize);
        vec2 q = abs(fromCenter) - (halfSize - vec2(cornerRadius));
        float dist = length(max(q, vec2(0.0))) + min(max(q.x, q.y), 0.0) - cornerRadius;
        coverage = 1.0 - smoothstep(-0.5, 0.5, dist);
        if (coverage <= 0.0) {
            discard;
        }
    }
    fragColor = vec4(color.rgb, coverage);
}
";

/// Vertical Gaussian over the host-filled input texture. First pass of the
/// cascade; the only blur stage that applies the texture transform.
pub(crate) const FS_BLUR_V_INPUT: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform Params {
    mat4 vertTransform;
    mat4 texTransform;
    vec4 contrastColor;
    float axisExtent;
    float lod;
    float minLod;
};

layout(set = 1, binding = 0) uniform texture2D colorTexture;
layout(set = 1, binding = 1) uniform sampler colorSampler;

layout(location = 0) in vec2 texCoord;
layout(location = 0) out vec4 fragColor;

const float SIGMA = 3.0;
const float RADIUS = SIGMA * 2.0;
const float INV_TWO_SIGMA_SQR = 1.0 / (2.0 * SIGMA * SIGMA);

vec4 gaussBlur(vec2 uv, vec2 delta) {
    vec4 c = texture(sampler2D(colorTexture, colorSampler), uv);
    for (float i = 1.0; i < RADIUS; ++i) {
        c += (
            texture(sampler2D(colorTexture, colorSampler), uv + delta * i) +
            texture(sampler2D(colorTexture, colorSampler), uv - delta * i)
        ) * exp(-i * i * INV_TWO_SIGMA_SQR);
    }
    return c / c.a;
}

void main() {
    vec2 transTexCoord = (texTransform * vec4(texCoord, 0.0, 1.0)).xy;
    vec4 color;
    if (lod > minLod) {
        color = gaussBlur(transTexCoord, vec2(0.0, exp2(lod) / axisExtent));
    } else {
        color = texture(sampler2D(colorTexture, colorSampler), transTexCoord);
    }
    fragColor = vec4(mix(color.rgb, contrastColor.rgb, contrastColor.a), 1.0);
}
";

/// Vertical Gaussian over an intermediate cascade target.
pub(crate) const FS_BLUR_V_2D: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform Params {
    mat4 vertTransform;
    mat4 texTransform;
    vec4 contrastColor;
    float axisExtent;
    float lod;
    float minLod;
};

layout(set = 1, binding = 0) uniform texture2D colorTexture;
layout(set = 1, binding = 1) uniform sampler colorSampler;

layout(location = 0) in vec2 texCoord;
layout(location = 0) out vec4 fragColor;

const float SIGMA = 3.0;
const float RADIUS = SIGMA * 2.0;
const float INV_TWO_SIGMA_SQR = 1.0 / (2.0 * SIGMA * SIGMA);

vec4 gaussBlur(vec2 uv, vec2 delta) {
    vec4 c = texture(sampler2D(colorTexture, colorSampler), uv);
    for (float i = 1.0; i < RADIUS; ++i) {
        c += (
            texture(sampler2D(colorTexture, colorSampler), uv + delta * i) +
            texture(sampler2D(colorTexture, colorSampler), uv - delta * i)
        ) * exp(-i * i * INV_TWO_SIGMA_SQR);
    }
    return c / c.a;
}

void main() {
    vec4 color;
    if (lod > minLod) {
        color = gaussBlur(texCoord, vec2(0.0, exp2(lod) / axisExtent));
    } else {
        color = texture(sampler2D(colorTexture, colorSampler), texCoord);
    }
    fragColor = vec4(mix(color.rgb, contrastColor.rgb, contrastColor.a), 1.0);
}
";

/// Horizontal Gaussian; also the program of the final composition pass.
pub(crate) const FS_BLUR_H: &str = r"#version 450
layout(std140, set = 0, binding = 0) uniform Params {
    mat4 vertTransform;
    mat4 texTransform;
    vec4 contrastColor;
    float axisExtent;
    float lod;
    float minLod;
};

layout(set = 1, binding = 0) uniform texture2D colorTexture;
layout(set = 1, binding = 1) uniform sampler colorSampler;

layout(location = 0) in vec2 texCoord;
layout(location = 0) out vec4 fragColor;

const float SIGMA = 3.0;
const float RADIUS = SIGMA * 2.0;
const float INV_TWO_SIGMA_SQR = 1.0 / (2.0 * SIGMA * SIGMA);

vec4 gaussBlur(vec2 uv, vec2 delta) {
    vec4 c = texture(sampler2D(colorTexture, colorSampler), uv);
    for (float i = 1.0; i < RADIUS; ++i) {
        c += (
            texture(sampler2D(colorTexture, colorSampler), uv + delta * i) +
            texture(sampler2D(colorTexture, colorSampler), uv - delta * i)
        ) * exp(-i * i * INV_TWO_SIGMA_SQR);
    }
    return c / c.a;
}

void main() {
    vec4 color;
    if (lod > minLod) {
        color = gaussBlur(texCoord, vec2(exp2(lod) / axisExtent, 0.0));
    } else {
        color = texture(sampler2D(colorTexture, colorSampler), texCoord);
    }
    fragColor = vec4(mix(color.rgb, contrastColor.rgb, contrastColor.a), 1.0);
}
";
