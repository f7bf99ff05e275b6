//! Source text of the vertex and fragment programs plus the validated
//! program pair handed to the GPU pipeline.

use crate::compile;
use crate::error::RendererError;
use crate::types::PlasmaConfig;

/// Minimal full-screen triangle vertex shader.
///
/// One oversized triangle covers the viewport so every pixel rasterizes
/// exactly once per frame without the second triangle of a quad. The
/// geometry is immutable and lives entirely in this constant; resizes touch
/// the viewport and uniforms, never the geometry.
pub(crate) const VERTEX_SOURCE: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = pos * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Built-in plasma fragment program.
///
/// The oscillator frequencies, rates, and ramp stops must match the CPU
/// reference in `field.rs`. Output is premultiplied alpha.
pub(crate) const PLASMA_FRAGMENT: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform PlasmaParams {
    vec2 iResolution;
    float iTime;
    float uSpeed;
    float uScale;
    float uOpacity;
    float uTintStrength;
    float _pad0;
    vec4 uTint;
} ubo;

const vec3 BASE_TONE = vec3(0.051, 0.02, 0.129);
const vec3 PRIMARY_TONE = vec3(0.58, 0.16, 0.96);
const vec3 HIGHLIGHT_TONE = vec3(0.91, 0.72, 1.0);

void main() {
    vec2 uv = gl_FragCoord.xy / ubo.iResolution;
    float t = ubo.iTime * ubo.uSpeed;

    float wave_x = sin(uv.x * 6.2831855 * ubo.uScale + t * 0.9);
    float wave_y = sin(uv.y * 4.712389 * ubo.uScale + t * 1.3);
    float wave_d = sin((uv.x + uv.y) * 3.1415927 * ubo.uScale + t * 1.7);

    float field = (wave_x + wave_y + wave_d) / 6.0 + 0.5;

    vec3 color = field < 0.5
        ? mix(BASE_TONE, PRIMARY_TONE, field * 2.0)
        : mix(PRIMARY_TONE, HIGHLIGHT_TONE, field * 2.0 - 1.0);
    color = mix(color, color * ubo.uTint.rgb, ubo.uTintStrength);

    float alpha = clamp(field * ubo.uOpacity, 0.0, 1.0);
    outColor = vec4(color * alpha, alpha);
}
";

/// A vertex/fragment source pair that has passed compile and link checks.
///
/// Construction is the compile/link step of initialization: both stages are
/// parsed and validated through naga and the stage interfaces are matched
/// before any device work happens, so a malformed fragment override fails
/// here with a diagnostic instead of surfacing as a device error mid-mount.
#[derive(Debug, Clone)]
pub struct ShaderProgram {
    fragment: String,
}

impl ShaderProgram {
    /// Builds and checks the program for the given configuration.
    ///
    /// Uses the built-in plasma fragment unless the configuration carries an
    /// override. Fails with [`RendererError::Compile`] or
    /// [`RendererError::Link`]; neither is recoverable, so callers abort
    /// initialization and render nothing.
    pub fn for_config(config: &PlasmaConfig) -> Result<Self, RendererError> {
        let fragment = config
            .fragment_override
            .clone()
            .unwrap_or_else(|| PLASMA_FRAGMENT.to_string());
        compile::link_program(VERTEX_SOURCE, &fragment)?;
        Ok(Self { fragment })
    }

    /// Vertex stage source (always the full-screen triangle).
    pub fn vertex(&self) -> &str {
        VERTEX_SOURCE
    }

    /// Fragment stage source.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RendererError, ShaderStageKind};

    #[test]
    fn builtin_program_checks_clean() {
        let program = ShaderProgram::for_config(&PlasmaConfig::default()).unwrap();
        assert!(program.fragment().contains("PlasmaParams"));
    }

    #[test]
    fn malformed_override_is_a_fragment_compile_error() {
        let config = PlasmaConfig {
            fragment_override: Some("void main() { this is not glsl }".to_string()),
            ..PlasmaConfig::default()
        };
        match ShaderProgram::for_config(&config) {
            Err(RendererError::Compile { stage, .. }) => {
                assert_eq!(stage, ShaderStageKind::Fragment);
            }
            other => panic!("expected fragment compile error, got {other:?}"),
        }
    }
}
