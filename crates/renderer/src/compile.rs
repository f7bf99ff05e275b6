//! Shader compilation and link checking.
//!
//! Both stages are compiled host-side through naga before any GPU work:
//! parse failures map to [`RendererError::Compile`] with the offending stage
//! and diagnostic, IR validation failures and stage-interface mismatches map
//! to [`RendererError::Link`]. The pipeline layer then hands the already
//! checked GLSL to `wgpu`, so device-side module creation cannot fail on
//! source errors.

use std::borrow::Cow;

use wgpu::naga;
use wgpu::naga::ShaderStage;

use crate::error::{RendererError, ShaderStageKind};

/// Parses one GLSL stage into naga IR.
pub(crate) fn parse_stage(
    source: &str,
    stage: ShaderStageKind,
) -> Result<naga::Module, RendererError> {
    let naga_stage = match stage {
        ShaderStageKind::Vertex => ShaderStage::Vertex,
        ShaderStageKind::Fragment => ShaderStage::Fragment,
    };
    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options::from(naga_stage);
    frontend
        .parse(&options, source)
        .map_err(|err| RendererError::Compile {
            stage,
            diagnostic: err.to_string(),
        })
}

/// Runs naga IR validation over a parsed stage.
fn validate_stage(module: &naga::Module, stage: ShaderStageKind) -> Result<(), RendererError> {
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(module)
        .map(|_| ())
        .map_err(|err| RendererError::Link(format!("{stage} stage: {}", err.into_inner())))
}

/// Checks that both stages compile and that their interfaces line up.
///
/// The interface check matches fragment stage inputs against vertex stage
/// outputs by location; a fragment input with no producing vertex output is
/// the classic link failure and would otherwise only surface as an opaque
/// device error during pipeline creation.
pub(crate) fn link_program(vertex: &str, fragment: &str) -> Result<(), RendererError> {
    let vertex_module = parse_stage(vertex, ShaderStageKind::Vertex)?;
    let fragment_module = parse_stage(fragment, ShaderStageKind::Fragment)?;
    validate_stage(&vertex_module, ShaderStageKind::Vertex)?;
    validate_stage(&fragment_module, ShaderStageKind::Fragment)?;

    let outputs = stage_output_locations(&vertex_module, ShaderStage::Vertex)?;
    let inputs = stage_input_locations(&fragment_module, ShaderStage::Fragment)?;
    for location in inputs {
        if !outputs.contains(&location) {
            return Err(RendererError::Link(format!(
                "fragment input at location {location} has no matching vertex output"
            )));
        }
    }
    Ok(())
}

fn entry_point<'a>(
    module: &'a naga::Module,
    stage: ShaderStage,
) -> Result<&'a naga::EntryPoint, RendererError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage)
        .ok_or_else(|| RendererError::Link(format!("{stage:?} stage has no entry point")))
}

fn stage_input_locations(
    module: &naga::Module,
    stage: ShaderStage,
) -> Result<Vec<u32>, RendererError> {
    let entry = entry_point(module, stage)?;
    Ok(entry
        .function
        .arguments
        .iter()
        .filter_map(|arg| match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => Some(*location),
            _ => None,
        })
        .collect())
}

fn stage_output_locations(
    module: &naga::Module,
    stage: ShaderStage,
) -> Result<Vec<u32>, RendererError> {
    let entry = entry_point(module, stage)?;
    let mut locations = Vec::new();
    if let Some(result) = &entry.function.result {
        match &result.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                // Aggregate result: outputs are the struct members.
                if let naga::TypeInner::Struct { members, .. } = &module.types[result.ty].inner {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                            locations.push(*location);
                        }
                    }
                }
            }
        }
    }
    Ok(locations)
}

/// Creates the vertex shader module from already checked source.
pub(crate) fn create_vertex_module(device: &wgpu::Device, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    })
}

/// Creates the fragment shader module from already checked source.
pub(crate) fn create_fragment_module(device: &wgpu::Device, source: &str) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("plasma fragment"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_string()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::{PLASMA_FRAGMENT, VERTEX_SOURCE};

    #[test]
    fn builtin_stages_link() {
        link_program(VERTEX_SOURCE, PLASMA_FRAGMENT).unwrap();
    }

    #[test]
    fn syntax_error_reports_compile_with_stage() {
        let err = link_program("#version 450\nnot even glsl", PLASMA_FRAGMENT).unwrap_err();
        match err {
            RendererError::Compile { stage, diagnostic } => {
                assert_eq!(stage, ShaderStageKind::Vertex);
                assert!(!diagnostic.is_empty());
            }
            other => panic!("expected vertex compile error, got {other:?}"),
        }
    }

    #[test]
    fn unmatched_fragment_input_reports_link() {
        let fragment = r"#version 450
layout(location = 1) in vec3 v_extra;
layout(location = 0) out vec4 outColor;

void main() {
    outColor = vec4(v_extra, 1.0);
}
";
        let err = link_program(VERTEX_SOURCE, fragment).unwrap_err();
        match err {
            RendererError::Link(message) => {
                assert!(message.contains("location 1"), "message: {message}");
            }
            other => panic!("expected link error, got {other:?}"),
        }
    }
}
