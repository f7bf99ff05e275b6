use std::fmt;

/// Shader stage that produced a compile diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Failure taxonomy for the plasma render core.
///
/// Everything here is caught at the lifecycle boundary ([`crate::PlasmaLayer`])
/// and converted to "render nothing"; none of these variants is allowed to
/// escape into the host event loop.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// No compatible graphics context could be created. Fatal for the
    /// instance; the layer degrades to no background.
    #[error("failed to create a graphics context: {0}")]
    ContextCreation(String),

    /// A shader stage failed to compile. The source is static, so there is
    /// nothing to retry.
    #[error("{stage} shader failed to compile: {diagnostic}")]
    Compile {
        stage: ShaderStageKind,
        diagnostic: String,
    },

    /// The compiled stages could not be linked into a program.
    #[error("shader program failed to link: {0}")]
    Link(String),

    /// The backing graphics context was invalidated by an external device
    /// event. Recoverable: the lifecycle layer re-runs the mount sequence
    /// exactly once per loss event.
    #[error("graphics context was lost")]
    ContextLost,

    /// The host container's box could not be measured. Treated as a
    /// zero-size no-op by the resize synchronizer, never fatal.
    #[error("host container box is unmeasurable: {0}")]
    ResizeObservation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_names_the_stage() {
        let err = RendererError::Compile {
            stage: ShaderStageKind::Fragment,
            diagnostic: "unknown identifier".into(),
        };
        assert_eq!(
            err.to_string(),
            "fragment shader failed to compile: unknown identifier"
        );
    }
}
