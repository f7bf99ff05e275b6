//! Surface sizing state and the drawable-surface seam.

use crate::error::RendererError;
use crate::types::UniformSet;

/// Backing-buffer dimensions of the drawable surface.
///
/// `pixel_width`/`pixel_height` are drawing-buffer pixels, already scaled by
/// the device pixel ratio. Owned by the surface; mutated only through the
/// resize synchronizer; read each frame for the resolution uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub scale_factor: f64,
}

impl SurfaceState {
    /// Converts a logical box into backing-buffer pixels.
    pub fn from_logical(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
            scale_factor
        } else {
            1.0
        };
        Self {
            pixel_width: (logical_width.max(0.0) * scale).round() as u32,
            pixel_height: (logical_height.max(0.0) * scale).round() as u32,
            scale_factor: scale,
        }
    }

    /// Smallest surface a context will accept; used when the host box is
    /// not yet measurable at mount time.
    pub fn fallback() -> Self {
        Self {
            pixel_width: 1,
            pixel_height: 1,
            scale_factor: 1.0,
        }
    }

    /// True when either dimension collapsed to zero.
    pub fn is_empty(&self) -> bool {
        self.pixel_width == 0 || self.pixel_height == 0
    }

    /// The `iResolution` value for this state.
    pub fn resolution(&self) -> [f32; 2] {
        [self.pixel_width as f32, self.pixel_height as f32]
    }
}

/// Drawable surface owned by one mounted instance.
///
/// All graphics state transitions happen inside `render`; callers never
/// observe or depend on ambient bound state between calls. The production
/// implementation wraps a `wgpu` surface ([`crate::gpu::GpuSurface`]); tests
/// substitute a recording fake.
pub trait PlasmaSurface {
    /// Rescales the backing buffer. Returns `true` only when the buffer was
    /// actually reallocated; repeated identical sizes are a no-op.
    fn set_size(&mut self, state: SurfaceState) -> bool;

    /// Current backing-buffer state.
    fn surface_state(&self) -> SurfaceState;

    /// Draws one frame of the full-viewport triangle with the current
    /// program and uniform values, then presents it.
    ///
    /// Fails with [`RendererError::ContextLost`] when the backing context
    /// was invalidated; the caller must stop scheduling frames until the
    /// mount sequence has re-run.
    fn render(&mut self, uniforms: &UniformSet) -> Result<(), RendererError>;
}

/// Creates drawable surfaces for mounts.
///
/// The factory outlives individual mounts: a configuration identity change
/// tears the old surface down and asks the factory for a fresh one.
pub trait SurfaceFactory {
    fn create(
        &mut self,
        program: &crate::shader::ShaderProgram,
        state: SurfaceState,
    ) -> Result<Box<dyn PlasmaSurface>, RendererError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_box_scales_by_device_pixel_ratio() {
        let state = SurfaceState::from_logical(800.0, 600.0, 1.5);
        assert_eq!(state.pixel_width, 1200);
        assert_eq!(state.pixel_height, 900);
        assert_eq!(state.resolution(), [1200.0, 900.0]);
    }

    #[test]
    fn fractional_pixels_round() {
        let state = SurfaceState::from_logical(101.0, 50.0, 1.25);
        assert_eq!(state.pixel_width, 126);
        assert_eq!(state.pixel_height, 63);
    }

    #[test]
    fn invalid_scale_factor_falls_back_to_one() {
        let state = SurfaceState::from_logical(640.0, 480.0, 0.0);
        assert_eq!(state.scale_factor, 1.0);
        assert_eq!(state.pixel_width, 640);
    }

    #[test]
    fn zero_box_is_empty() {
        assert!(SurfaceState::from_logical(0.0, 600.0, 2.0).is_empty());
        assert!(!SurfaceState::fallback().is_empty());
    }
}
