//! Resize synchronizer and the injectable box observer.
//!
//! The platform's layout observation mechanism is modeled as a
//! [`BoxObserver`] capability so the synchronizer is testable: production
//! reads the host window's inner size, tests synthesize box changes without
//! a layout engine.

use crate::error::RendererError;
use crate::surface::{PlasmaSurface, SurfaceState};
use crate::types::UniformSet;

/// Measured content box of the host container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutBox {
    /// Logical width in layout pixels.
    pub logical_width: f64,
    /// Logical height in layout pixels.
    pub logical_height: f64,
    /// Device pixel ratio between logical and backing-buffer pixels.
    pub scale_factor: f64,
}

impl LayoutBox {
    pub fn new(logical_width: f64, logical_height: f64, scale_factor: f64) -> Self {
        Self {
            logical_width,
            logical_height,
            scale_factor,
        }
    }

    /// The backing-buffer pixel size for this box.
    pub fn surface_state(&self) -> SurfaceState {
        SurfaceState::from_logical(self.logical_width, self.logical_height, self.scale_factor)
    }
}

/// Observation capability over the host container's content box.
///
/// `observe`/`disconnect` arm and disarm change notifications; the host
/// delivers a notification by calling [`crate::PlasmaLayer::sync_box`].
/// `current_box` fails with [`RendererError::ResizeObservation`] when the
/// container is detached from layout and unmeasurable.
pub trait BoxObserver {
    fn observe(&mut self);
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn current_box(&self) -> Result<LayoutBox, RendererError>;
}

/// Keeps the drawable surface and the resolution uniform in lockstep with
/// the host container's box.
#[derive(Debug)]
pub struct ResizeSync {
    connected: bool,
}

impl ResizeSync {
    /// Arms observation and performs the mandatory synchronous initial
    /// measurement, so the first rendered frame is never at a stale size.
    ///
    /// An unmeasurable box at connect time falls back to the minimal
    /// surface; the first real box change corrects it.
    pub fn connect(observer: &mut dyn BoxObserver) -> (Self, SurfaceState) {
        observer.observe();
        let state = match observer.current_box() {
            Ok(layout) => {
                let state = layout.surface_state();
                if state.is_empty() {
                    tracing::debug!("host box is empty at connect; using fallback surface");
                    SurfaceState::fallback()
                } else {
                    state
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "host box unmeasurable at connect; using fallback surface");
                SurfaceState::fallback()
            }
        };
        (Self { connected: true }, state)
    }

    /// Applies the current box to the surface and the resolution uniform.
    ///
    /// No-ops when disconnected, when the box is unmeasurable, or when the
    /// box collapsed to zero pixels. The uniform always receives the
    /// backing-buffer pixel size, never the logical size.
    pub fn sync(
        &self,
        observer: &dyn BoxObserver,
        surface: &mut dyn PlasmaSurface,
        uniforms: &mut UniformSet,
    ) {
        if !self.connected {
            return;
        }
        let layout = match observer.current_box() {
            Ok(layout) => layout,
            Err(err) => {
                tracing::debug!(error = %err, "skipping resize sync");
                return;
            }
        };
        let state = layout.surface_state();
        if state.is_empty() {
            return;
        }
        let reallocated = surface.set_size(state);
        uniforms.set_resolution(state.resolution()[0], state.resolution()[1]);
        if reallocated {
            tracing::debug!(
                width = state.pixel_width,
                height = state.pixel_height,
                scale = state.scale_factor,
                "resized drawable surface"
            );
        }
    }

    /// Disarms observation. Idempotent.
    pub fn disconnect(&mut self, observer: &mut dyn BoxObserver) {
        if self.connected {
            observer.disconnect();
            self.connected = false;
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}
