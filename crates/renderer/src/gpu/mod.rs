//! GPU backing for the drawable surface.
//!
//! - `context` owns wgpu instance/device/surface wiring and knows how to
//!   rebuild swapchain state when the host box changes.
//! - `pipeline` turns the checked GLSL pair into a render pipeline with a
//!   single uniform bind group.
//! - `uniforms` mirrors the uniform block std140 layout and is rewritten
//!   through the queue each frame.
//! - `state` glues everything together behind the [`PlasmaSurface`] seam
//!   used by the lifecycle layer.
//!
//! [`PlasmaSurface`]: crate::surface::PlasmaSurface

mod context;
mod pipeline;
mod state;
mod uniforms;

pub use state::WindowSurfaceFactory;
