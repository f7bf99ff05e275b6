//! Render core for the plasma background layer.
//!
//! The crate owns the shader-backed render-loop lifecycle: it acquires a
//! graphics context and GPU resources, compiles and checks the shader
//! program, drives a display-refresh-synchronized frame loop, keeps the
//! viewport consistent with the host container's box, and releases every
//! resource deterministically at unmount. The overall flow is:
//!
//! ```text
//!   host (plasmabg)
//!        │ PlasmaConfig + capabilities
//!        ▼
//!   PlasmaLayer::mount ──▶ ShaderProgram ──▶ SurfaceFactory ──▶ GpuSurface
//!        │                                                        ▲
//!        ├─▶ ResizeSync (initial box sync, iResolution)            │
//!        └─▶ FrameLoop ──▶ on_frame() ──▶ UniformSet ──▶ render ──┘
//! ```
//!
//! The platform's frame scheduling and layout observation are injected
//! through the [`FrameClock`] and [`BoxObserver`] capabilities so the loop
//! and resize paths are testable with deterministic fakes; the GPU sits
//! behind the [`PlasmaSurface`] seam for the same reason. All failures stop
//! at [`PlasmaLayer`]: the layer renders nothing rather than letting an
//! error escape into the host.

mod compile;
mod error;
pub mod field;
mod frame;
mod gpu;
mod layer;
mod observe;
mod shader;
mod surface;
mod types;

pub use error::{RendererError, ShaderStageKind};
pub use frame::{FrameClock, FrameLoop, LoopPhase, LoopToken, ManualFrameClock};
pub use gpu::WindowSurfaceFactory;
pub use layer::PlasmaLayer;
pub use observe::{BoxObserver, LayoutBox, ResizeSync};
pub use shader::ShaderProgram;
pub use surface::{PlasmaSurface, SurfaceFactory, SurfaceState};
pub use types::{
    PlasmaConfig, UniformSet, DEFAULT_OPACITY, DEFAULT_SCALE, DEFAULT_SPEED, MAX_OPACITY,
};
