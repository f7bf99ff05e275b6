use std::sync::Arc;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::error::RendererError;
use crate::shader::ShaderProgram;
use crate::surface::{PlasmaSurface, SurfaceFactory, SurfaceState};
use crate::types::UniformSet;

use super::context::GpuContext;
use super::pipeline::PlasmaPipeline;
use super::uniforms::PlasmaUniforms;

/// Owns every GPU resource needed to present one plasma frame.
///
/// The layout mirrors the lifetime relationship between objects:
///
/// ```text
///   Window ─▶ Surface ─▶ Device ─▶ Queue
///                           │
///                           ├─▶ RenderPipeline
///                           └─▶ Uniform buffer / bind group
/// ```
///
/// Exclusively owned by one mounted instance; dropping it releases the
/// whole set exactly once.
pub(crate) struct GpuSurface {
    context: GpuContext,
    pipeline: PlasmaPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl GpuSurface {
    pub(crate) fn new(
        window: &Window,
        initial: SurfaceState,
        program: &ShaderProgram,
    ) -> Result<Self, RendererError> {
        let context = GpuContext::new(window, initial)?;
        let pipeline = PlasmaPipeline::new(&context.device, context.surface_format, program);

        // Seeded zeroed; the first frame rewrites the block before drawing.
        let seed = PlasmaUniforms::zeroed();
        let uniform_buffer =
            context
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("uniform buffer"),
                    contents: bytemuck::bytes_of(&seed),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
        let uniform_bind_group = context
            .device
            .create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform bind group"),
                layout: &pipeline.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                }],
            });

        Ok(Self {
            context,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
        })
    }
}

impl PlasmaSurface for GpuSurface {
    fn set_size(&mut self, state: SurfaceState) -> bool {
        self.context.resize(state)
    }

    fn surface_state(&self) -> SurfaceState {
        self.context.state
    }

    fn render(&mut self, uniforms: &UniformSet) -> Result<(), RendererError> {
        let block = PlasmaUniforms::from_set(uniforms);
        self.context
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&block));

        let frame = match self.context.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::trace!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::Outdated) => {
                // Stale swapchain after a racing resize; reconfigure and let
                // the next callback draw at the new size.
                self.context.reconfigure();
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(error = ?err, "backing context invalidated");
                return Err(RendererError::ContextLost);
            }
        };

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_pipeline(&self.pipeline.pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            // One full-viewport triangle; the geometry never changes.
            render_pass.draw(0..3, 0..1);
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        tracing::trace!(
            width = self.context.state.pixel_width,
            height = self.context.state.pixel_height,
            "presented frame"
        );
        Ok(())
    }
}

/// Production surface factory backed by a winit window.
///
/// Holds the window `Arc` so the raw-handle surface the context creates can
/// never outlive its window.
pub struct WindowSurfaceFactory {
    window: Arc<Window>,
}

impl WindowSurfaceFactory {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl SurfaceFactory for WindowSurfaceFactory {
    fn create(
        &mut self,
        program: &ShaderProgram,
        state: SurfaceState,
    ) -> Result<Box<dyn PlasmaSurface>, RendererError> {
        Ok(Box::new(GpuSurface::new(
            self.window.as_ref(),
            state,
            program,
        )?))
    }
}
