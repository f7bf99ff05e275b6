use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::RendererError;
use crate::surface::SurfaceState;

/// Owns the wgpu instance, device, queue, and the configured swapchain.
pub(crate) struct GpuContext {
    /// Kept alive for the surface lifetime.
    pub _instance: wgpu::Instance,
    /// Limits advertised by the adapter; used to validate resize requests.
    limits: wgpu::Limits,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub state: SurfaceState,
    pub surface_format: wgpu::TextureFormat,
}

impl GpuContext {
    pub(crate) fn new<T>(target: &T, initial: SurfaceState) -> Result<Self, RendererError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let instance = wgpu::Instance::default();
        let window_handle = target.window_handle().map_err(|err| {
            RendererError::ContextCreation(format!("failed to acquire window handle: {err}"))
        })?;
        let display_handle = target.display_handle().map_err(|err| {
            RendererError::ContextCreation(format!("failed to acquire display handle: {err}"))
        })?;

        // The caller keeps the window alive for as long as this context
        // exists, which is what the raw-handle surface constructor requires.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| {
            RendererError::ContextCreation(format!("failed to create rendering surface: {err}"))
        })?;

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| {
            RendererError::ContextCreation(format!("no suitable GPU adapter: {err}"))
        })?;

        let limits = adapter.limits();
        let max_dimension = limits.max_texture_dimension_2d;
        let width = initial.pixel_width.max(1);
        let height = initial.pixel_height.max(1);
        if width > max_dimension || height > max_dimension {
            return Err(RendererError::ContextCreation(format!(
                "requested surface {width}x{height} exceeds GPU max texture dimension {max_dimension}"
            )));
        }

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("plasma device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits.clone(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| {
            RendererError::ContextCreation(format!("failed to create GPU device: {err}"))
        })?;

        // Fifo is universally supported and paces presents to display
        // refresh, which is the scheduling model the frame loop assumes.
        let present_mode = surface_caps
            .present_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::PresentMode::Fifo)
            .unwrap_or(surface_caps.present_modes[0]);

        let alpha_mode = surface_caps
            .alpha_modes
            .iter()
            .copied()
            .find(|mode| *mode == wgpu::CompositeAlphaMode::PreMultiplied)
            .unwrap_or(surface_caps.alpha_modes[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 1,
        };
        surface.configure(&device, &config);

        tracing::info!(
            width,
            height,
            ?surface_format,
            ?present_mode,
            "initialised GPU surface"
        );

        Ok(Self {
            _instance: instance,
            limits,
            surface,
            device,
            queue,
            config,
            state: SurfaceState {
                pixel_width: width,
                pixel_height: height,
                scale_factor: initial.scale_factor,
            },
            surface_format,
        })
    }

    /// Reconfigures the swapchain for a new backing size.
    ///
    /// Idempotent: identical pixel dimensions return `false` without
    /// touching the surface.
    pub(crate) fn resize(&mut self, new_state: SurfaceState) -> bool {
        if new_state.is_empty() {
            return false;
        }
        if new_state.pixel_width > self.limits.max_texture_dimension_2d
            || new_state.pixel_height > self.limits.max_texture_dimension_2d
        {
            tracing::warn!(
                width = new_state.pixel_width,
                height = new_state.pixel_height,
                max = self.limits.max_texture_dimension_2d,
                "resize exceeds GPU max texture dimension; keeping previous size"
            );
            return false;
        }
        if new_state.pixel_width == self.config.width
            && new_state.pixel_height == self.config.height
        {
            self.state.scale_factor = new_state.scale_factor;
            return false;
        }

        self.state = new_state;
        self.config.width = new_state.pixel_width;
        self.config.height = new_state.pixel_height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    /// Re-applies the current configuration after an outdated swapchain.
    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }
}
