//! Windowed host: owns the winit event loop and adapts its events into the
//! renderer's frame-clock and box-observer capabilities.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use renderer::{
    BoxObserver, FrameClock, LayoutBox, LoopToken, PlasmaLayer, RendererError,
    WindowSurfaceFactory,
};
use tracing_subscriber::EnvFilter;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::cli::RunArgs;
use crate::settings;

pub fn initialise_tracing() {
    let default_filter =
        "warn,plasmabg=info,renderer=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Frame clock backed by winit redraw requests.
///
/// `schedule` asks the window for one redraw; winit coalesces duplicates,
/// and with a Fifo swapchain the present call paces deliveries to display
/// refresh. There is no way to retract a requested redraw, so `cancel` only
/// forgets the token and the loop drops the stale delivery by phase.
struct RedrawClock {
    window: Arc<Window>,
    next_id: u64,
    armed: Option<LoopToken>,
}

impl RedrawClock {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            next_id: 0,
            armed: None,
        }
    }
}

impl FrameClock for RedrawClock {
    fn schedule(&mut self) -> LoopToken {
        let token = LoopToken::new(self.next_id);
        self.next_id += 1;
        self.armed = Some(token);
        self.window.request_redraw();
        token
    }

    fn cancel(&mut self, token: LoopToken) {
        if self.armed == Some(token) {
            self.armed = None;
        }
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Box observer backed by the window's inner size and scale factor.
struct WindowBoxObserver {
    window: Arc<Window>,
    connected: bool,
}

impl WindowBoxObserver {
    fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            connected: false,
        }
    }
}

impl BoxObserver for WindowBoxObserver {
    fn observe(&mut self) {
        self.connected = true;
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn current_box(&self) -> Result<LayoutBox, RendererError> {
        let size = self.window.inner_size();
        if size.width == 0 || size.height == 0 {
            return Err(RendererError::ResizeObservation(
                "window has no measurable box".into(),
            ));
        }
        let scale = self.window.scale_factor();
        Ok(LayoutBox::new(
            size.width as f64 / scale,
            size.height as f64 / scale,
            scale,
        ))
    }
}

/// Optional frame-rate cap on top of vblank pacing.
///
/// Skipped callbacks still keep the redraw chain alive; the accumulator
/// subtracts one interval per rendered frame so long gaps never burst.
struct FramePacer {
    interval: Option<Duration>,
    accumulator: Duration,
    last_tick: Option<Instant>,
}

impl FramePacer {
    fn new(target_fps: Option<f32>) -> Self {
        Self {
            interval: target_fps
                .filter(|fps| *fps > 0.0)
                .map(|fps| Duration::from_secs_f32(1.0 / fps)),
            accumulator: Duration::ZERO,
            last_tick: None,
        }
    }

    fn should_render(&mut self) -> bool {
        let Some(interval) = self.interval else {
            return true;
        };
        let now = Instant::now();
        let last = self.last_tick.replace(now).unwrap_or(now);
        self.accumulator = self
            .accumulator
            .saturating_add(now.saturating_duration_since(last));
        if self.accumulator + Duration::from_micros(250) < interval {
            false
        } else {
            self.accumulator = self.accumulator.saturating_sub(interval);
            true
        }
    }
}

pub fn run(args: RunArgs) -> Result<()> {
    let options = settings::resolve(&args)?;

    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window = WindowBuilder::new()
        .with_title("plasmabg")
        .with_inner_size(LogicalSize::new(
            options.window_size.0,
            options.window_size.1,
        ))
        .with_transparent(true)
        .build(&event_loop)
        .context("failed to create host window")?;
    let window = Arc::new(window);

    if !options.config.interactive {
        // A background layer should have no pointer footprint.
        if let Err(err) = window.set_cursor_hittest(false) {
            tracing::debug!(error = %err, "pointer passthrough unavailable on this platform");
        }
    }

    let mut layer = PlasmaLayer::mount(
        options.config,
        Box::new(WindowSurfaceFactory::new(window.clone())),
        Box::new(RedrawClock::new(window.clone())),
        Box::new(WindowBoxObserver::new(window.clone())),
    );
    if !layer.is_active() {
        tracing::warn!("background failed to initialize; window will stay empty");
    }

    let mut pacer = FramePacer::new(options.target_fps);
    if let Some(fps) = options.target_fps {
        tracing::info!(fps, "frame rate cap enabled");
    }

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            if let Event::WindowEvent { window_id, event } = event {
                if window_id != window.id() {
                    return;
                }
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        layer.unmount();
                        elwt.exit();
                    }
                    WindowEvent::Resized(_) => layer.sync_box(),
                    WindowEvent::ScaleFactorChanged { .. } => layer.sync_box(),
                    WindowEvent::RedrawRequested => {
                        if pacer.should_render() {
                            layer.on_frame();
                        } else {
                            // Keep the callback chain alive; the pending
                            // frame is delivered on a later refresh.
                            window.request_redraw();
                        }
                    }
                    _ => {}
                }
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
