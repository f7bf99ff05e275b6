//! Lifecycle binding that ties the surface, shader program, resize
//! synchronizer, and frame loop to one mounted background instance.
//!
//! The layer is the only error boundary in the crate: every failure from
//! the components below it is converted to "render nothing" plus a tracing
//! diagnostic. A background visual effect must never break the host.

use std::ops::ControlFlow;

use crate::error::RendererError;
use crate::frame::{FrameClock, FrameLoop};
use crate::observe::{BoxObserver, ResizeSync};
use crate::shader::ShaderProgram;
use crate::surface::{PlasmaSurface, SurfaceFactory};
use crate::types::{PlasmaConfig, UniformSet};

/// Everything owned by one successfully mounted instance.
///
/// Created atomically at mount, destroyed atomically at teardown; no field
/// outlives the mount it was created for.
struct ActiveMount {
    surface: Box<dyn PlasmaSurface>,
    uniforms: UniformSet,
    frame_loop: FrameLoop,
    resize: ResizeSync,
    /// Set when this mount replaced one torn down by context loss; cleared
    /// after the first presented frame. A second loss while still set means
    /// the device is not coming back, so the layer fails closed instead of
    /// remounting in a loop.
    recovering_from_loss: bool,
}

enum MountState {
    Idle,
    Active(ActiveMount),
    Failed,
}

/// The mounted plasma background.
///
/// Host capabilities (surface factory, frame clock, box observer) are owned
/// for the whole layer lifetime and survive the internal rebuilds triggered
/// by configuration changes and context loss. The host drives the layer by
/// forwarding its platform events:
///
/// - frame callback fired -> [`on_frame`](Self::on_frame)
/// - container box changed -> [`sync_box`](Self::sync_box)
/// - display parameters changed -> [`set_config`](Self::set_config)
/// - container going away -> [`unmount`](Self::unmount)
pub struct PlasmaLayer {
    config: PlasmaConfig,
    surfaces: Box<dyn SurfaceFactory>,
    clock: Box<dyn FrameClock>,
    observer: Box<dyn BoxObserver>,
    mount: MountState,
}

impl PlasmaLayer {
    /// Mounts the background: builds the shader program, connects resize
    /// observation, creates the drawable surface, and starts the frame loop.
    ///
    /// Initialization failure is absorbed here; the returned layer simply
    /// renders nothing and reports [`is_active`](Self::is_active) as false.
    pub fn mount(
        config: PlasmaConfig,
        surfaces: Box<dyn SurfaceFactory>,
        clock: Box<dyn FrameClock>,
        observer: Box<dyn BoxObserver>,
    ) -> Self {
        let mut layer = Self {
            config: config.sanitized(),
            surfaces,
            clock,
            observer,
            mount: MountState::Idle,
        };
        layer.initialize(false);
        layer
    }

    /// Whether a mounted instance is currently rendering.
    pub fn is_active(&self) -> bool {
        matches!(self.mount, MountState::Active(_))
    }

    pub fn config(&self) -> &PlasmaConfig {
        &self.config
    }

    /// Delivers a frame callback from the host's clock.
    pub fn on_frame(&mut self) {
        let Self { mount, clock, .. } = self;
        let MountState::Active(active) = mount else {
            return;
        };
        let ActiveMount {
            surface,
            uniforms,
            frame_loop,
            recovering_from_loss,
            ..
        } = active;

        let mut lost = false;
        frame_loop.on_frame(clock.as_mut(), |elapsed| {
            uniforms.advance_time(elapsed.as_secs_f32());
            match surface.render(uniforms) {
                Ok(()) => {
                    *recovering_from_loss = false;
                    ControlFlow::Continue(())
                }
                Err(RendererError::ContextLost) => {
                    lost = true;
                    ControlFlow::Break(())
                }
                Err(err) => {
                    tracing::warn!(error = %err, "frame render failed; continuing");
                    ControlFlow::Continue(())
                }
            }
        });

        if lost {
            self.handle_context_loss();
        }
    }

    /// Delivers a box-change notification from the host's observer.
    pub fn sync_box(&mut self) {
        let Self {
            mount, observer, ..
        } = self;
        let MountState::Active(active) = mount else {
            return;
        };
        active
            .resize
            .sync(observer.as_ref(), active.surface.as_mut(), &mut active.uniforms);
    }

    /// Replaces the configuration snapshot.
    ///
    /// An identical snapshot is a no-op. Any identity change tears the
    /// instance down fully and re-runs the mount sequence from scratch;
    /// uniforms are cheap to rebuild and the full rebuild avoids
    /// partial-state bugs. Time restarts at zero on the new instance.
    pub fn set_config(&mut self, config: PlasmaConfig) {
        let config = config.sanitized();
        if config == self.config {
            return;
        }
        tracing::info!("configuration changed; rebuilding renderer instance");
        self.config = config;
        self.teardown();
        self.initialize(false);
    }

    /// Tears the mounted instance down. Idempotent; safe on a failed or
    /// already unmounted layer.
    pub fn unmount(&mut self) {
        self.teardown();
    }

    fn initialize(&mut self, recovering: bool) {
        match self.try_initialize(recovering) {
            Ok(active) => self.mount = MountState::Active(active),
            Err(err) => {
                tracing::error!(error = %err, "plasma layer initialization failed; rendering nothing");
                self.mount = MountState::Failed;
            }
        }
    }

    fn try_initialize(&mut self, recovering: bool) -> Result<ActiveMount, RendererError> {
        let program = ShaderProgram::for_config(&self.config)?;

        // Initial box sync happens before the first scheduled frame so the
        // surface is never created at a stale size.
        let (resize, state) = ResizeSync::connect(self.observer.as_mut());
        let surface = self.surfaces.create(&program, state)?;

        let mut uniforms = UniformSet::from_config(&self.config);
        let actual = surface.surface_state();
        uniforms.set_resolution(actual.resolution()[0], actual.resolution()[1]);

        let mut frame_loop = FrameLoop::new();
        frame_loop.start(self.clock.as_mut());

        Ok(ActiveMount {
            surface,
            uniforms,
            frame_loop,
            resize,
            recovering_from_loss: recovering,
        })
    }

    /// Releases everything owned by the current mount.
    ///
    /// Steps are ordered cancel -> disconnect -> release and each is
    /// infallible, so teardown always runs to completion.
    fn teardown(&mut self) {
        match std::mem::replace(&mut self.mount, MountState::Idle) {
            MountState::Active(mut active) => {
                active.frame_loop.cancel(self.clock.as_mut());
                active.resize.disconnect(self.observer.as_mut());
                drop(active.surface);
            }
            MountState::Failed | MountState::Idle => {
                // A failed initialization may have left observation armed.
                if self.observer.is_connected() {
                    self.observer.disconnect();
                }
            }
        }
    }

    fn handle_context_loss(&mut self) {
        let was_recovering =
            matches!(&self.mount, MountState::Active(active) if active.recovering_from_loss);
        self.teardown();
        if was_recovering {
            tracing::error!("context lost again before recovery; rendering nothing");
            self.mount = MountState::Failed;
            return;
        }
        tracing::warn!("context lost; re-running mount sequence once");
        self.initialize(true);
    }
}

impl Drop for PlasmaLayer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use crate::error::RendererError;
    use crate::frame::{LoopToken, ManualFrameClock};
    use crate::observe::LayoutBox;
    use crate::surface::SurfaceState;

    #[derive(Default)]
    struct ProbeState {
        creates: u32,
        drops: u32,
        renders: Vec<UniformSet>,
        fail_create: bool,
        lose_contexts: u32,
    }

    type Probe = Rc<RefCell<ProbeState>>;

    struct FakeSurface {
        probe: Probe,
        state: SurfaceState,
    }

    impl PlasmaSurface for FakeSurface {
        fn set_size(&mut self, state: SurfaceState) -> bool {
            if self.state == state {
                return false;
            }
            self.state = state;
            true
        }

        fn surface_state(&self) -> SurfaceState {
            self.state
        }

        fn render(&mut self, uniforms: &UniformSet) -> Result<(), RendererError> {
            let mut probe = self.probe.borrow_mut();
            if probe.lose_contexts > 0 {
                probe.lose_contexts -= 1;
                return Err(RendererError::ContextLost);
            }
            probe.renders.push(uniforms.clone());
            Ok(())
        }
    }

    impl Drop for FakeSurface {
        fn drop(&mut self) {
            self.probe.borrow_mut().drops += 1;
        }
    }

    struct FakeFactory {
        probe: Probe,
    }

    impl SurfaceFactory for FakeFactory {
        fn create(
            &mut self,
            _program: &ShaderProgram,
            state: SurfaceState,
        ) -> Result<Box<dyn PlasmaSurface>, RendererError> {
            let mut probe = self.probe.borrow_mut();
            if probe.fail_create {
                return Err(RendererError::ContextCreation("no adapter".into()));
            }
            probe.creates += 1;
            Ok(Box::new(FakeSurface {
                probe: self.probe.clone(),
                state,
            }))
        }
    }

    #[derive(Clone)]
    struct SharedClock(Rc<RefCell<ManualFrameClock>>);

    impl FrameClock for SharedClock {
        fn schedule(&mut self) -> LoopToken {
            self.0.borrow_mut().schedule()
        }

        fn cancel(&mut self, token: LoopToken) {
            self.0.borrow_mut().cancel(token)
        }

        fn now(&self) -> Instant {
            self.0.borrow().now()
        }
    }

    #[derive(Clone)]
    struct SharedObserver(Rc<RefCell<ObserverState>>);

    struct ObserverState {
        layout: Option<LayoutBox>,
        connected: bool,
    }

    impl BoxObserver for SharedObserver {
        fn observe(&mut self) {
            self.0.borrow_mut().connected = true;
        }

        fn disconnect(&mut self) {
            self.0.borrow_mut().connected = false;
        }

        fn is_connected(&self) -> bool {
            self.0.borrow().connected
        }

        fn current_box(&self) -> Result<LayoutBox, RendererError> {
            self.0
                .borrow()
                .layout
                .ok_or_else(|| RendererError::ResizeObservation("detached".into()))
        }
    }

    struct Harness {
        probe: Probe,
        clock: Rc<RefCell<ManualFrameClock>>,
        observer: Rc<RefCell<ObserverState>>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                probe: Probe::default(),
                clock: Rc::new(RefCell::new(ManualFrameClock::new())),
                observer: Rc::new(RefCell::new(ObserverState {
                    layout: Some(LayoutBox::new(800.0, 600.0, 1.5)),
                    connected: false,
                })),
            }
        }

        fn mount(&self, config: PlasmaConfig) -> PlasmaLayer {
            PlasmaLayer::mount(
                config,
                Box::new(FakeFactory {
                    probe: self.probe.clone(),
                }),
                Box::new(SharedClock(self.clock.clone())),
                Box::new(SharedObserver(self.observer.clone())),
            )
        }

        /// Simulates one vblank: advances the clock and delivers the armed
        /// callback if there is one.
        fn fire(&self, layer: &mut PlasmaLayer, dt: Duration) -> bool {
            let delivered = {
                let mut clock = self.clock.borrow_mut();
                clock.advance(dt);
                clock.take_armed().is_some()
            };
            if delivered {
                layer.on_frame();
            }
            delivered
        }
    }

    #[test]
    fn mount_renders_at_backing_resolution_with_time_zero() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());
        assert!(layer.is_active());

        assert!(harness.fire(&mut layer, Duration::from_millis(16)));
        let probe = harness.probe.borrow();
        assert_eq!(probe.creates, 1);
        assert_eq!(probe.renders.len(), 1);
        assert_eq!(probe.renders[0].time, 0.0);
        assert_eq!(probe.renders[0].resolution, [1200.0, 900.0]);
    }

    #[test]
    fn frames_carry_monotonic_time() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());
        for _ in 0..5 {
            harness.fire(&mut layer, Duration::from_millis(16));
        }
        let probe = harness.probe.borrow();
        let times: Vec<f32> = probe.renders.iter().map(|u| u.time).collect();
        assert_eq!(times.len(), 5);
        assert_eq!(times[0], 0.0);
        for pair in times.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn unmount_is_complete_and_idempotent() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());
        harness.fire(&mut layer, Duration::from_millis(16));

        layer.unmount();
        assert!(!layer.is_active());
        assert!(harness.clock.borrow().armed().is_none());
        assert!(!harness.observer.borrow().connected);
        assert_eq!(harness.probe.borrow().drops, 1);

        // No scheduled callback remains; a stale delivery renders nothing.
        assert!(!harness.fire(&mut layer, Duration::from_millis(16)));
        layer.on_frame();
        assert_eq!(harness.probe.borrow().renders.len(), 1);

        layer.unmount();
        assert_eq!(harness.probe.borrow().drops, 1);
    }

    #[test]
    fn config_change_rebuilds_exactly_once_and_resets_time() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());
        harness.fire(&mut layer, Duration::from_millis(16));
        harness.fire(&mut layer, Duration::from_millis(16));

        layer.set_config(PlasmaConfig {
            speed: 2.0,
            ..PlasmaConfig::default()
        });
        assert!(layer.is_active());
        {
            let probe = harness.probe.borrow();
            assert_eq!(probe.creates, 2);
            assert_eq!(probe.drops, 1);
        }

        harness.fire(&mut layer, Duration::from_millis(16));
        let probe = harness.probe.borrow();
        let last = probe.renders.last().unwrap();
        assert_eq!(last.time, 0.0);
        assert_eq!(last.speed, 2.0);
    }

    #[test]
    fn identical_config_is_a_no_op() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());
        layer.set_config(PlasmaConfig::default());
        assert_eq!(harness.probe.borrow().creates, 1);
    }

    #[test]
    fn malformed_fragment_fails_closed() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig {
            fragment_override: Some("definitely not glsl".into()),
            ..PlasmaConfig::default()
        });
        assert!(!layer.is_active());
        // The factory was never reached and no callback was armed.
        assert_eq!(harness.probe.borrow().creates, 0);
        assert!(harness.clock.borrow().armed().is_none());
        // Host deliveries on a failed layer stay no-ops.
        layer.on_frame();
        layer.sync_box();
        layer.unmount();
    }

    #[test]
    fn context_loss_remounts_exactly_once() {
        let harness = Harness::new();
        harness.probe.borrow_mut().lose_contexts = 1;
        let mut layer = harness.mount(PlasmaConfig::default());

        harness.fire(&mut layer, Duration::from_millis(16));
        assert!(layer.is_active());
        {
            let probe = harness.probe.borrow();
            assert_eq!(probe.creates, 2);
            assert_eq!(probe.drops, 1);
        }

        harness.fire(&mut layer, Duration::from_millis(16));
        let probe = harness.probe.borrow();
        assert_eq!(probe.renders.len(), 1);
        assert_eq!(probe.renders[0].time, 0.0);
    }

    #[test]
    fn repeated_loss_before_recovery_fails_closed() {
        let harness = Harness::new();
        harness.probe.borrow_mut().lose_contexts = 2;
        let mut layer = harness.mount(PlasmaConfig::default());

        harness.fire(&mut layer, Duration::from_millis(16));
        harness.fire(&mut layer, Duration::from_millis(16));
        assert!(!layer.is_active());
        let probe = harness.probe.borrow();
        assert_eq!(probe.creates, 2);
        assert!(!harness.observer.borrow().connected);
    }

    #[test]
    fn surface_creation_failure_fails_closed() {
        let harness = Harness::new();
        harness.probe.borrow_mut().fail_create = true;
        let layer = harness.mount(PlasmaConfig::default());
        assert!(!layer.is_active());
        assert!(harness.clock.borrow().armed().is_none());
    }

    #[test]
    fn box_change_updates_resolution_uniform() {
        let harness = Harness::new();
        let mut layer = harness.mount(PlasmaConfig::default());

        harness.observer.borrow_mut().layout = Some(LayoutBox::new(400.0, 300.0, 2.0));
        layer.sync_box();
        harness.fire(&mut layer, Duration::from_millis(16));

        let probe = harness.probe.borrow();
        assert_eq!(probe.renders.last().unwrap().resolution, [800.0, 600.0]);
    }
}
