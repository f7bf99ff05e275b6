//! Render loop controller and the injectable frame clock.
//!
//! The platform's display-refresh callback source is modeled as a
//! [`FrameClock`] capability so the loop is testable: production uses a
//! clock that requests window redraws, tests substitute
//! [`ManualFrameClock`] and fire frames synchronously.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

/// Opaque cancellation token for one armed frame callback.
///
/// Exactly one token is live per mounted instance; the loop never arms a new
/// one while a previous one is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopToken(u64);

impl LoopToken {
    /// Mints a token. Host clock implementations derive the id from any
    /// per-clock unique counter.
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Display-refresh-synchronized callback source.
///
/// `schedule` arms exactly one future callback and returns its token; the
/// host delivers the callback by calling [`FrameLoop::on_frame`]. `cancel`
/// revokes a still-pending callback. `now` supplies the monotonic timestamp
/// for the frame being delivered.
pub trait FrameClock {
    fn schedule(&mut self) -> LoopToken;
    fn cancel(&mut self, token: LoopToken);
    fn now(&self) -> Instant;
}

/// Render loop states. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Scheduled,
    Running,
    Cancelled,
}

/// Drives the continuous animation: one frame body per delivered callback,
/// self-rescheduling until cancelled.
///
/// The loop itself is a pure state machine; the clock is borrowed per call
/// so the lifecycle layer can keep host capabilities alive across rebuilds.
#[derive(Debug)]
pub struct FrameLoop {
    phase: LoopPhase,
    pending: Option<LoopToken>,
    origin: Option<Instant>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self {
            phase: LoopPhase::Idle,
            pending: None,
            origin: None,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    /// Arms the first frame callback (`Idle -> Scheduled`).
    ///
    /// The time origin is captured lazily at the first delivered frame so
    /// `iTime` is exactly zero for that frame regardless of how long the
    /// platform takes to deliver it.
    pub fn start(&mut self, clock: &mut dyn FrameClock) {
        if self.phase != LoopPhase::Idle {
            tracing::debug!(phase = ?self.phase, "ignoring start on a non-idle loop");
            return;
        }
        debug_assert!(self.pending.is_none());
        self.pending = Some(clock.schedule());
        self.phase = LoopPhase::Scheduled;
    }

    /// Runs one frame body if a callback is actually pending.
    ///
    /// Transitions `Scheduled -> Running` for the duration of `body`, then
    /// re-arms (`-> Scheduled`) when the body returns
    /// [`ControlFlow::Continue`], or parks the loop (`-> Idle`) on
    /// [`ControlFlow::Break`] so a lost context stops scheduling instead of
    /// spin-retrying every frame. Deliveries that race a cancellation are
    /// dropped: once `cancel` has returned, no frame body runs.
    pub fn on_frame<F>(&mut self, clock: &mut dyn FrameClock, body: F)
    where
        F: FnOnce(Duration) -> ControlFlow<()>,
    {
        if self.phase != LoopPhase::Scheduled {
            tracing::trace!(phase = ?self.phase, "dropping stale frame callback");
            return;
        }
        self.pending = None;
        self.phase = LoopPhase::Running;

        let now = clock.now();
        let origin = *self.origin.get_or_insert(now);
        let elapsed = now.saturating_duration_since(origin);

        match body(elapsed) {
            ControlFlow::Continue(()) => {
                self.pending = Some(clock.schedule());
                self.phase = LoopPhase::Scheduled;
            }
            ControlFlow::Break(()) => {
                self.phase = LoopPhase::Idle;
            }
        }
    }

    /// Cancels the loop. Terminal, idempotent, and safe before the first
    /// frame has fired; guarantees no frame body runs after it returns.
    pub fn cancel(&mut self, clock: &mut dyn FrameClock) {
        if let Some(token) = self.pending.take() {
            clock.cancel(token);
        }
        self.phase = LoopPhase::Cancelled;
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic frame clock for tests and headless drivers.
///
/// Frames never fire on their own: the driver advances time with
/// [`advance`](Self::advance) and delivers the armed callback by checking
/// [`take_armed`](Self::take_armed) before calling into the loop.
#[derive(Debug)]
pub struct ManualFrameClock {
    base: Instant,
    offset: Duration,
    next_id: u64,
    armed: Option<LoopToken>,
    cancelled: Vec<LoopToken>,
}

impl ManualFrameClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Duration::ZERO,
            next_id: 0,
            armed: None,
            cancelled: Vec::new(),
        }
    }

    /// Moves the clock's notion of now forward.
    pub fn advance(&mut self, dt: Duration) {
        self.offset += dt;
    }

    /// The currently armed callback, if any.
    pub fn armed(&self) -> Option<LoopToken> {
        self.armed
    }

    /// Simulates the platform delivering the armed callback.
    pub fn take_armed(&mut self) -> Option<LoopToken> {
        self.armed.take()
    }

    /// Tokens revoked through [`FrameClock::cancel`].
    pub fn cancelled(&self) -> &[LoopToken] {
        &self.cancelled
    }
}

impl Default for ManualFrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock for ManualFrameClock {
    fn schedule(&mut self) -> LoopToken {
        debug_assert!(self.armed.is_none(), "two frame callbacks armed at once");
        let token = LoopToken::new(self.next_id);
        self.next_id += 1;
        self.armed = Some(token);
        token
    }

    fn cancel(&mut self, token: LoopToken) {
        if self.armed == Some(token) {
            self.armed = None;
        }
        self.cancelled.push(token);
    }

    fn now(&self) -> Instant {
        self.base + self.offset
    }
}
