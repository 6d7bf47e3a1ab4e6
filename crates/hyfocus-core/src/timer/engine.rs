//! Session timer implementation.
//!
//! Unlike a caller-ticked engine, the session timer owns a background thread
//! that wakes at least once per tick interval (one second by default), or
//! immediately when `stop()`, `pause()` or `resume()` signal it.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Working <-> Break
//!         Working|Break -> Paused -> Working|Break
//!         any -> Idle (stop)
//!         any running -> Completed (finish)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let timer = SessionTimer::new();
//! timer.set_on_break_start(|| println!("break time"));
//! timer.configure(120, 25, 5);
//! timer.start();
//! // ...
//! timer.stop();
//! ```
//!
//! Callbacks run on the timer thread (except the work-start callback fired
//! by `start()`, which runs on the caller) and are never invoked while the
//! internal lock is held, so they may call back into the timer.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::plan::{IntervalKind, IntervalPlan};
use crate::clock::{Clock, SystemClock};

/// Default wake cadence of the tick loop.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Working,
    Break,
    Paused,
    Completed,
}

impl TimerState {
    /// True while an interval is actively counting down.
    pub fn is_running(self) -> bool {
        matches!(self, TimerState::Working | TimerState::Break)
    }

    pub fn interval_kind(self) -> Option<IntervalKind> {
        match self {
            TimerState::Working => Some(IntervalKind::Work),
            TimerState::Break => Some(IntervalKind::Break),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Working => "working",
            TimerState::Break => "break",
            TimerState::Paused => "paused",
            TimerState::Completed => "completed",
        }
    }
}

impl From<IntervalKind> for TimerState {
    fn from(kind: IntervalKind) -> Self {
        match kind {
            IntervalKind::Work => TimerState::Working,
            IntervalKind::Break => TimerState::Break,
        }
    }
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Callback = Arc<dyn Fn() + Send + Sync>;
pub type TickCallback = Arc<dyn Fn(u64, TimerState) + Send + Sync>;

#[derive(Default, Clone)]
struct Callbacks {
    on_work_start: Option<Callback>,
    on_break_start: Option<Callback>,
    on_session_complete: Option<Callback>,
    on_tick: Option<TickCallback>,
}

/// Mutable timer state, guarded by `Shared::core`.
#[derive(Debug)]
struct Core {
    /// Plan of the running session.
    plan: IntervalPlan,
    /// Plan applied by the next `start()`.
    configured: IntervalPlan,
    state: TimerState,
    session_start: Option<Instant>,
    interval_start: Option<Instant>,
    finished_at: Option<Instant>,
    paused_remaining: Duration,
    /// Every finished interval, work or break. Even means the next interval
    /// is work, odd means break.
    completed_intervals: u32,
    stop_requested: bool,
}

impl Core {
    fn new() -> Self {
        Self {
            plan: IntervalPlan::default(),
            configured: IntervalPlan::default(),
            state: TimerState::Idle,
            session_start: None,
            interval_start: None,
            finished_at: None,
            paused_remaining: Duration::ZERO,
            completed_intervals: 0,
            stop_requested: false,
        }
    }

    fn resume_kind(&self) -> IntervalKind {
        if self.completed_intervals % 2 == 0 {
            IntervalKind::Work
        } else {
            IntervalKind::Break
        }
    }

    fn remaining_at(&self, now: Instant) -> Duration {
        match self.state {
            TimerState::Paused => self.paused_remaining,
            state => match (state.interval_kind(), self.interval_start) {
                (Some(kind), Some(start)) => self
                    .plan
                    .interval(kind)
                    .saturating_sub(now.saturating_duration_since(start)),
                _ => Duration::ZERO,
            },
        }
    }

    fn elapsed_at(&self, now: Instant) -> Duration {
        match (self.state, self.session_start) {
            (TimerState::Idle, _) | (_, None) => Duration::ZERO,
            (_, Some(start)) => self.finished_at.unwrap_or(now).saturating_duration_since(start),
        }
    }
}

struct Shared {
    core: Mutex<Core>,
    wake: Condvar,
    callbacks: Mutex<Callbacks>,
    worker_id: Mutex<Option<ThreadId>>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
}

impl Shared {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn callbacks(&self) -> Callbacks {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn on_worker_thread(&self) -> bool {
        let worker = self.worker_id.lock().unwrap_or_else(PoisonError::into_inner);
        *worker == Some(std::thread::current().id())
    }
}

/// Work/break interval timer running on its own thread.
pub struct SessionTimer {
    shared: Arc<Shared>,
    /// Held for the whole of start/stop/finish so lifecycle changes serialize.
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_TICK_INTERVAL)
    }

    /// Create a timer reading time from `clock` and waking every `tick_interval`.
    pub fn with_clock(clock: Arc<dyn Clock>, tick_interval: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                core: Mutex::new(Core::new()),
                wake: Condvar::new(),
                callbacks: Mutex::new(Callbacks::default()),
                worker_id: Mutex::new(None),
                clock,
                tick_interval: tick_interval.max(Duration::from_millis(1)),
            }),
            worker: Mutex::new(None),
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Set the session durations. Takes effect on the next `start()`.
    pub fn configure(&self, total_minutes: i64, work_minutes: i64, break_minutes: i64) {
        self.configure_plan(IntervalPlan::new(total_minutes, work_minutes, break_minutes));
    }

    pub fn configure_plan(&self, plan: IntervalPlan) {
        self.shared.lock_core().configured = plan;
        info!(
            total_min = plan.total_min,
            work_min = plan.work_min,
            break_min = plan.break_min,
            "timer configured"
        );
    }

    pub fn set_on_work_start(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.lock_callbacks().on_work_start = Some(Arc::new(cb));
    }

    pub fn set_on_break_start(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.lock_callbacks().on_break_start = Some(Arc::new(cb));
    }

    pub fn set_on_session_complete(&self, cb: impl Fn() + Send + Sync + 'static) {
        self.lock_callbacks().on_session_complete = Some(Arc::new(cb));
    }

    /// Called after every loop wake with remaining minutes and current state.
    pub fn set_on_tick(&self, cb: impl Fn(u64, TimerState) + Send + Sync + 'static) {
        self.lock_callbacks().on_tick = Some(Arc::new(cb));
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.shared.lock_core().state
    }

    /// The configured plan, as the next `start()` will use it.
    pub fn plan(&self) -> IntervalPlan {
        self.shared.lock_core().configured
    }

    pub fn is_running(&self) -> bool {
        self.state().is_running()
    }

    pub fn is_break_time(&self) -> bool {
        self.state() == TimerState::Break
    }

    pub fn completed_work_intervals(&self) -> u32 {
        let completed = self.shared.lock_core().completed_intervals;
        completed.div_ceil(2)
    }

    /// Seconds left in the current interval; zero when idle or completed.
    pub fn remaining_seconds(&self) -> u64 {
        let now = self.shared.clock.now();
        self.shared.lock_core().remaining_at(now).as_secs()
    }

    /// Seconds since `start()`, including time spent paused.
    pub fn elapsed_seconds(&self) -> u64 {
        let now = self.shared.clock.now();
        self.shared.lock_core().elapsed_at(now).as_secs()
    }

    /// True once a running or paused session has used up its total budget.
    ///
    /// The timer never acts on this itself; whoever owns the session decides
    /// when to `finish()`.
    pub fn budget_exhausted(&self) -> bool {
        let now = self.shared.clock.now();
        let core = self.shared.lock_core();
        (core.state.is_running() || core.state == TimerState::Paused)
            && core.elapsed_at(now) >= core.plan.total()
    }

    /// Read-only view for callbacks that need the timer's state.
    pub fn handle(&self) -> TimerHandle {
        TimerHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session in the Working state.
    ///
    /// Returns false if a session is already running or paused.
    pub fn start(&self) -> bool {
        if self.shared.on_worker_thread() {
            warn!("cannot start timer from one of its own callbacks");
            return false;
        }
        let mut worker = self.lock_worker();
        {
            let core = self.shared.lock_core();
            if !matches!(core.state, TimerState::Idle | TimerState::Completed) {
                warn!(state = %core.state, "cannot start timer: already running or paused");
                return false;
            }
        }

        if let Some(handle) = worker.take() {
            self.join(handle);
        }

        {
            let mut core = self.shared.lock_core();
            let now = self.shared.clock.now();
            core.stop_requested = false;
            core.plan = core.configured;
            core.completed_intervals = 0;
            core.paused_remaining = Duration::ZERO;
            core.session_start = Some(now);
            core.interval_start = Some(now);
            core.finished_at = None;
            core.state = TimerState::Working;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = std::thread::Builder::new()
            .name("hyfocus-timer".into())
            .spawn(move || run_loop(shared));
        match spawned {
            Ok(handle) => {
                *self
                    .shared
                    .worker_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(handle.thread().id());
                *worker = Some(handle);
            }
            Err(e) => {
                error!("failed to spawn timer thread: {e}");
                let mut core = self.shared.lock_core();
                core.state = TimerState::Idle;
                core.session_start = None;
                core.interval_start = None;
                return false;
            }
        }
        drop(worker);

        info!("focus session started");
        invoke("work_start", self.shared.callbacks().on_work_start.as_ref());
        true
    }

    /// Stop the session and wait for the timer thread to exit. Idempotent.
    pub fn stop(&self) {
        self.halt(TimerState::Idle);
        info!("focus session stopped");
    }

    /// End the session as completed and fire the completion callback.
    ///
    /// Returns false, without firing anything, if no session was running or
    /// paused.
    pub fn finish(&self) -> bool {
        if !self.halt(TimerState::Completed) {
            return false;
        }
        info!("focus session completed");
        invoke(
            "session_complete",
            self.shared.callbacks().on_session_complete.as_ref(),
        );
        true
    }

    /// Freeze the current interval. Returns false unless working or on a break.
    pub fn pause(&self) -> bool {
        let mut core = self.shared.lock_core();
        let (Some(kind), Some(start)) = (core.state.interval_kind(), core.interval_start) else {
            return false;
        };
        let now = self.shared.clock.now();
        let elapsed = now.saturating_duration_since(start);
        core.paused_remaining = core.plan.interval(kind).saturating_sub(elapsed);
        core.state = TimerState::Paused;
        self.shared.wake.notify_all();
        info!(
            remaining_secs = core.paused_remaining.as_secs(),
            "timer paused"
        );
        true
    }

    /// Continue a paused interval with the time it had left.
    pub fn resume(&self) -> bool {
        let mut core = self.shared.lock_core();
        if core.state != TimerState::Paused {
            return false;
        }
        let kind = core.resume_kind();
        let now = self.shared.clock.now();
        let consumed = core.plan.interval(kind).saturating_sub(core.paused_remaining);
        core.interval_start = Some(now.checked_sub(consumed).unwrap_or(now));
        core.state = kind.into();
        self.shared.wake.notify_all();
        info!(state = %core.state, "timer resumed");
        true
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Request loop exit, set the final state and join the thread.
    ///
    /// Returns whether a session was active (running or paused) beforehand.
    fn halt(&self, final_state: TimerState) -> bool {
        // A callback stopping the timer runs on the timer thread itself;
        // the loop exits once the callback returns, so there is nothing to join.
        let mut worker = if self.shared.on_worker_thread() {
            None
        } else {
            Some(self.lock_worker())
        };

        let was_active = {
            let mut core = self.shared.lock_core();
            let was_active = core.state.is_running() || core.state == TimerState::Paused;
            if final_state == TimerState::Completed {
                if !was_active {
                    return false;
                }
                core.finished_at = Some(self.shared.clock.now());
            }
            core.stop_requested = true;
            core.state = final_state;
            was_active
        };
        self.shared.wake.notify_all();

        if let Some(handle) = worker.as_mut().and_then(|w| w.take()) {
            self.join(handle);
        }
        was_active
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.thread().id() == std::thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            error!("timer thread panicked");
        }
        *self
            .shared
            .worker_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Callbacks> {
        self.shared
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SessionTimer {
    fn drop(&mut self) {
        self.halt(TimerState::Idle);
    }
}

impl std::fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.shared.lock_core();
        f.debug_struct("SessionTimer")
            .field("state", &core.state)
            .field("plan", &core.plan)
            .field("completed_intervals", &core.completed_intervals)
            .finish()
    }
}

/// Weak, query-only handle to a [`SessionTimer`].
///
/// Safe to capture in the timer's own callbacks without keeping the timer
/// alive. Reads as idle once the timer is gone.
#[derive(Clone)]
pub struct TimerHandle {
    shared: Weak<Shared>,
}

impl TimerHandle {
    pub fn state(&self) -> TimerState {
        self.shared
            .upgrade()
            .map_or(TimerState::Idle, |shared| shared.lock_core().state)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.shared.upgrade().map_or(0, |shared| {
            let now = shared.clock.now();
            shared.lock_core().remaining_at(now).as_secs()
        })
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.shared.upgrade().map_or(0, |shared| {
            let now = shared.clock.now();
            shared.lock_core().elapsed_at(now).as_secs()
        })
    }
}

impl std::fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerHandle")
            .field("state", &self.state())
            .finish()
    }
}

fn run_loop(shared: Arc<Shared>) {
    debug!("timer thread started");
    loop {
        let (transition, remaining, state) = {
            let core = shared.lock_core();
            let (mut core, _) = shared
                .wake
                .wait_timeout(core, shared.tick_interval)
                .unwrap_or_else(PoisonError::into_inner);

            if core.stop_requested {
                break;
            }
            let (Some(kind), Some(start)) = (core.state.interval_kind(), core.interval_start)
            else {
                // Paused: keep waiting without consuming interval time.
                continue;
            };

            let now = shared.clock.now();
            let mut transition = None;
            if now.saturating_duration_since(start) >= core.plan.interval(kind) {
                core.completed_intervals += 1;
                let next = match kind {
                    IntervalKind::Work => IntervalKind::Break,
                    IntervalKind::Break => IntervalKind::Work,
                };
                core.state = next.into();
                core.interval_start = Some(now);
                transition = Some(next);
            }
            (transition, core.remaining_at(now), core.state)
        };

        let callbacks = shared.callbacks();
        match transition {
            Some(IntervalKind::Break) => {
                info!("break interval started");
                invoke("break_start", callbacks.on_break_start.as_ref());
            }
            Some(IntervalKind::Work) => {
                info!("work interval started");
                invoke("work_start", callbacks.on_work_start.as_ref());
            }
            None => {}
        }
        if let Some(on_tick) = callbacks.on_tick.as_ref() {
            let minutes = remaining.as_secs() / 60;
            contain("tick", || on_tick(minutes, state));
        }
    }
    debug!("timer thread exiting");
}

fn invoke(name: &'static str, cb: Option<&Callback>) {
    if let Some(cb) = cb {
        contain(name, || cb());
    }
}

/// Run a collaborator callback, logging instead of unwinding on panic.
fn contain(name: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        error!(callback = name, "timer callback panicked: {message}");
    }
}
