//! The focus session context.
//!
//! [`FocusContext`] owns every session component and is the single object a
//! host integration talks to. Hosts forward their events (workspace changes,
//! app launches, window moves, user commands) and act on the returned
//! decisions; everything the user should see comes out through the
//! [`Notifier`].
//!
//! ```ignore
//! let ctx = FocusContext::new(Arc::new(MyNotifier), Arc::new(StateFile::new()));
//! ctx.configure(&Config::load_or_default());
//! ctx.start_session(&parse_start_args("1,2@50")?, current_workspace);
//!
//! // on every workspace change reported by the host:
//! if let SwitchDecision::Revert { to } = ctx.on_workspace_changed(id, focused.as_ref()) {
//!     host.switch_to(to);
//!     ctx.revert_finished();
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::access::{AccessController, SessionFlags, SpawnWhitelist};
use crate::challenge::{ChallengeEngine, ChallengeType};
use crate::command::StartRequest;
use crate::events::{format_mmss, Event, StateSnapshot};
use crate::host::{FocusedWindow, Notifier, StateSink, WorkspaceId};
use crate::shake::ShakeAnimator;
use crate::storage::Config;
use crate::timer::{IntervalPlan, SessionTimer, TimerHandle, TimerState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started {
        workspaces: Vec<WorkspaceId>,
        plan: IntervalPlan,
    },
    AlreadyActive,
    /// The timer thread could not be started.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    Stopped { elapsed_secs: u64 },
    /// A challenge was just issued; the session keeps running.
    ChallengeIssued { prompt: String },
    /// A challenge is already waiting for an answer.
    ChallengePending { prompt: String, hint: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    NoChallenge,
    Passed { elapsed_secs: u64 },
    MoreConfirmations { remaining: u32, prompt: String },
    Wrong { hint: String },
}

/// What the host should do about an observed workspace change or move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDecision {
    Allow,
    Revert { to: WorkspaceId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnDecision {
    Launch,
    Suppress,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub active: bool,
    pub state: TimerState,
    pub remaining_secs: u64,
    pub elapsed_secs: u64,
    pub workspaces: Vec<WorkspaceId>,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.active {
            return f.write_str("No active focus session.");
        }
        let label = match self.state {
            TimerState::Working => "WORKING",
            TimerState::Break => "BREAK",
            TimerState::Paused => "PAUSED",
            _ => "UNKNOWN",
        };
        let workspaces = self
            .workspaces
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "Session: {label} | Remaining: {} | Elapsed: {} | Workspaces: {workspaces}",
            format_mmss(self.remaining_secs),
            format_mmss(self.elapsed_secs)
        )
    }
}

/// Owns the session components and turns host events into decisions.
pub struct FocusContext {
    timer: SessionTimer,
    shaker: ShakeAnimator,
    challenge: ChallengeEngine,
    access: Arc<AccessController>,
    whitelist: SpawnWhitelist,
    flags: SessionFlags,
    notifier: Arc<dyn Notifier>,
    state_sink: Arc<dyn StateSink>,
    default_plan: Mutex<IntervalPlan>,
    reverting: AtomicBool,
    /// Serializes start, stop and completion.
    lifecycle: Mutex<()>,
}

impl FocusContext {
    pub fn new(notifier: Arc<dyn Notifier>, state_sink: Arc<dyn StateSink>) -> Self {
        Self::with_components(
            SessionTimer::new(),
            ShakeAnimator::new(),
            ChallengeEngine::new(),
            notifier,
            state_sink,
        )
    }

    /// Build around pre-made components, e.g. a timer on a manual clock.
    /// Replaces any callbacks already registered on `timer`.
    pub fn with_components(
        timer: SessionTimer,
        shaker: ShakeAnimator,
        challenge: ChallengeEngine,
        notifier: Arc<dyn Notifier>,
        state_sink: Arc<dyn StateSink>,
    ) -> Self {
        let flags = SessionFlags::new();
        let access = Arc::new(AccessController::new(flags.clone()));
        let default_plan = timer.plan();
        let ctx = Self {
            timer,
            shaker,
            challenge,
            access,
            whitelist: SpawnWhitelist::default(),
            flags,
            notifier,
            state_sink,
            default_plan: Mutex::new(default_plan),
            reverting: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        };
        ctx.register_timer_callbacks();
        ctx
    }

    /// Apply a loaded configuration. Lists replace the current ones.
    pub fn configure(&self, config: &Config) {
        let plan = config.plan();
        *self
            .default_plan
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = plan;
        self.timer.configure_plan(plan);

        self.access.set_policy(config.policy());
        self.access.clear_exception_classes();
        for class in &config.enforcement.exception_classes {
            self.access.add_exception_class(class);
        }

        self.whitelist.set_block_spawn(config.spawn.block_spawn);
        self.whitelist.set_mode(config.spawn.match_mode);
        self.whitelist.clear();
        for app in &config.spawn.whitelist {
            self.whitelist.add(app);
        }

        self.challenge
            .configure(config.challenge.kind, &config.challenge.phrase);

        let shake = config.shake_settings();
        self.shaker.configure(
            i64::from(shake.intensity_px),
            shake.duration_ms as i64,
            shake.period_ms as i64,
        );
        debug!("focus context configured");
    }

    // ── Components ───────────────────────────────────────────────────

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn access(&self) -> &AccessController {
        &self.access
    }

    pub fn whitelist(&self) -> &SpawnWhitelist {
        &self.whitelist
    }

    pub fn shaker(&self) -> &ShakeAnimator {
        &self.shaker
    }

    pub fn challenge(&self) -> &ChallengeEngine {
        &self.challenge
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub fn is_session_active(&self) -> bool {
        self.flags.is_session_active()
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Start a session restricted to `request.workspaces`, or to
    /// `current_workspace` when the request names none.
    pub fn start_session(
        &self,
        request: &StartRequest,
        current_workspace: WorkspaceId,
    ) -> StartOutcome {
        let _guard = self.lock_lifecycle();
        if self.flags.is_session_active() {
            warn!("cannot start focus session: one is already active");
            return StartOutcome::AlreadyActive;
        }

        let workspaces = if request.workspaces.is_empty() {
            vec![current_workspace]
        } else {
            request.workspaces.clone()
        };
        let plan = match request.work_minutes {
            Some(minutes) => IntervalPlan::pomodoro(minutes),
            None => *self
                .default_plan
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        };

        self.access.set_allowed_workspaces(workspaces.iter().copied());
        self.access.set_last_valid_workspace(current_workspace);
        self.reverting.store(false, Ordering::SeqCst);
        self.challenge.cancel();
        self.timer.configure_plan(plan);

        if !self.timer.start() {
            return StartOutcome::Failed;
        }
        self.flags.set_break_time(false);
        self.flags.set_session_active(true);

        let workspaces = self.access.allowed_workspaces();
        self.persist_state();
        self.notifier.notify(&Event::SessionStarted {
            workspaces: workspaces.clone(),
            work_minutes: plan.work_min,
            break_minutes: plan.break_min,
            at: Utc::now(),
        });
        info!(
            ?workspaces,
            work_min = plan.work_min,
            break_min = plan.break_min,
            "focus session started"
        );
        StartOutcome::Started { workspaces, plan }
    }

    /// Ask to end the session.
    ///
    /// Without `force`, an enabled exit challenge has to be passed through
    /// [`confirm`](Self::confirm) first.
    pub fn request_stop(&self, force: bool) -> StopOutcome {
        if !self.flags.is_session_active() {
            return StopOutcome::NotRunning;
        }

        if !force && self.challenge.is_enabled() {
            if self.challenge.is_active() {
                return StopOutcome::ChallengePending {
                    prompt: self.challenge.prompt(),
                    hint: self.challenge.hint().to_string(),
                };
            }
            let prompt = self.challenge.initiate();
            self.notifier.notify(&Event::ChallengeIssued {
                prompt: prompt.clone(),
                at: Utc::now(),
            });
            return StopOutcome::ChallengeIssued { prompt };
        }

        match self.end_session() {
            Some(elapsed_secs) => StopOutcome::Stopped { elapsed_secs },
            None => StopOutcome::NotRunning,
        }
    }

    /// Answer the pending exit challenge. Passing it stops the session.
    pub fn confirm(&self, answer: &str) -> ConfirmOutcome {
        if !self.challenge.is_active() {
            return ConfirmOutcome::NoChallenge;
        }

        let before = self.challenge.remaining_confirmations();
        if self.challenge.validate_answer(answer) {
            info!("exit challenge passed");
            let elapsed_secs = self.end_session().unwrap_or_default();
            return ConfirmOutcome::Passed { elapsed_secs };
        }

        let remaining = self.challenge.remaining_confirmations();
        if self.challenge.challenge_type() == ChallengeType::Countdown && remaining < before {
            return ConfirmOutcome::MoreConfirmations {
                remaining,
                prompt: self.challenge.prompt(),
            };
        }

        let hint = self.challenge.hint().to_string();
        self.notifier.notify(&Event::ChallengeFailed {
            hint: hint.clone(),
            at: Utc::now(),
        });
        ConfirmOutcome::Wrong { hint }
    }

    /// Abandon the pending challenge; the session keeps running.
    pub fn cancel_challenge(&self) -> bool {
        let was_active = self.challenge.is_active();
        self.challenge.cancel();
        was_active
    }

    pub fn pause(&self) -> bool {
        if !self.flags.is_session_active() || !self.timer.pause() {
            return false;
        }
        self.persist_state();
        self.notifier.notify(&Event::SessionPaused {
            remaining_secs: self.timer.remaining_seconds(),
            at: Utc::now(),
        });
        true
    }

    pub fn resume(&self) -> bool {
        if !self.timer.resume() {
            return false;
        }
        self.persist_state();
        self.notifier.notify(&Event::SessionResumed {
            remaining_secs: self.timer.remaining_seconds(),
            at: Utc::now(),
        });
        true
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            active: self.flags.is_session_active(),
            state: self.timer.state(),
            remaining_secs: self.timer.remaining_seconds(),
            elapsed_secs: self.timer.elapsed_seconds(),
            workspaces: self.access.allowed_workspaces(),
        }
    }

    /// End the session as completed once its total budget is used up.
    ///
    /// The timer never does this by itself; hosts call it periodically.
    pub fn complete_if_due(&self) -> bool {
        let _guard = self.lock_lifecycle();
        if !self.flags.is_session_active() || !self.timer.budget_exhausted() {
            return false;
        }
        self.challenge.cancel();
        // The completion callback resets flags and clears the state file.
        self.timer.finish()
    }

    // ── Host events ──────────────────────────────────────────────────

    /// Judge a workspace change that already happened.
    ///
    /// On `Revert`, the host switches back and then calls
    /// [`revert_finished`](Self::revert_finished). Changes observed in
    /// between are taken as the revert itself and always allowed.
    pub fn on_workspace_changed(
        &self,
        workspace: WorkspaceId,
        focused: Option<&FocusedWindow>,
    ) -> SwitchDecision {
        if self.reverting.load(Ordering::SeqCst) {
            if self.access.is_workspace_allowed(workspace) {
                self.access.set_last_valid_workspace(workspace);
            }
            debug!(workspace, "workspace change during revert");
            return SwitchDecision::Allow;
        }

        if !self.access.should_block_switch(workspace) {
            self.access.set_last_valid_workspace(workspace);
            return SwitchDecision::Allow;
        }

        let to = self.access.last_valid_workspace();
        self.reverting.store(true, Ordering::SeqCst);
        if let Some(window) = focused {
            self.shaker.trigger(Arc::clone(&window.target));
        }
        self.notifier.notify(&Event::SwitchBlocked {
            target: workspace,
            revert_to: to,
            at: Utc::now(),
        });
        info!(workspace, revert_to = to, "reverting blocked workspace switch");
        SwitchDecision::Revert { to }
    }

    pub fn revert_finished(&self) {
        self.reverting.store(false, Ordering::SeqCst);
    }

    pub fn is_reverting(&self) -> bool {
        self.reverting.load(Ordering::SeqCst)
    }

    /// Judge an application launch before it happens.
    pub fn on_spawn(&self, command: &str, focused: Option<&FocusedWindow>) -> SpawnDecision {
        if !self.whitelist.should_block_spawn(command, &self.access) {
            return SpawnDecision::Launch;
        }
        if let Some(window) = focused {
            self.shaker.trigger(Arc::clone(&window.target));
        }
        self.notifier.notify(&Event::SpawnBlocked {
            command: command.to_string(),
            at: Utc::now(),
        });
        SpawnDecision::Suppress
    }

    /// Judge moving `window` to workspace `target`. Exempt windows may go
    /// anywhere.
    pub fn on_window_moved(&self, window: &FocusedWindow, target: WorkspaceId) -> SwitchDecision {
        if !self.access.is_enforcing()
            || self.access.is_window_exempt(Some(window.info.as_ref()))
            || self.access.is_workspace_allowed(target)
        {
            return SwitchDecision::Allow;
        }

        self.shaker.trigger(Arc::clone(&window.target));
        self.notifier.notify(&Event::MoveBlocked {
            target,
            at: Utc::now(),
        });
        info!(workspace = target, "blocked window move");
        SwitchDecision::Revert {
            to: self.access.last_valid_workspace(),
        }
    }

    // ── ACL commands ─────────────────────────────────────────────────

    pub fn allow_workspace(&self, id: WorkspaceId) -> bool {
        let added = self.access.add_allowed_workspace(id);
        self.persist_state();
        added
    }

    pub fn disallow_workspace(&self, id: WorkspaceId) -> bool {
        let removed = self.access.remove_allowed_workspace(id);
        self.persist_state();
        removed
    }

    pub fn add_exception_class(&self, class: &str) -> bool {
        self.access.add_exception_class(class)
    }

    pub fn remove_exception_class(&self, class: &str) -> bool {
        self.access.remove_exception_class(class)
    }

    pub fn whitelist_app(&self, app: &str) -> bool {
        self.whitelist.add(app)
    }

    pub fn unwhitelist_app(&self, app: &str) -> bool {
        self.whitelist.remove(app)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn register_timer_callbacks(&self) {
        let mirror = StateMirror {
            timer: self.timer.handle(),
            access: Arc::clone(&self.access),
            flags: self.flags.clone(),
            sink: Arc::clone(&self.state_sink),
        };

        {
            let mirror = mirror.clone();
            let notifier = Arc::clone(&self.notifier);
            self.timer.set_on_work_start(move || {
                mirror.flags.set_break_time(false);
                mirror.persist();
                // The first interval is announced as SessionStarted.
                if mirror.timer.elapsed_seconds() > 0 {
                    notifier.notify(&Event::WorkStarted { at: Utc::now() });
                }
            });
        }
        {
            let mirror = mirror.clone();
            let notifier = Arc::clone(&self.notifier);
            self.timer.set_on_break_start(move || {
                mirror.flags.set_break_time(true);
                mirror.persist();
                notifier.notify(&Event::BreakStarted { at: Utc::now() });
            });
        }
        {
            let mirror = mirror.clone();
            let notifier = Arc::clone(&self.notifier);
            self.timer.set_on_session_complete(move || {
                mirror.flags.reset();
                mirror.sink.clear();
                notifier.notify(&Event::SessionCompleted {
                    elapsed_secs: mirror.timer.elapsed_seconds(),
                    at: Utc::now(),
                });
            });
        }
        {
            let notifier = Arc::clone(&self.notifier);
            self.timer.set_on_tick(move |remaining_minutes, state| {
                mirror.persist();
                notifier.notify(&Event::Tick {
                    remaining_minutes,
                    state,
                    at: Utc::now(),
                });
            });
        }
    }

    /// Stop the timer and tear the session down. Returns the elapsed time,
    /// or `None` if no session was active.
    fn end_session(&self) -> Option<u64> {
        let _guard = self.lock_lifecycle();
        if !self.flags.is_session_active() {
            return None;
        }
        let elapsed_secs = self.timer.elapsed_seconds();
        self.timer.stop();
        self.flags.reset();
        self.challenge.cancel();
        self.reverting.store(false, Ordering::SeqCst);
        self.state_sink.clear();
        self.notifier.notify(&Event::SessionStopped {
            elapsed_secs,
            at: Utc::now(),
        });
        info!(elapsed_secs, "focus session ended");
        Some(elapsed_secs)
    }

    fn persist_state(&self) {
        if !self.flags.is_session_active() {
            return;
        }
        self.state_sink.persist(&StateSnapshot::new(
            self.timer.state(),
            self.timer.remaining_seconds(),
            self.access.allowed_workspaces(),
        ));
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, ()> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FocusContext {
    fn drop(&mut self) {
        let was_active = self.flags.is_session_active();
        self.timer.stop();
        self.shaker.cancel();
        self.flags.reset();
        if was_active {
            self.state_sink.clear();
        }
    }
}

impl fmt::Debug for FocusContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusContext")
            .field("timer", &self.timer)
            .field("access", &self.access)
            .field("challenge", &self.challenge)
            .field("shaker", &self.shaker)
            .finish()
    }
}

/// What the timer callbacks need to mirror status into the state sink.
#[derive(Clone)]
struct StateMirror {
    timer: TimerHandle,
    access: Arc<AccessController>,
    flags: SessionFlags,
    sink: Arc<dyn StateSink>,
}

impl StateMirror {
    fn persist(&self) {
        if !self.flags.is_session_active() {
            return;
        }
        self.sink.persist(&StateSnapshot::new(
            self.timer.state(),
            self.timer.remaining_seconds(),
            self.access.allowed_workspaces(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::host::{MovableTarget, Position, WindowInfo};
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn kinds(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| !matches!(e, Event::Tick { .. }))
                .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
                .collect()
        }
    }

    impl Notifier for Recorder {
        fn notify(&self, event: &Event) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[derive(Default)]
    struct Sink {
        last: Mutex<Option<StateSnapshot>>,
        cleared: AtomicBool,
    }

    impl StateSink for Sink {
        fn persist(&self, snapshot: &StateSnapshot) {
            *self.last.lock().unwrap() = Some(snapshot.clone());
            self.cleared.store(false, Ordering::SeqCst);
        }
        fn clear(&self) {
            *self.last.lock().unwrap() = None;
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    struct Window {
        class: String,
        floating: bool,
        position: Mutex<Position>,
    }

    impl Window {
        fn focused(class: &str, floating: bool) -> FocusedWindow {
            FocusedWindow::new(Arc::new(Window {
                class: class.to_string(),
                floating,
                position: Mutex::new(Position::new(100.0, 100.0)),
            }))
        }
    }

    impl MovableTarget for Window {
        fn position(&self) -> Position {
            *self.position.lock().unwrap()
        }
        fn set_position(&self, position: Position) {
            *self.position.lock().unwrap() = position;
        }
    }

    impl WindowInfo for Window {
        fn class(&self) -> String {
            self.class.clone()
        }
        fn is_floating(&self) -> bool {
            self.floating
        }
        fn on_special_workspace(&self) -> bool {
            false
        }
    }

    struct Harness {
        ctx: FocusContext,
        clock: ManualClock,
        events: Arc<Recorder>,
        sink: Arc<Sink>,
    }

    fn harness() -> Harness {
        let clock = ManualClock::new();
        let timer = SessionTimer::with_clock(Arc::new(clock.clone()), Duration::from_millis(5));
        let shaker = ShakeAnimator::with_clock(Arc::new(clock.clone()));
        let events = Arc::new(Recorder::default());
        let sink = Arc::new(Sink::default());
        let ctx = FocusContext::with_components(
            timer,
            shaker,
            ChallengeEngine::new(),
            events.clone(),
            sink.clone(),
        );
        Harness {
            ctx,
            clock,
            events,
            sink,
        }
    }

    fn start(ctx: &FocusContext, workspaces: &[WorkspaceId], current: WorkspaceId) {
        let outcome = ctx.start_session(&StartRequest::new(workspaces.to_vec()), current);
        assert!(matches!(outcome, StartOutcome::Started { .. }));
    }

    #[test]
    fn start_defaults_to_current_workspace() {
        let h = harness();
        let outcome = h.ctx.start_session(&StartRequest::default(), 3);
        assert_eq!(
            outcome,
            StartOutcome::Started {
                workspaces: vec![3],
                plan: IntervalPlan::default()
            }
        );
        assert!(h.ctx.is_session_active());
        assert_eq!(h.ctx.timer().state(), TimerState::Working);
        assert_eq!(h.ctx.access().last_valid_workspace(), 3);

        let snapshot = h.sink.last.lock().unwrap().clone().unwrap();
        assert!(snapshot.active);
        assert_eq!(snapshot.remaining, "25:00");
        assert_eq!(snapshot.workspaces, vec![3]);

        assert_eq!(
            h.ctx.start_session(&StartRequest::new(vec![1]), 1),
            StartOutcome::AlreadyActive
        );
        assert_eq!(h.events.kinds(), vec!["session_started"]);
    }

    #[test]
    fn explicit_duration_uses_single_cycle_plan() {
        let h = harness();
        let request = StartRequest::new(vec![1, 2]).with_work_minutes(50);
        match h.ctx.start_session(&request, 1) {
            StartOutcome::Started { plan, .. } => {
                assert_eq!((plan.total_min, plan.work_min, plan.break_min), (60, 50, 10));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn stop_without_challenge_ends_session() {
        let h = harness();
        start(&h.ctx, &[1], 1);
        h.clock.advance(Duration::from_secs(90));

        assert_eq!(
            h.ctx.request_stop(false),
            StopOutcome::Stopped { elapsed_secs: 90 }
        );
        assert!(!h.ctx.is_session_active());
        assert_eq!(h.ctx.timer().state(), TimerState::Idle);
        assert!(h.sink.cleared.load(Ordering::SeqCst));
        assert_eq!(h.ctx.request_stop(false), StopOutcome::NotRunning);
        assert_eq!(h.ctx.status().to_string(), "No active focus session.");
    }

    #[test]
    fn phrase_challenge_gates_stop() {
        let h = harness();
        let mut config = Config::default();
        config.challenge.kind = ChallengeType::TypePhrase;
        h.ctx.configure(&config);
        start(&h.ctx, &[1], 1);

        let StopOutcome::ChallengeIssued { prompt } = h.ctx.request_stop(false) else {
            panic!("expected a challenge");
        };
        assert!(prompt.contains("I want to stop focusing"));
        assert!(matches!(
            h.ctx.request_stop(false),
            StopOutcome::ChallengePending { .. }
        ));

        assert_eq!(
            h.ctx.confirm("let me go"),
            ConfirmOutcome::Wrong {
                hint: "Hint: Type the exact phrase shown (case-insensitive)".into()
            }
        );
        assert!(h.ctx.is_session_active());

        assert!(matches!(
            h.ctx.confirm("i want to stop focusing"),
            ConfirmOutcome::Passed { .. }
        ));
        assert!(!h.ctx.is_session_active());
        assert_eq!(h.ctx.confirm("again"), ConfirmOutcome::NoChallenge);
    }

    #[test]
    fn countdown_reports_remaining_confirmations() {
        let h = harness();
        h.ctx.challenge().configure(ChallengeType::Countdown, "");
        start(&h.ctx, &[1], 1);
        h.ctx.request_stop(false);

        assert!(matches!(
            h.ctx.confirm("yes"),
            ConfirmOutcome::MoreConfirmations { remaining: 2, .. }
        ));
        assert!(matches!(h.ctx.confirm("nah"), ConfirmOutcome::Wrong { .. }));
        assert!(matches!(
            h.ctx.confirm("y"),
            ConfirmOutcome::MoreConfirmations { remaining: 1, .. }
        ));
        assert!(matches!(h.ctx.confirm("yes"), ConfirmOutcome::Passed { .. }));
    }

    #[test]
    fn force_stop_skips_challenge_and_cancel_keeps_session() {
        let h = harness();
        h.ctx.challenge().configure(ChallengeType::Countdown, "");
        start(&h.ctx, &[1], 1);

        h.ctx.request_stop(false);
        assert!(h.ctx.cancel_challenge());
        assert!(!h.ctx.cancel_challenge());
        assert!(h.ctx.is_session_active());

        assert!(matches!(
            h.ctx.request_stop(true),
            StopOutcome::Stopped { .. }
        ));
    }

    #[test]
    fn blocked_switch_reverts_and_guard_allows_the_revert() {
        let h = harness();
        start(&h.ctx, &[1, 2], 1);
        let window = Window::focused("kitty", false);

        assert_eq!(h.ctx.on_workspace_changed(2, Some(&window)), SwitchDecision::Allow);
        assert_eq!(h.ctx.access().last_valid_workspace(), 2);

        assert_eq!(
            h.ctx.on_workspace_changed(5, Some(&window)),
            SwitchDecision::Revert { to: 2 }
        );
        assert!(h.ctx.is_reverting());
        assert!(h.ctx.shaker().is_shaking());

        // The host's revert lands while the guard is up.
        assert_eq!(h.ctx.on_workspace_changed(2, Some(&window)), SwitchDecision::Allow);
        h.ctx.revert_finished();
        h.ctx.shaker().cancel();
        assert_eq!(window.target.position(), Position::new(100.0, 100.0));

        assert!(h.events.kinds().contains(&"switch_blocked".to_string()));
    }

    #[test]
    fn switches_are_free_without_session_and_on_break() {
        let h = harness();
        assert_eq!(h.ctx.on_workspace_changed(9, None), SwitchDecision::Allow);
        assert_eq!(h.ctx.access().last_valid_workspace(), 9);

        start(&h.ctx, &[1], 1);
        h.ctx.flags().set_break_time(true);
        assert_eq!(h.ctx.on_workspace_changed(7, None), SwitchDecision::Allow);
        assert_eq!(h.ctx.access().last_valid_workspace(), 7);
    }

    #[test]
    fn spawn_and_move_decisions() {
        let h = harness();
        start(&h.ctx, &[1], 1);
        h.ctx.whitelist_app("kitty");

        assert_eq!(h.ctx.on_spawn("kitty -e btop", None), SpawnDecision::Launch);
        assert_eq!(h.ctx.on_spawn("discord", None), SpawnDecision::Suppress);

        let tiled = Window::focused("firefox", false);
        let floating = Window::focused("mpv", true);
        assert_eq!(h.ctx.on_window_moved(&floating, 4), SwitchDecision::Allow);
        assert_eq!(
            h.ctx.on_window_moved(&tiled, 4),
            SwitchDecision::Revert { to: 1 }
        );
        h.ctx.shaker().cancel();

        assert!(h.ctx.add_exception_class("firefox"));
        assert_eq!(h.ctx.on_window_moved(&tiled, 4), SwitchDecision::Allow);

        let kinds = h.events.kinds();
        assert!(kinds.contains(&"spawn_blocked".to_string()));
        assert!(kinds.contains(&"move_blocked".to_string()));
    }

    #[test]
    fn pause_resume_and_status_line() {
        let h = harness();
        start(&h.ctx, &[1, 2], 1);
        h.clock.advance(Duration::from_secs(600));

        assert!(h.ctx.pause());
        assert!(!h.ctx.pause());
        h.clock.advance(Duration::from_secs(300));
        let status = h.ctx.status();
        assert_eq!(status.state, TimerState::Paused);
        assert_eq!(status.remaining_secs, 900);
        assert_eq!(
            status.to_string(),
            "Session: PAUSED | Remaining: 15:00 | Elapsed: 15:00 | Workspaces: 1, 2"
        );

        assert!(h.ctx.resume());
        assert!(!h.ctx.resume());
        assert_eq!(h.ctx.status().remaining_secs, 900);
    }

    #[test]
    fn completes_once_budget_is_spent() {
        let h = harness();
        let mut config = Config::default();
        config.timer.total_minutes = 1;
        config.timer.work_minutes = 1;
        h.ctx.configure(&config);
        start(&h.ctx, &[1], 1);

        assert!(!h.ctx.complete_if_due());
        h.clock.advance(Duration::from_secs(61));
        assert!(h.ctx.complete_if_due());

        assert!(!h.ctx.is_session_active());
        assert_eq!(h.ctx.timer().state(), TimerState::Completed);
        assert!(h.sink.cleared.load(Ordering::SeqCst));
        assert!(h.events.kinds().contains(&"session_completed".to_string()));
        assert!(!h.ctx.complete_if_due());
    }

    #[test]
    fn acl_commands_report_changes() {
        let h = harness();
        assert!(h.ctx.allow_workspace(4));
        assert!(!h.ctx.allow_workspace(4));
        assert!(h.ctx.disallow_workspace(4));
        assert!(!h.ctx.disallow_workspace(4));
        assert!(h.ctx.add_exception_class("pavucontrol"));
        assert!(h.ctx.remove_exception_class("pavucontrol"));
        assert!(h.ctx.whitelist_app("Firefox"));
        assert!(h.ctx.unwhitelist_app("firefox"));
        assert!(!h.ctx.unwhitelist_app("firefox"));
    }
}
