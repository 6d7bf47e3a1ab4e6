//! # hyfocus Core Library
//!
//! Core logic of hyfocus, a focus-session enforcer for tiling desktops.
//! A session alternates work and break intervals; while it runs, switches to
//! workspaces outside the allowed set are reverted, non-whitelisted app
//! launches are suppressed and the focused window shakes as feedback.
//!
//! ## Architecture
//!
//! - **Timer**: a work/break state machine on its own thread that reports
//!   transitions through callbacks
//! - **Access**: allowed workspaces, exception classes and the app whitelist
//! - **Feedback**: a cancellable shake animation on its own short-lived thread
//! - **Challenge**: phrase, math or countdown friction before an early stop
//! - **Storage**: TOML configuration and the widget state file
//!
//! ## Key Components
//!
//! - [`FocusContext`]: owns the components and turns host events into decisions
//! - [`SessionTimer`]: interval timer
//! - [`AccessController`]: workspace access decisions
//! - [`Config`]: configuration management

pub mod access;
pub mod challenge;
pub mod clock;
pub mod command;
pub mod error;
pub mod events;
pub mod host;
pub mod session;
pub mod shake;
pub mod storage;
pub mod timer;

pub use access::{AccessController, EnforcementPolicy, MatchMode, SessionFlags, SpawnWhitelist};
pub use challenge::{ChallengeEngine, ChallengeType, NumberSource, RandomSource};
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{parse_start_args, parse_workspace_list, StartRequest};
pub use error::{ConfigError, CoreError, Result, ValidationError};
pub use events::{Event, StateSnapshot};
pub use host::{FocusedWindow, MovableTarget, Notifier, Position, StateSink, WindowInfo, WorkspaceId};
pub use session::{
    ConfirmOutcome, FocusContext, SessionStatus, SpawnDecision, StartOutcome, StopOutcome,
    SwitchDecision,
};
pub use shake::{ShakeAnimator, ShakeSettings};
pub use storage::{Config, StateFile};
pub use timer::{IntervalKind, IntervalPlan, SessionTimer, TimerState};
