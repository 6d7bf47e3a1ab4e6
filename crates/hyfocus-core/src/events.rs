use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::host::WorkspaceId;
use crate::timer::TimerState;

/// Every state change in a focus session produces an Event.
/// Hosts forward them to notifications, widgets or logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionStarted {
        workspaces: Vec<WorkspaceId>,
        work_minutes: u64,
        break_minutes: u64,
        at: DateTime<Utc>,
    },
    WorkStarted {
        at: DateTime<Utc>,
    },
    BreakStarted {
        at: DateTime<Utc>,
    },
    Tick {
        remaining_minutes: u64,
        state: TimerState,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionStopped {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    /// The session used up its total budget.
    SessionCompleted {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SwitchBlocked {
        target: WorkspaceId,
        revert_to: WorkspaceId,
        at: DateTime<Utc>,
    },
    MoveBlocked {
        target: WorkspaceId,
        at: DateTime<Utc>,
    },
    SpawnBlocked {
        command: String,
        at: DateTime<Utc>,
    },
    ChallengeIssued {
        prompt: String,
        at: DateTime<Utc>,
    },
    ChallengeFailed {
        hint: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short human-readable message for notification popups.
    pub fn message(&self) -> String {
        match self {
            Event::SessionStarted {
                workspaces,
                work_minutes,
                break_minutes,
                ..
            } => format!(
                "Focus session started: {work_minutes} min work, {break_minutes} min break. Allowed workspaces: {}",
                join_ids(workspaces)
            ),
            Event::WorkStarted { .. } => "Back to work! Stay focused.".to_string(),
            Event::BreakStarted { .. } => "Break time! Take a rest.".to_string(),
            Event::Tick {
                remaining_minutes,
                state,
                ..
            } => format!("{state}: {remaining_minutes} min left"),
            Event::SessionPaused { remaining_secs, .. } => {
                format!("Session paused ({} remaining)", format_mmss(*remaining_secs))
            }
            Event::SessionResumed { .. } => "Session resumed".to_string(),
            Event::SessionStopped { elapsed_secs, .. } => {
                format!("Focus session ended after {}", format_mmss(*elapsed_secs))
            }
            Event::SessionCompleted { elapsed_secs, .. } => {
                format!("Focus session complete! ({})", format_mmss(*elapsed_secs))
            }
            Event::SwitchBlocked { target, .. } => {
                format!("Focus mode: Workspace {target} is restricted!")
            }
            Event::MoveBlocked { target, .. } => {
                format!("Focus mode: Moving windows to workspace {target} is restricted!")
            }
            Event::SpawnBlocked { .. } => "Focus mode: App launching is blocked!".to_string(),
            Event::ChallengeIssued { prompt, .. } => prompt.clone(),
            Event::ChallengeFailed { hint, .. } => format!("Wrong answer! {hint}"),
        }
    }
}

/// Status payload polled by bar widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub active: bool,
    pub state: TimerState,
    /// Remaining time in the current interval as `MM:SS`.
    pub remaining: String,
    pub workspaces: Vec<WorkspaceId>,
}

impl StateSnapshot {
    pub fn new(state: TimerState, remaining_secs: u64, workspaces: Vec<WorkspaceId>) -> Self {
        Self {
            active: state != TimerState::Idle && state != TimerState::Completed,
            state,
            remaining: format_mmss(remaining_secs),
            workspaces,
        }
    }
}

/// Format seconds as `MM:SS`; minutes are not wrapped at 60.
pub fn format_mmss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

fn join_ids(ids: &[WorkspaceId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
