use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which half of the work/break cycle an interval belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalKind {
    Work,
    Break,
}

/// Durations driving a focus session.
///
/// All values are stored in whole minutes; `total` is the session budget,
/// `work` and `break_` the lengths of the alternating intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalPlan {
    pub total_min: u64,
    pub work_min: u64,
    pub break_min: u64,
}

impl IntervalPlan {
    /// Build a plan from untrusted minute counts.
    ///
    /// work is clamped to at least one minute, break to zero, and total to
    /// at least one work interval.
    pub fn new(total_minutes: i64, work_minutes: i64, break_minutes: i64) -> Self {
        let work = work_minutes.max(1);
        Self {
            total_min: total_minutes.max(work) as u64,
            work_min: work as u64,
            break_min: break_minutes.max(0) as u64,
        }
    }

    /// A single work/break cycle for an explicitly requested work length.
    ///
    /// The break is a fifth of the work interval (at least one minute) and
    /// the budget covers exactly one cycle.
    pub fn pomodoro(work_minutes: i64) -> Self {
        let work = work_minutes.max(1);
        let brk = (work / 5).max(1);
        Self::new(work.saturating_add(brk), work, brk)
    }

    pub fn total(&self) -> Duration {
        minutes(self.total_min)
    }

    pub fn work(&self) -> Duration {
        minutes(self.work_min)
    }

    pub fn break_interval(&self) -> Duration {
        minutes(self.break_min)
    }

    pub fn interval(&self, kind: IntervalKind) -> Duration {
        match kind {
            IntervalKind::Work => self.work(),
            IntervalKind::Break => self.break_interval(),
        }
    }
}

impl Default for IntervalPlan {
    fn default() -> Self {
        Self {
            total_min: 120,
            work_min: 25,
            break_min: 5,
        }
    }
}

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}
