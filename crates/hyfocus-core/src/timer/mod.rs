mod engine;
mod plan;

pub use engine::{
    Callback, SessionTimer, TickCallback, TimerHandle, TimerState, DEFAULT_TICK_INTERVAL,
};
pub use plan::{IntervalKind, IntervalPlan};
