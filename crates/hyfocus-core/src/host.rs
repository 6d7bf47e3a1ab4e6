//! Interfaces the core expects from the host window manager.
//!
//! The core never reaches into compositor internals. Windows are seen only
//! through the narrow capabilities below, and the host keeps ownership of
//! everything behind them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::{Event, StateSnapshot};

/// Workspace identifier as reported by the host. Negative ids are
/// host-reserved special workspaces.
pub type WorkspaceId = i64;

/// Window position in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Something whose position the shake animation may read and write.
///
/// Implementations are responsible for their own synchronization; the
/// animator calls these from its own thread.
pub trait MovableTarget: Send + Sync {
    fn position(&self) -> Position;

    fn set_position(&self, position: Position);

    /// Ask the host to redraw the target after its final position is restored.
    fn damage(&self) {}
}

/// Properties used to decide whether a window is exempt from enforcement.
pub trait WindowInfo: Send + Sync {
    /// Initial window class, matched case-sensitively against exception classes.
    fn class(&self) -> String;

    fn is_floating(&self) -> bool;

    fn on_special_workspace(&self) -> bool;
}

/// Both views of one host window.
#[derive(Clone)]
pub struct FocusedWindow {
    pub target: Arc<dyn MovableTarget>,
    pub info: Arc<dyn WindowInfo>,
}

impl FocusedWindow {
    pub fn new<W>(window: Arc<W>) -> Self
    where
        W: MovableTarget + WindowInfo + 'static,
    {
        Self {
            target: window.clone(),
            info: window,
        }
    }
}

impl std::fmt::Debug for FocusedWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FocusedWindow")
            .field("class", &self.info.class())
            .field("position", &self.target.position())
            .finish()
    }
}

/// Receives every state change. Called from the timer thread as well as the
/// caller's thread; implementations must return quickly.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

/// Mirrors session status somewhere a widget can poll it.
pub trait StateSink: Send + Sync {
    fn persist(&self, snapshot: &StateSnapshot);

    fn clear(&self);
}

/// Notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: &Event) {}
}

/// State sink that keeps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStateSink;

impl StateSink for NullStateSink {
    fn persist(&self, _snapshot: &StateSnapshot) {}

    fn clear(&self) {}
}
