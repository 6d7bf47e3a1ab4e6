//! A stand-in for the compositor: one focused window on a numbered
//! workspace, and notifications printed to stderr.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use hyfocus_core::{
    Event, FocusedWindow, MovableTarget, Notifier, Position, WindowInfo, WorkspaceId,
};

#[derive(Debug)]
pub struct SimWindow {
    class: Mutex<String>,
    floating: AtomicBool,
    position: Mutex<Position>,
}

impl SimWindow {
    fn new(class: &str) -> Self {
        Self {
            class: Mutex::new(class.to_string()),
            floating: AtomicBool::new(false),
            position: Mutex::new(Position::new(0.0, 0.0)),
        }
    }
}

impl MovableTarget for SimWindow {
    fn position(&self) -> Position {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_position(&self, position: Position) {
        *self.position.lock().unwrap_or_else(PoisonError::into_inner) = position;
    }
}

impl WindowInfo for SimWindow {
    fn class(&self) -> String {
        self.class
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn is_floating(&self) -> bool {
        self.floating.load(Ordering::SeqCst)
    }

    fn on_special_workspace(&self) -> bool {
        false
    }
}

#[derive(Debug)]
pub struct Desktop {
    pub current: WorkspaceId,
    window: Arc<SimWindow>,
}

impl Desktop {
    pub fn new(workspace: WorkspaceId) -> Self {
        Self {
            current: workspace,
            window: Arc::new(SimWindow::new("terminal")),
        }
    }

    pub fn focused(&self) -> FocusedWindow {
        FocusedWindow::new(Arc::clone(&self.window))
    }

    /// Replace the focused window's class and floating flag.
    pub fn focus(&self, class: &str, floating: bool) {
        *self
            .window
            .class
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = class.to_string();
        self.window.floating.store(floating, Ordering::SeqCst);
    }

    pub fn window_position(&self) -> Position {
        self.window.position()
    }
}

/// Prints every event except ticks as `[hyfocus] <message>` on stderr.
#[derive(Debug, Default)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, event: &Event) {
        if matches!(event, Event::Tick { .. }) {
            return;
        }
        eprintln!("[hyfocus] {}", event.message());
    }
}
