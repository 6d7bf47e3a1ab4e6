use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Session-wide flags written by the session owner and its timer callbacks,
/// read by every enforcement decision.
///
/// Clones share the same flags.
#[derive(Debug, Clone, Default)]
pub struct SessionFlags {
    inner: Arc<Flags>,
}

#[derive(Debug, Default)]
struct Flags {
    session_active: AtomicBool,
    break_time: AtomicBool,
}

impl SessionFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_session_active(&self) -> bool {
        self.inner.session_active.load(Ordering::SeqCst)
    }

    pub fn is_break_time(&self) -> bool {
        self.inner.break_time.load(Ordering::SeqCst)
    }

    pub fn set_session_active(&self, active: bool) {
        self.inner.session_active.store(active, Ordering::SeqCst);
    }

    pub fn set_break_time(&self, on_break: bool) {
        self.inner.break_time.store(on_break, Ordering::SeqCst);
    }

    /// Clear both flags at session end.
    pub fn reset(&self) {
        self.set_session_active(false);
        self.set_break_time(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_state() {
        let flags = SessionFlags::new();
        let view = flags.clone();
        flags.set_session_active(true);
        flags.set_break_time(true);
        assert!(view.is_session_active());
        assert!(view.is_break_time());

        view.reset();
        assert!(!flags.is_session_active());
        assert!(!flags.is_break_time());
    }
}
