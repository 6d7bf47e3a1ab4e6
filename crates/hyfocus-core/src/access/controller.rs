//! Workspace access control.
//!
//! Decides, for every observed workspace change, whether the switch stands
//! or has to be reverted. Decisions read the allowed-workspace set, the
//! exception classes, the enforcement policy and the shared session flags;
//! they never mutate any of them.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::flags::SessionFlags;
use crate::host::{WindowInfo, WorkspaceId};

/// Workspace the revert path falls back to before any switch was recorded.
const DEFAULT_LAST_VALID_WORKSPACE: WorkspaceId = 1;

/// Static enforcement switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnforcementPolicy {
    /// Keep blocking during break intervals.
    pub enforce_during_break: bool,
    /// Floating windows are never subject to enforcement.
    pub floating_exempt: bool,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            enforce_during_break: false,
            floating_exempt: true,
        }
    }
}

/// Allowed workspaces, exception classes and the revert bookkeeping.
#[derive(Debug)]
pub struct AccessController {
    allowed: RwLock<HashSet<WorkspaceId>>,
    exception_classes: RwLock<HashSet<String>>,
    enforce_during_break: AtomicBool,
    floating_exempt: AtomicBool,
    last_valid: AtomicI64,
    flags: SessionFlags,
}

impl AccessController {
    pub fn new(flags: SessionFlags) -> Self {
        Self::with_policy(flags, EnforcementPolicy::default())
    }

    pub fn with_policy(flags: SessionFlags, policy: EnforcementPolicy) -> Self {
        Self {
            allowed: RwLock::new(HashSet::new()),
            exception_classes: RwLock::new(HashSet::new()),
            enforce_during_break: AtomicBool::new(policy.enforce_during_break),
            floating_exempt: AtomicBool::new(policy.floating_exempt),
            last_valid: AtomicI64::new(DEFAULT_LAST_VALID_WORKSPACE),
            flags,
        }
    }

    pub fn flags(&self) -> &SessionFlags {
        &self.flags
    }

    pub fn policy(&self) -> EnforcementPolicy {
        EnforcementPolicy {
            enforce_during_break: self.enforce_during_break.load(Ordering::SeqCst),
            floating_exempt: self.floating_exempt.load(Ordering::SeqCst),
        }
    }

    pub fn set_policy(&self, policy: EnforcementPolicy) {
        self.enforce_during_break
            .store(policy.enforce_during_break, Ordering::SeqCst);
        self.floating_exempt
            .store(policy.floating_exempt, Ordering::SeqCst);
    }

    // ── Allowed workspaces ───────────────────────────────────────────

    /// Replace the allowed set in one step; readers see either the old set
    /// or the new one.
    pub fn set_allowed_workspaces<I>(&self, ids: I)
    where
        I: IntoIterator<Item = WorkspaceId>,
    {
        let next: HashSet<WorkspaceId> = ids.into_iter().collect();
        let mut listed: Vec<_> = next.iter().copied().collect();
        listed.sort_unstable();
        *write(&self.allowed) = next;
        info!(workspaces = ?listed, "allowed workspaces set");
    }

    /// Returns false if the workspace was already allowed.
    pub fn add_allowed_workspace(&self, id: WorkspaceId) -> bool {
        let added = write(&self.allowed).insert(id);
        debug!(workspace = id, added, "added workspace to allowed list");
        added
    }

    /// Returns false if the workspace was not in the list.
    pub fn remove_allowed_workspace(&self, id: WorkspaceId) -> bool {
        let removed = write(&self.allowed).remove(&id);
        debug!(workspace = id, removed, "removed workspace from allowed list");
        removed
    }

    /// Allowed workspaces in ascending order.
    pub fn allowed_workspaces(&self) -> Vec<WorkspaceId> {
        let mut ids: Vec<_> = read(&self.allowed).iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Special workspaces (negative ids) are always allowed.
    pub fn is_workspace_allowed(&self, id: WorkspaceId) -> bool {
        id < 0 || read(&self.allowed).contains(&id)
    }

    // ── Exception classes ────────────────────────────────────────────

    pub fn add_exception_class(&self, class: &str) -> bool {
        let added = write(&self.exception_classes).insert(class.to_string());
        debug!(class, added, "added exception class");
        added
    }

    pub fn remove_exception_class(&self, class: &str) -> bool {
        let removed = write(&self.exception_classes).remove(class);
        debug!(class, removed, "removed exception class");
        removed
    }

    pub fn clear_exception_classes(&self) {
        write(&self.exception_classes).clear();
        debug!("cleared all exception classes");
    }

    pub fn exception_classes(&self) -> Vec<String> {
        let mut classes: Vec<_> = read(&self.exception_classes).iter().cloned().collect();
        classes.sort();
        classes
    }

    /// Case-sensitive class lookup.
    pub fn is_window_class_exempt(&self, class: &str) -> bool {
        read(&self.exception_classes).contains(class)
    }

    /// A missing window is exempt: there is nothing to enforce against.
    pub fn is_window_exempt(&self, window: Option<&dyn WindowInfo>) -> bool {
        let Some(window) = window else {
            return true;
        };

        let class = window.class();
        if self.is_window_class_exempt(&class) {
            debug!(class = %class, "window exempt by class");
            return true;
        }
        if self.floating_exempt.load(Ordering::SeqCst) && window.is_floating() {
            debug!(class = %class, "window exempt (floating)");
            return true;
        }
        if window.on_special_workspace() {
            debug!(class = %class, "window exempt (special workspace)");
            return true;
        }
        false
    }

    // ── Decision ─────────────────────────────────────────────────────

    /// Whether a switch to `target` must be blocked.
    ///
    /// Allowed when no session is active, when on a break without
    /// break enforcement, or when the target is an allowed workspace.
    pub fn should_block_switch(&self, target: WorkspaceId) -> bool {
        if !self.flags.is_session_active() {
            return false;
        }
        if self.flags.is_break_time() && !self.enforce_during_break.load(Ordering::SeqCst) {
            return false;
        }
        if self.is_workspace_allowed(target) {
            return false;
        }
        info!(workspace = target, "blocked switch (not in allowed list)");
        true
    }

    /// True when enforcement is currently in effect at all.
    pub fn is_enforcing(&self) -> bool {
        self.flags.is_session_active()
            && (!self.flags.is_break_time() || self.enforce_during_break.load(Ordering::SeqCst))
    }

    // ── Revert bookkeeping ───────────────────────────────────────────

    pub fn last_valid_workspace(&self) -> WorkspaceId {
        self.last_valid.load(Ordering::SeqCst)
    }

    pub fn set_last_valid_workspace(&self, id: WorkspaceId) {
        self.last_valid.store(id, Ordering::SeqCst);
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Window {
        class: &'static str,
        floating: bool,
        special: bool,
    }

    impl WindowInfo for Window {
        fn class(&self) -> String {
            self.class.to_string()
        }
        fn is_floating(&self) -> bool {
            self.floating
        }
        fn on_special_workspace(&self) -> bool {
            self.special
        }
    }

    fn active_controller(policy: EnforcementPolicy) -> AccessController {
        let flags = SessionFlags::new();
        flags.set_session_active(true);
        AccessController::with_policy(flags, policy)
    }

    #[test]
    fn special_workspaces_are_always_allowed() {
        let acl = AccessController::new(SessionFlags::new());
        assert!(acl.is_workspace_allowed(-98));
        assert!(!acl.is_workspace_allowed(3));
    }

    #[test]
    fn set_replaces_and_deduplicates() {
        let acl = AccessController::new(SessionFlags::new());
        acl.set_allowed_workspaces([1, 2, 2, 3]);
        assert_eq!(acl.allowed_workspaces(), vec![1, 2, 3]);

        acl.set_allowed_workspaces([5]);
        assert_eq!(acl.allowed_workspaces(), vec![5]);
        assert!(!acl.add_allowed_workspace(5));
        assert!(acl.add_allowed_workspace(6));
        assert!(acl.remove_allowed_workspace(5));
        assert!(!acl.remove_allowed_workspace(5));
        assert_eq!(acl.allowed_workspaces(), vec![6]);
    }

    #[test]
    fn no_block_without_session() {
        let acl = AccessController::new(SessionFlags::new());
        acl.set_allowed_workspaces([1]);
        assert!(!acl.should_block_switch(7));
    }

    #[test]
    fn blocks_disallowed_workspace_during_work() {
        let acl = active_controller(EnforcementPolicy::default());
        acl.set_allowed_workspaces([1, 2]);
        assert!(!acl.should_block_switch(2));
        assert!(!acl.should_block_switch(-1));
        assert!(acl.should_block_switch(3));
    }

    #[test]
    fn break_policy_controls_enforcement() {
        let acl = active_controller(EnforcementPolicy::default());
        acl.set_allowed_workspaces([1]);
        acl.flags().set_break_time(true);
        assert!(!acl.should_block_switch(9));
        assert!(!acl.is_enforcing());

        acl.set_policy(EnforcementPolicy {
            enforce_during_break: true,
            floating_exempt: true,
        });
        assert!(acl.should_block_switch(9));
        assert!(acl.is_enforcing());
    }

    #[test]
    fn window_exemptions() {
        let acl = AccessController::new(SessionFlags::new());
        acl.add_exception_class("pavucontrol");

        assert!(acl.is_window_exempt(None));
        let by_class = Window { class: "pavucontrol", floating: false, special: false };
        assert!(acl.is_window_exempt(Some(&by_class)));
        let wrong_case = Window { class: "Pavucontrol", floating: false, special: false };
        assert!(!acl.is_window_exempt(Some(&wrong_case)));
        let floating = Window { class: "kitty", floating: true, special: false };
        assert!(acl.is_window_exempt(Some(&floating)));
        let special = Window { class: "kitty", floating: false, special: true };
        assert!(acl.is_window_exempt(Some(&special)));
        let tiled = Window { class: "kitty", floating: false, special: false };
        assert!(!acl.is_window_exempt(Some(&tiled)));

        acl.set_policy(EnforcementPolicy {
            enforce_during_break: false,
            floating_exempt: false,
        });
        assert!(!acl.is_window_exempt(Some(&floating)));
    }

    #[test]
    fn last_valid_defaults_to_first_workspace() {
        let acl = AccessController::new(SessionFlags::new());
        assert_eq!(acl.last_valid_workspace(), 1);
        acl.set_last_valid_workspace(4);
        assert_eq!(acl.last_valid_workspace(), 4);
    }

    proptest! {
        #[test]
        fn allowed_iff_special_or_member(
            set in proptest::collection::vec(1i64..50, 0..10),
            w in -10i64..60,
        ) {
            let acl = AccessController::new(SessionFlags::new());
            acl.set_allowed_workspaces(set.clone());
            prop_assert_eq!(acl.is_workspace_allowed(w), w < 0 || set.contains(&w));
        }

        #[test]
        fn never_blocks_without_session(
            set in proptest::collection::vec(1i64..50, 0..10),
            w in -10i64..60,
        ) {
            let acl = AccessController::new(SessionFlags::new());
            acl.set_allowed_workspaces(set);
            prop_assert!(!acl.should_block_switch(w));
        }

        #[test]
        fn never_blocks_on_lenient_break(
            set in proptest::collection::vec(1i64..50, 0..10),
            w in -10i64..60,
        ) {
            let acl = active_controller(EnforcementPolicy::default());
            acl.flags().set_break_time(true);
            acl.set_allowed_workspaces(set);
            prop_assert!(!acl.should_block_switch(w));
        }
    }
}
