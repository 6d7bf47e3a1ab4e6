//! Application launch whitelist.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::controller::AccessController;

/// How whitelist entries are compared with a launch command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Entry appears anywhere in the command ("firefox" allows
    /// "firefox --new-window", but "code" also allows "codecompile").
    #[default]
    Substring,
    /// Entry equals the basename of the command's program.
    Token,
}

/// Case-insensitive set of applications that may launch during a session.
#[derive(Debug)]
pub struct SpawnWhitelist {
    entries: RwLock<BTreeSet<String>>,
    mode: RwLock<MatchMode>,
    block_spawn: AtomicBool,
}

impl SpawnWhitelist {
    pub fn new(mode: MatchMode, block_spawn: bool) -> Self {
        Self {
            entries: RwLock::new(BTreeSet::new()),
            mode: RwLock::new(mode),
            block_spawn: AtomicBool::new(block_spawn),
        }
    }

    pub fn mode(&self) -> MatchMode {
        *self.mode.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_mode(&self, mode: MatchMode) {
        *self.mode.write().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn block_spawn(&self) -> bool {
        self.block_spawn.load(Ordering::SeqCst)
    }

    pub fn set_block_spawn(&self, block: bool) {
        self.block_spawn.store(block, Ordering::SeqCst);
    }

    /// Returns false for blank names and names already present.
    pub fn add(&self, app: &str) -> bool {
        let app = app.trim().to_lowercase();
        if app.is_empty() {
            return false;
        }
        let added = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.clone());
        debug!(app = %app, added, "added app to spawn whitelist");
        added
    }

    pub fn remove(&self, app: &str) -> bool {
        let app = app.trim().to_lowercase();
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&app);
        debug!(app = %app, removed, "removed app from spawn whitelist");
        removed
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn contains(&self, app: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&app.trim().to_lowercase())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Whether `command` matches any whitelist entry under the current mode.
    pub fn is_allowed(&self, command: &str) -> bool {
        let command = command.to_lowercase();
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        match self.mode() {
            MatchMode::Substring => entries.iter().any(|entry| command.contains(entry.as_str())),
            MatchMode::Token => {
                program_name(&command).is_some_and(|program| entries.contains(program))
            }
        }
    }

    /// Whether launching `command` must be suppressed right now.
    ///
    /// Launches go through when enforcement is not in effect, when spawn
    /// blocking is off, when the program is an exception class, or when the
    /// command is whitelisted.
    pub fn should_block_spawn(&self, command: &str, access: &AccessController) -> bool {
        if !access.is_enforcing() || !self.block_spawn() {
            return false;
        }
        if program_name(command).is_some_and(|program| access.is_window_class_exempt(program)) {
            debug!(command, "spawn allowed (exception class)");
            return false;
        }
        if self.is_allowed(command) {
            debug!(command, "spawn allowed (whitelisted)");
            return false;
        }
        info!(command, "blocked spawn");
        true
    }
}

impl Default for SpawnWhitelist {
    fn default() -> Self {
        Self::new(MatchMode::default(), true)
    }
}

/// Basename of the first token of a shell command.
pub fn program_name(command: &str) -> Option<&str> {
    let first = command.split_whitespace().next()?;
    first.rsplit('/').next().filter(|name| !name.is_empty())
}
