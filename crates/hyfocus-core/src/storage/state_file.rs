//! Session status mirror for bar widgets.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::runtime_dir;
use crate::events::StateSnapshot;
use crate::host::StateSink;

const STATE_FILE_NAME: &str = "hyfocus-state.json";

/// Writes the current [`StateSnapshot`] as JSON so widgets can poll it.
///
/// Write failures are logged and otherwise ignored; the session does not
/// depend on the file.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// `$XDG_RUNTIME_DIR/hyfocus-state.json`, or the same name in the temp dir.
    pub fn new() -> Self {
        Self::at(runtime_dir().join(STATE_FILE_NAME))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back the last persisted snapshot, if any.
    pub fn read(&self) -> Option<StateSnapshot> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSink for StateFile {
    fn persist(&self, snapshot: &StateSnapshot) {
        let json = match serde_json::to_string(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize state snapshot: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), "failed to write state file: {e}");
        }
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed state file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), "failed to remove state file: {e}"),
        }
    }
}
