//! Shake feedback for blocked actions.
//!
//! The animation moves a target horizontally along a decaying sinusoid:
//!
//! ```text
//! offset(t) = intensity * sin(2π * t / period) * (1 - t / duration)
//! ```
//!
//! It runs on its own short-lived thread so the caller deciding to block an
//! action never waits on it. Only one animation runs at a time; triggers
//! arriving while one is in flight are dropped. Whatever way the animation
//! ends, the target goes back to the position it had when the shake began.
//! The animator never keeps the target alive: if the host drops it
//! mid-shake, the animation just ends.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::clock::{Clock, SystemClock};
use crate::host::{MovableTarget, Position};

/// Delay between animation frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

const MIN_INTENSITY_PX: i64 = 1;
const MIN_DURATION_MS: i64 = 50;
const MIN_PERIOD_MS: i64 = 10;

/// Amplitude and timing of the shake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShakeSettings {
    pub intensity_px: u32,
    pub duration_ms: u64,
    pub period_ms: u64,
}

impl ShakeSettings {
    /// Clamp to at least 1px, 50ms and 10ms.
    pub fn new(intensity_px: i64, duration_ms: i64, period_ms: i64) -> Self {
        Self {
            intensity_px: intensity_px.clamp(MIN_INTENSITY_PX, i64::from(u32::MAX)) as u32,
            duration_ms: duration_ms.max(MIN_DURATION_MS) as u64,
            period_ms: period_ms.max(MIN_PERIOD_MS) as u64,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Horizontal offset `elapsed` into the animation; zero once it is over.
    pub fn offset_at(&self, elapsed: Duration) -> f64 {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let total = self.duration_ms as f64;
        if elapsed_ms >= total {
            return 0.0;
        }
        let decay = 1.0 - elapsed_ms / total;
        let phase = 2.0 * PI * elapsed_ms / self.period_ms as f64;
        f64::from(self.intensity_px) * phase.sin() * decay
    }
}

impl Default for ShakeSettings {
    fn default() -> Self {
        Self {
            intensity_px: 15,
            duration_ms: 300,
            period_ms: 50,
        }
    }
}

struct Shared {
    cancel: Mutex<bool>,
    wake: Condvar,
    shaking: AtomicBool,
}

/// Runs at most one shake animation at a time.
pub struct ShakeAnimator {
    settings: Mutex<ShakeSettings>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    clock: Arc<dyn Clock>,
}

impl ShakeAnimator {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            settings: Mutex::new(ShakeSettings::default()),
            shared: Arc::new(Shared {
                cancel: Mutex::new(false),
                wake: Condvar::new(),
                shaking: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
            clock,
        }
    }

    pub fn configure(&self, intensity_px: i64, duration_ms: i64, period_ms: i64) {
        let settings = ShakeSettings::new(intensity_px, duration_ms, period_ms);
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings;
        debug!(
            intensity_px = settings.intensity_px,
            duration_ms = settings.duration_ms,
            period_ms = settings.period_ms,
            "shake configured"
        );
    }

    pub fn settings(&self) -> ShakeSettings {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shaking(&self) -> bool {
        self.shared.shaking.load(Ordering::SeqCst)
    }

    /// Start shaking `target` unless an animation is already running.
    ///
    /// Returns immediately; true if a new animation was started. Only a weak
    /// handle to `target` outlives this call.
    pub fn trigger(&self, target: Arc<dyn MovableTarget>) -> bool {
        if self.shared.shaking.swap(true, Ordering::SeqCst) {
            debug!("shake already in progress, ignoring");
            return false;
        }

        let mut worker = self.lock_worker();
        if let Some(previous) = worker.take() {
            join(previous);
        }
        *self.lock_cancel() = false;

        let original = target.position();
        let target = Arc::downgrade(&target);
        let settings = self.settings();
        let shared = Arc::clone(&self.shared);
        let clock = Arc::clone(&self.clock);
        let spawned = std::thread::Builder::new()
            .name("hyfocus-shake".into())
            .spawn(move || {
                let restore = Restore {
                    target,
                    original,
                    shared,
                };
                animate(&restore, settings, clock.as_ref());
            });

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                debug!("started shake animation");
                true
            }
            Err(e) => {
                error!("failed to spawn shake thread: {e}");
                self.shared.shaking.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    /// Stop a running animation and wait until its target is restored.
    /// Does nothing when idle.
    pub fn cancel(&self) {
        let mut worker = self.lock_worker();
        *self.lock_cancel() = true;
        self.shared.wake.notify_all();
        if let Some(handle) = worker.take() {
            join(handle);
        }
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cancel(&self) -> MutexGuard<'_, bool> {
        self.shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ShakeAnimator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ShakeAnimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for ShakeAnimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShakeAnimator")
            .field("settings", &self.settings())
            .field("shaking", &self.is_shaking())
            .finish()
    }
}

/// Puts the target back where it started when the animation thread is done,
/// including when a host callback panics mid-frame.
struct Restore {
    target: Weak<dyn MovableTarget>,
    original: Position,
    shared: Arc<Shared>,
}

impl Drop for Restore {
    fn drop(&mut self) {
        match self.target.upgrade() {
            Some(target) => {
                target.set_position(self.original);
                target.damage();
                debug!("shake animation completed");
            }
            None => debug!("shake target went away"),
        }
        self.shared.shaking.store(false, Ordering::SeqCst);
    }
}

fn animate(restore: &Restore, settings: ShakeSettings, clock: &dyn Clock) {
    let start = clock.now();
    let duration = settings.duration();
    loop {
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= duration {
            break;
        }

        let Some(target) = restore.target.upgrade() else {
            break;
        };
        let offset = settings.offset_at(elapsed);
        target.set_position(Position {
            x: restore.original.x + offset,
            y: restore.original.y,
        });
        drop(target);

        let cancel = restore
            .shared
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let (cancel, _) = restore
            .shared
            .wake
            .wait_timeout_while(cancel, FRAME_INTERVAL, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if *cancel {
            break;
        }
    }
}

fn join(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("shake thread panicked");
    }
}
