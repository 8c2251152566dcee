//! Quiet-window coalescing of raw notifications.
//!
//! Each relative path is either idle or pending. The first notification for
//! an idle path opens a quiet window and arms one timer; notifications that
//! arrive while the window is open are absorbed. When the timer fires the
//! path goes back to idle and the callback runs once, unless the file no
//! longer exists.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, WatcherError};
use crate::event::{FileEvent, FileEventKind};

/// Callback invoked once per closed quiet window.
///
/// Runs on the tokio runtime, concurrently with the rest of the program, and
/// may run once more after the owning watcher was stopped.
pub type ChangeCallback = Arc<dyn Fn(FileEvent) + Send + Sync>;

/// Per-path debounce state shared by every subscription of one watcher.
pub struct DebounceTable {
    root: PathBuf,
    quiet_window: Duration,
    /// Paths with an open window, and when it opened.
    pending: Mutex<HashMap<PathBuf, (Instant, FileEventKind)>>,
    on_change: ChangeCallback,
    runtime: Handle,
}

impl DebounceTable {
    /// Create a table arming its timers on the current tokio runtime.
    pub fn new(
        root: impl Into<PathBuf>,
        quiet_window: Duration,
        on_change: ChangeCallback,
    ) -> Result<Arc<Self>> {
        let runtime = Handle::try_current().map_err(|_| WatcherError::NoRuntime)?;

        Ok(Arc::new(Self {
            root: root.into(),
            quiet_window,
            pending: Mutex::new(HashMap::new()),
            on_change,
            runtime,
        }))
    }

    /// Record a raw notification for `relative`.
    ///
    /// Returns `true` if this opened a new quiet window, `false` if it was
    /// absorbed into one already open. Safe to call from any thread.
    pub fn record(self: &Arc<Self>, relative: &Path, kind: FileEventKind) -> bool {
        {
            let mut pending = self.lock_pending();
            if pending.contains_key(relative) {
                return false;
            }
            pending.insert(relative.to_path_buf(), (Instant::now(), kind));
        }

        let table = Arc::clone(self);
        let relative = relative.to_path_buf();
        self.runtime.spawn(async move {
            tokio::time::sleep(table.quiet_window).await;
            table.close_window(&relative);
        });

        true
    }

    /// Number of paths with an open window.
    pub fn pending(&self) -> usize {
        self.lock_pending().len()
    }

    fn close_window(&self, relative: &Path) {
        let Some((opened, kind)) = self.lock_pending().remove(relative) else {
            return;
        };

        let path = self.root.join(relative);
        if !path.exists() {
            debug!("Dropping change for vanished file: {}", path.display());
            return;
        }

        debug!(
            "Change settled for {} after {:?}",
            relative.display(),
            opened.elapsed()
        );
        (self.on_change)(FileEvent::new(kind, &self.root, relative));
    }

    fn lock_pending(&self) -> MutexGuard<'_, HashMap<PathBuf, (Instant, FileEventKind)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
