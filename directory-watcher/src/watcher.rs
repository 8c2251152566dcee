//! Debounced watcher over a file or a directory's files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::DebounceConfig;
use crate::debounce::{ChangeCallback, DebounceTable};
use crate::error::{Result, WatcherError};
use crate::event::{FileEvent, FileEventKind};

/// One OS watch over a single file.
pub struct WatchSubscription {
    /// Watched file, relative to the watcher root.
    relative_path: PathBuf,
}

impl WatchSubscription {
    /// Add a non-recursive watch on `relative` to `watcher`.
    fn open(watcher: &mut RecommendedWatcher, root: &Path, relative: &Path) -> Result<Self> {
        let target = root.join(relative);
        if !target.exists() {
            return Err(WatcherError::WatchUnavailable(target));
        }

        watcher.watch(&target, RecursiveMode::NonRecursive)?;
        debug!("Started watching: {}", target.display());

        Ok(Self {
            relative_path: relative.to_path_buf(),
        })
    }

    /// Watched file, relative to the watcher root.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    fn close(self, watcher: &mut RecommendedWatcher, root: &Path) {
        let target = root.join(&self.relative_path);
        if let Err(e) = watcher.unwatch(&target) {
            debug!("Unwatch of {} failed: {e}", target.display());
        }
    }
}

/// Debounced change notifications for one file or directory.
///
/// A directory is expanded into one subscription per file that exists when
/// the debouncer is created. Files added to the directory later are not
/// watched until a new debouncer is created. Every subscription shares one
/// OS watcher handle.
pub struct Debouncer {
    config: DebounceConfig,
    table: Arc<DebounceTable>,
    watcher: RecommendedWatcher,
    subscriptions: Vec<WatchSubscription>,
}

impl Debouncer {
    /// Start watching. Must be called inside a tokio runtime.
    ///
    /// A missing target is logged and leaves the debouncer with no
    /// subscriptions; it is not an error.
    pub fn new<F>(config: DebounceConfig, on_change: F) -> Result<Self>
    where
        F: Fn(FileEvent) + Send + Sync + 'static,
    {
        let on_change: ChangeCallback = Arc::new(on_change);
        let table = DebounceTable::new(&config.root, config.quiet_window(), on_change)?;
        let watcher = Self::os_watcher(&config.root, &table)?;

        let mut debouncer = Self {
            config,
            table,
            watcher,
            subscriptions: Vec::new(),
        };
        debouncer.subscribe_all();

        info!(
            "Watching {} ({} file(s), quiet window {:?})",
            debouncer.config.target().display(),
            debouncer.subscriptions.len(),
            debouncer.config.quiet_window()
        );
        Ok(debouncer)
    }

    /// The shared OS watcher, feeding every notified path into `table`.
    fn os_watcher(root: &Path, table: &Arc<DebounceTable>) -> Result<RecommendedWatcher> {
        let table = Arc::clone(table);
        let root = root.to_path_buf();
        // Some backends report canonical paths.
        let canonical_root = root.canonicalize().ok();

        let watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    let kind = FileEventKind::from(event.kind);
                    if kind.is_noise() {
                        return;
                    }
                    for path in &event.paths {
                        let relative = path.strip_prefix(&root).ok().or_else(|| {
                            canonical_root
                                .as_deref()
                                .and_then(|canonical| path.strip_prefix(canonical).ok())
                        });
                        match relative {
                            Some(relative) => {
                                table.record(relative, kind);
                            }
                            None => debug!("Ignoring event outside root: {}", path.display()),
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error under {}: {e}", root.display());
                }
            },
        )?;
        Ok(watcher)
    }

    fn subscribe_all(&mut self) {
        let target = self.config.target();
        if !target.exists() {
            warn!("{}", WatcherError::WatchUnavailable(target));
            return;
        }

        let files: Vec<PathBuf> = if target.is_dir() {
            WalkDir::new(&target)
                .follow_links(false)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    self.config
                        .relativize(entry.path())
                        .map(Path::to_path_buf)
                })
                .collect()
        } else {
            vec![self.config.relative_path.clone()]
        };

        for relative in files {
            match WatchSubscription::open(&mut self.watcher, &self.config.root, &relative) {
                Ok(subscription) => self.subscriptions.push(subscription),
                Err(e) => warn!("Not watching {}: {e}", relative.display()),
            }
        }
    }

    /// Feed a raw notification as if it came from the OS.
    ///
    /// Lets hosts with their own notification source share the debounce
    /// table. Returns `true` if it opened a new quiet window.
    pub fn notify(&self, relative: &Path, kind: FileEventKind) -> bool {
        if kind.is_noise() {
            return false;
        }
        self.table.record(relative, kind)
    }

    /// Relative paths currently subscribed.
    pub fn watched(&self) -> Vec<&Path> {
        self.subscriptions
            .iter()
            .map(WatchSubscription::relative_path)
            .collect()
    }

    /// Whether any subscription is open.
    pub fn is_running(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Close every watch.
    ///
    /// A quiet window already open may still fire its callback once after
    /// this returns.
    pub fn stop(&mut self) {
        for subscription in std::mem::take(&mut self.subscriptions) {
            subscription.close(&mut self.watcher, &self.config.root);
        }
        info!("Stopped watching {}", self.config.target().display());
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(FileEvent) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        (count, move |_event: FileEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test]
    async fn test_directory_expands_to_existing_files() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("styles/partials")).unwrap();
        std::fs::write(temp.path().join("styles/a.scss"), "").unwrap();
        std::fs::write(temp.path().join("styles/partials/_b.scss"), "").unwrap();

        let (_count, on_change) = counter();
        let mut debouncer =
            Debouncer::new(DebounceConfig::new(temp.path(), "styles"), on_change).unwrap();

        let mut watched = debouncer.watched();
        watched.sort();
        assert_eq!(
            watched,
            vec![
                Path::new("styles/a.scss"),
                Path::new("styles/partials/_b.scss")
            ]
        );

        debouncer.stop();
        assert!(!debouncer.is_running());
    }

    #[tokio::test]
    async fn test_large_directory_is_fully_watched() {
        let temp = TempDir::new().unwrap();
        for i in 0..200 {
            std::fs::write(temp.path().join(format!("page-{i}.html")), "").unwrap();
        }

        let (_count, on_change) = counter();
        let debouncer = Debouncer::new(DebounceConfig::root(temp.path()), on_change).unwrap();

        assert_eq!(debouncer.watched().len(), 200);
    }

    #[tokio::test]
    async fn test_missing_target_is_not_fatal() {
        let temp = TempDir::new().unwrap();
        let (_count, on_change) = counter();

        let debouncer =
            Debouncer::new(DebounceConfig::new(temp.path(), "missing.html"), on_change).unwrap();

        assert!(!debouncer.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_armed_window_fires_after_stop() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("page.html"), "").unwrap();
        let (count, on_change) = counter();

        let config = DebounceConfig::new(temp.path(), "page.html")
            .with_quiet_window(Duration::from_millis(500));
        let mut debouncer = Debouncer::new(config, on_change).unwrap();

        assert!(debouncer.notify(Path::new("page.html"), FileEventKind::Modified));
        assert!(!debouncer.notify(Path::new("page.html"), FileEventKind::Modified));
        assert!(!debouncer.notify(Path::new("page.html"), FileEventKind::Accessed));
        debouncer.stop();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
