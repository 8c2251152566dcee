//! # Directory Watcher
//!
//! Turns raw OS file-change notifications into a clean "this file changed"
//! stream for live rebuilds.
//!
//! ## Features
//!
//! - **Per-file subscriptions**: a directory is watched as one non-recursive
//!   subscription per file, since recursive watches behave differently on
//!   every platform; all subscriptions share one OS watcher
//! - **Quiet-window debouncing**: bursts for one file collapse into one event
//! - **Transient-file filtering**: files gone by the end of the window are
//!   dropped
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Debouncer                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  DebounceConfig ──► WatchSubscription* ──► DebounceTable        │
//! │                                                 │               │
//! │                                                 ▼               │
//! │                                   on_change(FileEvent)          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod debounce;
pub mod error;
pub mod event;
pub mod watcher;

pub use config::{DEFAULT_QUIET_WINDOW_MS, DebounceConfig};
pub use debounce::{ChangeCallback, DebounceTable};
pub use error::{Result, WatcherError};
pub use event::{FileEvent, FileEventKind};
pub use watcher::{Debouncer, WatchSubscription};
