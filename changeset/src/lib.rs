//! # ChangeSet
//!
//! Enumerates the candidate sources under a scan root and classifies each one
//! against its derived output.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         ChangeSet                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ScanOptions ──► scan() ──► Vec<TrackedFile>                 │
//! │       │                          │                           │
//! │       ▼                          ▼                           │
//! │  ExcludePolicy              FileStatus (new/modified/...)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification is timestamp based: a target is `Modified` only when its
//! source is strictly newer, so equal timestamps never trigger a rebuild.

pub mod error;
pub mod exclude;
pub mod scanner;
pub mod tracked;

pub use error::{Result, ScanError};
pub use exclude::{ExcludePolicy, ExcludeSpec, MatchKinds};
pub use scanner::{ScanOptions, ScanSummary, scan};
pub use tracked::{FileStatus, TrackedFile, modified_millis};
