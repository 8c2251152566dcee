//! # Collector
//!
//! Prunes generated artifacts whose source has disappeared. Nothing is
//! deleted: obsolete files are moved into a quarantine tree that mirrors the
//! output tree's relative layout, and the move is the only record kept.

pub mod collector;
pub mod config;
pub mod error;
pub mod quarantine;

pub use collector::{CollectReport, Collector};
pub use config::CollectorConfig;
pub use error::{CollectError, Result};
pub use quarantine::QuarantineAction;
