//! # Invalidation
//!
//! Decides whether a source the scanner reported as unchanged must still be
//! rebuilt because something it transitively references (an imported style
//! partial, an extended or included template) changed after its output was
//! written.
//!
//! One [`ReferenceGraph`] is created per pass. It reads file contents and
//! timestamps lazily and memoizes both, so a base template shared by many
//! pages is read once per pass no matter how many paths reach it.

pub mod error;
pub mod extractor;
pub mod graph;
pub mod staleness;

pub use error::{DanglingReference, InvalidationError, Result};
pub use extractor::{ExtractReferences, ReferenceExtractor, StyleReferences, TemplateReferences};
pub use graph::ReferenceGraph;
pub use staleness::{is_stale, stale_files};
