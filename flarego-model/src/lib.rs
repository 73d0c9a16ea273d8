//! Core data model shared across FlareGo crates: [`Frame`], [`Sample`],
//! [`Snapshot`], and the wire-level [`Chunk`].
#![allow(missing_docs)]

mod error;
mod frame;
mod sample;
mod snapshot;

pub use error::ModelError;
pub use frame::Frame;
pub use sample::Sample;
pub use snapshot::{Chunk, Snapshot, diff};

/// Pseudo-stack label for garbage-collection pause samples.
pub const LABEL_GC: &str = "(GC)";
/// Pseudo-stack label for heap-delta samples.
pub const LABEL_HEAP: &str = "(Heap)";
/// Pseudo-stack label for blocked-task samples.
pub const LABEL_BLOCKED: &str = "(Blocked)";
