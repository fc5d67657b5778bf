//! Temporal record: an append-only sequence of full world snapshots with a
//! time cursor, pause/scrub semantics, and a two-phase destructive resume.
//!
//! # Invariants
//! - Snapshots are immutable once recorded; the record only grows at the tail
//!   or is truncated from the tail.
//! - Nothing is captured while paused.
//! - Scrubbing requires a paused record.
//! - Resuming from a past cursor discards later snapshots only after confirmation.

mod error;
mod record;
mod scheduler;
mod snapshot;

pub use error::TimelineError;
pub use record::{ResumeRequest, ResumeToken, TemporalRecord};
pub use scheduler::{CaptureHandle, CaptureScheduler};
pub use snapshot::Snapshot;
