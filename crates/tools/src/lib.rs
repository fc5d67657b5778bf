//! Developer tooling: read-only inspection of a running simulation.
//!
//! # Invariants
//! - Tools never mutate the world or the record.

pub mod inspector;

pub use inspector::{ObjectInfo, SnapshotInfo, WorldInspector, WorldSummary};
