//! Direct manipulation of world objects.
//!
//! # Invariants
//! - A drag either fully applies or leaves the world untouched.
//! - Drops follow the same stacking rule as a robot's `place`.
//! - Robots are never dragged.

mod drag;

pub use drag::{DragError, DragOutcome, drag};
