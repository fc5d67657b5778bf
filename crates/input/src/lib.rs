//! Control surface: user actions and the pad that drives the selected robot.
//!
//! # Invariants
//! - The surface addresses robots by id only; it never holds robot state.
//! - Every pad button maps to exactly one robot command.

pub mod action;
pub mod pad;

pub use action::Action;
pub use pad::{PadButton, UnknownButton};
