//! Shared types for the gridworld engine.
//!
//! # Invariants
//! - Grid coordinates are integers in `[GRID_MIN, GRID_MAX]` on both axes.
//! - Headings are always one of four cardinal directions.

mod config;
mod types;

pub use config::SimConfig;
pub use types::{
    Cell, Color, EntityId, GRID_MAX, GRID_MIN, Heading, ObjectKind, ParseError, RobotCommand,
};
