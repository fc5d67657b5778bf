//! World Kernel: authoritative object store, spatial grid, stacking policy,
//! per-robot command queues and their executor.
//!
//! # Invariants
//! - At most one ground object per cell, except a shelf holding a box.
//! - A robot carries at most one box; a carried box is not in the store.
//! - All positions stay within the grid; illegal moves are rejected, never clamped.
//! - All state mutations flow through explicit store operations.

pub mod dispatch;
pub mod executor;
pub mod grid;
pub mod queue;
pub mod stacking;
pub mod world;

pub use dispatch::{Dispatcher, Registration};
pub use executor::{Executed, Rejection, TickReport, execute, run_tick};
pub use grid::{CellContents, InvariantViolation, MoveCheck, OccupancyGrid, validate};
pub use queue::{CommandQueue, RobotState};
pub use stacking::{BoxPlacement, PlacementError, ShelfPlacement, place_box, place_shelf};
pub use world::{ObjectMap, World, WorldError, WorldEvent, WorldObject};
