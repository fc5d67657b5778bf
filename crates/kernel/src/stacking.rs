//! Rules for combining boxes and shelves.
//!
//! Shared by robot `place` and by direct manipulation, so a box reaches a
//! shelf under exactly the same conditions either way.

use crate::grid::{CellContents, OccupancyGrid};
use gridworld_common::{Cell, EntityId, ObjectKind, SimConfig};

/// Where a box ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxPlacement {
    Ground(Cell),
    OnShelf { cell: Cell, shelf: EntityId },
}

impl BoxPlacement {
    pub fn cell(&self) -> Cell {
        match self {
            Self::Ground(cell) | Self::OnShelf { cell, .. } => *cell,
        }
    }

    pub fn shelf(&self) -> Option<EntityId> {
        match self {
            Self::Ground(_) => None,
            Self::OnShelf { shelf, .. } => Some(*shelf),
        }
    }

    /// Vertical offset the box takes at this placement.
    pub fn elevation(&self, config: &SimConfig) -> f32 {
        match self {
            Self::Ground(_) => 0.0,
            Self::OnShelf { .. } => config.stacked_elevation(),
        }
    }
}

/// Where a shelf ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShelfPlacement {
    Ground(Cell),
    /// Slid under a loose box, which becomes stacked.
    UnderBox { cell: Cell, item: EntityId },
}

/// Why an object cannot go to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("cell {0} is out of bounds")]
    OutOfBounds(Cell),
    #[error("cell {cell} is occupied by a {by}")]
    Occupied { cell: Cell, by: ObjectKind },
    #[error("shelf at {0} already holds a box")]
    ShelfFull(Cell),
}

/// Decide how a box lands on `cell`.
pub fn place_box(grid: &OccupancyGrid, cell: Cell) -> Result<BoxPlacement, PlacementError> {
    if !cell.in_bounds() {
        return Err(PlacementError::OutOfBounds(cell));
    }
    match grid.contents(cell) {
        None => Ok(BoxPlacement::Ground(cell)),
        Some(CellContents::Shelf {
            shelf,
            stacked: None,
        }) => Ok(BoxPlacement::OnShelf { cell, shelf }),
        Some(CellContents::Shelf { .. }) => Err(PlacementError::ShelfFull(cell)),
        Some(other) => Err(PlacementError::Occupied {
            cell,
            by: other.blocker(),
        }),
    }
}

/// Decide how a shelf lands on `cell`.
pub fn place_shelf(grid: &OccupancyGrid, cell: Cell) -> Result<ShelfPlacement, PlacementError> {
    if !cell.in_bounds() {
        return Err(PlacementError::OutOfBounds(cell));
    }
    match grid.contents(cell) {
        None => Ok(ShelfPlacement::Ground(cell)),
        Some(CellContents::Box(item)) => Ok(ShelfPlacement::UnderBox { cell, item }),
        Some(other) => Err(PlacementError::Occupied {
            cell,
            by: other.blocker(),
        }),
    }
}

/// The box a robot could lift from `cell`: a loose box, or one on a shelf.
pub fn liftable_box(grid: &OccupancyGrid, cell: Cell) -> Option<EntityId> {
    match grid.contents(cell)? {
        CellContents::Box(item) => Some(item),
        CellContents::Shelf { stacked, .. } => stacked,
        CellContents::Robot(_) => None,
    }
}
