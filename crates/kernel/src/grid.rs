use crate::world::{ObjectMap, World, WorldObject};
use gridworld_common::{Cell, EntityId, Heading, ObjectKind};
use std::collections::HashMap;

/// What sits on one ground cell.
///
/// A shelf with a box on top is the only legal co-location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellContents {
    Robot(EntityId),
    Box(EntityId),
    Shelf {
        shelf: EntityId,
        stacked: Option<EntityId>,
    },
}

impl CellContents {
    /// The kind of the object that physically blocks the cell.
    pub fn blocker(&self) -> ObjectKind {
        match self {
            Self::Robot(_) => ObjectKind::Robot,
            Self::Box(_) => ObjectKind::Box,
            Self::Shelf { .. } => ObjectKind::Shelf,
        }
    }
}

/// Legality of moving onto a neighboring cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCheck {
    Ok,
    OutOfBounds,
    Occupied,
}

/// Ground occupancy index derived from the object store.
///
/// Carried boxes are not in the store, so they never occupy a cell. The
/// index is rebuilt from scratch whenever it is needed; the lattice is small.
#[derive(Debug, Clone, Default)]
pub struct OccupancyGrid {
    cells: HashMap<Cell, CellContents>,
    conflicts: Vec<(Cell, EntityId)>,
}

impl OccupancyGrid {
    /// Index every object in the world.
    pub fn from_world(world: &World) -> Self {
        Self::from_objects(world.objects(), |_| true)
    }

    /// Index the world while ignoring some objects (e.g. the one being dragged).
    pub fn from_world_without(world: &World, skip: &[EntityId]) -> Self {
        Self::from_objects(world.objects(), |o| !skip.contains(&o.id))
    }

    fn from_objects(objects: &ObjectMap, keep: impl Fn(&WorldObject) -> bool) -> Self {
        let mut grid = Self::default();
        for obj in objects.values().filter(|o| keep(*o)) {
            grid.add(obj);
        }
        grid
    }

    fn add(&mut self, obj: &WorldObject) {
        let incoming = match obj.kind {
            ObjectKind::Robot => CellContents::Robot(obj.id),
            ObjectKind::Box => CellContents::Box(obj.id),
            ObjectKind::Shelf => CellContents::Shelf {
                shelf: obj.id,
                stacked: None,
            },
        };
        let merged = match (self.cells.get(&obj.cell).copied(), incoming) {
            (None, contents) => Some(contents),
            (Some(CellContents::Box(item)), CellContents::Shelf { shelf, .. })
            | (
                Some(CellContents::Shelf {
                    shelf,
                    stacked: None,
                }),
                CellContents::Box(item),
            ) => Some(CellContents::Shelf {
                shelf,
                stacked: Some(item),
            }),
            _ => None,
        };
        match merged {
            Some(contents) => {
                self.cells.insert(obj.cell, contents);
            }
            None => self.conflicts.push((obj.cell, obj.id)),
        }
    }

    pub fn contents(&self, cell: Cell) -> Option<CellContents> {
        self.cells.get(&cell).copied()
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.cells.contains_key(&cell)
    }

    /// Whether a robot may step onto `cell`.
    pub fn check_target(&self, cell: Cell) -> MoveCheck {
        if !cell.in_bounds() {
            MoveCheck::OutOfBounds
        } else if self.is_occupied(cell) {
            MoveCheck::Occupied
        } else {
            MoveCheck::Ok
        }
    }

    /// First unoccupied cell in raster order.
    pub fn first_free(&self, spacing: u8) -> Option<Cell> {
        Cell::raster(spacing).find(|c| !self.is_occupied(*c))
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.len()
    }

    /// Objects that could not be indexed because their cell was already taken.
    pub fn conflicts(&self) -> &[(Cell, EntityId)] {
        &self.conflicts
    }
}

/// The cell one step along `heading`.
pub fn ahead(cell: Cell, heading: Heading) -> Cell {
    cell.offset(heading.forward())
}

/// The cell one step against `heading`.
pub fn behind(cell: Cell, heading: Heading) -> Cell {
    cell.offset(-heading.forward())
}

/// A broken store invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("object {id} is out of bounds at {cell}")]
    OutOfBounds { id: EntityId, cell: Cell },
    #[error("object {id} collides with another occupant of {cell}")]
    Collision { id: EntityId, cell: Cell },
    #[error("shelf {shelf} has_box={flag} does not match its cell")]
    ShelfFlag { shelf: EntityId, flag: bool },
    #[error("box {id} at elevation {elevation} does not match its cell")]
    Misplaced { id: EntityId, elevation: f32 },
    #[error("object {holder} carries {carried}, which is not a box held by a robot")]
    BadCarry { holder: EntityId, carried: EntityId },
    #[error("carried box {0} is also in the store")]
    CarriedInStore(EntityId),
}

/// Check every occupancy, stacking and carrying invariant of the store.
pub fn validate(world: &World) -> Result<(), InvariantViolation> {
    let grid = OccupancyGrid::from_world(world);
    if let Some(&(cell, id)) = grid.conflicts().first() {
        return Err(InvariantViolation::Collision { id, cell });
    }
    for obj in world.objects().values() {
        if !obj.cell.in_bounds() {
            return Err(InvariantViolation::OutOfBounds {
                id: obj.id,
                cell: obj.cell,
            });
        }
        match obj.kind {
            ObjectKind::Shelf => {
                let stacked = matches!(
                    grid.contents(obj.cell),
                    Some(CellContents::Shelf {
                        stacked: Some(_),
                        ..
                    })
                );
                if stacked != obj.has_box {
                    return Err(InvariantViolation::ShelfFlag {
                        shelf: obj.id,
                        flag: obj.has_box,
                    });
                }
            }
            ObjectKind::Box => {
                let on_shelf = matches!(grid.contents(obj.cell), Some(CellContents::Shelf { .. }));
                if obj.is_elevated() != on_shelf {
                    return Err(InvariantViolation::Misplaced {
                        id: obj.id,
                        elevation: obj.elevation,
                    });
                }
            }
            ObjectKind::Robot => {}
        }
        if let Some(carried) = &obj.carried {
            if !obj.is_robot() || carried.kind != ObjectKind::Box || carried.carried.is_some() {
                return Err(InvariantViolation::BadCarry {
                    holder: obj.id,
                    carried: carried.id,
                });
            }
            if world.get(carried.id).is_some() {
                return Err(InvariantViolation::CarriedInStore(carried.id));
            }
        }
    }
    Ok(())
}
