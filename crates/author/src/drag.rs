use glam::Vec2;
use gridworld_common::{Cell, EntityId, ObjectKind, SimConfig};
use gridworld_kernel::{
    OccupancyGrid, PlacementError, ShelfPlacement, World, WorldError, place_box, place_shelf,
};

/// A completed drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragOutcome {
    pub id: EntityId,
    pub kind: ObjectKind,
    pub from: Cell,
    pub to: Cell,
    /// The complementary object the dragged one is now stacked with, if any.
    pub stacked_with: Option<EntityId>,
}

/// Errors from drag operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DragError {
    #[error("object {0} not found")]
    NotFound(EntityId),
    #[error("object {id} is a {kind} and cannot be dragged")]
    NotDraggable { id: EntityId, kind: ObjectKind },
    #[error("drop rejected: {0}")]
    Blocked(#[from] PlacementError),
    #[error(transparent)]
    Store(#[from] WorldError),
}

/// Drop object `id` at the continuous ground point `drop`.
///
/// The point snaps to the nearest cell. A box dropped on a free shelf stacks;
/// a shelf dropped under a loose box lifts it. A shelf already holding a box
/// takes it along. Any other occupant rejects the drop and nothing moves.
pub fn drag(
    world: &mut World,
    id: EntityId,
    drop: Vec2,
    config: &SimConfig,
) -> Result<DragOutcome, DragError> {
    let obj = world.get(id).ok_or(DragError::NotFound(id))?;
    let (kind, from) = (obj.kind, obj.cell);
    let to = Cell::snap(drop);

    let stacked_with = match kind {
        ObjectKind::Robot => return Err(DragError::NotDraggable { id, kind }),
        ObjectKind::Box => drag_box(world, id, from, to, config)?,
        ObjectKind::Shelf => drag_shelf(world, id, from, to, config)?,
    };

    tracing::debug!(id = %id.short(), %kind, %from, %to, stacked = stacked_with.is_some(), "dragged");
    Ok(DragOutcome {
        id,
        kind,
        from,
        to,
        stacked_with,
    })
}

fn drag_box(
    world: &mut World,
    id: EntityId,
    from: Cell,
    to: Cell,
    config: &SimConfig,
) -> Result<Option<EntityId>, DragError> {
    let grid = OccupancyGrid::from_world_without(world, &[id]);
    let placement = place_box(&grid, to)?;
    let old_shelf = supporting_shelf(world, from);

    world.relocate(id, to, placement.elevation(config))?;
    if let Some(shelf) = old_shelf {
        world.set_has_box(shelf, false)?;
    }
    if let Some(shelf) = placement.shelf() {
        world.set_has_box(shelf, true)?;
    }
    Ok(placement.shelf())
}

fn drag_shelf(
    world: &mut World,
    id: EntityId,
    from: Cell,
    to: Cell,
    config: &SimConfig,
) -> Result<Option<EntityId>, DragError> {
    let riding = stacked_box(world, id, from);
    let mut skip = vec![id];
    skip.extend(riding);
    let grid = OccupancyGrid::from_world_without(world, &skip);

    match place_shelf(&grid, to)? {
        ShelfPlacement::Ground(cell) => {
            world.relocate(id, cell, 0.0)?;
            if let Some(item) = riding {
                world.relocate(item, cell, config.stacked_elevation())?;
            }
            Ok(riding)
        }
        ShelfPlacement::UnderBox { cell, .. } if riding.is_some() => {
            Err(PlacementError::Occupied {
                cell,
                by: ObjectKind::Box,
            }
            .into())
        }
        ShelfPlacement::UnderBox { cell, item } => {
            world.relocate(id, cell, 0.0)?;
            world.relocate(item, cell, config.stacked_elevation())?;
            world.set_has_box(id, true)?;
            Ok(Some(item))
        }
    }
}

/// The shelf holding a box at `cell`, if the box there is stacked.
fn supporting_shelf(world: &World, cell: Cell) -> Option<EntityId> {
    world
        .objects()
        .values()
        .find(|o| o.kind == ObjectKind::Shelf && o.cell == cell && o.has_box)
        .map(|o| o.id)
}

/// The box resting on shelf `shelf`, if any.
fn stacked_box(world: &World, shelf: EntityId, cell: Cell) -> Option<EntityId> {
    if !world.get(shelf)?.has_box {
        return None;
    }
    world
        .objects()
        .values()
        .find(|o| o.kind == ObjectKind::Box && o.cell == cell)
        .map(|o| o.id)
}
