use glam::Vec3;
use gridworld_common::{Cell, Color, EntityId, Heading, ObjectKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// One simulated entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldObject {
    pub id: EntityId,
    pub kind: ObjectKind,
    pub cell: Cell,
    /// Vertical offset, only non-zero for a box resting on a shelf.
    pub elevation: f32,
    /// Only meaningful for robots.
    pub heading: Heading,
    /// True only for a shelf currently supporting a box.
    pub has_box: bool,
    /// A box held by a robot. While carried, the box is not in the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carried: Option<Box<WorldObject>>,
    pub color: Color,
}

impl WorldObject {
    /// A fresh ground-level object facing north with its kind's default color.
    pub fn new(kind: ObjectKind, cell: Cell) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            cell,
            elevation: 0.0,
            heading: Heading::North,
            has_box: false,
            carried: None,
            color: kind.default_color(),
        }
    }

    pub fn is_robot(&self) -> bool {
        self.kind == ObjectKind::Robot
    }

    /// Whether this object sits above the floor (a box on a shelf).
    pub fn is_elevated(&self) -> bool {
        self.elevation > 0.0
    }

    /// Continuous position for renderers: `(x, elevation, z)`.
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.cell.x as f32, self.elevation, self.cell.z as f32)
    }
}

/// Canonical ordering of objects. BTreeMap keeps iteration deterministic.
pub type ObjectMap = BTreeMap<EntityId, WorldObject>;

/// An event record produced by every mutation to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    Spawned {
        id: EntityId,
        kind: ObjectKind,
        cell: Cell,
    },
    Moved {
        id: EntityId,
        from: Cell,
        to: Cell,
    },
    Rotated {
        id: EntityId,
        from: Heading,
        to: Heading,
    },
    Grabbed {
        robot: EntityId,
        item: EntityId,
        from: Cell,
    },
    Placed {
        robot: EntityId,
        item: EntityId,
        cell: Cell,
        on_shelf: Option<EntityId>,
    },
    /// Direct manipulation moved an object.
    Relocated {
        id: EntityId,
        from: Cell,
        to: Cell,
        elevation: f32,
    },
    ShelfUpdated { shelf: EntityId, has_box: bool },
    /// The whole store was replaced from a recorded snapshot.
    Restored { object_count: usize },
}

/// Errors from store primitives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("object {0} not found")]
    NotFound(EntityId),
    #[error("object {id} is a {found}, expected a {expected}")]
    WrongKind {
        id: EntityId,
        expected: ObjectKind,
        found: ObjectKind,
    },
    #[error("object {0} already exists")]
    Duplicate(EntityId),
    #[error("robot {0} already carries a box")]
    AlreadyCarrying(EntityId),
    #[error("robot {0} carries nothing")]
    NotCarrying(EntityId),
}

/// The authoritative object store.
///
/// The object map sits behind an `Arc` and every mutation goes through
/// `Arc::make_mut`: a snapshot holding the previous map keeps it intact while
/// the store writes to its own copy. Each mutation bumps `revision` and
/// appends a [`WorldEvent`].
#[derive(Debug, Clone, Default)]
pub struct World {
    objects: Arc<ObjectMap>,
    revision: u64,
    event_log: Vec<WorldEvent>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic counter of applied mutations.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Read-only access to all objects in the store.
    pub fn objects(&self) -> &ObjectMap {
        &self.objects
    }

    /// A shared handle on the current map, for snapshots.
    pub fn shared(&self) -> Arc<ObjectMap> {
        Arc::clone(&self.objects)
    }

    pub fn get(&self, id: EntityId) -> Option<&WorldObject> {
        self.objects.get(&id)
    }

    pub fn robots(&self) -> impl Iterator<Item = &WorldObject> {
        self.objects.values().filter(|o| o.is_robot())
    }

    pub fn count_of(&self, kind: ObjectKind) -> usize {
        self.objects.values().filter(|o| o.kind == kind).count()
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Add an object. Occupancy is the caller's policy, not checked here.
    pub fn insert(&mut self, object: WorldObject) -> Result<EntityId, WorldError> {
        let id = object.id;
        if self.objects.contains_key(&id) {
            return Err(WorldError::Duplicate(id));
        }
        let event = WorldEvent::Spawned {
            id,
            kind: object.kind,
            cell: object.cell,
        };
        self.write().insert(id, object);
        self.commit(event);
        Ok(id)
    }

    /// Move an object along the floor, keeping its elevation.
    pub fn set_cell(&mut self, id: EntityId, to: Cell) -> Result<(), WorldError> {
        let from = self.require(id)?.cell;
        if let Some(obj) = self.write().get_mut(&id) {
            obj.cell = to;
        }
        self.commit(WorldEvent::Moved { id, from, to });
        Ok(())
    }

    pub fn set_heading(&mut self, id: EntityId, to: Heading) -> Result<(), WorldError> {
        let from = self.require(id)?.heading;
        if let Some(obj) = self.write().get_mut(&id) {
            obj.heading = to;
        }
        self.commit(WorldEvent::Rotated { id, from, to });
        Ok(())
    }

    /// Move a box out of the store into a robot's hands.
    ///
    /// If the box rested on a shelf, that shelf's `has_box` is cleared.
    pub fn pick_up(&mut self, robot: EntityId, item: EntityId) -> Result<(), WorldError> {
        let holder = self.require_kind(robot, ObjectKind::Robot)?;
        if holder.carried.is_some() {
            return Err(WorldError::AlreadyCarrying(robot));
        }
        let from = self.require_kind(item, ObjectKind::Box)?.cell;
        let supporting_shelf = self
            .objects
            .values()
            .find(|o| o.kind == ObjectKind::Shelf && o.cell == from && o.has_box)
            .map(|o| o.id);

        let objects = self.write();
        let Some(mut boxed) = objects.remove(&item) else {
            return Err(WorldError::NotFound(item));
        };
        boxed.elevation = 0.0;
        if let Some(shelf) = supporting_shelf.and_then(|s| objects.get_mut(&s)) {
            shelf.has_box = false;
        }
        if let Some(holder) = objects.get_mut(&robot) {
            holder.carried = Some(Box::new(boxed));
        }
        self.commit(WorldEvent::Grabbed { robot, item, from });
        Ok(())
    }

    /// Re-emit a robot's carried box at `cell`, optionally onto a shelf.
    pub fn put_down(
        &mut self,
        robot: EntityId,
        cell: Cell,
        elevation: f32,
        on_shelf: Option<EntityId>,
    ) -> Result<EntityId, WorldError> {
        let holder = self.require_kind(robot, ObjectKind::Robot)?;
        if holder.carried.is_none() {
            return Err(WorldError::NotCarrying(robot));
        }
        if let Some(shelf) = on_shelf {
            self.require_kind(shelf, ObjectKind::Shelf)?;
        }

        let objects = self.write();
        let Some(mut boxed) = objects.get_mut(&robot).and_then(|r| r.carried.take()) else {
            return Err(WorldError::NotCarrying(robot));
        };
        boxed.cell = cell;
        boxed.elevation = elevation;
        let item = boxed.id;
        objects.insert(item, *boxed);
        if let Some(shelf) = on_shelf.and_then(|s| objects.get_mut(&s)) {
            shelf.has_box = true;
        }
        self.commit(WorldEvent::Placed {
            robot,
            item,
            cell,
            on_shelf,
        });
        Ok(item)
    }

    /// Reposition an object directly (drag), setting its elevation.
    pub fn relocate(&mut self, id: EntityId, to: Cell, elevation: f32) -> Result<(), WorldError> {
        let from = self.require(id)?.cell;
        if let Some(obj) = self.write().get_mut(&id) {
            obj.cell = to;
            obj.elevation = elevation;
        }
        self.commit(WorldEvent::Relocated {
            id,
            from,
            to,
            elevation,
        });
        Ok(())
    }

    /// Set a shelf's stacking flag. Callers pair this with a box move.
    pub fn set_has_box(&mut self, shelf: EntityId, has_box: bool) -> Result<(), WorldError> {
        self.require_kind(shelf, ObjectKind::Shelf)?;
        if let Some(obj) = self.write().get_mut(&shelf) {
            obj.has_box = has_box;
        }
        self.commit(WorldEvent::ShelfUpdated { shelf, has_box });
        Ok(())
    }

    /// Replace the whole store with a recorded map.
    pub fn restore(&mut self, objects: Arc<ObjectMap>) {
        let object_count = objects.len();
        self.objects = objects;
        self.commit(WorldEvent::Restored { object_count });
    }

    /// Deterministic hash of the store contents, in canonical order.
    pub fn state_hash(&self) -> u64 {
        state_hash(&self.objects)
    }

    fn require(&self, id: EntityId) -> Result<&WorldObject, WorldError> {
        self.objects.get(&id).ok_or(WorldError::NotFound(id))
    }

    fn require_kind(&self, id: EntityId, expected: ObjectKind) -> Result<&WorldObject, WorldError> {
        let obj = self.require(id)?;
        if obj.kind != expected {
            return Err(WorldError::WrongKind {
                id,
                expected,
                found: obj.kind,
            });
        }
        Ok(obj)
    }

    fn write(&mut self) -> &mut ObjectMap {
        Arc::make_mut(&mut self.objects)
    }

    fn commit(&mut self, event: WorldEvent) {
        self.revision += 1;
        self.event_log.push(event);
    }
}

/// FNV-1a over every field of every object, carried boxes included.
pub fn state_hash(objects: &ObjectMap) -> u64 {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    let mix = |h: &mut u64, bytes: &[u8]| {
        for &b in bytes {
            *h ^= b as u64;
            *h = h.wrapping_mul(0x0100_0000_01b3);
        }
    };
    fn walk(obj: &WorldObject, h: &mut u64, mix: &dyn Fn(&mut u64, &[u8])) {
        mix(h, obj.id.0.as_bytes());
        mix(h, &[obj.kind as u8, obj.heading.quarter_turns(), obj.has_box as u8]);
        mix(h, &obj.cell.x.to_le_bytes());
        mix(h, &obj.cell.z.to_le_bytes());
        mix(h, &obj.elevation.to_le_bytes());
        mix(h, &[obj.color.r, obj.color.g, obj.color.b]);
        mix(h, &[obj.carried.is_some() as u8]);
        if let Some(carried) = &obj.carried {
            walk(carried, h, mix);
        }
    }
    for obj in objects.values() {
        walk(obj, &mut h, &mix);
    }
    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn robot_and_box(world: &mut World) -> (EntityId, EntityId) {
        let robot = world
            .insert(WorldObject::new(ObjectKind::Robot, Cell::new(0, 0)))
            .unwrap();
        let item = world
            .insert(WorldObject::new(ObjectKind::Box, Cell::new(0, 1)))
            .unwrap();
        (robot, item)
    }

    #[test]
    fn world_starts_empty() {
        let w = World::new();
        assert_eq!(w.revision(), 0);
        assert_eq!(w.object_count(), 0);
    }

    #[test]
    fn insert_rejects_duplicate_ids() {
        let mut w = World::new();
        let obj = WorldObject::new(ObjectKind::Shelf, Cell::new(2, 2));
        w.insert(obj.clone()).unwrap();
        assert_eq!(w.insert(obj.clone()), Err(WorldError::Duplicate(obj.id)));
        assert_eq!(w.object_count(), 1);
    }

    #[test]
    fn mutations_are_logged_and_counted() {
        let mut w = World::new();
        let (robot, _) = robot_and_box(&mut w);
        w.set_heading(robot, Heading::East).unwrap();
        w.set_cell(robot, Cell::new(1, 0)).unwrap();
        assert_eq!(w.revision(), 4);
        assert_eq!(w.events().len(), 4);
        assert_eq!(
            w.events()[3],
            WorldEvent::Moved {
                id: robot,
                from: Cell::new(0, 0),
                to: Cell::new(1, 0)
            }
        );
        assert_eq!(w.drain_events().len(), 4);
        assert!(w.events().is_empty());
    }

    #[test]
    fn pick_up_moves_box_out_of_store() {
        let mut w = World::new();
        let (robot, item) = robot_and_box(&mut w);
        w.pick_up(robot, item).unwrap();
        assert!(w.get(item).is_none());
        let carried = w.get(robot).unwrap().carried.as_ref().unwrap();
        assert_eq!(carried.id, item);
        assert_eq!(w.pick_up(robot, item), Err(WorldError::AlreadyCarrying(robot)));
    }

    #[test]
    fn put_down_onto_shelf_sets_flag() {
        let mut w = World::new();
        let (robot, item) = robot_and_box(&mut w);
        let shelf = w
            .insert(WorldObject::new(ObjectKind::Shelf, Cell::new(3, 3)))
            .unwrap();
        w.pick_up(robot, item).unwrap();
        w.put_down(robot, Cell::new(3, 3), 1.3, Some(shelf)).unwrap();
        assert!(w.get(shelf).unwrap().has_box);
        assert_eq!(w.get(item).unwrap().elevation, 1.3);
        assert!(w.get(robot).unwrap().carried.is_none());

        // Lifting it back off clears the flag.
        w.pick_up(robot, item).unwrap();
        assert!(!w.get(shelf).unwrap().has_box);
    }

    #[test]
    fn put_down_without_box_fails() {
        let mut w = World::new();
        let (robot, _) = robot_and_box(&mut w);
        assert_eq!(
            w.put_down(robot, Cell::new(1, 1), 0.0, None),
            Err(WorldError::NotCarrying(robot))
        );
    }

    #[test]
    fn wrong_kind_is_reported() {
        let mut w = World::new();
        let (robot, item) = robot_and_box(&mut w);
        assert!(matches!(
            w.pick_up(item, robot),
            Err(WorldError::WrongKind { .. })
        ));
    }

    #[test]
    fn shared_map_is_not_aliased_by_later_writes() {
        let mut w = World::new();
        let (robot, _) = robot_and_box(&mut w);
        let before = w.shared();
        w.set_cell(robot, Cell::new(-5, -5)).unwrap();
        assert_eq!(before.get(&robot).unwrap().cell, Cell::new(0, 0));
        assert_eq!(w.get(robot).unwrap().cell, Cell::new(-5, -5));
    }

    #[test]
    fn restore_replaces_contents() {
        let mut w = World::new();
        let (robot, item) = robot_and_box(&mut w);
        let saved = w.shared();
        let hash = w.state_hash();
        w.pick_up(robot, item).unwrap();
        assert_ne!(w.state_hash(), hash);

        w.restore(saved);
        assert_eq!(w.state_hash(), hash);
        assert!(w.get(item).is_some());
        assert_eq!(
            w.events().last(),
            Some(&WorldEvent::Restored { object_count: 2 })
        );
    }

    #[test]
    fn state_hash_sees_carried_boxes() {
        // Robot id sorts first, so carried and dropped boxes are walked in the same order.
        let mut ids = [EntityId::new(), EntityId::new()];
        ids.sort();
        let mut a = World::new();
        let robot = a
            .insert(WorldObject {
                id: ids[0],
                ..WorldObject::new(ObjectKind::Robot, Cell::new(0, 0))
            })
            .unwrap();
        let item = a
            .insert(WorldObject {
                id: ids[1],
                ..WorldObject::new(ObjectKind::Box, Cell::new(0, 1))
            })
            .unwrap();
        let mut b = a.clone();
        a.pick_up(robot, item).unwrap();
        b.pick_up(robot, item).unwrap();
        assert_eq!(a.state_hash(), b.state_hash());
        a.put_down(robot, Cell::new(0, 1), 0.0, None).unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }
}
