use gridworld_common::{Cell, EntityId, Heading, ObjectKind};
use gridworld_kernel::RobotState;
use gridworld_session::Simulation;
use gridworld_timeline::TemporalRecord;
use serde::Serialize;
use std::fmt;

/// Read-only queries against a simulation, for debugging and dev UIs.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the simulation state.
    pub fn summary(sim: &Simulation) -> WorldSummary {
        let world = sim.world();
        let record = sim.record();
        WorldSummary {
            clock_ms: sim.clock().as_millis() as u64,
            revision: world.revision(),
            robots: world.count_of(ObjectKind::Robot),
            boxes: world.count_of(ObjectKind::Box),
            shelves: world.count_of(ObjectKind::Shelf),
            record_len: record.len(),
            time_state: record.time_state(),
            paused: record.is_paused(),
        }
    }

    /// Details of one object in the live store.
    pub fn inspect_object(sim: &Simulation, id: EntityId) -> Option<ObjectInfo> {
        let obj = sim.world().get(id)?;
        let p = obj.position();
        let state = sim.robot_state(id).map(|s| match s {
            RobotState::Idle => "idle",
            RobotState::Executing { .. } => "executing",
        });
        Some(ObjectInfo {
            id,
            kind: obj.kind,
            cell: obj.cell,
            position: [p.x, p.y, p.z],
            heading: obj.is_robot().then_some(obj.heading),
            has_box: obj.has_box,
            carrying: obj.carried.as_ref().map(|c| c.id),
            queued: sim.queue_len(id),
            state,
        })
    }

    /// All object ids in canonical order.
    pub fn list_objects(sim: &Simulation) -> Vec<EntityId> {
        sim.world().objects().keys().copied().collect()
    }

    /// One line per recorded snapshot.
    pub fn record_listing(record: &TemporalRecord) -> Vec<SnapshotInfo> {
        record
            .snapshots()
            .iter()
            .enumerate()
            .map(|(index, snap)| SnapshotInfo {
                index,
                revision: snap.revision,
                captured_ms: snap.captured_at.as_millis() as u64,
                objects: snap.object_count(),
                digest: snap.digest.chars().take(12).collect(),
                cursor: index == record.time_state(),
            })
            .collect()
    }
}

/// Summary of simulation state for the inspector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorldSummary {
    pub clock_ms: u64,
    pub revision: u64,
    pub robots: usize,
    pub boxes: usize,
    pub shelves: usize,
    pub record_len: usize,
    pub time_state: usize,
    pub paused: bool,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World: t={}ms rev={} robots={} boxes={} shelves={} record={}/{}{}",
            self.clock_ms,
            self.revision,
            self.robots,
            self.boxes,
            self.shelves,
            self.time_state,
            self.record_len,
            if self.paused { " [paused]" } else { "" },
        )
    }
}

/// Detailed info about a single object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectInfo {
    pub id: EntityId,
    pub kind: ObjectKind,
    pub cell: Cell,
    pub position: [f32; 3],
    pub heading: Option<Heading>,
    pub has_box: bool,
    pub carrying: Option<EntityId>,
    pub queued: usize,
    pub state: Option<&'static str>,
}

impl fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] cell={} elev={:.2}",
            self.kind,
            self.id.short(),
            self.cell,
            self.position[1]
        )?;
        if let Some(heading) = self.heading {
            write!(f, " heading={heading:?} queued={}", self.queued)?;
        }
        if let Some(state) = self.state {
            write!(f, " {state}")?;
        }
        if let Some(item) = self.carrying {
            write!(f, " carrying={}", item.short())?;
        }
        if self.has_box {
            f.write_str(" loaded")?;
        }
        Ok(())
    }
}

/// One entry in the record listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotInfo {
    pub index: usize,
    pub revision: u64,
    pub captured_ms: u64,
    pub objects: usize,
    pub digest: String,
    pub cursor: bool,
}

impl fmt::Display for SnapshotInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} #{:<3} t={:>6}ms rev={:<4} objects={:<3} sha256={}",
            if self.cursor { ">" } else { " " },
            self.index,
            self.captured_ms,
            self.revision,
            self.objects,
            self.digest
        )
    }
}
