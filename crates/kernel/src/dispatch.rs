use crate::queue::CommandQueue;
use gridworld_common::{EntityId, RobotCommand};
use std::collections::BTreeMap;

/// Proof of a registration, needed to undo it.
///
/// Carries a generation so that deregistering with a stale handle cannot
/// remove a newer registration for the same robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "dropping a registration makes the robot impossible to deregister"]
pub struct Registration {
    id: EntityId,
    generation: u64,
}

impl Registration {
    pub fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u64,
    queue: CommandQueue,
}

/// Routes commands addressed by robot id to that robot's queue.
///
/// The control surface only ever holds ids; the dispatcher owns the queues.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    slots: BTreeMap<EntityId, Slot>,
    next_generation: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install an empty queue for `id`, replacing any previous one.
    pub fn register(&mut self, id: EntityId) -> Registration {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slots.insert(
            id,
            Slot {
                generation,
                queue: CommandQueue::new(),
            },
        );
        tracing::debug!(robot = %id.short(), generation, "robot registered");
        Registration { id, generation }
    }

    /// Remove the queue installed by `registration`. Returns false if it was already gone.
    pub fn deregister(&mut self, registration: Registration) -> bool {
        match self.slots.get(&registration.id) {
            Some(slot) if slot.generation == registration.generation => {
                self.slots.remove(&registration.id);
                tracing::debug!(robot = %registration.id.short(), "robot deregistered");
                true
            }
            _ => false,
        }
    }

    /// Enqueue `command` for robot `id`. Unknown ids are ignored.
    pub fn dispatch(&mut self, id: EntityId, command: RobotCommand) -> bool {
        match self.slots.get_mut(&id) {
            Some(slot) => {
                slot.queue.push(command);
                tracing::debug!(robot = %id.short(), %command, queued = slot.queue.len(), "command queued");
                true
            }
            None => {
                tracing::debug!(robot = %id.short(), %command, "dispatch to unknown robot ignored");
                false
            }
        }
    }

    pub fn is_registered(&self, id: EntityId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn queue(&self, id: EntityId) -> Option<&CommandQueue> {
        self.slots.get(&id).map(|s| &s.queue)
    }

    /// Registered robot ids in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every queue in canonical robot order.
    pub fn queues_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut CommandQueue)> {
        self.slots.iter_mut().map(|(id, slot)| (*id, &mut slot.queue))
    }

    /// Drop every pending command and motion lock, keeping registrations.
    pub fn reset_queues(&mut self) {
        for slot in self.slots.values_mut() {
            slot.queue.reset();
        }
    }
}
