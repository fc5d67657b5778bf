use gridworld_author::DragError;
use gridworld_common::{EntityId, ObjectKind};
use gridworld_kernel::{PlacementError, WorldError};
use gridworld_timeline::TimelineError;

/// Errors surfaced to the caller of a session operation.
///
/// Rejected robot commands are not errors; they show up in tick reports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("world edits are disabled while paused")]
    Paused,
    #[error("object {0} not found")]
    UnknownObject(EntityId),
    #[error("object {id} is a {kind}, not a robot")]
    NotARobot { id: EntityId, kind: ObjectKind },
    #[error("no resume is awaiting confirmation")]
    NoPendingResume,
    #[error("cannot spawn: {0}")]
    Spawn(#[from] PlacementError),
    #[error(transparent)]
    Drag(#[from] DragError),
    #[error(transparent)]
    Timeline(#[from] TimelineError),
    #[error(transparent)]
    Store(#[from] WorldError),
}
