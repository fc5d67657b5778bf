use crate::pad::PadButton;
use glam::Vec2;
use gridworld_common::{Cell, EntityId, ObjectKind, RobotCommand};

/// A high-level request from the control surface.
///
/// The session consumes actions, never raw input events, so any front end
/// (text, scripted, graphical) drives the same world logic.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Spawn an object at the first free cell.
    Spawn(ObjectKind),
    /// Spawn an object at a specific cell.
    SpawnAt(ObjectKind, Cell),
    /// Make a robot the target of pad presses.
    Select(EntityId),
    Deselect,
    /// A pad press, routed to the selected robot.
    Press(PadButton),
    /// A command sent to a robot by id.
    Dispatch(EntityId, RobotCommand),
    /// Drop a box or shelf at a continuous ground point.
    Drag { id: EntityId, to: Vec2 },
    Pause,
    /// First phase of resuming; may ask for confirmation.
    Resume,
    ConfirmResume,
    CancelResume,
    /// Move the time cursor (paused only).
    Scrub(usize),
}

impl Action {
    /// Whether this action changes the world directly, rather than the timeline.
    pub fn edits_world(&self) -> bool {
        matches!(
            self,
            Self::Spawn(_) | Self::SpawnAt(..) | Self::Press(_) | Self::Dispatch(..) | Self::Drag { .. }
        )
    }
}
