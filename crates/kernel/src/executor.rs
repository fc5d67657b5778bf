use crate::dispatch::Dispatcher;
use crate::grid::{self, MoveCheck, OccupancyGrid};
use crate::stacking::{self, PlacementError};
use crate::world::{World, WorldError};
use gridworld_common::{Cell, EntityId, Heading, RobotCommand, SimConfig};
use std::time::Duration;

/// The effect of a command that went through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Executed {
    Rotated {
        from: Heading,
        to: Heading,
    },
    Moved {
        from: Cell,
        to: Cell,
    },
    Grabbed {
        item: EntityId,
        from: Cell,
    },
    Placed {
        item: EntityId,
        cell: Cell,
        on_shelf: Option<EntityId>,
    },
}

/// Why a command was dropped. Always non-fatal; the command is consumed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("robot {0} is not in the world")]
    UnknownRobot(EntityId),
    #[error("object {0} is not a robot")]
    NotARobot(EntityId),
    #[error("target {0} is out of bounds")]
    OutOfBounds(Cell),
    #[error("target {0} is occupied")]
    Occupied(Cell),
    #[error("no box at {0}")]
    NothingToGrab(Cell),
    #[error("already carrying a box")]
    AlreadyCarrying,
    #[error("not carrying a box")]
    NothingCarried,
    #[error("cannot place: {0}")]
    Placement(#[from] PlacementError),
    #[error(transparent)]
    Store(#[from] WorldError),
}

/// Apply one command for `robot` to the world.
///
/// A rejection leaves the world untouched.
pub fn execute(
    world: &mut World,
    robot: EntityId,
    command: RobotCommand,
    config: &SimConfig,
) -> Result<Executed, Rejection> {
    let actor = world.get(robot).ok_or(Rejection::UnknownRobot(robot))?;
    if !actor.is_robot() {
        return Err(Rejection::NotARobot(robot));
    }
    let (cell, heading, carrying) = (actor.cell, actor.heading, actor.carried.is_some());

    match command {
        RobotCommand::RotateLeft | RobotCommand::RotateRight => {
            let to = if command == RobotCommand::RotateLeft {
                heading.rotate_left()
            } else {
                heading.rotate_right()
            };
            world.set_heading(robot, to)?;
            Ok(Executed::Rotated { from: heading, to })
        }
        RobotCommand::Forward | RobotCommand::Backward => {
            let target = if command == RobotCommand::Forward {
                grid::ahead(cell, heading)
            } else {
                grid::behind(cell, heading)
            };
            match OccupancyGrid::from_world(world).check_target(target) {
                MoveCheck::Ok => {
                    world.set_cell(robot, target)?;
                    Ok(Executed::Moved {
                        from: cell,
                        to: target,
                    })
                }
                MoveCheck::OutOfBounds => Err(Rejection::OutOfBounds(target)),
                MoveCheck::Occupied => Err(Rejection::Occupied(target)),
            }
        }
        RobotCommand::Grab => {
            if carrying {
                return Err(Rejection::AlreadyCarrying);
            }
            let target = grid::ahead(cell, heading);
            let grid = OccupancyGrid::from_world(world);
            let item = stacking::liftable_box(&grid, target).ok_or(Rejection::NothingToGrab(target))?;
            world.pick_up(robot, item)?;
            Ok(Executed::Grabbed { item, from: target })
        }
        RobotCommand::Place => {
            if !carrying {
                return Err(Rejection::NothingCarried);
            }
            let target = grid::ahead(cell, heading);
            let placement = stacking::place_box(&OccupancyGrid::from_world(world), target)?;
            let item = world.put_down(
                robot,
                placement.cell(),
                placement.elevation(config),
                placement.shelf(),
            )?;
            Ok(Executed::Placed {
                item,
                cell: placement.cell(),
                on_shelf: placement.shelf(),
            })
        }
    }
}

/// What happened to one dequeued command.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub robot: EntityId,
    pub command: RobotCommand,
    pub outcome: Result<Executed, Rejection>,
}

/// Dequeue and execute at most one command per idle robot.
///
/// Robots are visited in canonical id order. Successful rotations and moves
/// start the robot's motion lock at `now`.
pub fn run_tick(
    world: &mut World,
    dispatcher: &mut Dispatcher,
    now: Duration,
    config: &SimConfig,
) -> Vec<TickReport> {
    let _span = tracing::info_span!("robot_tick", now_ms = now.as_millis() as u64).entered();
    let mut reports = Vec::new();
    for (robot, queue) in dispatcher.queues_mut() {
        let Some(command) = queue.take_ready(now) else {
            continue;
        };
        let outcome = execute(world, robot, command, config);
        match &outcome {
            Ok(done) => {
                if command.engages_motion_lock() {
                    queue.lock(now, config.motion_lock());
                }
                tracing::debug!(robot = %robot.short(), %command, ?done, "command executed");
            }
            Err(reason) => {
                tracing::debug!(robot = %robot.short(), %command, %reason, "command rejected");
            }
        }
        reports.push(TickReport {
            robot,
            command,
            outcome,
        });
    }
    reports
}
