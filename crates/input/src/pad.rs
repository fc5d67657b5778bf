use gridworld_common::RobotCommand;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A button on the control pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PadButton {
    Up,
    Down,
    Left,
    Right,
    A,
    B,
}

impl PadButton {
    pub const ALL: [PadButton; 6] = [
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::A,
        Self::B,
    ];

    /// The robot command this button sends.
    pub fn command(self) -> RobotCommand {
        match self {
            Self::Up => RobotCommand::Forward,
            Self::Down => RobotCommand::Backward,
            Self::Left => RobotCommand::RotateLeft,
            Self::Right => RobotCommand::RotateRight,
            Self::A => RobotCommand::Grab,
            Self::B => RobotCommand::Place,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for PadButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pad button: {0}")]
pub struct UnknownButton(pub String);

impl FromStr for PadButton {
    type Err = UnknownButton;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|b| b.label() == lower)
            .ok_or_else(|| UnknownButton(s.to_string()))
    }
}
