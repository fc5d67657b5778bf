use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lowest valid coordinate on either grid axis.
pub const GRID_MIN: i32 = -10;
/// Highest valid coordinate on either grid axis.
pub const GRID_MAX: i32 = 9;

/// Unique identifier for an object in the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell objects apart in logs.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ParseError::EntityId(s.to_string()))
    }
}

/// One integer `(x, z)` coordinate pair on the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub z: i32,
}

impl Cell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Whether both coordinates lie within `[GRID_MIN, GRID_MAX]`.
    pub fn in_bounds(&self) -> bool {
        (GRID_MIN..=GRID_MAX).contains(&self.x) && (GRID_MIN..=GRID_MAX).contains(&self.z)
    }

    /// The cell reached by adding a lattice offset. No bounds check.
    pub fn offset(&self, delta: IVec2) -> Self {
        Self {
            x: self.x + delta.x,
            z: self.z + delta.y,
        }
    }

    /// Snap a continuous ground-plane point to the nearest cell.
    pub fn snap(point: Vec2) -> Self {
        let rounded = point.round().as_ivec2();
        Self {
            x: rounded.x,
            z: rounded.y,
        }
    }

    /// All in-bounds cells in raster order (`x` outer, `z` inner), stepping by `spacing`.
    pub fn raster(spacing: u8) -> impl Iterator<Item = Cell> {
        let step = usize::from(spacing.max(1));
        (GRID_MIN..=GRID_MAX).step_by(step).flat_map(move |x| {
            (GRID_MIN..=GRID_MAX)
                .step_by(step)
                .map(move |z| Cell::new(x, z))
        })
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Cardinal heading of a robot, stored as counter-clockwise quarter turns from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Heading {
    #[default]
    North,
    West,
    South,
    East,
}

impl Heading {
    const ALL: [Heading; 4] = [Heading::North, Heading::West, Heading::South, Heading::East];

    /// Counter-clockwise quarter turns away from north.
    pub fn quarter_turns(self) -> u8 {
        match self {
            Self::North => 0,
            Self::West => 1,
            Self::South => 2,
            Self::East => 3,
        }
    }

    pub fn from_quarter_turns(turns: i32) -> Self {
        Self::ALL[turns.rem_euclid(4) as usize]
    }

    pub fn degrees(self) -> u16 {
        u16::from(self.quarter_turns()) * 90
    }

    pub fn rotate_left(self) -> Self {
        Self::from_quarter_turns(i32::from(self.quarter_turns()) + 1)
    }

    pub fn rotate_right(self) -> Self {
        Self::from_quarter_turns(i32::from(self.quarter_turns()) - 1)
    }

    /// Unit lattice step for this heading. North is `(0, +1)`.
    ///
    /// Computed by rotating the north vector and rounding, so the float
    /// error of the rotation never leaks into cell coordinates.
    pub fn forward(self) -> IVec2 {
        let angle = f32::from(self.quarter_turns()) * std::f32::consts::FRAC_PI_2;
        Vec2::from_angle(angle).rotate(Vec2::Y).round().as_ivec2()
    }
}

/// The kind of a world object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Robot,
    Box,
    Shelf,
}

impl ObjectKind {
    pub fn default_color(self) -> Color {
        match self {
            Self::Robot => Color::BLUE,
            Self::Box => Color::RED,
            Self::Shelf => Color::GREEN,
        }
    }

    /// Boxes stack on shelves and shelves go under boxes; nothing else combines.
    pub fn complement(self) -> Option<Self> {
        match self {
            Self::Box => Some(Self::Shelf),
            Self::Shelf => Some(Self::Box),
            Self::Robot => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Robot => "robot",
            Self::Box => "box",
            Self::Shelf => "shelf",
        };
        f.write_str(name)
    }
}

impl FromStr for ObjectKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "robot" => Ok(Self::Robot),
            "box" => Ok(Self::Box),
            "shelf" => Ok(Self::Shelf),
            other => Err(ParseError::ObjectKind(other.to_string())),
        }
    }
}

/// Display color. Has no behavioral effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLUE: Color = Color { r: 0, g: 0, b: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const GREEN: Color = Color { r: 0, g: 128, b: 0 };
}

/// A discrete command addressed to a single robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotCommand {
    RotateLeft,
    RotateRight,
    Forward,
    Backward,
    Grab,
    Place,
}

impl RobotCommand {
    /// Rotation and translation hold the robot for the motion lock; grab and place complete immediately.
    pub fn engages_motion_lock(self) -> bool {
        !matches!(self, Self::Grab | Self::Place)
    }
}

impl fmt::Display for RobotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RotateLeft => "rotate_left",
            Self::RotateRight => "rotate_right",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Grab => "grab",
            Self::Place => "place",
        };
        f.write_str(name)
    }
}

impl FromStr for RobotCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rotate_left" => Ok(Self::RotateLeft),
            "rotate_right" => Ok(Self::RotateRight),
            "forward" => Ok(Self::Forward),
            "backward" => Ok(Self::Backward),
            "grab" => Ok(Self::Grab),
            "place" => Ok(Self::Place),
            other => Err(ParseError::Command(other.to_string())),
        }
    }
}

/// Errors from parsing textual names of shared types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown object kind: {0}")]
    ObjectKind(String),
    #[error("unknown robot command: {0}")]
    Command(String),
    #[error("invalid entity id: {0}")]
    EntityId(String),
}
