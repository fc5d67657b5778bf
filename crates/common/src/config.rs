use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable simulation parameters.
///
/// Every field has a default, so a partial YAML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// How long a robot stays locked after a rotation or a move.
    pub motion_lock_ms: u64,
    /// Quiet period after the last mutation before a snapshot is captured.
    pub capture_debounce_ms: u64,
    /// Height of a shelf's top surface above the floor.
    pub shelf_height: f32,
    /// Extra lift applied to a box resting on a shelf.
    pub stack_offset: f32,
    /// Stride of the raster scan used by `spawn`.
    pub spawn_spacing: u8,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            motion_lock_ms: 200,
            capture_debounce_ms: 100,
            shelf_height: 1.0,
            stack_offset: 0.3,
            spawn_spacing: 1,
        }
    }
}

impl SimConfig {
    pub fn motion_lock(&self) -> Duration {
        Duration::from_millis(self.motion_lock_ms)
    }

    pub fn capture_debounce(&self) -> Duration {
        Duration::from_millis(self.capture_debounce_ms)
    }

    /// Vertical offset of a box stacked on a shelf.
    pub fn stacked_elevation(&self) -> f32 {
        self.shelf_height + self.stack_offset
    }
}
