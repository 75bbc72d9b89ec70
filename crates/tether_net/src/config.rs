//! Tunables for prediction, reconciliation and interpolation

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tether_core::math::{Aabb, Vec2};

/// Synchronization settings.
///
/// Every field has a default, so a settings file may specify any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local player movement speed in units per second.
    pub move_speed: f32,
    /// Playable area; predicted positions are clamped into it.
    pub world_bounds: Aabb,
    /// Half size of the local player's collision box.
    pub player_half_extents: Vec2,
    /// Maximum number of unacknowledged inputs kept for replay.
    pub history_capacity: usize,
    /// Minimum time between two outgoing input packets.
    pub min_send_interval_ms: u64,
    /// Position error (units) under which a prediction is accepted as is.
    pub snap_threshold: f32,
    /// Position error (units) above which history is discarded and the
    /// player is snapped to the server position.
    pub desync_threshold: f32,
    /// Seconds taken to glide a remote entity to its latest snapshot position.
    pub interpolation_duration: f32,
}

impl SyncConfig {
    pub fn min_send_interval(&self) -> Duration {
        Duration::from_millis(self.min_send_interval_ms)
    }

    pub fn snap_threshold_sq(&self) -> f32 {
        self.snap_threshold * self.snap_threshold
    }

    pub fn desync_threshold_sq(&self) -> f32 {
        self.desync_threshold * self.desync_threshold
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            move_speed: 200.0,
            world_bounds: Aabb::new(Vec2::ZERO, Vec2::new(1280.0, 720.0)),
            player_half_extents: Vec2::splat(16.0),
            history_capacity: 120,
            min_send_interval_ms: 30,
            snap_threshold: 2.0,
            desync_threshold: 100.0,
            interpolation_duration: 0.1,
        }
    }
}
