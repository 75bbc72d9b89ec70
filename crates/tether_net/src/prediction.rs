//! Local player prediction
//!
//! The local player moves as soon as input is sampled, without waiting for
//! the server. Movement is a pure function of (position, input, dt); live
//! prediction additionally pushes the player out of static colliders.

use tether_core::ecs::{Entity, World, WorldError};
use tether_core::math::{Aabb, Vec2};

use crate::components::{Collider, LocalPlayer, Position, Velocity};
use crate::config::SyncConfig;
use crate::protocol::InputBits;

/// The movement rule shared by live prediction and reconciliation replay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementModel {
    pub speed: f32,
    pub bounds: Aabb,
    pub half_extents: Vec2,
}

impl MovementModel {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            speed: config.move_speed,
            bounds: config.world_bounds,
            half_extents: config.player_half_extents,
        }
    }

    pub fn velocity(&self, bits: InputBits) -> Vec2 {
        bits.direction() * self.speed
    }

    /// Move and clamp to the world bounds. No collision.
    pub fn step(&self, from: Vec2, bits: InputBits, dt: f32) -> Vec2 {
        self.bounds.clamp_point(from + self.velocity(bits) * dt)
    }

    /// Push `pos` out of every overlapping obstacle along the axis of least
    /// penetration, so a slight overlap on both axes never blocks movement.
    pub fn resolve(&self, mut pos: Vec2, obstacles: &[Aabb]) -> Vec2 {
        for obstacle in obstacles {
            let body = Aabb::from_center(pos, self.half_extents);
            if !body.overlaps(obstacle) {
                continue;
            }
            let push_left = body.max.x - obstacle.min.x;
            let push_right = obstacle.max.x - body.min.x;
            let push_up = body.max.y - obstacle.min.y;
            let push_down = obstacle.max.y - body.min.y;

            let least = push_left.min(push_right).min(push_up).min(push_down);
            if least == push_left {
                pos.x -= push_left;
            } else if least == push_right {
                pos.x += push_right;
            } else if least == push_up {
                pos.y -= push_up;
            } else {
                pos.y += push_down;
            }
        }
        pos
    }
}

/// Advances the local player and tracks the latest predicted position.
pub struct PredictionEngine {
    model: MovementModel,
    tracked: Vec2,
    colliders: Vec<Aabb>,
}

impl PredictionEngine {
    pub fn new(model: MovementModel) -> Self {
        Self {
            model,
            tracked: Vec2::ZERO,
            colliders: Vec::new(),
        }
    }

    pub fn model(&self) -> &MovementModel {
        &self.model
    }

    /// Latest predicted position, updated on every step and correction.
    pub fn tracked(&self) -> Vec2 {
        self.tracked
    }

    /// Overwrite the tracked position (first sight, snaps and replays).
    pub fn set_tracked(&mut self, pos: Vec2) {
        self.tracked = pos;
    }

    /// Advance `player` by one step and commit the resolved position.
    ///
    /// Returns the position after obstacle resolution, which is what the
    /// step's history record must hold.
    pub fn advance(
        &mut self,
        world: &mut World,
        player: Entity,
        bits: InputBits,
        dt: f32,
    ) -> Result<Vec2, WorldError> {
        let current = world.get_component::<Position>(player)?.0;
        let candidate = self.model.step(current, bits, dt);

        self.colliders.clear();
        for e in world.query_all::<Collider>() {
            if e == player || world.has_component::<LocalPlayer>(e) {
                continue;
            }
            let (Ok(collider), Ok(pos)) = (
                world.get_component::<Collider>(e),
                world.get_component::<Position>(e),
            ) else {
                continue;
            };
            self.colliders.push(collider.bounds_at(pos.0));
        }
        let resolved = self.model.resolve(candidate, &self.colliders);

        world.get_component_mut::<Position>(player)?.0 = resolved;
        if let Ok(velocity) = world.get_component_mut::<Velocity>(player) {
            velocity.0 = self.model.velocity(bits);
        }
        self.tracked = resolved;

        tracing::trace!(
            from = %current,
            to = %resolved,
            bits = bits.bits(),
            "local player predicted"
        );
        Ok(resolved)
    }
}
