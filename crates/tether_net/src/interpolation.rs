//! Remote entity interpolation
//!
//! Remote entities are never predicted. Each snapshot gives a new target
//! position and the rendered `Position` glides from wherever it currently
//! is to that target over a fixed window.

use tether_core::define_component;
use tether_core::ecs::{Entity, World, WorldError};
use tether_core::math::Vec2;

use crate::components::{LocalPlayer, Position};

/// Per-entity interpolation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationState {
    pub prev: Vec2,
    pub target: Vec2,
    pub elapsed: f32,
    pub duration: f32,
}
define_component!(InterpolationState, "InterpolationState");

impl InterpolationState {
    /// A window that has already arrived at `at`.
    pub fn settled(at: Vec2, duration: f32) -> Self {
        Self {
            prev: at,
            target: at,
            elapsed: duration,
            duration,
        }
    }

    /// Progress through the window, clamped to [0, 1].
    pub fn t(&self) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / self.duration).clamp(0.0, 1.0)
    }

    /// Position at the current progress.
    pub fn sample(&self) -> Vec2 {
        self.prev.lerp(self.target, self.t())
    }

    /// Start a new window from the currently rendered position.
    ///
    /// Baselining on `rendered` rather than the old target keeps a snapshot
    /// that lands mid-window from jumping the entity backwards.
    pub fn retarget(&mut self, rendered: Vec2, target: Vec2) {
        self.prev = rendered;
        self.target = target;
        self.elapsed = 0.0;
    }

    pub fn advance(&mut self, dt: f32) -> Vec2 {
        self.elapsed += dt;
        self.sample()
    }
}

/// Advances every interpolated entity each simulation step.
pub struct InterpolationEngine {
    duration: f32,
}

impl InterpolationEngine {
    pub fn new(duration: f32) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Arm interpolation for `target`, creating the state on first sight.
    ///
    /// A fresh entity starts settled at `target`; a known one glides from its
    /// rendered position.
    pub fn arm(&self, world: &mut World, entity: Entity, target: Vec2) -> Result<(), WorldError> {
        if world.has_component::<InterpolationState>(entity) {
            let rendered = world
                .get_component::<Position>(entity)
                .map(|p| p.0)
                .unwrap_or(target);
            world
                .get_component_mut::<InterpolationState>(entity)?
                .retarget(rendered, target);
        } else {
            world.add_component(entity, InterpolationState::settled(target, self.duration))?;
            world.add_component(entity, Position(target))?;
        }
        Ok(())
    }

    /// Step every interpolated, non-local entity by `dt` and write its
    /// rendered position.
    pub fn advance(&self, world: &mut World, dt: f32) -> usize {
        let mut moved = 0;
        for entity in world.query_all::<InterpolationState>() {
            if world.has_component::<LocalPlayer>(entity) {
                continue;
            }
            let Ok(state) = world.get_component_mut::<InterpolationState>(entity) else {
                continue;
            };
            let rendered = state.advance(dt);
            if let Ok(pos) = world.get_component_mut::<Position>(entity) {
                pos.0 = rendered;
                moved += 1;
            }
        }
        tracing::trace!(moved, dt, "interpolation advanced");
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(prev: Vec2, target: Vec2) -> InterpolationState {
        InterpolationState {
            prev,
            target,
            elapsed: 0.0,
            duration: 0.5,
        }
    }

    #[test]
    fn test_endpoints() {
        let mut s = window(Vec2::new(0.0, 0.0), Vec2::new(10.0, 20.0));
        assert_eq!(s.sample(), s.prev);
        s.elapsed = 0.5;
        assert_eq!(s.sample(), s.target);
        s.elapsed = 5.0;
        assert_eq!(s.sample(), s.target);
    }

    #[test]
    fn test_samples_stay_on_segment() {
        let prev = Vec2::new(-4.0, 3.0);
        let target = Vec2::new(12.0, -9.0);
        let mut s = window(prev, target);
        let seg = target - prev;
        for _ in 0..20 {
            let p = s.advance(0.013);
            let along = (p - prev).dot(seg) / seg.length_squared();
            assert!((-1e-5..=1.0 + 1e-5).contains(&along));
            let off_line = (p - prev).perp_dot(seg).abs() / seg.length();
            assert!(off_line < 1e-4, "point {p} left the segment");
        }
    }

    #[test]
    fn test_retarget_uses_rendered_position() {
        let mut s = window(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let mid = s.advance(0.25);
        assert_eq!(mid, Vec2::new(5.0, 0.0));

        s.retarget(mid, Vec2::new(20.0, 0.0));
        assert_eq!(s.elapsed, 0.0);
        assert_eq!(s.sample(), mid);
    }

    #[test]
    fn test_engine_skips_local_player() {
        let engine = InterpolationEngine::new(0.5);
        let mut world = World::new();
        let remote = world.create();
        let local = world.create();
        engine.arm(&mut world, remote, Vec2::ZERO).unwrap();
        engine.arm(&mut world, local, Vec2::ZERO).unwrap();
        world.add_component(local, LocalPlayer).unwrap();

        engine.arm(&mut world, remote, Vec2::new(10.0, 0.0)).unwrap();
        engine.arm(&mut world, local, Vec2::new(10.0, 0.0)).unwrap();
        assert_eq!(engine.advance(&mut world, 0.25), 1);

        assert_eq!(world.get_component::<Position>(remote).unwrap().0, Vec2::new(5.0, 0.0));
        assert_eq!(world.get_component::<Position>(local).unwrap().0, Vec2::ZERO);
    }

    #[test]
    fn test_zero_duration_jumps() {
        let s = InterpolationState {
            prev: Vec2::ZERO,
            target: Vec2::ONE,
            elapsed: 0.0,
            duration: 0.0,
        };
        assert_eq!(s.sample(), Vec2::ONE);
    }
}
