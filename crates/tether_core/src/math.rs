//! 2D math utilities
//!
//! Re-exports glam with the box type used for world bounds and colliders

pub use glam::*;

use serde::{Deserialize, Serialize};

/// Axis-aligned box given by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Strict overlap test; boxes that merely touch do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Clamp a point into the box.
    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_strict() {
        let a = Aabb::from_center(Vec2::ZERO, Vec2::splat(1.0));
        let touching = Aabb::from_center(Vec2::new(2.0, 0.0), Vec2::splat(1.0));
        let inside = Aabb::from_center(Vec2::new(1.5, 0.5), Vec2::splat(1.0));
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
    }

    #[test]
    fn test_clamp_point() {
        let bounds = Aabb::new(Vec2::ZERO, Vec2::new(1280.0, 720.0));
        assert_eq!(bounds.clamp_point(Vec2::new(-5.0, 800.0)), Vec2::new(0.0, 720.0));
        assert_eq!(bounds.clamp_point(Vec2::new(640.0, 360.0)), Vec2::new(640.0, 360.0));
    }
}
