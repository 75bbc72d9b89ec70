//! Tether Core
//!
//! Contains the shared world representation for the client:
//! - Entity Component System (sparse, index-addressed component stores)
//! - Fixed-step simulation clock
//! - 2D math helpers (glam re-export, axis-aligned boxes)

pub mod ecs;
pub mod math;
pub mod time;

pub use glam;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
