//! Entity Component System core types.
//!
//! Components live in one sparse [`ComponentStore`] per type, addressed
//! directly by the entity's slot index. Slots may be empty anywhere in a
//! store; growing a store never moves populated slots and removing a
//! component never shrinks it, so an index stays valid for the whole run.
//! The [`World`] owns every store and is the only way callers reach them.

mod component;
mod entity;
mod storage;
mod world;

pub use component::Component;
pub use entity::Entity;
pub use storage::ComponentStore;
pub use world::{World, WorldError};
