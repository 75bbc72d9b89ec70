// world.rs - Entity registry owning one sparse store per component type

use crate::ecs::storage::ErasedStore;
use crate::ecs::{Component, ComponentStore, Entity};
use std::any::TypeId;
use std::collections::HashMap;
use thiserror::Error;

/// Errors reported by component access on the [`World`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("entity {entity} is not alive")]
    DeadEntity { entity: Entity },

    #[error("entity {entity} has no {component} component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
}

/// The entity registry: allocates handles and owns every component store.
pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: Vec<u32>,
    live: usize,
    stores: HashMap<TypeId, Box<dyn ErasedStore>>,
}

impl World {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free: Vec::new(),
            live: 0,
            stores: HashMap::new(),
        }
    }

    /// Allocate a fresh entity handle with no components.
    ///
    /// Destroyed slots are recycled; the recycled handle carries the bumped
    /// generation so stale copies of the old handle stop resolving.
    pub fn create(&mut self) -> Entity {
        let index = match self.free.pop() {
            Some(index) => {
                self.alive[index as usize] = true;
                index
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.alive.push(true);
                index
            }
        };
        self.live += 1;
        let entity = Entity::new(index, self.generations[index as usize]);
        tracing::trace!(%entity, "entity created");
        entity
    }

    /// Destroy an entity: clear it from every store and retire the handle.
    ///
    /// Returns false if the handle was already dead.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let index = entity.index() as usize;
        for store in self.stores.values_mut() {
            store.erase(index);
        }
        self.alive[index] = false;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free.push(entity.index());
        self.live -= 1;
        tracing::trace!(%entity, "entity destroyed");
        true
    }

    /// Whether the handle refers to a live entity of the current generation.
    pub fn is_alive(&self, entity: Entity) -> bool {
        let index = entity.index() as usize;
        self.alive.get(index).copied().unwrap_or(false)
            && self.generations[index] == entity.generation()
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.live
    }

    fn check_alive(&self, entity: Entity) -> Result<(), WorldError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(WorldError::DeadEntity { entity })
        }
    }

    /// Read-only view of the store for `T`, if any value of `T` was ever added.
    pub fn store<T: Component>(&self) -> Option<&ComponentStore<T>> {
        self.stores
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<ComponentStore<T>>())
    }

    fn store_mut<T: Component>(&mut self) -> Option<&mut ComponentStore<T>> {
        self.stores
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<ComponentStore<T>>())
    }

    fn store_or_insert<T: Component>(&mut self) -> &mut ComponentStore<T> {
        self.stores
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(ComponentStore::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentStore<T>>()
            .expect("store registered under a foreign TypeId")
    }

    /// Attach `value` to `entity`, replacing (and returning) any previous value.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<Option<T>, WorldError> {
        self.check_alive(entity)?;
        Ok(self
            .store_or_insert::<T>()
            .insert(entity.index() as usize, value))
    }

    /// Borrow the `T` attached to `entity`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, WorldError> {
        self.check_alive(entity)?;
        self.store::<T>()
            .and_then(|s| s.get(entity.index() as usize))
            .ok_or(WorldError::MissingComponent {
                entity,
                component: T::NAME,
            })
    }

    /// Mutably borrow the `T` attached to `entity`.
    pub fn get_component_mut<T: Component>(
        &mut self,
        entity: Entity,
    ) -> Result<&mut T, WorldError> {
        self.check_alive(entity)?;
        self.store_mut::<T>()
            .and_then(|s| s.get_mut(entity.index() as usize))
            .ok_or(WorldError::MissingComponent {
                entity,
                component: T::NAME,
            })
    }

    /// Whether `entity` is alive and currently has a `T`.
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.is_alive(entity)
            && self
                .store::<T>()
                .is_some_and(|s| s.contains(entity.index() as usize))
    }

    /// Detach the `T` from `entity`. Absent components and dead handles are a no-op.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.is_alive(entity) {
            return None;
        }
        self.store_mut::<T>()?.remove(entity.index() as usize)
    }

    /// Every live entity holding a `T`, in storage order.
    ///
    /// Storage order is slot order, not creation order; callers must not rely
    /// on the order matching across component types.
    pub fn query_all<T: Component>(&self) -> Vec<Entity> {
        let Some(store) = self.store::<T>() else {
            return Vec::new();
        };
        store
            .indices()
            .filter(|&i| self.alive.get(i).copied().unwrap_or(false))
            .map(|i| Entity::new(i as u32, self.generations[i]))
            .collect()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::define_component;

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    define_component!(Position, "Position");

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }
    define_component!(Velocity, "Velocity");

    #[derive(Clone, Copy, Debug, PartialEq)]
    struct Health {
        value: u16,
    }
    define_component!(Health, "Health");

    #[test]
    fn test_add_get_remove() {
        let mut world = World::new();
        let e = world.create();

        world
            .add_component(e, Position { x: 1.0, y: 2.0 })
            .unwrap();
        assert!(world.has_component::<Position>(e));
        assert!(!world.has_component::<Velocity>(e));
        assert_eq!(
            world.get_component::<Position>(e).unwrap(),
            &Position { x: 1.0, y: 2.0 }
        );

        world.get_component_mut::<Position>(e).unwrap().x = 5.0;
        assert_eq!(world.get_component::<Position>(e).unwrap().x, 5.0);

        assert!(world.remove_component::<Position>(e).is_some());
        assert!(world.remove_component::<Position>(e).is_none());
        assert!(!world.has_component::<Position>(e));
    }

    #[test]
    fn test_missing_component_error() {
        let mut world = World::new();
        let e = world.create();
        let err = world.get_component::<Velocity>(e).unwrap_err();
        assert_eq!(
            err,
            WorldError::MissingComponent {
                entity: e,
                component: "Velocity"
            }
        );
        assert_eq!(err.to_string(), format!("entity {e} has no Velocity component"));
    }

    #[test]
    fn test_destroy_clears_components_and_recycles() {
        let mut world = World::new();
        let a = world.create();
        world.add_component(a, Position { x: 0.0, y: 0.0 }).unwrap();
        world.add_component(a, Health { value: 3 }).unwrap();

        assert!(world.destroy(a));
        assert!(!world.destroy(a));
        assert!(!world.is_alive(a));
        assert_eq!(
            world.get_component::<Position>(a),
            Err(WorldError::DeadEntity { entity: a })
        );

        let b = world.create();
        assert_eq!(b.index(), a.index());
        assert_ne!(b.generation(), a.generation());
        assert!(!world.has_component::<Position>(b));
        assert!(!world.has_component::<Health>(b));
        assert!(world.add_component(a, Health { value: 1 }).is_err());
        assert_eq!(world.live_count(), 1);
    }

    #[test]
    fn test_query_all_skips_holes() {
        let mut world = World::new();
        let entities: Vec<_> = (0..6).map(|_| world.create()).collect();
        for e in entities.iter().step_by(2) {
            world.add_component(*e, Velocity { x: 1.0, y: 0.0 }).unwrap();
        }
        world.destroy(entities[2]);

        let with_velocity = world.query_all::<Velocity>();
        assert_eq!(with_velocity, vec![entities[0], entities[4]]);
        assert!(world.query_all::<Health>().is_empty());
    }

    #[test]
    fn test_far_entity_growth_preserves_earlier_components() {
        let mut world = World::new();
        let first = world.create();
        world.add_component(first, Health { value: 7 }).unwrap();

        let mut last = first;
        for _ in 0..300 {
            last = world.create();
        }
        world.add_component(last, Health { value: 9 }).unwrap();

        assert_eq!(world.get_component::<Health>(first).unwrap().value, 7);
        assert_eq!(world.get_component::<Health>(last).unwrap().value, 9);
        assert_eq!(world.query_all::<Health>(), vec![first, last]);
    }
}
