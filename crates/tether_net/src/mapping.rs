//! Wire identifier to local entity mapping
//!
//! The server recycles entity identifiers, so a mapping is never trusted
//! on its own: every lookup re-checks that the local entity is alive and
//! still carries the component set of the kind the mapping was made for.

use std::collections::HashMap;
use tether_core::ecs::{Entity, World};

use crate::components;
use crate::protocol::{BulletKind, EntityKind};

/// Where the local entity behind a mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Created by the mapper for this wire id; destroyed with the mapping.
    Spawned,
    /// Authored by the level and bound by uid; survives a kind change.
    Level,
}

/// One wire id's binding to a local entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub local: Entity,
    pub expected_kind: EntityKind,
    pub origin: Origin,
    /// Sub-type recorded when a bullet was created.
    pub bullet_kind: Option<BulletKind>,
    /// Dependent label entity, destroyed together with `local`.
    pub nameplate: Option<Entity>,
}

/// Why an existing mapping can no longer be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    KindChanged { from: EntityKind, to: EntityKind },
    EntityDead,
    ComponentMismatch,
}

/// Result of validating a wire id against the kind it is declared as this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Unmapped,
    Valid(Mapping),
    Stale { mapping: Mapping, reason: StaleReason },
}

/// Bidirectional wire id <-> entity association.
#[derive(Default)]
pub struct NetworkEntityMap {
    by_wire: HashMap<u32, Mapping>,
    by_local: HashMap<Entity, u32>,
}

impl NetworkEntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `wire` to `mapping.local`, replacing any earlier binding of either side.
    pub fn insert(&mut self, wire: u32, mapping: Mapping) {
        if let Some(previous_wire) = self.by_local.get(&mapping.local).copied() {
            if previous_wire != wire {
                self.by_wire.remove(&previous_wire);
            }
        }
        if let Some(previous) = self.by_wire.insert(wire, mapping) {
            if previous.local != mapping.local {
                self.by_local.remove(&previous.local);
            }
        }
        self.by_local.insert(mapping.local, wire);
    }

    pub fn get(&self, wire: u32) -> Option<&Mapping> {
        self.by_wire.get(&wire)
    }

    pub fn wire_of(&self, local: Entity) -> Option<u32> {
        self.by_local.get(&local).copied()
    }

    pub fn evict(&mut self, wire: u32) -> Option<Mapping> {
        let mapping = self.by_wire.remove(&wire)?;
        if self.by_local.get(&mapping.local) == Some(&wire) {
            self.by_local.remove(&mapping.local);
        }
        Some(mapping)
    }

    /// Check the mapping for `wire` against the kind declared this tick.
    pub fn validate(&self, world: &World, wire: u32, declared: EntityKind) -> Lookup {
        let Some(&mapping) = self.by_wire.get(&wire) else {
            return Lookup::Unmapped;
        };
        let reason = if mapping.expected_kind != declared {
            StaleReason::KindChanged {
                from: mapping.expected_kind,
                to: declared,
            }
        } else if !world.is_alive(mapping.local) {
            StaleReason::EntityDead
        } else if !components::conforms(world, mapping.local, declared) {
            StaleReason::ComponentMismatch
        } else {
            return Lookup::Valid(mapping);
        };
        Lookup::Stale { mapping, reason }
    }

    /// Mapped wire ids, in no particular order.
    pub fn wire_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.by_wire.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.by_wire.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_wire.is_empty()
    }
}
