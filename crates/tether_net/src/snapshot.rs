//! Snapshot application
//!
//! Each `StateUpdate` lists every entity the server currently considers
//! relevant; an id missing from the list has been destroyed. The mapper
//! turns that list into entity creation, update and destruction, and
//! never lets a recycled wire id keep the components of what it used to be.

use std::collections::{HashMap, HashSet};
use tether_core::ecs::{Entity, World, WorldError};
use tether_core::math::Vec2;

use crate::components::{
    self, Boss, Bullet, Collider, Enemy, Health, LocalPlayer, Nameplate, Obstacle, Player,
    Position, Powerup, Score, Velocity,
};
use crate::interpolation::InterpolationEngine;
use crate::mapping::{Lookup, Mapping, NetworkEntityMap, Origin};
use crate::protocol::{BulletKind, EntityKind, EntityState, StateUpdate};
use crate::SyncError;

/// Where a nameplate sits relative to its owner.
pub const NAMEPLATE_OFFSET: Vec2 = Vec2::new(0.0, -24.0);

/// What one `apply` call changed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SnapshotReport {
    pub tick: u32,
    /// New wire id bindings (fresh entities or level obstacles).
    pub mapped: usize,
    /// Existing bindings refreshed in place.
    pub updated: usize,
    /// Bindings removed because the id left the snapshot.
    pub despawned: usize,
    /// Stale bindings evicted (kind change, re-typed bullet, scrubbed entity).
    pub evicted: usize,
    /// States dropped as malformed or unresolvable.
    pub skipped: usize,
    /// Set when the local player entity was created this update.
    pub local_spawned_at: Option<Vec2>,
}

impl SnapshotReport {
    /// Whether the update created or destroyed anything.
    pub fn churned(&self) -> bool {
        self.mapped + self.despawned + self.evicted > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    AwaitingFirst,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Release {
    /// The id left the snapshot: the entity is gone.
    Absent,
    /// The id now names something else: drop what we built for it.
    Replaced,
}

/// Applies server snapshots to the world.
pub struct SnapshotMapper {
    map: NetworkEntityMap,
    level_obstacles: HashMap<u64, Entity>,
    local_player_hash: u64,
    local_player: Option<Entity>,
    stream: StreamState,
    reported: HashSet<(u8, u8)>,
    present: HashSet<u32>,
}

impl SnapshotMapper {
    pub fn new(local_player_hash: u64) -> Self {
        Self {
            map: NetworkEntityMap::new(),
            level_obstacles: HashMap::new(),
            local_player_hash,
            local_player: None,
            stream: StreamState::AwaitingFirst,
            reported: HashSet::new(),
            present: HashSet::new(),
        }
    }

    pub fn local_player(&self) -> Option<Entity> {
        self.local_player
    }

    pub fn local_player_hash(&self) -> u64 {
        self.local_player_hash
    }

    pub fn map(&self) -> &NetworkEntityMap {
        &self.map
    }

    /// Local entity currently bound to `wire`, without validation.
    pub fn entity_for(&self, wire: u32) -> Option<Entity> {
        self.map.get(wire).map(|m| m.local)
    }

    /// Create the locally-authored obstacle that server obstacle states with
    /// `owner_id == uid` bind to.
    pub fn register_level_obstacle(
        &mut self,
        world: &mut World,
        uid: u64,
        center: Vec2,
        half_extents: Vec2,
    ) -> Result<Entity, WorldError> {
        let e = world.create();
        world.add_component(e, Position(center))?;
        world.add_component(e, Collider { half_extents })?;
        world.add_component(e, Obstacle { uid })?;
        world.add_component(e, Health(u16::MAX))?;
        if let Some(old) = self.level_obstacles.insert(uid, e) {
            tracing::warn!(uid, %old, "level obstacle uid registered twice, replacing");
            if let Some(wire) = self.map.wire_of(old) {
                self.map.evict(wire);
            }
            world.destroy(old);
        }
        Ok(e)
    }

    /// Apply one full snapshot.
    pub fn apply(
        &mut self,
        world: &mut World,
        update: &StateUpdate,
        interpolation: &InterpolationEngine,
    ) -> SnapshotReport {
        let mut report = SnapshotReport {
            tick: update.tick,
            ..Default::default()
        };
        if self.stream == StreamState::AwaitingFirst {
            tracing::info!(
                tick = update.tick,
                entities = update.entities.len(),
                "first snapshot received"
            );
            self.stream = StreamState::Streaming;
        }

        self.present.clear();
        for state in &update.entities {
            if !self.present.insert(state.entity_id) {
                tracing::warn!(id = state.entity_id, tick = update.tick, "duplicate entity id in snapshot");
                report.skipped += 1;
                continue;
            }
            self.apply_state(world, state, interpolation, &mut report);
        }

        let absent: Vec<u32> = self
            .map
            .wire_ids()
            .filter(|id| !self.present.contains(id))
            .collect();
        for id in absent {
            if self.release(world, id, Release::Absent).is_some() {
                tracing::debug!(id, "entity left snapshot, destroyed");
                report.despawned += 1;
            }
        }

        tracing::trace!(?report, "snapshot applied");
        report
    }

    fn apply_state(
        &mut self,
        world: &mut World,
        state: &EntityState,
        interpolation: &InterpolationEngine,
        report: &mut SnapshotReport,
    ) {
        let id = state.entity_id;
        let kind = match EntityKind::try_from(state.entity_type) {
            Ok(kind) => kind,
            Err(err) => return self.reject(world, state, err, report),
        };
        let bullet_kind = if kind == EntityKind::Bullet {
            match BulletKind::try_from(state.flags) {
                Ok(bk) => Some(bk),
                Err(err) => return self.reject(world, state, err, report),
            }
        } else {
            None
        };

        match self.map.validate(world, id, kind) {
            Lookup::Valid(mapping) if mapping.bullet_kind != bullet_kind => {
                tracing::debug!(
                    id,
                    from = ?mapping.bullet_kind,
                    to = ?bullet_kind,
                    "bullet sub-type changed, id reused"
                );
                self.release(world, id, Release::Replaced);
                report.evicted += 1;
            }
            Lookup::Valid(mapping) => {
                match self.refresh(world, &mapping, state, interpolation) {
                    Ok(()) => report.updated += 1,
                    Err(err) => {
                        tracing::warn!(id, %err, "entity update dropped");
                        report.skipped += 1;
                    }
                }
                return;
            }
            Lookup::Stale { mapping, reason } => {
                tracing::debug!(id, local = %mapping.local, ?reason, "stale mapping evicted");
                self.release(world, id, Release::Replaced);
                report.evicted += 1;
            }
            Lookup::Unmapped => {}
        }

        match self.spawn(world, state, kind, bullet_kind, interpolation, report) {
            Ok(mapping) => {
                tracing::debug!(id, ?kind, local = %mapping.local, "entity mapped");
                self.map.insert(id, mapping);
                report.mapped += 1;
            }
            Err(err) => {
                tracing::warn!(id, ?kind, %err, "entity state dropped");
                report.skipped += 1;
            }
        }
    }

    /// Drop a malformed state. An id that was mapped must not keep its old
    /// components under a declaration we cannot read, so its binding goes too.
    fn reject(
        &mut self,
        world: &mut World,
        state: &EntityState,
        err: SyncError,
        report: &mut SnapshotReport,
    ) {
        if self.reported.insert((state.entity_type, state.flags)) {
            tracing::warn!(id = state.entity_id, %err, "malformed entity state skipped");
        } else {
            tracing::debug!(id = state.entity_id, %err, "malformed entity state skipped");
        }
        if self.release(world, state.entity_id, Release::Replaced).is_some() {
            report.evicted += 1;
        }
        report.skipped += 1;
    }

    fn release(&mut self, world: &mut World, wire: u32, mode: Release) -> Option<Mapping> {
        let mapping = self.map.evict(wire)?;
        if let Some(plate) = mapping.nameplate {
            world.destroy(plate);
        }
        if self.local_player == Some(mapping.local) {
            tracing::info!(id = wire, "local player entity released");
            self.local_player = None;
        }
        match (mapping.origin, mode) {
            (Origin::Level, Release::Replaced) => {
                components::scrub(world, mapping.local, EntityKind::Obstacle);
            }
            (Origin::Level, Release::Absent) => {
                self.level_obstacles.retain(|_, e| *e != mapping.local);
                world.destroy(mapping.local);
            }
            (Origin::Spawned, _) => {
                world.destroy(mapping.local);
            }
        }
        Some(mapping)
    }

    fn spawn(
        &mut self,
        world: &mut World,
        state: &EntityState,
        kind: EntityKind,
        bullet_kind: Option<BulletKind>,
        interpolation: &InterpolationEngine,
        report: &mut SnapshotReport,
    ) -> Result<Mapping, SyncError> {
        if kind == EntityKind::Obstacle {
            return self.bind_obstacle(world, state);
        }
        let e = world.create();
        match self.populate(world, e, state, kind, bullet_kind, interpolation) {
            Ok(mapping) => {
                if world.has_component::<LocalPlayer>(e) {
                    if let Some(previous) = self.local_player.replace(e) {
                        tracing::warn!(%previous, current = %e, "local player replaced");
                    }
                    report.local_spawned_at = Some(state.position());
                }
                Ok(mapping)
            }
            Err(err) => {
                world.destroy(e);
                Err(err)
            }
        }
    }

    fn populate(
        &self,
        world: &mut World,
        e: Entity,
        state: &EntityState,
        kind: EntityKind,
        bullet_kind: Option<BulletKind>,
        interpolation: &InterpolationEngine,
    ) -> Result<Mapping, SyncError> {
        let pos = state.position();
        world.add_component(e, Position(pos))?;
        match (kind, bullet_kind) {
            (EntityKind::Player, _) => {
                world.add_component(e, Velocity(state.velocity()))?;
                world.add_component(e, Health(state.health))?;
                world.add_component(e, Score(state.score))?;
                world.add_component(
                    e,
                    Player {
                        hash: state.owner_id,
                        flags: state.flags,
                    },
                )?;
            }
            (EntityKind::Enemy, _) => {
                world.add_component(e, Velocity(state.velocity()))?;
                world.add_component(e, Health(state.health))?;
                world.add_component(e, Enemy { flags: state.flags })?;
            }
            (EntityKind::Boss, _) => {
                world.add_component(e, Velocity(state.velocity()))?;
                world.add_component(e, Health(state.health))?;
                world.add_component(e, Boss { flags: state.flags })?;
            }
            (EntityKind::Bullet, Some(bk)) => {
                world.add_component(e, Velocity(state.velocity()))?;
                world.add_component(
                    e,
                    Bullet {
                        kind: bk,
                        owner: state.owner_id,
                    },
                )?;
            }
            (EntityKind::Bullet, None) => return Err(SyncError::UnknownBulletKind(state.flags)),
            (EntityKind::Powerup, _) => {
                world.add_component(e, Powerup { flags: state.flags })?;
            }
            (EntityKind::Obstacle, _) => {
                return Err(SyncError::MissingLevelObstacle {
                    uid: state.owner_id,
                })
            }
        }

        let is_local = kind == EntityKind::Player && state.owner_id == self.local_player_hash;
        if is_local {
            world.add_component(e, LocalPlayer)?;
        } else {
            interpolation.arm(world, e, pos)?;
        }

        let nameplate = if kind == EntityKind::Player {
            let plate = world.create();
            world.add_component(plate, Position(pos + NAMEPLATE_OFFSET))?;
            world.add_component(
                plate,
                Nameplate {
                    owner: e,
                    text: format!("player-{:08x}", state.owner_id as u32),
                },
            )?;
            Some(plate)
        } else {
            None
        };

        Ok(Mapping {
            local: e,
            expected_kind: kind,
            origin: Origin::Spawned,
            bullet_kind,
            nameplate,
        })
    }

    fn bind_obstacle(&mut self, world: &mut World, state: &EntityState) -> Result<Mapping, SyncError> {
        let uid = state.owner_id;
        let local = match self.level_obstacles.get(&uid) {
            Some(&e) if world.is_alive(e) => e,
            Some(_) => {
                self.level_obstacles.remove(&uid);
                return Err(SyncError::MissingLevelObstacle { uid });
            }
            None => return Err(SyncError::MissingLevelObstacle { uid }),
        };
        if let Some(previous) = self.map.wire_of(local) {
            tracing::debug!(uid, previous, id = state.entity_id, "level obstacle rebound to new id");
        }
        let stripped = components::scrub(world, local, EntityKind::Obstacle);
        if stripped > 0 {
            tracing::debug!(uid, stripped, "foreign components scrubbed from level obstacle");
        }
        world.get_component_mut::<Position>(local)?.0 = state.position();
        world.add_component(local, Health(state.health))?;
        Ok(Mapping {
            local,
            expected_kind: EntityKind::Obstacle,
            origin: Origin::Level,
            bullet_kind: None,
            nameplate: None,
        })
    }

    fn refresh(
        &self,
        world: &mut World,
        mapping: &Mapping,
        state: &EntityState,
        interpolation: &InterpolationEngine,
    ) -> Result<(), WorldError> {
        let e = mapping.local;
        let is_local = self.local_player == Some(e);
        match mapping.expected_kind {
            EntityKind::Obstacle => {
                world.get_component_mut::<Position>(e)?.0 = state.position();
                world.get_component_mut::<Health>(e)?.0 = state.health;
                return Ok(());
            }
            EntityKind::Player => {
                world.get_component_mut::<Health>(e)?.0 = state.health;
                world.get_component_mut::<Score>(e)?.0 = state.score;
                world.get_component_mut::<Player>(e)?.flags = state.flags;
            }
            EntityKind::Enemy => {
                world.get_component_mut::<Health>(e)?.0 = state.health;
                world.get_component_mut::<Enemy>(e)?.flags = state.flags;
            }
            EntityKind::Boss => {
                world.get_component_mut::<Health>(e)?.0 = state.health;
                world.get_component_mut::<Boss>(e)?.flags = state.flags;
            }
            EntityKind::Bullet => {}
            EntityKind::Powerup => {
                world.get_component_mut::<Powerup>(e)?.flags = state.flags;
            }
        }
        if is_local {
            // position and velocity belong to prediction
            return Ok(());
        }
        if let Ok(velocity) = world.get_component_mut::<Velocity>(e) {
            velocity.0 = state.velocity();
        }
        interpolation.arm(world, e, state.position())
    }

    /// Keep every nameplate above its owner; orphaned plates are destroyed.
    pub fn update_nameplates(&self, world: &mut World) {
        for plate in world.query_all::<Nameplate>() {
            let Ok(owner) = world.get_component::<Nameplate>(plate).map(|n| n.owner) else {
                continue;
            };
            match world.get_component::<Position>(owner).map(|p| p.0) {
                Ok(at) => {
                    if let Ok(pos) = world.get_component_mut::<Position>(plate) {
                        pos.0 = at + NAMEPLATE_OFFSET;
                    }
                }
                Err(_) => {
                    world.destroy(plate);
                }
            }
        }
    }
}
