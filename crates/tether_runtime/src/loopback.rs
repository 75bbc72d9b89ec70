//! In-process authoritative server
//!
//! Simulates just enough of a server to exercise the client: it moves the
//! local player by the same speed rule (without obstacles), drifts a few
//! enemies, fires bullets under recycled ids and broadcasts snapshots
//! after a one-way delay.
//!
//! The server steps in lockstep with the client and the client only sends
//! input when it changes, so every server step consumes exactly one client
//! sequence number: once the first packet has arrived the processed
//! sequence advances by one per step, and a packet's bits take effect from
//! its own sequence. Acks carry the position after the processed step.

use std::collections::VecDeque;

use tether_core::math::{Aabb, Vec2};
use tether_net::prediction::MovementModel;
use tether_net::{
    EntityKind, EntityState, InputAck, InputBits, InputPacket, StateUpdate, SyncConfig, Transport,
};
use tether_services::settings::SessionSettings;

/// Uid of the level obstacle both sides know about.
pub const LEVEL_OBSTACLE_UID: u64 = 900;
pub const LEVEL_OBSTACLE_CENTER: Vec2 = Vec2::new(1040.0, 600.0);
pub const LEVEL_OBSTACLE_HALF: Vec2 = Vec2::new(40.0, 40.0);

const PLAYER_START: Vec2 = Vec2::new(640.0, 360.0);
const BULLET_SPEED: f32 = 480.0;
const BULLET_LIFETIME: f32 = 0.4;
const FIRE_INTERVAL: f32 = 0.15;
/// Server time after which the level obstacle becomes replicated.
const OBSTACLE_APPEARS_AT: f32 = 2.0;

struct ServerPlayer {
    id: u32,
    hash: u64,
    pos: Vec2,
    bits: InputBits,
    /// Client step the latest server step consumed; 0 before any input.
    last_seq: u32,
    /// Newest input packet received.
    last_packet: u32,
    score: u32,
    fire_cooldown: f32,
}

struct Drifter {
    id: u32,
    pos: Vec2,
    vel: Vec2,
    health: u16,
}

struct Shot {
    id: u32,
    pos: Vec2,
    vel: Vec2,
    flags: u8,
    ttl: f32,
}

pub struct LoopbackServer {
    clock: f32,
    latency: f32,
    broadcast_interval: f32,
    since_broadcast: f32,
    tick: u32,
    model: MovementModel,
    inbound: VecDeque<(f32, InputPacket)>,
    outbound: VecDeque<(f32, StateUpdate)>,
    player: ServerPlayer,
    enemies: Vec<Drifter>,
    bullets: Vec<Shot>,
    powerup: u32,
    obstacle: Option<u32>,
    free_ids: Vec<u32>,
    next_id: u32,
    next_bullet_flags: u8,
}

impl LoopbackServer {
    pub fn new(player_hash: u64, sync: &SyncConfig, session: &SessionSettings) -> Self {
        let mut server = Self {
            clock: 0.0,
            latency: session.latency_ms as f32 / 1000.0,
            broadcast_interval: session.broadcast_interval_ms.max(1) as f32 / 1000.0,
            since_broadcast: 0.0,
            tick: 0,
            model: MovementModel::from_config(sync),
            inbound: VecDeque::new(),
            outbound: VecDeque::new(),
            player: ServerPlayer {
                id: 1,
                hash: player_hash,
                pos: PLAYER_START,
                bits: InputBits::NONE,
                last_seq: 0,
                last_packet: 0,
                score: 0,
                fire_cooldown: 0.0,
            },
            enemies: Vec::new(),
            bullets: Vec::new(),
            powerup: 0,
            obstacle: None,
            free_ids: Vec::new(),
            next_id: 2,
            next_bullet_flags: 0,
        };
        for i in 0..session.enemies {
            let id = server.allocate_id();
            let angle = i as f32 * 2.1;
            server.enemies.push(Drifter {
                id,
                pos: Vec2::new(200.0 + 300.0 * i as f32, 120.0),
                vel: Vec2::from_angle(angle) * 60.0,
                health: 30,
            });
        }
        server.powerup = server.allocate_id();
        server
    }

    pub fn server_position(&self) -> Vec2 {
        self.player.pos
    }

    pub fn last_processed(&self) -> u32 {
        self.player.last_seq
    }

    /// Ids are handed back out as soon as their entity dies.
    fn allocate_id(&mut self) -> u32 {
        self.free_ids.pop().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        })
    }

    /// Advance server time by `dt`.
    pub fn advance(&mut self, dt: f32) {
        self.clock += dt;
        self.tick += 1;

        let mut processed = match self.player.last_seq {
            0 => 0,
            last => last.wrapping_add(1),
        };
        while let Some((_, packet)) = self.inbound.front().filter(|(at, _)| *at <= self.clock) {
            let packet = *packet;
            self.inbound.pop_front();
            if packet.sequence > self.player.last_packet {
                self.player.bits = packet.bits;
                self.player.last_packet = packet.sequence;
                // a late packet cannot rewind steps already consumed
                processed = processed.max(packet.sequence);
            }
        }

        let bits = self.player.bits;
        self.player.pos = self.model.step(self.player.pos, bits, dt);
        self.player.last_seq = processed;
        self.player.fire_cooldown -= dt;
        if bits.contains(InputBits::SHOOT) && self.player.fire_cooldown <= 0.0 {
            self.fire();
        }

        let bounds = self.model.bounds;
        for enemy in &mut self.enemies {
            enemy.pos += enemy.vel * dt;
            bounce(&mut enemy.pos, &mut enemy.vel, &bounds);
        }

        for shot in &mut self.bullets {
            shot.pos += shot.vel * dt;
            shot.ttl -= dt;
        }
        let (expired, live): (Vec<Shot>, Vec<Shot>) =
            self.bullets.drain(..).partition(|s| s.ttl <= 0.0);
        self.bullets = live;
        for shot in expired {
            self.player.score += 1;
            self.free_ids.push(shot.id);
        }

        if self.obstacle.is_none() && self.clock >= OBSTACLE_APPEARS_AT {
            let id = self.allocate_id();
            tracing::debug!(id, "level obstacle replicated");
            self.obstacle = Some(id);
        }

        self.since_broadcast += dt;
        if self.since_broadcast >= self.broadcast_interval {
            self.since_broadcast -= self.broadcast_interval;
            let update = self.snapshot();
            self.outbound.push_back((self.clock + self.latency, update));
        }
    }

    fn fire(&mut self) {
        self.player.fire_cooldown = FIRE_INTERVAL;
        let id = self.allocate_id();
        let flags = self.next_bullet_flags;
        self.next_bullet_flags = (self.next_bullet_flags + 1) % 4;
        self.bullets.push(Shot {
            id,
            pos: self.player.pos,
            vel: Vec2::new(BULLET_SPEED, 0.0),
            flags,
            ttl: BULLET_LIFETIME,
        });
    }

    fn snapshot(&self) -> StateUpdate {
        let p = &self.player;
        let mut entities = vec![EntityState {
            entity_id: p.id,
            entity_type: EntityKind::Player as u8,
            x: p.pos.x,
            y: p.pos.y,
            vx: 0.0,
            vy: 0.0,
            flags: 0,
            owner_id: p.hash,
            health: 100,
            score: p.score,
        }];
        entities.extend(self.enemies.iter().map(|e| EntityState {
            entity_id: e.id,
            entity_type: EntityKind::Enemy as u8,
            x: e.pos.x,
            y: e.pos.y,
            vx: e.vel.x,
            vy: e.vel.y,
            flags: 0,
            owner_id: 0,
            health: e.health,
            score: 0,
        }));
        entities.extend(self.bullets.iter().map(|s| EntityState {
            entity_id: s.id,
            entity_type: EntityKind::Bullet as u8,
            x: s.pos.x,
            y: s.pos.y,
            vx: s.vel.x,
            vy: s.vel.y,
            flags: s.flags,
            owner_id: p.hash,
            health: 0,
            score: 0,
        }));
        entities.push(EntityState {
            entity_id: self.powerup,
            entity_type: EntityKind::Powerup as u8,
            x: 320.0,
            y: 560.0,
            vx: 0.0,
            vy: 0.0,
            flags: 1,
            owner_id: 0,
            health: 0,
            score: 0,
        });
        if let Some(id) = self.obstacle {
            entities.push(EntityState {
                entity_id: id,
                entity_type: EntityKind::Obstacle as u8,
                x: LEVEL_OBSTACLE_CENTER.x,
                y: LEVEL_OBSTACLE_CENTER.y,
                vx: 0.0,
                vy: 0.0,
                flags: 0,
                owner_id: LEVEL_OBSTACLE_UID,
                health: 500,
                score: 0,
            });
        }

        let acks = if p.last_seq > 0 {
            vec![InputAck {
                player_hash: p.hash,
                last_processed_seq: p.last_seq,
                server_pos_x: p.pos.x,
                server_pos_y: p.pos.y,
            }]
        } else {
            Vec::new()
        };

        StateUpdate {
            tick: self.tick,
            entities,
            acks,
        }
    }
}

fn bounce(pos: &mut Vec2, vel: &mut Vec2, bounds: &Aabb) {
    if pos.x < bounds.min.x || pos.x > bounds.max.x {
        vel.x = -vel.x;
    }
    if pos.y < bounds.min.y || pos.y > bounds.max.y {
        vel.y = -vel.y;
    }
    *pos = bounds.clamp_point(*pos);
}

impl Transport for LoopbackServer {
    fn send_input(&mut self, packet: InputPacket) {
        self.inbound.push_back((self.clock + self.latency, packet));
    }

    fn poll(&mut self) -> Vec<StateUpdate> {
        let mut ready = Vec::new();
        while let Some((at, _)) = self.outbound.front() {
            if *at > self.clock {
                break;
            }
            if let Some((_, update)) = self.outbound.pop_front() {
                ready.push(update);
            }
        }
        ready
    }
}
