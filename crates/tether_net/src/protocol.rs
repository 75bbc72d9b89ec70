//! Decoded wire records
//!
//! Framing and serialization belong to the transport; this module only
//! describes the records it hands over and accepts.

use serde::{Deserialize, Serialize};
use tether_core::math::Vec2;

use crate::SyncError;

/// Kind of a replicated entity, as carried in `EntityState::entity_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EntityKind {
    Player = 0,
    Enemy = 1,
    Boss = 2,
    Bullet = 3,
    Powerup = 4,
    Obstacle = 5,
}

impl TryFrom<u8> for EntityKind {
    type Error = SyncError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Ok(match raw {
            0 => Self::Player,
            1 => Self::Enemy,
            2 => Self::Boss,
            3 => Self::Bullet,
            4 => Self::Powerup,
            5 => Self::Obstacle,
            other => return Err(SyncError::UnknownEntityKind(other)),
        })
    }
}

/// Bullet sub-type, carried in the `flags` byte of bullet states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BulletKind {
    Standard = 0,
    Spread = 1,
    Laser = 2,
    Homing = 3,
}

impl TryFrom<u8> for BulletKind {
    type Error = SyncError;

    fn try_from(flags: u8) -> Result<Self, Self::Error> {
        Ok(match flags {
            0 => Self::Standard,
            1 => Self::Spread,
            2 => Self::Laser,
            3 => Self::Homing,
            other => return Err(SyncError::UnknownBulletKind(other)),
        })
    }
}

/// Movement and fire intent packed into one byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputBits(u8);

impl InputBits {
    pub const NONE: Self = Self(0);
    pub const UP: Self = Self(1 << 0);
    pub const DOWN: Self = Self(1 << 1);
    pub const LEFT: Self = Self(1 << 2);
    pub const RIGHT: Self = Self(1 << 3);
    pub const SHOOT: Self = Self(1 << 4);

    const ALL: u8 = 0b1_1111;

    /// Unknown high bits are discarded.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Unit-length movement direction (y grows downwards). Opposing keys cancel.
    pub fn direction(self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.contains(Self::UP) {
            dir.y -= 1.0;
        }
        if self.contains(Self::DOWN) {
            dir.y += 1.0;
        }
        if self.contains(Self::LEFT) {
            dir.x -= 1.0;
        }
        if self.contains(Self::RIGHT) {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }
}

impl std::ops::BitOr for InputBits {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Authoritative state of one entity for one server tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: u32,
    pub entity_type: u8,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    pub flags: u8,
    /// Owning player's hash, or the level uid for obstacles.
    pub owner_id: u64,
    pub health: u16,
    pub score: u32,
}

impl EntityState {
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }
}

/// Server confirmation that inputs up to `last_processed_seq` were applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputAck {
    pub player_hash: u64,
    pub last_processed_seq: u32,
    pub server_pos_x: f32,
    pub server_pos_y: f32,
}

impl InputAck {
    pub fn server_position(&self) -> Vec2 {
        Vec2::new(self.server_pos_x, self.server_pos_y)
    }
}

/// One server broadcast: the full relevant entity set plus input acks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub tick: u32,
    pub entities: Vec<EntityState>,
    pub acks: Vec<InputAck>,
}

/// Outgoing input. Only `bits` is the payload byte; the transport carries
/// `sequence` in its own framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPacket {
    pub sequence: u32,
    pub bits: InputBits,
}

impl InputPacket {
    pub fn to_byte(&self) -> u8 {
        self.bits.bits()
    }
}

/// The transport collaborator: framing, sockets and reconnects live behind it.
pub trait Transport {
    /// Queue an input packet for sending.
    fn send_input(&mut self, packet: InputPacket);

    /// Drain every update decoded since the last call. Must not block.
    fn poll(&mut self) -> Vec<StateUpdate>;
}
