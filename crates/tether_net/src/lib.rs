//! Tether Network Layer
//!
//! Client-side state synchronization against an authoritative server:
//! input sequencing, local prediction, reconciliation against input
//! acknowledgments, snapshot-to-entity mapping and remote interpolation.
//!
//! Everything runs on the thread that owns the [`tether_core::ecs::World`];
//! [`SyncClient::step`] executes one simulation step in a fixed order.

pub mod client;
pub mod components;
pub mod config;
pub mod error;
pub mod input;
pub mod interpolation;
pub mod mapping;
pub mod prediction;
pub mod protocol;
pub mod reconciliation;
pub mod snapshot;
pub mod stats;

pub use client::SyncClient;
pub use config::SyncConfig;
pub use error::SyncError;
pub use protocol::{
    BulletKind, EntityKind, EntityState, InputAck, InputBits, InputPacket, StateUpdate, Transport,
};

/// Network protocol version
pub const PROTOCOL_VERSION: u32 = 1;
