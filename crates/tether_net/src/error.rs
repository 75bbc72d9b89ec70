use tether_core::ecs::WorldError;
use thiserror::Error;

/// Reasons an individual entity update is dropped.
///
/// These never escape [`crate::SyncClient`]; the offending update is
/// skipped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("unrecognized entity type {0}")]
    UnknownEntityKind(u8),

    #[error("unrecognized bullet flags {0:#04x}")]
    UnknownBulletKind(u8),

    #[error("no level obstacle with uid {uid}")]
    MissingLevelObstacle { uid: u64 },

    #[error(transparent)]
    World(#[from] WorldError),
}
