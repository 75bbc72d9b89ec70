//! Server reconciliation
//!
//! Each input acknowledgment carries the authoritative position after the
//! server processed inputs up to a sequence number. The error against the
//! tracked prediction picks one of three responses:
//!
//! | error                | response                                       |
//! |----------------------|------------------------------------------------|
//! | <= snap threshold    | accept, only trim history                      |
//! | <= desync threshold  | replay unacknowledged inputs from the server   |
//! | >  desync threshold  | snap to the server and drop the whole history  |
//!
//! With nothing left to replay, any error above the snap threshold snaps.
//! Replay uses the movement rule without obstacle resolution; obstacle
//! layout at past ticks is not kept.

use tether_core::ecs::{Entity, World, WorldError};
use tether_core::math::Vec2;

use crate::components::Position;
use crate::config::SyncConfig;
use crate::input::InputHistory;
use crate::prediction::PredictionEngine;
use crate::protocol::InputAck;

/// Which tier an acknowledgment landed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    /// Prediction was close enough.
    Accepted,
    /// No inputs left to replay; moved straight to the server position.
    Snapped,
    /// Re-simulated the remaining inputs from the server position.
    Replayed { replayed: usize },
    /// Divergence too large to replay; snapped and discarded history.
    Resynced { discarded: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconcileOutcome {
    pub correction: Correction,
    pub error_sq: f32,
    pub acknowledged: usize,
}

pub struct ReconciliationEngine {
    snap_threshold_sq: f32,
    desync_threshold_sq: f32,
    last_acked: Option<u32>,
}

impl ReconciliationEngine {
    pub fn new(snap_threshold_sq: f32, desync_threshold_sq: f32) -> Self {
        Self {
            snap_threshold_sq,
            desync_threshold_sq,
            last_acked: None,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.snap_threshold_sq(), config.desync_threshold_sq())
    }

    pub fn last_acked(&self) -> Option<u32> {
        self.last_acked
    }

    /// Apply one acknowledgment for the local player.
    ///
    /// Returns `Ok(None)` when the ack is older than one already applied.
    pub fn reconcile(
        &mut self,
        ack: &InputAck,
        world: &mut World,
        player: Entity,
        history: &mut InputHistory,
        prediction: &mut PredictionEngine,
    ) -> Result<Option<ReconcileOutcome>, WorldError> {
        if self
            .last_acked
            .is_some_and(|last| ack.last_processed_seq < last)
        {
            tracing::debug!(
                seq = ack.last_processed_seq,
                last = ?self.last_acked,
                "out-of-order ack ignored"
            );
            return Ok(None);
        }
        self.last_acked = Some(ack.last_processed_seq);

        let acknowledged = history.acknowledge(ack.last_processed_seq);
        let server = ack.server_position();
        let error_sq = server.distance_squared(prediction.tracked());

        let correction = if history.is_empty() && error_sq > self.snap_threshold_sq {
            commit(world, player, prediction, server)?;
            Correction::Snapped
        } else if error_sq > self.desync_threshold_sq {
            let discarded = history.len();
            history.clear();
            commit(world, player, prediction, server)?;
            tracing::info!(
                seq = ack.last_processed_seq,
                error = error_sq.sqrt(),
                discarded,
                "major desync, snapped to server"
            );
            Correction::Resynced { discarded }
        } else if error_sq > self.snap_threshold_sq {
            let model = *prediction.model();
            let mut pos = server;
            let mut replayed = 0;
            for record in history.iter_mut() {
                pos = model.step(pos, record.inputs, record.dt);
                record.predicted = pos;
                replayed += 1;
            }
            commit(world, player, prediction, pos)?;
            tracing::debug!(
                seq = ack.last_processed_seq,
                error = error_sq.sqrt(),
                replayed,
                "replayed unacknowledged inputs"
            );
            Correction::Replayed { replayed }
        } else {
            Correction::Accepted
        };

        Ok(Some(ReconcileOutcome {
            correction,
            error_sq,
            acknowledged,
        }))
    }
}

fn commit(
    world: &mut World,
    player: Entity,
    prediction: &mut PredictionEngine,
    pos: Vec2,
) -> Result<(), WorldError> {
    world.get_component_mut::<Position>(player)?.0 = pos;
    prediction.set_tracked(pos);
    Ok(())
}
