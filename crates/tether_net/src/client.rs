//! Per-step orchestration of the synchronization pipeline

use tether_core::ecs::{Entity, World, WorldError};
use tether_core::math::Vec2;

use crate::components::Position;
use crate::config::SyncConfig;
use crate::input::{InputSequencer, SendOutcome};
use crate::interpolation::InterpolationEngine;
use crate::prediction::{MovementModel, PredictionEngine};
use crate::protocol::{InputBits, Transport};
use crate::reconciliation::{Correction, ReconciliationEngine};
use crate::snapshot::SnapshotMapper;
use crate::stats::SyncStats;

/// What one call to [`SyncClient::step`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub sequence: u32,
    pub send: SendOutcome,
    /// Resolved local position, when a local player exists.
    pub predicted: Option<Vec2>,
    pub snapshots: usize,
    /// Tier of the last acknowledgment applied this step.
    pub correction: Option<Correction>,
}

/// Owns the world and every stage of the client-side sync pipeline.
pub struct SyncClient {
    world: World,
    config: SyncConfig,
    sequencer: InputSequencer,
    prediction: PredictionEngine,
    reconciler: ReconciliationEngine,
    mapper: SnapshotMapper,
    interpolation: InterpolationEngine,
    stats: SyncStats,
}

impl SyncClient {
    pub fn new(config: SyncConfig, local_player_hash: u64) -> Self {
        tracing::info!(
            player = format_args!("{local_player_hash:#x}"),
            speed = config.move_speed,
            history = config.history_capacity,
            "sync client created"
        );
        Self {
            world: World::new(),
            sequencer: InputSequencer::new(config.min_send_interval(), config.history_capacity),
            prediction: PredictionEngine::new(MovementModel::from_config(&config)),
            reconciler: ReconciliationEngine::from_config(&config),
            mapper: SnapshotMapper::new(local_player_hash),
            interpolation: InterpolationEngine::new(config.interpolation_duration),
            stats: SyncStats::default(),
            config,
        }
    }

    /// Run one simulation step.
    ///
    /// Order: sample and send input, predict the local player, apply every
    /// received snapshot with its acknowledgments, then advance remote
    /// entities and labels.
    pub fn step(&mut self, intent: InputBits, dt: f32, transport: &mut dyn Transport) -> StepReport {
        let (input, send) = self.sequencer.sample(intent, dt, transport);
        self.stats.record_send(send);

        let predicted = self.predict(input.bits, dt).map(|pos| {
            let overflow = self.sequencer.commit(input, pos);
            self.stats.counters.history_overflow += overflow as u64;
            pos
        });

        let updates = transport.poll();
        let mut correction = None;
        for update in &updates {
            let report = self.mapper.apply(&mut self.world, update, &self.interpolation);
            self.stats.record_snapshot(&report);
            if let Some(spawned_at) = report.local_spawned_at {
                tracing::info!(at = %spawned_at, tick = update.tick, "local player spawned");
                self.prediction.set_tracked(spawned_at);
                self.sequencer.history_mut().clear();
            }
            for ack in &update.acks {
                if let Some(tier) = self.apply_ack(ack) {
                    correction = Some(tier);
                }
            }
        }

        self.interpolation.advance(&mut self.world, dt);
        self.mapper.update_nameplates(&mut self.world);
        self.stats.counters.steps += 1;

        StepReport {
            sequence: input.sequence,
            send,
            predicted,
            snapshots: updates.len(),
            correction,
        }
    }

    fn predict(&mut self, bits: InputBits, dt: f32) -> Option<Vec2> {
        let player = self.mapper.local_player()?;
        match self.prediction.advance(&mut self.world, player, bits, dt) {
            Ok(pos) => Some(pos),
            Err(err) => {
                tracing::warn!(%err, "local prediction skipped");
                None
            }
        }
    }

    fn apply_ack(&mut self, ack: &crate::protocol::InputAck) -> Option<Correction> {
        if ack.player_hash != self.mapper.local_player_hash() {
            tracing::warn!(
                hash = format_args!("{:#x}", ack.player_hash),
                "ack for another player ignored"
            );
            return None;
        }
        let Some(player) = self.mapper.local_player() else {
            tracing::debug!(seq = ack.last_processed_seq, "ack before local player exists");
            return None;
        };
        match self.reconciler.reconcile(
            ack,
            &mut self.world,
            player,
            self.sequencer.history_mut(),
            &mut self.prediction,
        ) {
            Ok(outcome) => {
                self.stats.record_reconcile(outcome.as_ref());
                outcome.map(|o| o.correction)
            }
            Err(err) => {
                tracing::warn!(%err, seq = ack.last_processed_seq, "reconciliation failed");
                None
            }
        }
    }

    /// See [`SnapshotMapper::register_level_obstacle`].
    pub fn register_level_obstacle(
        &mut self,
        uid: u64,
        center: Vec2,
        half_extents: Vec2,
    ) -> Result<Entity, WorldError> {
        self.mapper
            .register_level_obstacle(&mut self.world, uid, center, half_extents)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn mapper(&self) -> &SnapshotMapper {
        &self.mapper
    }

    pub fn sequencer(&self) -> &InputSequencer {
        &self.sequencer
    }

    pub fn local_player(&self) -> Option<Entity> {
        self.mapper.local_player()
    }

    /// Rendered position of the local player.
    pub fn local_position(&self) -> Option<Vec2> {
        let player = self.mapper.local_player()?;
        self.world.get_component::<Position>(player).ok().map(|p| p.0)
    }

    /// Latest predicted position, including corrections.
    pub fn predicted_position(&self) -> Vec2 {
        self.prediction.tracked()
    }

    pub fn last_acked(&self) -> Option<u32> {
        self.reconciler.last_acked()
    }
}
