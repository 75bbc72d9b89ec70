//! Synchronization counters and correction error window

use serde::Serialize;

use crate::input::SendOutcome;
use crate::reconciliation::{Correction, ReconcileOutcome};
use crate::snapshot::SnapshotReport;

/// Rolling window over the most recent correction errors, in units.
#[derive(Debug, Clone)]
pub struct ErrorWindow {
    samples: Vec<f32>,
    capacity: usize,
    index: usize,
}

impl ErrorWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            index: 0,
        }
    }

    pub fn push(&mut self, error: f32) {
        if self.samples.len() < self.capacity {
            self.samples.push(error);
        } else {
            self.samples[self.index] = error;
        }
        self.index = (self.index + 1) % self.capacity;
    }

    pub fn average(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f32>() / self.samples.len() as f32
    }

    pub fn max(&self) -> f32 {
        self.samples.iter().copied().fold(0.0, f32::max)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for ErrorWindow {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Cumulative counts since the client was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounters {
    pub steps: u64,
    pub snapshots_applied: u64,
    pub entities_mapped: u64,
    pub entities_despawned: u64,
    pub mappings_evicted: u64,
    pub states_skipped: u64,
    pub acks_accepted: u64,
    pub acks_snapped: u64,
    pub acks_replayed: u64,
    pub acks_resynced: u64,
    pub acks_ignored: u64,
    pub inputs_sent: u64,
    pub inputs_rate_limited: u64,
    pub history_overflow: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    pub counters: SyncCounters,
    pub errors: ErrorWindow,
}

impl SyncStats {
    pub fn record_send(&mut self, outcome: SendOutcome) {
        match outcome {
            SendOutcome::Sent => self.counters.inputs_sent += 1,
            SendOutcome::RateLimited => self.counters.inputs_rate_limited += 1,
            SendOutcome::Unchanged => {}
        }
    }

    pub fn record_snapshot(&mut self, report: &SnapshotReport) {
        let c = &mut self.counters;
        c.snapshots_applied += 1;
        c.entities_mapped += report.mapped as u64;
        c.entities_despawned += report.despawned as u64;
        c.mappings_evicted += report.evicted as u64;
        c.states_skipped += report.skipped as u64;
    }

    /// `None` means the ack was older than one already applied.
    pub fn record_reconcile(&mut self, outcome: Option<&ReconcileOutcome>) {
        let Some(outcome) = outcome else {
            self.counters.acks_ignored += 1;
            return;
        };
        match outcome.correction {
            Correction::Accepted => self.counters.acks_accepted += 1,
            Correction::Snapped => self.counters.acks_snapped += 1,
            Correction::Replayed { .. } => self.counters.acks_replayed += 1,
            Correction::Resynced { .. } => self.counters.acks_resynced += 1,
        }
        self.errors.push(outcome.error_sq.sqrt());
    }

    pub fn corrections(&self) -> u64 {
        let c = &self.counters;
        c.acks_snapped + c.acks_replayed + c.acks_resynced
    }
}
