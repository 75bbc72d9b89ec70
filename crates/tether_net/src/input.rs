//! Input sequencing and bounded input history
//!
//! Every simulation step gets a sequence number and a history record,
//! whether or not the input was sent that step. Outgoing packets are only
//! produced when the intent changes, and never more often than the
//! configured minimum interval.

use std::collections::VecDeque;
use std::time::Duration;
use tether_core::math::Vec2;

use crate::protocol::{InputBits, InputPacket, Transport};

/// One step of local input together with the position it predicted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedInput {
    pub sequence: u32,
    pub inputs: InputBits,
    pub predicted: Vec2,
    pub dt: f32,
}

/// FIFO of unacknowledged inputs, capped in length.
pub struct InputHistory {
    buffer: VecDeque<PredictedInput>,
    capacity: usize,
}

impl InputHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Append a record, evicting the oldest ones past capacity.
    /// Returns how many records were evicted.
    pub fn push(&mut self, record: PredictedInput) -> usize {
        self.buffer.push_back(record);
        let mut evicted = 0;
        while self.buffer.len() > self.capacity {
            self.buffer.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Drop every record with `sequence <= last_processed`.
    /// Returns how many records were dropped.
    pub fn acknowledge(&mut self, last_processed: u32) -> usize {
        let before = self.buffer.len();
        while self
            .buffer
            .front()
            .is_some_and(|r| r.sequence <= last_processed)
        {
            self.buffer.pop_front();
        }
        before - self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &PredictedInput> {
        self.buffer.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PredictedInput> {
        self.buffer.iter_mut()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Input sampled for one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepInput {
    pub sequence: u32,
    pub bits: InputBits,
    pub dt: f32,
}

/// What happened to the outgoing side of a sampled step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Unchanged,
    RateLimited,
}

/// Numbers local input and decides when it goes out on the wire.
pub struct InputSequencer {
    next_sequence: u32,
    last_sent: InputBits,
    since_last_send: Duration,
    min_send_interval: Duration,
    history: InputHistory,
}

impl InputSequencer {
    pub fn new(min_send_interval: Duration, history_capacity: usize) -> Self {
        Self {
            // 0 is reserved to mean "nothing processed yet"
            next_sequence: 1,
            last_sent: InputBits::NONE,
            since_last_send: min_send_interval,
            min_send_interval,
            history: InputHistory::new(history_capacity),
        }
    }

    /// Sample this step's intent: assign a sequence number and send it if it
    /// changed since the last packet and the send gate is open.
    pub fn sample(
        &mut self,
        bits: InputBits,
        dt: f32,
        transport: &mut dyn Transport,
    ) -> (StepInput, SendOutcome) {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.since_last_send += Duration::from_secs_f32(dt.max(0.0));

        let outcome = if bits == self.last_sent {
            SendOutcome::Unchanged
        } else if self.since_last_send < self.min_send_interval {
            SendOutcome::RateLimited
        } else {
            transport.send_input(InputPacket { sequence, bits });
            self.last_sent = bits;
            self.since_last_send = Duration::ZERO;
            tracing::trace!(sequence, bits = bits.bits(), "input sent");
            SendOutcome::Sent
        };

        (StepInput { sequence, bits, dt }, outcome)
    }

    /// Record the resolved position predicted for `step`.
    /// Returns how many old records overflowed out of the history.
    pub fn commit(&mut self, step: StepInput, predicted: Vec2) -> usize {
        let evicted = self.history.push(PredictedInput {
            sequence: step.sequence,
            inputs: step.bits,
            predicted,
            dt: step.dt,
        });
        if evicted > 0 {
            tracing::warn!(
                evicted,
                capacity = self.history.capacity(),
                "input history overflow, oldest unacknowledged inputs dropped"
            );
        }
        evicted
    }

    pub fn history(&self) -> &InputHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut InputHistory {
        &mut self.history
    }

    /// Sequence number the next sampled step will receive.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    pub fn last_sent(&self) -> InputBits {
        self.last_sent
    }
}
