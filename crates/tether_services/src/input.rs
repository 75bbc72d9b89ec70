//! Local intent sources

use tether_net::InputBits;

/// Supplies the player's intent once per simulation step.
pub trait IntentSource {
    fn sample(&mut self, dt: f32) -> InputBits;
}

/// Holding the same buttons forever.
impl IntentSource for InputBits {
    fn sample(&mut self, _dt: f32) -> InputBits {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntentSegment {
    pub bits: InputBits,
    pub seconds: f32,
}

impl IntentSegment {
    pub fn new(bits: InputBits, seconds: f32) -> Self {
        Self { bits, seconds }
    }
}

/// Replays a fixed list of timed segments, looping at the end.
#[derive(Debug, Clone)]
pub struct ScriptedIntent {
    segments: Vec<IntentSegment>,
    current: usize,
    elapsed: f32,
}

impl ScriptedIntent {
    pub fn new(segments: Vec<IntentSegment>) -> Self {
        Self {
            segments,
            current: 0,
            elapsed: 0.0,
        }
    }

    /// A box-shaped walk with bursts of fire.
    pub fn patrol() -> Self {
        Self::new(vec![
            IntentSegment::new(InputBits::RIGHT, 1.0),
            IntentSegment::new(InputBits::DOWN | InputBits::SHOOT, 0.5),
            IntentSegment::new(InputBits::LEFT, 1.0),
            IntentSegment::new(InputBits::UP | InputBits::SHOOT, 0.5),
            IntentSegment::new(InputBits::NONE, 0.25),
        ])
    }
}

impl IntentSource for ScriptedIntent {
    fn sample(&mut self, dt: f32) -> InputBits {
        let Some(segment) = self.segments.get(self.current).copied() else {
            return InputBits::NONE;
        };
        self.elapsed += dt;
        if self.elapsed >= segment.seconds {
            self.elapsed -= segment.seconds;
            self.current = (self.current + 1) % self.segments.len();
        }
        segment.bits
    }
}
