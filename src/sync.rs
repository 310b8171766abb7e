//! Input registering stage in front of the receiver.

/// Largest supported number of registering stages.
pub const MAX_SYNC_STAGES: u8 = 8;
pub const DEFAULT_SYNC_STAGES: u8 = 3;

/// Delays the RX pin by a fixed number of clocks. Powers up with an idle (high) line.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct InputSync {
    stages: u8,
    history: u8,
}

impl Default for InputSync {
    fn default() -> Self {
        Self::new(DEFAULT_SYNC_STAGES)
    }
}

impl InputSync {
    /// `stages` is clamped to [MAX_SYNC_STAGES]. Zero stages is a pass-through.
    pub const fn new(stages: u8) -> Self {
        let stages = if stages > MAX_SYNC_STAGES {
            MAX_SYNC_STAGES
        } else {
            stages
        };
        Self {
            stages,
            history: 0xFF,
        }
    }

    #[inline(always)]
    pub const fn stages(&self) -> u8 {
        self.stages
    }

    pub fn reset(&mut self) {
        self.history = 0xFF;
    }

    /// Clocks in the current pin level and returns the level seen `stages` clocks ago.
    #[inline]
    pub fn step(&mut self, pin: bool) -> bool {
        if self.stages == 0 {
            return pin;
        }
        let out = (self.history >> (self.stages - 1)) & 1 == 1;
        self.history = (self.history << 1) | pin as u8;
        out
    }
}
