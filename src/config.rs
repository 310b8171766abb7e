//! Simulation parameters which are not part of the register state.
use crate::{
    baud::{DEFAULT_CLOCK_HZ, InvalidBaudRate},
    frame::FrameConfig,
    sync::{DEFAULT_SYNC_STAGES, MAX_SYNC_STAGES},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid number of input registering stages {0}, at most 8 are supported")]
pub struct InvalidSyncStages(pub u8);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SimConfig {
    clock_hz: u32,
    sync_stages: u8,
    loopback: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimConfig {
    /// 24 MHz system clock, three input registering stages, no loopback.
    pub const fn new() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            sync_stages: DEFAULT_SYNC_STAGES,
            loopback: false,
        }
    }

    #[must_use]
    pub const fn with_clock_hz(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }

    /// Number of clocks the RX pin is delayed by before reaching the receiver.
    pub const fn with_sync_stages(mut self, stages: u8) -> Result<Self, InvalidSyncStages> {
        if stages > MAX_SYNC_STAGES {
            return Err(InvalidSyncStages(stages));
        }
        self.sync_stages = stages;
        Ok(self)
    }

    /// Feeds the TX pin back into the receiver instead of the RX pin.
    #[must_use]
    pub const fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    #[inline(always)]
    pub const fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    #[inline(always)]
    pub const fn sync_stages(&self) -> u8 {
        self.sync_stages
    }

    #[inline(always)]
    pub const fn loopback(&self) -> bool {
        self.loopback
    }

    /// 8N1 frame configuration for the given baud rate at the configured clock.
    pub fn frame_config(&self, baud: u32) -> Result<FrameConfig, InvalidBaudRate> {
        FrameConfig::from_baud(baud, self.clock_hz)
    }
}
