//! Fractional baud rate generator.
//!
//! A 16-bit phase accumulator is incremented on every system clock. A baud tick is produced on
//! each clock where the accumulator wraps. The residual is kept across wraps, so the long-run
//! tick rate is `increment / 65536` ticks per clock even when the ideal increment is not an
//! integer.
use arbitrary_int::u17;

pub const ACCUMULATOR_MODULUS: u32 = 1 << 16;
/// Accumulator phase which places the next wrap half a bit period away.
pub const HALF_PHASE: u16 = 0x8000;
/// Reference clock of the peripheral.
pub const DEFAULT_CLOCK_HZ: u32 = 24_000_000;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("baud rate {baud} is not reachable with a {clock_hz} Hz clock")]
pub struct InvalidBaudRate {
    pub baud: u32,
    pub clock_hz: u32,
}

/// Computes `round(baud * 65536 / clock_hz)`.
///
/// Fails if the result is zero or does not fit into the 16-bit increment field of the control
/// register.
pub fn increment_for(baud: u32, clock_hz: u32) -> Result<u16, InvalidBaudRate> {
    let err = InvalidBaudRate { baud, clock_hz };
    if clock_hz == 0 {
        return Err(err);
    }
    let scaled = u64::from(baud) * u64::from(ACCUMULATOR_MODULUS);
    let clock = u64::from(clock_hz);
    let increment = (scaled + clock / 2) / clock;
    match u16::try_from(increment) {
        Ok(0) | Err(_) => Err(err),
        Ok(increment) => Ok(increment),
    }
}

/// Baud rate which is actually generated for a given increment.
pub fn effective_baud(increment: u17, clock_hz: u32) -> f32 {
    (clock_hz as f32) * (increment.value() as f32) / (ACCUMULATOR_MODULUS as f32)
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BaudGenerator {
    increment: u17,
    accumulator: u16,
}

impl Default for BaudGenerator {
    fn default() -> Self {
        Self::new(u17::new(0))
    }
}

impl BaudGenerator {
    pub const fn new(increment: u17) -> Self {
        Self {
            increment,
            accumulator: 0,
        }
    }

    #[inline(always)]
    pub const fn increment(&self) -> u17 {
        self.increment
    }

    /// Takes effect on the next call to [Self::advance_clock]. The accumulator phase is kept.
    #[inline(always)]
    pub fn set_increment(&mut self, increment: u17) {
        self.increment = increment;
    }

    #[inline(always)]
    pub const fn phase(&self) -> u16 {
        self.accumulator
    }

    /// Restarts the bit period at the given phase. A phase of 0 yields a full period until the
    /// next tick, [HALF_PHASE] yields half a period.
    #[inline]
    pub fn restart(&mut self, phase: u16) {
        self.accumulator = phase;
    }

    /// Advances by one system clock and returns whether a baud tick occurred.
    #[inline]
    pub fn advance_clock(&mut self) -> bool {
        let sum = u32::from(self.accumulator) + self.increment.value();
        self.accumulator = (sum % ACCUMULATOR_MODULUS) as u16;
        sum >= ACCUMULATOR_MODULUS
    }
}
