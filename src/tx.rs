use arbitrary_int::u17;
use log::trace;

use crate::{
    baud::BaudGenerator,
    frame::{self, FrameConfig, FrameState},
    registers::{DataBits, ParityMode, StopBits},
};

/// Result of one transmitter clock.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TxStep {
    /// The transmit request was taken and a new frame started.
    pub accepted: bool,
    /// The last stop bit just ended. High for exactly one clock.
    pub done: bool,
}

/// Transmit framing state machine.
///
/// A transmit request is only taken while idle. The start bit begins on the clock the request
/// is taken and every following state lasts a whole number of baud periods, measured from a
/// freshly restarted baud generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TxEngine {
    state: FrameState,
    baud: BaudGenerator,
    format: FrameConfig,
    remaining: u8,
    shift: u8,
    parity: bool,
    done: bool,
}

impl Default for TxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TxEngine {
    pub const fn new() -> Self {
        Self {
            state: FrameState::Idle,
            baud: BaudGenerator::new(u17::new(0)),
            format: FrameConfig::new(
                DataBits::Seven,
                ParityMode::NoParity,
                StopBits::One,
                u17::new(0),
            ),
            remaining: 0,
            shift: 0,
            parity: false,
            done: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline(always)]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    #[inline(always)]
    pub const fn is_idle(&self) -> bool {
        matches!(self.state, FrameState::Idle)
    }

    #[inline(always)]
    pub const fn done(&self) -> bool {
        self.done
    }

    /// Level currently driven on the TX pin.
    #[inline]
    pub const fn tx(&self) -> bool {
        match self.state {
            FrameState::Idle | FrameState::Stop => true,
            FrameState::Start => false,
            FrameState::Data => self.shift & 1 == 1,
            FrameState::Parity => self.parity,
        }
    }

    /// Advances by one clock. `request` is ignored unless the engine is idle.
    pub fn step(&mut self, request: Option<u8>, config: &FrameConfig) -> TxStep {
        self.baud.set_increment(config.baud_increment);
        let tick = self.baud.advance_clock();
        self.done = false;

        if self.is_idle() {
            let Some(data) = request else {
                return TxStep::default();
            };
            self.start_frame(data, config);
            return TxStep {
                accepted: true,
                done: false,
            };
        }
        if !tick {
            return TxStep::default();
        }
        if self.state == FrameState::Data {
            self.shift >>= 1;
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            let next = self.state.next(self.format.parity);
            self.state = next;
            self.remaining = next.periods(&self.format);
            if next == FrameState::Idle {
                trace!("tx: frame done");
                self.done = true;
            }
        }
        TxStep {
            accepted: false,
            done: self.done,
        }
    }

    fn start_frame(&mut self, data: u8, config: &FrameConfig) {
        self.format = *config;
        self.shift = data & self.format.data_bits.mask();
        self.parity = frame::parity_bit(data, self.format.data_bits, self.format.parity);
        self.baud.restart(0);
        self.state = FrameState::Start;
        self.remaining = FrameState::Start.periods(&self.format);
        trace!("tx: sending {:#04x}, format {:?}", data, self.format);
    }
}
