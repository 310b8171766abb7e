use arbitrary_int::u17;
use log::trace;

use crate::{
    baud::{BaudGenerator, HALF_PHASE},
    frame::{FrameConfig, FrameState, RxFrame, RxOutput},
    registers::{DataBits, ParityMode, StopBits},
};

/// Receive framing state machine.
///
/// The engine looks for a falling edge on the (already registered) RX line, re-phases its baud
/// generator so that ticks fall in the middle of each bit and then samples the start bit, the
/// data bits LSB first, the optional parity bit and the stop bits. The frame is delivered at the
/// middle of the last stop bit, after which a new start bit can be detected immediately.
///
/// The frame format is captured when the start bit is detected. The baud increment is taken
/// from the live configuration on every clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RxEngine {
    state: FrameState,
    baud: BaudGenerator,
    format: FrameConfig,
    line_q: bool,
    remaining: u8,
    bit_index: u8,
    data: u8,
    parity_acc: bool,
    parity_bit: Option<bool>,
    stop_count: u8,
    parity_error: bool,
    frame_error: bool,
    output: Option<RxOutput>,
}

impl Default for RxEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RxEngine {
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
            line_q: true,
            remaining: 0,
            bit_index: 0,
            data: 0,
            parity_acc: false,
            parity_bit: None,
            stop_count: 0,
            parity_error: false,
            frame_error: false,
            output: None,
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

    /// Format of the frame currently being received.
    #[inline(always)]
    pub const fn format(&self) -> &FrameConfig {
        &self.format
    }

    /// Frame completed on the last clock, if any.
    #[inline(always)]
    pub const fn output(&self) -> Option<RxOutput> {
        self.output
    }

    /// High only on the clock the last stop bit is sampled. The register file takes the frame
    /// on that same clock.
    #[inline(always)]
    pub const fn output_valid(&self) -> bool {
        self.output.is_some()
    }

    /// Advances by one clock with the given RX line level.
    pub fn step(&mut self, line: bool, config: &FrameConfig) -> Option<RxOutput> {
        self.baud.set_increment(config.baud_increment);
        let tick = self.baud.advance_clock();
        let fell = self.line_q && !line;
        self.line_q = line;
        self.output = None;

        match self.state {
            FrameState::Idle => {
                if fell {
                    self.start_frame(config);
                }
                return None;
            }
            _ if !tick => return None,
            FrameState::Start => {
                if line {
                    trace!("rx: start bit not confirmed, back to idle");
                    self.state = FrameState::Idle;
                    return None;
                }
            }
            FrameState::Data => {
                self.data |= (line as u8) << self.bit_index;
                self.bit_index += 1;
                self.parity_acc ^= line;
            }
            FrameState::Parity => {
                self.parity_bit = Some(line);
                self.parity_error = line != self.parity_acc;
            }
            FrameState::Stop => {
                if line {
                    self.stop_count += 1;
                } else {
                    self.frame_error = true;
                }
            }
        }

        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        let next = self.state.next(self.format.parity);
        if next == FrameState::Idle {
            self.finish_frame();
        }
        self.state = next;
        self.remaining = next.periods(&self.format);
        self.output
    }

    fn start_frame(&mut self, config: &FrameConfig) {
        self.format = *config;
        self.baud.restart(HALF_PHASE);
        self.state = FrameState::Start;
        self.remaining = FrameState::Start.periods(&self.format);
        self.bit_index = 0;
        self.data = 0;
        self.parity_acc = self.format.parity.seed();
        self.parity_bit = None;
        self.stop_count = 0;
        self.parity_error = false;
        self.frame_error = false;
        trace!("rx: start bit detected, format {:?}", self.format);
    }

    fn finish_frame(&mut self) {
        let output = RxOutput {
            frame: RxFrame {
                data: self.data,
                data_bits: self.format.data_bits,
                parity_bit: self.parity_bit,
                stop_count: self.stop_count,
                stop_bits: self.format.stop_bits,
            },
            parity_error: self.parity_error,
            frame_error: self.frame_error,
        };
        trace!(
            "rx: frame {:#04x} complete (pe={}, fe={})",
            output.frame.data, output.parity_error, output.frame_error
        );
        self.output = Some(output);
    }
}
