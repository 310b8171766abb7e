//! Frame format shared by the receiver and the transmitter.
use arbitrary_int::u17;

use crate::{
    baud::{self, InvalidBaudRate},
    registers::{Control, DataBits, ParityMode, StopBits},
};

/// Framing state shared by both engines.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum FrameState {
    #[default]
    Idle,
    Start,
    Data,
    Parity,
    Stop,
}

impl FrameState {
    /// State entered once the current state has run for all of its bit periods.
    pub const fn next(self, parity: ParityMode) -> Self {
        match self {
            FrameState::Idle => FrameState::Start,
            FrameState::Start => FrameState::Data,
            FrameState::Data if parity.enabled() => FrameState::Parity,
            FrameState::Data | FrameState::Parity => FrameState::Stop,
            FrameState::Stop => FrameState::Idle,
        }
    }

    /// Number of bit periods spent in this state for the given format.
    pub const fn periods(self, format: &FrameConfig) -> u8 {
        match self {
            FrameState::Idle => 0,
            FrameState::Start | FrameState::Parity => 1,
            FrameState::Data => format.data_bits.count(),
            FrameState::Stop => format.stop_bits.count(),
        }
    }
}

/// Frame format and bit rate, as programmed through the control register.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FrameConfig {
    pub data_bits: DataBits,
    pub parity: ParityMode,
    pub stop_bits: StopBits,
    pub baud_increment: u17,
}

impl FrameConfig {
    pub const fn new(
        data_bits: DataBits,
        parity: ParityMode,
        stop_bits: StopBits,
        baud_increment: u17,
    ) -> Self {
        Self {
            data_bits,
            parity,
            stop_bits,
            baud_increment,
        }
    }

    /// 8 data bits, no parity, 1 stop bit at the given rate.
    pub fn from_baud(baud: u32, clock_hz: u32) -> Result<Self, InvalidBaudRate> {
        let increment = baud::increment_for(baud, clock_hz)?;
        Ok(Self::new(
            DataBits::Eight,
            ParityMode::NoParity,
            StopBits::One,
            u17::new(increment.into()),
        ))
    }

    #[must_use]
    pub const fn with_data_bits(mut self, data_bits: DataBits) -> Self {
        self.data_bits = data_bits;
        self
    }

    #[must_use]
    pub const fn with_parity(mut self, parity: ParityMode) -> Self {
        self.parity = parity;
        self
    }

    #[must_use]
    pub const fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Number of bit periods of a complete frame, start bit included.
    pub const fn frame_bits(&self) -> u8 {
        1 + self.data_bits.count() + self.parity.enabled() as u8 + self.stop_bits.count()
    }

    /// Encodes the configuration into a CR value.
    ///
    /// The CR increment field is 16 bits wide. An increment of 65536 saturates to 65535.
    pub fn to_control(&self) -> Control {
        let increment = self.baud_increment.value().min(u32::from(u16::MAX)) as u16;
        Control::new_with_raw_value(0)
            .with_baud_increment(increment)
            .with_data_bits(self.data_bits)
            .with_stop_bits(self.stop_bits)
            .with_parity(self.parity)
    }
}

impl From<Control> for FrameConfig {
    fn from(cr: Control) -> Self {
        Self::new(
            cr.data_bits(),
            cr.parity(),
            cr.stop_bits(),
            u17::new(cr.baud_increment().into()),
        )
    }
}

impl From<FrameConfig> for Control {
    fn from(config: FrameConfig) -> Self {
        config.to_control()
    }
}

/// Parity bit which must accompany `data` for the given format.
///
/// The XOR over the data bits is seeded with 1 for odd parity and 0 for even parity.
pub fn parity_bit(data: u8, data_bits: DataBits, parity: ParityMode) -> bool {
    let ones = (data & data_bits.mask()).count_ones();
    parity.seed() ^ (ones % 2 == 1)
}

/// A frame assembled by the receiver.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct RxFrame {
    pub data: u8,
    pub data_bits: DataBits,
    pub parity_bit: Option<bool>,
    /// Number of stop bits which were sampled high.
    pub stop_count: u8,
    pub stop_bits: StopBits,
}

impl RxFrame {
    /// Frame word as shifted in: data bits, the parity bit if any, then the stop bit samples.
    pub fn raw(&self) -> u16 {
        let mut raw = u16::from(self.data & self.data_bits.mask());
        let mut shift = self.data_bits.count();
        if let Some(parity) = self.parity_bit {
            raw |= u16::from(parity) << shift;
            shift += 1;
        }
        let stop_count = self.stop_count.min(self.stop_bits.count());
        raw | (((1u16 << stop_count) - 1) << shift)
    }
}

/// Receiver output, valid for a single clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RxOutput {
    pub frame: RxFrame,
    pub parity_error: bool,
    pub frame_error: bool,
}
