//! Memory-mapped register definitions of the UART.
//!
//! | Offset | Register | Access                |
//! |--------|----------|-----------------------|
//! | `0x0`  | SR       | read, clears errors   |
//! | `0x4`  | CR       | read/write            |
//! | `0x8`  | RXDR     | read, clear-on-read   |
//! | `0xC`  | TXDR     | read/write            |

pub const SR_OFFSET: u32 = 0x0;
pub const CR_OFFSET: u32 = 0x4;
pub const RXDR_OFFSET: u32 = 0x8;
pub const TXDR_OFFSET: u32 = 0xC;

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no register mapped at offset {0:#x}")]
pub struct InvalidOffset(pub u32);

/// Register selected by a bus access.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RegisterOffset {
    Sr,
    Cr,
    Rxdr,
    Txdr,
}

impl RegisterOffset {
    pub const fn offset(self) -> u32 {
        match self {
            RegisterOffset::Sr => SR_OFFSET,
            RegisterOffset::Cr => CR_OFFSET,
            RegisterOffset::Rxdr => RXDR_OFFSET,
            RegisterOffset::Txdr => TXDR_OFFSET,
        }
    }
}

impl TryFrom<u32> for RegisterOffset {
    type Error = InvalidOffset;

    fn try_from(addr: u32) -> Result<Self, Self::Error> {
        match addr {
            SR_OFFSET => Ok(RegisterOffset::Sr),
            CR_OFFSET => Ok(RegisterOffset::Cr),
            RXDR_OFFSET => Ok(RegisterOffset::Rxdr),
            TXDR_OFFSET => Ok(RegisterOffset::Txdr),
            _ => Err(InvalidOffset(addr)),
        }
    }
}

/// Parity selection. Any non-zero encoding enables the parity bit, only
/// `0b10` selects even parity.
#[bitbybit::bitenum(u2, exhaustive = true)]
#[derive(Debug, Default, PartialEq, Eq)]
pub enum ParityMode {
    #[default]
    NoParity = 0b00,
    Odd = 0b01,
    Even = 0b10,
    OddAlt = 0b11,
}

impl ParityMode {
    #[inline]
    pub const fn enabled(self) -> bool {
        !matches!(self, ParityMode::NoParity)
    }

    /// Seed of the parity accumulator: 1 for odd parity, 0 for even parity.
    #[inline]
    pub const fn seed(self) -> bool {
        !matches!(self, ParityMode::Even)
    }
}

#[bitbybit::bitenum(u1, exhaustive = true)]
#[derive(Debug, Default, PartialEq, Eq)]
pub enum StopBits {
    #[default]
    One = 0b0,
    Two = 0b1,
}

impl StopBits {
    #[inline]
    pub const fn count(self) -> u8 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

#[bitbybit::bitenum(u1, exhaustive = true)]
#[derive(Debug, Default, PartialEq, Eq)]
pub enum DataBits {
    #[default]
    Seven = 0b0,
    Eight = 0b1,
}

impl DataBits {
    #[inline]
    pub const fn count(self) -> u8 {
        match self {
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }

    #[inline]
    pub const fn mask(self) -> u8 {
        match self {
            DataBits::Seven => 0x7F,
            DataBits::Eight => 0xFF,
        }
    }
}

/// Control register. Bits 15..4 are not implemented and read back as zero.
#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Control {
    /// Phase accumulator step added on every clock.
    #[bits(16..=31, rw)]
    pub baud_increment: u16,
    #[bit(3, rw)]
    pub data_bits: DataBits,
    #[bit(2, rw)]
    pub stop_bits: StopBits,
    #[bits(0..=1, rw)]
    pub parity: ParityMode,
}

impl Control {
    pub const IMPLEMENTED_MASK: u32 = 0xFFFF_000F;
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct Status {
    /// Parity error, sticky until SR is read.
    #[bit(4, rw)]
    pub pe: bool,
    /// Framing error, sticky until SR is read.
    #[bit(3, rw)]
    pub fe: bool,
    /// RX overrun, sticky until SR is read.
    #[bit(2, rw)]
    pub rxoe: bool,
    /// Transmitter idle and no transmission pending.
    #[bit(1, rw)]
    pub txe: bool,
    /// RXDR holds a byte which was not read yet.
    #[bit(0, rw)]
    pub rxne: bool,
}

impl Status {
    pub const ERROR_MASK: u32 = 0b1_1100;

    #[inline]
    pub fn has_errors(&self) -> bool {
        self.raw_value() & Self::ERROR_MASK != 0
    }
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct RxData {
    #[bits(0..=7, rw)]
    pub data: u8,
}

#[bitbybit::bitfield(u32, default = 0x0, debug)]
pub struct TxData {
    #[bits(0..=7, rw)]
    pub data: u8,
}
