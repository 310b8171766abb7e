//! Register file bridging the bus to the two framing engines.
//!
//! All register state is updated in two phases per clock: the next state is computed from the
//! current state, the engine outputs of this clock and the bus access, and only then committed.
//! This fixes the outcome of the races between the bus and the receiver:
//!
//! - An SR read clears RXOE, FE and PE, but a bit latched by the receiver on the same clock is
//!   both visible in the read value and still set afterwards.
//! - An RXDR read returns the old byte. A frame completing on the same clock still lands in
//!   RXDR and sets RXNE, without raising an overrun.
//! - A TXDR write is dropped while the transmitter is busy or a request is still pending.
use log::debug;

use crate::{
    frame::{FrameConfig, RxOutput},
    registers::{Control, RegisterOffset, RxData, Status, TxData},
};

/// Bus access performed on a clock.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read(RegisterOffset),
    Write(RegisterOffset, u32),
}

/// Outputs of the framing engines for the current clock.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EngineEvents {
    pub rx: Option<RxOutput>,
    /// The transmitter took the pending transmit request.
    pub tx_accepted: bool,
    /// The transmitter is not idle after this clock.
    pub tx_busy: bool,
}

#[derive(Debug, Copy, Clone)]
pub struct RegisterFile {
    cr: Control,
    rxdr: RxData,
    txdr: TxData,
    rxne: bool,
    rxoe: bool,
    fe: bool,
    pe: bool,
    tx_busy: bool,
    tx_request: bool,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    pub const fn new() -> Self {
        Self {
            cr: Control::new_with_raw_value(0),
            rxdr: RxData::new_with_raw_value(0),
            txdr: TxData::new_with_raw_value(0),
            rxne: false,
            rxoe: false,
            fe: false,
            pe: false,
            tx_busy: false,
            tx_request: false,
        }
    }

    #[inline(always)]
    pub fn control(&self) -> Control {
        self.cr
    }

    #[inline]
    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig::from(self.cr)
    }

    /// Current SR value. Reading it through this method has no side effect.
    pub fn status(&self) -> Status {
        Status::builder()
            .with_pe(self.pe)
            .with_fe(self.fe)
            .with_rxoe(self.rxoe)
            .with_txe(self.txe())
            .with_rxne(self.rxne)
            .build()
    }

    #[inline(always)]
    pub fn rx_data(&self) -> RxData {
        self.rxdr
    }

    #[inline(always)]
    pub fn tx_data(&self) -> TxData {
        self.txdr
    }

    #[inline(always)]
    pub const fn txe(&self) -> bool {
        !self.tx_busy && !self.tx_request
    }

    /// Byte the transmitter should start sending, if a request is pending.
    #[inline]
    pub fn tx_request(&self) -> Option<u8> {
        self.tx_request.then(|| self.txdr.data())
    }

    /// Computes and commits the register state of one clock. Returns the read data if `access`
    /// is a read.
    pub fn clock(&mut self, access: Option<Access>, events: &EngineEvents) -> Option<u32> {
        let (next, read_data) = self.evaluate(access, events);
        *self = next;
        read_data
    }

    fn evaluate(&self, access: Option<Access>, events: &EngineEvents) -> (Self, Option<u32>) {
        let mut next = *self;
        let sr_read = access == Some(Access::Read(RegisterOffset::Sr));
        let rxdr_read = access == Some(Access::Read(RegisterOffset::Rxdr));

        // Transmitter side.
        next.tx_busy = events.tx_busy;
        if events.tx_accepted {
            next.tx_request = false;
        }

        // Receiver side. Bits raised on this clock are set regardless of the clears below.
        let overrun = events.rx.is_some() && self.rxne && !rxdr_read;
        let new_fe = events.rx.is_some_and(|rx| rx.frame_error);
        let new_pe = events.rx.is_some_and(|rx| rx.parity_error);
        if sr_read {
            next.rxoe = false;
            next.fe = false;
            next.pe = false;
        }
        if rxdr_read {
            next.rxne = false;
            next.rxdr = RxData::new_with_raw_value(0);
        }
        next.rxoe |= overrun;
        next.fe |= new_fe;
        next.pe |= new_pe;
        if let Some(rx) = events.rx {
            next.rxne = true;
            next.rxdr = RxData::new_with_raw_value(0).with_data(rx.frame.data);
        }

        let read_data = match access {
            None => None,
            Some(Access::Read(offset)) => Some(match offset {
                RegisterOffset::Sr => Status::builder()
                    .with_pe(self.pe || new_pe)
                    .with_fe(self.fe || new_fe)
                    .with_rxoe(self.rxoe || overrun)
                    .with_txe(next.txe())
                    .with_rxne(self.rxne || events.rx.is_some())
                    .build()
                    .raw_value(),
                RegisterOffset::Cr => self.cr.raw_value(),
                RegisterOffset::Rxdr => self.rxdr.raw_value(),
                RegisterOffset::Txdr => self.txdr.raw_value(),
            }),
            Some(Access::Write(offset, value)) => {
                match offset {
                    RegisterOffset::Cr => {
                        next.cr = Control::new_with_raw_value(value & Control::IMPLEMENTED_MASK);
                        debug!("cr write: {:?}", next.cr);
                    }
                    RegisterOffset::Txdr => {
                        if next.tx_busy || next.tx_request {
                            debug!("txdr write of {value:#x} dropped, transmitter busy");
                        } else {
                            next.txdr = TxData::new_with_raw_value(value & 0xFF);
                            next.tx_request = true;
                        }
                    }
                    RegisterOffset::Sr | RegisterOffset::Rxdr => {
                        debug!("write of {value:#x} to read-only register {offset:?} ignored");
                    }
                }
                None
            }
        };
        (next, read_data)
    }
}
