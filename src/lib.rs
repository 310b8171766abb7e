//! # Wishbone UART model
//!
//! Clock-accurate software model of a Wishbone UART peripheral: a fractional baud rate
//! generator, receive and transmit framing engines and a memory-mapped register file.
//!
//! Every call to [Uart::tick] advances the whole peripheral by one system clock in a fixed
//! order:
//!
//! 1. The RX pin is clocked through the input registering stages ([sync]).
//! 2. The [rx] and [tx] engines advance their baud generators and state machines.
//! 3. The [regfile] commits the bus access of this clock together with the engine outputs.
//!
//! Receive errors (framing, parity, overrun) are never reported as Rust errors. They are sticky
//! status bits which must be polled through the SR register. The [serial] module provides a
//! host side driver which does exactly that.
#![no_std]

use log::warn;

pub mod baud;
pub mod bus;
pub mod config;
pub mod frame;
pub mod regfile;
pub mod registers;
pub mod sync;

pub mod rx;
pub use rx::*;

pub mod tx;
pub use tx::*;

pub mod serial;
pub use serial::*;

pub use bus::{BusRequest, BusResponse};
pub use config::SimConfig;
pub use frame::{FrameConfig, RxFrame, RxOutput};
pub use regfile::RegisterFile;

use regfile::EngineEvents;

/// Complete UART peripheral.
#[derive(Debug, Clone)]
pub struct Uart {
    config: SimConfig,
    regs: RegisterFile,
    rx: RxEngine,
    tx: TxEngine,
    sync: sync::InputSync,
    bus: bus::WishboneSlave,
    rx_pin: bool,
}

impl Default for Uart {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Uart {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            regs: RegisterFile::new(),
            rx: RxEngine::new(),
            tx: TxEngine::new(),
            sync: sync::InputSync::new(config.sync_stages()),
            bus: bus::WishboneSlave::new(),
            rx_pin: true,
        }
    }

    /// Returns to the power-on state. The simulation parameters and the RX pin level are kept.
    pub fn reset(&mut self) {
        self.regs = RegisterFile::new();
        self.rx.reset();
        self.tx.reset();
        self.sync.reset();
        self.bus = bus::WishboneSlave::new();
    }

    #[inline(always)]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Register state, for inspection without bus side effects.
    #[inline(always)]
    pub const fn registers(&self) -> &RegisterFile {
        &self.regs
    }

    #[inline(always)]
    pub const fn rx_engine(&self) -> &RxEngine {
        &self.rx
    }

    #[inline(always)]
    pub const fn tx_engine(&self) -> &TxEngine {
        &self.tx
    }

    /// Drives the RX pin. The level is sampled on every following clock.
    #[inline(always)]
    pub fn set_rx(&mut self, level: bool) {
        self.rx_pin = level;
    }

    #[inline(always)]
    pub const fn rx_pin(&self) -> bool {
        self.rx_pin
    }

    /// Level of the TX pin.
    #[inline(always)]
    pub const fn tx(&self) -> bool {
        self.tx.tx()
    }

    /// A received frame was delivered to the register file on the last clock.
    ///
    /// The pulse coincides with the register update, which is one clock after the receive valid
    /// strobe of the hardware (the hardware needs one more clock to commit the frame).
    #[inline(always)]
    pub const fn rx_valid(&self) -> bool {
        self.rx.output_valid()
    }

    /// The transmitter finished a frame on the last clock.
    #[inline(always)]
    pub const fn tx_done(&self) -> bool {
        self.tx.done()
    }

    /// Advances the peripheral by one system clock.
    pub fn tick(&mut self, request: BusRequest) -> BusResponse {
        let pin = if self.config.loopback() {
            self.tx.tx()
        } else {
            self.rx_pin
        };
        let line = self.sync.step(pin);

        let frame_config = self.regs.frame_config();
        let rx = self.rx.step(line, &frame_config);
        let tx = self.tx.step(self.regs.tx_request(), &frame_config);

        let accepted = self.bus.accepts(&request);
        let access = if accepted {
            match request.decode() {
                Ok(access) => Some(access),
                Err(e) => {
                    warn!("unmapped bus access: {e}");
                    None
                }
            }
        } else {
            None
        };
        let events = EngineEvents {
            rx,
            tx_accepted: tx.accepted,
            tx_busy: !self.tx.is_idle(),
        };
        let read_data = self.regs.clock(access, &events);
        self.bus.complete(accepted, read_data.unwrap_or(0));
        self.bus.response()
    }

    /// Advances by one clock without a bus request.
    #[inline]
    pub fn idle_tick(&mut self) -> BusResponse {
        self.tick(BusRequest::IDLE)
    }

    /// Advances by `clocks` clocks without bus requests.
    pub fn run(&mut self, clocks: u32) {
        for _ in 0..clocks {
            self.idle_tick();
        }
    }
}
