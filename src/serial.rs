//! Host side driver for the simulated peripheral.
//!
//! [SerialPort] only talks to the [Uart] through bus transactions, like software running on a
//! CPU attached to the Wishbone bus would. Every transaction advances the simulation by two
//! clocks (request and acknowledge), so polling loops make progress on their own.
use core::convert::Infallible;

use crate::{
    BusRequest, Uart,
    baud::InvalidBaudRate,
    frame::FrameConfig,
    registers::{RegisterOffset, Status},
};

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RxErrors {
    parity: bool,
    frame: bool,
    overrun: bool,
}

impl RxErrors {
    pub const fn new() -> Self {
        Self {
            parity: false,
            frame: false,
            overrun: false,
        }
    }

    pub const fn parity(&self) -> bool {
        self.parity
    }

    pub const fn frame(&self) -> bool {
        self.frame
    }

    pub const fn overrun(&self) -> bool {
        self.overrun
    }

    pub const fn has_errors(&self) -> bool {
        self.parity || self.frame || self.overrun
    }
}

/// Extracts the error bits of a status register value.
pub fn handle_status_reg_errors(status_reg: &Status) -> Option<RxErrors> {
    let errors = RxErrors {
        parity: status_reg.pe(),
        frame: status_reg.fe(),
        overrun: status_reg.rxoe(),
    };
    if !errors.has_errors() {
        return None;
    }
    Some(errors)
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct RxErrorsCounted {
    parity: u8,
    frame: u8,
    overrun: u8,
}

impl RxErrorsCounted {
    pub const fn new() -> Self {
        Self {
            parity: 0,
            frame: 0,
            overrun: 0,
        }
    }

    pub const fn parity(&self) -> u8 {
        self.parity
    }

    pub const fn frame(&self) -> u8 {
        self.frame
    }

    pub const fn overrun(&self) -> u8 {
        self.overrun
    }

    pub fn has_errors(&self) -> bool {
        self.parity > 0 || self.frame > 0 || self.overrun > 0
    }
}

pub struct SerialPort<'uart> {
    uart: &'uart mut Uart,
    errors: RxErrorsCounted,
}

impl<'uart> SerialPort<'uart> {
    pub fn new(uart: &'uart mut Uart) -> Self {
        Self {
            uart,
            errors: RxErrorsCounted::new(),
        }
    }

    #[inline(always)]
    pub fn uart(&mut self) -> &mut Uart {
        self.uart
    }

    /// Single bus read. Takes two clocks.
    pub fn read_register(&mut self, offset: RegisterOffset) -> u32 {
        let response = self.uart.tick(BusRequest::read(offset.offset()));
        self.uart.idle_tick();
        response.data
    }

    /// Single bus write. Takes two clocks.
    pub fn write_register(&mut self, offset: RegisterOffset, value: u32) {
        self.uart.tick(BusRequest::write(offset.offset(), value));
        self.uart.idle_tick();
    }

    /// Programs the control register. Takes effect for the next frame of each engine.
    pub fn configure(&mut self, config: &FrameConfig) {
        self.write_register(RegisterOffset::Cr, config.to_control().raw_value());
    }

    /// Programs 8N1 at the given baud rate, using the simulated system clock.
    pub fn configure_baud(&mut self, baud: u32) -> Result<FrameConfig, InvalidBaudRate> {
        let config = self.uart.config().frame_config(baud)?;
        self.configure(&config);
        Ok(config)
    }

    /// Reads SR. The error bits are cleared by the read, they are accumulated into the error
    /// counters of the driver.
    pub fn read_status(&mut self) -> Status {
        let status = Status::new_with_raw_value(self.read_register(RegisterOffset::Sr));
        if let Some(errors) = handle_status_reg_errors(&status) {
            self.handle_errors(errors);
        }
        status
    }

    #[inline]
    pub fn tx_idle(&mut self) -> bool {
        self.read_status().txe()
    }

    #[inline]
    pub fn rx_has_data(&mut self) -> bool {
        self.read_status().rxne()
    }

    /// Write into TXDR.
    ///
    /// Returns [nb::Error::WouldBlock] if the transmitter is busy.
    pub fn write_txdr(&mut self, data: u8) -> nb::Result<(), Infallible> {
        if !self.tx_idle() {
            return Err(nb::Error::WouldBlock);
        }
        self.write_txdr_unchecked(data);
        Ok(())
    }

    /// Write into TXDR without checking TXE. The write is dropped by the peripheral if the
    /// transmitter is busy.
    #[inline(always)]
    pub fn write_txdr_unchecked(&mut self, data: u8) {
        self.write_register(RegisterOffset::Txdr, data as u32);
    }

    /// Read from RXDR.
    ///
    /// Returns [nb::Error::WouldBlock] if no byte was received since the last read.
    pub fn read_rxdr(&mut self) -> nb::Result<u8, Infallible> {
        if !self.rx_has_data() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.read_rxdr_unchecked())
    }

    #[inline(always)]
    pub fn read_rxdr_unchecked(&mut self) -> u8 {
        self.read_register(RegisterOffset::Rxdr) as u8
    }

    /// Read the error counters and also resets them.
    pub fn read_and_clear_errors(&mut self) -> RxErrorsCounted {
        let errors = self.errors;
        self.errors = RxErrorsCounted::new();
        errors
    }

    fn handle_errors(&mut self, errors: RxErrors) {
        if errors.frame() {
            self.errors.frame = self.errors.frame.saturating_add(1);
        }
        if errors.parity() {
            self.errors.parity = self.errors.parity.saturating_add(1);
        }
        if errors.overrun() {
            self.errors.overrun = self.errors.overrun.saturating_add(1);
        }
    }
}

impl embedded_hal_nb::serial::ErrorType for SerialPort<'_> {
    type Error = Infallible;
}

impl embedded_hal_nb::serial::Write for SerialPort<'_> {
    #[inline]
    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        self.write_txdr(word)
    }

    #[inline]
    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        if !self.tx_idle() {
            return Err(nb::Error::WouldBlock);
        }
        Ok(())
    }
}

impl embedded_hal_nb::serial::Read for SerialPort<'_> {
    #[inline]
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.read_rxdr()
    }
}

impl embedded_io::ErrorType for SerialPort<'_> {
    type Error = Infallible;
}

impl embedded_io::Read for SerialPort<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.rx_has_data() {}
        buf[0] = self.read_rxdr_unchecked();
        let mut read = 1;
        for byte in buf.iter_mut().skip(1) {
            match self.read_rxdr() {
                Ok(data) => {
                    *byte = data;
                    read += 1;
                }
                Err(nb::Error::WouldBlock) => break,
            }
        }
        Ok(read)
    }
}

impl embedded_io::Write for SerialPort<'_> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        while !self.tx_idle() {}
        self.write_txdr_unchecked(buf[0]);
        let mut written = 1;
        for &byte in buf.iter().skip(1) {
            match self.write_txdr(byte) {
                Ok(_) => written += 1,
                Err(nb::Error::WouldBlock) => break,
            }
        }
        Ok(written)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        while !self.tx_idle() {}
        Ok(())
    }
}
