//! Wishbone slave handshake.
//!
//! A request is taken on a clock where `cycle` and `strobe` are both asserted and the slave is
//! not acknowledging the previous request. The register access happens on that clock and the
//! acknowledge, together with the read data, is driven for exactly the following cycle.
use crate::{
    regfile::Access,
    registers::{InvalidOffset, RegisterOffset},
};

/// Master side signals for one clock.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BusRequest {
    pub cycle: bool,
    pub strobe: bool,
    pub write: bool,
    pub addr: u32,
    pub data: u32,
}

impl BusRequest {
    pub const IDLE: Self = Self {
        cycle: false,
        strobe: false,
        write: false,
        addr: 0,
        data: 0,
    };

    pub const fn read(addr: u32) -> Self {
        Self {
            cycle: true,
            strobe: true,
            write: false,
            addr,
            data: 0,
        }
    }

    pub const fn write(addr: u32, data: u32) -> Self {
        Self {
            cycle: true,
            strobe: true,
            write: true,
            addr,
            data,
        }
    }

    /// Bus cycle kept open without a new strobe, as done while waiting for the acknowledge.
    pub const fn hold() -> Self {
        Self {
            cycle: true,
            ..Self::IDLE
        }
    }

    /// Decodes the addressed register and the access type.
    pub fn decode(&self) -> Result<Access, InvalidOffset> {
        let offset = RegisterOffset::try_from(self.addr)?;
        Ok(if self.write {
            Access::Write(offset, self.data)
        } else {
            Access::Read(offset)
        })
    }
}

/// Slave side signals, valid during the cycle after a clock.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct BusResponse {
    pub ack: bool,
    pub data: u32,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct WishboneSlave {
    response: BusResponse,
}

impl WishboneSlave {
    pub const fn new() -> Self {
        Self {
            response: BusResponse {
                ack: false,
                data: 0,
            },
        }
    }

    /// Whether `request` starts a new access on this clock.
    #[inline]
    pub const fn accepts(&self, request: &BusRequest) -> bool {
        request.cycle && request.strobe && !self.response.ack
    }

    /// Registers the outcome of this clock. `read_data` is ignored if nothing was accepted.
    #[inline]
    pub fn complete(&mut self, accepted: bool, read_data: u32) {
        self.response = BusResponse {
            ack: accepted,
            data: if accepted { read_data } else { 0 },
        };
    }

    #[inline(always)]
    pub const fn response(&self) -> BusResponse {
        self.response
    }
}
