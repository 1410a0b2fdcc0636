//! Chip bus trait definitions
//!
//! Everything the sequencer needs from the board is expressed here, so the
//! same handlers run against real port registers or against a simulated
//! chip. Control lines are described by what they mean ("active"), not by
//! their electrical level; the EPROM's CE#, OE# and PGM# are all active-low
//! and the implementation maps accordingly.

use crate::error::Result;
use bitflags::bitflags;

/// One of the chip's control lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLine {
    /// Chip enable (CE#)
    ChipEnable,
    /// Output enable (OE#)
    OutputEnable,
    /// Program enable (PGM#)
    ProgramEnable,
}

impl ControlLine {
    /// The flag for this line in a [`ControlLines`] set
    pub const fn flag(self) -> ControlLines {
        match self {
            Self::ChipEnable => ControlLines::CE,
            Self::OutputEnable => ControlLines::OE,
            Self::ProgramEnable => ControlLines::PGM,
        }
    }
}

bitflags! {
    /// Set of control lines currently driven active
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ControlLines: u8 {
        /// Chip enable
        const CE  = 1 << 0;
        /// Output enable
        const OE  = 1 << 1;
        /// Program enable
        const PGM = 1 << 2;
    }
}

impl Default for ControlLines {
    fn default() -> Self {
        ControlLines::empty()
    }
}

/// Address latch used by the fast-dump path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Latch {
    /// Latch holding A0..A7
    Low,
    /// Latch holding A8..A15
    High,
}

/// Direction of the shared data bus as seen from the microcontroller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BusDirection {
    /// High impedance; the chip may drive the bus
    #[default]
    Input,
    /// The microcontroller drives the bus
    Output,
}

/// Hardware access for a parallel EPROM
///
/// Calls are synchronous and complete before returning. `delay_us` must wait
/// at least the requested time; the sequencer relies on it for the chip's
/// setup and pulse-width minimums.
pub trait ChipBus {
    /// Drive the full address: A0..A15 on the address ports and the
    /// extension bits (A16 and up) on their dedicated lines
    fn set_address(&mut self, address: u32) -> Result<()>;

    /// Drive only A0..A7, leaving the rest of the address untouched
    fn set_address_low(&mut self, low: u8) -> Result<()>;

    /// Drive a control line active or inactive
    fn set_control(&mut self, line: ControlLine, active: bool) -> Result<()>;

    /// Switch the data bus to output (microcontroller drives it)
    fn data_bus_output(&mut self) -> Result<()>;

    /// Release the data bus to high impedance
    fn data_bus_input(&mut self) -> Result<()>;

    /// Put a byte on the data bus (bus must be an output)
    fn write_data(&mut self, byte: u8) -> Result<()>;

    /// Sample the data bus (bus must be an input)
    fn read_data(&mut self) -> Result<u8>;

    /// Load `value` into an address latch and pulse its enable
    ///
    /// Only called while CE and OE are inactive. Boards that feed the latch
    /// inputs from the data bus handle the bus direction themselves.
    fn strobe_latch(&mut self, latch: Latch, value: u8) -> Result<()>;

    /// Busy-wait for at least `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Drive every control line inactive and release the data bus
    ///
    /// PGM goes first, then OE, then CE, so the chip never sees a program
    /// pulse or an output phase without being selected.
    fn release(&mut self) -> Result<()> {
        self.set_control(ControlLine::ProgramEnable, false)?;
        self.set_control(ControlLine::OutputEnable, false)?;
        self.set_control(ControlLine::ChipEnable, false)?;
        self.data_bus_input()
    }
}

impl<T: ChipBus + ?Sized> ChipBus for &mut T {
    fn set_address(&mut self, address: u32) -> Result<()> {
        (**self).set_address(address)
    }

    fn set_address_low(&mut self, low: u8) -> Result<()> {
        (**self).set_address_low(low)
    }

    fn set_control(&mut self, line: ControlLine, active: bool) -> Result<()> {
        (**self).set_control(line, active)
    }

    fn data_bus_output(&mut self) -> Result<()> {
        (**self).data_bus_output()
    }

    fn data_bus_input(&mut self) -> Result<()> {
        (**self).data_bus_input()
    }

    fn write_data(&mut self, byte: u8) -> Result<()> {
        (**self).write_data(byte)
    }

    fn read_data(&mut self) -> Result<u8> {
        (**self).read_data()
    }

    fn strobe_latch(&mut self, latch: Latch, value: u8) -> Result<()> {
        (**self).strobe_latch(latch, value)
    }

    fn delay_us(&mut self, us: u32) {
        (**self).delay_us(us)
    }

    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}
