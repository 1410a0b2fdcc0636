//! Test doubles for the transmitter and the chip bus

extern crate std;

use std::vec::Vec;

use crate::error::{Error, Result};
use crate::programmer::{ChipBus, ControlLine, ControlLines, Latch};

/// Transmitter sink that records every byte, optionally refusing after a limit
pub struct Capture {
    bytes: Vec<u8>,
    limit: Option<usize>,
}

impl Capture {
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            limit: None,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl embedded_io::ErrorType for Capture {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, Self::Error> {
        if buf.is_empty() {
            return Ok(0);
        }
        if let Some(limit) = self.limit {
            if self.bytes.len() >= limit {
                return Err(embedded_io::ErrorKind::Other);
            }
        }
        self.bytes.push(buf[0]);
        Ok(1)
    }

    fn flush(&mut self) -> core::result::Result<(), Self::Error> {
        Ok(())
    }
}

/// One call made on a [`RecordingBus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOp {
    Address(u32),
    AddressLow(u8),
    Control(ControlLine, bool),
    DataOutput,
    DataInput,
    Write(u8),
    Read(u8),
    Latch(Latch, u8),
    Delay(u32),
}

/// Chip bus that records calls and answers reads with an address pattern
pub struct RecordingBus {
    ops: Vec<BusOp>,
    lines: ControlLines,
    address: u32,
    latched: u32,
    use_latches: bool,
    reads_left: Option<usize>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            lines: ControlLines::empty(),
            address: 0,
            latched: 0,
            use_latches: false,
            reads_left: None,
        }
    }

    /// Data the fake chip returns for `address`
    pub fn pattern(address: u32) -> u8 {
        ((address ^ (address >> 8) ^ (address >> 16)) as u8) ^ 0x5A
    }

    pub fn ops(&self) -> &[BusOp] {
        &self.ops
    }

    pub fn lines(&self) -> ControlLines {
        self.lines
    }

    pub fn fail_reads_after(&mut self, n: usize) {
        self.reads_left = Some(n);
    }
}

impl ChipBus for RecordingBus {
    fn set_address(&mut self, address: u32) -> Result<()> {
        self.use_latches = false;
        self.address = address;
        self.ops.push(BusOp::Address(address));
        Ok(())
    }

    fn set_address_low(&mut self, low: u8) -> Result<()> {
        self.use_latches = false;
        self.address = (self.address & !0xFF) | low as u32;
        self.ops.push(BusOp::AddressLow(low));
        Ok(())
    }

    fn set_control(&mut self, line: ControlLine, active: bool) -> Result<()> {
        self.lines.set(line.flag(), active);
        self.ops.push(BusOp::Control(line, active));
        Ok(())
    }

    fn data_bus_output(&mut self) -> Result<()> {
        self.ops.push(BusOp::DataOutput);
        Ok(())
    }

    fn data_bus_input(&mut self) -> Result<()> {
        self.ops.push(BusOp::DataInput);
        Ok(())
    }

    fn write_data(&mut self, byte: u8) -> Result<()> {
        self.ops.push(BusOp::Write(byte));
        Ok(())
    }

    fn read_data(&mut self) -> Result<u8> {
        if let Some(left) = self.reads_left.as_mut() {
            if *left == 0 {
                return Err(Error::BusError);
            }
            *left -= 1;
        }
        let address = if self.use_latches {
            self.latched
        } else {
            self.address
        };
        let byte = Self::pattern(address);
        self.ops.push(BusOp::Read(byte));
        Ok(byte)
    }

    fn strobe_latch(&mut self, latch: Latch, value: u8) -> Result<()> {
        self.use_latches = true;
        self.latched = match latch {
            Latch::Low => (self.latched & !0xFF) | value as u32,
            Latch::High => (self.latched & 0xFF) | (value as u32) << 8,
        };
        self.ops.push(BusOp::Latch(latch, value));
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.ops.push(BusOp::Delay(us));
    }
}
