//! In-process firmware: a controller wired to the simulated chip
//!
//! [`SimLink`] stands in for the whole programmer board. Bytes the host
//! would put on the wire go in through [`SimLink::send`]; the firmware's
//! answers collect in a [`ResponseQueue`] until the host reads them.

use std::collections::VecDeque;
use std::convert::Infallible;

use eprom_core::frame::{FrameConfig, FrameState};
use eprom_core::{Controller, Event};

use crate::chip::{SimConfig, SimulatedEprom};
use crate::error::{Result, SimError};

/// FIFO of bytes transmitted by the firmware
#[derive(Debug, Default)]
pub struct ResponseQueue {
    bytes: VecDeque<u8>,
}

impl ResponseQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes waiting
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Move up to `buf.len()` bytes out of the queue, returning the count
    pub fn pop_into(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.bytes.len());
        for (slot, byte) in buf.iter_mut().zip(self.bytes.drain(..n)) {
            *slot = byte;
        }
        n
    }

    /// Drop everything waiting
    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl embedded_io::ErrorType for ResponseQueue {
    type Error = Infallible;
}

impl embedded_io::Write for ResponseQueue {
    fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, Self::Error> {
        self.bytes.extend(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}

/// Simulated programmer board running the real firmware core
pub struct SimLink {
    controller: Controller<SimulatedEprom, ResponseQueue>,
}

impl SimLink {
    /// Board with a fresh chip built from `config`
    pub fn new(config: SimConfig) -> Self {
        Self::with_chip(SimulatedEprom::new(config))
    }

    /// Board around an existing chip
    pub fn with_chip(chip: SimulatedEprom) -> Self {
        Self::with_frame_config(chip, FrameConfig::default())
    }

    /// Board around an existing chip with an explicit frame configuration
    pub fn with_frame_config(chip: SimulatedEprom, config: FrameConfig) -> Self {
        Self {
            controller: Controller::with_config(chip, ResponseQueue::new(), config),
        }
    }

    /// Deliver bytes to the firmware, one receive event each
    ///
    /// Every byte is delivered even if an earlier one made a handler fail,
    /// as the receive interrupt would keep firing. The first failure is
    /// returned.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        let mut first_error = None;
        for &byte in bytes {
            match self.controller.on_byte(byte) {
                Ok(Event::Dispatched(kind)) => {
                    log::debug!("sim: {} handled", kind);
                    if let Err(e) = self.controller.bus().check_idle() {
                        log::warn!("sim: after {}: {}", kind, e);
                        first_error.get_or_insert(e);
                    }
                }
                Ok(Event::Rejected { computed }) => {
                    log::debug!("sim: frame rejected, crc 0x{:04X}", computed);
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("sim: firmware error: {}", e);
                    first_error.get_or_insert(SimError::Firmware(e));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Read up to `buf.len()` response bytes, returning the count
    pub fn receive(&mut self, buf: &mut [u8]) -> usize {
        self.controller.tx_mut().pop_into(buf)
    }

    /// Response bytes waiting to be read
    pub fn pending(&self) -> usize {
        self.controller.tx().len()
    }

    /// Forward an idle tick to the firmware's stall policy
    pub fn tick(&mut self) -> bool {
        self.controller.tick()
    }

    /// Current frame state of the firmware
    pub fn state(&self) -> FrameState {
        self.controller.state()
    }

    /// The simulated chip
    pub fn chip(&self) -> &SimulatedEprom {
        self.controller.bus()
    }

    /// The simulated chip, mutably
    pub fn chip_mut(&mut self) -> &mut SimulatedEprom {
        self.controller.bus_mut()
    }

    /// Take the chip back out
    pub fn into_chip(self) -> SimulatedEprom {
        self.controller.into_parts().0
    }
}
