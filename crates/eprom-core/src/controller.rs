//! The firmware's single state object
//!
//! [`Controller`] owns the frame assembler, the chip bus and the
//! transmitter. The receive interrupt hands it one byte at a time through
//! [`Controller::on_byte`]; everything that byte triggers (CRC gate,
//! acknowledgement, the handler itself) finishes before the call returns.

use crate::error::Result;
use crate::frame::{CrcCheck, Feed, FrameAssembler, FrameConfig, FrameState};
use crate::programmer::{self, ChipBus};
use crate::protocol::{CommandKind, ACK, ACK_MAGIC, ERR};
use crate::tx::ByteTransmitter;

/// What a received byte caused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Unrecognised selector while idle
    Ignored,
    /// Byte consumed as part of a frame still being assembled
    Assembling,
    /// Frame passed the CRC gate and its handler ran to completion
    Dispatched(CommandKind),
    /// Frame failed the CRC gate; the error frame was sent
    Rejected {
        /// Checksum sent back to the host
        computed: u16,
    },
}

/// Protocol engine for one programmer
pub struct Controller<B, W> {
    frame: FrameAssembler,
    bus: B,
    tx: W,
}

impl<B, W> Controller<B, W>
where
    B: ChipBus,
    W: ByteTransmitter,
{
    /// Create a controller with the default frame configuration
    pub fn new(bus: B, tx: W) -> Self {
        Self::with_config(bus, tx, FrameConfig::default())
    }

    /// Create a controller with an explicit frame configuration
    pub fn with_config(bus: B, tx: W, config: FrameConfig) -> Self {
        Self {
            frame: FrameAssembler::with_config(config),
            bus,
            tx,
        }
    }

    /// Handle one received byte
    ///
    /// On error the handler was cut short: the control lines have been
    /// driven inactive again and the controller is back in idle, ready for
    /// the next selector. Whatever part of the response was already sent
    /// stays sent.
    pub fn on_byte(&mut self, byte: u8) -> Result<Event> {
        match self.frame.push(byte) {
            Feed::Ignored => Ok(Event::Ignored),
            Feed::Started(_) | Feed::Pending => Ok(Event::Assembling),
            Feed::Complete {
                kind,
                check: CrcCheck::Valid,
            } => {
                self.run(kind)?;
                Ok(Event::Dispatched(kind))
            }
            Feed::Complete {
                kind,
                check: CrcCheck::Mismatch { computed, received },
            } => {
                log::warn!(
                    "{}: crc mismatch, computed 0x{:04X}, received 0x{:04X}",
                    kind,
                    computed,
                    received
                );
                self.tx.send_byte(ERR)?;
                self.tx.send_u16_le(computed)?;
                Ok(Event::Rejected { computed })
            }
        }
    }

    /// Idle-loop hook for the stall policy; true if a partial frame was dropped
    pub fn tick(&mut self) -> bool {
        self.frame.tick()
    }

    /// Current frame state
    pub fn state(&self) -> FrameState {
        self.frame.state()
    }

    /// Borrow the chip bus
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Mutably borrow the chip bus
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Borrow the transmitter
    pub fn tx(&self) -> &W {
        &self.tx
    }

    /// Mutably borrow the transmitter
    pub fn tx_mut(&mut self) -> &mut W {
        &mut self.tx
    }

    /// Take the controller apart
    pub fn into_parts(self) -> (B, W) {
        (self.bus, self.tx)
    }

    fn run(&mut self, kind: CommandKind) -> Result<()> {
        self.tx.send_byte(ACK)?;
        self.tx.send_bytes(&ACK_MAGIC)?;

        let result = programmer::dispatch(
            kind,
            &mut self.bus,
            &mut self.tx,
            self.frame.buffer_mut(),
        );
        if let Err(e) = result {
            log::error!("{}: aborted: {}", kind, e);
            if let Err(release) = self.bus.release() {
                log::error!("{}: failed to release chip lines: {}", kind, release);
            }
        }
        result
    }
}
