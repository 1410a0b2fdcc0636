//! Command frame state machine
//!
//! The assembler is fed one received byte at a time. In `Idle` the byte is
//! a selector; a recognised selector zeroes the frame buffer, reseeds the
//! running CRC with the selector folded in and starts collecting the fixed
//! number of bytes that command needs. Anything else is dropped without a
//! trace on the wire.
//!
//! Once the last byte arrives the trailing two bytes are compared with the
//! running CRC and the state returns to `Idle`, whatever the outcome. The
//! frame stays in the buffer until the next selector is accepted, so the
//! caller can dispatch on it.

use crate::crc::Crc16;
use crate::protocol::{CommandKind, CRC_LEN, FRAME_CAPACITY};

/// Where the assembler is in the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    /// Waiting for a selector
    Idle,
    /// Collecting the body of a command
    Assembling {
        /// Command being assembled
        kind: CommandKind,
        /// Bytes the body needs, checksum included
        expected_len: usize,
        /// Bytes received so far
        received_len: usize,
    },
}

/// What to do when the host stops sending in the middle of a frame
///
/// The firmware has no clock of its own for this; the integration calls
/// [`FrameAssembler::tick`] from its idle loop and the policy counts those
/// calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StallPolicy {
    /// Keep waiting for the rest of the frame, forever
    #[default]
    WaitForever,
    /// Drop the partial frame after this many idle ticks without a byte
    ResetAfterIdleTicks(u32),
}

/// Frame assembler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameConfig {
    /// Behaviour for a stalled, partially received frame
    pub stall: StallPolicy,
}

/// Result of comparing the received checksum with the computed one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrcCheck {
    /// Checksums agree
    Valid,
    /// Checksums differ; the frame must be discarded
    Mismatch {
        /// CRC16 the firmware computed over selector and payload
        computed: u16,
        /// CRC16 the host sent
        received: u16,
    },
}

impl CrcCheck {
    /// Whether the frame may be dispatched
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Outcome of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    /// Not a selector while idle; nothing changed
    Ignored,
    /// A selector was accepted and assembly started
    Started(CommandKind),
    /// Byte stored, frame not complete yet
    Pending,
    /// Last byte of a frame arrived; state is back to idle
    Complete {
        /// Command the frame belongs to
        kind: CommandKind,
        /// Result of the CRC gate
        check: CrcCheck,
    },
}

/// Fixed-capacity command frame assembler
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    state: FrameState,
    buffer: [u8; FRAME_CAPACITY],
    crc: Crc16,
    config: FrameConfig,
    idle_ticks: u32,
}

impl FrameAssembler {
    /// Create an idle assembler with the default configuration
    pub const fn new() -> Self {
        Self::with_config(FrameConfig {
            stall: StallPolicy::WaitForever,
        })
    }

    /// Create an idle assembler with the given configuration
    pub const fn with_config(config: FrameConfig) -> Self {
        Self {
            state: FrameState::Idle,
            buffer: [0; FRAME_CAPACITY],
            crc: Crc16::new(),
            config,
            idle_ticks: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Active configuration
    pub fn config(&self) -> FrameConfig {
        self.config
    }

    /// The whole frame buffer
    pub fn buffer(&self) -> &[u8; FRAME_CAPACITY] {
        &self.buffer
    }

    /// The whole frame buffer, for handlers that work in place
    pub fn buffer_mut(&mut self) -> &mut [u8; FRAME_CAPACITY] {
        &mut self.buffer
    }

    /// CRC16 accumulated over the current (or last) frame so far
    pub fn running_crc(&self) -> u16 {
        self.crc.value()
    }

    /// Feed one received byte
    pub fn push(&mut self, byte: u8) -> Feed {
        self.idle_ticks = 0;

        match self.state {
            FrameState::Idle => match CommandKind::from_selector(byte) {
                Some(kind) => {
                    self.start(kind, byte);
                    Feed::Started(kind)
                }
                None => {
                    log::trace!("frame: ignoring byte 0x{:02X} while idle", byte);
                    Feed::Ignored
                }
            },
            FrameState::Assembling {
                kind,
                expected_len,
                received_len,
            } => {
                self.buffer[received_len] = byte;
                if received_len < expected_len - CRC_LEN {
                    self.crc.update(byte);
                }

                let received_len = received_len + 1;
                if received_len == expected_len {
                    self.state = FrameState::Idle;
                    let check = self.check_crc(expected_len);
                    log::debug!("frame: {} complete, {:?}", kind, check);
                    Feed::Complete { kind, check }
                } else {
                    self.state = FrameState::Assembling {
                        kind,
                        expected_len,
                        received_len,
                    };
                    Feed::Pending
                }
            }
        }
    }

    /// Count one idle-loop pass without a received byte
    ///
    /// Returns true if a stalled partial frame was dropped.
    pub fn tick(&mut self) -> bool {
        let limit = match self.config.stall {
            StallPolicy::WaitForever => return false,
            StallPolicy::ResetAfterIdleTicks(limit) => limit,
        };
        if self.state == FrameState::Idle {
            return false;
        }

        self.idle_ticks = self.idle_ticks.saturating_add(1);
        if self.idle_ticks < limit {
            return false;
        }

        if let FrameState::Assembling {
            kind,
            expected_len,
            received_len,
        } = self.state
        {
            log::warn!(
                "frame: dropping stalled {} frame ({}/{} bytes)",
                kind,
                received_len,
                expected_len
            );
        }
        self.reset();
        true
    }

    /// Abandon any partial frame and go back to idle
    pub fn reset(&mut self) {
        self.state = FrameState::Idle;
        self.idle_ticks = 0;
    }

    fn start(&mut self, kind: CommandKind, selector: u8) {
        self.buffer.fill(0);
        self.crc.reset();
        self.crc.update(selector);
        self.state = FrameState::Assembling {
            kind,
            expected_len: kind.frame_len(),
            received_len: 0,
        };
        log::trace!("frame: accepted {} selector", kind);
    }

    fn check_crc(&self, len: usize) -> CrcCheck {
        let received = u16::from_le_bytes([self.buffer[len - 2], self.buffer[len - 1]]);
        let computed = self.crc.value();
        if received == computed {
            CrcCheck::Valid
        } else {
            CrcCheck::Mismatch { computed, received }
        }
    }
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self::new()
    }
}
