//! Error types for eprom-core
//!
//! This module provides a no_std compatible error type shared by the frame
//! state machine, the sequencer and the hardware traits.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Link errors
    /// The byte transmitter could not send a byte
    TransmitFailed,

    // Chip bus errors
    /// Generic chip bus failure reported by the hardware layer
    BusError,
    /// Data bus was in the wrong direction for the requested access
    BusDirection,
    /// Timing or ordering rule of the chip was violated
    SequenceViolation,

    // Frame errors
    /// Payload is shorter than the command requires
    PayloadTooShort,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransmitFailed => write!(f, "byte transmitter failed"),
            Self::BusError => write!(f, "chip bus error"),
            Self::BusDirection => write!(f, "data bus in wrong direction"),
            Self::SequenceViolation => write!(f, "chip timing or ordering violated"),
            Self::PayloadTooShort => write!(f, "payload too short for command"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
