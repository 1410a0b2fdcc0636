//! Error types for the host client

use thiserror::Error;

use crate::ines::InesError;

/// Host-side protocol and I/O errors
#[derive(Debug, Error)]
pub enum HostError {
    /// Nothing came back before the read timeout
    #[error("Timeout: no response from programmer")]
    NoResponse,

    /// Fewer bytes came back than the command answers with
    #[error("Received {received} bytes, expected {expected}")]
    NotEnoughData { expected: usize, received: usize },

    /// Response checksum does not match its payload
    #[error("Corrupted data received (crc 0x{received:04X}, computed 0x{computed:04X})")]
    CorruptedDataReceived { computed: u16, received: u16 },

    /// Programmer rejected the request checksum
    #[error("Corrupted data transmitted (programmer computed crc 0x{remote_crc:04X})")]
    CorruptedDataTransmitted { remote_crc: u16 },

    /// First reply byte is neither an ack nor an error frame
    #[error("Unacceptable reply 0x{0:02X}; check the connection and firmware version")]
    UnacceptableReply(u8),

    /// Response passed its checksum but has the wrong content
    #[error("Unexpected response to {command}: {detail}")]
    UnexpectedResponse {
        command: &'static str,
        detail: String,
    },

    /// Image and chip sizes disagree
    #[error("Input file and ROM size mismatch: file is {file} bytes, ROM is {rom} bytes")]
    SizeMismatch { file: u64, rom: u64 },

    /// Page index outside what the programmer can address
    #[error("Page {page} out of range (maximum {max})")]
    InvalidPage { page: u32, max: u32 },

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// iNES image problem
    #[error("iNES: {0}")]
    Ines(#[from] InesError),

    /// I/O error during communication or file access
    #[error("I/O error: {0}")]
    IoError(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::IoError(e.to_string())
    }
}
