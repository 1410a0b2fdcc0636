//! Blocking byte transmitter
//!
//! The firmware answers one byte at a time: wait for the UART holding
//! register to drain, load the next byte. Any [`embedded_io::Write`] whose
//! `write` blocks until the byte is accepted gives exactly that behaviour, so
//! the trait is implemented for all of them.

use crate::crc::Crc16;
use crate::error::{Error, Result};

/// In-order, lossless, one-byte-at-a-time output
pub trait ByteTransmitter {
    /// Block until the peripheral can take a byte, then send it
    fn send_byte(&mut self, byte: u8) -> Result<()>;

    /// Send every byte of `bytes` in order
    fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.send_byte(byte)?;
        }
        Ok(())
    }

    /// Send a 16-bit value little-endian
    fn send_u16_le(&mut self, value: u16) -> Result<()> {
        self.send_bytes(&value.to_le_bytes())
    }

    /// Send `payload` followed by its CRC16, returning the checksum
    fn send_checked(&mut self, payload: &[u8]) -> Result<u16> {
        let mut crc = Crc16::new();
        for &byte in payload {
            self.send_byte(byte)?;
            crc.update(byte);
        }
        self.send_u16_le(crc.value())?;
        Ok(crc.value())
    }
}

impl<W: embedded_io::Write + ?Sized> ByteTransmitter for W {
    fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.write_all(&[byte]).map_err(|e| {
            log::error!(
                "tx: failed to send 0x{:02X}: {:?}",
                byte,
                embedded_io::Error::kind(&e)
            );
            Error::TransmitFailed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::testutil::Capture;

    #[test]
    fn test_send_bytes_in_order() {
        let mut out = Capture::new();
        out.send_bytes(b"ab").unwrap();
        out.send_u16_le(0x1234).unwrap();
        assert_eq!(out.bytes(), &[b'a', b'b', 0x34, 0x12]);
    }

    #[test]
    fn test_send_checked() {
        let mut out = Capture::new();
        let crc = out.send_checked(b"done").unwrap();
        assert_eq!(crc, crc16(b"done"));
        assert_eq!(&out.bytes()[..4], b"done");
        assert_eq!(&out.bytes()[4..], &crc.to_le_bytes());
    }

    #[test]
    fn test_full_sink_fails() {
        let mut out = Capture::with_limit(1);
        assert_eq!(out.send_bytes(b"ab"), Err(Error::TransmitFailed));
        assert_eq!(out.bytes(), b"a");
    }
}
