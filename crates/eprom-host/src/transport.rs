//! Transport layer abstraction for the burner link
//!
//! The protocol has no framing of its own on the response side: the host
//! knows how many bytes each answer has and reads until it has them or the
//! line goes quiet. Transports therefore expose a "read up to N bytes within
//! the timeout" primitive and leave the interpretation to the backend.

use crate::error::Result;

/// Transport trait for reading and writing bytes
pub trait Transport {
    /// Write bytes to the transport
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read up to `buf.len()` bytes
    ///
    /// Stops early when the read timeout expires with nothing new arriving.
    /// Returns the number of bytes read; 0 means the other side is silent.
    fn read_timeout(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<()>;

    /// Discard anything received but not read yet
    fn clear_input(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn read_timeout(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_timeout(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn clear_input(&mut self) -> Result<()> {
        (**self).clear_input()
    }
}

pub mod serial {
    //! Serial port transport implementation

    use super::*;
    use crate::error::HostError;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
    use std::io::{Read, Write};
    use std::time::Duration;

    /// Baud rate the firmware's UART is set up for
    pub const DEFAULT_BAUD: u32 = 38400;
    /// Per-read timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    /// Serial port transport
    pub struct SerialTransport {
        port: Box<dyn SerialPort>,
    }

    impl SerialTransport {
        /// Open a serial port, 8N1 without flow control
        pub fn open(device: &str, baud: Option<u32>, timeout: Duration) -> Result<Self> {
            let baud_rate = baud.unwrap_or(DEFAULT_BAUD);

            let port = serialport::new(device, baud_rate)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .flow_control(FlowControl::None)
                .timeout(timeout)
                .open()?;

            log::info!("Opened serial port {} at {} baud", device, baud_rate);

            Ok(Self { port })
        }

        /// Set the read timeout
        pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
            self.port.set_timeout(timeout)?;
            Ok(())
        }

        /// Consume the transport, returning the underlying port
        pub fn into_port(self) -> Box<dyn SerialPort> {
            self.port
        }
    }

    impl Transport for SerialTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.port.write_all(data)?;
            Ok(())
        }

        fn read_timeout(&mut self, buf: &mut [u8]) -> Result<usize> {
            let mut filled = 0;
            while filled < buf.len() {
                match self.port.read(&mut buf[filled..]) {
                    Ok(0) => break,
                    Ok(n) => filled += n,
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(HostError::from(e)),
                }
            }
            Ok(filled)
        }

        fn flush(&mut self) -> Result<()> {
            self.port.flush()?;
            Ok(())
        }

        fn clear_input(&mut self) -> Result<()> {
            self.port.clear(ClearBuffer::Input)?;
            Ok(())
        }
    }
}

#[cfg(feature = "sim")]
pub mod sim {
    //! In-process transport backed by the simulated programmer

    use super::*;
    use eprom_sim::{SimConfig, SimLink};

    /// Transport that talks to a [`SimLink`] directly
    ///
    /// The simulated firmware answers synchronously inside `write`, so a read
    /// returns whatever is queued and a short read is final, like a serial
    /// timeout.
    pub struct SimTransport {
        link: SimLink,
    }

    impl SimTransport {
        /// Transport to a fresh simulated programmer
        pub fn new(config: SimConfig) -> Self {
            Self::with_link(SimLink::new(config))
        }

        /// Transport to an existing simulated programmer
        pub fn with_link(link: SimLink) -> Self {
            Self { link }
        }

        /// The simulated programmer
        pub fn link(&self) -> &SimLink {
            &self.link
        }

        /// The simulated programmer, mutably
        pub fn link_mut(&mut self) -> &mut SimLink {
            &mut self.link
        }

        /// Consume the transport, returning the simulated programmer
        pub fn into_link(self) -> SimLink {
            self.link
        }
    }

    impl Transport for SimTransport {
        fn write(&mut self, data: &[u8]) -> Result<()> {
            // Firmware faults show up on the host as missing or short
            // responses, exactly as on the wire
            if let Err(e) = self.link.send(data) {
                log::warn!("sim: {}", e);
            }
            Ok(())
        }

        fn read_timeout(&mut self, buf: &mut [u8]) -> Result<usize> {
            Ok(self.link.receive(buf))
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }

        fn clear_input(&mut self) -> Result<()> {
            let mut sink = [0u8; 64];
            while self.link.receive(&mut sink) > 0 {}
            Ok(())
        }
    }
}
