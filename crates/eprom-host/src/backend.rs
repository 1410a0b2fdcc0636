//! Protocol client for the burner firmware
//!
//! Every exchange has the same shape: send the request with its CRC16, read
//! the three-byte reply, and on an acknowledgement read the fixed-length
//! response and check its trailing CRC16.

use eprom_core::crc::crc16;
use eprom_core::protocol::{
    request_crc, CommandKind, ACK, ACK_MAGIC, CRC_LEN, ERR, MAX_PAGE, PAGE_SIZE, REPLY_LEN,
    WRITE_DONE,
};

use crate::error::{HostError, Result};
use crate::transport::Transport;

/// Connection to one programmer
pub struct Backend<T: Transport> {
    transport: T,
}

impl<T: Transport> Backend<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Ask the programmer for its identification string
    pub fn identify(&mut self) -> Result<String> {
        let body = self.command(CommandKind::Identify, &[])?;
        let ident = String::from_utf8_lossy(&body).into_owned();
        log::debug!("identify: {:?}", ident);
        Ok(ident)
    }

    /// Read one page through the direct address bus
    pub fn read_page(&mut self, page: u16) -> Result<[u8; PAGE_SIZE]> {
        check_page(page as u32)?;
        let body = self.command(CommandKind::Read, &page.to_le_bytes())?;
        into_page(body)
    }

    /// Read one page through the latched address path
    ///
    /// Only A8..A15 can be preset this way, so the page index is one byte.
    pub fn fast_dump(&mut self, page: u8) -> Result<[u8; PAGE_SIZE]> {
        let body = self.command(CommandKind::FastDump, &[page, 0x00])?;
        into_page(body)
    }

    /// Program one page
    pub fn write_page(&mut self, page: u16, data: &[u8; PAGE_SIZE]) -> Result<()> {
        check_page(page as u32)?;
        let mut payload = Vec::with_capacity(2 + PAGE_SIZE);
        payload.extend_from_slice(&page.to_le_bytes());
        payload.extend_from_slice(data);

        let body = self.command(CommandKind::Write, &payload)?;
        if body != WRITE_DONE {
            return Err(HostError::UnexpectedResponse {
                command: CommandKind::Write.name(),
                detail: format!("expected \"done\", got {:02X?}", body),
            });
        }
        Ok(())
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the backend, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Run one request and return the response payload without its CRC
    fn command(&mut self, kind: CommandKind, payload: &[u8]) -> Result<Vec<u8>> {
        let mut request = Vec::with_capacity(1 + payload.len() + CRC_LEN);
        request.push(kind.selector());
        request.extend_from_slice(payload);
        request.extend_from_slice(&request_crc(kind, payload).to_le_bytes());

        self.transport.clear_input()?;
        self.transport.write(&request)?;
        self.transport.flush()?;

        let reply = self.read_exact(REPLY_LEN)?;
        match reply[0] {
            ACK if reply[1..] == ACK_MAGIC => {
                log::debug!("programmer accepted {} command", kind);
            }
            ACK => {
                return Err(HostError::CorruptedDataReceived {
                    computed: u16::from_le_bytes(ACK_MAGIC),
                    received: u16::from_le_bytes([reply[1], reply[2]]),
                });
            }
            ERR => {
                let remote_crc = u16::from_le_bytes([reply[1], reply[2]]);
                log::warn!("bad crc transmitted to programmer ({} command)", kind);
                return Err(HostError::CorruptedDataTransmitted { remote_crc });
            }
            other => return Err(HostError::UnacceptableReply(other)),
        }

        self.read_checked(kind.response_len())
    }

    /// Read a response of exactly `len` bytes and strip its CRC
    fn read_checked(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut response = self.read_exact(len)?;
        let split = len - CRC_LEN;
        let received = u16::from_le_bytes([response[split], response[split + 1]]);
        let computed = crc16(&response[..split]);
        if received != computed {
            return Err(HostError::CorruptedDataReceived { computed, received });
        }
        response.truncate(split);
        Ok(response)
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let received = self.transport.read_timeout(&mut buf)?;
        if received == 0 {
            return Err(HostError::NoResponse);
        }
        if received != len {
            return Err(HostError::NotEnoughData {
                expected: len,
                received,
            });
        }
        Ok(buf)
    }
}

fn check_page(page: u32) -> Result<()> {
    if page > MAX_PAGE as u32 {
        return Err(HostError::InvalidPage {
            page,
            max: MAX_PAGE as u32,
        });
    }
    Ok(())
}

fn into_page(body: Vec<u8>) -> Result<[u8; PAGE_SIZE]> {
    let len = body.len();
    body.try_into().map_err(|_| HostError::NotEnoughData {
        expected: PAGE_SIZE,
        received: len,
    })
}
