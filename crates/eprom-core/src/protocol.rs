//! Wire protocol constants and command kinds
//!
//! Requests are a one-letter selector followed by a fixed-length body. The
//! body always ends with a little-endian CRC16 over the selector and every
//! payload byte.
//!
//! | Request   | Body after the selector                         |
//! |-----------|--------------------------------------------------|
//! | Identify  | crc16\[2\]                                       |
//! | Read      | addr_lo, addr_hi, crc16\[2\]                     |
//! | Write     | addr_lo, addr_hi, data\[256\], crc16\[2\]        |
//! | FastDump  | latch_preset, unused, crc16\[2\]                 |

use crate::crc::crc16;

/// Size of one page in bytes
pub const PAGE_SIZE: usize = 256;
/// Length of the page address field
pub const ADDR_LEN: usize = 2;
/// Length of the trailing checksum
pub const CRC_LEN: usize = 2;
/// Capacity of the receive frame buffer (largest body: Write)
pub const FRAME_CAPACITY: usize = ADDR_LEN + PAGE_SIZE + CRC_LEN;

/// Selector for Identify
pub const SEL_IDENTIFY: u8 = b'i';
/// Selector for Read
pub const SEL_READ: u8 = b'r';
/// Selector for Write
pub const SEL_WRITE: u8 = b'w';
/// Selector for FastDump
pub const SEL_FAST_DUMP: u8 = b'f';

/// First byte of the acknowledgement frame
pub const ACK: u8 = b'a';
/// Trailer of the acknowledgement frame (CRC16 of `"a"`, little-endian)
pub const ACK_MAGIC: [u8; 2] = [0x7E, 0xA8];
/// First byte of the CRC error frame
pub const ERR: u8 = b'e';
/// Length of both the acknowledgement and the error frame
pub const REPLY_LEN: usize = 3;

/// Identification string returned by Identify
pub const IDENT: &[u8] = b"RECCurection eprom-burner backend v0.1";
/// Literal returned after a page has been programmed
pub const WRITE_DONE: &[u8; 4] = b"done";

/// Number of address lines the board drives (A0..A18)
pub const ADDRESS_BITS: u32 = 19;
/// Highest page index reachable with [`ADDRESS_BITS`] lines
pub const MAX_PAGE: u16 = ((1u32 << (ADDRESS_BITS - 8)) - 1) as u16;

/// Minimum time between OE asserted and sampling the data bus
pub const OUTPUT_ENABLE_SETUP_US: u32 = 1;
/// Minimum address/data setup before the program pulse
pub const PROGRAM_SETUP_US: u32 = 5;
/// Minimum program pulse width
pub const PROGRAM_PULSE_US: u32 = 100;
/// Minimum hold time after the program pulse
pub const PROGRAM_HOLD_US: u32 = 5;

/// The four commands the firmware understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Report the identification string
    Identify,
    /// Read a page through the direct address bus
    Read,
    /// Program a page
    Write,
    /// Read a page through the latched address path
    FastDump,
}

impl CommandKind {
    /// All command kinds, in selector order
    pub const ALL: [CommandKind; 4] = [
        CommandKind::Identify,
        CommandKind::Read,
        CommandKind::Write,
        CommandKind::FastDump,
    ];

    /// Map a selector byte to a command, `None` for anything unrecognised
    pub const fn from_selector(byte: u8) -> Option<Self> {
        match byte {
            SEL_IDENTIFY => Some(Self::Identify),
            SEL_READ => Some(Self::Read),
            SEL_WRITE => Some(Self::Write),
            SEL_FAST_DUMP => Some(Self::FastDump),
            _ => None,
        }
    }

    /// Selector byte for this command
    pub const fn selector(self) -> u8 {
        match self {
            Self::Identify => SEL_IDENTIFY,
            Self::Read => SEL_READ,
            Self::Write => SEL_WRITE,
            Self::FastDump => SEL_FAST_DUMP,
        }
    }

    /// Payload length (between selector and checksum)
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Identify => 0,
            Self::Read | Self::FastDump => ADDR_LEN,
            Self::Write => ADDR_LEN + PAGE_SIZE,
        }
    }

    /// Number of bytes the firmware collects after the selector
    pub const fn frame_len(self) -> usize {
        self.payload_len() + CRC_LEN
    }

    /// Length of the response that follows the acknowledgement
    pub const fn response_len(self) -> usize {
        match self {
            Self::Identify => IDENT.len() + CRC_LEN,
            Self::Read | Self::FastDump => PAGE_SIZE + CRC_LEN,
            Self::Write => WRITE_DONE.len() + CRC_LEN,
        }
    }

    /// Human readable name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Read => "read",
            Self::Write => "write",
            Self::FastDump => "fastdump",
        }
    }
}

impl core::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Page index decoded from the two address bytes of a request
///
/// The low byte selects A8..A15, the high byte supplies A16 and up. Within
/// the page the sequencer walks A0..A7 itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageAddress(pub u16);

impl PageAddress {
    /// Decode from the wire order `[addr_lo, addr_hi]`
    pub const fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    /// Wire order `[addr_lo, addr_hi]`
    pub const fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Address of the first byte of the page, truncated to the wired lines
    pub const fn base_address(self) -> u32 {
        ((self.0 as u32) << 8) & ((1 << ADDRESS_BITS) - 1)
    }

    /// Whether the page lies beyond the wired address lines
    pub const fn is_truncated(self) -> bool {
        self.0 > MAX_PAGE
    }
}

/// Checksum a request body would carry for the given selector and payload
pub fn request_crc(kind: CommandKind, payload: &[u8]) -> u16 {
    let mut crc = crate::crc::Crc16::new();
    crc.update(kind.selector());
    crc.update_slice(payload);
    crc.value()
}

/// Checksum that terminates the Identify response
pub const IDENT_CRC: u16 = crc16(IDENT);
/// Checksum that terminates the Write response
pub const WRITE_DONE_CRC: u16 = crc16(WRITE_DONE);
