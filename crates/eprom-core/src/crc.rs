//! CRC16 used on both directions of the serial link
//!
//! Reflected polynomial 0xA001, seed 0xFFFF, no final XOR. This is the AVR
//! libc `_crc16_update` step (CRC-16/MODBUS parameters). The checksum goes
//! on the wire little-endian.

/// Seed value every frame checksum starts from
pub const CRC16_SEED: u16 = 0xFFFF;

/// Reflected form of the 0x8005 polynomial
const POLY_REFLECTED: u16 = 0xA001;

/// Fold one byte into a running CRC16
pub const fn crc16_update(crc: u16, byte: u8) -> u16 {
    let mut crc = crc ^ byte as u16;
    let mut bit = 0;
    while bit < 8 {
        if crc & 1 != 0 {
            crc = (crc >> 1) ^ POLY_REFLECTED;
        } else {
            crc >>= 1;
        }
        bit += 1;
    }
    crc
}

/// CRC16 of a complete byte slice, starting from [`CRC16_SEED`]
pub const fn crc16(data: &[u8]) -> u16 {
    let mut crc = CRC16_SEED;
    let mut i = 0;
    while i < data.len() {
        crc = crc16_update(crc, data[i]);
        i += 1;
    }
    crc
}

/// Incremental CRC16 accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    /// Create an accumulator holding the seed
    pub const fn new() -> Self {
        Self { value: CRC16_SEED }
    }

    /// Reseed to 0xFFFF
    pub fn reset(&mut self) {
        self.value = CRC16_SEED;
    }

    /// Fold one byte in
    pub fn update(&mut self, byte: u8) {
        self.value = crc16_update(self.value, byte);
    }

    /// Fold a slice in
    pub fn update_slice(&mut self, data: &[u8]) {
        for &byte in data {
            self.update(byte);
        }
    }

    /// Current checksum value
    pub const fn value(&self) -> u16 {
        self.value
    }

    /// Current checksum in wire order
    pub const fn to_le_bytes(&self) -> [u8; 2] {
        self.value.to_le_bytes()
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}
