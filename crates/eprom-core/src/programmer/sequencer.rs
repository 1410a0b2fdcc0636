//! Page sequencer: the four command handlers
//!
//! Each handler runs to completion on a frame that already passed the CRC
//! gate. The order of control-line transitions below is what keeps the MCU
//! and the chip from driving the data bus at the same time and what gives
//! the chip its programming pulse; do not reorder.
//!
//! Handlers work on the receive frame buffer in place. Read and FastDump
//! capture the page over the start of the buffer once the address bytes have
//! been decoded.

use super::{ChipBus, ControlLine, Latch};
use crate::crc::Crc16;
use crate::error::Result;
use crate::protocol::{
    CommandKind, PageAddress, ADDR_LEN, FRAME_CAPACITY, IDENT, OUTPUT_ENABLE_SETUP_US, PAGE_SIZE,
    PROGRAM_HOLD_US, PROGRAM_PULSE_US, PROGRAM_SETUP_US, WRITE_DONE,
};
use crate::tx::ByteTransmitter;

use ControlLine::{ChipEnable as CE, OutputEnable as OE, ProgramEnable as PGM};

/// Run the handler for `kind`
pub fn dispatch<B, W>(
    kind: CommandKind,
    bus: &mut B,
    tx: &mut W,
    frame: &mut [u8; FRAME_CAPACITY],
) -> Result<()>
where
    B: ChipBus + ?Sized,
    W: ByteTransmitter + ?Sized,
{
    match kind {
        CommandKind::Identify => identify(tx),
        CommandKind::Read => read_page(bus, tx, frame),
        CommandKind::Write => write_page(bus, tx, frame),
        CommandKind::FastDump => fast_dump(bus, tx, frame),
    }
}

/// Send the identification string followed by its CRC16
pub fn identify<W: ByteTransmitter + ?Sized>(tx: &mut W) -> Result<()> {
    let crc = tx.send_checked(IDENT)?;
    log::debug!("identify: sent {} bytes, crc 0x{:04X}", IDENT.len(), crc);
    Ok(())
}

/// Read one page through the direct address bus and stream it back
pub fn read_page<B, W>(bus: &mut B, tx: &mut W, frame: &mut [u8; FRAME_CAPACITY]) -> Result<()>
where
    B: ChipBus + ?Sized,
    W: ByteTransmitter + ?Sized,
{
    let page = page_address(frame);
    log::debug!("read: page 0x{:04X}", page.0);

    bus.data_bus_input()?;
    bus.set_control(CE, true)?;
    bus.set_control(OE, false)?;
    bus.set_address(page.base_address())?;

    let mut crc = Crc16::new();
    for offset in 0..PAGE_SIZE {
        bus.set_address_low(offset as u8)?;
        bus.set_control(OE, true)?;
        bus.delay_us(OUTPUT_ENABLE_SETUP_US);
        let byte = bus.read_data()?;
        bus.set_control(OE, false)?;
        frame[offset] = byte;
        crc.update(byte);
    }
    bus.set_control(CE, false)?;

    send_page(tx, &frame[..PAGE_SIZE], crc)
}

/// Program one page and acknowledge with `"done"`
pub fn write_page<B, W>(bus: &mut B, tx: &mut W, frame: &mut [u8; FRAME_CAPACITY]) -> Result<()>
where
    B: ChipBus + ?Sized,
    W: ByteTransmitter + ?Sized,
{
    let page = page_address(frame);
    log::debug!("write: page 0x{:04X}", page.0);

    bus.set_control(OE, false)?;
    bus.set_control(PGM, false)?;
    bus.set_address(page.base_address())?;
    bus.data_bus_output()?;

    let data = &frame[ADDR_LEN..ADDR_LEN + PAGE_SIZE];
    for (offset, &byte) in data.iter().enumerate() {
        bus.set_address_low(offset as u8)?;
        bus.write_data(byte)?;
        bus.set_control(CE, true)?;
        bus.delay_us(PROGRAM_SETUP_US);
        bus.set_control(PGM, true)?;
        bus.delay_us(PROGRAM_PULSE_US);
        bus.set_control(PGM, false)?;
        bus.delay_us(PROGRAM_HOLD_US);
    }
    bus.set_control(CE, false)?;
    bus.data_bus_input()?;

    tx.send_checked(WRITE_DONE)?;
    Ok(())
}

/// Read one page through the latched address path and stream it back
///
/// Only the first payload byte is used. It is driven on the data bus while
/// the latches load, then held in the high latch (A8..A15) while the low
/// latch steps through the page. A16 and up are cleared first, so the page
/// never depends on an earlier Read.
pub fn fast_dump<B, W>(bus: &mut B, tx: &mut W, frame: &mut [u8; FRAME_CAPACITY]) -> Result<()>
where
    B: ChipBus + ?Sized,
    W: ByteTransmitter + ?Sized,
{
    let preset = frame[0];
    log::debug!("fastdump: high latch 0x{:02X}", preset);

    bus.set_address(0)?;
    bus.data_bus_output()?;
    bus.write_data(preset)?;
    bus.strobe_latch(Latch::Low, 0x00)?;
    bus.strobe_latch(Latch::High, preset)?;
    bus.data_bus_input()?;

    let mut crc = Crc16::new();
    for offset in 0..PAGE_SIZE {
        bus.strobe_latch(Latch::Low, offset as u8)?;
        bus.set_control(CE, true)?;
        bus.set_control(OE, true)?;
        bus.delay_us(OUTPUT_ENABLE_SETUP_US);
        let byte = bus.read_data()?;
        bus.set_control(OE, false)?;
        bus.set_control(CE, false)?;
        frame[offset] = byte;
        crc.update(byte);
    }

    send_page(tx, &frame[..PAGE_SIZE], crc)
}

fn page_address(frame: &[u8; FRAME_CAPACITY]) -> PageAddress {
    let page = PageAddress::from_le_bytes([frame[0], frame[1]]);
    if page.is_truncated() {
        log::warn!(
            "page 0x{:04X} exceeds the wired address lines, upper bits dropped",
            page.0
        );
    }
    page
}

fn send_page<W: ByteTransmitter + ?Sized>(tx: &mut W, page: &[u8], crc: Crc16) -> Result<()> {
    tx.send_bytes(page)?;
    tx.send_u16_le(crc.value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc16;
    use crate::protocol::{IDENT_CRC, WRITE_DONE_CRC};
    use crate::testutil::{BusOp, Capture, RecordingBus};

    fn frame_with(payload: &[u8]) -> [u8; FRAME_CAPACITY] {
        let mut frame = [0u8; FRAME_CAPACITY];
        frame[..payload.len()].copy_from_slice(payload);
        frame
    }

    #[test]
    fn test_identify() {
        let mut tx = Capture::new();
        identify(&mut tx).unwrap();
        let out = tx.bytes();
        assert_eq!(&out[..IDENT.len()], IDENT);
        assert_eq!(&out[IDENT.len()..], &IDENT_CRC.to_le_bytes());
    }

    #[test]
    fn test_read_sequence() {
        let mut bus = RecordingBus::new();
        let mut tx = Capture::new();
        let mut frame = frame_with(&[0x02, 0x01]);

        read_page(&mut bus, &mut tx, &mut frame).unwrap();

        let ops = bus.ops();
        assert_eq!(
            &ops[..5],
            &[
                BusOp::DataInput,
                BusOp::Control(CE, true),
                BusOp::Control(OE, false),
                BusOp::Address(0x010200),
                BusOp::AddressLow(0),
            ]
        );
        // Per byte: low address, OE on, delay, sample, OE off
        assert_eq!(
            &ops[4..9],
            &[
                BusOp::AddressLow(0),
                BusOp::Control(OE, true),
                BusOp::Delay(1),
                BusOp::Read(RecordingBus::pattern(0x010200)),
                BusOp::Control(OE, false),
            ]
        );
        assert_eq!(ops.last(), Some(&BusOp::Control(CE, false)));
        assert!(bus.lines().is_empty());

        let out = tx.bytes();
        assert_eq!(out.len(), PAGE_SIZE + 2);
        for (offset, &byte) in out[..PAGE_SIZE].iter().enumerate() {
            assert_eq!(byte, RecordingBus::pattern(0x010200 | offset as u32));
        }
        assert_eq!(&out[PAGE_SIZE..], &crc16(&out[..PAGE_SIZE]).to_le_bytes());
    }

    #[test]
    fn test_write_sequence() {
        let mut payload = [0u8; ADDR_LEN + PAGE_SIZE];
        payload[0] = 0x01;
        for (i, b) in payload[ADDR_LEN..].iter_mut().enumerate() {
            *b = i as u8;
        }
        let mut frame = frame_with(&payload);
        let mut bus = RecordingBus::new();
        let mut tx = Capture::new();

        write_page(&mut bus, &mut tx, &mut frame).unwrap();

        let ops = bus.ops();
        assert_eq!(
            &ops[..4],
            &[
                BusOp::Control(OE, false),
                BusOp::Control(PGM, false),
                BusOp::Address(0x000100),
                BusOp::DataOutput,
            ]
        );
        assert_eq!(
            &ops[4..12],
            &[
                BusOp::AddressLow(0),
                BusOp::Write(0),
                BusOp::Control(CE, true),
                BusOp::Delay(5),
                BusOp::Control(PGM, true),
                BusOp::Delay(100),
                BusOp::Control(PGM, false),
                BusOp::Delay(5),
            ]
        );
        let n = ops.len();
        assert_eq!(
            &ops[n - 2..],
            &[BusOp::Control(CE, false), BusOp::DataInput]
        );
        let writes: usize = ops.iter().filter(|op| matches!(op, BusOp::Write(_))).count();
        assert_eq!(writes, PAGE_SIZE);
        assert!(bus.lines().is_empty());

        let out = tx.bytes();
        assert_eq!(&out[..4], b"done");
        assert_eq!(&out[4..], &WRITE_DONE_CRC.to_le_bytes());
    }

    #[test]
    fn test_fast_dump_sequence() {
        let mut frame = frame_with(&[0x05, 0xEE]);
        let mut bus = RecordingBus::new();
        let mut tx = Capture::new();

        fast_dump(&mut bus, &mut tx, &mut frame).unwrap();

        let ops = bus.ops();
        assert_eq!(
            &ops[..6],
            &[
                BusOp::Address(0),
                BusOp::DataOutput,
                BusOp::Write(0x05),
                BusOp::Latch(Latch::Low, 0x00),
                BusOp::Latch(Latch::High, 0x05),
                BusOp::DataInput,
            ]
        );
        assert_eq!(
            &ops[6..13],
            &[
                BusOp::Latch(Latch::Low, 0),
                BusOp::Control(CE, true),
                BusOp::Control(OE, true),
                BusOp::Delay(1),
                BusOp::Read(RecordingBus::pattern(0x0500)),
                BusOp::Control(OE, false),
                BusOp::Control(CE, false),
            ]
        );
        assert!(bus.lines().is_empty());

        // The unused second payload byte must not leak into the address
        let out = tx.bytes();
        assert_eq!(out[0x10], RecordingBus::pattern(0x0510));
        assert_eq!(&out[PAGE_SIZE..], &crc16(&out[..PAGE_SIZE]).to_le_bytes());
    }

    #[test]
    fn test_dispatch_identify_leaves_bus_alone() {
        let mut bus = RecordingBus::new();
        let mut tx = Capture::new();
        let mut frame = frame_with(&[]);
        dispatch(CommandKind::Identify, &mut bus, &mut tx, &mut frame).unwrap();
        assert!(bus.ops().is_empty());
        assert_eq!(tx.bytes().len(), IDENT.len() + 2);
    }

    #[test]
    fn test_bus_error_aborts_read() {
        let mut bus = RecordingBus::new();
        bus.fail_reads_after(3);
        let mut tx = Capture::new();
        let mut frame = frame_with(&[0, 0]);
        assert!(read_page(&mut bus, &mut tx, &mut frame).is_err());
        assert!(tx.bytes().is_empty());
    }
}
