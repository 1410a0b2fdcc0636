//! In-memory 27-series EPROM behind a simulated programmer board
//!
//! The model follows the chip's pins rather than its commands: an address,
//! three active-low control lines and a shared data bus. Programming only
//! clears bits (1 -> 0) and only happens when a PGM pulse of the full width
//! ends; erased cells read 0xFF.
//!
//! Time only advances through [`ChipBus::delay_us`], so every setup, hold
//! and pulse-width rule can be checked against a virtual clock. A broken
//! rule is recorded as a [`SimError`]; in strict mode the offending call
//! also fails with [`eprom_core::Error::SequenceViolation`], which aborts the
//! running handler the way a damaged chip would abort a real session.
//!
//! Addresses beyond the chip wrap around its size, as on real parts whose
//! upper address pins are not connected.

use eprom_core::error::{Error, Result};
use eprom_core::programmer::{BusDirection, ChipBus, ControlLine, ControlLines, Latch};
use eprom_core::protocol::{
    ADDRESS_BITS, OUTPUT_ENABLE_SETUP_US, PAGE_SIZE, PROGRAM_HOLD_US, PROGRAM_PULSE_US,
    PROGRAM_SETUP_US,
};

use crate::error::SimError;

/// Bytes per kilobit of chip capacity
pub const BYTES_PER_KBIT: usize = 128;

/// Configuration for the simulated chip
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Chip size in bytes
    pub size: usize,
    /// Initial content of every cell (0xFF for an erased chip)
    pub fill: u8,
    /// Fail the offending bus call on a timing or ordering violation
    pub strict: bool,
}

impl SimConfig {
    /// Configuration for a chip of `kbit` kilobits
    pub fn from_kbit(kbit: usize) -> Self {
        Self {
            size: kbit * BYTES_PER_KBIT,
            ..Self::default()
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            size: 1024 * BYTES_PER_KBIT, // 27C010
            fill: 0xFF,
            strict: true,
        }
    }
}

/// Which path currently supplies A0..A15
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AddressSource {
    Direct,
    Latched,
}

/// Simulated EPROM and board wiring
pub struct SimulatedEprom {
    config: SimConfig,
    data: Vec<u8>,

    lines: ControlLines,
    direction: BusDirection,
    driven: u8,
    address: u32,
    latch_low: u8,
    latch_high: u8,
    source: AddressSource,

    clock_us: u64,
    address_stable_at: u64,
    data_stable_at: u64,
    oe_active_at: u64,
    pgm_active_at: Option<u64>,
    pgm_released_at: Option<u64>,

    programmed: usize,
    violations: Vec<SimError>,
}

impl SimulatedEprom {
    /// Create a chip with the given configuration
    pub fn new(config: SimConfig) -> Self {
        let size = if config.size < PAGE_SIZE {
            log::warn!(
                "sim: chip size {} too small, using one page ({} bytes)",
                config.size,
                PAGE_SIZE
            );
            PAGE_SIZE
        } else {
            config.size
        };
        let data = vec![config.fill; size];
        Self {
            config: SimConfig { size, ..config },
            data,
            lines: ControlLines::empty(),
            direction: BusDirection::Input,
            driven: 0,
            address: 0,
            latch_low: 0,
            latch_high: 0,
            source: AddressSource::Direct,
            clock_us: 0,
            address_stable_at: 0,
            data_stable_at: 0,
            oe_active_at: 0,
            pgm_active_at: None,
            pgm_released_at: None,
            programmed: 0,
            violations: Vec::new(),
        }
    }

    /// Create an erased chip with the default configuration
    pub fn new_default() -> Self {
        Self::new(SimConfig::default())
    }

    /// Create a chip with pre-filled content
    pub fn with_data(config: SimConfig, initial_data: &[u8]) -> Self {
        let mut chip = Self::new(config);
        let len = core::cmp::min(initial_data.len(), chip.data.len());
        chip.data[..len].copy_from_slice(&initial_data[..len]);
        chip
    }

    /// Chip content
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable chip content, bypassing the programming rules
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Active configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// UV erase: every cell back to 0xFF
    pub fn erase(&mut self) {
        self.data.fill(0xFF);
    }

    /// Control lines currently driven active
    pub fn lines(&self) -> ControlLines {
        self.lines
    }

    /// Current data bus direction
    pub fn direction(&self) -> BusDirection {
        self.direction
    }

    /// Virtual time elapsed, in microseconds
    pub fn clock_us(&self) -> u64 {
        self.clock_us
    }

    /// Number of completed program pulses
    pub fn programmed(&self) -> usize {
        self.programmed
    }

    /// Violations recorded so far
    pub fn violations(&self) -> &[SimError] {
        &self.violations
    }

    /// Drain the recorded violations
    pub fn take_violations(&mut self) -> Vec<SimError> {
        std::mem::take(&mut self.violations)
    }

    /// Check that the board is back in its resting state
    ///
    /// Every control line inactive and the data bus released.
    pub fn check_idle(&self) -> std::result::Result<(), SimError> {
        if !self.lines.is_empty() {
            return Err(SimError::LinesLeftActive { lines: self.lines });
        }
        if self.direction == BusDirection::Output {
            return Err(SimError::DataBusLeftDriven);
        }
        Ok(())
    }

    /// Address the chip currently sees
    pub fn effective_address(&self) -> u32 {
        match self.source {
            AddressSource::Direct => self.address,
            AddressSource::Latched => {
                (self.address & !0xFFFF) | (self.latch_high as u32) << 8 | self.latch_low as u32
            }
        }
    }

    fn cell(&self, address: u32) -> usize {
        address as usize % self.data.len()
    }

    fn chip_outputs(&self) -> bool {
        self.lines.contains(ControlLines::CE | ControlLines::OE)
            && !self.lines.contains(ControlLines::PGM)
    }

    fn violation(&mut self, err: SimError) -> Result<()> {
        log::warn!("sim: {}", err);
        self.violations.push(err);
        if self.config.strict {
            Err(Error::SequenceViolation)
        } else {
            Ok(())
        }
    }

    fn check_contention(&mut self) -> Result<()> {
        if self.direction == BusDirection::Output && self.chip_outputs() {
            let address = self.effective_address();
            return self.violation(SimError::BusContention { address });
        }
        Ok(())
    }

    /// Address or data is about to change
    fn check_stable_inputs(&mut self) -> Result<()> {
        let address = self.effective_address();
        if self.pgm_active_at.is_some() {
            return self.violation(SimError::ChangedDuringProgramPulse { address });
        }
        self.check_hold(address)
    }

    fn check_hold(&mut self, address: u32) -> Result<()> {
        if let Some(released) = self.pgm_released_at.take() {
            let elapsed_us = self.clock_us - released;
            if elapsed_us < PROGRAM_HOLD_US as u64 {
                return self.violation(SimError::ProgramHoldTooShort {
                    address,
                    elapsed_us,
                    min_us: PROGRAM_HOLD_US,
                });
            }
        }
        Ok(())
    }

    fn start_program_pulse(&mut self) -> Result<()> {
        let address = self.effective_address();
        if !self.lines.contains(ControlLines::CE) {
            self.violation(SimError::ProgramWithoutChipEnable { address })?;
        }
        if self.lines.contains(ControlLines::OE) {
            self.violation(SimError::ProgramWhileOutputEnabled { address })?;
        }
        if self.direction != BusDirection::Output {
            self.violation(SimError::ProgramWithBusReleased { address })?;
        }

        let settled_at = self.address_stable_at.max(self.data_stable_at);
        let elapsed_us = self.clock_us - settled_at;
        if elapsed_us < PROGRAM_SETUP_US as u64 {
            self.violation(SimError::ProgramSetupTooShort {
                address,
                elapsed_us,
                min_us: PROGRAM_SETUP_US,
            })?;
        }

        self.pgm_active_at = Some(self.clock_us);
        Ok(())
    }

    fn end_program_pulse(&mut self) -> Result<()> {
        let Some(started) = self.pgm_active_at.take() else {
            return Ok(());
        };
        let address = self.effective_address();
        let width_us = self.clock_us - started;
        self.pgm_released_at = Some(self.clock_us);

        if width_us < PROGRAM_PULSE_US as u64 {
            return self.violation(SimError::ProgramPulseTooShort {
                address,
                width_us,
                min_us: PROGRAM_PULSE_US,
            });
        }

        let cell = self.cell(address);
        // EPROM programming can only clear bits
        self.data[cell] &= self.driven;
        self.programmed += 1;
        log::trace!(
            "sim: programmed 0x{:05X} <- 0x{:02X} (now 0x{:02X})",
            address,
            self.driven,
            self.data[cell]
        );
        Ok(())
    }
}

impl ChipBus for SimulatedEprom {
    fn set_address(&mut self, address: u32) -> Result<()> {
        self.check_stable_inputs()?;
        self.address = address & ((1 << ADDRESS_BITS) - 1);
        self.source = AddressSource::Direct;
        self.address_stable_at = self.clock_us;
        Ok(())
    }

    fn set_address_low(&mut self, low: u8) -> Result<()> {
        self.check_stable_inputs()?;
        if self.source == AddressSource::Latched {
            // The direct port takes over A8..A15 from the latches as well
            self.address = self.effective_address();
        }
        self.address = (self.address & !0xFF) | low as u32;
        self.source = AddressSource::Direct;
        self.address_stable_at = self.clock_us;
        Ok(())
    }

    fn set_control(&mut self, line: ControlLine, active: bool) -> Result<()> {
        let flag = line.flag();
        if self.lines.contains(flag) == active {
            return Ok(());
        }

        match (line, active) {
            (ControlLine::ProgramEnable, true) => self.start_program_pulse()?,
            (ControlLine::ProgramEnable, false) => {
                self.lines.remove(flag);
                self.end_program_pulse()?;
            }
            (ControlLine::ChipEnable, false) => {
                if self.pgm_active_at.is_some() {
                    let address = self.effective_address();
                    self.violation(SimError::ChangedDuringProgramPulse { address })?;
                }
                let address = self.effective_address();
                self.check_hold(address)?;
            }
            (ControlLine::OutputEnable, true) => self.oe_active_at = self.clock_us,
            _ => {}
        }

        self.lines.set(flag, active);
        self.check_contention()
    }

    fn data_bus_output(&mut self) -> Result<()> {
        self.direction = BusDirection::Output;
        self.check_contention()
    }

    fn data_bus_input(&mut self) -> Result<()> {
        if self.pgm_active_at.is_some() {
            let address = self.effective_address();
            self.violation(SimError::ChangedDuringProgramPulse { address })?;
        }
        self.direction = BusDirection::Input;
        Ok(())
    }

    fn write_data(&mut self, byte: u8) -> Result<()> {
        if self.direction != BusDirection::Output {
            self.violations.push(SimError::WrongDirection {
                operation: "written",
            });
            return Err(Error::BusDirection);
        }
        self.check_stable_inputs()?;
        self.driven = byte;
        self.data_stable_at = self.clock_us;
        Ok(())
    }

    fn read_data(&mut self) -> Result<u8> {
        if self.direction != BusDirection::Input {
            self.violations.push(SimError::WrongDirection { operation: "read" });
            return Err(Error::BusDirection);
        }

        let address = self.effective_address();
        if !self.chip_outputs() {
            self.violation(SimError::SampleWhileDeselected { address })?;
            // Floating bus, pulled up
            return Ok(0xFF);
        }

        let settled_at = self.oe_active_at.max(self.address_stable_at);
        let elapsed_us = self.clock_us - settled_at;
        if elapsed_us < OUTPUT_ENABLE_SETUP_US as u64 {
            self.violation(SimError::EarlySample {
                address,
                elapsed_us,
                min_us: OUTPUT_ENABLE_SETUP_US,
            })?;
        }

        Ok(self.data[self.cell(address)])
    }

    fn strobe_latch(&mut self, latch: Latch, value: u8) -> Result<()> {
        if self.chip_outputs() {
            self.violation(SimError::LatchWhileSelected { latch })?;
        }
        self.check_stable_inputs()?;
        if self.source == AddressSource::Direct {
            // Latches take over from wherever the direct port left off
            self.latch_low = self.address as u8;
            self.latch_high = (self.address >> 8) as u8;
            self.source = AddressSource::Latched;
        }
        match latch {
            Latch::Low => self.latch_low = value,
            Latch::High => self.latch_high = value,
        }
        self.address_stable_at = self.clock_us;
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.clock_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ControlLine::{ChipEnable as CE, OutputEnable as OE, ProgramEnable as PGM};

    fn lenient() -> SimulatedEprom {
        SimulatedEprom::new(SimConfig {
            strict: false,
            ..SimConfig::from_kbit(64)
        })
    }

    fn program(chip: &mut SimulatedEprom, address: u32, byte: u8, pulse_us: u32) -> Result<()> {
        chip.set_control(OE, false)?;
        chip.set_address(address)?;
        chip.data_bus_output()?;
        chip.write_data(byte)?;
        chip.set_control(CE, true)?;
        chip.delay_us(PROGRAM_SETUP_US);
        chip.set_control(PGM, true)?;
        chip.delay_us(pulse_us);
        chip.set_control(PGM, false)?;
        chip.delay_us(PROGRAM_HOLD_US);
        chip.set_control(CE, false)?;
        chip.data_bus_input()
    }

    fn read(chip: &mut SimulatedEprom, address: u32) -> Result<u8> {
        chip.set_control(CE, true)?;
        chip.set_address(address)?;
        chip.set_control(OE, true)?;
        chip.delay_us(OUTPUT_ENABLE_SETUP_US);
        let byte = chip.read_data()?;
        chip.set_control(OE, false)?;
        chip.set_control(CE, false)?;
        Ok(byte)
    }

    #[test]
    fn test_erased_chip_reads_ff() {
        let mut chip = SimulatedEprom::new(SimConfig::from_kbit(64));
        assert_eq!(chip.data().len(), 8192);
        assert_eq!(read(&mut chip, 0x123).unwrap(), 0xFF);
        assert!(chip.violations().is_empty());
        chip.check_idle().unwrap();
    }

    #[test]
    fn test_programming_only_clears_bits() {
        let mut chip = SimulatedEprom::new(SimConfig::from_kbit(64));
        program(&mut chip, 0x10, 0xF0, PROGRAM_PULSE_US).unwrap();
        assert_eq!(chip.data()[0x10], 0xF0);
        program(&mut chip, 0x10, 0x3C, PROGRAM_PULSE_US).unwrap();
        assert_eq!(chip.data()[0x10], 0x30);
        assert_eq!(chip.programmed(), 2);
        assert!(chip.violations().is_empty());

        chip.erase();
        assert_eq!(chip.data()[0x10], 0xFF);
    }

    #[test]
    fn test_short_pulse_is_flagged_and_not_programmed() {
        let mut chip = lenient();
        program(&mut chip, 0x20, 0x00, 50).unwrap();
        assert_eq!(chip.data()[0x20], 0xFF);
        assert_eq!(
            chip.violations(),
            &[SimError::ProgramPulseTooShort {
                address: 0x20,
                width_us: 50,
                min_us: PROGRAM_PULSE_US
            }]
        );
    }

    #[test]
    fn test_strict_mode_fails_the_call() {
        let mut chip = SimulatedEprom::new(SimConfig::from_kbit(64));
        assert_eq!(
            program(&mut chip, 0x20, 0x00, 99),
            Err(Error::SequenceViolation)
        );
    }

    #[test]
    fn test_contention_detected() {
        let mut chip = lenient();
        chip.set_control(CE, true).unwrap();
        chip.set_control(OE, true).unwrap();
        chip.data_bus_output().unwrap();
        assert!(matches!(
            chip.violations(),
            [SimError::BusContention { .. }]
        ));
    }

    #[test]
    fn test_early_sample_detected() {
        let mut chip = lenient();
        chip.set_control(CE, true).unwrap();
        chip.set_control(OE, true).unwrap();
        chip.read_data().unwrap();
        assert!(matches!(
            chip.violations(),
            [SimError::EarlySample { elapsed_us: 0, .. }]
        ));
    }

    #[test]
    fn test_program_setup_and_hold() {
        let mut chip = lenient();
        chip.set_address(0x40).unwrap();
        chip.data_bus_output().unwrap();
        chip.write_data(0x55).unwrap();
        chip.set_control(CE, true).unwrap();
        chip.set_control(PGM, true).unwrap();
        chip.delay_us(PROGRAM_PULSE_US);
        chip.set_control(PGM, false).unwrap();
        chip.set_address_low(0x41).unwrap();
        assert!(matches!(
            chip.violations(),
            [
                SimError::ProgramSetupTooShort { elapsed_us: 0, .. },
                SimError::ProgramHoldTooShort { elapsed_us: 0, .. }
            ]
        ));
    }

    #[test]
    fn test_program_with_output_enabled() {
        let mut chip = lenient();
        chip.data_bus_output().unwrap();
        chip.set_control(OE, true).unwrap();
        chip.delay_us(10);
        chip.set_control(PGM, true).unwrap();
        assert!(chip
            .violations()
            .iter()
            .any(|v| matches!(v, SimError::ProgramWhileOutputEnabled { .. })));
        assert!(chip
            .violations()
            .iter()
            .any(|v| matches!(v, SimError::ProgramWithoutChipEnable { .. })));
    }

    #[test]
    fn test_wrong_direction_is_an_error() {
        let mut chip = SimulatedEprom::new_default();
        assert_eq!(chip.write_data(0), Err(Error::BusDirection));
        chip.data_bus_output().unwrap();
        assert_eq!(chip.read_data(), Err(Error::BusDirection));
    }

    #[test]
    fn test_latched_addressing() {
        let mut data = vec![0u8; 8192];
        data[0x0512] = 0xA5;
        let mut chip = SimulatedEprom::with_data(SimConfig::from_kbit(64), &data);
        chip.strobe_latch(Latch::High, 0x05).unwrap();
        chip.strobe_latch(Latch::Low, 0x12).unwrap();
        assert_eq!(chip.effective_address(), 0x0512);
        chip.set_control(CE, true).unwrap();
        chip.set_control(OE, true).unwrap();
        chip.delay_us(1);
        assert_eq!(chip.read_data().unwrap(), 0xA5);
    }

    #[test]
    fn test_latch_while_outputting() {
        let mut chip = lenient();
        chip.set_control(CE, true).unwrap();
        chip.set_control(OE, true).unwrap();
        chip.strobe_latch(Latch::Low, 1).unwrap();
        assert_eq!(
            chip.violations(),
            &[SimError::LatchWhileSelected { latch: Latch::Low }]
        );
    }

    #[test]
    fn test_address_wraps_chip_size() {
        let mut chip = SimulatedEprom::new(SimConfig::from_kbit(64));
        chip.data_mut()[0x0100] = 0x12;
        assert_eq!(read(&mut chip, 0x2100).unwrap(), 0x12);
    }

    #[test]
    fn test_check_idle() {
        let mut chip = SimulatedEprom::new_default();
        chip.set_control(CE, true).unwrap();
        assert_eq!(
            chip.check_idle(),
            Err(SimError::LinesLeftActive {
                lines: ControlLines::CE
            })
        );
        chip.set_control(CE, false).unwrap();
        chip.data_bus_output().unwrap();
        assert_eq!(chip.check_idle(), Err(SimError::DataBusLeftDriven));
        chip.release().unwrap();
        chip.check_idle().unwrap();
    }
}
