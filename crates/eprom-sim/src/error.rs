//! Error types for the simulated chip

use eprom_core::programmer::{ControlLines, Latch};
use thiserror::Error;

/// Rule violations the simulated chip detects, plus firmware failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    /// Chip and microcontroller drove the data bus at the same time
    #[error("Data bus contention at 0x{address:05X}: chip output enabled while the bus is driven")]
    BusContention { address: u32 },

    /// Program pulse released before the minimum width
    #[error("Program pulse at 0x{address:05X} lasted {width_us} us, chip needs at least {min_us} us")]
    ProgramPulseTooShort {
        address: u32,
        width_us: u64,
        min_us: u32,
    },

    /// Program pulse started before address and data had settled
    #[error("Program pulse at 0x{address:05X} started {elapsed_us} us after setup, chip needs {min_us} us")]
    ProgramSetupTooShort {
        address: u32,
        elapsed_us: u64,
        min_us: u32,
    },

    /// Address, data or CE changed too soon after the program pulse
    #[error("Hold after program pulse at 0x{address:05X} was {elapsed_us} us, chip needs {min_us} us")]
    ProgramHoldTooShort {
        address: u32,
        elapsed_us: u64,
        min_us: u32,
    },

    /// Address or data changed while PGM was active
    #[error("Address or data changed during the program pulse at 0x{address:05X}")]
    ChangedDuringProgramPulse { address: u32 },

    /// PGM asserted while OE was active
    #[error("Program pulse at 0x{address:05X} with output enable active")]
    ProgramWhileOutputEnabled { address: u32 },

    /// PGM asserted while the chip was not selected
    #[error("Program pulse at 0x{address:05X} without chip enable")]
    ProgramWithoutChipEnable { address: u32 },

    /// PGM asserted while nobody drove the data bus
    #[error("Program pulse at 0x{address:05X} with the data bus released")]
    ProgramWithBusReleased { address: u32 },

    /// Data bus sampled before the output had settled
    #[error("Data at 0x{address:05X} sampled {elapsed_us} us after output enable, chip needs {min_us} us")]
    EarlySample {
        address: u32,
        elapsed_us: u64,
        min_us: u32,
    },

    /// Data bus sampled while the chip was not driving it
    #[error("Data at 0x{address:05X} sampled while the chip output was disabled")]
    SampleWhileDeselected { address: u32 },

    /// Address latch strobed while the chip was selected for output
    #[error("{latch:?} address latch strobed while the chip was outputting")]
    LatchWhileSelected { latch: Latch },

    /// Data bus accessed in the wrong direction
    #[error("Data bus {operation} while the bus points the other way")]
    WrongDirection { operation: &'static str },

    /// Control lines still active after a command finished
    #[error("Control lines left active: {lines:?}")]
    LinesLeftActive { lines: ControlLines },

    /// Data bus still driven after a command finished
    #[error("Data bus left driven by the microcontroller")]
    DataBusLeftDriven,

    /// The firmware itself reported a failure
    #[error("Firmware error: {0}")]
    Firmware(#[from] eprom_core::Error),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;
