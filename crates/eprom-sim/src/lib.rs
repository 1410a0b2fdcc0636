//! eprom-sim - Simulated EPROM for the burner firmware
//!
//! This crate provides a 27-series EPROM emulated in memory, wired the way
//! the programmer board wires the real chip. It implements
//! [`eprom_core::programmer::ChipBus`], so the firmware's own sequencer drives
//! it, and it checks the chip's timing and bus rules while doing so.
//!
//! [`SimLink`] puts the firmware controller and the chip together, which
//! gives the host side something to talk to without hardware.
//!
//! # Example
//!
//! ```
//! use eprom_sim::{SimConfig, SimLink};
//!
//! let mut link = SimLink::new(SimConfig::from_kbit(256));
//! // 'i' followed by CRC16("i")
//! link.send(&[b'i', 0x7F, 0x6E])?;
//! assert_eq!(link.pending(), 3 + 40);
//! # Ok::<(), eprom_sim::SimError>(())
//! ```

pub mod chip;
pub mod error;
pub mod link;

pub use chip::{SimConfig, SimulatedEprom, BYTES_PER_KBIT};
pub use error::{Result, SimError};
pub use link::{ResponseQueue, SimLink};
