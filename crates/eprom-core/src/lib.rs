//! eprom-core - Firmware core for the serial EPROM burner
//!
//! This crate holds everything the programmer firmware does between "a byte
//! arrived on the UART" and "the chip lines changed": the command-frame state
//! machine, the CRC16 gate and the page sequencer for the four commands
//! (identify, read, write, fast dump). It is `no_std` and allocation free so
//! it can run inside the receive interrupt of a small microcontroller.
//!
//! The chip is reached through the [`programmer::ChipBus`] trait and responses
//! leave through [`tx::ByteTransmitter`], which is implemented for every
//! [`embedded_io::Write`]. Both can be backed by a simulator for testing.
//!
//! # Features
//!
//! - `std` - Enable standard library support (`std::error::Error` impls)
//!
//! # Example
//!
//! ```ignore
//! use eprom_core::Controller;
//!
//! let mut controller = Controller::new(board_bus, uart_writer);
//!
//! // From the receive interrupt:
//! controller.on_byte(received)?;
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "std")]
extern crate std;

pub mod controller;
pub mod crc;
pub mod error;
pub mod frame;
pub mod programmer;
pub mod protocol;
pub mod tx;

#[cfg(test)]
mod testutil;

pub use controller::{Controller, Event};
pub use error::{Error, Result};
