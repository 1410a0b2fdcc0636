//! Programmer traits and the page sequencer
//!
//! This module defines the narrow hardware-access interface the firmware
//! uses to drive the chip, and the four command handlers built on top of it.

pub mod sequencer;
mod traits;

pub use sequencer::{dispatch, fast_dump, identify, read_page, write_page};
pub use traits::*;
