//! eprom-host - Host side of the serial EPROM burner protocol
//!
//! This crate talks to the burner firmware: it frames requests with their
//! CRC16, checks acknowledgements and response checksums, and builds the
//! whole-chip operations (dump, burn, verify) out of page commands.
//!
//! # Supported Transports
//!
//! - Serial port: `dev=/dev/ttyUSB0`, `dev=COM3:38400`, etc.
//! - Simulated programmer (feature `sim`): `sim`, `sim:size=256`
//!
//! # Example
//!
//! ```no_run
//! use eprom_host::{open, Connection};
//! use std::time::Duration;
//!
//! let conn = Connection::parse("dev=/dev/ttyUSB0:38400")?;
//! let mut backend = open(&conn, Duration::from_millis(500))?;
//! println!("{}", backend.identify()?);
//! let page = backend.read_page(0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod chips;
pub mod connection;
pub mod error;
pub mod ines;
pub mod ops;
pub mod transport;

// Re-exports
pub use backend::Backend;
pub use chips::{ChipDatabase, EpromChip};
pub use connection::{open, Connection};
pub use error::{HostError, Result};
pub use transport::serial::SerialTransport;
#[cfg(feature = "sim")]
pub use transport::sim::SimTransport;
pub use transport::Transport;
