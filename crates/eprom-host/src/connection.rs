//! Connection strings and opening a backend from one

use std::time::Duration;

use crate::backend::Backend;
use crate::error::Result;
use crate::transport::serial::SerialTransport;
use crate::transport::Transport;

/// Where the programmer is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connection {
    /// Serial port connection
    Serial {
        /// Device path (e.g., "/dev/ttyUSB0" or "COM1")
        device: String,
        /// Baud rate (None for the firmware default)
        baud: Option<u32>,
    },
    /// In-process simulated programmer
    Sim {
        /// Simulated chip size in kbit (None for the simulator default)
        size_kbit: Option<usize>,
    },
}

impl Connection {
    /// Parse a connection string
    ///
    /// Formats:
    /// - `dev=/dev/ttyUSB0` - Serial with default baud
    /// - `dev=/dev/ttyUSB0:38400` - Serial with specified baud
    /// - `sim` - Simulated programmer with the default chip
    /// - `sim:size=256` - Simulated programmer with a 256 kbit chip
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        if let Some(dev) = s.strip_prefix("dev=") {
            // Serial connection
            if let Some((device, baud_str)) = dev.rsplit_once(':') {
                // A non-numeric suffix stays part of the device name
                if let Ok(baud) = baud_str.parse() {
                    return Ok(Connection::Serial {
                        device: device.to_string(),
                        baud: Some(baud),
                    });
                }
                if baud_str.chars().all(|c| c.is_ascii_digit()) {
                    return Err(format!("Invalid baud rate: {}", baud_str));
                }
            }
            if dev.is_empty() {
                return Err("Missing device in dev= parameter".to_string());
            }
            Ok(Connection::Serial {
                device: dev.to_string(),
                baud: None,
            })
        } else if s == "sim" {
            Ok(Connection::Sim { size_kbit: None })
        } else if let Some(opts) = s.strip_prefix("sim:") {
            let size = opts
                .strip_prefix("size=")
                .ok_or_else(|| format!("Unknown sim option: {}", opts))?;
            let size_kbit = size
                .parse()
                .map_err(|_| format!("Invalid sim size: {}", size))?;
            Ok(Connection::Sim {
                size_kbit: Some(size_kbit),
            })
        } else {
            Err(format!(
                "Invalid connection string: {}. Use dev=... or sim",
                s
            ))
        }
    }

    /// Override the baud rate of a serial connection
    pub fn with_baud(self, baud: Option<u32>) -> Self {
        match (self, baud) {
            (Connection::Serial { device, .. }, Some(baud)) => Connection::Serial {
                device,
                baud: Some(baud),
            },
            (conn, _) => conn,
        }
    }
}

impl std::str::FromStr for Connection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Connection::parse(s)
    }
}

/// Open the programmer a connection points to
pub fn open(conn: &Connection, timeout: Duration) -> Result<Backend<Box<dyn Transport>>> {
    let transport: Box<dyn Transport> = match conn {
        Connection::Serial { device, baud } => {
            Box::new(SerialTransport::open(device, *baud, timeout)?)
        }
        Connection::Sim { size_kbit } => open_sim(*size_kbit)?,
    };
    Ok(Backend::new(transport))
}

#[cfg(feature = "sim")]
fn open_sim(size_kbit: Option<usize>) -> Result<Box<dyn Transport>> {
    use crate::transport::sim::SimTransport;
    use eprom_sim::SimConfig;

    let config = match size_kbit {
        Some(kbit) => SimConfig::from_kbit(kbit),
        None => SimConfig::default(),
    };
    log::info!("Using simulated programmer ({} byte chip)", config.size);
    Ok(Box::new(SimTransport::new(config)))
}

#[cfg(not(feature = "sim"))]
fn open_sim(_size_kbit: Option<usize>) -> Result<Box<dyn Transport>> {
    Err(crate::error::HostError::InvalidParameter(
        "simulator support not compiled in (enable the `sim` feature)".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial() {
        assert_eq!(
            Connection::parse("dev=/dev/ttyUSB0").unwrap(),
            Connection::Serial {
                device: "/dev/ttyUSB0".into(),
                baud: None
            }
        );
        assert_eq!(
            Connection::parse("dev=/dev/ttyUSB0:115200").unwrap(),
            Connection::Serial {
                device: "/dev/ttyUSB0".into(),
                baud: Some(115200)
            }
        );
        assert!(Connection::parse("dev=/dev/ttyS0:99999999999").is_err());
        assert!(Connection::parse("dev=").is_err());
    }

    #[test]
    fn test_parse_sim() {
        assert_eq!(
            Connection::parse("sim").unwrap(),
            Connection::Sim { size_kbit: None }
        );
        assert_eq!(
            Connection::parse("sim:size=256").unwrap(),
            Connection::Sim {
                size_kbit: Some(256)
            }
        );
        assert!(Connection::parse("sim:fill=0").is_err());
        assert!(Connection::parse("/dev/ttyUSB0").is_err());
    }

    #[test]
    fn test_with_baud() {
        let conn = Connection::parse("dev=COM3").unwrap().with_baud(Some(9600));
        assert_eq!(
            conn,
            Connection::Serial {
                device: "COM3".into(),
                baud: Some(9600)
            }
        );
        let sim = Connection::parse("sim").unwrap().with_baud(Some(9600));
        assert_eq!(sim, Connection::Sim { size_kbit: None });
    }

    #[cfg(feature = "sim")]
    #[test]
    fn test_open_sim() {
        let mut backend = open(&Connection::Sim { size_kbit: Some(64) }, Duration::ZERO).unwrap();
        assert!(backend.identify().unwrap().starts_with("RECCurection"));
    }
}
