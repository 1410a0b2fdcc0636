//! Emulate command: serve the programmer protocol on a serial port
//!
//! The firmware core runs on the host against a simulated chip, so a second
//! machine (or a null-modem pair) can exercise the real host tooling without
//! a board attached.

use eprom_core::frame::{FrameConfig, StallPolicy};
use eprom_host::{SerialTransport, Transport};
use eprom_sim::{SimConfig, SimLink, SimulatedEprom};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Serial read timeout, which is also the idle tick period
const POLL: Duration = Duration::from_millis(10);

/// Options for [`run_emulate`]
#[derive(Debug, Clone)]
pub struct EmulateOptions {
    pub dev: String,
    pub baud: Option<u32>,
    pub size_kbit: u32,
    pub image: Option<PathBuf>,
    pub idle_reset_ms: Option<u32>,
    pub output: Option<PathBuf>,
    pub exit_after_idle: Option<Duration>,
}

/// Run the emulator until the idle limit expires (or forever without one)
pub fn run_emulate(opts: &EmulateOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = SimConfig::from_kbit(opts.size_kbit as usize);
    let chip = match &opts.image {
        Some(path) => {
            let image = fs::read(path)?;
            if image.len() != config.size {
                return Err(format!(
                    "image {:?} is {} bytes, simulated ROM is {} bytes",
                    path,
                    image.len(),
                    config.size
                )
                .into());
            }
            log::info!("Preloaded {} bytes from {:?}", image.len(), path);
            SimulatedEprom::with_data(config, &image)
        }
        None => SimulatedEprom::new(config),
    };

    let stall = match opts.idle_reset_ms {
        Some(ms) => {
            let ticks = (ms as u128 / POLL.as_millis()).max(1) as u32;
            StallPolicy::ResetAfterIdleTicks(ticks)
        }
        None => StallPolicy::WaitForever,
    };
    let mut link = SimLink::with_frame_config(chip, FrameConfig { stall });

    let mut port = SerialTransport::open(&opts.dev, opts.baud, POLL)?;
    println!(
        "Emulating a {} kbit EPROM on {}, press Ctrl-C to stop",
        opts.size_kbit, opts.dev
    );

    let mut rx = [0u8; 64];
    let mut tx = [0u8; 512];
    let mut last_traffic = Instant::now();
    loop {
        let n = port.read_timeout(&mut rx)?;
        if n == 0 {
            if link.tick() {
                log::warn!("Dropped a stalled frame");
            }
            if let Some(limit) = opts.exit_after_idle {
                if last_traffic.elapsed() >= limit {
                    log::info!("No traffic for {:?}, stopping", limit);
                    break;
                }
            }
            continue;
        }

        last_traffic = Instant::now();
        log::trace!("rx {:02X?}", &rx[..n]);
        if let Err(e) = link.send(&rx[..n]) {
            log::warn!("Simulated chip: {}", e);
        }

        while link.pending() > 0 {
            let len = link.receive(&mut tx);
            port.write(&tx[..len])?;
        }
        port.flush()?;
    }

    if let Some(output) = &opts.output {
        let chip = link.into_chip();
        fs::write(output, chip.data())?;
        println!("Wrote {} bytes of ROM contents to {:?}", chip.data().len(), output);
    }

    Ok(())
}
