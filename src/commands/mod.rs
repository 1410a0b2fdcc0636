//! CLI command implementations
//!
//! Commands take a [`Backend`](eprom_host::Backend) over any transport, so
//! the same code drives a serial programmer or the simulated one.

mod check;
mod emulate;
mod list;
mod read;
mod split;
mod verify;
mod write;

pub use check::run_check;
pub use emulate::{run_emulate, EmulateOptions};
pub use list::list_chips;
pub use read::{run_blank, run_dump};
pub use split::run_split;
pub use verify::run_verify;
pub use write::run_burn;

use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Byte-count progress bar shared by the transfer commands
pub(crate) fn progress_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
                phase
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Output file name used when none is given: `<unix-seconds>.<command>`
pub(crate) fn default_output(command: &str) -> PathBuf {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    PathBuf::from(format!("{}.{}", secs, command))
}
