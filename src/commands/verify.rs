//! Verify command implementation

use eprom_host::ops;
use eprom_host::{Backend, Transport};
use std::fs;
use std::path::Path;

use super::progress_bar;

/// Run the verify command
pub fn run_verify<T: Transport>(
    backend: &mut Backend<T>,
    rom_size: u64,
    input: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = fs::read(input)?;
    println!("Read {} bytes from {:?}", expected.len(), input);
    ops::check_image_size(expected.len() as u64, rom_size)?;

    verify_with_progress(backend, &expected)?;
    println!("Verification passed!");

    Ok(())
}

/// Compare the chip with `expected`, failing on the first difference
pub fn verify_with_progress<T: Transport>(
    backend: &mut Backend<T>,
    expected: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let pb = progress_bar(expected.len() as u64, "Verifying");
    let mismatch = ops::verify_pages(backend, expected, |n| pb.set_position(n as u64))?;

    match mismatch {
        None => {
            pb.finish_with_message("Verify complete");
            Ok(())
        }
        Some(m) => {
            pb.abandon();
            Err(format!(
                "Verification failed at 0x{:06X}: expected 0x{:02X}, found 0x{:02X}",
                m.offset, m.expected, m.found
            )
            .into())
        }
    }
}
