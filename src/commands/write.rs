//! Burn command implementation

use eprom_host::ops;
use eprom_host::{Backend, Transport};
use std::fs;
use std::path::Path;

use super::progress_bar;
use super::verify::verify_with_progress;

/// Run the burn command
pub fn run_burn<T: Transport>(
    backend: &mut Backend<T>,
    rom_size: u64,
    input: &Path,
    verify: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let image = fs::read(input)?;
    println!("Read {} bytes from {:?}", image.len(), input);
    ops::check_image_size(image.len() as u64, rom_size)?;

    let pb = progress_bar(rom_size, "Burning");
    ops::write_pages(backend, &image, |n| pb.set_position(n as u64))?;
    pb.finish_with_message("Burn complete");

    println!(
        "Successfully burnt {} bytes from {:?} to EPROM",
        image.len(),
        input
    );

    if verify {
        verify_with_progress(backend, &image)?;
        println!("Verification passed!");
    }

    Ok(())
}
