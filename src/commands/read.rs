//! Dump and blank-check command implementations

use eprom_host::ops::{self, ReadMode};
use eprom_host::{Backend, Transport};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::progress_bar;

/// Run the dump command
pub fn run_dump<T: Transport>(
    backend: &mut Backend<T>,
    rom_size: u64,
    mode: ReadMode,
    output: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages = ops::pages_for_size(rom_size)?;
    let phase = match mode {
        ReadMode::Direct => "Reading",
        ReadMode::FastDump => "Fast dumping",
    };

    let pb = progress_bar(rom_size, phase);
    let data = ops::read_pages(backend, pages, mode, |n| pb.set_position(n as u64))?;
    pb.finish_with_message("Read complete");

    // Write to file
    let mut file = File::create(output)?;
    file.write_all(&data)?;

    println!("Successfully dumped {} bytes to {:?}", data.len(), output);

    Ok(())
}

/// Run the blank-check command
pub fn run_blank<T: Transport>(
    backend: &mut Backend<T>,
    rom_size: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages = ops::pages_for_size(rom_size)?;

    let pb = progress_bar(rom_size, "Blank checking");
    let found = ops::blank_check(backend, pages, |n| pb.set_position(n as u64))?;
    pb.finish_and_clear();

    match found {
        None => {
            println!("ROM is blank ({} bytes of 0xFF)", rom_size);
            Ok(())
        }
        Some((offset, value)) => Err(format!(
            "ROM is not blank: 0x{:02X} at offset 0x{:06X}",
            value, offset
        )
        .into()),
    }
}
