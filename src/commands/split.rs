//! Split command implementation

use eprom_host::ines;
use std::path::Path;

/// Run the iNES split command
pub fn run_split(file: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let out = ines::split_file(file, output)?;

    println!("PRG ROM: {} bytes -> {:?}", out.prg_len, out.prg_path);
    match out.chr_path {
        Some(path) => println!("CHR ROM: {} bytes -> {:?}", out.chr_len, path),
        None => println!("CHR ROM: none (board uses CHR RAM)"),
    }

    Ok(())
}
