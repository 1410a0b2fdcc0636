//! eprom-burner - Dump and burn 27-series EPROMs over a serial programmer
//!
//! The programmer board speaks a small CRC16-checked protocol: identify,
//! read a 256-byte page, fast-dump a page through the address latches and
//! program a page. Every whole-chip operation here is a loop over pages.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, LinkArgs, SizeArgs};
use eprom_host::chips::BYTES_PER_KBIT;
use eprom_host::ops::ReadMode;
use eprom_host::{open, Backend, ChipDatabase, Connection, Transport};
use std::path::Path;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    let db = match load_chip_database(cli.chip_db.as_deref()) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };
    log::debug!("{} chip definitions available", db.len());

    match cli.command {
        Commands::Check { link } => {
            let mut backend = open_backend(&link)?;
            commands::run_check(&mut backend)
        }
        Commands::Dump { link, size, output } => {
            let rom_size = resolve_size(&db, &size)?;
            let output = output.unwrap_or_else(|| commands::default_output("dump"));
            let mut backend = open_backend(&link)?;
            commands::run_dump(&mut backend, rom_size, ReadMode::Direct, &output)
        }
        Commands::Fdump { link, size, output } => {
            let rom_size = size as u64 * BYTES_PER_KBIT as u64;
            let output = output.unwrap_or_else(|| commands::default_output("fdump"));
            let mut backend = open_backend(&link)?;
            commands::run_dump(&mut backend, rom_size, ReadMode::FastDump, &output)
        }
        Commands::Burn {
            link,
            size,
            input,
            verify,
        } => {
            let rom_size = resolve_size(&db, &size)?;
            let mut backend = open_backend(&link)?;
            commands::run_burn(&mut backend, rom_size, &input, verify)
        }
        Commands::Verify { link, size, input } => {
            let rom_size = resolve_size(&db, &size)?;
            let mut backend = open_backend(&link)?;
            commands::run_verify(&mut backend, rom_size, &input)
        }
        Commands::Blank { link, size } => {
            let rom_size = resolve_size(&db, &size)?;
            let mut backend = open_backend(&link)?;
            commands::run_blank(&mut backend, rom_size)
        }
        Commands::Split { file, output } => commands::run_split(&file, output.as_deref()),
        Commands::ListChips => {
            commands::list_chips(&db);
            Ok(())
        }
        Commands::Emulate {
            dev,
            baud,
            size,
            image,
            idle_reset_ms,
            output,
            exit_after_idle_s,
        } => commands::run_emulate(&commands::EmulateOptions {
            dev,
            baud,
            size_kbit: size,
            image,
            idle_reset_ms,
            output,
            exit_after_idle: exit_after_idle_s.map(Duration::from_secs),
        }),
    }
}

/// Built-in parts, extended from `path` (a RON file or a directory of them)
fn load_chip_database(path: Option<&Path>) -> Result<ChipDatabase, Box<dyn std::error::Error>> {
    let mut db = ChipDatabase::builtin();

    if let Some(path) = path {
        let count = if path.is_dir() {
            db.load_dir(path)?
        } else if path.is_file() {
            db.load_file(path)?
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        };
        log::info!("Loaded {} chip definitions from {}", count, path.display());
    }

    Ok(db)
}

/// ROM size in bytes, from the chip name when one is given
fn resolve_size(db: &ChipDatabase, args: &SizeArgs) -> Result<u64, Box<dyn std::error::Error>> {
    match &args.chip {
        Some(name) => {
            let chip = db
                .find(name)
                .ok_or_else(|| format!("Unknown chip '{}'; see list-chips", name))?;
            log::info!("{}: {} bytes", chip.name, chip.size);
            Ok(chip.size as u64)
        }
        None => Ok(args.size as u64 * BYTES_PER_KBIT as u64),
    }
}

fn open_backend(
    link: &LinkArgs,
) -> Result<Backend<Box<dyn Transport>>, Box<dyn std::error::Error>> {
    let conn = Connection::parse(&link.port)?.with_baud(link.baud);
    Ok(open(&conn, Duration::from_millis(link.timeout_ms))?)
}
