//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "eprom-burner")]
#[command(author, version, about = "EPROM dumper/burner for the serial programmer", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra chip definitions (a .ron file or a directory of them)
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// How to reach the programmer
#[derive(clap::Args, Debug, Clone)]
pub struct LinkArgs {
    /// Programmer connection: dev=/dev/ttyUSB0[:baud] or sim[:size=<kbit>]
    #[arg(short, long, default_value = "dev=/dev/ttyS0")]
    pub port: String,

    /// USART baud rate, overrides the one in --port
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Time to wait for each response, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub timeout_ms: u64,
}

/// ROM size selection
#[derive(clap::Args, Debug, Clone)]
pub struct SizeArgs {
    /// ROM size in kbit, e.g. 256 for a 27C256
    #[arg(short, long, default_value_t = 1024)]
    pub size: u32,

    /// Chip name from the database, e.g. 27C256 (overrides --size)
    #[arg(short, long)]
    pub chip: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the programmer answers and print its identification
    Check {
        #[command(flatten)]
        link: LinkArgs,
    },

    /// Dump the ROM to a file
    Dump {
        #[command(flatten)]
        link: LinkArgs,

        #[command(flatten)]
        size: SizeArgs,

        /// Output file path (default: <unix-time>.dump)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dump the ROM through the latched fast-dump path
    Fdump {
        #[command(flatten)]
        link: LinkArgs,

        /// ROM size in kbit, at most 512
        #[arg(short, long, default_value_t = 256)]
        size: u32,

        /// Output file path (default: <unix-time>.fdump)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Burn a file to the ROM
    Burn {
        #[command(flatten)]
        link: LinkArgs,

        #[command(flatten)]
        size: SizeArgs,

        /// Input file path, must match the ROM size exactly
        #[arg(short, long)]
        input: PathBuf,

        /// Read back and compare after burning
        #[arg(long)]
        verify: bool,
    },

    /// Compare the ROM with a file
    Verify {
        #[command(flatten)]
        link: LinkArgs,

        #[command(flatten)]
        size: SizeArgs,

        /// Input file path to verify against
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check that the ROM is erased
    Blank {
        #[command(flatten)]
        link: LinkArgs,

        #[command(flatten)]
        size: SizeArgs,
    },

    /// Split a .nes (iNES) image into PRG and CHR ROM files
    Split {
        /// The .nes file to split
        file: PathBuf,

        /// Output base name; .prg and .chr are appended (default: input without extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List known chips
    ListChips,

    /// Act as a programmer on a serial port, backed by a simulated chip
    Emulate {
        /// Serial device to serve on
        #[arg(short, long)]
        dev: String,

        /// USART baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// Simulated ROM size in kbit
        #[arg(short, long, default_value_t = 1024)]
        size: u32,

        /// Preload the simulated ROM from this file
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Drop a partially received frame after this many idle milliseconds
        #[arg(long)]
        idle_reset_ms: Option<u32>,

        /// Write the final ROM contents here on exit
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Stop after this many seconds without traffic
        #[arg(long)]
        exit_after_idle_s: Option<u64>,
    },
}
