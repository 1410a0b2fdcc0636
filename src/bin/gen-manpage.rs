//! Man pages for eprom-burner
//!
//! Writes `eprom-burner.1` plus one `eprom-burner-<command>.1` page per
//! subcommand.
//!
//! Usage: gen-manpage [output-dir]   (default: ./man)

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

fn render(cmd: clap::Command, dir: &Path, title: &str) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    clap_mangen::Man::new(cmd)
        .title(title.to_uppercase())
        .render(&mut buffer)?;
    let path = dir.join(format!("{}.1", title));
    fs::write(&path, buffer)?;
    Ok(path)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    fs::create_dir_all(&output_dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    let mut written = vec![render(cmd.clone(), &output_dir, &name)?];
    for sub in cmd.get_subcommands() {
        let title = format!("{}-{}", name, sub.get_name());
        written.push(render(sub.clone(), &output_dir, &title)?);
    }

    for path in &written {
        println!("{}", path.display());
    }
    println!("{} pages in {}", written.len(), output_dir.display());
    println!("View one with: man -l {}", written[0].display());

    Ok(())
}
