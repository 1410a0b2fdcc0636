//! List commands implementation

use eprom_host::ChipDatabase;

/// List all known chips
pub fn list_chips(db: &ChipDatabase) {
    println!("Known EPROMs:");
    println!();
    println!("{:<12} {:>10} {:>10} {:>7} {:>10}", "Name", "Size", "kbit", "Pages", "Fast dump");
    println!("{}", "-".repeat(53));

    for chip in db.iter() {
        println!(
            "{:<12} {:>10} {:>10} {:>7} {:>10}",
            chip.name,
            format_size(chip.size),
            chip.size_kbit(),
            chip.pages(),
            if chip.supports_fast_dump() { "yes" } else { "no" }
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
