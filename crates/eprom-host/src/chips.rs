//! EPROM chip database
//!
//! The programmer has no way to ask a 27-series part what it is, so the
//! size has to come from the user. The database maps part names to sizes:
//! a built-in list of the common JEDEC parts, optionally extended from RON
//! files of the form
//!
//! ```text
//! (
//!     chips: [
//!         (name: "27C256", size: Kbit(256)),
//!         (name: "AT27C512R", size: KiB(64)),
//!     ],
//! )
//! ```

use std::fs;
use std::path::Path;

use eprom_core::protocol::{MAX_PAGE, PAGE_SIZE};
use thiserror::Error;

/// Bytes per kilobit of capacity
pub const BYTES_PER_KBIT: u32 = 128;

/// Error type for chip database operations
#[derive(Debug, Error)]
pub enum ChipDbError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kilobits, as 27-series part numbers count
    Kbit(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Size in bytes, `None` if it does not fit in a `u32`
    pub fn to_bytes(self) -> Option<u32> {
        match self {
            Size::B(n) => Some(n),
            Size::Kbit(n) => n.checked_mul(BYTES_PER_KBIT),
            Size::KiB(n) => n.checked_mul(1024),
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    size: Size,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct ChipFile {
    chips: Vec<ChipDef>,
}

/// One EPROM part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpromChip {
    /// Part name
    pub name: String,
    /// Capacity in bytes
    pub size: u32,
}

impl EpromChip {
    /// Create a chip entry from its capacity in kilobits
    pub fn from_kbit(name: &str, kbit: u32) -> Self {
        Self {
            name: name.to_string(),
            size: kbit * BYTES_PER_KBIT,
        }
    }

    /// Capacity in kilobits
    pub fn size_kbit(&self) -> u32 {
        self.size / BYTES_PER_KBIT
    }

    /// Number of 256-byte pages
    pub fn pages(&self) -> u32 {
        self.size / PAGE_SIZE as u32
    }

    /// Whether the whole part is reachable through the latched fast-dump path
    ///
    /// Fast dump only presets A8..A15, so it covers at most 256 pages.
    pub fn supports_fast_dump(&self) -> bool {
        self.pages() <= 256
    }
}

fn validate(def: ChipDef) -> Result<EpromChip, ChipDbError> {
    let max = (MAX_PAGE as u32 + 1) * PAGE_SIZE as u32;
    let size = def.size.to_bytes().ok_or_else(|| {
        ChipDbError::Validation(format!("{}: size {:?} overflows", def.name, def.size))
    })?;
    if size == 0 || size % PAGE_SIZE as u32 != 0 {
        return Err(ChipDbError::Validation(format!(
            "{}: size {} is not a whole number of pages",
            def.name, size
        )));
    }
    if size > max {
        return Err(ChipDbError::Validation(format!(
            "{}: size {} exceeds the {} bytes the programmer can address",
            def.name, size, max
        )));
    }
    Ok(EpromChip {
        name: def.name,
        size,
    })
}

const BUILTIN: &[(&str, u32)] = &[
    ("27C64", 64),
    ("27C128", 128),
    ("27C256", 256),
    ("27C512", 512),
    ("27C010", 1024),
    ("27C020", 2048),
    ("27C040", 4096),
];

/// Runtime chip database
#[derive(Debug, Clone, Default)]
pub struct ChipDatabase {
    chips: Vec<EpromChip>,
}

impl ChipDatabase {
    /// Create an empty chip database
    pub fn new() -> Self {
        Self { chips: Vec::new() }
    }

    /// Database holding the built-in 27-series parts
    pub fn builtin() -> Self {
        Self {
            chips: BUILTIN
                .iter()
                .map(|&(name, kbit)| EpromChip::from_kbit(name, kbit))
                .collect(),
        }
    }

    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, ChipDbError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    ///
    /// Either every definition in `content` is added or, on error, none.
    pub fn load_ron(&mut self, content: &str) -> Result<usize, ChipDbError> {
        let file: ChipFile = ron::from_str(content)?;
        let chips = file
            .chips
            .into_iter()
            .map(validate)
            .collect::<Result<Vec<_>, _>>()?;
        let count = chips.len();

        for chip in chips {
            // Later definitions replace earlier ones of the same name
            self.chips.retain(|c| !c.name.eq_ignore_ascii_case(&chip.name));
            self.chips.push(chip);
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, ChipDbError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }

    /// Get all chips in the database
    pub fn chips(&self) -> &[EpromChip] {
        &self.chips
    }

    /// Get the number of chips in the database
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Find a chip by exact name, ignoring case
    pub fn find(&self, name: &str) -> Option<&EpromChip> {
        self.chips.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over all chips
    pub fn iter(&self) -> impl Iterator<Item = &EpromChip> {
        self.chips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin() {
        let db = ChipDatabase::builtin();
        let chip = db.find("27c256").unwrap();
        assert_eq!(chip.size, 32 * 1024);
        assert_eq!(chip.pages(), 128);
        assert!(chip.supports_fast_dump());

        let chip = db.find("27C040").unwrap();
        assert_eq!(chip.pages(), MAX_PAGE as u32 + 1);
        assert!(!chip.supports_fast_dump());
        assert!(db.find("2716").is_none());
    }

    #[test]
    fn test_load_ron() {
        let mut db = ChipDatabase::builtin();
        let before = db.len();
        let n = db
            .load_ron(
                r#"(
                    chips: [
                        (name: "AT27C512R", size: KiB(64)),
                        (name: "27C256", size: B(32768)),
                    ],
                )"#,
            )
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(db.len(), before + 1);
        assert_eq!(db.find("at27c512r").unwrap().size_kbit(), 512);
    }

    #[test]
    fn test_load_ron_rejects_odd_sizes() {
        let mut db = ChipDatabase::new();
        assert!(matches!(
            db.load_ron("(chips: [(name: \"X\", size: B(100))])"),
            Err(ChipDbError::Validation(_))
        ));
        assert!(matches!(
            db.load_ron("(chips: [(name: \"Y\", size: Kbit(8192))])"),
            Err(ChipDbError::Validation(_))
        ));
        assert!(matches!(
            db.load_ron("(chips: oops)"),
            Err(ChipDbError::Parse(_))
        ));
    }

    #[test]
    fn test_load_ron_rejects_overflowing_size() {
        // 33554688 kbit is 2^32 + 32 KiB bytes
        let mut db = ChipDatabase::new();
        assert!(matches!(
            db.load_ron("(chips: [(name: \"BIG\", size: Kbit(33554688))])"),
            Err(ChipDbError::Validation(_))
        ));
        assert!(matches!(
            db.load_ron("(chips: [(name: \"BIG\", size: KiB(4194305))])"),
            Err(ChipDbError::Validation(_))
        ));
        assert!(db.is_empty());
    }

    #[test]
    fn test_load_ron_all_or_nothing() {
        let mut db = ChipDatabase::builtin();
        let before = db.chips().to_vec();
        assert!(db
            .load_ron(
                r#"(
                    chips: [
                        (name: "27C256", size: Kbit(512)),
                        (name: "BROKEN", size: B(100)),
                    ],
                )"#,
            )
            .is_err());
        assert_eq!(db.chips(), &before[..]);
        assert_eq!(db.find("27C256").unwrap().size, 32 * 1024);
    }
}
