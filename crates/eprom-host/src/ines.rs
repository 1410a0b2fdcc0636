//! iNES image splitter
//!
//! NES cartridges carry two ROMs, program (PRG) and character (CHR), and a
//! `.nes` dump stores both behind a 16-byte header. Burning a cartridge
//! takes one EPROM per ROM, so the image is split into a `.prg` and a `.chr`
//! file first.
//!
//! Header layout:
//!
//! | Bytes | Content                                   |
//! |-------|-------------------------------------------|
//! | 0-3   | `"NES"` followed by 0x1A                  |
//! | 4     | PRG ROM size in 16 KiB units              |
//! | 5     | CHR ROM size in 8 KiB units (0: CHR RAM)  |
//! | 6     | Flags 6 (bit 2: 512-byte trainer present) |
//! | 7     | Flags 7                                   |
//! | 8-15  | Not used here                             |

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::error::Result;

/// Size of the iNES header
pub const HEADER_SIZE: usize = 16;
/// Header magic
pub const MAGIC: [u8; 4] = *b"NES\x1A";
/// PRG ROM unit
pub const PRG_UNIT: usize = 16 * 1024;
/// CHR ROM unit
pub const CHR_UNIT: usize = 8 * 1024;
/// Size of the optional trainer between header and PRG ROM
pub const TRAINER_SIZE: usize = 512;

const FLAG6_TRAINER: u8 = 1 << 2;

/// Errors parsing an iNES image
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InesError {
    /// File shorter than the header
    #[error("file is {len} bytes, too short for an iNES header")]
    TooShort { len: usize },

    /// Header magic missing
    #[error("iNES header expected; is this a .nes file?")]
    BadMagic,

    /// A ROM section runs past the end of the file
    #[error("{section} ROM needs {expected} bytes, only {available} present")]
    Truncated {
        section: &'static str,
        expected: usize,
        available: usize,
    },
}

/// Decoded iNES header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InesHeader {
    /// PRG ROM size in 16 KiB units
    pub prg_banks: u8,
    /// CHR ROM size in 8 KiB units
    pub chr_banks: u8,
    /// Flags 6
    pub flags6: u8,
    /// Flags 7
    pub flags7: u8,
}

impl InesHeader {
    /// Parse the header at the start of `data`
    pub fn parse(data: &[u8]) -> std::result::Result<Self, InesError> {
        if data.len() < HEADER_SIZE {
            return Err(InesError::TooShort { len: data.len() });
        }
        if data[..4] != MAGIC {
            return Err(InesError::BadMagic);
        }
        Ok(Self {
            prg_banks: data[4],
            chr_banks: data[5],
            flags6: data[6],
            flags7: data[7],
        })
    }

    /// PRG ROM size in bytes
    pub fn prg_size(&self) -> usize {
        self.prg_banks as usize * PRG_UNIT
    }

    /// CHR ROM size in bytes; 0 when the board uses CHR RAM
    pub fn chr_size(&self) -> usize {
        self.chr_banks as usize * CHR_UNIT
    }

    /// Whether a trainer sits between header and PRG ROM
    pub fn has_trainer(&self) -> bool {
        self.flags6 & FLAG6_TRAINER != 0
    }

    /// iNES mapper number
    pub fn mapper(&self) -> u8 {
        (self.flags7 & 0xF0) | (self.flags6 >> 4)
    }
}

/// An iNES image split into its ROMs
#[derive(Debug, Clone, Copy)]
pub struct InesImage<'a> {
    /// Decoded header
    pub header: InesHeader,
    /// PRG ROM contents
    pub prg: &'a [u8],
    /// CHR ROM contents (empty with CHR RAM)
    pub chr: &'a [u8],
}

impl<'a> InesImage<'a> {
    /// Parse a whole `.nes` file
    pub fn parse(data: &'a [u8]) -> std::result::Result<Self, InesError> {
        let header = InesHeader::parse(data)?;
        let mut offset = HEADER_SIZE;
        if header.has_trainer() {
            offset += TRAINER_SIZE;
        }

        let prg = section(data, offset, header.prg_size(), "PRG")?;
        offset += prg.len();
        let chr = section(data, offset, header.chr_size(), "CHR")?;

        Ok(Self { header, prg, chr })
    }
}

fn section<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    name: &'static str,
) -> std::result::Result<&'a [u8], InesError> {
    let available = data.len().saturating_sub(offset);
    if available < len {
        return Err(InesError::Truncated {
            section: name,
            expected: len,
            available,
        });
    }
    Ok(&data[offset..offset + len])
}

/// Files written by [`split_file`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutput {
    /// Path of the PRG ROM file
    pub prg_path: PathBuf,
    /// Bytes written to the PRG file
    pub prg_len: usize,
    /// Path of the CHR ROM file, if the image has CHR ROM
    pub chr_path: Option<PathBuf>,
    /// Bytes written to the CHR file
    pub chr_len: usize,
}

/// Split `input` into `<base>.prg` and `<base>.chr`
///
/// `base` defaults to the input path without its extension.
pub fn split_file(input: &Path, base: Option<&Path>) -> Result<SplitOutput> {
    let data = fs::read(input)?;
    let image = InesImage::parse(&data)?;
    log::info!(
        "iNES: mapper {}, PRG {} x 16 KiB, CHR {} x 8 KiB{}",
        image.header.mapper(),
        image.header.prg_banks,
        image.header.chr_banks,
        if image.header.has_trainer() {
            ", trainer skipped"
        } else {
            ""
        }
    );

    let base = match base {
        Some(base) => base.to_path_buf(),
        None => input.with_extension(""),
    };

    let prg_path = with_suffix(&base, ".prg");
    fs::write(&prg_path, image.prg)?;

    let chr_path = if image.chr.is_empty() {
        log::info!("iNES: no CHR ROM (board uses CHR RAM)");
        None
    } else {
        let path = with_suffix(&base, ".chr");
        fs::write(&path, image.chr)?;
        Some(path)
    };

    Ok(SplitOutput {
        prg_path,
        prg_len: image.prg.len(),
        chr_path,
        chr_len: image.chr.len(),
    })
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(prg_banks: u8, chr_banks: u8, flags6: u8) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..4].copy_from_slice(&MAGIC);
        data[4] = prg_banks;
        data[5] = chr_banks;
        data[6] = flags6;
        if flags6 & FLAG6_TRAINER != 0 {
            data.extend(std::iter::repeat(0xEE).take(TRAINER_SIZE));
        }
        data.extend(std::iter::repeat(0x11).take(prg_banks as usize * PRG_UNIT));
        data.extend(std::iter::repeat(0x22).take(chr_banks as usize * CHR_UNIT));
        data
    }

    #[test]
    fn test_parse_header() {
        let data = image(2, 1, 0x10);
        let header = InesHeader::parse(&data).unwrap();
        assert_eq!(header.prg_size(), 32 * 1024);
        assert_eq!(header.chr_size(), 8 * 1024);
        assert_eq!(header.mapper(), 1);
        assert!(!header.has_trainer());
    }

    #[test]
    fn test_split_sections() {
        let data = image(1, 2, FLAG6_TRAINER);
        let img = InesImage::parse(&data).unwrap();
        assert_eq!(img.prg.len(), PRG_UNIT);
        assert!(img.prg.iter().all(|&b| b == 0x11));
        assert_eq!(img.chr.len(), 2 * CHR_UNIT);
        assert!(img.chr.iter().all(|&b| b == 0x22));
    }

    #[test]
    fn test_rejects_non_ines() {
        assert_eq!(
            InesHeader::parse(b"NES"),
            Err(InesError::TooShort { len: 3 })
        );
        let mut data = image(1, 1, 0);
        data[3] = 0x00;
        assert_eq!(InesImage::parse(&data).unwrap_err(), InesError::BadMagic);
    }

    #[test]
    fn test_truncated() {
        let mut data = image(1, 1, 0);
        data.truncate(HEADER_SIZE + PRG_UNIT + 100);
        assert_eq!(
            InesImage::parse(&data).unwrap_err(),
            InesError::Truncated {
                section: "CHR",
                expected: CHR_UNIT,
                available: 100
            }
        );
    }

    #[test]
    fn test_split_file_writes_chr_data() {
        let dir = std::env::temp_dir().join(format!("eprom-ines-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("game.nes");
        fs::write(&input, image(1, 1, 0)).unwrap();

        let out = split_file(&input, None).unwrap();
        assert_eq!(out.prg_path, dir.join("game.prg"));
        assert_eq!(out.chr_path.as_deref(), Some(dir.join("game.chr").as_path()));
        let chr = fs::read(dir.join("game.chr")).unwrap();
        assert_eq!(chr.len(), CHR_UNIT);
        assert!(chr.iter().all(|&b| b == 0x22));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_split_file_chr_ram() {
        let dir = std::env::temp_dir().join(format!("eprom-ines-ram-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("game.nes");
        fs::write(&input, image(1, 0, 0)).unwrap();

        let out = split_file(&input, Some(&dir.join("out"))).unwrap();
        assert_eq!(out.prg_path, dir.join("out.prg"));
        assert_eq!(out.prg_len, PRG_UNIT);
        assert!(out.chr_path.is_none());

        fs::remove_dir_all(&dir).unwrap();
    }
}
