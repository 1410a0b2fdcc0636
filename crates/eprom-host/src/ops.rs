//! Whole-chip operations built from page commands
//!
//! Each operation reports progress through a callback that receives the
//! number of bytes handled so far, so the caller decides how to show it.

use eprom_core::protocol::{MAX_PAGE, PAGE_SIZE};

use crate::backend::Backend;
use crate::error::{HostError, Result};
use crate::transport::Transport;

/// Which read command to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Read through the direct address bus
    Direct,
    /// Read through the latched address path (first 256 pages only)
    FastDump,
}

/// First byte that differs between two images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Byte offset in the chip
    pub offset: usize,
    /// Byte the image holds
    pub expected: u8,
    /// Byte the chip holds
    pub found: u8,
}

/// Number of pages in `size` bytes, which must be a whole number of pages
pub fn pages_for_size(size: u64) -> Result<u32> {
    if size == 0 || size % PAGE_SIZE as u64 != 0 {
        return Err(HostError::InvalidParameter(format!(
            "size {} is not a whole number of {}-byte pages",
            size, PAGE_SIZE
        )));
    }
    u32::try_from(size / PAGE_SIZE as u64)
        .map_err(|_| HostError::InvalidParameter(format!("size {} too large", size)))
}

/// Check that an image file fits the chip exactly
pub fn check_image_size(file: u64, rom: u64) -> Result<()> {
    if file != rom {
        return Err(HostError::SizeMismatch { file, rom });
    }
    Ok(())
}

/// Page index as sent on the wire, or `InvalidPage` past the last one
fn page_index(page: usize) -> Result<u16> {
    u16::try_from(page)
        .ok()
        .filter(|&p| p <= MAX_PAGE)
        .ok_or(HostError::InvalidPage {
            page: u32::try_from(page).unwrap_or(u32::MAX),
            max: MAX_PAGE as u32,
        })
}

/// Fail before any traffic if `pages` pages run past the address space
fn check_page_count(pages: usize) -> Result<()> {
    match pages.checked_sub(1) {
        Some(last) => page_index(last).map(|_| ()),
        None => Ok(()),
    }
}

/// Read `pages` pages starting at page 0
pub fn read_pages<T: Transport>(
    backend: &mut Backend<T>,
    pages: u32,
    mode: ReadMode,
    mut progress: impl FnMut(usize),
) -> Result<Vec<u8>> {
    if mode == ReadMode::FastDump && pages > 256 {
        return Err(HostError::InvalidParameter(format!(
            "fast dump reaches 256 pages, {} requested",
            pages
        )));
    }
    check_page_count(pages as usize)?;

    let mut data = Vec::with_capacity(pages as usize * PAGE_SIZE);
    for page in 0..pages as usize {
        let index = page_index(page)?;
        let chunk = match mode {
            ReadMode::Direct => backend.read_page(index)?,
            ReadMode::FastDump => {
                let preset = u8::try_from(index).map_err(|_| HostError::InvalidPage {
                    page: index as u32,
                    max: u8::MAX as u32,
                })?;
                backend.fast_dump(preset)?
            }
        };
        data.extend_from_slice(&chunk);
        progress(data.len());
    }
    Ok(data)
}

/// Program `image` starting at page 0
///
/// Pages that are entirely 0xFF are skipped: programming can only clear
/// bits, so an erased page already holds them.
pub fn write_pages<T: Transport>(
    backend: &mut Backend<T>,
    image: &[u8],
    mut progress: impl FnMut(usize),
) -> Result<()> {
    pages_for_size(image.len() as u64)?;
    check_page_count(image.len() / PAGE_SIZE)?;

    let mut skipped = 0;
    for (page, chunk) in image.chunks_exact(PAGE_SIZE).enumerate() {
        if chunk.iter().all(|&b| b == 0xFF) {
            skipped += 1;
        } else {
            let data: &[u8; PAGE_SIZE] = chunk.try_into().map_err(|_| {
                HostError::InvalidParameter(format!("page {} is not {} bytes", page, PAGE_SIZE))
            })?;
            backend.write_page(page_index(page)?, data)?;
        }
        progress((page + 1) * PAGE_SIZE);
    }
    if skipped > 0 {
        log::debug!("skipped {} blank pages", skipped);
    }
    Ok(())
}

/// Read the chip back and compare it with `expected`
///
/// Returns the first mismatch, or `None` if the chip matches.
pub fn verify_pages<T: Transport>(
    backend: &mut Backend<T>,
    expected: &[u8],
    mut progress: impl FnMut(usize),
) -> Result<Option<Mismatch>> {
    pages_for_size(expected.len() as u64)?;
    check_page_count(expected.len() / PAGE_SIZE)?;

    for (page, want) in expected.chunks_exact(PAGE_SIZE).enumerate() {
        let got = backend.read_page(page_index(page)?)?;
        if let Some(i) = want.iter().zip(got.iter()).position(|(a, b)| a != b) {
            return Ok(Some(Mismatch {
                offset: page * PAGE_SIZE + i,
                expected: want[i],
                found: got[i],
            }));
        }
        progress((page + 1) * PAGE_SIZE);
    }
    Ok(None)
}

/// Check that the first `pages` pages are erased (all 0xFF)
///
/// Returns the offset and value of the first programmed byte, if any.
pub fn blank_check<T: Transport>(
    backend: &mut Backend<T>,
    pages: u32,
    mut progress: impl FnMut(usize),
) -> Result<Option<(usize, u8)>> {
    check_page_count(pages as usize)?;
    for page in 0..pages as usize {
        let data = backend.read_page(page_index(page)?)?;
        if let Some(i) = data.iter().position(|&b| b != 0xFF) {
            return Ok(Some((page * PAGE_SIZE + i, data[i])));
        }
        progress((page + 1) * PAGE_SIZE);
    }
    Ok(None)
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::transport::sim::SimTransport;
    use eprom_sim::SimConfig;

    fn sim_backend(kbit: usize) -> Backend<SimTransport> {
        Backend::new(SimTransport::new(SimConfig::from_kbit(kbit)))
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 + (i >> 8)) as u8).collect()
    }

    #[test]
    fn test_pages_for_size() {
        assert_eq!(pages_for_size(32 * 1024).unwrap(), 128);
        assert!(pages_for_size(0).is_err());
        assert!(pages_for_size(300).is_err());
    }

    #[test]
    fn test_check_image_size() {
        check_image_size(8192, 8192).unwrap();
        assert!(matches!(
            check_image_size(8000, 8192),
            Err(HostError::SizeMismatch {
                file: 8000,
                rom: 8192
            })
        ));
    }

    #[test]
    fn test_burn_then_dump() {
        let mut backend = sim_backend(64);
        let image = pattern(8192);

        assert_eq!(blank_check(&mut backend, 32, |_| {}).unwrap(), None);

        let mut last = 0;
        write_pages(&mut backend, &image, |n| last = n).unwrap();
        assert_eq!(last, image.len());

        let dump = read_pages(&mut backend, 32, ReadMode::Direct, |_| {}).unwrap();
        assert_eq!(dump, image);
        assert_eq!(verify_pages(&mut backend, &image, |_| {}).unwrap(), None);

        let fdump = read_pages(&mut backend, 32, ReadMode::FastDump, |_| {}).unwrap();
        assert_eq!(fdump, image);

        let link = backend.into_transport().into_link();
        assert!(link.chip().violations().is_empty());
    }

    #[test]
    fn test_blank_pages_not_programmed() {
        let mut backend = sim_backend(64);
        let mut image = vec![0xFF; 8192];
        image[0x1234] = 0x00;
        write_pages(&mut backend, &image, |_| {}).unwrap();

        let link = backend.into_transport().into_link();
        assert_eq!(link.chip().programmed(), PAGE_SIZE);
        assert_eq!(link.chip().data()[0x1234], 0x00);
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut backend = sim_backend(64);
        let image = pattern(8192);
        write_pages(&mut backend, &image, |_| {}).unwrap();

        let mut other = image.clone();
        other[0x0305] ^= 0x80;
        assert_eq!(
            verify_pages(&mut backend, &other, |_| {}).unwrap(),
            Some(Mismatch {
                offset: 0x0305,
                expected: other[0x0305],
                found: image[0x0305]
            })
        );
        assert_eq!(
            blank_check(&mut backend, 32, |_| {}).unwrap(),
            Some((0, image[0]))
        );
    }

    #[test]
    fn test_fast_dump_limit() {
        let mut backend = sim_backend(1024);
        assert!(matches!(
            read_pages(&mut backend, 512, ReadMode::FastDump, |_| {}),
            Err(HostError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_oversized_image_rejected_before_writing() {
        let mut backend = sim_backend(4096);
        let pages = MAX_PAGE as usize + 2;
        let mut image = vec![0xFF; pages * PAGE_SIZE];
        image[0] = 0x00;

        assert!(matches!(
            write_pages(&mut backend, &image, |_| {}),
            Err(HostError::InvalidPage { page, .. }) if page == pages as u32 - 1
        ));
        assert!(matches!(
            blank_check(&mut backend, pages as u32, |_| {}),
            Err(HostError::InvalidPage { .. })
        ));

        let link = backend.into_transport().into_link();
        assert_eq!(link.chip().programmed(), 0);
        assert_eq!(link.chip().clock_us(), 0);
    }

    #[test]
    fn test_page_index_limits() {
        assert_eq!(page_index(0).unwrap(), 0);
        assert_eq!(page_index(MAX_PAGE as usize).unwrap(), MAX_PAGE);
        assert!(matches!(
            page_index(0x1_0005),
            Err(HostError::InvalidPage { page: 0x1_0005, .. })
        ));
    }

    #[test]
    fn test_reprogramming_cannot_set_bits() {
        let mut backend = sim_backend(64);
        write_pages(&mut backend, &vec![0x00; 8192], |_| {}).unwrap();
        let image = pattern(8192);
        write_pages(&mut backend, &image, |_| {}).unwrap();
        let found = verify_pages(&mut backend, &image, |_| {}).unwrap();
        assert!(found.is_some());
    }
}
