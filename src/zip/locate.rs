//! Finding the central directory from the archive tail.
//!
//! ZIP files are read from the end: the End of Central Directory record
//! (EOCD) sits in the last 22 bytes plus an optional comment of up to
//! 65535 bytes. When its 32-bit fields are saturated, a ZIP64 locator just
//! before it points at a ZIP64 EOCD holding the real 64-bit values.

use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::structures::{EndOfCentralDirectory, SENTINEL_U32, Zip64EOCD, Zip64EOCDLocator};

/// Maximum ZIP comment size allowed by the format (65535 bytes).
pub const MAX_COMMENT_SIZE: usize = 65535;

/// Tail window covering a ZIP64 locator, the EOCD and a maximal comment.
pub const SEARCH_WINDOW: usize =
    Zip64EOCDLocator::SIZE + EndOfCentralDirectory::SIZE + MAX_COMMENT_SIZE;

/// Where the central directory lives, as resolved from the archive tail.
#[derive(Debug, Clone)]
pub struct ArchiveLocation {
    pub entry_count: u64,
    pub directory_offset: u64,
    pub directory_size: u64,
    /// Archive comment, raw bytes.
    pub comment: Bytes,
    /// Absolute offset of the EOCD record.
    pub eocd_offset: u64,
    /// Values came from the ZIP64 end record.
    pub zip64: bool,
}

/// Check for an EOCD with an empty comment at the very end of `window`.
pub fn find_eocd_exact(window: &[u8]) -> Option<usize> {
    let pos = window.len().checked_sub(EndOfCentralDirectory::SIZE)?;
    let record = &window[pos..];
    (record[..4] == EndOfCentralDirectory::MAGIC && record[20..22] == [0, 0]).then_some(pos)
}

/// Scan `window` backwards for an EOCD whose comment exactly fills the rest.
///
/// The length check rejects signature bytes that happen to occur inside the
/// comment itself.
pub fn find_eocd(window: &[u8]) -> Option<usize> {
    let last = window.len().checked_sub(EndOfCentralDirectory::SIZE)?;
    (0..=last).rev().find(|&i| {
        if window[i..i + 4] != EndOfCentralDirectory::MAGIC {
            return false;
        }
        let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;
        comment_len == window.len() - i - EndOfCentralDirectory::SIZE
    })
}

async fn read_tail<R: ReadAt>(reader: &R, len: usize) -> Result<(Bytes, u64)> {
    let size = reader.size();
    let len = (len as u64).min(size);
    let start = size - len;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact_at(start, &mut buf).await?;
    Ok((Bytes::from(buf), start))
}

/// Locate the EOCD and resolve the central directory position.
///
/// The common case costs one 22-byte read. Archives with a comment cost a
/// second read of up to [`SEARCH_WINDOW`] bytes; ZIP64 archives add the
/// 56-byte ZIP64 EOCD read (and the 20-byte locator when the tail window
/// did not already cover it).
pub async fn locate<R: ReadAt>(reader: &R) -> Result<ArchiveLocation> {
    let file_size = reader.size();
    if file_size < EndOfCentralDirectory::SIZE as u64 {
        return Err(ZipError::EocdNotFound);
    }

    let (mut window, mut window_start) = read_tail(reader, EndOfCentralDirectory::SIZE).await?;
    let pos = match find_eocd_exact(&window) {
        Some(pos) => pos,
        None => {
            (window, window_start) = read_tail(reader, SEARCH_WINDOW).await?;
            let pos = find_eocd(&window).ok_or(ZipError::EocdNotFound)?;
            debug!(window = window.len(), pos, "found EOCD in extended tail scan");
            pos
        }
    };

    let eocd = EndOfCentralDirectory::from_bytes(&window[pos..])?;
    let eocd_offset = window_start + pos as u64;
    let comment = window.slice(pos + EndOfCentralDirectory::SIZE..);
    debug!(eocd_offset, ?eocd, "end of central directory");

    let location = match find_locator(reader, &window, pos, eocd_offset, &eocd).await? {
        Some(locator) => {
            let eocd64 = read_zip64_eocd(reader, &locator).await?;
            debug!(?locator, ?eocd64, "resolved ZIP64 end of central directory");
            ArchiveLocation {
                entry_count: eocd64.total_entries,
                directory_offset: eocd64.cd_offset,
                directory_size: eocd64.cd_size,
                comment,
                eocd_offset,
                zip64: true,
            }
        }
        None => {
            if eocd.disk_number != 0 || eocd.disk_with_cd != 0 {
                return Err(ZipError::MultiDisk);
            }
            if eocd.cd_offset == SENTINEL_U32 {
                return Err(ZipError::Zip64Missing);
            }
            ArchiveLocation {
                entry_count: eocd.total_entries as u64,
                directory_offset: eocd.cd_offset as u64,
                directory_size: eocd.cd_size as u64,
                comment,
                eocd_offset,
                zip64: false,
            }
        }
    };

    let in_bounds = location
        .directory_offset
        .checked_add(location.directory_size)
        .is_some_and(|end| end <= file_size);
    if !in_bounds || location.directory_offset >= file_size {
        return Err(ZipError::OutOfBounds {
            what: "central directory",
            offset: location.directory_offset,
            size: location.directory_size,
            file_size,
        });
    }

    Ok(location)
}

/// Look for the ZIP64 locator immediately before the EOCD.
async fn find_locator<R: ReadAt>(
    reader: &R,
    window: &[u8],
    pos: usize,
    eocd_offset: u64,
    eocd: &EndOfCentralDirectory,
) -> Result<Option<Zip64EOCDLocator>> {
    if pos >= Zip64EOCDLocator::SIZE {
        let candidate = &window[pos - Zip64EOCDLocator::SIZE..pos];
        if !Zip64EOCDLocator::matches(candidate) {
            return Ok(None);
        }
        return Zip64EOCDLocator::from_bytes(candidate).map(Some);
    }

    // The 22-byte fast path never sees the locator; only fetch it when
    // the EOCD fields say the real values live elsewhere.
    if !eocd.is_zip64() || eocd_offset < Zip64EOCDLocator::SIZE as u64 {
        return Ok(None);
    }
    let mut buf = [0u8; Zip64EOCDLocator::SIZE];
    reader
        .read_exact_at(eocd_offset - Zip64EOCDLocator::SIZE as u64, &mut buf)
        .await?;
    if !Zip64EOCDLocator::matches(&buf) {
        return Ok(None);
    }
    Zip64EOCDLocator::from_bytes(&buf).map(Some)
}

/// Read the ZIP64 EOCD the locator points at.
async fn read_zip64_eocd<R: ReadAt>(reader: &R, locator: &Zip64EOCDLocator) -> Result<Zip64EOCD> {
    if locator.disk_with_eocd64 != 0 {
        return Err(ZipError::MultiDisk);
    }

    let file_size = reader.size();
    let offset = locator.eocd64_offset;
    let fits = offset
        .checked_add(Zip64EOCD::MIN_SIZE as u64)
        .is_some_and(|end| end <= file_size);
    if !fits {
        return Err(ZipError::OutOfBounds {
            what: "ZIP64 end of central directory",
            offset,
            size: Zip64EOCD::MIN_SIZE as u64,
            file_size,
        });
    }

    let mut buf = [0u8; Zip64EOCD::MIN_SIZE];
    reader.read_exact_at(offset, &mut buf).await?;
    let eocd64 = Zip64EOCD::from_bytes(&buf)?;

    if eocd64.disk_number != 0 || eocd64.disk_with_cd != 0 {
        return Err(ZipError::MultiDisk);
    }
    Ok(eocd64)
}
