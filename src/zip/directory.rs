//! Central directory walking.
//!
//! The whole central directory is fetched with one range read, then split
//! into records in memory. That keeps listing cheap over HTTP: the tail
//! read, optionally the ZIP64 records, and this one directory read are all
//! the I/O needed to enumerate an archive.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::config::ReaderOptions;
use crate::error::{Result, ZipError};
use crate::io::ReadAt;

use super::entry::Entry;
use super::locate::{self, ArchiveLocation};

/// Reader for the directory of a ZIP archive.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use lazyzip::{LocalFileReader, ZipReader};
///
/// # async fn run() -> lazyzip::Result<()> {
/// let source = Arc::new(LocalFileReader::new("archive.zip".as_ref())?);
/// let zip = ZipReader::new(source);
/// for entry in zip.entries().await? {
///     let entry = entry?;
///     println!("{} ({} bytes)", entry.name()?, entry.size());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZipReader<R: ReadAt> {
    reader: Arc<R>,
    options: ReaderOptions,
}

impl<R: ReadAt> ZipReader<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self::with_options(reader, ReaderOptions::default())
    }

    pub fn with_options(reader: Arc<R>, options: ReaderOptions) -> Self {
        Self { reader, options }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &Arc<R> {
        &self.reader
    }

    /// Resolve the central directory position from the archive tail.
    pub async fn locate(&self) -> Result<ArchiveLocation> {
        locate::locate(self.reader.as_ref()).await
    }

    /// Fetch the central directory and return a walker over its records.
    ///
    /// Each call re-locates and re-fetches; the returned walker is single-pass.
    pub async fn entries(&self) -> Result<Entries<R>> {
        let location = self.locate().await?;
        let len = usize::try_from(location.directory_size).map_err(|_| ZipError::OutOfBounds {
            what: "central directory",
            offset: location.directory_offset,
            size: location.directory_size,
            file_size: self.reader.size(),
        })?;

        let mut buf = vec![0u8; len];
        self.reader
            .read_exact_at(location.directory_offset, &mut buf)
            .await?;
        debug!(
            offset = location.directory_offset,
            size = len,
            entries = location.entry_count,
            zip64 = location.zip64,
            "fetched central directory"
        );

        Ok(Entries {
            reader: Arc::clone(&self.reader),
            options: self.options,
            directory: Bytes::from(buf),
            pos: 0,
            remaining: location.entry_count,
            failed: false,
        })
    }

    /// Collect every entry.
    pub async fn list(&self) -> Result<Vec<Entry<R>>> {
        self.entries().await?.collect()
    }

    /// First entry whose decoded name equals `name`.
    pub async fn find(&self, name: &str) -> Result<Option<Entry<R>>> {
        for entry in self.entries().await? {
            let entry = entry?;
            if entry.name()? == name {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }
}

/// Single-pass iterator over central directory records.
///
/// Bounded by the entry count from the EOCD. Parsing does no I/O. The first
/// malformed record ends the iteration with its error.
pub struct Entries<R: ReadAt> {
    reader: Arc<R>,
    options: ReaderOptions,
    directory: Bytes,
    pos: usize,
    remaining: u64,
    failed: bool,
}

impl<R: ReadAt> Entries<R> {
    /// Records still to be yielded, per the EOCD count.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Size of the fetched central directory.
    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    /// Offset of the next record within the fetched directory.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn parse_next(&mut self) -> Result<Entry<R>> {
        let rest = self.directory.slice(self.pos..);
        let entry = Entry::parse(Arc::clone(&self.reader), self.options, rest)?;
        trace!(pos = self.pos, ?entry, "central directory record");
        self.pos += entry.record_len();
        Ok(entry)
    }
}

impl<R: ReadAt> Iterator for Entries<R> {
    type Item = Result<Entry<R>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        match self.parse_next() {
            Ok(entry) => {
                self.remaining -= 1;
                if self.remaining == 0 && self.pos != self.directory.len() {
                    debug!(
                        unused = self.directory.len() - self.pos,
                        "central directory has trailing bytes"
                    );
                }
                Some(Ok(entry))
            }
            Err(e) => {
                self.failed = true;
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed || self.remaining == 0 {
            return (0, Some(0));
        }
        // Every record takes at least 46 bytes, which caps a lying count.
        let by_bytes = (self.directory.len() - self.pos) / 46 + 1;
        let upper = usize::try_from(self.remaining).map_or(by_bytes, |n| n.min(by_bytes));
        (0, Some(upper))
    }
}

impl<R: ReadAt> std::iter::FusedIterator for Entries<R> {}
