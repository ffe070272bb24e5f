//! Random-access byte sources.
//!
//! Everything the ZIP reader needs from storage goes through [`ReadAt`]:
//! positional reads that never touch shared cursor state, so one source can
//! serve several entry streams at once behind an `Arc`.

mod http;
mod local;
mod memory;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;
pub use memory::MemoryReader;

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use bytes::Bytes;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer, failing if the source ends first.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let pos = offset + filled as u64;
            let n = self.read_at(pos, &mut buf[filled..]).await?;
            if n == 0 {
                bail!(
                    "unexpected end of source at offset {} ({} of {} bytes read)",
                    pos,
                    filled,
                    buf.len()
                );
            }
            filled += n;
        }
        Ok(())
    }
}

/// A `[start, end)` window onto a shared source.
///
/// Nothing is read until one of the accessors is awaited.
pub struct ByteRange<R: ReadAt> {
    reader: Arc<R>,
    start: u64,
    end: u64,
}

impl<R: ReadAt> ByteRange<R> {
    /// Create a range, failing if it does not fit inside the source.
    pub fn new(reader: Arc<R>, start: u64, end: u64) -> crate::Result<Self> {
        let size = reader.size();
        if end < start || end > size {
            return Err(crate::ZipError::OutOfBounds {
                what: "byte range",
                offset: start,
                size: end.saturating_sub(start),
                file_size: size,
            });
        }
        Ok(Self { reader, start, end })
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Read the whole range with a single request.
    pub async fn bytes(&self) -> crate::Result<Bytes> {
        let len = usize::try_from(self.len()).map_err(|_| crate::ZipError::OutOfBounds {
            what: "byte range",
            offset: self.start,
            size: self.len(),
            file_size: self.reader.size(),
        })?;
        let mut buf = vec![0u8; len];
        self.reader.read_exact_at(self.start, &mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Read the whole range and decode it as UTF-8, replacing invalid sequences.
    pub async fn text(&self) -> crate::Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Turn the range into a sequence of fetches of at most `chunk_size` bytes.
    pub fn chunks(self, chunk_size: usize) -> RangeChunks<R> {
        RangeChunks {
            reader: Some(self.reader),
            pos: self.start,
            end: self.end,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<R: ReadAt> Clone for ByteRange<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            start: self.start,
            end: self.end,
        }
    }
}

impl<R: ReadAt> std::fmt::Debug for ByteRange<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteRange")
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

/// Incremental reader over a [`ByteRange`].
///
/// Holds its own handle on the source until exhausted, released or dropped.
pub struct RangeChunks<R: ReadAt> {
    reader: Option<Arc<R>>,
    pos: u64,
    end: u64,
    chunk_size: usize,
}

impl<R: ReadAt> RangeChunks<R> {
    /// Fetch the next chunk, or `None` once the range is exhausted or released.
    pub async fn next_chunk(&mut self) -> crate::Result<Option<Bytes>> {
        let Some(reader) = self.reader.clone() else {
            return Ok(None);
        };
        if self.pos >= self.end {
            self.release();
            return Ok(None);
        }

        let len = (self.end - self.pos).min(self.chunk_size as u64) as usize;
        let mut buf = vec![0u8; len];
        let read = reader.read_exact_at(self.pos, &mut buf).await;
        if let Err(e) = read {
            self.release();
            return Err(e.into());
        }
        self.pos += len as u64;
        Ok(Some(Bytes::from(buf)))
    }

    /// Bytes not yet fetched.
    pub fn remaining(&self) -> u64 {
        if self.reader.is_none() {
            0
        } else {
            self.end - self.pos
        }
    }

    /// Drop the source handle; later calls to `next_chunk` return `None`.
    /// Calling this more than once is harmless.
    pub fn release(&mut self) {
        self.reader = None;
    }

    pub fn is_released(&self) -> bool {
        self.reader.is_none()
    }
}
