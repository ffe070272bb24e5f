use super::ReadAt;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// In-memory source, mostly useful for archives already held as bytes.
///
/// Counts requests and transferred bytes the same way the HTTP reader does,
/// which makes the fetch pattern of the parser observable.
pub struct MemoryReader {
    data: Bytes,
    requests: AtomicUsize,
    transferred_bytes: AtomicU64,
}

impl MemoryReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            requests: AtomicUsize::new(0),
            transferred_bytes: AtomicU64::new(0),
        }
    }

    /// Number of `read_at` calls served so far
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    /// Total bytes handed out so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let len = self.data.len() as u64;
        if offset >= len {
            return Ok(0);
        }

        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
