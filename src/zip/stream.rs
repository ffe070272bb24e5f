//! Streaming access to entry content.

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::codec::Decompressor;
use crate::config::ReaderOptions;
use crate::error::{Result, ZipError};
use crate::io::{ByteRange, RangeChunks, ReadAt};

use super::envelope::RawDeflate;
use super::structures::CompressionMethod;

/// Running CRC-32 and length of everything handed to the caller.
struct Checksum {
    hasher: crc32fast::Hasher,
    len: u64,
    expected_crc: u32,
    expected_size: u64,
}

impl Checksum {
    fn verify(self) -> Result<()> {
        if self.len != self.expected_size {
            return Err(ZipError::SizeMismatch {
                expected: self.expected_size,
                actual: self.len,
            });
        }
        let actual = self.hasher.finalize();
        if actual != self.expected_crc {
            return Err(ZipError::ChecksumMismatch {
                expected: self.expected_crc,
                actual,
            });
        }
        Ok(())
    }
}

/// Decompressed bytes of one entry, pulled chunk by chunk.
///
/// Each pull fetches at most one chunk of compressed data. Dropping the
/// stream, calling [`close`](Self::close), hitting an error or reaching the
/// end all release the source handle and decoder; nothing is fetched after
/// that.
pub struct ContentStream<R: ReadAt> {
    source: RangeChunks<R>,
    decoder: Option<Box<dyn Decompressor>>,
    checksum: Option<Checksum>,
    finished: bool,
}

impl<R: ReadAt> ContentStream<R> {
    pub(crate) fn new(
        data: ByteRange<R>,
        method: CompressionMethod,
        crc32: u32,
        size: u64,
        options: &ReaderOptions,
    ) -> Result<Self> {
        let decoder: Option<Box<dyn Decompressor>> = match method {
            CompressionMethod::Stored => None,
            CompressionMethod::Deflate => Some(Box::new(RawDeflate::new(crc32, size)?)),
            CompressionMethod::Unknown(m) => return Err(ZipError::UnsupportedCompression(m)),
        };
        let checksum = options.verify_checksums.then(|| Checksum {
            hasher: crc32fast::Hasher::new(),
            len: 0,
            expected_crc: crc32,
            expected_size: size,
        });

        Ok(Self {
            source: data.chunks(options.chunk_size),
            decoder,
            checksum,
            finished: false,
        })
    }

    /// Next piece of content, or `None` at the end.
    ///
    /// An error closes the stream.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let result = self.pull().await;
        if result.is_err() {
            self.close();
        }
        result
    }

    async fn pull(&mut self) -> Result<Option<Bytes>> {
        while !self.finished {
            match self.source.next_chunk().await? {
                Some(input) => {
                    let output = match self.decoder.as_mut() {
                        Some(decoder) => {
                            let mut out = Vec::with_capacity(input.len() * 2);
                            decoder
                                .update(&input, &mut out)
                                .map_err(ZipError::Decompression)?;
                            Bytes::from(out)
                        }
                        None => input,
                    };
                    // Deflate may need more input before it emits anything.
                    if output.is_empty() {
                        continue;
                    }
                    self.observe(&output);
                    return Ok(Some(output));
                }
                None => {
                    self.finished = true;
                    let mut tail = Vec::new();
                    if let Some(decoder) = self.decoder.take() {
                        decoder.finish(&mut tail).map_err(ZipError::Decompression)?;
                    }
                    self.observe(&tail);
                    if let Some(checksum) = self.checksum.take() {
                        checksum.verify()?;
                    }
                    if !tail.is_empty() {
                        return Ok(Some(Bytes::from(tail)));
                    }
                }
            }
        }
        Ok(None)
    }

    fn observe(&mut self, data: &[u8]) {
        if let Some(checksum) = self.checksum.as_mut() {
            checksum.hasher.update(data);
            checksum.len += data.len() as u64;
        }
    }

    /// Drain the rest of the stream into memory.
    pub async fn read_to_end(&mut self) -> Result<Bytes> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next_chunk().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(Bytes::from(buf))
    }

    /// Drain the rest of the stream into `writer`, returning the bytes written.
    pub async fn copy_to<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> Result<u64> {
        let mut written = 0;
        while let Some(chunk) = self.next_chunk().await? {
            if let Err(e) = writer.write_all(&chunk).await {
                self.close();
                return Err(e.into());
            }
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Stop reading and release the source and decoder. Idempotent.
    pub fn close(&mut self) {
        self.source.release();
        self.decoder = None;
        self.checksum = None;
        self.finished = true;
    }

    pub fn is_closed(&self) -> bool {
        self.finished
    }
}
