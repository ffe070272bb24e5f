//! Raw DEFLATE decoding through a gzip decoder.
//!
//! ZIP stores deflate data bare, with no container around it. A gzip member
//! is exactly that bitstream between a 10-byte header and an 8-byte trailer
//! (CRC-32 and size modulo 2^32), and the directory record already knows
//! both trailer values. So the missing framing is synthesized around the
//! entry bytes and the whole thing is fed to the generic `"gzip"` codec.

use std::io;

use crate::codec::{self, Decompressor};
use crate::error::{Result, ZipError};

/// Minimal gzip header: magic, deflate method, no flags, zero mtime, zero XFL/OS.
pub const GZIP_HEADER: [u8; 10] = [0x1f, 0x8b, 0x08, 0, 0, 0, 0, 0, 0, 0];

/// gzip trailer for content with this CRC-32 and length.
pub fn gzip_trailer(crc32: u32, size: u64) -> [u8; 8] {
    let mut trailer = [0u8; 8];
    trailer[..4].copy_from_slice(&crc32.to_le_bytes());
    trailer[4..].copy_from_slice(&(size as u32).to_le_bytes());
    trailer
}

/// A [`Decompressor`] for raw DEFLATE built on the gzip codec.
///
/// The gzip decoder checks the trailer it is given, so a recorded CRC-32 or
/// size that disagrees with the data surfaces as an error from `finish`.
pub struct RawDeflate {
    inner: Box<dyn Decompressor>,
    header_sent: bool,
    trailer: [u8; 8],
}

impl RawDeflate {
    pub fn new(crc32: u32, size: u64) -> Result<Self> {
        let inner = codec::decompressor("gzip")
            .ok_or_else(|| ZipError::UnsupportedAlgorithm("gzip".to_string()))?;
        Ok(Self {
            inner,
            header_sent: false,
            trailer: gzip_trailer(crc32, size),
        })
    }

    fn send_header(&mut self, out: &mut Vec<u8>) -> io::Result<()> {
        if !self.header_sent {
            self.inner.update(&GZIP_HEADER, out)?;
            self.header_sent = true;
        }
        Ok(())
    }
}

impl Decompressor for RawDeflate {
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.send_header(out)?;
        self.inner.update(input, out)
    }

    fn finish(mut self: Box<Self>, out: &mut Vec<u8>) -> io::Result<()> {
        self.send_header(out)?;
        let RawDeflate { mut inner, trailer, .. } = *self;
        inner.update(&trailer, out)?;
        inner.finish(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn inflate(raw: &[u8], crc32: u32, size: u64, step: usize) -> io::Result<Vec<u8>> {
        let mut dec: Box<dyn Decompressor> = Box::new(RawDeflate::new(crc32, size).unwrap());
        let mut out = Vec::new();
        for chunk in raw.chunks(step) {
            dec.update(chunk, &mut out)?;
        }
        dec.finish(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_header_bytes() {
        assert_eq!(GZIP_HEADER[..3], [0x1f, 0x8b, 8]);
        assert!(GZIP_HEADER[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_trailer_wraps_size() {
        let trailer = gzip_trailer(0xD8D4_C2F0, (1u64 << 32) + 5);
        assert_eq!(trailer, [0xF0, 0xC2, 0xD4, 0xD8, 5, 0, 0, 0]);
    }

    #[test]
    fn test_raw_deflate_round_trip() {
        let data = b"raw deflate wrapped in a synthetic gzip member. ".repeat(40);
        let raw = deflate(&data);
        let out = inflate(&raw, crc32fast::hash(&data), data.len() as u64, 13).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_recorded_crc_is_checked() {
        let data = b"some content";
        let raw = deflate(data);
        let wrong = crc32fast::hash(data) ^ 1;
        assert!(inflate(&raw, wrong, data.len() as u64, 64).is_err());
    }
}
