//! Generic streaming decompression, looked up by algorithm name.
//!
//! These decoders only know standard container formats (gzip members, zlib
//! streams). They are push-based: feed compressed bytes as they arrive and
//! collect whatever output is ready, so an async caller can drive them one
//! range fetch at a time.

use std::io::{self, Write};

use flate2::write::{GzDecoder, ZlibDecoder};

/// A push-based decompressor.
pub trait Decompressor: Send {
    /// Feed compressed input, appending any produced output to `out`.
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()>;

    /// Signal end of input and collect the remaining output.
    ///
    /// Fails if the stream is incomplete or its trailer does not check out.
    fn finish(self: Box<Self>, out: &mut Vec<u8>) -> io::Result<()>;
}

/// Names accepted by [`decompressor`].
pub const ALGORITHMS: &[&str] = &["gzip", "zlib"];

/// Look up a decompressor by algorithm name.
pub fn decompressor(algorithm: &str) -> Option<Box<dyn Decompressor>> {
    match algorithm {
        "gzip" => Some(Box::new(Gzip(GzDecoder::new(Vec::new())))),
        "zlib" => Some(Box::new(Zlib(ZlibDecoder::new(Vec::new())))),
        _ => None,
    }
}

struct Gzip(GzDecoder<Vec<u8>>);

impl Decompressor for Gzip {
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.0.write_all(input)?;
        self.0.flush()?;
        out.append(self.0.get_mut());
        Ok(())
    }

    fn finish(self: Box<Self>, out: &mut Vec<u8>) -> io::Result<()> {
        out.extend_from_slice(&self.0.finish()?);
        Ok(())
    }
}

struct Zlib(ZlibDecoder<Vec<u8>>);

impl Decompressor for Zlib {
    fn update(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.0.write_all(input)?;
        self.0.flush()?;
        out.append(self.0.get_mut());
        Ok(())
    }

    fn finish(self: Box<Self>, out: &mut Vec<u8>) -> io::Result<()> {
        out.extend_from_slice(&self.0.finish()?);
        Ok(())
    }
}
