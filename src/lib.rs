//! # lazyzip
//!
//! Read ZIP archives through random-access byte sources without loading them.
//!
//! Listing an archive costs a handful of range reads: the archive tail to
//! find the End of Central Directory record (plus the ZIP64 records when the
//! archive needs them) and one read for the central directory. Entries are
//! then parsed lazily from that buffer, and each entry's content is
//! streamed chunk by chunk. That makes it practical to list and pull single
//! files out of large remote archives over HTTP Range requests.
//!
//! ## Features
//!
//! - Local files, HTTP/HTTPS URLs and in-memory buffers as sources
//! - ZIP64 archives and entries
//! - STORED and DEFLATE entries; DEFLATE goes through a generic gzip decoder
//!   by wrapping the raw stream in a synthetic gzip header and trailer
//! - Code page 437, UTF-8 and Info-ZIP Unicode Path names
//! - Optional CRC-32 verification of streamed content
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use lazyzip::{HttpRangeReader, ZipReader};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let reader = Arc::new(HttpRangeReader::new("https://example.com/archive.zip".to_string()).await?);
//!     let zip = ZipReader::new(reader);
//!
//!     for entry in zip.entries().await? {
//!         let entry = entry?;
//!         println!("{}", entry.name()?);
//!     }
//!
//!     if let Some(readme) = zip.find("README.md").await? {
//!         println!("{}", readme.text().await?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod codec;
pub mod config;
pub mod error;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use config::ReaderOptions;
pub use error::{ErrorKind, Result, ZipError};
pub use io::{ByteRange, HttpRangeReader, LocalFileReader, MemoryReader, RangeChunks, ReadAt};
pub use zip::{
    ArchiveLocation, CompressionMethod, ContentStream, Entries, Entry, ZipExtractor, ZipReader,
};
