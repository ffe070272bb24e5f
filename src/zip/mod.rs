//! ZIP archive reading.
//!
//! ## Architecture
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 records, headers)
//! - [`locate`]: find the EOCD in the archive tail and resolve ZIP64
//! - [`extra`]: extra-field tables and ZIP64 value resolution
//! - [`directory`]: fetch the central directory once and walk its records
//! - [`entry`]: per-record metadata, name decoding and content access
//! - [`envelope`]: raw DEFLATE through the generic gzip decoder
//! - [`stream`]: pull-based content streams
//! - [`extractor`]: write entries to files or writers
//!
//! ## Flow
//!
//! [`ZipReader::entries`] locates the EOCD (one 22-byte read in the common
//! case), resolves ZIP64 if needed, fetches the whole central directory in a
//! single read and yields [`Entry`] values parsed from it without further
//! I/O. Reading an entry's content costs one local header read plus one
//! read per chunk.
//!
//! ## Limitations
//!
//! - No encryption support (encrypted entries are rejected)
//! - No multi-disk archive support
//! - Only STORED and DEFLATE compression

pub mod cp437;
pub mod directory;
pub mod entry;
pub mod envelope;
pub mod extra;
pub mod extractor;
pub mod locate;
pub mod stream;
pub mod structures;

pub use directory::{Entries, ZipReader};
pub use entry::Entry;
pub use extra::{ExtraField, ExtraFields};
pub use extractor::ZipExtractor;
pub use locate::ArchiveLocation;
pub use stream::ContentStream;
pub use structures::CompressionMethod;
