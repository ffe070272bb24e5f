//! Error types for ZIP reading.

use thiserror::Error;

/// Coarse classification of a [`ZipError`].
///
/// Lets callers tell "this is not a ZIP archive" apart from "this is a ZIP
/// archive using a feature we do not read".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Structural check failed: missing record, bad signature, bad bounds.
    BadFormat,
    /// Valid archive, but uses encryption or an unknown compression method.
    Unsupported,
    /// Caller asked for bytes outside an entry.
    Range,
    /// Streamed content disagrees with the recorded checksum or size.
    Integrity,
    /// The byte source failed.
    Io,
}

/// Errors that can occur when reading ZIP archives.
#[derive(Debug, Error)]
pub enum ZipError {
    /// No End of Central Directory record in the archive tail.
    #[error("could not find end of central directory record")]
    EocdNotFound,

    /// A record did not start with its expected signature.
    #[error("invalid {record} signature: expected {expected:#010x}, got {actual:#010x}")]
    InvalidSignature {
        record: &'static str,
        expected: u32,
        actual: u32,
    },

    /// A record extends past the bytes available for it.
    #[error("truncated {record}: needs {needed} bytes, only {available} available")]
    Truncated {
        record: &'static str,
        needed: u64,
        available: u64,
    },

    /// Archive spans more than one disk.
    #[error("multi-disk archives are not supported")]
    MultiDisk,

    /// 32-bit fields carry ZIP64 sentinels but no ZIP64 locator precedes the EOCD.
    #[error("ZIP64 end of central directory not found")]
    Zip64Missing,

    /// A structure points outside the archive.
    #[error("{what} out of bounds: offset {offset} + size {size} exceeds archive size {file_size}")]
    OutOfBounds {
        what: &'static str,
        offset: u64,
        size: u64,
        file_size: u64,
    },

    /// Entry data is encrypted.
    #[error("encrypted entries are not supported")]
    Encrypted,

    /// Central directory uses strong encryption (names may be masked).
    #[error("strong encryption is not supported")]
    StrongEncryption,

    /// Compression method other than stored or deflate.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// No decompressor registered under this name.
    #[error("unsupported decompression algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Requested range lies outside the entry.
    #[error("range {start}..{end} outside entry data of {len} bytes")]
    RangeViolation { start: u64, end: u64, len: u64 },

    /// Streamed content does not match the recorded CRC-32.
    #[error("CRC-32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    /// Streamed content does not match the recorded size.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    /// The decompression primitive rejected its input.
    #[error("decompression error: {0}")]
    Decompression(#[source] std::io::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error reported by a byte source.
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl ZipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ZipError::EocdNotFound
            | ZipError::InvalidSignature { .. }
            | ZipError::Truncated { .. }
            | ZipError::MultiDisk
            | ZipError::Zip64Missing
            | ZipError::OutOfBounds { .. } => ErrorKind::BadFormat,
            ZipError::Encrypted
            | ZipError::StrongEncryption
            | ZipError::UnsupportedCompression(_)
            | ZipError::UnsupportedAlgorithm(_) => ErrorKind::Unsupported,
            ZipError::RangeViolation { .. } => ErrorKind::Range,
            ZipError::ChecksumMismatch { .. }
            | ZipError::SizeMismatch { .. }
            | ZipError::Decompression(_) => ErrorKind::Integrity,
            ZipError::Io(_) | ZipError::Source(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn truncated(record: &'static str, needed: usize, available: usize) -> Self {
        ZipError::Truncated {
            record,
            needed: needed as u64,
            available: available as u64,
        }
    }
}

/// Result type for ZIP operations.
pub type Result<T> = std::result::Result<T, ZipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(ZipError::EocdNotFound.kind(), ErrorKind::BadFormat);
        assert_eq!(ZipError::MultiDisk.kind(), ErrorKind::BadFormat);
        assert_eq!(ZipError::UnsupportedCompression(12).kind(), ErrorKind::Unsupported);
        assert_eq!(
            ZipError::RangeViolation { start: 4, end: 2, len: 10 }.kind(),
            ErrorKind::Range
        );
        assert_eq!(
            ZipError::Source(anyhow::anyhow!("connection reset")).kind(),
            ErrorKind::Io
        );
    }

    #[test]
    fn test_signature_message() {
        let err = ZipError::InvalidSignature {
            record: "central directory header",
            expected: 0x02014b50,
            actual: 0,
        };
        assert_eq!(
            err.to_string(),
            "invalid central directory header signature: expected 0x02014b50, got 0x00000000"
        );
    }
}
