//! Reader configuration.

/// Default number of bytes fetched per range request while streaming content.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Options controlling how entries are decoded and streamed.
///
/// ```
/// use lazyzip::ReaderOptions;
///
/// let options = ReaderOptions::default()
///     .strict_names(true)
///     .verify_checksums(true)
///     .chunk_size(16 * 1024);
/// assert!(options.strict_names);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Keep backslashes in entry names instead of turning them into `/`.
    pub strict_names: bool,
    /// Compare CRC-32 and size of streamed content against the directory record.
    pub verify_checksums: bool,
    /// Bytes per range fetch when streaming entry content.
    pub chunk_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            strict_names: false,
            verify_checksums: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ReaderOptions {
    pub fn strict_names(mut self, strict: bool) -> Self {
        self.strict_names = strict;
        self
    }

    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Set the streaming chunk size. Zero is clamped to one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }
}
