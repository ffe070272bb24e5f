//! One central directory record.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::trace;

use crate::config::ReaderOptions;
use crate::error::{Result, ZipError};
use crate::io::{ByteRange, ReadAt};

use super::cp437;
use super::extra::{ExtraFields, UNICODE_PATH_EXTRA_ID, ZIP64_EXTRA_ID, Zip64Values};
use super::stream::ContentStream;
use super::structures::{
    CentralDirectoryHeader, CompressionMethod, DOS_DIRECTORY_ATTRIBUTE, FLAG_ENCRYPTED,
    FLAG_STRONG_ENCRYPTION, FLAG_UTF8, LocalFileHeader,
};

/// Metadata view over a central directory record, plus access to its data.
///
/// Built from a slice of the already-fetched directory; reading the record
/// never performs I/O. Only [`data_range`](Self::data_range) and the
/// content accessors touch the source.
pub struct Entry<R: ReadAt> {
    reader: Arc<R>,
    options: ReaderOptions,
    header: CentralDirectoryHeader,
    record: Bytes,
    extra: ExtraFields,
    size: u64,
    compressed_size: u64,
    local_header_offset: u64,
    disk_number_start: u32,
}

impl<R: ReadAt> Entry<R> {
    /// Parse one record. `record` must start at the record signature and may
    /// extend past it; the returned entry keeps only its own span.
    pub(crate) fn parse(reader: Arc<R>, options: ReaderOptions, record: Bytes) -> Result<Self> {
        let header = CentralDirectoryHeader::from_bytes(&record)?;
        let len = header.record_len();
        if len > record.len() {
            return Err(ZipError::truncated("central directory record", len, record.len()));
        }
        let record = record.slice(..len);

        let extra_start = CentralDirectoryHeader::SIZE + header.file_name_length as usize;
        let extra_end = extra_start + header.extra_field_length as usize;
        let extra = ExtraFields::parse(&record.slice(extra_start..extra_end))?;

        let mut zip64 = Zip64Values::new(extra.get(ZIP64_EXTRA_ID).map(|data| &data[..]));
        let size = zip64.resolve_u64(header.uncompressed_size)?;
        let compressed_size = zip64.resolve_u64(header.compressed_size)?;
        let local_header_offset = zip64.resolve_u64(header.lfh_offset)?;
        let disk_number_start = zip64.resolve_disk(header.disk_number_start)?;

        Ok(Self {
            reader,
            options,
            header,
            record,
            extra,
            size,
            compressed_size,
            local_header_offset,
            disk_number_start,
        })
    }

    /// Decoded entry name.
    ///
    /// Prefers a valid Info-ZIP Unicode Path field, then the raw name as
    /// UTF-8 (flag bit 11) or code page 437. Backslashes become `/` unless
    /// [`ReaderOptions::strict_names`] is set.
    pub fn name(&self) -> Result<String> {
        if self.header.flags & FLAG_STRONG_ENCRYPTION != 0 {
            return Err(ZipError::StrongEncryption);
        }
        let name = self
            .unicode_path()
            .unwrap_or_else(|| self.decode_text(self.raw_name()));
        if self.options.strict_names {
            Ok(name)
        } else {
            Ok(name.replace('\\', "/"))
        }
    }

    /// Name from the Unicode Path extra field, if it still matches the raw name.
    fn unicode_path(&self) -> Option<String> {
        let data = self.extra.get(UNICODE_PATH_EXTRA_ID)?;
        if data.len() < 5 || data[0] != 1 {
            return None;
        }
        let recorded = u32::from_le_bytes([data[1], data[2], data[3], data[4]]);
        if recorded != crc32fast::hash(self.raw_name()) {
            trace!(recorded, "ignoring stale unicode path field");
            return None;
        }
        Some(String::from_utf8_lossy(&data[5..]).into_owned())
    }

    fn decode_text(&self, raw: &[u8]) -> String {
        if self.is_utf8() {
            String::from_utf8_lossy(raw).into_owned()
        } else {
            cp437::decode(raw)
        }
    }

    /// Entry comment, decoded like the name.
    pub fn comment(&self) -> String {
        self.decode_text(self.raw_comment())
    }

    pub fn raw_name(&self) -> &[u8] {
        let start = CentralDirectoryHeader::SIZE;
        &self.record[start..start + self.header.file_name_length as usize]
    }

    pub fn raw_extra(&self) -> &[u8] {
        let start = CentralDirectoryHeader::SIZE + self.header.file_name_length as usize;
        &self.record[start..start + self.header.extra_field_length as usize]
    }

    pub fn raw_comment(&self) -> &[u8] {
        let start = self.record.len() - self.header.file_comment_length as usize;
        &self.record[start..]
    }

    pub fn extra_fields(&self) -> &ExtraFields {
        &self.extra
    }

    /// Bytes this record occupies in the central directory.
    pub fn record_len(&self) -> usize {
        self.record.len()
    }

    pub fn version_made_by(&self) -> u16 {
        self.header.version_made_by
    }

    pub fn version_needed(&self) -> u16 {
        self.header.version_needed
    }

    pub fn flags(&self) -> u16 {
        self.header.flags
    }

    pub fn compression_method(&self) -> CompressionMethod {
        CompressionMethod::from_u16(self.header.compression_method)
    }

    pub fn crc32(&self) -> u32 {
        self.header.crc32
    }

    /// Uncompressed size, ZIP64 resolved.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Compressed size, ZIP64 resolved.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// Offset of the local file header, ZIP64 resolved.
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    pub fn disk_number_start(&self) -> u32 {
        self.disk_number_start
    }

    pub fn internal_attributes(&self) -> u16 {
        self.header.internal_attributes
    }

    pub fn external_attributes(&self) -> u32 {
        self.header.external_attributes
    }

    pub fn last_mod_time(&self) -> u16 {
        self.header.last_mod_time
    }

    pub fn last_mod_date(&self) -> u16 {
        self.header.last_mod_date
    }

    /// Modification date as (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let date = self.header.last_mod_date;
        let day = (date & 0x1F) as u8;
        let month = ((date >> 5) & 0x0F) as u8;
        let year = ((date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Modification time as (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let time = self.header.last_mod_time;
        let second = ((time & 0x1F) * 2) as u8;
        let minute = ((time >> 5) & 0x3F) as u8;
        let hour = ((time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }

    pub fn is_utf8(&self) -> bool {
        self.header.flags & FLAG_UTF8 != 0
    }

    pub fn is_encrypted(&self) -> bool {
        self.header.flags & FLAG_ENCRYPTED != 0
    }

    /// DOS directory attribute, or an empty entry whose name ends in `/`.
    pub fn is_directory(&self) -> bool {
        self.header.external_attributes & DOS_DIRECTORY_ATTRIBUTE != 0
            || (self.size == 0 && self.raw_name().ends_with(b"/"))
    }

    /// Locate the compressed bytes through the local file header.
    ///
    /// Costs one 30-byte read.
    pub async fn data_range(&self) -> Result<ByteRange<R>> {
        let file_size = self.reader.size();
        let lfh_offset = self.local_header_offset;
        let fits = lfh_offset
            .checked_add(LocalFileHeader::SIZE as u64)
            .is_some_and(|end| end <= file_size);
        if !fits {
            return Err(ZipError::OutOfBounds {
                what: "local file header",
                offset: lfh_offset,
                size: LocalFileHeader::SIZE as u64,
                file_size,
            });
        }

        let mut buf = [0u8; LocalFileHeader::SIZE];
        self.reader.read_exact_at(lfh_offset, &mut buf).await?;
        let lfh = LocalFileHeader::from_bytes(&buf)?;

        let start = lfh_offset + lfh.data_offset();
        let fits = start
            .checked_add(self.compressed_size)
            .is_some_and(|end| end <= file_size);
        if !fits {
            return Err(ZipError::OutOfBounds {
                what: "entry data",
                offset: start,
                size: self.compressed_size,
                file_size,
            });
        }
        ByteRange::new(Arc::clone(&self.reader), start, start + self.compressed_size)
    }

    /// `[start, end)` of the compressed bytes, relative to the data start.
    pub async fn raw_range(&self, start: u64, end: u64) -> Result<ByteRange<R>> {
        if end < start || end > self.compressed_size {
            return Err(ZipError::RangeViolation {
                start,
                end,
                len: self.compressed_size,
            });
        }
        let data = self.data_range().await?;
        ByteRange::new(Arc::clone(&self.reader), data.start() + start, data.start() + end)
    }

    fn check_readable(&self) -> Result<()> {
        if self.is_encrypted() {
            return Err(ZipError::Encrypted);
        }
        if let CompressionMethod::Unknown(method) = self.compression_method() {
            return Err(ZipError::UnsupportedCompression(method));
        }
        Ok(())
    }

    /// Stream the uncompressed content.
    pub async fn content(&self) -> Result<ContentStream<R>> {
        self.check_readable()?;
        let data = self.data_range().await?;
        ContentStream::new(
            data,
            self.compression_method(),
            self.header.crc32,
            self.size,
            &self.options,
        )
    }

    /// Whole uncompressed content in memory.
    pub async fn bytes(&self) -> Result<Bytes> {
        self.content().await?.read_to_end().await
    }

    /// Whole content as text, replacing invalid UTF-8.
    pub async fn text(&self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl<R: ReadAt> Clone for Entry<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            options: self.options,
            header: self.header,
            record: self.record.clone(),
            extra: self.extra.clone(),
            size: self.size,
            compressed_size: self.compressed_size,
            local_header_offset: self.local_header_offset,
            disk_number_start: self.disk_number_start,
        }
    }
}

impl<R: ReadAt> fmt::Debug for Entry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("name", &String::from_utf8_lossy(self.raw_name()))
            .field("method", &self.compression_method())
            .field("size", &self.size)
            .field("compressed_size", &self.compressed_size)
            .field("crc32", &format_args!("{:#010x}", self.header.crc32))
            .field("local_header_offset", &self.local_header_offset)
            .finish()
    }
}
