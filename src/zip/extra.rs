//! Extra-field tables attached to central directory records.
//!
//! An extra field is a sequence of `(id: u16, len: u16, data[len])` blocks.
//! Ids may repeat; lookups return the first occurrence.

use byteorder::{ByteOrder, LittleEndian};
use bytes::Bytes;

use super::structures::{SENTINEL_U16, SENTINEL_U32};
use crate::error::{Result, ZipError};

/// ZIP64 extended information.
pub const ZIP64_EXTRA_ID: u16 = 0x0001;
/// Info-ZIP Unicode Path.
pub const UNICODE_PATH_EXTRA_ID: u16 = 0x7075;

/// One id-tagged block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraField {
    pub id: u16,
    pub data: Bytes,
}

/// All extra fields of one record, in record order.
#[derive(Debug, Clone, Default)]
pub struct ExtraFields {
    fields: Vec<ExtraField>,
}

impl ExtraFields {
    /// Split the raw extra-field bytes into blocks.
    ///
    /// Fewer than four trailing bytes are padding and ignored; a block whose
    /// declared length runs past the end is a format error.
    pub fn parse(raw: &Bytes) -> Result<Self> {
        let mut fields = Vec::new();
        let mut pos = 0;

        while raw.len() - pos >= 4 {
            let id = u16::from_le_bytes([raw[pos], raw[pos + 1]]);
            let len = u16::from_le_bytes([raw[pos + 2], raw[pos + 3]]) as usize;
            let start = pos + 4;
            if start + len > raw.len() {
                return Err(ZipError::truncated("extra field", len, raw.len() - start));
            }
            fields.push(ExtraField {
                id,
                data: raw.slice(start..start + len),
            });
            pos = start + len;
        }

        Ok(Self { fields })
    }

    /// Data of the first field with this id.
    pub fn get(&self, id: u16) -> Option<&Bytes> {
        self.fields.iter().find(|f| f.id == id).map(|f| &f.data)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtraField> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Sequential reader over a ZIP64 extra field payload.
///
/// The payload only carries values whose fixed-width counterpart is
/// saturated, in the order uncompressed size, compressed size, local header
/// offset, disk number. Each `resolve_*` call consumes a slot only when the
/// fixed value is the sentinel.
pub(crate) struct Zip64Values<'a> {
    data: Option<&'a [u8]>,
}

impl<'a> Zip64Values<'a> {
    pub(crate) fn new(data: Option<&'a [u8]>) -> Self {
        Self { data }
    }

    pub(crate) fn resolve_u64(&mut self, fixed: u32) -> Result<u64> {
        if fixed != SENTINEL_U32 {
            return Ok(fixed as u64);
        }
        Ok(self.take(8)?.map_or(fixed as u64, LittleEndian::read_u64))
    }

    pub(crate) fn resolve_disk(&mut self, fixed: u16) -> Result<u32> {
        if fixed != SENTINEL_U16 {
            return Ok(fixed as u32);
        }
        Ok(self.take(4)?.map_or(fixed as u32, LittleEndian::read_u32))
    }

    // Without a ZIP64 field the all-ones value is taken literally.
    fn take(&mut self, n: usize) -> Result<Option<&'a [u8]>> {
        let Some(data) = self.data else {
            return Ok(None);
        };
        if data.len() < n {
            return Err(ZipError::truncated("ZIP64 extra field", n, data.len()));
        }
        let (value, rest) = data.split_at(n);
        self.data = Some(rest);
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(id: u16, data: &[u8]) -> Vec<u8> {
        let mut out = id.to_le_bytes().to_vec();
        out.extend_from_slice(&(data.len() as u16).to_le_bytes());
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_parse_and_first_occurrence() {
        let mut raw = block(0x5455, &[1, 2, 3, 4, 5]);
        raw.extend(block(0x7075, b"first"));
        raw.extend(block(0x7075, b"second"));
        raw.extend([0, 0]); // padding

        let fields = ExtraFields::parse(&Bytes::from(raw)).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(&fields.get(0x7075).unwrap()[..], b"first");
        assert!(fields.get(ZIP64_EXTRA_ID).is_none());
    }

    #[test]
    fn test_overlong_block() {
        let mut raw = block(0x0001, &[0; 8]);
        raw[2] = 16;
        assert!(matches!(
            ExtraFields::parse(&Bytes::from(raw)),
            Err(ZipError::Truncated { .. })
        ));
    }

    #[test]
    fn test_zip64_consumes_only_saturated_fields() {
        // Only compressed size and offset are saturated.
        let mut payload = 7_000_000_000u64.to_le_bytes().to_vec();
        payload.extend(9_000_000_000u64.to_le_bytes());
        let mut values = Zip64Values::new(Some(&payload[..]));

        assert_eq!(values.resolve_u64(10).unwrap(), 10);
        assert_eq!(values.resolve_u64(u32::MAX).unwrap(), 7_000_000_000);
        assert_eq!(values.resolve_u64(u32::MAX).unwrap(), 9_000_000_000);
        assert_eq!(values.resolve_disk(0).unwrap(), 0);
    }

    #[test]
    fn test_zip64_short_payload() {
        let payload = [0u8; 4];
        let mut values = Zip64Values::new(Some(&payload[..]));
        assert!(values.resolve_u64(u32::MAX).is_err());
    }

    #[test]
    fn test_sentinel_without_zip64_field() {
        let mut values = Zip64Values::new(None);
        assert_eq!(values.resolve_u64(u32::MAX).unwrap(), u32::MAX as u64);
    }
}
