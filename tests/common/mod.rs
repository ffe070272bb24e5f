//! Archive builder for tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::Arc;

use flate2::Compression;
use flate2::write::DeflateEncoder;
use lazyzip::MemoryReader;

/// 2020-01-01 in DOS date format.
pub const DOS_DATE: u16 = (40 << 9) | (1 << 5) | 1;
/// 12:34:56 in DOS time format.
pub const DOS_TIME: u16 = (12 << 11) | (34 << 5) | 28;

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Info-ZIP Unicode Path extra field (0x7075).
pub fn unicode_path_extra(version: u8, name_crc: u32, name: &str) -> Vec<u8> {
    let mut payload = vec![version];
    payload.extend(name_crc.to_le_bytes());
    payload.extend(name.as_bytes());
    extra_block(0x7075, &payload)
}

pub fn extra_block(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_le_bytes().to_vec();
    out.extend((payload.len() as u16).to_le_bytes());
    out.extend(payload);
    out
}

#[derive(Clone)]
pub struct TestEntry {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
    pub method: u16,
    pub flags: u16,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
    pub external_attributes: u32,
    pub crc: Option<u32>,
    pub zip64_size: bool,
}

impl TestEntry {
    pub fn stored(name: &str, data: &[u8]) -> Self {
        Self {
            name: name.as_bytes().to_vec(),
            data: data.to_vec(),
            method: 0,
            flags: 0,
            extra: Vec::new(),
            comment: Vec::new(),
            external_attributes: 0,
            crc: None,
            zip64_size: false,
        }
    }

    pub fn deflated(name: &str, data: &[u8]) -> Self {
        Self {
            method: 8,
            ..Self::stored(name, data)
        }
    }

    pub fn raw_name(mut self, name: &[u8]) -> Self {
        self.name = name.to_vec();
        self
    }

    pub fn method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    pub fn flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    pub fn extra(mut self, extra: Vec<u8>) -> Self {
        self.extra.extend(extra);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn external_attributes(mut self, attrs: u32) -> Self {
        self.external_attributes = attrs;
        self
    }

    /// Record this CRC-32 instead of the real one.
    pub fn crc(mut self, crc: u32) -> Self {
        self.crc = Some(crc);
        self
    }

    /// Store the uncompressed size as 0xFFFFFFFF plus a ZIP64 extra field.
    pub fn zip64_size(mut self) -> Self {
        self.zip64_size = true;
        self
    }

    fn payload(&self) -> Vec<u8> {
        if self.method == 8 {
            deflate(&self.data)
        } else {
            self.data.clone()
        }
    }
}

pub struct Built {
    pub bytes: Vec<u8>,
    /// Absolute start of each entry's stored bytes.
    pub data_offsets: Vec<usize>,
    /// Stored (possibly compressed) bytes of each entry.
    pub payloads: Vec<Vec<u8>>,
    pub cd_offset: usize,
    pub cd_size: usize,
    pub eocd_offset: usize,
}

impl Built {
    pub fn reader(&self) -> Arc<MemoryReader> {
        Arc::new(MemoryReader::new(self.bytes.clone()))
    }

    /// Overwrite a little-endian u16 in the EOCD.
    pub fn patch_eocd_u16(&mut self, field: usize, value: u16) {
        let at = self.eocd_offset + field;
        self.bytes[at..at + 2].copy_from_slice(&value.to_le_bytes());
    }

    /// Overwrite a little-endian u32 in the EOCD.
    pub fn patch_eocd_u32(&mut self, field: usize, value: u32) {
        let at = self.eocd_offset + field;
        self.bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<TestEntry>,
    comment: Vec<u8>,
    zip64: bool,
    disk_number: u16,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry: TestEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// Write ZIP64 end records and saturate the EOCD fields.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn disk_number(mut self, disk: u16) -> Self {
        self.disk_number = disk;
        self
    }

    pub fn build(&self) -> Built {
        let mut out = Vec::new();
        let mut cd = Vec::new();
        let mut data_offsets = Vec::new();
        let mut payloads = Vec::new();

        for entry in &self.entries {
            let payload = entry.payload();
            let crc = entry.crc.unwrap_or_else(|| crc32fast::hash(&entry.data));
            let lfh_offset = out.len() as u32;
            // Local extra differs from the central one on purpose.
            let local_extra = extra_block(0xCAFE, &[1, 2, 3]);

            out.extend(0x04034b50u32.to_le_bytes());
            out.extend(20u16.to_le_bytes());
            out.extend(entry.flags.to_le_bytes());
            out.extend(entry.method.to_le_bytes());
            out.extend(DOS_TIME.to_le_bytes());
            out.extend(DOS_DATE.to_le_bytes());
            out.extend(crc.to_le_bytes());
            out.extend((payload.len() as u32).to_le_bytes());
            out.extend((entry.data.len() as u32).to_le_bytes());
            out.extend((entry.name.len() as u16).to_le_bytes());
            out.extend((local_extra.len() as u16).to_le_bytes());
            out.extend(&entry.name);
            out.extend(&local_extra);
            data_offsets.push(out.len());
            out.extend(&payload);

            let mut extra = Vec::new();
            let uncompressed = if entry.zip64_size {
                extra.extend(extra_block(0x0001, &(entry.data.len() as u64).to_le_bytes()));
                u32::MAX
            } else {
                entry.data.len() as u32
            };
            extra.extend(&entry.extra);

            cd.extend(0x02014b50u32.to_le_bytes());
            cd.extend(0x031Eu16.to_le_bytes());
            cd.extend(20u16.to_le_bytes());
            cd.extend(entry.flags.to_le_bytes());
            cd.extend(entry.method.to_le_bytes());
            cd.extend(DOS_TIME.to_le_bytes());
            cd.extend(DOS_DATE.to_le_bytes());
            cd.extend(crc.to_le_bytes());
            cd.extend((payload.len() as u32).to_le_bytes());
            cd.extend(uncompressed.to_le_bytes());
            cd.extend((entry.name.len() as u16).to_le_bytes());
            cd.extend((extra.len() as u16).to_le_bytes());
            cd.extend((entry.comment.len() as u16).to_le_bytes());
            cd.extend(0u16.to_le_bytes());
            cd.extend(0u16.to_le_bytes());
            cd.extend(entry.external_attributes.to_le_bytes());
            cd.extend(lfh_offset.to_le_bytes());
            cd.extend(&entry.name);
            cd.extend(&extra);
            cd.extend(&entry.comment);

            payloads.push(payload);
        }

        let cd_offset = out.len();
        let cd_size = cd.len();
        let count = self.entries.len();
        out.extend(&cd);

        if self.zip64 {
            let eocd64_offset = out.len() as u64;
            out.extend(0x06064b50u32.to_le_bytes());
            out.extend(44u64.to_le_bytes());
            out.extend(45u16.to_le_bytes());
            out.extend(45u16.to_le_bytes());
            out.extend(0u32.to_le_bytes());
            out.extend(0u32.to_le_bytes());
            out.extend((count as u64).to_le_bytes());
            out.extend((count as u64).to_le_bytes());
            out.extend((cd_size as u64).to_le_bytes());
            out.extend((cd_offset as u64).to_le_bytes());

            out.extend(0x07064b50u32.to_le_bytes());
            out.extend(0u32.to_le_bytes());
            out.extend(eocd64_offset.to_le_bytes());
            out.extend(1u32.to_le_bytes());
        }

        let eocd_offset = out.len();
        out.extend(0x06054b50u32.to_le_bytes());
        out.extend(self.disk_number.to_le_bytes());
        out.extend(self.disk_number.to_le_bytes());
        if self.zip64 {
            out.extend(u16::MAX.to_le_bytes());
            out.extend(u16::MAX.to_le_bytes());
            out.extend(u32::MAX.to_le_bytes());
            out.extend(u32::MAX.to_le_bytes());
        } else {
            out.extend((count as u16).to_le_bytes());
            out.extend((count as u16).to_le_bytes());
            out.extend((cd_size as u32).to_le_bytes());
            out.extend((cd_offset as u32).to_le_bytes());
        }
        out.extend((self.comment.len() as u16).to_le_bytes());
        out.extend(&self.comment);

        Built {
            bytes: out,
            data_offsets,
            payloads,
            cd_offset,
            cd_size,
            eocd_offset,
        }
    }
}
