//! CBFS file records.
//!
//! Each record is a 24-byte fixed header followed by a NUL-terminated name and then the payload:
//!
//! ```text
//! 0x00  magic              "LARCHIVE"
//! 0x08  len                u32 BE, payload length
//! 0x0c  type               u32 BE
//! 0x10  attributes_offset  u32 BE
//! 0x14  offset             u32 BE, record start to payload start
//! 0x18  name               offset - 0x18 bytes, NUL padded
//! ```

use std::fmt;

use crate::util::be_u32;
use crate::view::RomView;
use crate::{CbfsError, Result};

pub const FILE_MAGIC: [u8; 8] = *b"LARCHIVE";
pub const FILE_HEADER_SIZE: usize = 24;

pub const TYPE_DELETED: u32 = 0x0000_0000;
pub const TYPE_BOOTBLOCK: u32 = 0x0000_0001;
pub const TYPE_CBFSHEADER: u32 = 0x0000_0002;
pub const TYPE_STAGE: u32 = 0x0000_0010;
pub const TYPE_PAYLOAD: u32 = 0x0000_0020;
pub const TYPE_FIT: u32 = 0x0000_0021;
pub const TYPE_OPTIONROM: u32 = 0x0000_0030;
pub const TYPE_BOOTSPLASH: u32 = 0x0000_0040;
pub const TYPE_RAW: u32 = 0x0000_0050;
pub const TYPE_VSA: u32 = 0x0000_0051;
pub const TYPE_MBI: u32 = 0x0000_0052;
pub const TYPE_MICROCODE: u32 = 0x0000_0053;
pub const TYPE_FSP: u32 = 0x0000_0060;
pub const TYPE_MRC: u32 = 0x0000_0061;
pub const TYPE_MMA: u32 = 0x0000_0062;
pub const TYPE_EFI: u32 = 0x0000_0063;
pub const TYPE_STRUCT: u32 = 0x0000_0070;
pub const TYPE_CMOS_DEFAULT: u32 = 0x0000_00aa;
pub const TYPE_SPD: u32 = 0x0000_00ab;
pub const TYPE_MRC_CACHE: u32 = 0x0000_00ac;
pub const TYPE_CMOS_LAYOUT: u32 = 0x0000_01aa;
pub const TYPE_NULL: u32 = 0xffff_ffff;

/// Human-readable name of a well-known coreboot file type tag.
pub fn file_type_name(file_type: u32) -> Option<&'static str> {
    Some(match file_type {
        TYPE_DELETED => "deleted",
        TYPE_BOOTBLOCK => "bootblock",
        TYPE_CBFSHEADER => "cbfs header",
        TYPE_STAGE => "stage",
        TYPE_PAYLOAD => "payload",
        TYPE_FIT => "fit",
        TYPE_OPTIONROM => "optionrom",
        TYPE_BOOTSPLASH => "bootsplash",
        TYPE_RAW => "raw",
        TYPE_VSA => "vsa",
        TYPE_MBI => "mbi",
        TYPE_MICROCODE => "microcode",
        TYPE_FSP => "fsp",
        TYPE_MRC => "mrc",
        TYPE_MMA => "mma",
        TYPE_EFI => "efi",
        TYPE_STRUCT => "struct",
        TYPE_CMOS_DEFAULT => "cmos_default",
        TYPE_SPD => "spd",
        TYPE_MRC_CACHE => "mrc_cache",
        TYPE_CMOS_LAYOUT => "cmos_layout",
        TYPE_NULL => "null",
        _ => return None,
    })
}

/// Fixed part of a file record, decoded to host byte order. The magic is kept raw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRecord {
    pub magic: [u8; 8],
    pub len: u32,
    pub file_type: u32,
    pub attributes_offset: u32,
    pub offset: u32,
}

impl FileRecord {
    pub fn decode(bytes: &[u8; FILE_HEADER_SIZE]) -> Self {
        let mut magic = [0u8; 8];
        magic.copy_from_slice(&bytes[..8]);
        Self {
            magic,
            len: be_u32(bytes, 8),
            file_type: be_u32(bytes, 12),
            attributes_offset: be_u32(bytes, 16),
            offset: be_u32(bytes, 20),
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == FILE_MAGIC
    }

    /// Bytes reserved for the name between the fixed header and the payload.
    pub fn name_capacity(&self) -> Option<usize> {
        (self.offset as usize).checked_sub(FILE_HEADER_SIZE)
    }

    /// Distance from the record start to the end of its payload.
    pub fn extent(&self) -> u64 {
        u64::from(self.offset) + u64::from(self.len)
    }
}

/// A record name, bounded to the record's declared name capacity.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileName<'a> {
    raw: &'a [u8],
}

impl<'a> FileName<'a> {
    pub fn new(raw: &'a [u8]) -> Self {
        Self { raw }
    }

    pub fn capacity(&self) -> usize {
        self.raw.len()
    }

    /// Name bytes up to (not including) the first NUL, or the whole buffer if unterminated.
    pub fn as_bytes(&self) -> &'a [u8] {
        let end = self
            .raw
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.raw.len());
        &self.raw[..end]
    }

    /// `strncmp(name, target, capacity) == 0`.
    ///
    /// The comparison length comes from this record's name capacity, not from `target`: a
    /// target longer than the capacity matches on its prefix, and a zero-capacity name matches
    /// any target.
    pub fn matches(&self, target: &[u8]) -> bool {
        for (i, &a) in self.raw.iter().enumerate() {
            let b = target.get(i).copied().unwrap_or(0);
            if a != b {
                return false;
            }
            if a == 0 {
                return true;
            }
        }
        true
    }
}

impl fmt::Display for FileName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for FileName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(self.as_bytes()))
    }
}

/// Returns the eight magic bytes at `index`, or `None` when fewer remain before the end of
/// `view`. No record can start in such a tail.
pub fn peek_magic(view: &RomView, index: usize) -> Option<[u8; 8]> {
    view.array::<8>(index).ok()
}

/// Decodes the fixed record header at `index` within `view`.
pub fn decode_record(view: &RomView, index: usize) -> Result<FileRecord> {
    let raw = view.array::<FILE_HEADER_SIZE>(index)?;
    Ok(FileRecord::decode(&raw))
}

/// Returns the name buffer that follows the record header at `index`.
pub fn decode_name<'v>(view: &'v RomView, index: usize, record: &FileRecord) -> Result<FileName<'v>> {
    let address = view.base() + index as u64;
    let capacity = record
        .name_capacity()
        .ok_or(CbfsError::InvalidRecordOffset {
            address,
            offset: record.offset,
        })?;
    let name_start = index
        .checked_add(FILE_HEADER_SIZE)
        .ok_or(CbfsError::AddressOverflow)?;
    Ok(FileName::new(view.bytes(name_start, capacity)?))
}
