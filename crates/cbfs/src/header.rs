//! CBFS master header and the footer pointer that locates it.
//!
//! The last dword of the address space holds a signed offset, relative to the top of the space,
//! to the master header. That dword is stored in the host's native byte order, while every header
//! field is big-endian.

use crate::phys::PhysicalMemory;
use crate::util::be_u32;
use crate::{CbfsError, Result};

pub const HEADER_MAGIC: u32 = 0x4F52_4243; // "ORBC"
pub const HEADER_VERSION1: u32 = 0x3131_3131;
pub const HEADER_VERSION2: u32 = 0x3131_3132;

/// On-disk size of the master header: seven fields plus one reserved dword.
pub const HEADER_SIZE: usize = 32;
pub const FOOTER_POINTER_SIZE: usize = 4;

/// CBFS master header, decoded to host byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CbfsHeader {
    pub magic: u32,
    pub version: u32,
    pub romsize: u32,
    pub bootblocksize: u32,
    /// File records start on multiples of this (64 on every coreboot build).
    pub align: u32,
    /// Offset of the first file record from the bottom of the ROM.
    pub offset: u32,
    pub architecture: u32,
    pub reserved: u32,
}

impl CbfsHeader {
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: be_u32(bytes, 0),
            version: be_u32(bytes, 4),
            romsize: be_u32(bytes, 8),
            bootblocksize: be_u32(bytes, 12),
            align: be_u32(bytes, 16),
            offset: be_u32(bytes, 20),
            architecture: be_u32(bytes, 24),
            reserved: be_u32(bytes, 28),
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        self.magic == HEADER_MAGIC
    }

    pub fn version_name(&self) -> Option<&'static str> {
        match self.version {
            HEADER_VERSION1 => Some("v1"),
            HEADER_VERSION2 => Some("v2"),
            _ => None,
        }
    }

    /// File table bounds `[start, end)` for a ROM whose last byte is at `top - 1`.
    pub fn table_region(&self, top: u64) -> Result<(u64, u64)> {
        let start = top
            .checked_sub(u64::from(self.romsize))
            .and_then(|bottom| bottom.checked_add(u64::from(self.offset)))
            .filter(|&start| start <= top)
            .ok_or(CbfsError::InvalidRegion {
                romsize: self.romsize,
                offset: self.offset,
            })?;
        Ok((start, top))
    }
}

/// A validated header together with the physical address it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedHeader {
    pub address: u64,
    pub header: CbfsHeader,
}

/// Reads the native-endian footer pointer stored in the last dword below `top`.
pub fn read_footer_pointer<M: PhysicalMemory + ?Sized>(mem: &M, top: u64) -> Result<i32> {
    let paddr = top
        .checked_sub(FOOTER_POINTER_SIZE as u64)
        .ok_or(CbfsError::AddressOverflow)?;
    tracing::debug!("Seeking to 0x{paddr:x}");

    let mut raw = [0u8; FOOTER_POINTER_SIZE];
    mem.read_into(paddr, &mut raw)?;
    let delta = i32::from_ne_bytes(raw);
    tracing::debug!("Header Offset: {delta}");
    Ok(delta)
}

/// Follows the footer pointer below `top` and validates the header it points at.
pub fn locate_header<M: PhysicalMemory + ?Sized>(mem: &M, top: u64) -> Result<LocatedHeader> {
    let delta = read_footer_pointer(mem, top)?;

    // A corrupt pointer may wrap; the accessor rejects whatever address results.
    let address = top.wrapping_add_signed(i64::from(delta));
    tracing::debug!("Seeking to 0x{address:x}");

    let mut raw = [0u8; HEADER_SIZE];
    mem.read_into(address, &mut raw)?;
    let header = CbfsHeader::decode(&raw);

    tracing::debug!("Header magic          : {:x}", header.magic);
    tracing::debug!(
        "Header version        : {:x} ({})",
        header.version,
        header.version_name().unwrap_or("unknown")
    );
    tracing::debug!("Header ROM size       : {:x}", header.romsize);
    tracing::debug!("Header boot block size: {:x}", header.bootblocksize);
    tracing::debug!("Header align          : {:x}", header.align);
    tracing::debug!("Header offset         : {:x}", header.offset);
    tracing::debug!("Header arch           : {:x}", header.architecture);

    if !header.has_valid_magic() {
        return Err(CbfsError::HeaderNotFound {
            address,
            magic: header.magic,
        });
    }

    Ok(LocatedHeader { address, header })
}
