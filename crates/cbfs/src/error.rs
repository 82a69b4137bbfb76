use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CbfsError>;

/// Errors surfaced while locating, walking or extracting from a CBFS image.
///
/// Every variant is fatal for the command-line tool: nothing is retried, since physical memory
/// reads are deterministic for the lifetime of the process.
#[derive(Debug, Error)]
pub enum CbfsError {
    /// The footer pointer led to an address whose magic is not the CBFS header magic.
    #[error("failed to find valid header at 0x{address:x} (magic 0x{magic:08x})")]
    HeaderNotFound { address: u64, magic: u32 },

    /// The header declares an alignment the walker cannot step with.
    #[error("invalid CBFS alignment 0x{align:x} (expected a non-zero power of two)")]
    InvalidAlignment { align: u32 },

    /// The header places the start of the file table outside the addressable space.
    #[error("invalid CBFS region: romsize=0x{romsize:x} offset=0x{offset:x}")]
    InvalidRegion { romsize: u32, offset: u32 },

    /// A record's header length is shorter than the fixed record header.
    #[error("invalid CBFS file record at 0x{address:x}: offset 0x{offset:x} is smaller than the record header")]
    InvalidRecordOffset { address: u64, offset: u32 },

    /// A fixed-size read would run past the end of the mapped view.
    #[error("out of bounds: offset={offset} len={len} size={size}")]
    OutOfBounds { offset: u64, len: usize, size: u64 },

    /// The accessor was asked for bytes it does not back.
    #[error("physical range not backed: paddr=0x{paddr:x} len={len}")]
    PhysRange { paddr: u64, len: usize },

    #[error("integer overflow while computing addresses")]
    AddressOverflow,

    /// The matched file's payload would extend past the end of the ROM.
    #[error("file '{name}' offset/length extends beyond ROM: data=0x{data_start:x} len=0x{len:x} end=0x{end:x}")]
    TruncatedFile {
        name: String,
        data_start: u64,
        len: u32,
        end: u64,
    },

    #[error("failed to write file to output: {0}")]
    WriteFailure(io::Error),

    #[error("failed to find CBFS file named '{name}'")]
    TargetNotFound { name: String },

    /// Generic I/O failure from a memory backend.
    #[error("{context}: {error}")]
    Io { context: String, error: io::Error },
}
