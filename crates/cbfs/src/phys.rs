//! Read-only access to the physical address space that holds the boot ROM.
//!
//! On x86 the boot flash is decoded immediately below 4GiB, so the last byte of the ROM lives at
//! [`TOP_OF_SPACE`] - 1. Two backends are provided:
//!
//! - [`DevMem`]: short-lived read-only mappings of `/dev/mem` (needs root, unix only)
//! - [`RomImage`]: a ROM image held in memory and placed so it ends at the top of the space

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::util::checked_range;
use crate::view::RomView;
use crate::{CbfsError, Result};

/// Exclusive end of the 32-bit physical address space (4GiB).
pub const TOP_OF_SPACE: u64 = 0x1_0000_0000;

/// Default device node for physical memory.
pub const DEV_MEM_PATH: &str = "/dev/mem";

/// Blocking, read-only view of a flat physical address space.
pub trait PhysicalMemory {
    /// Reads `dst.len()` bytes starting at physical address `paddr`.
    fn read_into(&self, paddr: u64, dst: &mut [u8]) -> Result<()>;

    fn read(&self, paddr: u64, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.try_reserve_exact(len).map_err(|_| CbfsError::Io {
            context: format!("allocate {len}-byte buffer for 0x{paddr:x}"),
            error: io::Error::from(io::ErrorKind::OutOfMemory),
        })?;
        buf.resize(len, 0);
        self.read_into(paddr, &mut buf)?;
        Ok(buf)
    }

    /// Acquires a read-only view of `[paddr, paddr + len)`.
    fn map(&self, paddr: u64, len: usize) -> Result<RomView> {
        let bytes = self.read(paddr, len)?;
        Ok(RomView::new(paddr, bytes))
    }
}

/// Physical memory read through the kernel's `/dev/mem` device.
#[derive(Debug)]
pub struct DevMem {
    file: File,
    path: PathBuf,
}

impl DevMem {
    pub fn open() -> Result<Self> {
        Self::open_path(DEV_MEM_PATH)
    }

    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|error| CbfsError::Io {
            context: format!("open {}", path.display()),
            error,
        })?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }
}

impl DevMem {
    /// Rejects ranges past the end of a plain file; touching such a mapping raises `SIGBUS`.
    /// Device nodes report no length and are left to the kernel.
    #[cfg(unix)]
    fn check_extent(&self, paddr: u64, len: usize) -> io::Result<()> {
        let meta = self.file.metadata()?;
        if meta.is_file() && checked_range(paddr, len, meta.len()).is_err() {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }
        Ok(())
    }
}

impl PhysicalMemory for DevMem {
    /// Maps `[paddr, paddr + len)` read-only and copies it out.
    ///
    /// `read(2)` on `/dev/mem` stops at the top of RAM, so the flash window below 4GiB is only
    /// reachable through `mmap`.
    #[cfg(unix)]
    #[allow(unsafe_code)]
    fn read_into(&self, paddr: u64, dst: &mut [u8]) -> Result<()> {
        tracing::trace!("map physical 0x{paddr:x} len=0x{:x}", dst.len());
        if dst.is_empty() {
            return Ok(());
        }

        let io_err = |error: io::Error| CbfsError::Io {
            context: format!("map {} at 0x{paddr:x}", self.path.display()),
            error,
        };
        self.check_extent(paddr, dst.len()).map_err(io_err)?;

        // SAFETY: the mapping is read-only, private to this call and unmapped before returning.
        // Plain files are range-checked above; `/dev/mem` cannot be truncated.
        let map = unsafe {
            memmap2::MmapOptions::new()
                .offset(paddr)
                .len(dst.len())
                .map(&self.file)
        }
        .map_err(io_err)?;
        dst.copy_from_slice(&map[..]);
        Ok(())
    }

    #[cfg(not(unix))]
    fn read_into(&self, paddr: u64, _dst: &mut [u8]) -> Result<()> {
        Err(CbfsError::Io {
            context: format!("map {} at 0x{paddr:x}", self.path.display()),
            error: io::Error::from(io::ErrorKind::Unsupported),
        })
    }
}

/// A ROM image held in memory, decoded at `[top - len, top)`.
#[derive(Debug, Clone)]
pub struct RomImage {
    base: u64,
    bytes: Vec<u8>,
}

impl RomImage {
    /// Places `bytes` so that its last byte sits at `top - 1`.
    pub fn new(bytes: Vec<u8>, top: u64) -> Result<Self> {
        let base = top
            .checked_sub(bytes.len() as u64)
            .ok_or(CbfsError::AddressOverflow)?;
        Ok(Self { base, bytes })
    }

    /// Loads a ROM image file and places it below [`TOP_OF_SPACE`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|error| CbfsError::Io {
            context: format!("read ROM image {}", path.display()),
            error,
        })?;
        Self::new(bytes, TOP_OF_SPACE)
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl PhysicalMemory for RomImage {
    fn read_into(&self, paddr: u64, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        let not_backed = CbfsError::PhysRange { paddr, len };
        let Some(offset) = paddr.checked_sub(self.base) else {
            return Err(not_backed);
        };
        if checked_range(offset, len, self.bytes.len() as u64).is_err() {
            return Err(not_backed);
        }
        // In range of a Vec, so the offset fits in usize.
        let start = offset as usize;
        dst.copy_from_slice(&self.bytes[start..start + len]);
        Ok(())
    }
}
