//! Linear walk over the CBFS file table.
//!
//! Records start at `top - romsize + header.offset` and follow each other at
//! `align_up(record.offset + record.len, header.align)` strides until a record without the
//! `LARCHIVE` magic (the usual end-of-table marker, typically erased flash), a tail too short to
//! hold a magic, or the top of the ROM.

use crate::file::{
    decode_name, decode_record, file_type_name, peek_magic, FileName, FileRecord, FILE_MAGIC,
};
use crate::header::{locate_header, CbfsHeader, LocatedHeader};
use crate::phys::PhysicalMemory;
use crate::util::align_up_pow2;
use crate::view::RomView;
use crate::{CbfsError, Result};

/// The mapped file table of a located CBFS.
#[derive(Debug)]
pub struct FileTable {
    header: LocatedHeader,
    view: RomView,
}

impl FileTable {
    /// Locates the header below `top` and maps the file table it describes.
    pub fn locate<M: PhysicalMemory + ?Sized>(mem: &M, top: u64) -> Result<Self> {
        let header = locate_header(mem, top)?;
        Self::open(mem, header, top)
    }

    /// Maps the file table described by an already located header.
    pub fn open<M: PhysicalMemory + ?Sized>(
        mem: &M,
        header: LocatedHeader,
        top: u64,
    ) -> Result<Self> {
        let align = header.header.align;
        if align == 0 || !align.is_power_of_two() {
            return Err(CbfsError::InvalidAlignment { align });
        }

        let (start, end) = header.header.table_region(top)?;
        let len = usize::try_from(end - start).map_err(|_| CbfsError::AddressOverflow)?;
        let view = mem.map(start, len)?;
        Ok(Self { header, view })
    }

    pub fn header(&self) -> &CbfsHeader {
        &self.header.header
    }

    pub fn header_address(&self) -> u64 {
        self.header.address
    }

    /// Physical address of the first record.
    pub fn start(&self) -> u64 {
        self.view.base()
    }

    /// Exclusive end of the ROM.
    pub fn end(&self) -> u64 {
        self.view.end()
    }

    pub fn view(&self) -> &RomView {
        &self.view
    }

    pub fn files(&self) -> Files<'_> {
        Files {
            view: &self.view,
            cursor: Cursor {
                address: self.view.base(),
                index: 0,
            },
            align: u64::from(self.header.header.align),
            done: false,
        }
    }

    /// Payload bytes of `entry`, or [`CbfsError::TruncatedFile`] if they run past the ROM end.
    pub fn data(&self, entry: &FileEntry<'_>) -> Result<&[u8]> {
        let data_start = entry.data_start();
        let truncated = || CbfsError::TruncatedFile {
            name: entry.name.to_string(),
            data_start,
            len: entry.record.len,
            end: self.end(),
        };
        let data_end = data_start
            .checked_add(u64::from(entry.record.len))
            .ok_or_else(truncated)?;
        if data_end > self.end() {
            return Err(truncated());
        }
        let index = (data_start - self.start()) as usize;
        self.view.bytes(index, entry.record.len as usize)
    }
}

/// Position of the walk: a physical address and the matching index into the view.
///
/// Both halves always move by the same increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    address: u64,
    index: usize,
}

impl Cursor {
    fn advance(&mut self, inc: u64) {
        self.address = self.address.saturating_add(inc);
        self.index = usize::try_from(inc)
            .ok()
            .and_then(|inc| self.index.checked_add(inc))
            .unwrap_or(usize::MAX);
    }
}

/// One decoded record of the file table.
#[derive(Debug, Clone, Copy)]
pub struct FileEntry<'a> {
    /// Physical address of the record header.
    pub address: u64,
    pub record: FileRecord,
    pub name: FileName<'a>,
}

impl FileEntry<'_> {
    /// Physical address of the first payload byte.
    pub fn data_start(&self) -> u64 {
        self.address + u64::from(self.record.offset)
    }
}

/// Iterator over the records of a [`FileTable`].
///
/// Yields at most one error, after which the walk is over.
#[derive(Debug)]
pub struct Files<'a> {
    view: &'a RomView,
    cursor: Cursor,
    align: u64,
    done: bool,
}

impl<'a> Files<'a> {
    fn step(&mut self) -> Result<Option<FileEntry<'a>>> {
        if self.cursor.address >= self.view.end() {
            return Ok(None);
        }

        let address = self.cursor.address;
        tracing::debug!("Potential CBFS File Offset: 0x{address:x}");

        let index = self.cursor.index;
        let Some(magic) = peek_magic(self.view, index) else {
            tracing::debug!("No room for a record below 0x{:x}", self.view.end());
            return Ok(None);
        };
        tracing::debug!("File magic             : {}", String::from_utf8_lossy(&magic));
        if magic != FILE_MAGIC {
            return Ok(None);
        }

        let record = decode_record(self.view, index)?;
        tracing::debug!("File len               : {:x}", record.len);
        tracing::debug!(
            "File type              : {:x} ({})",
            record.file_type,
            file_type_name(record.file_type).unwrap_or("unknown")
        );
        tracing::debug!("File attributes_offset : {:x}", record.attributes_offset);
        tracing::debug!("File offset            : {:x}", record.offset);

        let name = decode_name(self.view, index, &record)?;
        tracing::debug!("File name              : '{name}'");

        let inc = align_up_pow2(record.extent(), self.align)?;
        self.cursor.advance(inc);
        tracing::trace!("File Off+Len    : {:x}", record.extent());
        tracing::trace!("Align           : {:x}", self.align);
        tracing::trace!("Inc             : {inc:x}");
        tracing::trace!("Next file off   : {:x}", self.cursor.address);

        Ok(Some(FileEntry {
            address,
            record,
            name,
        }))
    }
}

impl<'a> Iterator for Files<'a> {
    type Item = Result<FileEntry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.step() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
