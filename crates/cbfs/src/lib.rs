#![deny(unsafe_code)]

//! Read-only access to coreboot file system (CBFS) images living in physical memory.
//!
//! A CBFS image sits at the top of the 32-bit physical address space. Reading it takes three
//! steps:
//!
//! - [`locate_header`]: follow the footer pointer in the last dword below [`TOP_OF_SPACE`] to the
//!   master header and check its magic
//! - [`FileTable`]: map `[top - romsize + offset, top)` and walk its alignment-padded records
//! - [`run`]: list record names and/or stream one record's payload to a writer
//!
//! Physical memory is reached through the [`PhysicalMemory`] trait, implemented for `/dev/mem`
//! ([`DevMem`]) and for in-memory ROM dumps ([`RomImage`]).

mod error;
pub mod file;
pub mod header;
mod phys;
mod select;
mod util;
mod view;
mod walk;

pub use error::{CbfsError, Result};
pub use file::{FileName, FileRecord, FILE_HEADER_SIZE, FILE_MAGIC};
pub use header::{locate_header, CbfsHeader, LocatedHeader, HEADER_MAGIC, HEADER_SIZE};
pub use phys::{DevMem, PhysicalMemory, RomImage, DEV_MEM_PATH, TOP_OF_SPACE};
pub use select::{run, OutputSink, Selection, Summary};
pub use util::align_up_pow2;
pub use view::RomView;
pub use walk::{FileEntry, FileTable, Files};

/// Physical address of the footer pointer on x86 (`0xFFFF_FFFC`).
pub const FOOTER_POINTER_ADDRESS: u64 = TOP_OF_SPACE - header::FOOTER_POINTER_SIZE as u64;
