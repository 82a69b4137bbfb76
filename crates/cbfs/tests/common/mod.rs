#![allow(dead_code)]

use cbfs::{RomImage, FILE_HEADER_SIZE, FILE_MAGIC, HEADER_MAGIC, TOP_OF_SPACE};

pub const HEADER_VERSION2: u32 = 0x3131_3132;

pub struct TestFile {
    pub magic: [u8; 8],
    pub name: Vec<u8>,
    pub name_capacity: usize,
    pub file_type: u32,
    pub data: Vec<u8>,
    /// Overrides the `len` field; `data` is still what gets written.
    pub declared_len: Option<u32>,
}

impl TestFile {
    pub fn new(name: &str, file_type: u32, data: &[u8]) -> Self {
        // cbfstool pads the name so the payload starts 16-byte aligned.
        let name_capacity =
            (FILE_HEADER_SIZE + name.len() + 1).next_multiple_of(16) - FILE_HEADER_SIZE;
        Self {
            magic: FILE_MAGIC,
            name: name.as_bytes().to_vec(),
            name_capacity,
            file_type,
            data: data.to_vec(),
            declared_len: None,
        }
    }

    pub fn with_name_capacity(mut self, name_capacity: usize) -> Self {
        self.name_capacity = name_capacity;
        self
    }

    pub fn with_magic(mut self, magic: [u8; 8]) -> Self {
        self.magic = magic;
        self
    }

    pub fn with_declared_len(mut self, len: u32) -> Self {
        self.declared_len = Some(len);
        self
    }

    pub fn offset(&self) -> u32 {
        (FILE_HEADER_SIZE + self.name_capacity) as u32
    }

    pub fn len(&self) -> u32 {
        self.declared_len.unwrap_or(self.data.len() as u32)
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = self.magic.to_vec();
        out.extend_from_slice(&self.len().to_be_bytes());
        out.extend_from_slice(&self.file_type.to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&self.offset().to_be_bytes());
        let mut name = vec![0u8; self.name_capacity];
        let n = self.name.len().min(self.name_capacity);
        name[..n].copy_from_slice(&self.name[..n]);
        out.extend_from_slice(&name);
        out.extend_from_slice(&self.data);
        out
    }
}

/// Builds a ROM image laid out the way coreboot does: header near the bottom, file table from
/// `offset` upwards, footer pointer in the last dword.
pub struct RomBuilder {
    pub romsize: u32,
    pub offset: u32,
    pub align: u32,
    pub header_at: usize,
    pub files: Vec<TestFile>,
}

impl RomBuilder {
    pub fn new(romsize: u32, offset: u32, align: u32) -> Self {
        Self {
            romsize,
            offset,
            align,
            header_at: 0,
            files: Vec::new(),
        }
    }

    pub fn header_at(mut self, header_at: usize) -> Self {
        self.header_at = header_at;
        self
    }

    pub fn file(mut self, file: TestFile) -> Self {
        self.files.push(file);
        self
    }

    /// Image offsets at which each record starts.
    pub fn record_offsets(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.files.len());
        let mut at = self.offset as usize;
        for file in &self.files {
            out.push(at);
            let extent = file.offset() as usize + file.len() as usize;
            at += extent.next_multiple_of(self.align as usize);
        }
        out
    }

    pub fn build(&self) -> Vec<u8> {
        let romsize = self.romsize as usize;
        let mut rom = vec![0xffu8; romsize];

        let header: Vec<u8> = [
            HEADER_MAGIC,
            HEADER_VERSION2,
            self.romsize,
            0x200,
            self.align,
            self.offset,
            0,
            0,
        ]
        .iter()
        .flat_map(|f| f.to_be_bytes())
        .collect();
        rom[self.header_at..self.header_at + header.len()].copy_from_slice(&header);

        for (file, at) in self.files.iter().zip(self.record_offsets()) {
            if at >= romsize - 4 {
                continue;
            }
            let bytes = file.encode();
            let end = (at + bytes.len()).min(romsize - 4);
            rom[at..end].copy_from_slice(&bytes[..end - at]);
        }

        let delta = self.header_at as i32 - romsize as i32;
        rom[romsize - 4..].copy_from_slice(&delta.to_ne_bytes());
        rom
    }

    pub fn image(&self) -> RomImage {
        RomImage::new(self.build(), TOP_OF_SPACE).unwrap()
    }
}

/// Absolute address of an image offset for a ROM of `romsize` bytes.
pub fn phys(romsize: u32, image_offset: usize) -> u64 {
    TOP_OF_SPACE - u64::from(romsize) + image_offset as u64
}
