use crate::util::checked_range;
use crate::Result;

/// Owned, read-only copy of a physical address range.
///
/// All accessors take offsets relative to [`RomView::base`] and fail with
/// [`crate::CbfsError::OutOfBounds`] instead of reading past the end.
#[derive(Debug)]
pub struct RomView {
    base: u64,
    bytes: Vec<u8>,
}

impl RomView {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    /// Physical address of the first byte in the view.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Physical address one past the last byte in the view.
    pub fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        checked_range(offset as u64, len, self.bytes.len() as u64)?;
        Ok(&self.bytes[offset..offset + len])
    }

    pub fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(offset, N)?);
        Ok(out)
    }
}

impl Drop for RomView {
    fn drop(&mut self) {
        tracing::trace!(
            "releasing ROM view 0x{:x}..0x{:x}",
            self.base,
            self.base + self.bytes.len() as u64
        );
    }
}
