use crate::{CbfsError, Result};

/// Round `value` up to the next multiple of `align`, which must be a non-zero power of two.
pub fn align_up_pow2(value: u64, align: u64) -> Result<u64> {
    if align == 0 || !align.is_power_of_two() {
        return Err(CbfsError::InvalidAlignment {
            align: u32::try_from(align).unwrap_or(u32::MAX),
        });
    }
    value
        .checked_add(align - 1)
        .map(|v| v & !(align - 1))
        .ok_or(CbfsError::AddressOverflow)
}

pub fn checked_range(offset: u64, len: usize, size: u64) -> Result<()> {
    let end = offset
        .checked_add(len as u64)
        .ok_or(CbfsError::AddressOverflow)?;
    if end > size {
        return Err(CbfsError::OutOfBounds { offset, len, size });
    }
    Ok(())
}

pub(crate) fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_pow2_rounds_to_boundary() {
        assert_eq!(align_up_pow2(0, 0x40).unwrap(), 0);
        assert_eq!(align_up_pow2(1, 0x40).unwrap(), 0x40);
        assert_eq!(align_up_pow2(0x40, 0x40).unwrap(), 0x40);
        assert_eq!(align_up_pow2(0x41, 0x40).unwrap(), 0x80);
        assert_eq!(align_up_pow2(0x1_0000_0001, 0x40).unwrap(), 0x1_0000_0040);
    }

    #[test]
    fn align_up_pow2_rejects_bad_alignment() {
        assert!(matches!(
            align_up_pow2(1, 0).unwrap_err(),
            CbfsError::InvalidAlignment { align: 0 }
        ));
        assert!(matches!(
            align_up_pow2(1, 48).unwrap_err(),
            CbfsError::InvalidAlignment { align: 48 }
        ));
    }

    #[test]
    fn align_up_pow2_reports_overflow() {
        assert!(matches!(
            align_up_pow2(u64::MAX, 0x40).unwrap_err(),
            CbfsError::AddressOverflow
        ));
    }

    #[test]
    fn checked_range_bounds() {
        checked_range(0, 16, 16).unwrap();
        checked_range(16, 0, 16).unwrap();
        assert!(matches!(
            checked_range(8, 9, 16).unwrap_err(),
            CbfsError::OutOfBounds {
                offset: 8,
                len: 9,
                size: 16
            }
        ));
        assert!(matches!(
            checked_range(u64::MAX, 1, u64::MAX).unwrap_err(),
            CbfsError::AddressOverflow
        ));
    }
}
