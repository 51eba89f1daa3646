//! Fixup array engine
//!
//! NTFS overwrites the last two bytes of every sector covered by a
//! multi-sector record with an update sequence number; the displaced bytes
//! live in the fixup array at a header-specified offset. Applying the array
//! verifies each sector's trailing bytes against the sequence number and
//! restores the originals in place.

use crate::error::{MftScanError, Result};

/// Apply the fixup array to an entry buffer, mutating it in place.
///
/// The array holds `fixup_count` 16-bit values: the signature first, then
/// one substitution per sector. Sector size is derived from the entry size
/// and the substitution count. A sector whose trailing bytes do not match
/// the signature fails the whole entry.
pub fn apply_fixup(
    record_number: u64,
    buffer: &mut [u8],
    fixup_offset: u16,
    fixup_count: u16,
    entry_size: u32,
) -> Result<()> {
    if fixup_count < 2 {
        // Signature only, nothing to substitute
        return Ok(());
    }

    let array_start = fixup_offset as usize;
    let array_end = array_start + fixup_count as usize * 2;
    if array_end > buffer.len() {
        return Err(MftScanError::InvalidEntryHeader {
            record: record_number,
            reason: format!("fixup array {}..{} out of bounds", array_start, array_end),
        });
    }

    let substitutions = fixup_count as usize - 1;
    let sector_size = entry_size as usize / substitutions;
    let signature = [buffer[array_start], buffer[array_start + 1]];

    for index in 1..=substitutions {
        let position = index * sector_size - 2;
        if position + 2 > buffer.len() {
            return Err(MftScanError::InvalidEntryHeader {
                record: record_number,
                reason: format!("fixup position {} out of bounds", position),
            });
        }
        // The displaced bytes must always match the signature
        if buffer[position..position + 2] != signature {
            return Err(MftScanError::FixupMismatch {
                record: record_number,
                offset: position,
            });
        }
        let replacement = array_start + index * 2;
        buffer[position] = buffer[replacement];
        buffer[position + 1] = buffer[replacement + 1];
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1024-byte entry, two sectors, fixup array at offset 48
    fn sample_entry() -> Vec<u8> {
        let mut buffer = vec![0u8; 1024];
        // signature + two substitutions
        buffer[48..54].copy_from_slice(&[0xAA, 0xBB, 0x11, 0x22, 0x33, 0x44]);
        buffer[510..512].copy_from_slice(&[0xAA, 0xBB]);
        buffer[1022..1024].copy_from_slice(&[0xAA, 0xBB]);
        buffer
    }

    #[test]
    fn test_apply_restores_sector_bytes() {
        let mut buffer = sample_entry();
        apply_fixup(0, &mut buffer, 48, 3, 1024).unwrap();
        assert_eq!(&buffer[510..512], &[0x11, 0x22]);
        assert_eq!(&buffer[1022..1024], &[0x33, 0x44]);
    }

    #[test]
    fn test_round_trip() {
        // An entry whose sector-boundary bytes were displaced into the
        // fixup array comes back byte-for-byte identical
        let mut original = vec![0u8; 1024];
        for (i, byte) in original.iter_mut().enumerate() {
            *byte = (i % 251) as u8;
        }
        let mut patched = original.clone();
        patched[48..50].copy_from_slice(&[0x5A, 0xA5]); // signature
        patched[50..52].copy_from_slice(&original[510..512]);
        patched[52..54].copy_from_slice(&original[1022..1024]);
        patched[510..512].copy_from_slice(&[0x5A, 0xA5]);
        patched[1022..1024].copy_from_slice(&[0x5A, 0xA5]);
        // The array region itself differs from the pristine buffer, so
        // compare everything outside it
        original[48..54].copy_from_slice(&patched[48..54]);

        apply_fixup(7, &mut patched, 48, 3, 1024).unwrap();
        assert_eq!(patched, original);
    }

    #[test]
    fn test_mismatch_fails() {
        let mut buffer = sample_entry();
        buffer[510] = 0xCC;
        let err = apply_fixup(9, &mut buffer, 48, 3, 1024).unwrap_err();
        match err {
            MftScanError::FixupMismatch { record, offset } => {
                assert_eq!(record, 9);
                assert_eq!(offset, 510);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_array_out_of_bounds() {
        let mut buffer = sample_entry();
        assert!(matches!(
            apply_fixup(0, &mut buffer, 1020, 3, 1024),
            Err(MftScanError::InvalidEntryHeader { .. })
        ));
    }

    #[test]
    fn test_signature_only_is_noop() {
        let mut buffer = sample_entry();
        let before = buffer.clone();
        apply_fixup(0, &mut buffer, 48, 1, 1024).unwrap();
        assert_eq!(buffer, before);
    }
}
