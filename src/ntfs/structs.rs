//! NTFS on-disk structures and constants

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Cursor;

use crate::error::{MftScanError, Result};

// ============================================================================
// NTFS Constants
// ============================================================================

/// MFT entry signature "FILE"
pub const ENTRY_SIGNATURE_FILE: &[u8; 4] = b"FILE";

/// Bad MFT entry signature "BAAD"
pub const ENTRY_SIGNATURE_BAAD: &[u8; 4] = b"BAAD";

/// Index record signature "INDX" (seen during entry-size detection only)
pub const ENTRY_SIGNATURE_INDX: &[u8; 4] = b"INDX";

/// End of attribute stream marker
pub const ATTRIBUTE_END_MARKER: u32 = 0xFFFF_FFFF;

/// Size of the fixed portion of the entry header
pub const ENTRY_HEADER_SIZE: usize = 48;

/// Size of the common attribute header prefix
pub const ATTRIBUTE_HEADER_SIZE: usize = 16;

/// Common + resident suffix
pub const RESIDENT_HEADER_SIZE: usize = 24;

/// Common + non-resident suffix (before the run list)
pub const NON_RESIDENT_HEADER_SIZE: usize = 64;

// Entry usage flags
pub const ENTRY_IN_USE: u16 = 0x0001;
pub const ENTRY_IS_DIRECTORY: u16 = 0x0002;

/// NTFS root directory record number
pub const ROOT_RECORD_NUMBER: u64 = 5;

// ============================================================================
// Attribute Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AttributeType {
    StandardInformation = 0x10,
    AttributeList = 0x20,
    FileName = 0x30,
    ObjectId = 0x40,
    SecurityDescriptor = 0x50,
    VolumeName = 0x60,
    VolumeInformation = 0x70,
    Data = 0x80,
    IndexRoot = 0x90,
    IndexAllocation = 0xA0,
    Bitmap = 0xB0,
    ReparsePoint = 0xC0,
    EaInformation = 0xD0,
    Ea = 0xE0,
    LoggedUtilityStream = 0x100,
    End = 0xFFFF_FFFF,
}

impl AttributeType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0x10 => Some(Self::StandardInformation),
            0x20 => Some(Self::AttributeList),
            0x30 => Some(Self::FileName),
            0x40 => Some(Self::ObjectId),
            0x50 => Some(Self::SecurityDescriptor),
            0x60 => Some(Self::VolumeName),
            0x70 => Some(Self::VolumeInformation),
            0x80 => Some(Self::Data),
            0x90 => Some(Self::IndexRoot),
            0xA0 => Some(Self::IndexAllocation),
            0xB0 => Some(Self::Bitmap),
            0xC0 => Some(Self::ReparsePoint),
            0xD0 => Some(Self::EaInformation),
            0xE0 => Some(Self::Ea),
            0x100 => Some(Self::LoggedUtilityStream),
            0xFFFF_FFFF => Some(Self::End),
            _ => None,
        }
    }
}

// ============================================================================
// Filename Namespace
// ============================================================================

/// FILE_NAME namespace. The numeric order doubles as the preference order
/// when selecting a main filename (POSIX wins over WIN32 and so on).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum NameType {
    Posix = 0,
    Win32 = 1,
    Dos = 2,
    Win32AndDos = 3,
}

impl NameType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Posix),
            1 => Some(Self::Win32),
            2 => Some(Self::Dos),
            3 => Some(Self::Win32AndDos),
            _ => None,
        }
    }

    /// DOS names are 8.3 aliases, not display names
    pub fn is_displayable(&self) -> bool {
        !matches!(self, Self::Dos)
    }
}

// ============================================================================
// File Reference
// ============================================================================

/// A 64-bit packed file reference: 48-bit record number plus 16-bit
/// sequence number. Both fields must match for the reference to name the
/// same entry incarnation; a sequence mismatch means the slot was reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileReference {
    pub record: u64,
    pub sequence: u16,
}

impl FileReference {
    pub fn from_u64(raw: u64) -> Self {
        Self {
            record: raw & 0x0000_FFFF_FFFF_FFFF,
            sequence: (raw >> 48) as u16,
        }
    }

    pub fn to_u64(self) -> u64 {
        self.record | ((self.sequence as u64) << 48)
    }

    /// A zero record number means "no reference" (e.g. "I am a base entry")
    pub fn is_null(&self) -> bool {
        self.record == 0
    }
}

impl fmt::Display for FileReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.record, self.sequence)
    }
}

// ============================================================================
// MFT Entry Header
// ============================================================================

/// Parsed 48-byte MFT entry header
#[derive(Debug, Clone, Default)]
pub struct EntryHeader {
    /// `Some(true)` for BAAD, `Some(false)` for FILE. `None` only when
    /// signature checks were disabled and the signature is something else.
    pub is_bad: Option<bool>,
    pub fixup_offset: u16,
    pub fixup_count: u16,
    pub log_sequence_number: u64,
    pub sequence_number: u16,
    pub hard_link_count: u16,
    pub first_attribute_offset: u16,
    pub flags: u16,
    /// Logical entry length in bytes
    pub used_size: u32,
    /// Allocated entry length in bytes
    pub allocated_size: u32,
    /// Base record reference; null for base entries
    pub base_reference: FileReference,
    pub next_attribute_id: u16,
    pub record_number: u64,
}

impl EntryHeader {
    /// Parse the entry header from the start of an entry buffer.
    ///
    /// With `check_signature` the signature must be FILE or BAAD; without
    /// it the signature is not inspected.
    pub fn from_bytes(data: &[u8], check_signature: bool) -> Result<Self> {
        if data.len() < ENTRY_HEADER_SIZE {
            return Err(MftScanError::InvalidEntryHeader {
                record: 0,
                reason: format!("buffer too small for entry header: {} bytes", data.len()),
            });
        }

        let signature: [u8; 4] = data[0..4].try_into().unwrap();
        let is_bad = if &signature == ENTRY_SIGNATURE_FILE {
            Some(false)
        } else if &signature == ENTRY_SIGNATURE_BAAD {
            Some(true)
        } else {
            None
        };

        let mut cursor = Cursor::new(&data[4..]);
        let fixup_offset = cursor.read_u16::<LittleEndian>()?;
        let fixup_count = cursor.read_u16::<LittleEndian>()?;
        let log_sequence_number = cursor.read_u64::<LittleEndian>()?;
        let sequence_number = cursor.read_u16::<LittleEndian>()?;
        let hard_link_count = cursor.read_u16::<LittleEndian>()?;
        let first_attribute_offset = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let used_size = cursor.read_u32::<LittleEndian>()?;
        let allocated_size = cursor.read_u32::<LittleEndian>()?;
        let base_reference = FileReference::from_u64(cursor.read_u64::<LittleEndian>()?);
        let next_attribute_id = cursor.read_u16::<LittleEndian>()?;
        let _padding = cursor.read_u16::<LittleEndian>()?;
        let record_number = cursor.read_u32::<LittleEndian>()? as u64;

        if check_signature && is_bad.is_none() {
            return Err(MftScanError::InvalidEntryHeader {
                record: record_number,
                reason: format!("unknown signature {:02X?}", signature),
            });
        }

        let header = Self {
            is_bad,
            fixup_offset,
            fixup_count,
            log_sequence_number,
            sequence_number,
            hard_link_count,
            first_attribute_offset,
            flags,
            used_size,
            allocated_size,
            base_reference,
            next_attribute_id,
            record_number,
        };
        header.validate()?;

        Ok(header)
    }

    fn validate(&self) -> Result<()> {
        if (self.fixup_offset as usize) < ENTRY_HEADER_SIZE {
            return Err(MftScanError::InvalidEntryHeader {
                record: self.record_number,
                reason: format!("fixup array offset {} inside the header", self.fixup_offset),
            });
        }
        if (self.first_attribute_offset as usize) < ENTRY_HEADER_SIZE {
            return Err(MftScanError::InvalidEntryHeader {
                record: self.record_number,
                reason: format!(
                    "first attribute offset {} inside the header",
                    self.first_attribute_offset
                ),
            });
        }
        if self.used_size > self.allocated_size {
            return Err(MftScanError::InvalidEntryHeader {
                record: self.record_number,
                reason: format!(
                    "used size {} exceeds allocated size {}",
                    self.used_size, self.allocated_size
                ),
            });
        }
        Ok(())
    }

    pub fn is_in_use(&self) -> bool {
        (self.flags & ENTRY_IN_USE) != 0
    }

    pub fn is_directory(&self) -> bool {
        (self.flags & ENTRY_IS_DIRECTORY) != 0
    }

    /// Check if this is a base entry (not an extension)
    pub fn is_base(&self) -> bool {
        self.base_reference.is_null()
    }
}

// ============================================================================
// Attribute Header
// ============================================================================

/// Resident attribute suffix
#[derive(Debug, Clone, Default)]
pub struct ResidentHeader {
    pub content_length: u32,
    /// Offset of the content, relative to the attribute start
    pub content_offset: u16,
    pub indexed: u8,
}

/// Non-resident attribute suffix
#[derive(Debug, Clone, Default)]
pub struct NonResidentHeader {
    pub start_vcn: u64,
    pub end_vcn: u64,
    /// Offset of the run list, relative to the attribute start
    pub run_list_offset: u16,
    pub compression_unit: u16,
    pub allocated_size: u64,
    pub data_size: u64,
    pub initialized_size: u64,
    /// Decoded run list, present only when data-run loading is enabled
    pub data_runs: Option<Vec<DataRun>>,
}

/// Resident or non-resident form of an attribute
#[derive(Debug, Clone)]
pub enum AttributeForm {
    Resident(ResidentHeader),
    NonResident(NonResidentHeader),
}

/// Common attribute header plus its resident/non-resident suffix
#[derive(Debug, Clone)]
pub struct AttributeHeader {
    pub type_id: u32,
    /// Total attribute length in bytes (header + content/runs + padding)
    pub length: u32,
    /// UTF-16 decoded attribute name, absent for the unnamed attribute
    pub name: Option<String>,
    pub flags: u16,
    pub id: u16,
    pub form: AttributeForm,
}

impl AttributeHeader {
    /// Parse an attribute header from a slice spanning exactly one
    /// attribute (the walker bounds the slice by the declared length).
    pub fn from_bytes(data: &[u8], load_dataruns: bool) -> Result<Self> {
        if data.len() < ATTRIBUTE_HEADER_SIZE {
            return Err(MftScanError::InvalidAttributeHeader {
                reason: format!("buffer too small for attribute header: {} bytes", data.len()),
            });
        }

        let mut cursor = Cursor::new(data);
        let type_id = cursor.read_u32::<LittleEndian>()?;
        let length = cursor.read_u32::<LittleEndian>()?;
        let non_resident = cursor.read_u8()? != 0;
        let name_length = cursor.read_u8()?;
        let name_offset = cursor.read_u16::<LittleEndian>()?;
        let flags = cursor.read_u16::<LittleEndian>()?;
        let id = cursor.read_u16::<LittleEndian>()?;

        if (length as usize) < ATTRIBUTE_HEADER_SIZE {
            return Err(MftScanError::InvalidAttributeHeader {
                reason: format!("attribute length {} below minimum", length),
            });
        }

        if non_resident && Self::always_resident(type_id) {
            return Err(MftScanError::InvalidAttributeHeader {
                reason: format!("attribute type {:#x} must be resident", type_id),
            });
        }

        let name = if name_length > 0 {
            let start = name_offset as usize;
            let end = start + name_length as usize * 2;
            if end > data.len() {
                return Err(MftScanError::InvalidAttributeHeader {
                    reason: format!("attribute name region {}..{} out of bounds", start, end),
                });
            }
            Some(decode_utf16le(&data[start..end]))
        } else {
            None
        };

        let form = if non_resident {
            if data.len() < NON_RESIDENT_HEADER_SIZE {
                return Err(MftScanError::InvalidAttributeHeader {
                    reason: "buffer too small for non-resident header".to_string(),
                });
            }
            let start_vcn = cursor.read_u64::<LittleEndian>()?;
            let end_vcn = cursor.read_u64::<LittleEndian>()?;
            let run_list_offset = cursor.read_u16::<LittleEndian>()?;
            let compression_unit = cursor.read_u16::<LittleEndian>()?;
            let _padding = cursor.read_u32::<LittleEndian>()?;
            let allocated_size = cursor.read_u64::<LittleEndian>()?;
            let data_size = cursor.read_u64::<LittleEndian>()?;
            let initialized_size = cursor.read_u64::<LittleEndian>()?;

            let data_runs = if load_dataruns {
                let runs_start = run_list_offset as usize;
                if runs_start > data.len() {
                    return Err(MftScanError::InvalidAttributeHeader {
                        reason: format!("run list offset {} out of bounds", runs_start),
                    });
                }
                Some(DataRun::decode_runs(&data[runs_start..])?)
            } else {
                None
            };

            AttributeForm::NonResident(NonResidentHeader {
                start_vcn,
                end_vcn,
                run_list_offset,
                compression_unit,
                allocated_size,
                data_size,
                initialized_size,
                data_runs,
            })
        } else {
            if data.len() < RESIDENT_HEADER_SIZE {
                return Err(MftScanError::InvalidAttributeHeader {
                    reason: "buffer too small for resident header".to_string(),
                });
            }
            let content_length = cursor.read_u32::<LittleEndian>()?;
            let content_offset = cursor.read_u16::<LittleEndian>()?;
            let indexed = cursor.read_u8()?;

            AttributeForm::Resident(ResidentHeader {
                content_length,
                content_offset,
                indexed,
            })
        };

        Ok(Self {
            type_id,
            length,
            name,
            flags,
            id,
            form,
        })
    }

    /// STANDARD_INFORMATION, FILE_NAME and INDEX_ROOT are never stored
    /// outside the entry
    fn always_resident(type_id: u32) -> bool {
        matches!(
            AttributeType::from_u32(type_id),
            Some(AttributeType::StandardInformation)
                | Some(AttributeType::FileName)
                | Some(AttributeType::IndexRoot)
        )
    }

    pub fn is_non_resident(&self) -> bool {
        matches!(self.form, AttributeForm::NonResident(_))
    }

    pub fn resident(&self) -> Option<&ResidentHeader> {
        match &self.form {
            AttributeForm::Resident(header) => Some(header),
            AttributeForm::NonResident(_) => None,
        }
    }

    pub fn non_resident(&self) -> Option<&NonResidentHeader> {
        match &self.form {
            AttributeForm::NonResident(header) => Some(header),
            AttributeForm::Resident(_) => None,
        }
    }

    pub fn attribute_type(&self) -> Option<AttributeType> {
        AttributeType::from_u32(self.type_id)
    }
}

// ============================================================================
// Data Runs
// ============================================================================

/// One contiguous extent of a non-resident stream.
///
/// `lcn` is the absolute starting cluster; `None` marks a sparse run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRun {
    pub cluster_count: u64,
    pub lcn: Option<i64>,
}

impl DataRun {
    /// Decode a run list. Each run starts with a nibble-header byte: the
    /// low nibble is the byte width of the cluster count, the high nibble
    /// the byte width of the signed LCN delta (0 = sparse). Deltas
    /// accumulate from 0. A zero header byte terminates the list; running
    /// off the buffer without one is an error.
    pub fn decode_runs(data: &[u8]) -> Result<Vec<DataRun>> {
        let mut runs = Vec::new();
        let mut pos = 0usize;
        let mut current_lcn: i64 = 0;

        loop {
            if pos >= data.len() {
                return Err(MftScanError::InvalidAttributeContent {
                    reason: "run list truncated before terminator".to_string(),
                });
            }
            let header = data[pos];
            if header == 0 {
                break;
            }
            pos += 1;

            let length_bytes = (header & 0x0F) as usize;
            let offset_bytes = ((header & 0xF0) >> 4) as usize;
            if length_bytes == 0 || length_bytes > 8 || offset_bytes > 8 {
                return Err(MftScanError::InvalidAttributeContent {
                    reason: format!("invalid run header byte {:#04x}", header),
                });
            }
            if pos + length_bytes + offset_bytes > data.len() {
                return Err(MftScanError::InvalidAttributeContent {
                    reason: "run list truncated inside a run".to_string(),
                });
            }

            let mut cluster_count = 0u64;
            for i in 0..length_bytes {
                cluster_count |= (data[pos + i] as u64) << (i * 8);
            }
            pos += length_bytes;

            let lcn = if offset_bytes == 0 {
                None
            } else {
                let mut delta = 0i64;
                for i in 0..offset_bytes {
                    delta |= (data[pos + i] as i64) << (i * 8);
                }
                // Sign extend from the top bit of the encoded delta
                if offset_bytes < 8 && (data[pos + offset_bytes - 1] & 0x80) != 0 {
                    for i in offset_bytes..8 {
                        delta |= 0xFFi64 << (i * 8);
                    }
                }
                pos += offset_bytes;

                current_lcn += delta;
                Some(current_lcn)
            };

            runs.push(DataRun { cluster_count, lcn });
        }

        Ok(runs)
    }

    pub fn is_sparse(&self) -> bool {
        self.lcn.is_none()
    }
}

// ============================================================================
// FILETIME conversion
// ============================================================================

/// Difference between 1601-01-01 and 1970-01-01 in 100 ns intervals
const FILETIME_UNIX_EPOCH_DIFF: i64 = 116_444_736_000_000_000;

/// Convert a Windows FILETIME (100-nanosecond intervals since 1601-01-01)
/// to a UTC datetime. Values before 1970 are representable; sub-second
/// precision is preserved to 100 ns.
pub fn filetime_to_datetime(filetime: u64) -> chrono::DateTime<chrono::Utc> {
    use chrono::{TimeZone, Utc};

    let intervals = filetime as i64 - FILETIME_UNIX_EPOCH_DIFF;
    let secs = intervals.div_euclid(10_000_000);
    let nanos = (intervals.rem_euclid(10_000_000) * 100) as u32;
    Utc.timestamp_opt(secs, nanos)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap())
}

// ============================================================================
// UTF-16LE helper
// ============================================================================

/// Decode UTF-16LE bytes, replacing invalid sequences
pub fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|chunk| u16::from_le_bytes([chunk[0], chunk[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry_header() -> Vec<u8> {
        let mut data = vec![0u8; ENTRY_HEADER_SIZE];
        data[0..4].copy_from_slice(b"FILE");
        data[4..6].copy_from_slice(&48u16.to_le_bytes()); // fixup offset
        data[6..8].copy_from_slice(&3u16.to_le_bytes()); // fixup count
        data[8..16].copy_from_slice(&0x1122u64.to_le_bytes()); // lsn
        data[16..18].copy_from_slice(&7u16.to_le_bytes()); // sequence
        data[18..20].copy_from_slice(&1u16.to_le_bytes()); // hard links
        data[20..22].copy_from_slice(&56u16.to_le_bytes()); // first attribute
        data[22..24].copy_from_slice(&0x0003u16.to_le_bytes()); // in use + dir
        data[24..28].copy_from_slice(&416u32.to_le_bytes()); // used
        data[28..32].copy_from_slice(&1024u32.to_le_bytes()); // allocated
        data[32..40].copy_from_slice(&0u64.to_le_bytes()); // base reference
        data[40..42].copy_from_slice(&4u16.to_le_bytes()); // next attribute id
        data[44..48].copy_from_slice(&42u32.to_le_bytes()); // record number
        data
    }

    #[test]
    fn test_file_reference_split() {
        let reference = FileReference::from_u64(0x0007_0000_0000_002A);
        assert_eq!(reference.record, 42);
        assert_eq!(reference.sequence, 7);
        assert_eq!(reference.to_u64(), 0x0007_0000_0000_002A);
        assert!(!reference.is_null());
        assert!(FileReference::from_u64(0x0001_0000_0000_0000).is_null());
    }

    #[test]
    fn test_entry_header_parse() {
        let data = sample_entry_header();
        let header = EntryHeader::from_bytes(&data, true).unwrap();

        assert_eq!(header.is_bad, Some(false));
        assert_eq!(header.fixup_offset, 48);
        assert_eq!(header.fixup_count, 3);
        assert_eq!(header.log_sequence_number, 0x1122);
        assert_eq!(header.sequence_number, 7);
        assert_eq!(header.hard_link_count, 1);
        assert_eq!(header.first_attribute_offset, 56);
        assert!(header.is_in_use());
        assert!(header.is_directory());
        assert_eq!(header.used_size, 416);
        assert_eq!(header.allocated_size, 1024);
        assert!(header.is_base());
        assert_eq!(header.next_attribute_id, 4);
        assert_eq!(header.record_number, 42);
    }

    #[test]
    fn test_entry_header_bad_signature() {
        let mut data = sample_entry_header();
        data[0..4].copy_from_slice(b"BAAD");
        let header = EntryHeader::from_bytes(&data, true).unwrap();
        assert_eq!(header.is_bad, Some(true));

        data[0..4].copy_from_slice(b"XXXX");
        assert!(matches!(
            EntryHeader::from_bytes(&data, true),
            Err(MftScanError::InvalidEntryHeader { .. })
        ));
        // Signature check disabled: the flag stays indeterminate
        let header = EntryHeader::from_bytes(&data, false).unwrap();
        assert_eq!(header.is_bad, None);
    }

    #[test]
    fn test_entry_header_invariants() {
        let mut data = sample_entry_header();
        data[4..6].copy_from_slice(&30u16.to_le_bytes());
        assert!(EntryHeader::from_bytes(&data, true).is_err());

        let mut data = sample_entry_header();
        data[20..22].copy_from_slice(&8u16.to_le_bytes());
        assert!(EntryHeader::from_bytes(&data, true).is_err());

        let mut data = sample_entry_header();
        data[24..28].copy_from_slice(&2048u32.to_le_bytes());
        assert!(EntryHeader::from_bytes(&data, true).is_err());
    }

    #[test]
    fn test_decode_runs_simple() {
        // 0x11: 1 length byte, 1 offset byte; 19 clusters at LCN 32
        let data = [0x11, 0x13, 0x20, 0x00];
        let runs = DataRun::decode_runs(&data).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].cluster_count, 0x13);
        assert_eq!(runs[0].lcn, Some(0x20));
    }

    #[test]
    fn test_decode_runs_negative_delta() {
        // Second run jumps backwards: delta 0xF9 = -7 from LCN 32
        let data = [0x11, 0x08, 0x20, 0x11, 0x04, 0xF9, 0x00];
        let runs = DataRun::decode_runs(&data).unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].lcn, Some(0x20));
        assert_eq!(runs[1].lcn, Some(0x19));
        assert_eq!(runs[1].cluster_count, 4);
    }

    #[test]
    fn test_decode_runs_sparse() {
        // Offset width 0: sparse hole of 16 clusters between two real runs
        let data = [0x11, 0x08, 0x40, 0x01, 0x10, 0x11, 0x08, 0x30, 0x00];
        let runs = DataRun::decode_runs(&data).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].lcn, None);
        assert!(runs[1].is_sparse());
        assert_eq!(runs[1].cluster_count, 0x10);
        // Sparse runs do not move the LCN accumulator
        assert_eq!(runs[2].lcn, Some(0x70));
    }

    #[test]
    fn test_decode_runs_truncated() {
        // Missing terminator
        assert!(DataRun::decode_runs(&[0x11, 0x08, 0x40]).is_err());
        // Run body extends past the buffer
        assert!(DataRun::decode_runs(&[0x22, 0x08]).is_err());
    }

    #[test]
    fn test_attribute_header_resident() {
        let mut data = vec![0u8; 32];
        data[0..4].copy_from_slice(&0x10u32.to_le_bytes()); // STANDARD_INFORMATION
        data[4..8].copy_from_slice(&32u32.to_le_bytes()); // length
        data[8] = 0; // resident
        data[9] = 0; // no name
        data[12..14].copy_from_slice(&0u16.to_le_bytes()); // flags
        data[14..16].copy_from_slice(&2u16.to_le_bytes()); // id
        data[16..20].copy_from_slice(&8u32.to_le_bytes()); // content length
        data[20..22].copy_from_slice(&24u16.to_le_bytes()); // content offset

        let header = AttributeHeader::from_bytes(&data, true).unwrap();
        assert_eq!(header.type_id, 0x10);
        assert_eq!(header.length, 32);
        assert_eq!(header.id, 2);
        assert!(header.name.is_none());
        let resident = header.resident().unwrap();
        assert_eq!(resident.content_length, 8);
        assert_eq!(resident.content_offset, 24);
    }

    #[test]
    fn test_attribute_header_non_resident_named() {
        let mut data = vec![0u8; 0x50];
        data[0..4].copy_from_slice(&0x80u32.to_le_bytes()); // DATA
        data[4..8].copy_from_slice(&0x50u32.to_le_bytes()); // length
        data[8] = 1; // non-resident
        data[9] = 4; // name length in code units
        data[10..12].copy_from_slice(&64u16.to_le_bytes()); // name offset
        data[14..16].copy_from_slice(&3u16.to_le_bytes()); // id
        data[16..24].copy_from_slice(&0u64.to_le_bytes()); // start vcn
        data[24..32].copy_from_slice(&99u64.to_le_bytes()); // end vcn
        data[32..34].copy_from_slice(&72u16.to_le_bytes()); // run list offset
        data[40..48].copy_from_slice(&409600u64.to_le_bytes()); // allocated
        data[48..56].copy_from_slice(&409000u64.to_le_bytes()); // data size
        data[56..64].copy_from_slice(&409000u64.to_le_bytes()); // initialized
        // name "ads1"
        for (i, c) in "ads1".encode_utf16().enumerate() {
            data[64 + i * 2..64 + i * 2 + 2].copy_from_slice(&c.to_le_bytes());
        }
        // run list: 100 clusters at LCN 0x50
        data[72..75].copy_from_slice(&[0x11, 0x64, 0x50]);

        let header = AttributeHeader::from_bytes(&data, true).unwrap();
        assert_eq!(header.name.as_deref(), Some("ads1"));
        let non_resident = header.non_resident().unwrap();
        assert_eq!(non_resident.end_vcn, 99);
        assert_eq!(non_resident.data_size, 409000);
        let runs = non_resident.data_runs.as_ref().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].cluster_count, 100);
        assert_eq!(runs[0].lcn, Some(0x50));

        // Same header without run-list loading
        let header = AttributeHeader::from_bytes(&data, false).unwrap();
        assert!(header.non_resident().unwrap().data_runs.is_none());
    }

    #[test]
    fn test_always_resident_rule() {
        let mut data = vec![0u8; NON_RESIDENT_HEADER_SIZE];
        data[0..4].copy_from_slice(&0x30u32.to_le_bytes()); // FILE_NAME
        data[4..8].copy_from_slice(&(NON_RESIDENT_HEADER_SIZE as u32).to_le_bytes());
        data[8] = 1; // non-resident: forbidden
        assert!(matches!(
            AttributeHeader::from_bytes(&data, true),
            Err(MftScanError::InvalidAttributeHeader { .. })
        ));
    }

    #[test]
    fn test_filetime_conversion() {
        // 132444736000000000 intervals = 2020-09-13T12:26:40Z
        let datetime = filetime_to_datetime(132_444_736_000_000_000);
        assert_eq!(
            datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
            "2020-09-13 12:26:40"
        );
        // Epoch start maps to 1601
        let datetime = filetime_to_datetime(0);
        assert_eq!(datetime.format("%Y-%m-%d").to_string(), "1601-01-01");
        // Sub-second precision survives
        let datetime = filetime_to_datetime(FILETIME_UNIX_EPOCH_DIFF as u64 + 5);
        assert_eq!(
            chrono::Timelike::nanosecond(&datetime),
            500
        );
    }

    #[test]
    fn test_decode_utf16le() {
        let raw = [0x24, 0x00, 0x4D, 0x00, 0x46, 0x00, 0x54, 0x00];
        assert_eq!(decode_utf16le(&raw), "$MFT");
    }
}
