//! Typed attribute content decoders
//!
//! Every decoder is a pure function of the attribute's resident content
//! bytes: it either produces a typed value or a content error. Non-resident
//! attributes never reach these decoders; their data lives out on the
//! volume and only the run list is recorded.
//!
//! Exotic payloads (ACLs, reparse data internals, index B-tree entries,
//! EA lists) are carried as opaque bytes behind their typed wrappers.

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{DateTime, Utc};
use std::fmt;
use std::io::Cursor;

use crate::error::{MftScanError, Result};
use crate::ntfs::structs::{
    decode_utf16le, filetime_to_datetime, AttributeForm, AttributeHeader, AttributeType,
    FileReference, NameType,
};

fn content_error(reason: impl Into<String>) -> MftScanError {
    MftScanError::InvalidAttributeContent {
        reason: reason.into(),
    }
}

// ============================================================================
// GUID
// ============================================================================

/// A 16-byte GUID as stored on disk (mixed-endian)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    fn from_bytes(data: &[u8]) -> Result<Self> {
        let bytes: [u8; 16] = data
            .try_into()
            .map_err(|_| content_error("GUID requires 16 bytes"))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            d[3], d[2], d[1], d[0], d[5], d[4], d[7], d[6], d[8], d[9], d[10], d[11], d[12], d[13],
            d[14], d[15]
        )
    }
}

// ============================================================================
// STANDARD_INFORMATION
// ============================================================================

/// NTFS 3.0+ tail of STANDARD_INFORMATION
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardInfoExtension {
    pub owner_id: u32,
    pub security_id: u32,
    pub quota_charged: u64,
    pub usn: u64,
}

#[derive(Debug, Clone)]
pub struct StandardInformation {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub mft_modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    pub flags: u32,
    pub max_versions: u32,
    pub version: u32,
    pub class_id: u32,
    /// Present from NTFS 3.0 on, detected by content length
    pub ntfs3: Option<StandardInfoExtension>,
}

impl StandardInformation {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 48 {
            return Err(content_error(format!(
                "STANDARD_INFORMATION too short: {} bytes",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let created = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let modified = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let mft_modified = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let accessed = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let flags = cursor.read_u32::<LittleEndian>()?;
        let max_versions = cursor.read_u32::<LittleEndian>()?;
        let version = cursor.read_u32::<LittleEndian>()?;
        let class_id = cursor.read_u32::<LittleEndian>()?;

        let ntfs3 = if data.len() >= 72 {
            Some(StandardInfoExtension {
                owner_id: cursor.read_u32::<LittleEndian>()?,
                security_id: cursor.read_u32::<LittleEndian>()?,
                quota_charged: cursor.read_u64::<LittleEndian>()?,
                usn: cursor.read_u64::<LittleEndian>()?,
            })
        } else {
            None
        };

        Ok(Self {
            created,
            modified,
            mft_modified,
            accessed,
            flags,
            max_versions,
            version,
            class_id,
            ntfs3,
        })
    }
}

// ============================================================================
// FILE_NAME
// ============================================================================

#[derive(Debug, Clone)]
pub struct FileName {
    pub parent: FileReference,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub mft_modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    /// Allocated size as recorded by the name attribute. Unreliable;
    /// authoritative sizes come from the DATA attribute.
    pub allocated_size: u64,
    /// Real size as recorded by the name attribute. Same caveat.
    pub real_size: u64,
    pub flags: u32,
    pub reparse_value: u32,
    pub name_type: NameType,
    pub name: String,
}

impl FileName {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 66 {
            return Err(content_error(format!(
                "FILE_NAME too short: {} bytes",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let parent = FileReference::from_u64(cursor.read_u64::<LittleEndian>()?);
        let created = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let modified = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let mft_modified = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let accessed = filetime_to_datetime(cursor.read_u64::<LittleEndian>()?);
        let allocated_size = cursor.read_u64::<LittleEndian>()?;
        let real_size = cursor.read_u64::<LittleEndian>()?;
        let flags = cursor.read_u32::<LittleEndian>()?;
        let reparse_value = cursor.read_u32::<LittleEndian>()?;
        let name_length = cursor.read_u8()? as usize;
        let name_type_raw = cursor.read_u8()?;
        let name_type = NameType::from_u8(name_type_raw)
            .ok_or_else(|| content_error(format!("unknown name type {name_type_raw}")))?;

        let name_end = 66 + name_length * 2;
        if data.len() < name_end {
            return Err(content_error("FILE_NAME name truncated"));
        }
        let name = decode_utf16le(&data[66..name_end]);

        Ok(Self {
            parent,
            created,
            modified,
            mft_modified,
            accessed,
            allocated_size,
            real_size,
            flags,
            reparse_value,
            name_type,
            name,
        })
    }
}

// ============================================================================
// ATTRIBUTE_LIST
// ============================================================================

/// One entry of an ATTRIBUTE_LIST: where (which record) a given attribute
/// of the logical file is stored
#[derive(Debug, Clone)]
pub struct AttributeListEntry {
    pub attribute_type: u32,
    pub entry_length: u16,
    pub start_vcn: u64,
    pub reference: FileReference,
    pub attribute_id: u16,
    pub name: Option<String>,
}

impl AttributeListEntry {
    const STATIC_SIZE: usize = 26;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::STATIC_SIZE {
            return Err(content_error("attribute list entry truncated"));
        }
        let mut cursor = Cursor::new(data);
        let attribute_type = cursor.read_u32::<LittleEndian>()?;
        let entry_length = cursor.read_u16::<LittleEndian>()?;
        let name_length = cursor.read_u8()? as usize;
        let name_offset = cursor.read_u8()? as usize;
        let start_vcn = cursor.read_u64::<LittleEndian>()?;
        let reference = FileReference::from_u64(cursor.read_u64::<LittleEndian>()?);
        let attribute_id = cursor.read_u16::<LittleEndian>()?;

        if (entry_length as usize) < Self::STATIC_SIZE {
            return Err(content_error(format!(
                "attribute list entry length {entry_length} below minimum"
            )));
        }

        let name = if name_length > 0 {
            let end = name_offset + name_length * 2;
            if end > data.len() {
                return Err(content_error("attribute list entry name out of bounds"));
            }
            Some(decode_utf16le(&data[name_offset..end]))
        } else {
            None
        };

        Ok(Self {
            attribute_type,
            entry_length,
            start_vcn,
            reference,
            attribute_id,
            name,
        })
    }

    /// Decode all entries of an ATTRIBUTE_LIST content region
    pub fn parse_list(data: &[u8]) -> Result<Vec<AttributeListEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0usize;

        while offset + Self::STATIC_SIZE <= data.len() {
            let entry = AttributeListEntry::from_bytes(&data[offset..])?;
            offset += entry.entry_length as usize;
            entries.push(entry);
        }

        Ok(entries)
    }
}

// ============================================================================
// OBJECT_ID
// ============================================================================

/// OBJECT_ID content: the object id itself plus up to three birth ids,
/// whichever the content length covers
#[derive(Debug, Clone)]
pub struct ObjectId {
    pub object_id: Guid,
    pub birth_volume_id: Option<Guid>,
    pub birth_object_id: Option<Guid>,
    pub birth_domain_id: Option<Guid>,
}

impl ObjectId {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(content_error("OBJECT_ID requires at least one GUID"));
        }
        let guid_at = |index: usize| -> Result<Option<Guid>> {
            let start = index * 16;
            if start + 16 <= data.len() {
                Ok(Some(Guid::from_bytes(&data[start..start + 16])?))
            } else {
                Ok(None)
            }
        };

        Ok(Self {
            object_id: Guid::from_bytes(&data[0..16])?,
            birth_volume_id: guid_at(1)?,
            birth_object_id: guid_at(2)?,
            birth_domain_id: guid_at(3)?,
        })
    }
}

// ============================================================================
// VOLUME_INFORMATION
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct VolumeInformation {
    pub major_version: u8,
    pub minor_version: u8,
    pub flags: u16,
}

impl VolumeInformation {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(content_error(format!(
                "VOLUME_INFORMATION too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            major_version: data[8],
            minor_version: data[9],
            flags: u16::from_le_bytes([data[10], data[11]]),
        })
    }
}

// ============================================================================
// INDEX_ROOT
// ============================================================================

/// Node header shared by INDEX_ROOT and INDEX_ALLOCATION nodes
#[derive(Debug, Clone, Copy)]
pub struct IndexNodeHeader {
    pub entries_offset: u32,
    pub used_size: u32,
    pub allocated_size: u32,
    pub flags: u32,
}

/// INDEX_ROOT: the fixed headers are decoded, the B-tree entries stay an
/// opaque byte region
#[derive(Debug, Clone)]
pub struct IndexRoot {
    pub indexed_attribute_type: u32,
    pub collation_rule: u32,
    pub index_record_size: u32,
    pub clusters_per_index_record: u8,
    pub node: IndexNodeHeader,
    pub entry_data: Vec<u8>,
}

impl IndexRoot {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 32 {
            return Err(content_error(format!(
                "INDEX_ROOT too short: {} bytes",
                data.len()
            )));
        }
        let mut cursor = Cursor::new(data);
        let indexed_attribute_type = cursor.read_u32::<LittleEndian>()?;
        let collation_rule = cursor.read_u32::<LittleEndian>()?;
        let index_record_size = cursor.read_u32::<LittleEndian>()?;
        let clusters_per_index_record = cursor.read_u8()?;

        let node = IndexNodeHeader {
            entries_offset: u32::from_le_bytes(data[16..20].try_into().unwrap()),
            used_size: u32::from_le_bytes(data[20..24].try_into().unwrap()),
            allocated_size: u32::from_le_bytes(data[24..28].try_into().unwrap()),
            flags: u32::from_le_bytes(data[28..32].try_into().unwrap()),
        };

        Ok(Self {
            indexed_attribute_type,
            collation_rule,
            index_record_size,
            clusters_per_index_record,
            node,
            entry_data: data[32..].to_vec(),
        })
    }
}

// ============================================================================
// REPARSE_POINT
// ============================================================================

const REPARSE_TAG_MICROSOFT: u32 = 0x8000_0000;

/// REPARSE_POINT: tag and length decoded, payload kept opaque. Third-party
/// reparse points carry a vendor GUID before the payload.
#[derive(Debug, Clone)]
pub struct ReparsePoint {
    pub tag: u32,
    pub data_length: u16,
    pub guid: Option<Guid>,
    pub data: Vec<u8>,
}

impl ReparsePoint {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(content_error(format!(
                "REPARSE_POINT too short: {} bytes",
                data.len()
            )));
        }
        let tag = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let data_length = u16::from_le_bytes(data[4..6].try_into().unwrap());

        let (guid, payload_start) = if tag & REPARSE_TAG_MICROSOFT != 0 {
            (None, 8usize)
        } else {
            if data.len() < 24 {
                return Err(content_error("third-party REPARSE_POINT missing GUID"));
            }
            (Some(Guid::from_bytes(&data[8..24])?), 24usize)
        };

        Ok(Self {
            tag,
            data_length,
            guid,
            data: data[payload_start..].to_vec(),
        })
    }

    pub fn is_microsoft(&self) -> bool {
        self.tag & REPARSE_TAG_MICROSOFT != 0
    }
}

// ============================================================================
// EA_INFORMATION
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct EaInformation {
    pub entry_length: u16,
    pub need_ea_count: u16,
    pub ea_size: u32,
}

impl EaInformation {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(content_error(format!(
                "EA_INFORMATION too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            entry_length: u16::from_le_bytes(data[0..2].try_into().unwrap()),
            need_ea_count: u16::from_le_bytes(data[2..4].try_into().unwrap()),
            ea_size: u32::from_le_bytes(data[4..8].try_into().unwrap()),
        })
    }
}

// ============================================================================
// Content dispatch
// ============================================================================

/// Decoded attribute content, one variant per recognised type.
///
/// Types whose internals are out of scope carry their raw bytes; anything
/// not in the NTFS type table lands in `Unknown`.
#[derive(Debug, Clone)]
pub enum AttributeContent {
    StandardInformation(StandardInformation),
    AttributeList(Vec<AttributeListEntry>),
    FileName(FileName),
    ObjectId(ObjectId),
    SecurityDescriptor(Vec<u8>),
    VolumeName(String),
    VolumeInformation(VolumeInformation),
    Data(Vec<u8>),
    IndexRoot(IndexRoot),
    Bitmap(Vec<u8>),
    ReparsePoint(ReparsePoint),
    EaInformation(EaInformation),
    Ea(Vec<u8>),
    LoggedUtilityStream(Vec<u8>),
    Unknown(Vec<u8>),
}

impl AttributeContent {
    /// Dispatch a resident content region to its type decoder
    pub fn decode(type_id: u32, data: &[u8]) -> Result<Self> {
        let content = match AttributeType::from_u32(type_id) {
            Some(AttributeType::StandardInformation) => {
                Self::StandardInformation(StandardInformation::from_bytes(data)?)
            }
            Some(AttributeType::AttributeList) => {
                Self::AttributeList(AttributeListEntry::parse_list(data)?)
            }
            Some(AttributeType::FileName) => Self::FileName(FileName::from_bytes(data)?),
            Some(AttributeType::ObjectId) => Self::ObjectId(ObjectId::from_bytes(data)?),
            Some(AttributeType::SecurityDescriptor) => Self::SecurityDescriptor(data.to_vec()),
            Some(AttributeType::VolumeName) => Self::VolumeName(decode_utf16le(data)),
            Some(AttributeType::VolumeInformation) => {
                Self::VolumeInformation(VolumeInformation::from_bytes(data)?)
            }
            Some(AttributeType::Data) => Self::Data(data.to_vec()),
            Some(AttributeType::IndexRoot) => Self::IndexRoot(IndexRoot::from_bytes(data)?),
            Some(AttributeType::Bitmap) => Self::Bitmap(data.to_vec()),
            Some(AttributeType::ReparsePoint) => {
                Self::ReparsePoint(ReparsePoint::from_bytes(data)?)
            }
            Some(AttributeType::EaInformation) => {
                Self::EaInformation(EaInformation::from_bytes(data)?)
            }
            Some(AttributeType::Ea) => Self::Ea(data.to_vec()),
            Some(AttributeType::LoggedUtilityStream) => Self::LoggedUtilityStream(data.to_vec()),
            // A resident INDEX_ALLOCATION is malformed; keep the bytes
            Some(AttributeType::IndexAllocation)
            | Some(AttributeType::End)
            | None => Self::Unknown(data.to_vec()),
        };
        Ok(content)
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// One attribute: header plus decoded content (resident attributes only)
#[derive(Debug, Clone)]
pub struct Attribute {
    pub header: AttributeHeader,
    pub content: Option<AttributeContent>,
}

impl Attribute {
    /// Parse a full attribute from a slice spanning exactly one attribute
    pub fn from_bytes(data: &[u8], load_dataruns: bool) -> Result<Self> {
        let header = AttributeHeader::from_bytes(data, load_dataruns)?;

        let content = match &header.form {
            AttributeForm::Resident(resident) => {
                let start = resident.content_offset as usize;
                let end = start + resident.content_length as usize;
                if end > data.len() {
                    return Err(content_error(format!(
                        "resident content region {start}..{end} out of bounds"
                    )));
                }
                Some(AttributeContent::decode(header.type_id, &data[start..end])?)
            }
            AttributeForm::NonResident(_) => None,
        };

        Ok(Self { header, content })
    }

    pub fn is_non_resident(&self) -> bool {
        self.header.is_non_resident()
    }

    /// Typed accessor for FILE_NAME content
    pub fn file_name(&self) -> Option<&FileName> {
        match &self.content {
            Some(AttributeContent::FileName(file_name)) => Some(file_name),
            _ => None,
        }
    }

    /// Typed accessor for resident DATA content
    pub fn resident_data(&self) -> Option<&[u8]> {
        match &self.content {
            Some(AttributeContent::Data(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Typed accessor for ATTRIBUTE_LIST content
    pub fn attribute_list(&self) -> Option<&[AttributeListEntry]> {
        match &self.content {
            Some(AttributeContent::AttributeList(entries)) => Some(entries),
            _ => None,
        }
    }
}
