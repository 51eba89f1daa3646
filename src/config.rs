//! Parser configuration
//!
//! Controls how much of an MFT image is decoded. The defaults load
//! everything; forensic pipelines that only need names and parents can
//! switch off the attribute types they do not care about and skip the
//! data-run decoding entirely.

use crate::ntfs::structs::AttributeType;

/// Which attribute types get their content decoded.
///
/// A disabled type is skipped during the attribute walk; the walker still
/// advances by the attribute's declared length so the stream stays aligned.
#[derive(Debug, Clone)]
pub struct AttributeLoad {
    pub standard_information: bool,
    pub attribute_list: bool,
    pub file_name: bool,
    pub object_id: bool,
    pub security_descriptor: bool,
    pub volume_name: bool,
    pub volume_information: bool,
    pub data: bool,
    pub index_root: bool,
    pub index_allocation: bool,
    pub bitmap: bool,
    pub reparse_point: bool,
    pub ea_information: bool,
    pub ea: bool,
    pub logged_utility_stream: bool,
}

impl Default for AttributeLoad {
    fn default() -> Self {
        Self {
            standard_information: true,
            attribute_list: true,
            file_name: true,
            object_id: true,
            security_descriptor: true,
            volume_name: true,
            volume_information: true,
            data: true,
            index_root: true,
            index_allocation: true,
            bitmap: true,
            reparse_point: true,
            ea_information: true,
            ea: true,
            logged_utility_stream: true,
        }
    }
}

impl AttributeLoad {
    /// Check whether content decoding is enabled for a raw attribute type id.
    /// Unrecognised types are always kept (they decode to `Unknown`).
    pub fn is_enabled(&self, type_id: u32) -> bool {
        match AttributeType::from_u32(type_id) {
            Some(AttributeType::StandardInformation) => self.standard_information,
            Some(AttributeType::AttributeList) => self.attribute_list,
            Some(AttributeType::FileName) => self.file_name,
            Some(AttributeType::ObjectId) => self.object_id,
            Some(AttributeType::SecurityDescriptor) => self.security_descriptor,
            Some(AttributeType::VolumeName) => self.volume_name,
            Some(AttributeType::VolumeInformation) => self.volume_information,
            Some(AttributeType::Data) => self.data,
            Some(AttributeType::IndexRoot) => self.index_root,
            Some(AttributeType::IndexAllocation) => self.index_allocation,
            Some(AttributeType::Bitmap) => self.bitmap,
            Some(AttributeType::ReparsePoint) => self.reparse_point,
            Some(AttributeType::EaInformation) => self.ea_information,
            Some(AttributeType::Ea) => self.ea,
            Some(AttributeType::LoggedUtilityStream) => self.logged_utility_stream,
            Some(AttributeType::End) | None => true,
        }
    }
}

/// Configuration for parsing an MFT image
#[derive(Debug, Clone)]
pub struct MftConfig {
    /// Entry size in bytes; 0 = auto-detect from the signatures
    pub entry_size: u32,
    /// Apply the fixup array to every entry buffer. Disable for images
    /// extracted from memory where the patches were already applied.
    pub apply_fixup_array: bool,
    /// Do not require a FILE/BAAD signature on entry headers
    pub ignore_signature_check: bool,
    /// Run the stub scan at construction to map base/extension relations
    /// and empty slots. Without it, random access only works for entries
    /// that turn out to be bases.
    pub create_initial_information: bool,
    /// Decode the run list of non-resident attributes
    pub load_dataruns: bool,
    /// When the parsed self record number disagrees with the slot number,
    /// trust the slot instead of the header
    pub trust_slot_number: bool,
    /// Per-type content decoding switches
    pub attributes: AttributeLoad,
}

impl Default for MftConfig {
    fn default() -> Self {
        Self {
            entry_size: 0,
            apply_fixup_array: true,
            ignore_signature_check: false,
            create_initial_information: true,
            load_dataruns: true,
            trust_slot_number: false,
            attributes: AttributeLoad::default(),
        }
    }
}
