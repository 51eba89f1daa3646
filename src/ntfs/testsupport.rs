//! Synthetic entry fixtures for tests
//!
//! Builds byte-exact 1024-byte MFT entries (header, attributes, sentinel,
//! fixup array) so the parsing paths can be exercised without a real
//! volume image.

use crate::ntfs::structs::{FileReference, NameType, ENTRY_HEADER_SIZE};

/// Test entry size used throughout the fixtures
pub const TEST_ENTRY_SIZE: usize = 1024;

const FIRST_ATTRIBUTE_OFFSET: usize = 56;
const FIXUP_SIGNATURE: [u8; 2] = [0x01, 0x00];

fn align8(value: usize) -> usize {
    (value + 7) & !7
}

fn push_utf16(buffer: &mut [u8], offset: usize, text: &str) -> usize {
    let mut cursor = offset;
    for unit in text.encode_utf16() {
        buffer[cursor..cursor + 2].copy_from_slice(&unit.to_le_bytes());
        cursor += 2;
    }
    cursor
}

/// Builder for one synthetic MFT entry
pub struct EntryBuilder {
    record_number: u64,
    sequence: u16,
    flags: u16,
    hard_links: u16,
    base_reference: FileReference,
    attributes: Vec<Vec<u8>>,
}

impl EntryBuilder {
    pub fn new(record_number: u64) -> Self {
        Self {
            record_number,
            sequence: 1,
            flags: 0x0001, // in use
            hard_links: 1,
            base_reference: FileReference::default(),
            attributes: Vec::new(),
        }
    }

    pub fn sequence(mut self, sequence: u16) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn directory(mut self) -> Self {
        self.flags |= 0x0002;
        self
    }

    pub fn not_in_use(mut self) -> Self {
        self.flags &= !0x0001;
        self
    }

    pub fn base(mut self, reference: FileReference) -> Self {
        self.base_reference = reference;
        self
    }

    /// Record number written into the header, kept separate from the slot
    /// the entry will occupy
    pub fn header_record(mut self, record_number: u64) -> Self {
        self.record_number = record_number;
        self
    }

    pub fn raw_attribute(mut self, bytes: Vec<u8>) -> Self {
        self.attributes.push(bytes);
        self
    }

    /// Resident attribute with an arbitrary content region
    pub fn raw_resident_attribute(self, type_id: u32, content: &[u8], attribute_id: u16) -> Self {
        let content_offset = 24usize;
        let length = align8(content_offset + content.len());
        let mut data = vec![0u8; length];
        data[0..4].copy_from_slice(&type_id.to_le_bytes());
        data[4..8].copy_from_slice(&(length as u32).to_le_bytes());
        data[8] = 0; // resident
        data[14..16].copy_from_slice(&attribute_id.to_le_bytes());
        data[16..20].copy_from_slice(&(content.len() as u32).to_le_bytes());
        data[20..22].copy_from_slice(&(content_offset as u16).to_le_bytes());
        data[content_offset..content_offset + content.len()].copy_from_slice(content);
        self.raw_attribute(data)
    }

    /// STANDARD_INFORMATION with fixed timestamps
    pub fn standard_information(self, attribute_id: u16) -> Self {
        let mut content = vec![0u8; 72];
        let filetime = 132_444_736_000_000_000u64.to_le_bytes();
        for i in 0..4 {
            content[i * 8..i * 8 + 8].copy_from_slice(&filetime);
        }
        content[32..36].copy_from_slice(&0x80u32.to_le_bytes());
        self.raw_resident_attribute(0x10, &content, attribute_id)
    }

    /// FILE_NAME attribute
    pub fn file_name(
        self,
        parent: FileReference,
        name: &str,
        name_type: NameType,
        attribute_id: u16,
    ) -> Self {
        let encoded_len = name.encode_utf16().count();
        let mut content = vec![0u8; 66 + encoded_len * 2];
        content[0..8].copy_from_slice(&parent.to_u64().to_le_bytes());
        let filetime = 132_444_736_000_000_000u64.to_le_bytes();
        for i in 0..4 {
            content[8 + i * 8..16 + i * 8].copy_from_slice(&filetime);
        }
        content[64] = encoded_len as u8;
        content[65] = name_type as u8;
        push_utf16(&mut content, 66, name);
        self.raw_resident_attribute(0x30, &content, attribute_id)
    }

    /// Resident DATA attribute, optionally named
    pub fn resident_data(self, name: Option<&str>, content: &[u8], attribute_id: u16) -> Self {
        let name_units = name.map(|n| n.encode_utf16().count()).unwrap_or(0);
        let name_offset = 24usize;
        let content_offset = align8(name_offset + name_units * 2);
        let length = align8(content_offset + content.len());

        let mut data = vec![0u8; length];
        data[0..4].copy_from_slice(&0x80u32.to_le_bytes());
        data[4..8].copy_from_slice(&(length as u32).to_le_bytes());
        data[8] = 0;
        data[9] = name_units as u8;
        data[10..12].copy_from_slice(&(name_offset as u16).to_le_bytes());
        data[14..16].copy_from_slice(&attribute_id.to_le_bytes());
        data[16..20].copy_from_slice(&(content.len() as u32).to_le_bytes());
        data[20..22].copy_from_slice(&(content_offset as u16).to_le_bytes());
        if let Some(name) = name {
            push_utf16(&mut data, name_offset, name);
        }
        data[content_offset..content_offset + content.len()].copy_from_slice(content);
        self.raw_attribute(data)
    }

    /// Non-resident DATA attribute with a pre-encoded run list
    pub fn non_resident_data(
        self,
        name: Option<&str>,
        start_vcn: u64,
        end_vcn: u64,
        data_size: u64,
        run_list: &[u8],
        attribute_id: u16,
    ) -> Self {
        let name_units = name.map(|n| n.encode_utf16().count()).unwrap_or(0);
        let name_offset = 64usize;
        let runs_offset = align8(name_offset + name_units * 2);
        let length = align8(runs_offset + run_list.len());

        let mut data = vec![0u8; length];
        data[0..4].copy_from_slice(&0x80u32.to_le_bytes());
        data[4..8].copy_from_slice(&(length as u32).to_le_bytes());
        data[8] = 1;
        data[9] = name_units as u8;
        data[10..12].copy_from_slice(&(name_offset as u16).to_le_bytes());
        data[14..16].copy_from_slice(&attribute_id.to_le_bytes());
        data[16..24].copy_from_slice(&start_vcn.to_le_bytes());
        data[24..32].copy_from_slice(&end_vcn.to_le_bytes());
        data[32..34].copy_from_slice(&(runs_offset as u16).to_le_bytes());
        data[40..48].copy_from_slice(&data_size.next_multiple_of(4096).to_le_bytes());
        data[48..56].copy_from_slice(&data_size.to_le_bytes());
        data[56..64].copy_from_slice(&data_size.to_le_bytes());
        if let Some(name) = name {
            push_utf16(&mut data, name_offset, name);
        }
        data[runs_offset..runs_offset + run_list.len()].copy_from_slice(run_list);
        self.raw_attribute(data)
    }

    /// Assemble the 1024-byte entry: header, attribute stream, sentinel
    /// and an installed fixup array
    pub fn build(self) -> Vec<u8> {
        let mut buffer = vec![0u8; TEST_ENTRY_SIZE];

        buffer[0..4].copy_from_slice(b"FILE");
        buffer[4..6].copy_from_slice(&48u16.to_le_bytes()); // fixup offset
        buffer[6..8].copy_from_slice(&3u16.to_le_bytes()); // fixup count
        buffer[16..18].copy_from_slice(&self.sequence.to_le_bytes());
        buffer[18..20].copy_from_slice(&self.hard_links.to_le_bytes());
        buffer[20..22].copy_from_slice(&(FIRST_ATTRIBUTE_OFFSET as u16).to_le_bytes());
        buffer[22..24].copy_from_slice(&self.flags.to_le_bytes());
        buffer[28..32].copy_from_slice(&(TEST_ENTRY_SIZE as u32).to_le_bytes());
        buffer[32..40].copy_from_slice(&self.base_reference.to_u64().to_le_bytes());
        buffer[40..42].copy_from_slice(&(self.attributes.len() as u16).to_le_bytes());
        buffer[44..48].copy_from_slice(&(self.record_number as u32).to_le_bytes());

        let mut offset = FIRST_ATTRIBUTE_OFFSET;
        for attribute in &self.attributes {
            buffer[offset..offset + attribute.len()].copy_from_slice(attribute);
            offset += attribute.len();
        }
        buffer[offset..offset + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        offset += 8;
        buffer[24..28].copy_from_slice(&(offset as u32).to_le_bytes()); // used size

        // Install the fixup array: displace the trailing bytes of both
        // sectors into the array and stamp the signature in their place
        let array = ENTRY_HEADER_SIZE;
        buffer[array..array + 2].copy_from_slice(&FIXUP_SIGNATURE);
        let (first, second) = (510, TEST_ENTRY_SIZE - 2);
        let displaced_first = [buffer[first], buffer[first + 1]];
        let displaced_second = [buffer[second], buffer[second + 1]];
        buffer[array + 2..array + 4].copy_from_slice(&displaced_first);
        buffer[array + 4..array + 6].copy_from_slice(&displaced_second);
        buffer[first..first + 2].copy_from_slice(&FIXUP_SIGNATURE);
        buffer[second..second + 2].copy_from_slice(&FIXUP_SIGNATURE);

        buffer
    }
}

/// Concatenate entries into an MFT image; `None` slots stay zeroed
pub fn build_mft_image(slots: Vec<Option<EntryBuilder>>) -> Vec<u8> {
    let mut image = Vec::with_capacity(slots.len() * TEST_ENTRY_SIZE);
    for slot in slots {
        match slot {
            Some(builder) => image.extend(builder.build()),
            None => image.extend(std::iter::repeat(0u8).take(TEST_ENTRY_SIZE)),
        }
    }
    image
}
