//! Logical MFT entries
//!
//! An entry buffer is parsed into a header, an attribute map and a set of
//! datastreams. A *logical* entry is the base entry plus everything merged
//! in from its extension entries, so callers never have to chase
//! ATTRIBUTE_LIST references themselves.

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::config::MftConfig;
use crate::error::{MftScanError, Result};
use crate::ntfs::attrs::{Attribute, FileName};
use crate::ntfs::datastream::Datastream;
use crate::ntfs::fixup::apply_fixup;
use crate::ntfs::structs::{
    AttributeType, EntryHeader, ATTRIBUTE_END_MARKER, ATTRIBUTE_HEADER_SIZE,
};

/// One logical MFT entry: header, non-DATA attributes keyed by type, and
/// one datastream per distinct stream name
#[derive(Debug, Clone)]
pub struct MftEntry {
    pub header: EntryHeader,
    attributes: BTreeMap<u32, Vec<Attribute>>,
    data_streams: Vec<Datastream>,
}

impl MftEntry {
    /// Parse a single physical entry from its buffer. The buffer is
    /// mutated in place by the fixup engine. Returns `None` for an empty
    /// (zero-initialised) slot.
    pub fn from_buffer(
        config: &MftConfig,
        buffer: &mut [u8],
        record_number: u64,
    ) -> Result<Option<MftEntry>> {
        if buffer.len() >= 4 && buffer[0..4] == [0, 0, 0, 0] {
            return Ok(None);
        }

        let mut header = EntryHeader::from_bytes(buffer, !config.ignore_signature_check)
            .map_err(|error| match error {
                MftScanError::InvalidEntryHeader { reason, .. } => {
                    MftScanError::InvalidEntryHeader {
                        record: record_number,
                        reason,
                    }
                }
                other => other,
            })?;

        if buffer.len() != header.allocated_size as usize {
            return Err(MftScanError::InvalidEntry {
                record: record_number,
                reason: format!(
                    "buffer length {} differs from allocated entry length {}",
                    buffer.len(),
                    header.allocated_size
                ),
                bytes: buffer.to_vec(),
            });
        }

        if header.record_number != record_number {
            warn!(
                slot = record_number,
                header = header.record_number,
                "entry self record number disagrees with its slot"
            );
            if config.trust_slot_number {
                header.record_number = record_number;
            }
        }

        if config.apply_fixup_array {
            apply_fixup(
                record_number,
                buffer,
                header.fixup_offset,
                header.fixup_count,
                header.allocated_size,
            )?;
        }

        let mut entry = MftEntry {
            header,
            attributes: BTreeMap::new(),
            data_streams: Vec::new(),
        };
        entry.walk_attributes(config, buffer)?;

        Ok(Some(entry))
    }

    /// Walk the attribute stream, dispatching each attribute to its
    /// decoder. A failing attribute is skipped and the walk continues at
    /// the next attribute boundary; a missing sentinel ends the walk at
    /// the buffer end.
    fn walk_attributes(&mut self, config: &MftConfig, buffer: &[u8]) -> Result<()> {
        let mut offset = self.header.first_attribute_offset as usize;

        loop {
            if offset + 4 > buffer.len() {
                warn!(
                    record = self.header.record_number,
                    offset, "attribute stream ran past the entry without a terminator"
                );
                break;
            }
            let type_id = u32::from_le_bytes(buffer[offset..offset + 4].try_into().unwrap());
            if type_id == ATTRIBUTE_END_MARKER {
                break;
            }
            if offset + ATTRIBUTE_HEADER_SIZE > buffer.len() {
                warn!(
                    record = self.header.record_number,
                    offset, "truncated attribute header at end of entry"
                );
                break;
            }
            let length =
                u32::from_le_bytes(buffer[offset + 4..offset + 8].try_into().unwrap()) as usize;
            if length < ATTRIBUTE_HEADER_SIZE || offset + length > buffer.len() {
                warn!(
                    record = self.header.record_number,
                    offset, length, "attribute length leaves the entry bounds"
                );
                break;
            }

            if config.attributes.is_enabled(type_id) {
                let outcome =
                    Attribute::from_bytes(&buffer[offset..offset + length], config.load_dataruns)
                        .and_then(|attribute| self.add_attribute(attribute));
                match outcome {
                    Ok(()) => {}
                    Err(error) if error.is_recoverable() => {
                        // Fatal for the attribute, not for the entry
                        warn!(
                            record = self.header.record_number,
                            offset,
                            type_id,
                            %error,
                            "skipping undecodable attribute"
                        );
                    }
                    Err(error) => return Err(error),
                }
            }

            offset += length;
        }

        Ok(())
    }

    /// Add a parsed attribute: DATA is funnelled into the per-name
    /// datastreams, everything else goes into the attribute map
    fn add_attribute(&mut self, attribute: Attribute) -> Result<()> {
        if attribute.header.attribute_type() == Some(AttributeType::Data) {
            let name = attribute.header.name.as_deref();
            let index = match self
                .data_streams
                .iter()
                .position(|stream| stream.name() == name)
            {
                Some(index) => index,
                None => {
                    self.data_streams
                        .push(Datastream::new(attribute.header.name.clone()));
                    self.data_streams.len() - 1
                }
            };
            self.data_streams[index].add_data_attribute(&attribute)?;
        } else {
            self.attributes
                .entry(attribute.header.type_id)
                .or_default()
                .push(attribute);
        }
        Ok(())
    }

    /// Merge an extension entry into this base entry: attributes are
    /// appended per type, datastreams are merged by name
    pub fn merge_extension(&mut self, extension: MftEntry) -> Result<()> {
        for (type_id, attributes) in extension.attributes {
            self.attributes
                .entry(type_id)
                .or_default()
                .extend(attributes);
        }
        for stream in extension.data_streams {
            match self
                .data_streams
                .iter()
                .position(|existing| existing.name() == stream.name())
            {
                Some(index) => self.data_streams[index].merge(stream)?,
                None => self.data_streams.push(stream),
            }
        }
        Ok(())
    }

    /// All attributes of one type, in the order they were found (base
    /// entry first, then extensions in file order)
    pub fn get_attributes(&self, attribute_type: AttributeType) -> Option<&[Attribute]> {
        self.attributes
            .get(&(attribute_type as u32))
            .map(Vec::as_slice)
    }

    /// The full attribute map, keyed by raw type id
    pub fn attribute_map(&self) -> &BTreeMap<u32, Vec<Attribute>> {
        &self.attributes
    }

    pub fn data_streams(&self) -> &[Datastream] {
        &self.data_streams
    }

    pub fn data_streams_mut(&mut self) -> &mut [Datastream] {
        &mut self.data_streams
    }

    /// Look up a datastream by name; `None` is the default stream
    pub fn get_datastream(&self, name: Option<&str>) -> Option<&Datastream> {
        self.data_streams.iter().find(|stream| stream.name() == name)
    }

    pub fn get_datastream_mut(&mut self, name: Option<&str>) -> Option<&mut Datastream> {
        self.data_streams
            .iter_mut()
            .find(|stream| stream.name() == name)
    }

    /// Names of all datastreams, default stream included as `None`
    pub fn datastream_names(&self) -> Vec<Option<&str>> {
        self.data_streams.iter().map(|stream| stream.name()).collect()
    }

    /// Does the entry carry any alternate (named) data stream
    pub fn has_ads(&self) -> bool {
        self.data_streams.iter().any(|stream| stream.name().is_some())
    }

    fn file_names(&self) -> impl Iterator<Item = (&Attribute, &FileName)> {
        self.get_attributes(AttributeType::FileName)
            .into_iter()
            .flatten()
            .filter_map(|attribute| attribute.file_name().map(|name| (attribute, name)))
    }

    /// The entry's main FILE_NAME: the attribute with the smallest id
    /// anchors the parent; among the names sharing that parent reference
    /// the smallest name-type value wins (POSIX < WIN32 < DOS < WIN32&DOS).
    pub fn main_file_name(&self) -> Result<&FileName> {
        let candidates: Vec<(&Attribute, &FileName)> = self.file_names().collect();

        let (_, anchor) = candidates
            .iter()
            .min_by_key(|(attribute, _)| attribute.header.id)
            .ok_or_else(|| MftScanError::InvalidEntry {
                record: self.header.record_number,
                reason: "entry has no FILE_NAME attribute".to_string(),
                bytes: Vec::new(),
            })?;

        let parent_key = (anchor.parent.record, anchor.parent.sequence);
        let chosen = candidates
            .iter()
            .filter(|(_, name)| (name.parent.record, name.parent.sequence) == parent_key)
            .min_by_key(|(_, name)| name.name_type as u8)
            .expect("anchor itself always matches");

        Ok(chosen.1)
    }

    /// One FILE_NAME per hard link: names grouped by their parent
    /// reference, keeping the smallest name-type representative per group
    pub fn unique_file_names(&self) -> Vec<&FileName> {
        let mut order: Vec<(u64, u16)> = Vec::new();
        let mut best: HashMap<(u64, u16), &FileName> = HashMap::new();

        for (_, name) in self.file_names() {
            let key = (name.parent.record, name.parent.sequence);
            match best.get(&key) {
                Some(existing) if (existing.name_type as u8) <= (name.name_type as u8) => {}
                Some(_) => {
                    best.insert(key, name);
                }
                None => {
                    order.push(key);
                    best.insert(key, name);
                }
            }
        }

        order.into_iter().map(|key| best[&key]).collect()
    }

    pub fn is_deleted(&self) -> bool {
        !self.header.is_in_use()
    }

    pub fn is_directory(&self) -> bool {
        self.header.is_directory()
    }
}
