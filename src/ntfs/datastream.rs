//! Datastream normalisation
//!
//! A logical file exposes one datastream per stream name: the unnamed
//! default stream plus any alternate data streams. The DATA attributes
//! feeding a stream can be resident or non-resident and can be spread over
//! extension entries in arbitrary order; this module collapses them into a
//! single view with the run fragments ordered by virtual cluster number.

use crate::error::{MftScanError, Result};
use crate::ntfs::attrs::Attribute;
use crate::ntfs::structs::{AttributeForm, AttributeType, DataRun};

fn stream_error(reason: impl Into<String>) -> MftScanError {
    MftScanError::DataStream {
        reason: reason.into(),
    }
}

/// One non-resident piece of a stream: the run list of a single DATA
/// attribute, anchored at its start VCN
#[derive(Debug, Clone)]
pub struct StreamFragment {
    pub start_vcn: u64,
    pub runs: Vec<DataRun>,
}

/// The logical view of one `(entry, stream name)` pair.
///
/// Either resident (embedded content, no fragments) or non-resident
/// (fragments, no content). Size and allocated size are authoritative only
/// once the fragment with start VCN 0 has been seen.
#[derive(Debug, Clone)]
pub struct Datastream {
    name: Option<String>,
    size: u64,
    alloc_size: u64,
    cluster_count: u64,
    content: Option<Vec<u8>>,
    fragments: Vec<StreamFragment>,
    sorted: bool,
}

impl Datastream {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            size: 0,
            alloc_size: 0,
            cluster_count: 0,
            content: None,
            fragments: Vec::new(),
            sorted: true,
        }
    }

    /// Stream name; `None` is the unnamed default stream
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Logical size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Allocated size in bytes
    pub fn alloc_size(&self) -> u64 {
        self.alloc_size
    }

    /// Highest end VCN observed plus one
    pub fn cluster_count(&self) -> u64 {
        self.cluster_count
    }

    pub fn is_resident(&self) -> bool {
        self.content.is_some()
    }

    /// Embedded content of a resident stream
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    /// Fold one DATA attribute into this stream
    pub fn add_data_attribute(&mut self, attribute: &Attribute) -> Result<()> {
        if attribute.header.attribute_type() != Some(AttributeType::Data) {
            return Err(stream_error(format!(
                "attribute type {:#x} is not DATA",
                attribute.header.type_id
            )));
        }
        if attribute.header.name.as_deref() != self.name.as_deref() {
            return Err(stream_error(format!(
                "attribute name {:?} does not match stream {:?}",
                attribute.header.name, self.name
            )));
        }

        match &attribute.header.form {
            AttributeForm::Resident(resident) => {
                if !self.fragments.is_empty() {
                    return Err(stream_error(
                        "resident DATA for a stream that already has fragments",
                    ));
                }
                self.size = resident.content_length as u64;
                self.alloc_size = resident.content_length as u64;
                self.content = Some(
                    attribute
                        .resident_data()
                        .map(|bytes| bytes.to_vec())
                        .unwrap_or_default(),
                );
            }
            AttributeForm::NonResident(non_resident) => {
                if self.content.is_some() {
                    return Err(stream_error(
                        "non-resident DATA for a stream that is already resident",
                    ));
                }
                // The fragment anchored at VCN 0 is the authoritative
                // source for the stream sizes
                if non_resident.start_vcn == 0 {
                    self.size = non_resident.data_size;
                    self.alloc_size = non_resident.allocated_size;
                }
                // An empty stream encodes "no clusters" as end VCN -1,
                // which wraps to 0 here and leaves the count untouched
                self.cluster_count = self
                    .cluster_count
                    .max(non_resident.end_vcn.wrapping_add(1));
                self.fragments.push(StreamFragment {
                    start_vcn: non_resident.start_vcn,
                    runs: non_resident.data_runs.clone().unwrap_or_default(),
                });
                self.sorted = false;
            }
        }

        Ok(())
    }

    /// Merge a same-named stream coming from an extension entry
    pub fn merge(&mut self, other: Datastream) -> Result<()> {
        if other.name.as_deref() != self.name.as_deref() {
            return Err(stream_error(format!(
                "cannot merge stream {:?} into stream {:?}",
                other.name, self.name
            )));
        }
        if self.is_resident() {
            return Err(stream_error("cannot merge into a resident stream"));
        }

        self.cluster_count = self.cluster_count.max(other.cluster_count);
        if self.size == 0 && other.size != 0 {
            self.size = other.size;
            self.alloc_size = other.alloc_size;
        }
        if !other.fragments.is_empty() {
            self.fragments.extend(other.fragments);
            self.sorted = false;
        }

        Ok(())
    }

    /// Fragments ordered by start VCN. Sorting is deferred to the first
    /// read and memoised until the next mutation.
    pub fn dataruns(&mut self) -> &[StreamFragment] {
        if !self.sorted {
            self.fragments.sort_by_key(|fragment| fragment.start_vcn);
            self.sorted = true;
        }
        &self.fragments
    }

    /// Fragment count without forcing a sort
    pub fn fragment_count(&self) -> usize {
        self.fragments.len()
    }
}
