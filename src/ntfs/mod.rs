//! NTFS Master File Table parsing
//!
//! This module provides the MFT parsing core:
//! - Entry-size detection and two-pass loading (stub scan, then full parse)
//! - Fixup application for multi-sector record integrity
//! - Typed attribute content decoding
//! - Datastream normalisation (default stream + ADS, resident or not)
//! - Full-path resolution across the directory tree

pub mod attrs;
pub mod datastream;
pub mod entry;
pub mod fixup;
pub mod mft;
pub mod structs;

#[cfg(test)]
pub(crate) mod testsupport;

// Re-export commonly used types
pub use attrs::{
    Attribute, AttributeContent, AttributeListEntry, FileName, StandardInformation,
};
pub use datastream::{Datastream, StreamFragment};
pub use entry::MftEntry;
pub use fixup::apply_fixup;
pub use mft::Mft;
pub use structs::{
    filetime_to_datetime, AttributeHeader, AttributeType, DataRun, EntryHeader, FileReference,
    NameType,
};
