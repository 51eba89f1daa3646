//! MftScan - Forensic NTFS Master File Table parser
//!
//! Parses a standalone $MFT image (carved from a volume or extracted by an
//! acquisition tool) without any access to the volume itself.
//!
//! # Features
//!
//! - **Entry-size detection**: recognises the entry size from the record
//!   signatures when it is not known up front
//! - **Two-pass loading**: a cheap stub scan maps base/extension relations
//!   before any full parse
//! - **Fixup repair**: restores the sector-boundary bytes displaced by the
//!   update sequence array
//! - **Logical entries**: attributes spread over extension records are
//!   merged back under their base entry
//! - **Datastreams**: default stream and alternate data streams, resident
//!   or non-resident, with ordered data runs
//! - **Path resolution**: full paths across the directory tree, orphan
//!   chains detected by sequence-number mismatch
//!
//! # Example
//!
//! ```no_run
//! use mftscan::{Mft, MftConfig};
//!
//! fn main() -> mftscan::Result<()> {
//!     let mut mft = Mft::open("MFT.bin", MftConfig::default())?;
//!
//!     println!("entry size: {}", mft.entry_size());
//!     println!("slots: {}", mft.slot_count());
//!
//!     let entry = mft.get(5)?;
//!     println!("root links: {}", entry.header.hard_link_count);
//!
//!     let (orphan, path) = mft.get_full_path(42)?;
//!     println!("record 42 -> {} (orphan: {})", path, orphan);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ntfs;

// Re-export main types
pub use config::{AttributeLoad, MftConfig};
pub use error::{MftScanError, Result};
pub use ntfs::{
    Attribute, AttributeContent, AttributeType, Datastream, EntryHeader, FileName, FileReference,
    Mft, MftEntry, NameType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Format a byte count for display, scaled to the nearest binary unit
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(1_572_864), "1.5 MiB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.0 GiB");
    }
}
