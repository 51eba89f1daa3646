//! Error types for MftScan
//!
//! Comprehensive error handling for all MFT parsing operations

use thiserror::Error;

/// Main error type for MftScan operations
#[derive(Error, Debug)]
pub enum MftScanError {
    #[error("Fixup signature mismatch in record {record} at offset {offset}")]
    FixupMismatch { record: u64, offset: usize },

    #[error("Invalid entry header in record {record}: {reason}")]
    InvalidEntryHeader { record: u64, reason: String },

    #[error("Invalid attribute header: {reason}")]
    InvalidAttributeHeader { reason: String },

    #[error("Invalid attribute content: {reason}")]
    InvalidAttributeContent { reason: String },

    #[error("Datastream error: {reason}")]
    DataStream { reason: String },

    #[error("Invalid entry {record}: {reason}")]
    InvalidEntry {
        record: u64,
        reason: String,
        /// Raw entry bytes, kept so callers can dump the offending record
        bytes: Vec<u8>,
    },

    #[error("MFT error: {0}")]
    Mft(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for MftScan operations
pub type Result<T> = std::result::Result<T, MftScanError>;

impl MftScanError {
    /// Check if this error is recoverable (the caller can skip the affected
    /// record or attribute and continue)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MftScanError::FixupMismatch { .. }
                | MftScanError::InvalidEntryHeader { .. }
                | MftScanError::InvalidAttributeHeader { .. }
                | MftScanError::InvalidAttributeContent { .. }
                | MftScanError::DataStream { .. }
                | MftScanError::InvalidEntry { .. }
        )
    }

    /// The record number this error refers to, if it carries one
    pub fn record_number(&self) -> Option<u64> {
        match self {
            MftScanError::FixupMismatch { record, .. }
            | MftScanError::InvalidEntryHeader { record, .. }
            | MftScanError::InvalidEntry { record, .. } => Some(*record),
            _ => None,
        }
    }
}
