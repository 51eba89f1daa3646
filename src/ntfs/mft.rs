//! MFT façade
//!
//! Loads a Master File Table image in two passes. The stub scan reads the
//! first few header fields of every slot to relate base and extension
//! entries and to mark the empty slots; full parsing then happens lazily,
//! per base entry, through `get` and the iterator. Assembled entries flow
//! through a small LRU cache because path resolution revisits the same
//! directory entries constantly.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs::File;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;
use tracing::{debug, warn};

use crate::config::MftConfig;
use crate::error::{MftScanError, Result};
use crate::ntfs::entry::MftEntry;
use crate::ntfs::structs::{
    FileReference, ENTRY_SIGNATURE_BAAD, ENTRY_SIGNATURE_FILE, ENTRY_SIGNATURE_INDX,
    ROOT_RECORD_NUMBER,
};

/// Entry sizes tried during auto-detection, in preference order
pub const ENTRY_SIZE_CANDIDATES: [u32; 7] = [1024, 4096, 512, 2048, 256, 8192, 1];

/// Bytes read per slot during the stub scan: enough to cover the sequence
/// number (offset 16) and the packed base reference (offset 32)
const STUB_READ_SIZE: usize = 40;

/// Assembled-entry cache capacity
const ENTRY_CACHE_CAPACITY: usize = 512;

fn is_known_signature(signature: &[u8; 4]) -> bool {
    signature == ENTRY_SIGNATURE_FILE
        || signature == ENTRY_SIGNATURE_BAAD
        || signature == ENTRY_SIGNATURE_INDX
}

// ============================================================================
// Entry Stub
// ============================================================================

/// The few header fields the first pass needs. Read without fixups: all of
/// them sit before the first fixup position.
#[derive(Debug, Clone, Copy)]
struct EntryStub {
    record: u64,
    sequence: u16,
    base: FileReference,
}

impl EntryStub {
    /// `None` for an empty (zero-initialised) slot
    fn from_bytes(data: &[u8; STUB_READ_SIZE], record: u64) -> Option<Self> {
        if data[0..4] == [0, 0, 0, 0] {
            return None;
        }
        Some(Self {
            record,
            sequence: u16::from_le_bytes([data[16], data[17]]),
            base: FileReference::from_u64(u64::from_le_bytes(data[32..40].try_into().unwrap())),
        })
    }
}

// ============================================================================
// Entry Cache
// ============================================================================

/// Fixed-capacity LRU of assembled logical entries, keyed by record number
struct EntryCache {
    capacity: usize,
    map: HashMap<u64, MftEntry>,
    order: VecDeque<u64>,
}

impl EntryCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    fn get(&mut self, record: u64) -> Option<MftEntry> {
        let entry = self.map.get(&record)?.clone();
        self.touch(record);
        Some(entry)
    }

    fn put(&mut self, record: u64, entry: MftEntry) {
        if self.map.insert(record, entry).is_some() {
            self.touch(record);
            return;
        }
        if self.map.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
        self.order.push_back(record);
    }

    fn touch(&mut self, record: u64) {
        if let Some(position) = self.order.iter().position(|&key| key == record) {
            self.order.remove(position);
            self.order.push_back(record);
        }
    }
}

// ============================================================================
// MFT
// ============================================================================

/// A parsed Master File Table image.
///
/// Owns the byte source for its lifetime; the `MftEntry` values handed out
/// are independent copies with no borrow into the source.
pub struct Mft<S: Read + Seek> {
    source: S,
    config: MftConfig,
    entry_size: u32,
    total_slots: u64,
    /// base record -> extension records, in file order
    base_extensions: HashMap<u64, Vec<u64>>,
    /// extension record -> base record
    extension_bases: HashMap<u64, u64>,
    empty_slots: HashSet<u64>,
    /// Slots that are neither empty nor extensions; `None` when the stub
    /// scan was skipped
    valid_entries: Option<u64>,
    /// Reusable entry-sized read buffer
    entry_buffer: Vec<u8>,
    cache: EntryCache,
}

impl Mft<Cursor<Mmap>> {
    /// Memory-map an MFT file and parse it
    pub fn open<P: AsRef<Path>>(path: P, config: MftConfig) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::new(Cursor::new(mmap), config)
    }
}

impl<S: Read + Seek> Mft<S> {
    /// Build an MFT over any seekable byte source
    pub fn new(mut source: S, config: MftConfig) -> Result<Self> {
        let total_size = source.seek(SeekFrom::End(0))?;

        let entry_size = if config.entry_size == 0 {
            let detected = Self::detect_entry_size(&mut source)?;
            debug!(entry_size = detected, "detected MFT entry size");
            detected
        } else {
            config.entry_size
        };

        if total_size % entry_size as u64 != 0 {
            warn!(
                total_size,
                entry_size, "file size is not a multiple of the entry size"
            );
        }
        let total_slots = total_size / entry_size as u64;

        let mut mft = Self {
            source,
            entry_size,
            total_slots,
            base_extensions: HashMap::new(),
            extension_bases: HashMap::new(),
            empty_slots: HashSet::new(),
            valid_entries: None,
            entry_buffer: vec![0u8; entry_size as usize],
            cache: EntryCache::new(ENTRY_CACHE_CAPACITY),
            config,
        };

        if mft.config.create_initial_information {
            mft.load_stub_info()?;
        }

        Ok(mft)
    }

    /// Detect the entry size from the signatures: the first slot must open
    /// with a known signature, and the first candidate size at which a
    /// known signature repeats wins
    fn detect_entry_size(source: &mut S) -> Result<u32> {
        let mut signature = [0u8; 4];
        source.seek(SeekFrom::Start(0))?;
        source.read_exact(&mut signature)?;
        if !is_known_signature(&signature) {
            return Err(MftScanError::Mft(format!(
                "no entry signature at offset 0: {:02X?}",
                signature
            )));
        }

        for candidate in ENTRY_SIZE_CANDIDATES {
            source.seek(SeekFrom::Start(candidate as u64))?;
            let mut second = [0u8; 4];
            if source.read_exact(&mut second).is_err() {
                continue;
            }
            if is_known_signature(&second) {
                return Ok(candidate);
            }
        }

        Err(MftScanError::Mft(
            "could not detect the entry size from the signatures".to_string(),
        ))
    }

    /// First pass: one small read per slot, inverting the base references
    /// into the base->extensions and extension->base maps.
    ///
    /// An ATTRIBUTE_LIST can be non-resident, so scanning every slot is
    /// the only reliable way to find all extensions of a base.
    fn load_stub_info(&mut self) -> Result<()> {
        let mut stubs: Vec<Option<EntryStub>> = Vec::with_capacity(self.total_slots as usize);
        let mut buffer = [0u8; STUB_READ_SIZE];

        for record in 0..self.total_slots {
            self.source
                .seek(SeekFrom::Start(record * self.entry_size as u64))?;
            self.source.read_exact(&mut buffer)?;
            stubs.push(EntryStub::from_bytes(&buffer, record));
        }

        let mut valid = 0u64;
        for stub in stubs.iter().flatten() {
            // An extension must name an existing base, by record number
            // AND sequence; anything else (including a self-reference) is
            // a base in its own right
            let related = !stub.base.is_null()
                && stub.base.record != stub.record
                && stubs
                    .get(stub.base.record as usize)
                    .and_then(|slot| slot.as_ref())
                    .map(|base| base.sequence == stub.base.sequence)
                    .unwrap_or(false);

            if related {
                self.base_extensions
                    .entry(stub.base.record)
                    .or_default()
                    .push(stub.record);
                self.extension_bases.insert(stub.record, stub.base.record);
            } else {
                valid += 1;
            }
        }

        for (record, stub) in stubs.iter().enumerate() {
            if stub.is_none() {
                self.empty_slots.insert(record as u64);
            }
        }

        self.valid_entries = Some(valid);
        debug!(
            slots = self.total_slots,
            valid,
            empty = self.empty_slots.len(),
            extensions = self.extension_bases.len(),
            "stub scan complete"
        );

        Ok(())
    }

    pub fn entry_size(&self) -> u32 {
        self.entry_size
    }

    /// Number of slots in the image, empty and extension slots included
    pub fn slot_count(&self) -> u64 {
        self.total_slots
    }

    /// Number of non-empty, non-extension slots counted by the stub scan
    pub fn valid_entry_count(&self) -> Option<u64> {
        self.valid_entries
    }

    pub fn empty_slot_count(&self) -> u64 {
        self.empty_slots.len() as u64
    }

    pub fn is_empty_slot(&self, record: u64) -> bool {
        self.empty_slots.contains(&record)
    }

    pub fn is_extension(&self, record: u64) -> bool {
        self.extension_bases.contains_key(&record)
    }

    /// Extension records of a base, in file order
    pub fn extensions_of(&self, record: u64) -> &[u64] {
        self.base_extensions
            .get(&record)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn base_of(&self, record: u64) -> Option<u64> {
        self.extension_bases.get(&record).copied()
    }

    fn read_into_buffer(&mut self, record: u64) -> Result<()> {
        self.source
            .seek(SeekFrom::Start(record * self.entry_size as u64))?;
        self.source.read_exact(&mut self.entry_buffer)?;
        Ok(())
    }

    /// Parse one physical entry out of the reusable buffer
    fn parse_slot(&mut self, record: u64) -> Result<Option<MftEntry>> {
        self.read_into_buffer(record)?;
        let config = self.config.clone();
        MftEntry::from_buffer(&config, &mut self.entry_buffer, record)
    }

    /// Assemble the logical entry for a slot; `None` when the slot is
    /// empty or not a base
    fn fetch(&mut self, record: u64) -> Result<Option<MftEntry>> {
        if self.empty_slots.contains(&record) || self.extension_bases.contains_key(&record) {
            return Ok(None);
        }
        if let Some(entry) = self.cache.get(record) {
            return Ok(Some(entry));
        }

        let mut entry = match self.parse_slot(record)? {
            Some(entry) => entry,
            None => return Ok(None),
        };
        if !entry.header.is_base() {
            // With stub information the scan already decided: a slot not in
            // the extension map is orphaned from its base and stands on its
            // own. Without it there is nothing to corroborate the reference,
            // so the slot is not served as a base.
            if self.valid_entries.is_none() {
                return Ok(None);
            }
            debug!(
                record,
                base = entry.header.base_reference.record,
                "unmatched base reference; treating entry as a base"
            );
        }

        let extensions: Vec<u64> = self.extensions_of(record).to_vec();
        for extension_record in extensions {
            match self.parse_slot(extension_record)? {
                Some(extension) => entry.merge_extension(extension)?,
                None => warn!(
                    record,
                    extension_record, "extension slot turned out empty during assembly"
                ),
            }
        }

        self.cache.put(record, entry.clone());
        Ok(Some(entry))
    }

    /// Retrieve the logical entry at a record number. Fails for empty
    /// slots and for extension entries ("not a base").
    pub fn get(&mut self, record: u64) -> Result<MftEntry> {
        if record >= self.total_slots {
            return Err(MftScanError::Mft(format!(
                "record {} out of range ({} slots)",
                record, self.total_slots
            )));
        }
        if self.empty_slots.contains(&record) {
            return Err(MftScanError::Mft(format!("record {} is empty", record)));
        }
        if let Some(base) = self.extension_bases.get(&record) {
            return Err(MftScanError::Mft(format!(
                "record {} is an extension of record {}",
                record, base
            )));
        }

        match self.fetch(record)? {
            Some(entry) => Ok(entry),
            None => Err(MftScanError::Mft(format!(
                "record {} is not a base entry",
                record
            ))),
        }
    }

    /// Iterate all base entries in ascending record order
    pub fn iter_entries(&mut self) -> EntryIterator<'_, S> {
        EntryIterator {
            mft: self,
            next_record: 0,
            yielded: 0,
        }
    }

    /// Resolve the full path of an entry by walking FILE_NAME parents up
    /// to the root.
    ///
    /// Returns `(is_orphan, path)` with backslash separators. The chain
    /// ends successfully at parent reference 5 (the NTFS root); the root
    /// entry itself resolves to its own name, i.e. `get_full_path(5)`
    /// yields `(false, ".")`. A sequence mismatch, an unreachable parent,
    /// a parent without FILE_NAME or a parent cycle ends the chain as an
    /// orphan with the path built so far.
    pub fn get_full_path(&mut self, record: u64) -> Result<(bool, String)> {
        let entry = self.get(record)?;
        let mut file_name = entry.main_file_name()?.clone();
        let mut current = record;
        let mut names: Vec<String> = Vec::new();
        let mut orphan = false;

        loop {
            names.push(file_name.name.clone());

            if file_name.parent.record == ROOT_RECORD_NUMBER {
                break;
            }
            if file_name.parent.record == current || names.len() as u64 > self.total_slots {
                // Parent cycle; cannot happen on a consistent volume
                orphan = true;
                break;
            }

            let parent = match self.get(file_name.parent.record) {
                Ok(parent) => parent,
                Err(_) => {
                    orphan = true;
                    break;
                }
            };
            if parent.header.sequence_number != file_name.parent.sequence {
                // The slot was reused since this name was written
                orphan = true;
                break;
            }

            current = file_name.parent.record;
            file_name = match parent.main_file_name() {
                Ok(name) => name.clone(),
                Err(_) => {
                    orphan = true;
                    break;
                }
            };
        }

        names.reverse();
        Ok((orphan, names.join("\\")))
    }
}

/// Iterator over the base entries of an MFT
pub struct EntryIterator<'a, S: Read + Seek> {
    mft: &'a mut Mft<S>,
    next_record: u64,
    yielded: u64,
}

impl<S: Read + Seek> Iterator for EntryIterator<'_, S> {
    type Item = Result<(u64, MftEntry)>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next_record < self.mft.total_slots {
            let record = self.next_record;
            self.next_record += 1;

            match self.mft.fetch(record) {
                Ok(None) => continue,
                Ok(Some(entry)) => {
                    self.yielded += 1;
                    if let Some(valid) = self.mft.valid_entries {
                        if self.yielded > valid {
                            return Some(Err(MftScanError::Mft(format!(
                                "iteration produced more than the {} valid entries",
                                valid
                            ))));
                        }
                    }
                    return Some(Ok((record, entry)));
                }
                Err(error) => return Some(Err(error)),
            }
        }
        None
    }
}
