//! Persisted open-addressing hash table from phrase keys to blob ranges.
//!
//! File layout (little-endian):
//!
//! ```text
//! header (32 B): magic u32 | version u32 | slots u64 | entries u64 | crc32 u32 | reserved u32
//! slots  (24 B each): key u64 | offset u64 | length u64
//! ```
//!
//! The slot count is a power of two and collisions are resolved by linear
//! probing. A slot whose key is [`EMPTY_KEY`] is free. The reader probes the
//! memory-mapped slot array in place.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};
use crate::storage::{MappedFile, StructReader, StructWriter};
use crate::util::hash::EMPTY_KEY;

/// "PTIX"
pub const INDEX_MAGIC: u32 = u32::from_le_bytes(*b"PTIX");
pub const INDEX_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 32;
pub const SLOT_SIZE: usize = 24;
pub const DEFAULT_LOAD_FACTOR: f64 = 0.7;

/// Location of one entry in the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndexRecord {
    pub key: u64,
    pub offset: u64,
    pub length: u64,
}

impl IndexRecord {
    pub fn new(key: u64, offset: u64, length: u64) -> Self {
        IndexRecord {
            key,
            offset,
            length,
        }
    }
}

fn slots_for(entries: usize, load_factor: f64) -> usize {
    let needed = ((entries as f64) / load_factor).ceil() as usize;
    needed.max(1).next_power_of_two()
}

/// In-memory table filled during a build and written out once.
#[derive(Debug, Clone)]
pub struct ProbingTableBuilder {
    slots: Vec<IndexRecord>,
    entries: usize,
    load_factor: f64,
}

impl ProbingTableBuilder {
    /// Create a table sized for `expected_entries` at `load_factor`.
    pub fn new(expected_entries: usize, load_factor: f64) -> Result<Self> {
        if !(load_factor > 0.0 && load_factor < 1.0) {
            return Err(PtableError::invalid_input(format!(
                "load factor must be in (0, 1), got {load_factor}"
            )));
        }
        Ok(ProbingTableBuilder {
            slots: vec![IndexRecord::default(); slots_for(expected_entries, load_factor)],
            entries: 0,
            load_factor,
        })
    }

    /// Insert a record. An existing key is rejected.
    pub fn insert(&mut self, record: IndexRecord) -> Result<()> {
        if record.key == EMPTY_KEY {
            return Err(PtableError::index("the empty-slot key cannot be inserted"));
        }
        if (self.entries + 1) as f64 > self.slots.len() as f64 * self.load_factor {
            self.grow();
        }

        let slot = self.probe(record.key);
        if self.slots[slot].key == record.key {
            return Err(PtableError::duplicate(format!("key {:#018x}", record.key)));
        }
        self.slots[slot] = record;
        self.entries += 1;
        Ok(())
    }

    /// Slot holding `key`, or the free slot where it would go.
    fn probe(&self, key: u64) -> usize {
        let mask = self.slots.len() - 1;
        let mut idx = (key as usize) & mask;
        loop {
            let stored = self.slots[idx].key;
            if stored == EMPTY_KEY || stored == key {
                return idx;
            }
            idx = (idx + 1) & mask;
        }
    }

    fn grow(&mut self) {
        let old = std::mem::replace(
            &mut self.slots,
            vec![IndexRecord::default(); slots_for(self.entries + 1, self.load_factor).max(2)],
        );
        for record in old.into_iter().filter(|r| r.key != EMPTY_KEY) {
            let slot = self.probe(record.key);
            self.slots[slot] = record;
        }
    }

    /// Look up a key before the table is written.
    pub fn get(&self, key: u64) -> Option<IndexRecord> {
        if key == EMPTY_KEY {
            return None;
        }
        let record = self.slots[self.probe(key)];
        (record.key == key).then_some(record)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of slots.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Serialize header and slots.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut region = Vec::with_capacity(self.slots.len() * SLOT_SIZE);
        let mut slot = [0u8; SLOT_SIZE];
        for record in &self.slots {
            LittleEndian::write_u64(&mut slot[0..8], record.key);
            LittleEndian::write_u64(&mut slot[8..16], record.offset);
            LittleEndian::write_u64(&mut slot[16..24], record.length);
            region.extend_from_slice(&slot);
        }

        let mut writer = StructWriter::new(writer);
        writer.write_u32(INDEX_MAGIC)?;
        writer.write_u32(INDEX_VERSION)?;
        writer.write_u64(self.slots.len() as u64)?;
        writer.write_u64(self.entries as u64)?;
        writer.write_u32(crc32fast::hash(&region))?;
        writer.write_u32(0)?;
        debug_assert_eq!(writer.position(), HEADER_SIZE as u64);
        writer.write_raw(&region)?;
        writer.finish()
    }

    /// Write the table to `path`.
    pub fn write_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PtableError::file_open(path, e))?;
        let mut writer = self.write_to(BufWriter::new(file))?;
        writer.flush()?;
        debug!(
            "Wrote index {} ({} entries, {} slots)",
            path.display(),
            self.entries,
            self.slots.len()
        );
        Ok(())
    }
}

/// Read-only view of a persisted table.
#[derive(Debug)]
pub struct ProbingTable {
    file: MappedFile,
    slot_count: u64,
    entries: u64,
}

impl ProbingTable {
    /// Map and validate an index file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = MappedFile::open(path)?;
        let bytes = file.as_slice();
        if bytes.len() < HEADER_SIZE {
            return Err(PtableError::index(format!(
                "{} is too short for an index header",
                file.path().display()
            )));
        }

        let mut header = StructReader::new(&bytes[..HEADER_SIZE]);
        let magic = header.read_u32()?;
        if magic != INDEX_MAGIC {
            return Err(PtableError::index("Invalid index magic number"));
        }
        let version = header.read_u32()?;
        if version != INDEX_VERSION {
            return Err(PtableError::index(format!(
                "Unsupported index version: {version}"
            )));
        }
        let slot_count = header.read_u64()?;
        let entries = header.read_u64()?;
        let checksum = header.read_u32()?;

        if slot_count == 0 || !slot_count.is_power_of_two() || entries >= slot_count {
            return Err(PtableError::index(format!(
                "Inconsistent index header: {slot_count} slots, {entries} entries"
            )));
        }
        let expected_len = (slot_count as u128) * (SLOT_SIZE as u128) + HEADER_SIZE as u128;
        if bytes.len() as u128 != expected_len {
            return Err(PtableError::index(format!(
                "Index file is {} bytes, header describes {expected_len}",
                bytes.len()
            )));
        }
        if crc32fast::hash(&bytes[HEADER_SIZE..]) != checksum {
            return Err(PtableError::index("Index checksum mismatch"));
        }

        debug!(
            "Opened index {} ({entries} entries, {slot_count} slots)",
            file.path().display()
        );

        Ok(ProbingTable {
            file,
            slot_count,
            entries,
        })
    }

    #[inline]
    fn slot(&self, idx: u64) -> IndexRecord {
        let base = HEADER_SIZE + idx as usize * SLOT_SIZE;
        let raw = &self.file[base..base + SLOT_SIZE];
        IndexRecord {
            key: LittleEndian::read_u64(&raw[0..8]),
            offset: LittleEndian::read_u64(&raw[8..16]),
            length: LittleEndian::read_u64(&raw[16..24]),
        }
    }

    /// Look up `key`.
    pub fn get(&self, key: u64) -> Option<IndexRecord> {
        if key == EMPTY_KEY {
            return None;
        }
        let mask = self.slot_count - 1;
        let mut idx = key & mask;
        // At least one slot is free, but never probe more than the table holds.
        for _ in 0..self.slot_count {
            let record = self.slot(idx);
            if record.key == EMPTY_KEY {
                return None;
            }
            if record.key == key {
                return Some(record);
            }
            idx = (idx + 1) & mask;
        }
        None
    }

    /// Number of records.
    pub fn len(&self) -> u64 {
        self.entries
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of slots.
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }
}
