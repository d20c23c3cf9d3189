//! Immutable symbol ↔ id snapshots.
//!
//! Id `0` is the record separator of the encoded stream, so real symbols are
//! numbered from [`FIRST_SYMBOL_ID`]. A [`SymbolMaps`] value is built once,
//! either by [`crate::symbol::SymbolCounter::assign_values`] or by loading the
//! persisted maps, and then shared read-only by the encoder and the decoder.

use std::borrow::Borrow;
use std::fmt::Debug;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{PtableError, Result, SymbolKind};

/// Reserved separator value.
pub const SEPARATOR: u32 = 0;

/// Smallest id handed to a real symbol.
pub const FIRST_SYMBOL_ID: u32 = 1;

/// File holding the target phrase map.
pub const PHRASES_FILE: &str = "target_phrases.json";
/// File holding the word token map.
pub const WORDS_FILE: &str = "word_tokens.json";
/// File holding the alignment map.
pub const ALIGNMENTS_FILE: &str = "alignments.json";

/// Bidirectional map between one kind of symbol and its ids.
#[derive(Debug, Clone)]
pub struct SymbolMap<K> {
    forward: AHashMap<K, u32>,
    /// Indexed by id; slot 0 is always empty.
    inverse: Vec<Option<K>>,
}

impl<K: Hash + Eq + Clone> SymbolMap<K> {
    /// Create an empty map.
    pub fn new() -> Self {
        SymbolMap {
            forward: AHashMap::new(),
            inverse: vec![None],
        }
    }

    /// Number ranked symbols densely from [`FIRST_SYMBOL_ID`].
    pub(crate) fn from_ranked<I: IntoIterator<Item = K>>(ranked: I) -> Self {
        let mut map = Self::new();
        for symbol in ranked {
            let id = map.inverse.len() as u32;
            map.forward.insert(symbol.clone(), id);
            map.inverse.push(Some(symbol));
        }
        map
    }

    /// Build from explicit `(id, symbol)` assignments.
    ///
    /// Ids must be dense from [`FIRST_SYMBOL_ID`]. Rejects the separator id,
    /// ids beyond the entry count and duplicate ids or symbols.
    pub fn from_entries<I>(kind: SymbolKind, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, K)>,
        K: Debug,
    {
        let entries: Vec<(u32, K)> = entries.into_iter().collect();
        let max_id = FIRST_SYMBOL_ID as usize + entries.len();

        let mut map = Self::new();
        map.inverse.resize(max_id, None);
        for (id, symbol) in entries {
            if id == SEPARATOR {
                return Err(PtableError::invalid_input(format!(
                    "{kind} {symbol:?} uses reserved id {SEPARATOR}"
                )));
            }
            let slot = id as usize;
            if slot >= max_id {
                return Err(PtableError::invalid_input(format!(
                    "{kind} id {id} is out of range for {} symbols",
                    max_id - FIRST_SYMBOL_ID as usize
                )));
            }
            if map.inverse[slot].is_some() {
                return Err(PtableError::invalid_input(format!(
                    "{kind} id {id} assigned twice"
                )));
            }
            if map.forward.insert(symbol.clone(), id).is_some() {
                return Err(PtableError::invalid_input(format!(
                    "{kind} {symbol:?} assigned twice"
                )));
            }
            map.inverse[slot] = Some(symbol);
        }
        Ok(map)
    }

    /// Id of `symbol`.
    pub fn id<Q>(&self, symbol: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.forward.get(symbol).copied()
    }

    /// Symbol with id `id`.
    pub fn symbol(&self, id: u32) -> Option<&K> {
        self.inverse.get(id as usize).and_then(Option::as_ref)
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// `(id, symbol)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &K)> {
        self.inverse
            .iter()
            .enumerate()
            .filter_map(|(id, symbol)| symbol.as_ref().map(|s| (id as u32, s)))
    }
}

impl<K: Hash + Eq + Clone> Default for SymbolMap<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete id snapshot of a phrase table.
#[derive(Debug, Clone, Default)]
pub struct SymbolMaps {
    phrases: SymbolMap<String>,
    words: SymbolMap<Vec<u8>>,
    alignments: SymbolMap<Vec<u8>>,
}

impl SymbolMaps {
    /// Bundle already-built maps.
    pub fn new(
        phrases: SymbolMap<String>,
        words: SymbolMap<Vec<u8>>,
        alignments: SymbolMap<Vec<u8>>,
    ) -> Self {
        SymbolMaps {
            phrases,
            words,
            alignments,
        }
    }

    /// Build from explicit id assignments, as read back from disk.
    pub fn from_parts(
        phrases: Vec<(u32, String)>,
        words: Vec<(u32, Vec<u8>)>,
        alignments: Vec<(u32, Vec<u8>)>,
    ) -> Result<Self> {
        Ok(SymbolMaps {
            phrases: SymbolMap::from_entries(SymbolKind::Phrase, phrases)?,
            words: SymbolMap::from_entries(SymbolKind::Word, words)?,
            alignments: SymbolMap::from_entries(SymbolKind::Alignment, alignments)?,
        })
    }

    pub fn phrases(&self) -> &SymbolMap<String> {
        &self.phrases
    }

    pub fn words(&self) -> &SymbolMap<Vec<u8>> {
        &self.words
    }

    pub fn alignments(&self) -> &SymbolMap<Vec<u8>> {
        &self.alignments
    }

    pub fn phrase_id(&self, phrase: &str) -> Option<u32> {
        self.phrases.id(phrase)
    }

    pub fn word_id(&self, word: &[u8]) -> Option<u32> {
        self.words.id(word)
    }

    pub fn alignment_id(&self, alignment: &[u8]) -> Option<u32> {
        self.alignments.id(alignment)
    }

    pub fn phrase(&self, id: u32) -> Option<&str> {
        self.phrases.symbol(id).map(String::as_str)
    }

    pub fn word(&self, id: u32) -> Option<&[u8]> {
        self.words.symbol(id).map(Vec::as_slice)
    }

    pub fn alignment(&self, id: u32) -> Option<&[u8]> {
        self.alignments.symbol(id).map(Vec::as_slice)
    }

    /// Write every map as JSON `[id, symbol]` pairs under `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        write_map(&dir.join(PHRASES_FILE), &self.phrases)?;
        write_map(&dir.join(WORDS_FILE), &self.words)?;
        write_map(&dir.join(ALIGNMENTS_FILE), &self.alignments)?;

        debug!(
            "Saved symbol maps to {} ({} phrases, {} words, {} alignments)",
            dir.display(),
            self.phrases.len(),
            self.words.len(),
            self.alignments.len()
        );
        Ok(())
    }

    /// Read maps written by [`SymbolMaps::save`].
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        Self::from_parts(
            read_entries(&dir.join(PHRASES_FILE))?,
            read_entries(&dir.join(WORDS_FILE))?,
            read_entries(&dir.join(ALIGNMENTS_FILE))?,
        )
    }
}

fn write_map<K: Hash + Eq + Clone + Serialize>(path: &Path, map: &SymbolMap<K>) -> Result<()> {
    let file = File::create(path).map_err(|e| PtableError::file_open(path, e))?;
    let mut writer = BufWriter::new(file);
    let entries: Vec<(u32, &K)> = map.iter().collect();
    serde_json::to_writer(&mut writer, &entries)?;
    writer.flush()?;
    Ok(())
}

fn read_entries<K: DeserializeOwned>(path: &Path) -> Result<Vec<(u32, K)>> {
    let file = File::open(path).map_err(|e| PtableError::file_open(path, e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
