//! Source vocabulary: word strings to integer ids.
//!
//! Source phrases are keyed by the ids of their words. The builder assigns ids
//! in first-seen order; the query engine only reads the persisted mapping.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};

/// Mapping from source words to ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vocabulary {
    ids: AHashMap<String, u32>,
}

impl Vocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `word`, assigning the next free id if it is new.
    pub fn insert(&mut self, word: &str) -> u32 {
        if let Some(&id) = self.ids.get(word) {
            return id;
        }
        let id = self.ids.len() as u32;
        self.ids.insert(word.to_string(), id);
        id
    }

    /// Id of `word`.
    pub fn get(&self, word: &str) -> Option<u32> {
        self.ids.get(word).copied()
    }

    /// Ids of every word of `phrase`, or `None` if any word is unknown.
    pub fn ids_for(&self, phrase: &str) -> Option<Vec<u32>> {
        phrase.split_whitespace().map(|word| self.get(word)).collect()
    }

    /// Assign ids to every word of `phrase` and return them.
    pub fn insert_phrase(&mut self, phrase: &str) -> Vec<u32> {
        phrase
            .split_whitespace()
            .map(|word| self.insert(word))
            .collect()
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Write the vocabulary as a JSON object.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| PtableError::file_open(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read a vocabulary written by [`Vocabulary::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PtableError::file_open(path, e))?;
        let vocabulary: Vocabulary = serde_json::from_reader(BufReader::new(file))?;
        debug!("Loaded {} vocabulary entries from {}", vocabulary.len(), path.display());
        Ok(vocabulary)
    }
}
