//! Read-only query engine over a built phrase table.
//!
//! The engine memory-maps the index and the blob, loads the source vocabulary
//! and the symbol maps, and then answers lookups without further allocation on
//! the hot path beyond the decoded result. Everything it holds is immutable, so
//! a single engine can be shared by any number of threads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};
use crate::index::manifest::{ArtifactFiles, TableManifest};
use crate::index::probing::ProbingTable;
use crate::index::source_key;
use crate::phrase::decoder::{LineDecoder, TargetText};
use crate::phrase::encoder::EncodingMode;
use crate::storage::MappedFile;
use crate::symbol::SymbolMaps;
use crate::util::hash::phrase_key;
use crate::vocab::Vocabulary;

/// Settings a reader must agree on with the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub mode: EncodingMode,
    pub num_scores: usize,
    /// Entries longer than this are treated as index corruption.
    pub max_entry_size: u64,
    /// Expected number of index entries, if the caller knows it.
    pub table_size: Option<u64>,
}

impl EngineConfig {
    pub fn from_manifest(manifest: &TableManifest) -> Self {
        EngineConfig {
            mode: manifest.mode,
            num_scores: manifest.num_scores,
            max_entry_size: manifest.max_entry_bytes,
            table_size: Some(manifest.entries),
        }
    }
}

/// Locations of the artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnginePaths {
    pub index: PathBuf,
    pub blob: PathBuf,
    pub vocab: PathBuf,
    /// Directory holding the symbol map files.
    pub symbols: PathBuf,
}

impl EnginePaths {
    pub fn in_dir<P: AsRef<Path>>(dir: P, files: &ArtifactFiles) -> Self {
        let dir = dir.as_ref();
        EnginePaths {
            index: dir.join(&files.index),
            blob: dir.join(&files.blob),
            vocab: dir.join(&files.vocab),
            symbols: dir.join(&files.symbols),
        }
    }
}

/// Result of looking up one source phrase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub found: bool,
    pub targets: Vec<TargetText>,
}

impl QueryResult {
    pub fn miss() -> Self {
        Self::default()
    }
}

/// Memory-mapped phrase table.
#[derive(Debug)]
pub struct QueryEngine {
    index: ProbingTable,
    blob: MappedFile,
    vocabulary: Vocabulary,
    decoder: LineDecoder,
    config: EngineConfig,
}

impl QueryEngine {
    /// Open a table from explicit paths.
    ///
    /// Any mapping already established is released if a later artifact fails
    /// to open.
    pub fn open(paths: &EnginePaths, config: EngineConfig) -> Result<Self> {
        let blob = MappedFile::open(&paths.blob)?;
        let index = ProbingTable::open(&paths.index)?;

        if let Some(expected) = config.table_size
            && expected != index.len()
        {
            return Err(PtableError::invalid_input(format!(
                "Table size {expected} does not match the {} entries in {}",
                index.len(),
                paths.index.display()
            )));
        }

        let vocabulary = Vocabulary::load(&paths.vocab)?;
        let maps = SymbolMaps::load(&paths.symbols)?;
        let decoder = LineDecoder::new(Arc::new(maps), config.mode);

        info!(
            "Opened phrase table {} ({} entries, {} blob bytes, {} source words)",
            paths.blob.display(),
            index.len(),
            blob.len(),
            vocabulary.len()
        );

        Ok(QueryEngine {
            index,
            blob,
            vocabulary,
            decoder,
            config,
        })
    }

    /// Open a table directory written by the builder.
    pub fn open_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let manifest = TableManifest::load(dir)?;
        let paths = EnginePaths::in_dir(dir, &manifest.files);
        Self::open(&paths, EngineConfig::from_manifest(&manifest))
    }

    /// Look up a whitespace-separated source phrase.
    ///
    /// A phrase with a word outside the vocabulary is a miss, as is the empty
    /// phrase.
    pub fn query(&self, phrase: &str) -> Result<QueryResult> {
        match self.vocabulary.ids_for(phrase) {
            Some(ids) if !ids.is_empty() => self.query_ids(&ids),
            _ => Ok(QueryResult::miss()),
        }
    }

    /// Look up a source phrase given as vocabulary ids.
    pub fn query_ids(&self, ids: &[u32]) -> Result<QueryResult> {
        if ids.is_empty() {
            return Ok(QueryResult::miss());
        }
        let Some(record) = self.index.get(phrase_key(ids)) else {
            return Ok(QueryResult::miss());
        };

        if record.length > self.config.max_entry_size {
            return Err(PtableError::index(format!(
                "Entry of {} bytes exceeds the maximum of {}",
                record.length, self.config.max_entry_size
            )));
        }
        let bytes = self.blob.slice(record.offset, record.length).ok_or_else(|| {
            PtableError::index(format!(
                "Entry at offset {} with length {} lies outside the {} byte blob",
                record.offset,
                record.length,
                self.blob.len()
            ))
        })?;

        let targets = self.decoder.full_decode_line(bytes, self.config.num_scores)?;
        Ok(QueryResult {
            found: true,
            targets,
        })
    }

    /// Look up many phrases in parallel. Results keep the input order.
    pub fn query_batch(&self, phrases: &[&str]) -> Vec<Result<QueryResult>> {
        phrases.par_iter().map(|phrase| self.query(phrase)).collect()
    }

    /// Index key of `phrase`, or `None` if a word is unknown.
    pub fn key_for(&self, phrase: &str) -> Option<u64> {
        source_key(&self.vocabulary, phrase)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn decoder(&self) -> &LineDecoder {
        &self.decoder
    }

    /// Number of source phrases.
    pub fn len(&self) -> u64 {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Size of the mapped blob.
    pub fn blob_len(&self) -> usize {
        self.blob.len()
    }
}

impl Drop for QueryEngine {
    fn drop(&mut self) {
        debug!("Releasing phrase table {}", self.blob.path().display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::builder::TableBuilder;
    use crate::phrase::line::PhraseLine;
    use tempfile::TempDir;

    fn build(dir: &Path) {
        let lines = vec![
            PhraseLine::new("das haus", "the house", vec![0.5, 0.25]),
            PhraseLine::new("das haus", "the building", vec![0.125, 1.0]),
            PhraseLine::new("haus", "house", vec![0.75, 0.5]),
        ];
        TableBuilder::default().build_from_lines(&lines, dir).unwrap();
    }

    #[test]
    fn test_query_hit_and_miss() {
        let temp_dir = TempDir::new().unwrap();
        build(temp_dir.path());
        let engine = QueryEngine::open_dir(temp_dir.path()).unwrap();

        let result = engine.query("das haus").unwrap();
        assert!(result.found);
        let texts: Vec<&str> = result.targets.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["the house", "the building"]);
        assert_eq!(result.targets[1].scores, vec![0.125, 1.0]);

        assert!(!engine.query("haus das").unwrap().found);
        assert!(!engine.query("das auto").unwrap().found);
        assert!(!engine.query("").unwrap().found);
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryEngine>();
    }

    #[test]
    fn test_table_size_mismatch() {
        let temp_dir = TempDir::new().unwrap();
        build(temp_dir.path());
        let manifest = TableManifest::load(temp_dir.path()).unwrap();
        let paths = EnginePaths::in_dir(temp_dir.path(), &manifest.files);
        let mut config = EngineConfig::from_manifest(&manifest);
        config.table_size = Some(manifest.entries + 1);

        let result = QueryEngine::open(&paths, config);
        assert!(matches!(result, Err(PtableError::InvalidInput(_))));
    }

    #[test]
    fn test_entry_larger_than_maximum() {
        let temp_dir = TempDir::new().unwrap();
        build(temp_dir.path());
        let manifest = TableManifest::load(temp_dir.path()).unwrap();
        let paths = EnginePaths::in_dir(temp_dir.path(), &manifest.files);
        let mut config = EngineConfig::from_manifest(&manifest);
        config.max_entry_size = 1;

        let engine = QueryEngine::open(&paths, config).unwrap();
        assert!(matches!(engine.query("haus"), Err(PtableError::Index(_))));
        assert!(!engine.query("auto").unwrap().found);
    }
}
