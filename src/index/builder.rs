//! Two-pass construction of a phrase table.
//!
//! The first pass counts symbols and source words. The second pass encodes
//! every line with the resulting ids. Lines sharing a source phrase must be
//! adjacent; each such block becomes one entry of the blob and one record of
//! the probing index.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};
use crate::index::manifest::{ArtifactFiles, FORMAT_VERSION, TableManifest};
use crate::index::probing::{DEFAULT_LOAD_FACTOR, IndexRecord, ProbingTableBuilder};
use crate::index::source_key;
use crate::phrase::encoder::{EncodingMode, LineEncoder};
use crate::phrase::line::{PhraseLine, PhraseTableReader};
use crate::symbol::SymbolCounter;
use crate::vocab::Vocabulary;

/// Options for building a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// How target phrases are turned into symbols.
    pub mode: EncodingMode,
    /// Scores per line; taken from the first line when unset.
    pub num_scores: Option<usize>,
    /// Target load factor of the probing index.
    pub load_factor: f64,
    /// Reject entries that encode to more bytes than this.
    pub max_entry_size: Option<u64>,
    /// Log progress every this many lines (0 disables).
    pub progress_interval: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        BuildConfig {
            mode: EncodingMode::default(),
            num_scores: None,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_entry_size: None,
            progress_interval: 10_000,
        }
    }
}

/// Outcome of a build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSummary {
    pub manifest: TableManifest,
    pub lines: u64,
    pub target_phrases: usize,
    pub word_tokens: usize,
    pub alignments: usize,
    pub vocabulary: usize,
    pub duration_ms: u64,
}

/// Builds the artifact set of a phrase table.
#[derive(Debug, Clone, Default)]
pub struct TableBuilder {
    config: BuildConfig,
}

impl TableBuilder {
    pub fn new(config: BuildConfig) -> Self {
        TableBuilder { config }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build from a phrase-table text file. The file is read twice.
    pub fn build_from_path<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        out_dir: Q,
    ) -> Result<BuildSummary> {
        let input = input.as_ref();
        info!("Building phrase table from {}", input.display());
        self.build(|| PhraseTableReader::open(input), out_dir.as_ref())
    }

    /// Build from lines already in memory.
    pub fn build_from_lines<P: AsRef<Path>>(
        &self,
        lines: &[PhraseLine],
        out_dir: P,
    ) -> Result<BuildSummary> {
        self.build(|| Ok(lines.iter().cloned().map(Ok)), out_dir.as_ref())
    }

    /// Build from any re-openable line source.
    pub fn build<F, I>(&self, mut open: F, out_dir: &Path) -> Result<BuildSummary>
    where
        F: FnMut() -> Result<I>,
        I: Iterator<Item = Result<PhraseLine>>,
    {
        let start_time = Instant::now();

        // Pass 1: counts.
        let mut counter = SymbolCounter::new();
        let mut vocabulary = Vocabulary::new();
        let mut num_scores = self.config.num_scores;
        let mut blocks = 0usize;
        let mut previous_source: Option<String> = None;

        for line in open()? {
            let line = line?;
            check_scores(&mut num_scores, &line)?;
            counter.count_line(&line);
            vocabulary.insert_phrase(&line.source);

            if previous_source.as_deref() != Some(line.source.as_str()) {
                blocks += 1;
                previous_source = Some(line.source.clone());
            }
            self.report_progress("Counting", counter.lines());
        }

        let num_scores = num_scores.unwrap_or(0);
        if counter.lines() == 0 {
            warn!("Phrase table input is empty");
        }
        info!(
            "Counted {} lines: {} target phrases, {} word tokens, {} alignments",
            counter.lines(),
            counter.phrases().len(),
            counter.words().len(),
            counter.alignments().len()
        );

        // Pass 2: encode.
        let maps = Arc::new(counter.assign_values());
        let encoder = LineEncoder::new(Arc::clone(&maps), self.config.mode);

        fs::create_dir_all(out_dir)?;
        let files = ArtifactFiles::default();
        let mut writer = EntryWriter::create(
            &out_dir.join(&files.blob),
            ProbingTableBuilder::new(blocks, self.config.load_factor)?,
            self.config.max_entry_size,
        )?;

        let mut block: Vec<PhraseLine> = Vec::new();
        let mut lines = 0u64;
        for line in open()? {
            let line = line?;
            check_scores(&mut Some(num_scores), &line)?;
            if block.first().is_some_and(|first| first.source != line.source) {
                writer.write_entry(&encoder, &vocabulary, &block)?;
                block.clear();
            }
            block.push(line);
            lines += 1;
            self.report_progress("Encoding", lines);
        }
        if !block.is_empty() {
            writer.write_entry(&encoder, &vocabulary, &block)?;
        }

        if lines != counter.lines() {
            return Err(PtableError::invalid_input(format!(
                "input changed between passes: {} lines, then {lines}",
                counter.lines()
            )));
        }

        let (index, stats) = writer.finish()?;
        index.write_file(out_dir.join(&files.index))?;
        vocabulary.save(out_dir.join(&files.vocab))?;
        maps.save(out_dir.join(&files.symbols))?;

        let manifest = TableManifest {
            format_version: FORMAT_VERSION,
            mode: self.config.mode,
            num_scores,
            entries: index.len() as u64,
            records: stats.records,
            blob_bytes: stats.offset,
            slot_count: index.slot_count() as u64,
            max_entry_bytes: stats.max_entry_bytes,
            files,
        };
        manifest.save(out_dir)?;

        let summary = BuildSummary {
            manifest,
            lines,
            target_phrases: maps.phrases().len(),
            word_tokens: maps.words().len(),
            alignments: maps.alignments().len(),
            vocabulary: vocabulary.len(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        info!(
            "Built {} entries ({} bytes) in {} ms into {}",
            summary.manifest.entries,
            summary.manifest.blob_bytes,
            summary.duration_ms,
            out_dir.display()
        );

        Ok(summary)
    }

    fn report_progress(&self, stage: &str, lines: u64) {
        let interval = self.config.progress_interval;
        if interval > 0 && lines % interval == 0 {
            info!("{stage}: on line {lines}");
        }
    }
}

fn check_scores(expected: &mut Option<usize>, line: &PhraseLine) -> Result<()> {
    match *expected {
        None => {
            *expected = Some(line.scores.len());
            Ok(())
        }
        Some(n) if n == line.scores.len() => Ok(()),
        Some(n) => Err(PtableError::invalid_input(format!(
            "{:?} ||| {:?} has {} scores, expected {n}",
            line.source,
            line.target,
            line.scores.len()
        ))),
    }
}

#[derive(Debug, Default)]
struct EntryStats {
    offset: u64,
    records: u64,
    max_entry_bytes: u64,
}

/// Appends entries to the blob and records them in the index.
struct EntryWriter {
    blob: BufWriter<File>,
    index: ProbingTableBuilder,
    max_entry_size: Option<u64>,
    stats: EntryStats,
}

impl EntryWriter {
    fn create(
        path: &Path,
        index: ProbingTableBuilder,
        max_entry_size: Option<u64>,
    ) -> Result<Self> {
        let file = File::create(path).map_err(|e| PtableError::file_open(path, e))?;
        Ok(EntryWriter {
            blob: BufWriter::new(file),
            index,
            max_entry_size,
            stats: EntryStats::default(),
        })
    }

    fn write_entry(
        &mut self,
        encoder: &LineEncoder,
        vocabulary: &Vocabulary,
        lines: &[PhraseLine],
    ) -> Result<()> {
        let source = &lines[0].source;
        let key = source_key(vocabulary, source).ok_or_else(|| {
            PtableError::invalid_input(format!("source phrase {source:?} was not counted"))
        })?;

        let bytes = encoder.encode_entry(lines)?;
        let length = bytes.len() as u64;
        if let Some(limit) = self.max_entry_size
            && length > limit
        {
            return Err(PtableError::invalid_input(format!(
                "entry for {source:?} is {length} bytes, the limit is {limit}"
            )));
        }

        self.index
            .insert(IndexRecord::new(key, self.stats.offset, length))
            .map_err(|e| match e {
                PtableError::DuplicateKey(_) => PtableError::duplicate(format!(
                    "source phrase {source:?} appears in more than one block or collides with another phrase"
                )),
                other => other,
            })?;
        self.blob.write_all(&bytes)?;

        self.stats.offset += length;
        self.stats.records += lines.len() as u64;
        self.stats.max_entry_bytes = self.stats.max_entry_bytes.max(length);
        Ok(())
    }

    fn finish(mut self) -> Result<(ProbingTableBuilder, EntryStats)> {
        self.blob.flush()?;
        self.blob.get_ref().sync_all()?;
        Ok((self.index, self.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::manifest::MANIFEST_FILE;
    use tempfile::TempDir;

    fn lines() -> Vec<PhraseLine> {
        vec![
            PhraseLine::new("a b", "x y", vec![0.5, 0.25]),
            PhraseLine::new("a b", "x", vec![0.0, 1.0]),
            PhraseLine::new("c d", "y", vec![-1.0, 2.0]),
        ]
    }

    #[test]
    fn test_build_writes_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let summary = TableBuilder::default()
            .build_from_lines(&lines(), temp_dir.path())
            .unwrap();

        assert_eq!(summary.lines, 3);
        assert_eq!(summary.manifest.entries, 2);
        assert_eq!(summary.manifest.records, 3);
        assert_eq!(summary.manifest.num_scores, 2);
        assert_eq!(summary.word_tokens, 2);
        assert_eq!(summary.vocabulary, 4);

        let files = &summary.manifest.files;
        let blob_len = fs::metadata(temp_dir.path().join(&files.blob)).unwrap().len();
        assert_eq!(blob_len, summary.manifest.blob_bytes);
        assert!(temp_dir.path().join(&files.index).exists());
        assert!(temp_dir.path().join(&files.vocab).exists());
        assert!(temp_dir.path().join(&files.symbols).is_dir());
        assert!(temp_dir.path().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn test_inconsistent_score_count() {
        let temp_dir = TempDir::new().unwrap();
        let mut input = lines();
        input.push(PhraseLine::new("e", "z", vec![1.0]));
        let result = TableBuilder::default().build_from_lines(&input, temp_dir.path());
        assert!(matches!(result, Err(PtableError::InvalidInput(_))));
    }

    #[test]
    fn test_configured_score_count_is_enforced() {
        let temp_dir = TempDir::new().unwrap();
        let config = BuildConfig {
            num_scores: Some(3),
            ..BuildConfig::default()
        };
        let result = TableBuilder::new(config).build_from_lines(&lines(), temp_dir.path());
        assert!(matches!(result, Err(PtableError::InvalidInput(_))));
    }

    #[test]
    fn test_entry_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let config = BuildConfig {
            max_entry_size: Some(4),
            ..BuildConfig::default()
        };
        let result = TableBuilder::new(config).build_from_lines(&lines(), temp_dir.path());
        assert!(matches!(result, Err(PtableError::InvalidInput(_))));
    }

    #[test]
    fn test_split_source_block_is_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let mut input = lines();
        input.push(PhraseLine::new("a b", "z", vec![1.0, 1.0]));
        let result = TableBuilder::default().build_from_lines(&input, temp_dir.path());
        assert!(matches!(result, Err(PtableError::DuplicateKey(_))));
    }

    #[test]
    fn test_empty_input() {
        let temp_dir = TempDir::new().unwrap();
        let summary = TableBuilder::default()
            .build_from_lines(&[], temp_dir.path())
            .unwrap();
        assert_eq!(summary.manifest.entries, 0);
        assert_eq!(summary.manifest.blob_bytes, 0);
    }
}
