//! Description of a built phrase table.
//!
//! The builder writes `manifest.json` next to the artifacts; the query engine
//! reads it back to learn the encoding mode, the score count and the file
//! names.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};
use crate::phrase::encoder::EncodingMode;

/// Manifest file name inside a table directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Current on-disk format.
pub const FORMAT_VERSION: u32 = 1;

/// File names of the artifacts, relative to the table directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFiles {
    pub blob: String,
    pub index: String,
    pub vocab: String,
    pub symbols: String,
}

impl Default for ArtifactFiles {
    fn default() -> Self {
        ArtifactFiles {
            blob: "phrase_table.bin".to_string(),
            index: "phrase_table.idx".to_string(),
            vocab: "vocab.json".to_string(),
            symbols: "symbols".to_string(),
        }
    }
}

/// Everything a reader needs to know about a built table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableManifest {
    pub format_version: u32,
    pub mode: EncodingMode,
    pub num_scores: usize,
    /// Distinct source phrases.
    pub entries: u64,
    /// Target phrases across all entries.
    pub records: u64,
    pub blob_bytes: u64,
    pub slot_count: u64,
    /// Largest encoded entry.
    pub max_entry_bytes: u64,
    pub files: ArtifactFiles,
}

impl TableManifest {
    /// Write `manifest.json` into `dir`.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let file = File::create(&path).map_err(|e| PtableError::file_open(&path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Read `manifest.json` from `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(MANIFEST_FILE);
        let file = File::open(&path).map_err(|e| PtableError::file_open(&path, e))?;
        let manifest: TableManifest = serde_json::from_reader(BufReader::new(file))?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(PtableError::index(format!(
                "Unsupported table format version: {}",
                manifest.format_version
            )));
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manifest() -> TableManifest {
        TableManifest {
            format_version: FORMAT_VERSION,
            mode: EncodingMode::Phrase,
            num_scores: 4,
            entries: 2,
            records: 3,
            blob_bytes: 40,
            slot_count: 4,
            max_entry_bytes: 25,
            files: ArtifactFiles::default(),
        }
    }

    #[test]
    fn test_save_load() {
        let temp_dir = TempDir::new().unwrap();
        manifest().save(temp_dir.path()).unwrap();
        assert_eq!(TableManifest::load(temp_dir.path()).unwrap(), manifest());
    }

    #[test]
    fn test_rejects_other_versions() {
        let temp_dir = TempDir::new().unwrap();
        let mut future = manifest();
        future.format_version = FORMAT_VERSION + 1;
        future.save(temp_dir.path()).unwrap();
        assert!(matches!(
            TableManifest::load(temp_dir.path()),
            Err(PtableError::Index(_))
        ));
    }
}
