//! On-disk layout of a phrase table: probing index, manifest and builder.

pub mod builder;
pub mod manifest;
pub mod probing;

pub use builder::{BuildConfig, BuildSummary, TableBuilder};
pub use manifest::{ArtifactFiles, MANIFEST_FILE, TableManifest};
pub use probing::{IndexRecord, ProbingTable, ProbingTableBuilder};

use crate::util::hash::phrase_key;
use crate::vocab::Vocabulary;

/// Index key of a source phrase, or `None` if a word is not in `vocabulary`.
///
/// Used by both the builder and the query engine.
pub fn source_key(vocabulary: &Vocabulary, phrase: &str) -> Option<u64> {
    vocabulary.ids_for(phrase).map(|ids| phrase_key(&ids))
}
