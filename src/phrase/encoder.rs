//! Encoding of phrase-table lines into framed integer streams.
//!
//! One target phrase becomes one record:
//!
//! ```text
//! symbol ids ... 0 score bits x num_scores 0 [alignment id] 0
//! ```
//!
//! Scores are stored as the raw bit patterns of their `f32` values, so a
//! record may contain literal zeros inside its score block. The decoder skips
//! over the block by length instead of counting those zeros.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result, SymbolKind};
use crate::phrase::line::PhraseLine;
use crate::symbol::{SEPARATOR, SymbolMaps};
use crate::util::varint;

/// How the symbol portion of a record is encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// The whole target phrase is a single symbol.
    Phrase,
    /// Every target word is its own symbol.
    #[default]
    Words,
}

/// Turns parsed lines into records using a fixed symbol snapshot.
#[derive(Debug, Clone)]
pub struct LineEncoder {
    maps: Arc<SymbolMaps>,
    mode: EncodingMode,
}

impl LineEncoder {
    /// Create an encoder over `maps`.
    pub fn new(maps: Arc<SymbolMaps>, mode: EncodingMode) -> Self {
        LineEncoder { maps, mode }
    }

    /// The symbol snapshot used for encoding.
    pub fn maps(&self) -> &Arc<SymbolMaps> {
        &self.maps
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Encode one line as a framed record.
    pub fn encode_line(&self, line: &PhraseLine) -> Result<Vec<u32>> {
        let mut values = Vec::with_capacity(line.scores.len() + 8);

        match self.mode {
            EncodingMode::Phrase => {
                let id = self
                    .maps
                    .phrase_id(&line.target)
                    .ok_or_else(|| PtableError::unknown(SymbolKind::Phrase, line.target.as_str()))?;
                values.push(id);
            }
            EncodingMode::Words => {
                for word in line.target_words() {
                    let id = self
                        .maps
                        .word_id(word.as_bytes())
                        .ok_or_else(|| PtableError::unknown(SymbolKind::Word, word))?;
                    values.push(id);
                }
            }
        }
        values.push(SEPARATOR);

        values.extend(line.scores.iter().map(|score| score.to_bits()));
        values.push(SEPARATOR);

        if !line.alignment.is_empty() {
            let id = self.maps.alignment_id(&line.alignment).ok_or_else(|| {
                PtableError::unknown(SymbolKind::Alignment, format!("{:?}", line.alignment))
            })?;
            values.push(id);
        }
        values.push(SEPARATOR);

        Ok(values)
    }

    /// Encode one line and varbyte-serialize it.
    pub fn full_encode_line(&self, line: &PhraseLine) -> Result<Vec<u8>> {
        Ok(varint::encode_line(&self.encode_line(line)?))
    }

    /// Encode all target phrases of one source phrase back to back.
    pub fn encode_entry(&self, lines: &[PhraseLine]) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        for line in lines {
            for value in self.encode_line(line)? {
                varint::push_u32(&mut bytes, value);
            }
        }
        Ok(bytes)
    }
}
