//! Decoding of framed record streams back into target phrases.
//!
//! A stream is a concatenation of records, each closed by its third structural
//! zero. [`FrameState`] tracks where the current record stands; it is created
//! per call, so one [`LineDecoder`] can serve any number of threads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result, SymbolKind};
use crate::phrase::encoder::{EncodingMode, LineEncoder};
use crate::symbol::{SEPARATOR, SymbolMaps};
use crate::util::varint;

/// One decoded target phrase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetText {
    /// Symbol ids of the phrase (one id in phrase mode, one per word otherwise).
    pub words: Vec<u32>,
    /// Resolved text, words separated by single spaces.
    pub text: String,
    /// Scores, bit-exact.
    pub scores: Vec<f32>,
    /// Alignment points flattened as `source_pos, target_pos` pairs.
    pub alignment: Vec<u8>,
}

impl TargetText {
    /// Alignment as `(source_pos, target_pos)` pairs.
    pub fn alignment_pairs(&self) -> Vec<(u8, u8)> {
        self.alignment.chunks_exact(2).map(|p| (p[0], p[1])).collect()
    }
}

/// Result of feeding one value to a [`FrameState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStep {
    /// The current record needs more values.
    Continue,
    /// The value closed the current record.
    RecordComplete,
}

/// Record boundary tracker.
#[derive(Debug, Clone)]
pub struct FrameState {
    num_scores: usize,
    zero_count: u8,
    pending_scores: usize,
}

impl FrameState {
    /// Create a tracker for records carrying `num_scores` scores.
    pub fn new(num_scores: usize) -> Self {
        FrameState {
            num_scores,
            zero_count: 0,
            pending_scores: 0,
        }
    }

    /// Feed the next value of the stream.
    pub fn push(&mut self, value: u32) -> FrameStep {
        if self.pending_scores > 0 {
            // Score bits are opaque, zero or not.
            self.pending_scores -= 1;
            return FrameStep::Continue;
        }

        if value != SEPARATOR {
            return FrameStep::Continue;
        }

        self.zero_count += 1;
        match self.zero_count {
            1 => {
                self.pending_scores = self.num_scores;
                FrameStep::Continue
            }
            3 => {
                self.zero_count = 0;
                FrameStep::RecordComplete
            }
            _ => FrameStep::Continue,
        }
    }

    /// Zeros seen in the current record.
    pub fn zero_count(&self) -> u8 {
        self.zero_count
    }

    /// Score values still to be skipped.
    pub fn pending_scores(&self) -> usize {
        self.pending_scores
    }

    /// Whether the tracker sits between records.
    pub fn at_boundary(&self) -> bool {
        self.zero_count == 0 && self.pending_scores == 0
    }
}

/// Turns encoded entries back into [`TargetText`]s.
#[derive(Debug, Clone)]
pub struct LineDecoder {
    maps: Arc<SymbolMaps>,
    mode: EncodingMode,
}

impl LineDecoder {
    /// Create a decoder over `maps`.
    pub fn new(maps: Arc<SymbolMaps>, mode: EncodingMode) -> Self {
        LineDecoder { maps, mode }
    }

    /// Share the snapshot and mode of an in-process encoder.
    pub fn from_encoder(encoder: &LineEncoder) -> Self {
        LineDecoder::new(Arc::clone(encoder.maps()), encoder.mode())
    }

    pub fn maps(&self) -> &Arc<SymbolMaps> {
        &self.maps
    }

    pub fn mode(&self) -> EncodingMode {
        self.mode
    }

    /// Decode a single complete record.
    pub fn decode_line(&self, record: &[u32], num_scores: usize) -> Result<TargetText> {
        let first = record
            .iter()
            .position(|&value| value == SEPARATOR)
            .ok_or_else(|| PtableError::malformed("record has no separator"))?;
        let words = record[..first].to_vec();

        let scores_end = first + 1 + num_scores;
        let scores = record
            .get(first + 1..scores_end)
            .ok_or_else(|| PtableError::malformed("record ends inside its score block"))?
            .iter()
            .map(|&bits| f32::from_bits(bits))
            .collect();

        let alignment = match &record[scores_end..] {
            [SEPARATOR, SEPARATOR] => Vec::new(),
            [SEPARATOR, id, SEPARATOR] => self
                .maps
                .alignment(*id)
                .ok_or_else(|| PtableError::unresolved(SymbolKind::Alignment, *id))?
                .to_vec(),
            tail => {
                return Err(PtableError::malformed(format!(
                    "unexpected record tail {tail:?}"
                )));
            }
        };

        let text = self.target_words_from_ids(&words)?;

        Ok(TargetText {
            words,
            text,
            scores,
            alignment,
        })
    }

    /// Decode every record of an entry's bytes, in order.
    pub fn full_decode_line(&self, bytes: &[u8], num_scores: usize) -> Result<Vec<TargetText>> {
        let values = varint::decode_line(bytes)?;
        self.decode_values(&values, num_scores)
    }

    /// Decode every record of an already varbyte-decoded stream.
    pub fn decode_values(&self, values: &[u32], num_scores: usize) -> Result<Vec<TargetText>> {
        let mut state = FrameState::new(num_scores);
        let mut record = Vec::new();
        let mut targets = Vec::new();

        for &value in values {
            record.push(value);
            if state.push(value) == FrameStep::RecordComplete {
                targets.push(self.decode_line(&record, num_scores)?);
                record.clear();
            }
        }

        if !record.is_empty() {
            return Err(PtableError::malformed(format!(
                "stream ends inside a record ({} values, {} separators, {} scores pending)",
                record.len(),
                state.zero_count(),
                state.pending_scores()
            )));
        }

        Ok(targets)
    }

    /// Resolve symbol ids and join them with single spaces.
    pub fn target_words_from_ids(&self, ids: &[u32]) -> Result<String> {
        let mut words = Vec::with_capacity(ids.len());
        for &id in ids {
            let word = match self.mode {
                EncodingMode::Phrase => self
                    .maps
                    .phrase(id)
                    .ok_or_else(|| PtableError::unresolved(SymbolKind::Phrase, id))?
                    .to_string(),
                EncodingMode::Words => {
                    let bytes = self
                        .maps
                        .word(id)
                        .ok_or_else(|| PtableError::unresolved(SymbolKind::Word, id))?;
                    String::from_utf8(bytes.to_vec()).map_err(|e| {
                        PtableError::malformed(format!("word id {id} is not valid UTF-8: {e}"))
                    })?
                }
            };
            words.push(word);
        }
        Ok(words.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phrase::line::PhraseLine;

    fn maps() -> Arc<SymbolMaps> {
        Arc::new(
            SymbolMaps::from_parts(
                vec![(1, "the cat".to_string()), (2, "a dog".to_string())],
                (1..=9)
                    .map(|id| match id {
                        2 => (id, b"a".to_vec()),
                        3 => (id, b"dog".to_vec()),
                        5 => (id, b"the".to_vec()),
                        9 => (id, b"cat".to_vec()),
                        _ => (id, format!("w{id}").into_bytes()),
                    })
                    .collect(),
                vec![(1, vec![0, 1, 1, 0])],
            )
            .unwrap(),
        )
    }

    fn codec(mode: EncodingMode) -> (LineEncoder, LineDecoder) {
        let encoder = LineEncoder::new(maps(), mode);
        let decoder = LineDecoder::from_encoder(&encoder);
        (encoder, decoder)
    }

    #[test]
    fn test_frame_state_skips_zero_scores() {
        let mut state = FrameState::new(2);
        assert_eq!(state.push(7), FrameStep::Continue);
        assert_eq!(state.push(0), FrameStep::Continue);
        assert_eq!(state.zero_count(), 1);
        assert_eq!(state.pending_scores(), 2);

        // Both scores are literal zeros.
        assert_eq!(state.push(0), FrameStep::Continue);
        assert_eq!(state.push(0), FrameStep::Continue);
        assert_eq!(state.zero_count(), 1);
        assert_eq!(state.pending_scores(), 0);

        assert_eq!(state.push(0), FrameStep::Continue);
        assert_eq!(state.push(4), FrameStep::Continue);
        assert_eq!(state.push(0), FrameStep::RecordComplete);
        assert!(state.at_boundary());
    }

    #[test]
    fn test_round_trip_keeps_zero_score() {
        let (encoder, decoder) = codec(EncodingMode::Words);
        let line = PhraseLine::new("die katze", "the cat", vec![0.0, -1.5, 3.25]);

        let bytes = encoder.full_encode_line(&line).unwrap();
        let targets = decoder.full_decode_line(&bytes, 3).unwrap();

        assert_eq!(targets.len(), 1);
        let target = &targets[0];
        assert_eq!(target.words, vec![5, 9]);
        assert_eq!(target.text, "the cat");
        let bits: Vec<u32> = target.scores.iter().map(|s| s.to_bits()).collect();
        assert_eq!(bits, vec![0.0f32.to_bits(), (-1.5f32).to_bits(), 3.25f32.to_bits()]);
        assert!(target.alignment.is_empty());
    }

    #[test]
    fn test_multi_record_stream() {
        let (encoder, decoder) = codec(EncodingMode::Words);
        let first = PhraseLine::new("x", "the cat", vec![0.5, 0.0]);
        let second = PhraseLine::new("x", "a dog", vec![0.0, -2.0])
            .with_alignment(&[(0, 1), (1, 0)]);

        let bytes = encoder.encode_entry(&[first, second]).unwrap();
        let targets = decoder.full_decode_line(&bytes, 2).unwrap();

        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].text, "the cat");
        assert_eq!(targets[0].scores, vec![0.5, 0.0]);
        assert_eq!(targets[1].text, "a dog");
        assert_eq!(targets[1].words, vec![2, 3]);
        assert_eq!(targets[1].scores, vec![0.0, -2.0]);
        assert_eq!(targets[1].alignment_pairs(), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_phrase_mode_round_trip() {
        let (encoder, decoder) = codec(EncodingMode::Phrase);
        let line = PhraseLine::new("ein hund", "a dog", vec![1.0]);

        let bytes = encoder.full_encode_line(&line).unwrap();
        let targets = decoder.full_decode_line(&bytes, 1).unwrap();
        assert_eq!(targets[0].words, vec![2]);
        assert_eq!(targets[0].text, "a dog");
    }

    #[test]
    fn test_empty_input() {
        let (_, decoder) = codec(EncodingMode::Words);
        assert!(decoder.full_decode_line(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn test_truncated_stream_is_reported() {
        let (encoder, decoder) = codec(EncodingMode::Words);
        let values = encoder
            .encode_line(&PhraseLine::new("x", "the cat", vec![1.0, 2.0]))
            .unwrap();

        // Drop the closing separator.
        let truncated = &values[..values.len() - 1];
        assert!(matches!(
            decoder.decode_values(truncated, 2),
            Err(PtableError::MalformedFrame(_))
        ));

        // Stop inside the score block.
        assert!(matches!(
            decoder.decode_values(&values[..4], 2),
            Err(PtableError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_unresolved_id_is_reported() {
        let (_, decoder) = codec(EncodingMode::Words);
        let record = [5, 77, 0, 0x3F80_0000, 0, 0];
        assert!(matches!(
            decoder.decode_values(&record, 1),
            Err(PtableError::UnresolvedSymbol { table: SymbolKind::Word, id: 77 })
        ));

        let bad_alignment = [5, 0, 0x3F80_0000, 0, 8, 0];
        assert!(matches!(
            decoder.decode_values(&bad_alignment, 1),
            Err(PtableError::UnresolvedSymbol { table: SymbolKind::Alignment, id: 8 })
        ));
    }

    #[test]
    fn test_overlong_tail_is_malformed() {
        let (_, decoder) = codec(EncodingMode::Words);
        let record = [5, 0, 0x3F80_0000, 0, 1, 1, 0];
        assert!(matches!(
            decoder.decode_line(&record, 1),
            Err(PtableError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_target_words_from_ids() {
        let (_, decoder) = codec(EncodingMode::Words);
        assert_eq!(decoder.target_words_from_ids(&[5, 3]).unwrap(), "the dog");
        assert_eq!(decoder.target_words_from_ids(&[]).unwrap(), "");
        assert!(decoder.target_words_from_ids(&[0]).is_err());
    }

    #[test]
    fn test_invalid_utf8_word_is_reported() {
        let maps = SymbolMaps::from_parts(vec![], vec![(1, vec![0xFF, 0xFE])], vec![]).unwrap();
        let decoder = LineDecoder::new(Arc::new(maps), EncodingMode::Words);
        assert!(matches!(
            decoder.target_words_from_ids(&[1]),
            Err(PtableError::MalformedFrame(_))
        ));
    }
}
