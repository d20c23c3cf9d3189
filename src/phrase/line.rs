//! Phrase-table lines and a reader over phrase-table text files.
//!
//! Lines use the Moses layout:
//!
//! ```text
//! source words ||| target words ||| score score ... ||| 0-0 1-1 ||| ...
//! ```
//!
//! The alignment field is optional; anything after it is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PtableError, Result};

/// Field separator of phrase-table lines.
pub const FIELD_SEPARATOR: &str = "|||";

/// One parsed phrase-table line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseLine {
    /// Source phrase, words separated by single spaces.
    pub source: String,
    /// Target phrase, words separated by single spaces.
    pub target: String,
    /// Translation scores.
    pub scores: Vec<f32>,
    /// Alignment points flattened as `source_pos, target_pos` pairs.
    pub alignment: Vec<u8>,
}

impl PhraseLine {
    /// Create a line without alignment information.
    pub fn new(source: &str, target: &str, scores: Vec<f32>) -> Self {
        PhraseLine {
            source: normalize(source),
            target: normalize(target),
            scores,
            alignment: Vec::new(),
        }
    }

    /// Attach alignment pairs.
    pub fn with_alignment(mut self, pairs: &[(u8, u8)]) -> Self {
        self.alignment = pairs.iter().flat_map(|&(s, t)| [s, t]).collect();
        self
    }

    /// Parse one line of phrase-table text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut fields = text.split(FIELD_SEPARATOR).map(str::trim);

        let source = fields
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PtableError::invalid_input(format!("missing source phrase: {text:?}")))?;
        let target = fields
            .next()
            .ok_or_else(|| PtableError::invalid_input(format!("missing target phrase: {text:?}")))?;
        let scores = fields
            .next()
            .ok_or_else(|| PtableError::invalid_input(format!("missing scores: {text:?}")))?;

        let scores = scores
            .split_whitespace()
            .map(|s| {
                s.parse::<f32>()
                    .map_err(|e| PtableError::invalid_input(format!("bad score {s:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let alignment = match fields.next() {
            Some(field) => parse_alignment(field)?,
            None => Vec::new(),
        };

        Ok(PhraseLine {
            source: normalize(source),
            target: normalize(target),
            scores,
            alignment,
        })
    }

    /// Source words.
    pub fn source_words(&self) -> impl Iterator<Item = &str> {
        self.source.split(' ').filter(|w| !w.is_empty())
    }

    /// Target words.
    pub fn target_words(&self) -> impl Iterator<Item = &str> {
        self.target.split(' ').filter(|w| !w.is_empty())
    }

    /// Alignment as `(source_pos, target_pos)` pairs.
    pub fn alignment_pairs(&self) -> Vec<(u8, u8)> {
        self.alignment.chunks_exact(2).map(|p| (p[0], p[1])).collect()
    }
}

fn normalize(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_alignment(field: &str) -> Result<Vec<u8>> {
    let mut points = Vec::new();
    for point in field.split_whitespace() {
        let (s, t) = point
            .split_once('-')
            .ok_or_else(|| PtableError::invalid_input(format!("bad alignment point {point:?}")))?;
        for pos in [s, t] {
            let pos = pos.parse::<u8>().map_err(|e| {
                PtableError::invalid_input(format!("bad alignment point {point:?}: {e}"))
            })?;
            points.push(pos);
        }
    }
    Ok(points)
}

/// Sequential reader over a phrase-table text file.
pub struct PhraseTableReader<R: BufRead> {
    reader: R,
    buffer: String,
    line_number: u64,
}

impl PhraseTableReader<BufReader<File>> {
    /// Open a phrase-table file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| PtableError::file_open(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> PhraseTableReader<R> {
    /// Wrap any buffered reader.
    pub fn new(reader: R) -> Self {
        PhraseTableReader {
            reader,
            buffer: String::new(),
            line_number: 0,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// Read the next non-blank line.
    ///
    /// Returns [`PtableError::EndOfInput`] once the input is exhausted.
    pub fn read_line(&mut self) -> Result<PhraseLine> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Err(PtableError::EndOfInput);
            }
            self.line_number += 1;

            let text = self.buffer.trim();
            if text.is_empty() {
                continue;
            }

            return PhraseLine::parse(text).map_err(|e| match e {
                PtableError::InvalidInput(msg) => {
                    PtableError::invalid_input(format!("line {}: {msg}", self.line_number))
                }
                other => other,
            });
        }
    }
}

impl<R: BufRead> Iterator for PhraseTableReader<R> {
    type Item = Result<PhraseLine>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_line() {
            Err(e) if e.is_end_of_input() => None,
            other => Some(other),
        }
    }
}
