//! Phrase-table records: parsing, encoding and decoding.

pub mod decoder;
pub mod encoder;
pub mod line;

pub use decoder::{FrameState, FrameStep, LineDecoder, TargetText};
pub use encoder::{EncodingMode, LineEncoder};
pub use line::{PhraseLine, PhraseTableReader};
