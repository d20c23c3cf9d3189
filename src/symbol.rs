//! Frequency-ranked symbol assignment.
//!
//! Target phrases, target word tokens and alignment sets each get their own
//! dense id space. Frequent symbols get small ids, which the varbyte codec then
//! stores in a single byte.

pub mod maps;
pub mod table;

pub use maps::{FIRST_SYMBOL_ID, SEPARATOR, SymbolMap, SymbolMaps};
pub use table::{FrequencyTable, SymbolCounter};
