//! # ptable
//!
//! A compact, memory-mapped phrase table for statistical machine translation.
//!
//! ## Features
//!
//! - Frequency-ranked symbol ids for target phrases, words and alignments
//! - VarByte-compressed records with zero-delimited framing
//! - Linear-probing hash index persisted as a flat file
//! - Memory-mapped, thread-safe lookups
//!
//! ## Example
//!
//! ```no_run
//! use ptable::engine::QueryEngine;
//! use ptable::index::{BuildConfig, TableBuilder};
//!
//! # fn main() -> ptable::error::Result<()> {
//! TableBuilder::new(BuildConfig::default()).build_from_path("phrase-table.txt", "table")?;
//!
//! let engine = QueryEngine::open_dir("table")?;
//! let result = engine.query("das haus")?;
//! for target in &result.targets {
//!     println!("{} {:?}", target.text, target.scores);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod index;
pub mod phrase;
pub mod storage;
pub mod symbol;
pub mod util;
pub mod vocab;

pub mod prelude {
    pub use crate::engine::{EngineConfig, EnginePaths, QueryEngine, QueryResult};
    pub use crate::error::{PtableError, Result};
    pub use crate::index::{BuildConfig, TableBuilder};
    pub use crate::phrase::{EncodingMode, PhraseLine, TargetText};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
