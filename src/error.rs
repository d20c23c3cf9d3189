//! Error types for the ptable library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`PtableError`] enum. Lookup misses are not errors: a query that finds
//! nothing returns a [`crate::engine::QueryResult`] with `found == false`.
//!
//! # Examples
//!
//! ```
//! use ptable::error::{PtableError, Result};
//!
//! fn example_operation() -> Result<()> {
//!     Err(PtableError::invalid_input("missing ||| separator"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifies which symbol table an id or symbol belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// Whole target phrases.
    Phrase,
    /// Individual target word tokens.
    Word,
    /// Word-alignment point sets.
    Alignment,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SymbolKind::Phrase => "target phrase",
            SymbolKind::Word => "word token",
            SymbolKind::Alignment => "alignment",
        };
        f.write_str(name)
    }
}

/// The main error type for ptable operations.
#[derive(Error, Debug)]
pub enum PtableError {
    /// I/O errors that are not tied to opening a specific artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An artifact could not be opened, sized or mapped.
    #[error("Failed to open {}: {source}", path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The line reader has no more lines. Expected at the end of a build pass.
    #[error("End of input")]
    EndOfInput,

    /// A decoded id has no entry in the inverse symbol map.
    #[error("Unresolved {table} id {id}")]
    UnresolvedSymbol { table: SymbolKind, id: u32 },

    /// The encoder met a symbol that was never counted.
    #[error("Unknown {table}: {symbol:?}")]
    UnknownSymbol { table: SymbolKind, symbol: String },

    /// Truncated or corrupt record framing or varbyte stream.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A source phrase (or its hash key) was inserted twice.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Corrupt index file or index record.
    #[error("Index error: {0}")]
    Index(String),

    /// Unparsable input or inconsistent configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for operations that may fail with PtableError.
pub type Result<T> = std::result::Result<T, PtableError>;

impl PtableError {
    /// Create a new file open error.
    pub fn file_open<P: AsRef<Path>>(path: P, source: io::Error) -> Self {
        PtableError::FileOpen {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a new unresolved symbol error.
    pub fn unresolved(table: SymbolKind, id: u32) -> Self {
        PtableError::UnresolvedSymbol { table, id }
    }

    /// Create a new unknown symbol error.
    pub fn unknown<S: Into<String>>(table: SymbolKind, symbol: S) -> Self {
        PtableError::UnknownSymbol {
            table,
            symbol: symbol.into(),
        }
    }

    /// Create a new malformed frame error.
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        PtableError::MalformedFrame(msg.into())
    }

    /// Create a new duplicate key error.
    pub fn duplicate<S: Into<String>>(msg: S) -> Self {
        PtableError::DuplicateKey(msg.into())
    }

    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        PtableError::Index(msg.into())
    }

    /// Create a new invalid input error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        PtableError::InvalidInput(msg.into())
    }

    /// Whether this error only signals that the input is exhausted.
    pub fn is_end_of_input(&self) -> bool {
        matches!(self, PtableError::EndOfInput)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = PtableError::index("bad magic");
        assert_eq!(error.to_string(), "Index error: bad magic");

        let error = PtableError::unresolved(SymbolKind::Word, 42);
        assert_eq!(error.to_string(), "Unresolved word token id 42");

        let error = PtableError::malformed("trailing bytes");
        assert_eq!(error.to_string(), "Malformed frame: trailing bytes");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let ptable_error = PtableError::from(io_error);

        match ptable_error {
            PtableError::Io(_) => {} // Expected
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_file_open_mentions_path() {
        let error = PtableError::file_open(
            "/missing/phrase_table.bin",
            io::Error::new(io::ErrorKind::NotFound, "No such file"),
        );
        assert!(error.to_string().contains("/missing/phrase_table.bin"));
        assert!(!error.is_end_of_input());
        assert!(PtableError::EndOfInput.is_end_of_input());
    }
}
