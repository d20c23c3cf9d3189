//! Storage primitives for built phrase tables.
//!
//! Built artifacts are immutable. They are written once by the builder with
//! plain buffered writers and read back through read-only memory maps.

pub mod mmap;
pub mod structured;

pub use mmap::MappedFile;
pub use structured::{StructReader, StructWriter};
