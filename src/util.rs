//! Shared utility modules used across ptable components.

pub mod hash;
pub mod varint;
