//! Structured binary I/O for fixed-layout headers and records.
//!
//! Values are little-endian. Writers and readers track the number of bytes
//! they have processed so callers can pad or verify fixed-size regions.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::Result;

/// A structured writer for binary data.
pub struct StructWriter<W: Write> {
    writer: W,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured writer.
    pub fn new(writer: W) -> Self {
        StructWriter {
            writer,
            position: 0,
        }
    }

    /// Write a u32 value (little-endian).
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_u32::<LittleEndian>(value)?;
        self.position += 4;
        Ok(())
    }

    /// Write a u64 value (little-endian).
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_u64::<LittleEndian>(value)?;
        self.position += 8;
        Ok(())
    }

    /// Write raw bytes without length prefix.
    pub fn write_raw(&mut self, value: &[u8]) -> Result<()> {
        self.writer.write_all(value)?;
        self.position += value.len() as u64;
        Ok(())
    }

    /// Get current position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// A structured reader for binary data.
pub struct StructReader<R: Read> {
    reader: R,
    position: u64,
}

impl<R: Read> StructReader<R> {
    /// Create a new structured reader.
    pub fn new(reader: R) -> Self {
        StructReader {
            reader,
            position: 0,
        }
    }

    /// Read a u32 value (little-endian).
    pub fn read_u32(&mut self) -> Result<u32> {
        let value = self.reader.read_u32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    /// Read a u64 value (little-endian).
    pub fn read_u64(&mut self) -> Result<u64> {
        let value = self.reader.read_u64::<LittleEndian>()?;
        self.position += 8;
        Ok(value)
    }

    /// Get current position.
    pub fn position(&self) -> u64 {
        self.position
    }
}
