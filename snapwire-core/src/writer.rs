/*!
Serializes value trees into the snapwire byte stream.
*/

use std::io::Write;

use crate::compression::CompressionAdapter;
use crate::error::BindingKey;
use crate::framing::{self, Marker};
use crate::registry::{TypeBinding, TypeRegistry};
use crate::value::{Mapping, Value};
use crate::{Result, SnapwireError};

/// Stream writer bound to one sink.
///
/// Every `write_*` method returns the number of bytes it emitted.
pub struct Writer<'a, W: Write> {
    sink: W,
    registry: &'a TypeRegistry,
    compressor: &'a dyn CompressionAdapter,
    written: u64,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(sink: W, registry: &'a TypeRegistry, compressor: &'a dyn CompressionAdapter) -> Self {
        Self {
            sink,
            registry,
            compressor,
            written: 0,
        }
    }

    /// Total bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    pub fn write_length(&mut self, len: u64) -> Result<usize> {
        let n = framing::write_length(&mut self.sink, len)?;
        self.written += n as u64;
        Ok(n)
    }

    pub fn write_marker(&mut self, marker: Marker) -> Result<usize> {
        let n = framing::write_marker(&mut self.sink, marker)?;
        self.written += n as u64;
        Ok(n)
    }

    /// Write raw bytes with no framing.
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<usize> {
        self.sink.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(bytes.len())
    }

    /// Write a stringified scalar, compressed when that is strictly smaller.
    pub fn write_value_payload(&mut self, text: &str) -> Result<usize> {
        let raw = text.as_bytes();
        let compressed = self.compressor.compress(raw)?;

        if compressed.len() < raw.len() {
            let mut n = self.write_marker(Marker::Compressed)?;
            n += self.write_length(compressed.len() as u64)?;
            n += self.write_raw(&compressed)?;
            return Ok(n);
        }

        let mut n = self.write_length(raw.len() as u64)?;
        n += self.write_raw(raw)?;
        Ok(n)
    }

    /// Write the one-byte wire id for `value` and hand back its binding.
    pub fn write_type_id(&mut self, value: &Value) -> Result<(TypeBinding, usize)> {
        let kind = value.kind();
        let binding = *self
            .registry
            .lookup_by_kind(kind)
            .ok_or(SnapwireError::UnknownType(BindingKey::Kind(kind)))?;
        let n = self.write_raw(&[binding.wire_id()])?;
        Ok((binding, n))
    }

    /// `[type-id][key][value]`, one mapping entry.
    pub fn write_entry(&mut self, key: &str, value: &Value) -> Result<usize> {
        let (binding, mut n) = self.write_type_id(value)?;
        n += self.write_value_payload(key)?;
        n += binding.encode(self, value)?;
        Ok(n)
    }

    /// `[type-id][value]`, one sequence element.
    pub fn write_element(&mut self, value: &Value) -> Result<usize> {
        let (binding, mut n) = self.write_type_id(value)?;
        n += binding.encode(self, value)?;
        Ok(n)
    }

    /// Write a whole document: entry count, entries, EOF marker.
    pub fn write_root(&mut self, mapping: &Mapping) -> Result<usize> {
        let mut n = self.write_length(mapping.len() as u64)?;
        for (key, value) in mapping {
            n += self.write_entry(key, value)?;
        }
        n += self.write_marker(Marker::Eof)?;
        Ok(n)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }
}
