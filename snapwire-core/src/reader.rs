/*!
Reconstructs value trees from the snapwire byte stream.

The reader needs `Seek` because the format is parsed without a schema: it
peeks at a byte to tell a control marker from a type id or length and puts
the byte back when it is not a marker. Container decoders also seek back to
the start of an entry that failed to decode.
*/

use std::io::{Read, Seek, SeekFrom};

use tracing::{trace, warn};

use crate::compression::CompressionAdapter;
use crate::error::BindingKey;
use crate::framing::{self, Marker};
use crate::registry::{TypeBinding, TypeRegistry};
use crate::value::{Mapping, Value};
use crate::{Result, SnapwireError};

/// Stream reader bound to one source.
pub struct Reader<'a, R: Read + Seek> {
    source: R,
    registry: &'a TypeRegistry,
    compressor: &'a dyn CompressionAdapter,
    depth: usize,
    max_depth: Option<usize>,
}

impl<'a, R: Read + Seek> Reader<'a, R> {
    pub fn new(source: R, registry: &'a TypeRegistry, compressor: &'a dyn CompressionAdapter) -> Self {
        Self {
            source,
            registry,
            compressor,
            depth: 0,
            max_depth: None,
        }
    }

    /// Refuse to descend more than `max_depth` containers deep.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    pub fn position(&mut self) -> Result<u64> {
        Ok(self.source.stream_position()?)
    }

    pub fn rewind_to(&mut self, position: u64) -> Result<()> {
        self.source.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    pub fn read_marker(&mut self) -> Result<Option<Marker>> {
        framing::read_marker(&mut self.source)
    }

    pub fn read_length(&mut self) -> Result<u64> {
        framing::read_length(&mut self.source)
    }

    /// Read exactly `len` raw bytes.
    ///
    /// The buffer grows with the bytes actually present, so a corrupt length
    /// cannot force a huge allocation up front.
    pub fn read_raw(&mut self, len: u64, what: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        (&mut self.source).take(len).read_to_end(&mut buf)?;
        if (buf.len() as u64) < len {
            return Err(SnapwireError::malformed(format!(
                "{what} declares {len} bytes but only {} remain",
                buf.len()
            )));
        }
        Ok(buf)
    }

    /// Read one byte as a wire id, or `None` at the document terminator.
    ///
    /// The terminator is consumed.
    pub fn read_type_id(&mut self) -> Result<Option<TypeBinding>> {
        match self.read_marker()? {
            Some(Marker::Eof) => return Ok(None),
            Some(other) => {
                return Err(SnapwireError::malformed(format!(
                    "expected a type id, found {other:?} marker"
                )))
            }
            None => {}
        }

        let wire_id = framing::read_u8(&mut self.source, "type id")?;
        self.registry
            .lookup_by_id(wire_id)
            .copied()
            .map(Some)
            .ok_or(SnapwireError::UnknownType(BindingKey::WireId(wire_id)))
    }

    /// Read a length-prefixed payload as text, inflating it when `compressed`.
    ///
    /// The caller is responsible for having consumed the COMPRESSED marker.
    pub fn read_value_payload(&mut self, compressed: bool) -> Result<String> {
        let len = self.read_length()?;
        let bytes = self.read_raw(len, "payload")?;
        let bytes = if compressed {
            self.compressor.decompress(&bytes)?
        } else {
            bytes
        };
        String::from_utf8(bytes)
            .map_err(|e| SnapwireError::malformed(format!("payload is not valid UTF-8: {e}")))
    }

    /// Probe for COMPRESSED, then read the payload.
    pub fn read_text(&mut self) -> Result<String> {
        match self.read_marker()? {
            Some(Marker::Compressed) => self.read_value_payload(true),
            None => self.read_value_payload(false),
            Some(other) => Err(SnapwireError::malformed(format!(
                "expected a text payload, found {other:?} marker"
            ))),
        }
    }

    /// Read one `[type-id][key][value]` entry; `None` at the terminator.
    pub fn read_entry(&mut self) -> Result<Option<(String, Value)>> {
        let Some(binding) = self.read_type_id()? else {
            return Ok(None);
        };
        let key = self.read_text()?;
        let value = self.decode_with(binding)?;
        Ok(Some((key, value)))
    }

    /// Read one `[type-id][value]` element; `None` at the terminator.
    pub fn read_element(&mut self) -> Result<Option<Value>> {
        let Some(binding) = self.read_type_id()? else {
            return Ok(None);
        };
        self.decode_with(binding).map(Some)
    }

    /// Read a whole document written by `Writer::write_root`.
    ///
    /// Stops early when the terminator arrives before the declared count is
    /// exhausted. Errors raised by a top-level entry propagate; once the
    /// declared entries are in, a missing or damaged terminator only costs a
    /// warning and the mapping read so far is returned.
    pub fn read_root(&mut self) -> Result<Mapping> {
        let declared = self.read_length()?;
        let mut result = Mapping::new();
        let mut terminated = false;

        for _ in 0..declared {
            match self.read_entry()? {
                Some((key, value)) => {
                    result.insert(key, value);
                }
                None => {
                    terminated = true;
                    break;
                }
            }
        }

        if terminated {
            warn!(declared, read = result.len(), "Document ended before its declared entry count");
            return Ok(result);
        }

        match self.read_marker() {
            Ok(Some(Marker::Eof)) => {}
            Ok(found) => {
                let position = self.position()?;
                warn!(position, found = ?found, read = result.len(), "Missing end-of-document marker");
                #[cfg(feature = "metrics")]
                crate::observability::SnapwireMetrics::global().record_partial_decode();
            }
            Err(e) if e.is_recoverable() => {
                self.note_partial("root", declared, result.len(), Some(&e));
            }
            Err(e) => return Err(e),
        }

        Ok(result)
    }

    /// Decode entries of a nested mapping, keeping what parsed cleanly.
    ///
    /// On a recoverable failure, or on the document terminator, the stream is
    /// rewound to the start of the offending entry and the partial mapping is
    /// returned.
    pub(crate) fn read_mapping_body(&mut self) -> Result<Mapping> {
        let declared = self.read_length()?;
        let mut result = Mapping::new();
        self.enter()?;

        for _ in 0..declared {
            let start = self.position()?;
            match self.read_entry() {
                Ok(Some((key, value))) => {
                    result.insert(key, value);
                }
                Ok(None) => {
                    self.rewind_to(start)?;
                    self.note_partial("mapping", declared, result.len(), None);
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    self.rewind_to(start)?;
                    self.note_partial("mapping", declared, result.len(), Some(&e));
                    break;
                }
                Err(e) => {
                    self.leave();
                    return Err(e);
                }
            }
        }

        self.leave();
        Ok(result)
    }

    /// Decode elements of a nested sequence, with the same recovery policy
    /// as mappings.
    pub(crate) fn read_sequence_body(&mut self) -> Result<Vec<Value>> {
        let declared = self.read_length()?;
        let mut result = Vec::new();
        self.enter()?;

        for _ in 0..declared {
            let start = self.position()?;
            match self.read_element() {
                Ok(Some(value)) => result.push(value),
                Ok(None) => {
                    self.rewind_to(start)?;
                    self.note_partial("sequence", declared, result.len(), None);
                    break;
                }
                Err(e) if e.is_recoverable() => {
                    self.rewind_to(start)?;
                    self.note_partial("sequence", declared, result.len(), Some(&e));
                    break;
                }
                Err(e) => {
                    self.leave();
                    return Err(e);
                }
            }
        }

        self.leave();
        Ok(result)
    }

    fn decode_with(&mut self, binding: TypeBinding) -> Result<Value> {
        trace!(kind = %binding.kind(), wire_id = binding.wire_id(), "Decoding value");
        binding.decode(self)
    }

    fn enter(&mut self) -> Result<()> {
        if let Some(max) = self.max_depth {
            if self.depth >= max {
                return Err(SnapwireError::malformed(format!(
                    "nesting exceeds the maximum depth of {max}"
                )));
            }
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn note_partial(&self, container: &str, declared: u64, read: usize, cause: Option<&SnapwireError>) {
        match cause {
            Some(e) => warn!(container, declared, read, error = %e, "Partial container decode"),
            None => warn!(container, declared, read, "Container cut short by end-of-document marker"),
        }
        #[cfg(feature = "metrics")]
        crate::observability::SnapwireMetrics::global().record_partial_decode();
    }
}
