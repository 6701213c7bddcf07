/*!
Codec facade pairing a type registry with a compression adapter.
*/

use std::io::{Cursor, Read, Seek, Write};

use crate::compression::{CompressionAdapter, ZlibCompressor};
use crate::reader::Reader;
use crate::registry::{TypeBinding, TypeRegistry};
use crate::value::{Mapping, Value};
use crate::writer::Writer;
use crate::{Result, SnapwireError};

/// Encodes and decodes whole documents.
///
/// # Example
/// ```rust
/// use snapwire_core::{Codec, Mapping, Value};
///
/// let codec = Codec::new();
/// let mut doc = Mapping::new();
/// doc.insert("a".to_string(), Value::from(1));
///
/// let bytes = codec.encode(&doc)?;
/// assert_eq!(codec.decode(&bytes)?, doc);
/// # Ok::<(), snapwire_core::SnapwireError>(())
/// ```
pub struct Codec {
    registry: TypeRegistry,
    compressor: Box<dyn CompressionAdapter + Send + Sync>,
    max_depth: Option<usize>,
}

impl Codec {
    /// Default bindings with zlib payload compression.
    pub fn new() -> Self {
        Self::with_compressor(ZlibCompressor::new())
    }

    pub fn with_compressor<C>(compressor: C) -> Self
    where
        C: CompressionAdapter + Send + Sync + 'static,
    {
        Self {
            registry: TypeRegistry::with_defaults(),
            compressor: Box::new(compressor),
            max_depth: None,
        }
    }

    /// Replace the registry wholesale.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Bound the container nesting accepted on decode.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TypeRegistry {
        &mut self.registry
    }

    /// Register an extra or replacement binding.
    pub fn register(&mut self, binding: TypeBinding) -> Result<()> {
        self.registry.register(binding)
    }

    pub fn compressor(&self) -> &dyn CompressionAdapter {
        self.compressor.as_ref()
    }

    pub fn writer<W: Write>(&self, sink: W) -> Writer<'_, W> {
        Writer::new(sink, &self.registry, self.compressor.as_ref())
    }

    pub fn reader<R: Read + Seek>(&self, source: R) -> Reader<'_, R> {
        let reader = Reader::new(source, &self.registry, self.compressor.as_ref());
        match self.max_depth {
            Some(depth) => reader.with_max_depth(depth),
            None => reader,
        }
    }

    /// Encode a document into a fresh buffer.
    pub fn encode(&self, doc: &Mapping) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.encode_to(&mut buf, doc)?;
        Ok(buf)
    }

    /// Encode a document into `sink`. Returns bytes written.
    pub fn encode_to<W: Write>(&self, sink: W, doc: &Mapping) -> Result<usize> {
        let mut writer = self.writer(sink);
        let n = writer.write_root(doc)?;
        writer.flush()?;
        Ok(n)
    }

    /// Decode a document from a byte slice.
    pub fn decode(&self, bytes: &[u8]) -> Result<Mapping> {
        self.decode_from(Cursor::new(bytes))
    }

    pub fn decode_from<R: Read + Seek>(&self, source: R) -> Result<Mapping> {
        self.reader(source).read_root()
    }

    /// Encode one standalone value as `[type-id][value-bytes]`.
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.writer(&mut buf).write_element(value)?;
        Ok(buf)
    }

    /// Decode one standalone value written by [`Codec::encode_value`].
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value> {
        self.reader(Cursor::new(bytes))
            .read_element()?
            .ok_or_else(|| SnapwireError::malformed("expected a value, found end-of-document marker"))
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Codec")
            .field("registry", &self.registry)
            .field("compression", &self.compressor.algorithm_name())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}
