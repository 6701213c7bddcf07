/*!
Encode/decode bodies for the five built-in value kinds.

Dispatch is a closed match on [`ValueKind`]; the registry only decides which
wire id announces each kind.
*/

pub mod float;
pub mod integer;
pub mod mapping;
pub mod sequence;
pub mod text;

use std::io::{Read, Seek, Write};

use crate::reader::Reader;
use crate::value::{Value, ValueKind};
use crate::writer::Writer;
use crate::{Result, SnapwireError};

/// Encode `value` with the handler for `kind`. Returns bytes written.
pub(crate) fn encode<W: Write>(kind: ValueKind, writer: &mut Writer<'_, W>, value: &Value) -> Result<usize> {
    match (kind, value) {
        (ValueKind::Integer, Value::Integer(i)) => integer::encode(writer, i),
        (ValueKind::Float, Value::Float(f)) => float::encode(writer, *f),
        (ValueKind::Text, Value::Text(s)) => text::encode(writer, s),
        (ValueKind::Mapping, Value::Mapping(m)) => mapping::encode(writer, m),
        (ValueKind::Sequence, Value::Sequence(items)) => sequence::encode(writer, items),
        (kind, value) => Err(SnapwireError::validation(format!(
            "{kind} handler cannot encode a {} value",
            value.kind()
        ))),
    }
}

/// Decode one value with the handler for `kind`.
pub(crate) fn decode<R: Read + Seek>(kind: ValueKind, reader: &mut Reader<'_, R>) -> Result<Value> {
    match kind {
        ValueKind::Integer => integer::decode(reader).map(Value::Integer),
        ValueKind::Float => float::decode(reader).map(Value::Float),
        ValueKind::Text => text::decode(reader).map(Value::Text),
        ValueKind::Mapping => mapping::decode(reader).map(Value::Mapping),
        ValueKind::Sequence => sequence::decode(reader).map(Value::Sequence),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::Cursor;

    use crate::compression::ZlibCompressor;
    use crate::reader::Reader;
    use crate::registry::TypeRegistry;
    use crate::value::Value;
    use crate::writer::Writer;
    use crate::Result;

    /// Encode `value` with its handler only (no type id).
    pub fn encode_body(value: &Value) -> Vec<u8> {
        let registry = TypeRegistry::with_defaults();
        let compressor = ZlibCompressor::new();
        let mut buf = Vec::new();
        let mut writer = Writer::new(&mut buf, &registry, &compressor);
        let binding = *registry.lookup_by_kind(value.kind()).unwrap();
        let n = binding.encode(&mut writer, value).unwrap();
        assert_eq!(n, buf.len());
        buf
    }

    /// Decode a handler body of `kind` from `bytes`.
    pub fn decode_body(kind: crate::value::ValueKind, bytes: &[u8]) -> Result<Value> {
        let registry = TypeRegistry::with_defaults();
        let compressor = ZlibCompressor::new();
        let mut reader = Reader::new(Cursor::new(bytes), &registry, &compressor);
        super::decode(kind, &mut reader)
    }
}
