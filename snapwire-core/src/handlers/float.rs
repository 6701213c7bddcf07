//! Float handler: the shortest round-trip decimal text of the value.

use std::io::{Read, Seek, Write};

use crate::reader::Reader;
use crate::writer::Writer;
use crate::{Result, SnapwireError};

pub fn encode<W: Write>(writer: &mut Writer<'_, W>, value: f64) -> Result<usize> {
    // `Debug` keeps a fractional part ("1.0") and switches to exponent form
    // for very large or small magnitudes.
    writer.write_value_payload(&format!("{value:?}"))
}

pub fn decode<R: Read + Seek>(reader: &mut Reader<'_, R>) -> Result<f64> {
    let text = reader.read_text()?;
    text.parse::<f64>()
        .map_err(|e| SnapwireError::malformed(format!("invalid float text {text:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::{decode_body, encode_body};
    use crate::value::{Value, ValueKind};

    fn roundtrip(v: f64) -> f64 {
        let bytes = encode_body(&Value::Float(v));
        decode_body(ValueKind::Float, &bytes)
            .unwrap()
            .as_float()
            .unwrap()
    }

    #[test]
    fn test_float_roundtrip() {
        for v in [0.0, -0.5, 1.0, 1234.5678, 1e300, -2.5e-300, f64::MAX, f64::MIN_POSITIVE] {
            assert_eq!(roundtrip(v), v);
        }
    }

    #[test]
    fn test_float_wire_text() {
        let bytes = encode_body(&Value::Float(1.5));
        assert_eq!(bytes, b"\x031.5");
    }

    #[test]
    fn test_non_finite_floats() {
        assert_eq!(roundtrip(f64::INFINITY), f64::INFINITY);
        assert_eq!(roundtrip(f64::NEG_INFINITY), f64::NEG_INFINITY);
        assert!(roundtrip(f64::NAN).is_nan());
    }

    #[test]
    fn test_invalid_float_text() {
        let err = decode_body(ValueKind::Float, &[2, b'x', b'y']).unwrap_err();
        assert!(matches!(err, SnapwireError::MalformedFrame(_)));
    }
}
