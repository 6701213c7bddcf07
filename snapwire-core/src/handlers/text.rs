//! Text handler: the UTF-8 bytes go through the scalar payload path as-is.

use std::io::{Read, Seek, Write};

use crate::reader::Reader;
use crate::writer::Writer;
use crate::Result;

pub fn encode<W: Write>(writer: &mut Writer<'_, W>, value: &str) -> Result<usize> {
    writer.write_value_payload(value)
}

pub fn decode<R: Read + Seek>(reader: &mut Reader<'_, R>) -> Result<String> {
    reader.read_text()
}

#[cfg(test)]
mod tests {
    use crate::framing::Marker;
    use crate::handlers::test_support::{decode_body, encode_body};
    use crate::value::{Value, ValueKind};

    #[test]
    fn test_text_roundtrip() {
        let long = "x".repeat(70);
        let huge = "ab".repeat(9000);
        for s in ["", "a", "héllo wörld", "日本語テキスト", long.as_str(), huge.as_str()] {
            let bytes = encode_body(&Value::from(s));
            assert_eq!(decode_body(ValueKind::Text, &bytes).unwrap(), Value::from(s));
        }
    }

    #[test]
    fn test_repetitive_text_is_compressed() {
        let bytes = encode_body(&Value::from("a".repeat(100)));
        assert_eq!(bytes[0], Marker::Compressed.to_byte());
    }

    #[test]
    fn test_short_unique_text_is_not_compressed() {
        for s in ["abc", "hello world", "The quick brown fox"] {
            let bytes = encode_body(&Value::from(s));
            assert_ne!(bytes[0], Marker::Compressed.to_byte());
            assert_eq!(bytes[0] as usize, s.len());
        }
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(encode_body(&Value::from("")), vec![0]);
    }
}
