//! Integer handler.
//!
//! Values that fit a signed 8/16/32-bit range take the fixed-width path:
//! one marker byte followed by the little-endian bytes. Anything wider is
//! written as decimal text through the scalar payload path.

use std::io::{Read, Seek, Write};

use num_bigint::BigInt;

use crate::framing::Marker;
use crate::reader::Reader;
use crate::writer::Writer;
use crate::{Result, SnapwireError};

pub fn encode<W: Write>(writer: &mut Writer<'_, W>, value: &BigInt) -> Result<usize> {
    if let Some((marker, bytes)) = fixed_width(value) {
        return Ok(writer.write_marker(marker)? + writer.write_raw(&bytes)?);
    }
    writer.write_value_payload(&value.to_string())
}

pub fn decode<R: Read + Seek>(reader: &mut Reader<'_, R>) -> Result<BigInt> {
    match reader.read_marker()? {
        Some(Marker::Int8) => {
            let bytes = fixed(reader)?;
            Ok(BigInt::from(i8::from_le_bytes(bytes)))
        }
        Some(Marker::Int16) => {
            let bytes = fixed(reader)?;
            Ok(BigInt::from(i16::from_le_bytes(bytes)))
        }
        Some(Marker::Int32) => {
            let bytes = fixed(reader)?;
            Ok(BigInt::from(i32::from_le_bytes(bytes)))
        }
        Some(Marker::Compressed) => parse(&reader.read_value_payload(true)?),
        None => parse(&reader.read_value_payload(false)?),
        Some(Marker::Eof) => Err(SnapwireError::malformed(
            "expected an integer, found end-of-document marker",
        )),
    }
}

fn fixed<R: Read + Seek, const N: usize>(reader: &mut Reader<'_, R>) -> Result<[u8; N]> {
    let raw = reader.read_raw(N as u64, "fixed-width integer")?;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(&raw);
    Ok(bytes)
}

fn parse(text: &str) -> Result<BigInt> {
    text.parse::<BigInt>()
        .map_err(|e| SnapwireError::malformed(format!("invalid integer text {text:?}: {e}")))
}

/// Marker and little-endian bytes for the fixed-width path, if `value` fits.
///
/// Every i32 prints in at most 11 characters, so trying the narrow
/// conversions first is equivalent to the text-length cutoff.
pub(crate) fn fixed_width(value: &BigInt) -> Option<(Marker, Vec<u8>)> {
    let v = i32::try_from(value).ok()?;
    Some(if let Ok(v8) = i8::try_from(v) {
        (Marker::Int8, v8.to_le_bytes().to_vec())
    } else if let Ok(v16) = i16::try_from(v) {
        (Marker::Int16, v16.to_le_bytes().to_vec())
    } else {
        (Marker::Int32, v.to_le_bytes().to_vec())
    })
}
