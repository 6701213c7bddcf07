/*!
Variable-length framing shared by lengths and control markers.

The top two bits of a leading byte select its meaning:

| prefix     | meaning                                             | size    |
|------------|-----------------------------------------------------|---------|
| `00xxxxxx` | length 0..=63 inline                                | 1 byte  |
| `01xxxxxx` | 14-bit length, high 6 bits here, low 8 bits next    | 2 bytes |
| `10000000` | 32-bit little-endian length follows                 | 5 bytes |
| `11xxxxxx` | control marker, low 6 bits select a [`Marker`]      | 1 byte  |

Type ids are always below 192, so a marker byte can never be mistaken for a
type id or a length.
*/

use std::io::{Read, Seek, SeekFrom, Write};

use crate::{Result, SnapwireError};

/// Largest length stored inline in the prefix byte.
pub const MAX_6BIT_LEN: u64 = 0x3F;
/// Largest length of the two-byte tier.
pub const MAX_14BIT_LEN: u64 = 0x3FFF;

const PREFIX_MASK: u8 = 0b1100_0000;
const PAYLOAD_MASK: u8 = 0b0011_1111;
const PREFIX_6BIT: u8 = 0b0000_0000;
const PREFIX_14BIT: u8 = 0b0100_0000;
const PREFIX_32BIT: u8 = 0b1000_0000;
const PREFIX_MARKER: u8 = 0b1100_0000;

/// First byte value that denotes a control marker; type ids must stay below it.
pub const MARKER_BASE: u8 = PREFIX_MARKER;

/// Control markers occupying the `11xxxxxx` byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Marker {
    /// One little-endian signed byte follows
    Int8 = 0,
    /// Two little-endian signed bytes follow
    Int16 = 1,
    /// Four little-endian signed bytes follow
    Int32 = 2,
    /// A length-prefixed zlib payload follows
    Compressed = 3,
    /// End of the top-level document
    Eof = 63,
}

impl Marker {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The full on-wire byte, `0b11` followed by the 6-bit code.
    pub fn to_byte(self) -> u8 {
        PREFIX_MARKER | self.code()
    }

    pub fn from_code(code: u8) -> Option<Marker> {
        match code {
            0 => Some(Marker::Int8),
            1 => Some(Marker::Int16),
            2 => Some(Marker::Int32),
            3 => Some(Marker::Compressed),
            63 => Some(Marker::Eof),
            _ => None,
        }
    }
}

/// True when `byte` carries the control-marker prefix.
pub fn is_marker_byte(byte: u8) -> bool {
    byte & PREFIX_MASK == PREFIX_MARKER
}

/// Write `len` using the smallest tier that fits. Returns the bytes written.
pub fn write_length<W: Write>(sink: &mut W, len: u64) -> Result<usize> {
    if len <= MAX_6BIT_LEN {
        sink.write_all(&[PREFIX_6BIT | len as u8])?;
        return Ok(1);
    }

    if len <= MAX_14BIT_LEN {
        let first = PREFIX_14BIT | (len >> 8) as u8;
        let second = (len & 0xFF) as u8;
        sink.write_all(&[first, second])?;
        return Ok(2);
    }

    let len = u32::try_from(len).map_err(|_| {
        SnapwireError::validation(format!("length {len} exceeds the 32-bit frame limit"))
    })?;
    let mut frame = [0u8; 5];
    frame[0] = PREFIX_32BIT;
    frame[1..].copy_from_slice(&len.to_le_bytes());
    sink.write_all(&frame)?;
    Ok(5)
}

/// Exact inverse of [`write_length`].
pub fn read_length<R: Read>(source: &mut R) -> Result<u64> {
    let first = read_u8(source, "length prefix")?;

    match first & PREFIX_MASK {
        PREFIX_6BIT => Ok(u64::from(first & PAYLOAD_MASK)),
        PREFIX_14BIT => {
            let second = read_u8(source, "14-bit length")?;
            Ok((u64::from(first & PAYLOAD_MASK) << 8) | u64::from(second))
        }
        PREFIX_32BIT if first == PREFIX_32BIT => {
            let mut buf = [0u8; 4];
            source
                .read_exact(&mut buf)
                .map_err(|e| SnapwireError::from_read(e, "32-bit length"))?;
            Ok(u64::from(u32::from_le_bytes(buf)))
        }
        PREFIX_32BIT => Err(SnapwireError::malformed(format!(
            "invalid 32-bit length prefix {first:#04x}"
        ))),
        _ => Err(SnapwireError::malformed(format!(
            "expected a length, found control marker byte {first:#04x}"
        ))),
    }
}

/// Write a single marker byte.
pub fn write_marker<W: Write>(sink: &mut W, marker: Marker) -> Result<usize> {
    sink.write_all(&[marker.to_byte()])?;
    Ok(1)
}

/// Probe the next byte for a control marker.
///
/// A marker byte is consumed and returned. Anything else, including end of
/// stream, leaves the position where it was and yields `None`.
pub fn read_marker<R: Read + Seek>(source: &mut R) -> Result<Option<Marker>> {
    let start = source.stream_position()?;
    let mut buf = [0u8; 1];
    let n = read_some(source, &mut buf)?;
    if n == 0 {
        return Ok(None);
    }

    let byte = buf[0];
    if !is_marker_byte(byte) {
        source.seek(SeekFrom::Start(start))?;
        return Ok(None);
    }

    match Marker::from_code(byte & PAYLOAD_MASK) {
        Some(marker) => Ok(Some(marker)),
        None => {
            source.seek(SeekFrom::Start(start))?;
            Err(SnapwireError::malformed(format!(
                "unknown control marker {byte:#04x}"
            )))
        }
    }
}

pub(crate) fn read_u8<R: Read>(source: &mut R, what: &str) -> Result<u8> {
    let mut buf = [0u8; 1];
    source
        .read_exact(&mut buf)
        .map_err(|e| SnapwireError::from_read(e, what))?;
    Ok(buf[0])
}

fn read_some<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match source.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
