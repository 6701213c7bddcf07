//! Mapping handler (container).
//!
//! Wire form: entry count, then one `[type-id][key][value]` record per
//! entry. The explicit count bounds the loop, so no terminator follows.
//! Decoding keeps every entry that parsed before a recoverable failure.

use std::io::{Read, Seek, Write};

use crate::reader::Reader;
use crate::value::Mapping;
use crate::writer::Writer;
use crate::Result;

pub fn encode<W: Write>(writer: &mut Writer<'_, W>, value: &Mapping) -> Result<usize> {
    let mut n = writer.write_length(value.len() as u64)?;
    for (key, item) in value {
        n += writer.write_entry(key, item)?;
    }
    Ok(n)
}

pub fn decode<R: Read + Seek>(reader: &mut Reader<'_, R>) -> Result<Mapping> {
    reader.read_mapping_body()
}
