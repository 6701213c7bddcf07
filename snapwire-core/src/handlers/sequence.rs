//! Sequence handler (container).
//!
//! Wire form: element count, then one `[type-id][value]` record per element.
//! Falsy elements (zero, empty text, empty containers) are ordinary data.

use std::io::{Read, Seek, Write};

use crate::reader::Reader;
use crate::value::Value;
use crate::writer::Writer;
use crate::Result;

pub fn encode<W: Write>(writer: &mut Writer<'_, W>, items: &[Value]) -> Result<usize> {
    let mut n = writer.write_length(items.len() as u64)?;
    for item in items {
        n += writer.write_element(item)?;
    }
    Ok(n)
}

pub fn decode<R: Read + Seek>(reader: &mut Reader<'_, R>) -> Result<Vec<Value>> {
    reader.read_sequence_body()
}
