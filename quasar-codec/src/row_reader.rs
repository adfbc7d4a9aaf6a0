use quasar_types::schema::SchemaProvider;
use quasar_types::types::Value;

use crate::row_reader_v1::RowReaderV1;
use crate::row_reader_v2::RowReaderV2;
use crate::CodecError;

/// Version-dispatching reader. Byte 0 decides: bit 3 set means v2,
/// otherwise the row is v1.
pub enum RowReader<'a> {
    V1(RowReaderV1<'a>),
    V2(RowReaderV2<'a>),
}

impl<'a> RowReader<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, row: &'a [u8]) -> Result<Self, CodecError> {
        let first = *row.first().ok_or(CodecError::TooShort(0))?;
        if first & 0x08 != 0 {
            Ok(RowReader::V2(RowReaderV2::new(schema, row)?))
        } else {
            Ok(RowReader::V1(RowReaderV1::new(schema, row)?))
        }
    }

    /// The schema version a row claims to be encoded with, without a full
    /// header parse. Used to pick the right schema before constructing a
    /// reader.
    pub fn peek_schema_version(row: &[u8]) -> Option<u32> {
        let first = *row.first()?;
        if first & 0x08 != 0 {
            RowReaderV2::schema_version(row)
        } else {
            RowReaderV1::schema_version(row)
        }
    }

    pub fn num_fields(&self) -> usize {
        match self {
            RowReader::V1(r) => r.num_fields(),
            RowReader::V2(r) => r.num_fields(),
        }
    }

    pub fn get_value_by_index(&self, index: usize) -> Value {
        match self {
            RowReader::V1(r) => r.get_value_by_index(index),
            RowReader::V2(r) => r.get_value_by_index(index),
        }
    }

    pub fn get_value_by_name(&self, name: &str) -> Value {
        match self {
            RowReader::V1(r) => r.get_value_by_name(name),
            RowReader::V2(r) => r.get_value_by_name(name),
        }
    }

    /// Sequential decode of the whole row.
    pub fn decode_all(&self) -> Vec<Value> {
        (0..self.num_fields())
            .map(|i| self.get_value_by_index(i))
            .collect()
    }
}
