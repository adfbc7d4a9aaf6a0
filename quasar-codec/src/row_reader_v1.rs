use std::cell::RefCell;

use quasar_types::schema::{PropertyType, SchemaProvider};
use quasar_types::types::{NullKind, Value};

use crate::varint::decode_varint;
use crate::CodecError;

/// Lazily discovered cell offsets. `offsets[i]` is the byte offset of field
/// `i` relative to the field area; `block_visited[k]` is the highest
/// in-block index (0..=15) whose offset is already known for block `k`.
/// The cache lives inside the reader and is never shared across threads or
/// persisted.
struct OffsetCache {
    offsets: Vec<Option<usize>>,
    block_visited: Vec<usize>,
}

/// Reader for the legacy v1 format: varint-framed cells behind a header of
/// block offsets that allow an O(1) jump to every 16th field and an O(16)
/// scan within a block.
pub struct RowReaderV1<'a> {
    schema: &'a dyn SchemaProvider,
    body: &'a [u8],
    cache: RefCell<OffsetCache>,
}

impl<'a> RowReaderV1<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, row: &'a [u8]) -> Result<Self, CodecError> {
        let first = *row.first().ok_or(CodecError::TooShort(0))?;
        let offset_bytes = (first & 0x07) as usize + 1;
        let ver_bytes = (first >> 5) as usize;

        let num_fields = schema.num_fields();
        let num_blocks = num_fields >> 4;
        let header_len = 1 + ver_bytes + num_blocks * offset_bytes;
        if header_len > row.len() {
            return Err(CodecError::TooShort(row.len()));
        }

        let body = &row[header_len..];
        let mut offsets = vec![None; num_fields + 1];
        offsets[0] = Some(0);
        offsets[num_fields] = Some(body.len());
        let mut cursor = 1 + ver_bytes;
        for block in 1..=num_blocks {
            let mut offset = 0usize;
            for j in 0..offset_bytes {
                offset |= (row[cursor + j] as usize) << (8 * j);
            }
            cursor += offset_bytes;
            offsets[block * 16] = Some(offset);
        }

        Ok(Self {
            schema,
            body,
            cache: RefCell::new(OffsetCache {
                offsets,
                block_visited: vec![0; num_blocks + 1],
            }),
        })
    }

    pub fn schema_version(row: &[u8]) -> Option<u32> {
        let first = *row.first()?;
        let ver_bytes = (first >> 5) as usize;
        if 1 + ver_bytes > row.len() {
            return None;
        }
        let mut version = 0u32;
        for (j, &b) in row[1..1 + ver_bytes].iter().enumerate() {
            version |= u32::from(b) << (8 * j);
        }
        Some(version)
    }

    pub fn num_fields(&self) -> usize {
        self.schema.num_fields()
    }

    /// Width of the cell at `offset`, or `None` when the cell would run
    /// past the row.
    fn cell_width(&self, index: usize, offset: usize) -> Option<usize> {
        let remaining = self.body.len().checked_sub(offset)?;
        let width = match self.schema.field_type(index)? {
            PropertyType::Bool => 1,
            PropertyType::Int64 | PropertyType::Timestamp => {
                decode_varint(&self.body[offset..]).map(|(_, n)| n)?
            }
            PropertyType::Float => 4,
            PropertyType::Double => 8,
            PropertyType::Vid => 8,
            PropertyType::String => {
                let (len, n) = decode_varint(&self.body[offset..])?;
                n.checked_add(usize::try_from(len).ok()?)?
            }
        };
        (width <= remaining).then_some(width)
    }

    /// Jump to the field's block, then scan forward caching every offset on
    /// the way. Repeated reads of the same field are O(1).
    fn skip_to_field(&self, index: usize) -> Option<usize> {
        if index >= self.schema.num_fields() {
            return None;
        }
        let block = index >> 4;
        let mut cache = self.cache.borrow_mut();
        let visited = block * 16 + cache.block_visited[block];
        let target_in_block = index & 0x0f;

        if index <= visited {
            return cache.offsets[index];
        }

        let mut offset = cache.offsets[visited]?;
        for i in (block * 16 + cache.block_visited[block])..(block * 16 + target_in_block) {
            let width = self.cell_width(i, offset)?;
            offset += width;
            if offset > self.body.len() {
                return None;
            }
            cache.offsets[i + 1] = Some(offset);
            cache.block_visited[(i + 1) >> 4] = (i + 1) & 0x0f;
        }
        Some(offset)
    }

    pub fn get_value_by_name(&self, name: &str) -> Value {
        match self.schema.field_index(name) {
            Some(index) => self.get_value_by_index(index),
            None => Value::Null(NullKind::UnknownProp),
        }
    }

    pub fn get_value_by_index(&self, index: usize) -> Value {
        if index >= self.schema.num_fields() {
            return Value::Null(NullKind::UnknownProp);
        }
        match self.schema.field_type(index) {
            Some(PropertyType::Bool) => self.get_bool(index),
            Some(PropertyType::Int64 | PropertyType::Timestamp | PropertyType::Vid) => {
                self.get_int(index)
            }
            Some(PropertyType::Float) => self.get_float(index),
            Some(PropertyType::Double) => self.get_double(index),
            Some(PropertyType::String) => self.get_string(index),
            None => Value::Null(NullKind::UnknownProp),
        }
    }

    pub fn get_bool(&self, index: usize) -> Value {
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            Some(PropertyType::Bool) => match self.body.get(offset) {
                Some(&b) => Value::Bool(b != 0),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::Int64) => match self.read_varint(offset) {
                Some(i) => Value::Bool(i != 0),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::String) => match self.read_string(offset) {
                Some(s) => Value::Bool(s.eq_ignore_ascii_case("true")),
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn get_int(&self, index: usize) -> Value {
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            Some(PropertyType::Int64 | PropertyType::Timestamp) => {
                match self.read_varint(offset) {
                    Some(i) => Value::Int(i),
                    None => Value::Null(NullKind::BadData),
                }
            }
            Some(PropertyType::Vid) => match self.read_i64_le(offset) {
                Some(i) => Value::Int(i),
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn get_float(&self, index: usize) -> Value {
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            Some(PropertyType::Float) => match self.read_f32_le(offset) {
                Some(f) => Value::float(f as f64),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::Double) => match self.read_f64_le(offset) {
                Some(d) => {
                    if d.is_finite() && d.abs() > f32::MAX as f64 {
                        Value::Null(NullKind::ErrOverflow)
                    } else {
                        Value::float(d as f32 as f64)
                    }
                }
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn get_double(&self, index: usize) -> Value {
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            // A FLOAT source only carries f32 precision; the widened value
            // keeps exactly that.
            Some(PropertyType::Float) => match self.read_f32_le(offset) {
                Some(f) => Value::float(f as f64),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::Double) => match self.read_f64_le(offset) {
                Some(d) => Value::float(d),
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::Null(NullKind::BadType),
        }
    }

    pub fn get_string(&self, index: usize) -> Value {
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            Some(PropertyType::String) => match self.read_string(offset) {
                Some(s) => Value::Str(s.to_string()),
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::Null(NullKind::BadType),
        }
    }

    fn read_varint(&self, offset: usize) -> Option<i64> {
        let (raw, _) = decode_varint(self.body.get(offset..)?)?;
        Some(raw as i64)
    }

    fn read_i64_le(&self, offset: usize) -> Option<i64> {
        let bytes = self.body.get(offset..offset.checked_add(8)?)?;
        Some(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_f32_le(&self, offset: usize) -> Option<f32> {
        let bytes = self.body.get(offset..offset.checked_add(4)?)?;
        Some(f32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_f64_le(&self, offset: usize) -> Option<f64> {
        let bytes = self.body.get(offset..offset.checked_add(8)?)?;
        Some(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_string(&self, offset: usize) -> Option<&str> {
        let (len, n) = decode_varint(self.body.get(offset..)?)?;
        let len = usize::try_from(len).ok()?;
        let start = offset.checked_add(n)?;
        let bytes = self.body.get(start..start.checked_add(len)?)?;
        std::str::from_utf8(bytes).ok()
    }
}
