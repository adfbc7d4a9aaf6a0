use std::cell::RefCell;

use quasar_types::schema::{PropertyType, SchemaProvider};
use quasar_types::types::{NullKind, Value};

use crate::row_writer::V2_TAG;
use crate::CodecError;

struct OffsetCache {
    offsets: Vec<Option<usize>>,
    max_visited: usize,
}

/// Reader for the v2 format: `0b1000 | verBytes`, version, a null bitmap of
/// ⌈N/8⌉ bytes, then fixed-width cells (strings are u32-length-delimited).
/// A NULL field occupies no cell bytes.
pub struct RowReaderV2<'a> {
    schema: &'a dyn SchemaProvider,
    bitmap: &'a [u8],
    body: &'a [u8],
    cache: RefCell<OffsetCache>,
}

impl<'a> RowReaderV2<'a> {
    pub fn new(schema: &'a dyn SchemaProvider, row: &'a [u8]) -> Result<Self, CodecError> {
        let first = *row.first().ok_or(CodecError::TooShort(0))?;
        if first & 0x18 != V2_TAG {
            return Err(CodecError::UnknownVersion(first));
        }
        let ver_bytes = (first & 0x07) as usize;
        let num_fields = schema.num_fields();
        let bitmap_len = num_fields.div_ceil(8);
        let header_len = 1 + ver_bytes + bitmap_len;
        if header_len > row.len() {
            return Err(CodecError::TooShort(row.len()));
        }

        let mut offsets = vec![None; num_fields + 1];
        offsets[0] = Some(0);
        Ok(Self {
            schema,
            bitmap: &row[1 + ver_bytes..header_len],
            body: &row[header_len..],
            cache: RefCell::new(OffsetCache {
                offsets,
                max_visited: 0,
            }),
        })
    }

    pub fn schema_version(row: &[u8]) -> Option<u32> {
        let first = *row.first()?;
        let ver_bytes = (first & 0x07) as usize;
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

    fn is_null(&self, index: usize) -> bool {
        self.bitmap
            .get(index >> 3)
            .map(|byte| byte & (1 << (index & 7)) != 0)
            .unwrap_or(false)
    }

    fn cell_width(&self, index: usize, offset: usize) -> Option<usize> {
        if self.is_null(index) {
            return Some(0);
        }
        let remaining = self.body.len().checked_sub(offset)?;
        let width = match self.schema.field_type(index)? {
            PropertyType::Bool => 1,
            PropertyType::Int64 | PropertyType::Timestamp | PropertyType::Vid => 8,
            PropertyType::Float => 4,
            PropertyType::Double => 8,
            PropertyType::String => {
                let bytes = self.body.get(offset..offset.checked_add(4)?)?;
                let len = u32::from_le_bytes(bytes.try_into().unwrap()) as usize;
                len.checked_add(4)?
            }
        };
        (width <= remaining).then_some(width)
    }

    fn skip_to_field(&self, index: usize) -> Option<usize> {
        if index >= self.schema.num_fields() {
            return None;
        }
        let mut cache = self.cache.borrow_mut();
        if index <= cache.max_visited {
            return cache.offsets[index];
        }
        let mut offset = cache.offsets[cache.max_visited]?;
        for i in cache.max_visited..index {
            let width = self.cell_width(i, offset)?;
            offset += width;
            if offset > self.body.len() {
                return None;
            }
            cache.offsets[i + 1] = Some(offset);
            cache.max_visited = i + 1;
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
        if self.is_null(index) {
            return Value::NULL;
        }
        let Some(offset) = self.skip_to_field(index) else {
            return Value::Null(NullKind::BadData);
        };
        match self.schema.field_type(index) {
            Some(PropertyType::Bool) => match self.body.get(offset) {
                Some(&b) => Value::Bool(b != 0),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::Int64 | PropertyType::Timestamp | PropertyType::Vid) => {
                match self.read_i64_le(offset) {
                    Some(i) => Value::Int(i),
                    None => Value::Null(NullKind::BadData),
                }
            }
            Some(PropertyType::Float) => match self.read_f32_le(offset) {
                Some(f) => Value::float(f as f64),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::Double) => match self.read_f64_le(offset) {
                Some(d) => Value::float(d),
                None => Value::Null(NullKind::BadData),
            },
            Some(PropertyType::String) => match self.read_string(offset) {
                Some(s) => Value::Str(s.to_string()),
                None => Value::Null(NullKind::BadData),
            },
            None => Value::Null(NullKind::UnknownProp),
        }
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
        let bytes = self.body.get(offset..offset.checked_add(4)?)?;
        let len = u32::from_le_bytes(bytes.try_into().unwrap()) as usize;
        let start = offset + 4;
        let bytes = self.body.get(start..start.checked_add(len)?)?;
        std::str::from_utf8(bytes).ok()
    }
}
