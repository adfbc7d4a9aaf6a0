use quasar_types::schema::{PropertyType, SchemaProvider};
use quasar_types::types::Value;

use crate::varint::encode_varint;
use crate::CodecError;

/// v2 header marker: bit 3 set, low three bits carry the version-byte count.
pub(crate) const V2_TAG: u8 = 0x08;

fn version_bytes(version: u32) -> usize {
    match version {
        0 => 0,
        v if v < 1 << 8 => 1,
        v if v < 1 << 16 => 2,
        v if v < 1 << 24 => 3,
        _ => 4,
    }
}

fn push_version(version: u32, ver_bytes: usize, out: &mut Vec<u8>) {
    out.extend_from_slice(&version.to_le_bytes()[..ver_bytes]);
}

fn type_mismatch(schema: &dyn SchemaProvider, index: usize) -> CodecError {
    CodecError::FieldTypeMismatch {
        field: schema.field_name(index).unwrap_or("?").to_string(),
        expected: schema.field_type(index).unwrap_or(PropertyType::String),
    }
}

/// The production row writer. Emits the v2 wire format only: readers keep
/// handling v1 rows, writers never produce them.
pub struct RowWriter<'a> {
    schema: &'a dyn SchemaProvider,
}

impl<'a> RowWriter<'a> {
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self { schema }
    }

    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>, CodecError> {
        let num_fields = self.schema.num_fields();
        if values.len() != num_fields {
            return Err(CodecError::FieldCountMismatch {
                expected: num_fields,
                actual: values.len(),
            });
        }

        let version = self.schema.version();
        let ver_bytes = version_bytes(version);
        let bitmap_len = num_fields.div_ceil(8);

        let mut out = Vec::with_capacity(1 + ver_bytes + bitmap_len + num_fields * 8);
        out.push(V2_TAG | ver_bytes as u8);
        push_version(version, ver_bytes, &mut out);

        let bitmap_start = out.len();
        out.resize(bitmap_start + bitmap_len, 0);

        for (index, value) in values.iter().enumerate() {
            // A missing value falls back to the schema default, then to NULL.
            let effective = if value.is_empty_value() || value.is_null() {
                match self.schema.field_default(index) {
                    Some(default) => default,
                    None if self.schema.field_nullable(index) => {
                        out[bitmap_start + (index >> 3)] |= 1 << (index & 7);
                        continue;
                    }
                    None => {
                        return Err(CodecError::FieldRequired(
                            self.schema.field_name(index).unwrap_or("?").to_string(),
                        ))
                    }
                }
            } else {
                value
            };
            self.write_cell(index, effective, &mut out)?;
        }

        Ok(out)
    }

    fn write_cell(&self, index: usize, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let prop_type = self.schema.field_type(index).unwrap();
        match (prop_type, value) {
            (PropertyType::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
            (PropertyType::Int64 | PropertyType::Timestamp | PropertyType::Vid, Value::Int(i)) => {
                out.extend_from_slice(&i.to_le_bytes());
            }
            (PropertyType::Float, Value::Float(f)) => {
                out.extend_from_slice(&(f.0 as f32).to_le_bytes());
            }
            (PropertyType::Double, Value::Float(f)) => {
                out.extend_from_slice(&f.0.to_le_bytes());
            }
            (PropertyType::Double | PropertyType::Float, Value::Int(i)) => {
                // Numeric widening on write keeps inserts forgiving.
                let as_float = *i as f64;
                if prop_type == PropertyType::Float {
                    out.extend_from_slice(&(as_float as f32).to_le_bytes());
                } else {
                    out.extend_from_slice(&as_float.to_le_bytes());
                }
            }
            (PropertyType::String, Value::Str(s)) => {
                out.extend_from_slice(&(s.len() as u32).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            _ => return Err(type_mismatch(self.schema, index)),
        }
        Ok(())
    }
}

/// Legacy v1 writer, kept for migration tooling and read-compatibility
/// tests. Layout: header byte (`verBytes << 5 | offsetBytes - 1`), version,
/// one block offset per full 16 fields, then varint-framed cells.
pub struct RowWriterV1<'a> {
    schema: &'a dyn SchemaProvider,
}

impl<'a> RowWriterV1<'a> {
    pub fn new(schema: &'a dyn SchemaProvider) -> Self {
        Self { schema }
    }

    pub fn encode(&self, values: &[Value]) -> Result<Vec<u8>, CodecError> {
        let num_fields = self.schema.num_fields();
        if values.len() != num_fields {
            return Err(CodecError::FieldCountMismatch {
                expected: num_fields,
                actual: values.len(),
            });
        }

        // Encode the field area first; block offsets become known as a side
        // effect.
        let mut body = Vec::new();
        let num_blocks = num_fields >> 4;
        let mut block_offsets = Vec::with_capacity(num_blocks);
        for (index, value) in values.iter().enumerate() {
            if index > 0 && index & 0x0f == 0 {
                block_offsets.push(body.len());
            }
            self.write_cell(index, value, &mut body)?;
        }
        if block_offsets.len() < num_blocks {
            // The last block boundary sits exactly at the end of the row.
            block_offsets.push(body.len());
        }

        let offset_bytes: usize = if body.len() <= u16::MAX as usize {
            2
        } else if body.len() <= u32::MAX as usize {
            4
        } else {
            8
        };
        let version = self.schema.version();
        let ver_bytes = version_bytes(version);

        let mut out =
            Vec::with_capacity(1 + ver_bytes + num_blocks * offset_bytes + body.len());
        out.push(((ver_bytes as u8) << 5) | (offset_bytes as u8 - 1));
        push_version(version, ver_bytes, &mut out);
        for offset in block_offsets {
            out.extend_from_slice(&(offset as u64).to_le_bytes()[..offset_bytes]);
        }
        out.extend_from_slice(&body);
        Ok(out)
    }

    fn write_cell(&self, index: usize, value: &Value, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let prop_type = self.schema.field_type(index).unwrap();
        match (prop_type, value) {
            (PropertyType::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
            (PropertyType::Int64 | PropertyType::Timestamp, Value::Int(i)) => {
                encode_varint(*i as u64, out);
            }
            (PropertyType::Vid, Value::Int(i)) => out.extend_from_slice(&i.to_le_bytes()),
            (PropertyType::Float, Value::Float(f)) => {
                out.extend_from_slice(&(f.0 as f32).to_le_bytes());
            }
            (PropertyType::Double, Value::Float(f)) => {
                out.extend_from_slice(&f.0.to_le_bytes());
            }
            (PropertyType::String, Value::Str(s)) => {
                encode_varint(s.len() as u64, out);
                out.extend_from_slice(s.as_bytes());
            }
            _ => return Err(type_mismatch(self.schema, index)),
        }
        Ok(())
    }
}
