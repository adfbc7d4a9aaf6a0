//! The versioned row codec and the persisted key layout.
//!
//! A row is a positional encoding of a schema's fields behind a small
//! header. Two wire versions exist: v1 (varint framed, block offsets) and
//! v2 (null bitmap, fixed-width cells). Readers handle both, dispatching on
//! the first byte; the production writer emits v2 only.
//!
//! Field reads are value-level: a damaged or truncated cell produces
//! `Value::Null(BadData)`, never an error and never a read past the row
//! bytes. Only a header too short to parse is a status-level `CodecError`.

pub mod keys;
mod row_reader;
mod row_reader_v1;
mod row_reader_v2;
mod row_writer;
mod varint;

pub use row_reader::RowReader;
pub use row_reader_v1::RowReaderV1;
pub use row_reader_v2::RowReaderV2;
pub use row_writer::{RowWriter, RowWriterV1};

use quasar_types::schema::PropertyType;
use quasar_types::thiserror::{self, Error};

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Row data is too short: {0} bytes")]
    TooShort(usize),
    #[error("Unknown row version byte: {0:#04x}")]
    UnknownVersion(u8),
    #[error("Schema has {expected} fields but {actual} values were supplied")]
    FieldCountMismatch { expected: usize, actual: usize },
    #[error("Field `{field}` expects {expected:?} but got an incompatible value")]
    FieldTypeMismatch {
        field: String,
        expected: PropertyType,
    },
    #[error("Field `{0}` is not nullable and has no default")]
    FieldRequired(String),
    #[error("Vertex id is longer than the configured vid_len: {0} > {1}")]
    VidTooLong(usize, usize),
}
