//! Binary form of expressions: a pre-order walk writing one kind byte per
//! node followed by its kind-specific fields. Used for plan caching and for
//! shipping pushed-down filters to storage. The decoder is the exact
//! inverse.

use quasar_types::bincode::{self, config::Configuration};
use quasar_types::types::Value;

use crate::aggregate::AggFn;
use crate::expr::{AggKind, ArithOp, Expr, ExprArena, ExprId, RelOp};
use crate::ExprError;

const CONFIG: Configuration<
    bincode::config::LittleEndian,
    bincode::config::Fixint,
    bincode::config::NoLimit,
> = bincode::config::legacy();

mod kind {
    pub const CONSTANT: u8 = 0x01;
    pub const ARITHMETIC: u8 = 0x02;
    pub const NEGATE: u8 = 0x03;
    pub const RELATIONAL: u8 = 0x04;
    pub const AND: u8 = 0x05;
    pub const OR: u8 = 0x06;
    pub const XOR: u8 = 0x07;
    pub const NOT: u8 = 0x08;
    pub const TAG_PROP: u8 = 0x09;
    pub const EDGE_PROP: u8 = 0x0a;
    pub const INPUT_PROP: u8 = 0x0b;
    pub const VAR_PROP: u8 = 0x0c;
    pub const SRC_PROP: u8 = 0x0d;
    pub const DST_PROP: u8 = 0x0e;
    pub const EDGE_SRC: u8 = 0x0f;
    pub const EDGE_TYPE: u8 = 0x10;
    pub const EDGE_RANK: u8 = 0x11;
    pub const EDGE_DST: u8 = 0x12;
    pub const LABEL_TAG_PROP: u8 = 0x13;
    pub const LIST: u8 = 0x14;
    pub const SET: u8 = 0x15;
    pub const MAP: u8 = 0x16;
    pub const SUBSCRIPT: u8 = 0x17;
    pub const SUBSCRIPT_RANGE: u8 = 0x18;
    pub const FUNCTION_CALL: u8 = 0x19;
    pub const AGGREGATE: u8 = 0x1a;
    pub const LIST_COMPREHENSION: u8 = 0x1b;
    pub const COLUMN: u8 = 0x1c;
    pub const VERTEX_REF: u8 = 0x1d;
    pub const EDGE_REF: u8 = 0x1e;
    pub const LABEL: u8 = 0x1f;
    pub const UUID: u8 = 0x20;
}

pub struct Cursor<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, at: 0 }
    }

    fn consume(&mut self, len: usize) -> Result<&'a [u8], ExprError> {
        if self.data.len() - self.at < len {
            return Err(ExprError::Truncated(self.at));
        }
        let head = &self.data[self.at..self.at + len];
        self.at += len;
        Ok(head)
    }

    fn read_u8(&mut self) -> Result<u8, ExprError> {
        Ok(self.consume(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, ExprError> {
        Ok(u32::from_le_bytes(self.consume(4)?.try_into().unwrap()))
    }

    fn read_string(&mut self) -> Result<String, ExprError> {
        let len = self.read_u32()? as usize;
        let bytes = self.consume(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| ExprError::BadConstant(e.to_string()))
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    let payload = bincode::serde::encode_to_vec(value, CONFIG)
        .expect("in-memory value encoding cannot fail");
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
}

fn read_value(cursor: &mut Cursor) -> Result<Value, ExprError> {
    let len = cursor.read_u32()? as usize;
    let bytes = cursor.consume(len)?;
    let (value, _) = bincode::serde::decode_from_slice(bytes, CONFIG)
        .map_err(|e| ExprError::BadConstant(e.to_string()))?;
    Ok(value)
}

fn agg_fn_byte(func: AggFn) -> u8 {
    match func {
        AggFn::Count => 0,
        AggFn::Sum => 1,
        AggFn::Avg => 2,
        AggFn::Min => 3,
        AggFn::Max => 4,
        AggFn::Std => 5,
        AggFn::BitAnd => 6,
        AggFn::BitOr => 7,
        AggFn::BitXor => 8,
        AggFn::Collect => 9,
        AggFn::CollectSet => 10,
    }
}

fn agg_fn_from_byte(byte: u8) -> Result<AggFn, ExprError> {
    Ok(match byte {
        0 => AggFn::Count,
        1 => AggFn::Sum,
        2 => AggFn::Avg,
        3 => AggFn::Min,
        4 => AggFn::Max,
        5 => AggFn::Std,
        6 => AggFn::BitAnd,
        7 => AggFn::BitOr,
        8 => AggFn::BitXor,
        9 => AggFn::Collect,
        10 => AggFn::CollectSet,
        other => return Err(ExprError::UnknownKind(other)),
    })
}

impl ExprArena {
    pub fn encode(&self, id: ExprId) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_to(id, &mut out);
        out
    }

    fn write_to(&self, id: ExprId, out: &mut Vec<u8>) {
        match self.node(id) {
            Expr::Constant(value) => {
                out.push(kind::CONSTANT);
                write_value(value, out);
            }
            Expr::Arithmetic { op, left, right } => {
                out.push(kind::ARITHMETIC);
                out.push(*op as u8);
                self.write_to(*left, out);
                self.write_to(*right, out);
            }
            Expr::Negate(operand) => {
                out.push(kind::NEGATE);
                self.write_to(*operand, out);
            }
            Expr::Relational { op, left, right } => {
                out.push(kind::RELATIONAL);
                out.push(*op as u8);
                self.write_to(*left, out);
                self.write_to(*right, out);
            }
            Expr::And(operands) => {
                out.push(kind::AND);
                out.extend_from_slice(&(operands.len() as u32).to_le_bytes());
                for operand in operands {
                    self.write_to(*operand, out);
                }
            }
            Expr::Or(operands) => {
                out.push(kind::OR);
                out.extend_from_slice(&(operands.len() as u32).to_le_bytes());
                for operand in operands {
                    self.write_to(*operand, out);
                }
            }
            Expr::Xor { left, right } => {
                out.push(kind::XOR);
                self.write_to(*left, out);
                self.write_to(*right, out);
            }
            Expr::Not(operand) => {
                out.push(kind::NOT);
                self.write_to(*operand, out);
            }
            Expr::TagProp { tag, prop } => {
                out.push(kind::TAG_PROP);
                write_string(tag, out);
                write_string(prop, out);
            }
            Expr::EdgeProp { edge, prop } => {
                out.push(kind::EDGE_PROP);
                write_string(edge, out);
                write_string(prop, out);
            }
            Expr::InputProp { col } => {
                out.push(kind::INPUT_PROP);
                write_string(col, out);
            }
            Expr::VarProp { var, col } => {
                out.push(kind::VAR_PROP);
                write_string(var, out);
                write_string(col, out);
            }
            Expr::SrcProp { tag, prop } => {
                out.push(kind::SRC_PROP);
                write_string(tag, out);
                write_string(prop, out);
            }
            Expr::DstProp { tag, prop } => {
                out.push(kind::DST_PROP);
                write_string(tag, out);
                write_string(prop, out);
            }
            Expr::EdgeSrc => out.push(kind::EDGE_SRC),
            Expr::EdgeTypeRef => out.push(kind::EDGE_TYPE),
            Expr::EdgeRank => out.push(kind::EDGE_RANK),
            Expr::EdgeDst => out.push(kind::EDGE_DST),
            Expr::LabelTagProp { label, tag, prop } => {
                out.push(kind::LABEL_TAG_PROP);
                write_string(label, out);
                write_string(tag, out);
                write_string(prop, out);
            }
            Expr::ListCtor(items) => {
                out.push(kind::LIST);
                out.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for item in items {
                    self.write_to(*item, out);
                }
            }
            Expr::SetCtor(items) => {
                out.push(kind::SET);
                out.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for item in items {
                    self.write_to(*item, out);
                }
            }
            Expr::MapCtor(items) => {
                out.push(kind::MAP);
                out.extend_from_slice(&(items.len() as u32).to_le_bytes());
                for (key, value) in items {
                    write_string(key, out);
                    self.write_to(*value, out);
                }
            }
            Expr::Subscript { collection, index } => {
                out.push(kind::SUBSCRIPT);
                self.write_to(*collection, out);
                self.write_to(*index, out);
            }
            Expr::SubscriptRange { collection, lo, hi } => {
                out.push(kind::SUBSCRIPT_RANGE);
                out.push(u8::from(lo.is_some()) | (u8::from(hi.is_some()) << 1));
                self.write_to(*collection, out);
                if let Some(lo) = lo {
                    self.write_to(*lo, out);
                }
                if let Some(hi) = hi {
                    self.write_to(*hi, out);
                }
            }
            Expr::FunctionCall { name, args } => {
                out.push(kind::FUNCTION_CALL);
                write_string(name, out);
                out.extend_from_slice(&(args.len() as u32).to_le_bytes());
                for arg in args {
                    self.write_to(*arg, out);
                }
            }
            Expr::Aggregate { kind: agg, arg } => {
                out.push(kind::AGGREGATE);
                out.push(agg_fn_byte(agg.func));
                out.push(u8::from(agg.distinct));
                self.write_to(*arg, out);
            }
            Expr::ListComprehension {
                inner_var,
                collection,
                filter,
                mapping,
            } => {
                out.push(kind::LIST_COMPREHENSION);
                out.push(u8::from(filter.is_some()) | (u8::from(mapping.is_some()) << 1));
                write_string(inner_var, out);
                self.write_to(*collection, out);
                if let Some(filter) = filter {
                    self.write_to(*filter, out);
                }
                if let Some(mapping) = mapping {
                    self.write_to(*mapping, out);
                }
            }
            Expr::Column(index) => {
                out.push(kind::COLUMN);
                out.extend_from_slice(&(*index as u32).to_le_bytes());
            }
            Expr::VertexRef => out.push(kind::VERTEX_REF),
            Expr::EdgeRef => out.push(kind::EDGE_REF),
            Expr::Uuid => out.push(kind::UUID),
            Expr::Label(name) => {
                out.push(kind::LABEL);
                write_string(name, out);
            }
        }
    }

    /// Decodes one expression tree from `data` into this arena, returning
    /// the root id.
    pub fn decode(&mut self, data: &[u8]) -> Result<ExprId, ExprError> {
        let mut cursor = Cursor::new(data);
        let root = self.read_from(&mut cursor)?;
        Ok(root)
    }

    fn read_from(&mut self, cursor: &mut Cursor) -> Result<ExprId, ExprError> {
        let expr = match cursor.read_u8()? {
            kind::CONSTANT => Expr::Constant(read_value(cursor)?),
            kind::ARITHMETIC => {
                let op = match cursor.read_u8()? {
                    0 => ArithOp::Add,
                    1 => ArithOp::Sub,
                    2 => ArithOp::Mul,
                    3 => ArithOp::Div,
                    4 => ArithOp::Mod,
                    other => return Err(ExprError::UnknownKind(other)),
                };
                let left = self.read_from(cursor)?;
                let right = self.read_from(cursor)?;
                Expr::Arithmetic { op, left, right }
            }
            kind::NEGATE => Expr::Negate(self.read_from(cursor)?),
            kind::RELATIONAL => {
                let op = match cursor.read_u8()? {
                    0 => RelOp::Eq,
                    1 => RelOp::Ne,
                    2 => RelOp::Lt,
                    3 => RelOp::Le,
                    4 => RelOp::Gt,
                    5 => RelOp::Ge,
                    6 => RelOp::In,
                    7 => RelOp::NotIn,
                    8 => RelOp::Contains,
                    9 => RelOp::StartsWith,
                    10 => RelOp::EndsWith,
                    other => return Err(ExprError::UnknownKind(other)),
                };
                let left = self.read_from(cursor)?;
                let right = self.read_from(cursor)?;
                Expr::Relational { op, left, right }
            }
            kind::AND => {
                let count = cursor.read_u32()? as usize;
                let mut operands = Vec::with_capacity(count);
                for _ in 0..count {
                    operands.push(self.read_from(cursor)?);
                }
                Expr::And(operands)
            }
            kind::OR => {
                let count = cursor.read_u32()? as usize;
                let mut operands = Vec::with_capacity(count);
                for _ in 0..count {
                    operands.push(self.read_from(cursor)?);
                }
                Expr::Or(operands)
            }
            kind::XOR => {
                let left = self.read_from(cursor)?;
                let right = self.read_from(cursor)?;
                Expr::Xor { left, right }
            }
            kind::NOT => Expr::Not(self.read_from(cursor)?),
            kind::TAG_PROP => Expr::TagProp {
                tag: cursor.read_string()?,
                prop: cursor.read_string()?,
            },
            kind::EDGE_PROP => Expr::EdgeProp {
                edge: cursor.read_string()?,
                prop: cursor.read_string()?,
            },
            kind::INPUT_PROP => Expr::InputProp {
                col: cursor.read_string()?,
            },
            kind::VAR_PROP => Expr::VarProp {
                var: cursor.read_string()?,
                col: cursor.read_string()?,
            },
            kind::SRC_PROP => Expr::SrcProp {
                tag: cursor.read_string()?,
                prop: cursor.read_string()?,
            },
            kind::DST_PROP => Expr::DstProp {
                tag: cursor.read_string()?,
                prop: cursor.read_string()?,
            },
            kind::EDGE_SRC => Expr::EdgeSrc,
            kind::EDGE_TYPE => Expr::EdgeTypeRef,
            kind::EDGE_RANK => Expr::EdgeRank,
            kind::EDGE_DST => Expr::EdgeDst,
            kind::LABEL_TAG_PROP => Expr::LabelTagProp {
                label: cursor.read_string()?,
                tag: cursor.read_string()?,
                prop: cursor.read_string()?,
            },
            kind::LIST => {
                let count = cursor.read_u32()? as usize;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_from(cursor)?);
                }
                Expr::ListCtor(items)
            }
            kind::SET => {
                let count = cursor.read_u32()? as usize;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.read_from(cursor)?);
                }
                Expr::SetCtor(items)
            }
            kind::MAP => {
                let count = cursor.read_u32()? as usize;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = cursor.read_string()?;
                    let value = self.read_from(cursor)?;
                    items.push((key, value));
                }
                Expr::MapCtor(items)
            }
            kind::SUBSCRIPT => {
                let collection = self.read_from(cursor)?;
                let index = self.read_from(cursor)?;
                Expr::Subscript { collection, index }
            }
            kind::SUBSCRIPT_RANGE => {
                let flags = cursor.read_u8()?;
                let collection = self.read_from(cursor)?;
                let lo = if flags & 1 != 0 {
                    Some(self.read_from(cursor)?)
                } else {
                    None
                };
                let hi = if flags & 2 != 0 {
                    Some(self.read_from(cursor)?)
                } else {
                    None
                };
                Expr::SubscriptRange { collection, lo, hi }
            }
            kind::FUNCTION_CALL => {
                let name = cursor.read_string()?;
                let count = cursor.read_u32()? as usize;
                let mut args = Vec::with_capacity(count);
                for _ in 0..count {
                    args.push(self.read_from(cursor)?);
                }
                Expr::FunctionCall { name, args }
            }
            kind::AGGREGATE => {
                let func = agg_fn_from_byte(cursor.read_u8()?)?;
                let distinct = cursor.read_u8()? != 0;
                let arg = self.read_from(cursor)?;
                Expr::Aggregate {
                    kind: AggKind { func, distinct },
                    arg,
                }
            }
            kind::LIST_COMPREHENSION => {
                let flags = cursor.read_u8()?;
                let inner_var = cursor.read_string()?;
                let collection = self.read_from(cursor)?;
                let filter = if flags & 1 != 0 {
                    Some(self.read_from(cursor)?)
                } else {
                    None
                };
                let mapping = if flags & 2 != 0 {
                    Some(self.read_from(cursor)?)
                } else {
                    None
                };
                Expr::ListComprehension {
                    inner_var,
                    collection,
                    filter,
                    mapping,
                }
            }
            kind::COLUMN => Expr::Column(cursor.read_u32()? as usize),
            kind::VERTEX_REF => Expr::VertexRef,
            kind::EDGE_REF => Expr::EdgeRef,
            kind::UUID => Expr::Uuid,
            kind::LABEL => Expr::Label(cursor.read_string()?),
            other => return Err(ExprError::UnknownKind(other)),
        };
        Ok(self.add(expr))
    }
}
