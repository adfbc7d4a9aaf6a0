//! Aggregate accumulators.
//!
//! One [`Aggregator`] instance exists per (group, item) pair and lives for
//! the duration of the grouping; `apply` folds values in, `result` emits
//! the final value. A bad operand never errors, it poisons the accumulator
//! into the matching NULL result.

use std::collections::BTreeSet;

use quasar_types::ahash::AHashSet;
use quasar_types::types::{NullKind, Value};

use crate::ExprError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    Std,
    BitAnd,
    BitOr,
    BitXor,
    Collect,
    CollectSet,
}

impl AggFn {
    pub fn from_name(name: &str) -> Result<AggFn, ExprError> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Ok(AggFn::Count),
            "SUM" => Ok(AggFn::Sum),
            "AVG" => Ok(AggFn::Avg),
            "MIN" => Ok(AggFn::Min),
            "MAX" => Ok(AggFn::Max),
            "STD" => Ok(AggFn::Std),
            "BIT_AND" => Ok(AggFn::BitAnd),
            "BIT_OR" => Ok(AggFn::BitOr),
            "BIT_XOR" => Ok(AggFn::BitXor),
            "COLLECT" => Ok(AggFn::Collect),
            "COLLECT_SET" => Ok(AggFn::CollectSet),
            other => Err(ExprError::UnknownAggregate(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AggFn::Count => "COUNT",
            AggFn::Sum => "SUM",
            AggFn::Avg => "AVG",
            AggFn::Min => "MIN",
            AggFn::Max => "MAX",
            AggFn::Std => "STD",
            AggFn::BitAnd => "BIT_AND",
            AggFn::BitOr => "BIT_OR",
            AggFn::BitXor => "BIT_XOR",
            AggFn::Collect => "COLLECT",
            AggFn::CollectSet => "COLLECT_SET",
        }
    }
}

#[derive(Clone, Debug)]
enum AggState {
    Count(u64),
    /// Running sum plus a promotion flag: all-int input stays Int.
    Sum { sum: f64, all_int: bool, count: u64 },
    Avg { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    /// Welford accumulation; variance divides by N (population).
    Std { count: u64, mean: f64, m2: f64 },
    Bits { acc: Option<i64> },
    Collect(Vec<Value>),
    CollectSet(BTreeSet<Value>),
}

#[derive(Clone, Debug)]
pub struct Aggregator {
    func: AggFn,
    distinct: bool,
    seen: AHashSet<Value>,
    state: AggState,
    poisoned: Option<NullKind>,
}

impl Aggregator {
    pub fn new(func: AggFn, distinct: bool) -> Self {
        let state = match func {
            AggFn::Count => AggState::Count(0),
            AggFn::Sum => AggState::Sum {
                sum: 0.0,
                all_int: true,
                count: 0,
            },
            AggFn::Avg => AggState::Avg { sum: 0.0, count: 0 },
            AggFn::Min => AggState::Min(None),
            AggFn::Max => AggState::Max(None),
            AggFn::Std => AggState::Std {
                count: 0,
                mean: 0.0,
                m2: 0.0,
            },
            AggFn::BitAnd | AggFn::BitOr | AggFn::BitXor => AggState::Bits { acc: None },
            AggFn::Collect => AggState::Collect(vec![]),
            AggFn::CollectSet => AggState::CollectSet(BTreeSet::new()),
        };
        Self {
            func,
            distinct,
            seen: AHashSet::new(),
            state,
            poisoned: None,
        }
    }

    pub fn func(&self) -> AggFn {
        self.func
    }

    pub fn apply(&mut self, value: &Value) {
        if self.poisoned.is_some() {
            return;
        }
        // Every function ignores NULL and Empty inputs. COUNT(*) counts
        // rows by being applied to a never-null argument.
        if value.is_null() || value.is_empty_value() {
            return;
        }
        if self.distinct && !self.seen.insert(value.clone()) {
            return;
        }

        match &mut self.state {
            AggState::Count(count) => *count += 1,
            AggState::Sum { sum, all_int, count } => match value {
                Value::Int(i) => {
                    *sum += *i as f64;
                    *count += 1;
                }
                Value::Float(f) => {
                    *sum += f.0;
                    *all_int = false;
                    *count += 1;
                }
                _ => self.poisoned = Some(NullKind::BadType),
            },
            AggState::Avg { sum, count } => match value.as_number_for_agg() {
                Some(f) => {
                    *sum += f;
                    *count += 1;
                }
                None => self.poisoned = Some(NullKind::BadType),
            },
            AggState::Min(current) => match current {
                Some(best) if &*best <= value => {}
                _ => *current = Some(value.clone()),
            },
            AggState::Max(current) => match current {
                Some(best) if &*best >= value => {}
                _ => *current = Some(value.clone()),
            },
            AggState::Std { count, mean, m2 } => match value.as_number_for_agg() {
                Some(f) => {
                    *count += 1;
                    let delta = f - *mean;
                    *mean += delta / *count as f64;
                    *m2 += delta * (f - *mean);
                }
                None => self.poisoned = Some(NullKind::BadType),
            },
            AggState::Bits { acc } => match value {
                Value::Int(i) => {
                    *acc = Some(match (*acc, self.func) {
                        (None, _) => *i,
                        (Some(prev), AggFn::BitAnd) => prev & i,
                        (Some(prev), AggFn::BitOr) => prev | i,
                        (Some(prev), AggFn::BitXor) => prev ^ i,
                        (Some(prev), _) => prev,
                    });
                }
                _ => self.poisoned = Some(NullKind::BadType),
            },
            AggState::Collect(items) => items.push(value.clone()),
            AggState::CollectSet(set) => {
                set.insert(value.clone());
            }
        }
    }

    pub fn result(&self) -> Value {
        if let Some(kind) = self.poisoned {
            return Value::Null(kind);
        }
        match &self.state {
            AggState::Count(count) => Value::Int(*count as i64),
            AggState::Sum { sum, all_int, count } => {
                if *count == 0 {
                    Value::NULL
                } else if *all_int {
                    Value::Int(*sum as i64)
                } else {
                    Value::float(*sum)
                }
            }
            AggState::Avg { sum, count } => {
                if *count == 0 {
                    Value::NULL
                } else {
                    Value::float(sum / *count as f64)
                }
            }
            AggState::Min(current) => current.clone().unwrap_or(Value::NULL),
            AggState::Max(current) => current.clone().unwrap_or(Value::NULL),
            AggState::Std { count, m2, .. } => {
                if *count == 0 {
                    Value::NULL
                } else {
                    Value::float((m2 / *count as f64).sqrt())
                }
            }
            AggState::Bits { acc } => match acc {
                Some(bits) => Value::Int(*bits),
                None => Value::NULL,
            },
            AggState::Collect(items) => Value::List(items.clone()),
            AggState::CollectSet(set) => Value::Set(set.clone()),
        }
    }
}

trait NumberForAgg {
    fn as_number_for_agg(&self) -> Option<f64>;
}

impl NumberForAgg for Value {
    fn as_number_for_agg(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(f.0),
            _ => None,
        }
    }
}
