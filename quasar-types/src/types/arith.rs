use ordered_float::OrderedFloat;

use super::{NullKind, Value};

fn bad_type() -> Value {
    Value::Null(NullKind::BadType)
}

/// Arithmetic and logical operations. All of them are total: a failed
/// operation yields a `Null(kind)` value, never an error (value-level and
/// status-level failures stay on separate channels).
impl Value {
    fn arith_sentinel(&self, other: &Value) -> Option<Value> {
        if let Value::Null(kind) = self {
            return Some(Value::Null(*kind));
        }
        if let Value::Null(kind) = other {
            return Some(Value::Null(*kind));
        }
        if self.is_empty_value() || other.is_empty_value() {
            return Some(Value::Empty);
        }
        None
    }

    pub fn add(&self, other: &Value) -> Value {
        if let Some(v) = self.arith_sentinel(other) {
            return v;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::ErrOverflow),
            },
            (Value::Str(a), Value::Str(b)) => {
                let mut s = String::with_capacity(a.len() + b.len());
                s.push_str(a);
                s.push_str(b);
                Value::Str(s)
            }
            (Value::List(a), Value::List(b)) => {
                let mut items = a.clone();
                items.extend(b.iter().cloned());
                Value::List(items)
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Value::Float(OrderedFloat(a + b)),
                _ => bad_type(),
            },
        }
    }

    pub fn sub(&self, other: &Value) -> Value {
        if let Some(v) = self.arith_sentinel(other) {
            return v;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => match a.checked_sub(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::ErrOverflow),
            },
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Value::Float(OrderedFloat(a - b)),
                _ => bad_type(),
            },
        }
    }

    pub fn mul(&self, other: &Value) -> Value {
        if let Some(v) = self.arith_sentinel(other) {
            return v;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => match a.checked_mul(*b) {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::ErrOverflow),
            },
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Value::Float(OrderedFloat(a * b)),
                _ => bad_type(),
            },
        }
    }

    pub fn div(&self, other: &Value) -> Value {
        if let Some(v) = self.arith_sentinel(other) {
            return v;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Value::Null(NullKind::DivByZero);
                }
                match a.checked_div(*b) {
                    Some(v) => Value::Int(v),
                    None => Value::Null(NullKind::ErrOverflow),
                }
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => {
                    if b == 0.0 {
                        Value::Null(NullKind::DivByZero)
                    } else {
                        Value::Float(OrderedFloat(a / b))
                    }
                }
                _ => bad_type(),
            },
        }
    }

    pub fn rem(&self, other: &Value) -> Value {
        if let Some(v) = self.arith_sentinel(other) {
            return v;
        }
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => {
                if *b == 0 {
                    return Value::Null(NullKind::DivByZero);
                }
                match a.checked_rem(*b) {
                    Some(v) => Value::Int(v),
                    None => Value::Null(NullKind::ErrOverflow),
                }
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => {
                    if b == 0.0 {
                        Value::Null(NullKind::DivByZero)
                    } else {
                        Value::Float(OrderedFloat(a % b))
                    }
                }
                _ => bad_type(),
            },
        }
    }

    pub fn neg(&self) -> Value {
        match self {
            Value::Null(kind) => Value::Null(*kind),
            Value::Empty => Value::Empty,
            Value::Int(i) => match i.checked_neg() {
                Some(v) => Value::Int(v),
                None => Value::Null(NullKind::ErrOverflow),
            },
            Value::Float(f) => Value::Float(OrderedFloat(-f.0)),
            _ => bad_type(),
        }
    }

    /// Three-valued AND. `false` wins over NULL, NULL wins over `true`.
    pub fn and(&self, other: &Value) -> Value {
        let sides = [self.truth(), other.truth()];
        if sides.iter().any(|s| matches!(s, Truth::False)) {
            return Value::Bool(false);
        }
        if let Some(kind) = first_null(&sides) {
            return Value::Null(kind);
        }
        if sides.iter().any(|s| matches!(s, Truth::Empty)) {
            return Value::Empty;
        }
        Value::Bool(true)
    }

    /// Three-valued OR. `true` wins over NULL, NULL wins over `false`.
    pub fn or(&self, other: &Value) -> Value {
        let sides = [self.truth(), other.truth()];
        if sides.iter().any(|s| matches!(s, Truth::True)) {
            return Value::Bool(true);
        }
        if let Some(kind) = first_null(&sides) {
            return Value::Null(kind);
        }
        if sides.iter().any(|s| matches!(s, Truth::Empty)) {
            return Value::Empty;
        }
        Value::Bool(false)
    }

    pub fn xor(&self, other: &Value) -> Value {
        let sides = [self.truth(), other.truth()];
        if let Some(kind) = first_null(&sides) {
            return Value::Null(kind);
        }
        if sides.iter().any(|s| matches!(s, Truth::Empty)) {
            return Value::Empty;
        }
        let a = matches!(sides[0], Truth::True);
        let b = matches!(sides[1], Truth::True);
        Value::Bool(a != b)
    }

    pub fn not(&self) -> Value {
        match self.truth() {
            Truth::True => Value::Bool(false),
            Truth::False => Value::Bool(true),
            Truth::Null(kind) => Value::Null(kind),
            Truth::Empty => Value::Empty,
            Truth::NotBool => bad_type(),
        }
    }

    fn truth(&self) -> Truth {
        match self {
            Value::Bool(true) => Truth::True,
            Value::Bool(false) => Truth::False,
            Value::Null(kind) => Truth::Null(*kind),
            Value::Empty => Truth::Empty,
            _ => Truth::NotBool,
        }
    }
}

#[derive(Clone, Copy)]
enum Truth {
    True,
    False,
    Null(NullKind),
    Empty,
    NotBool,
}

fn first_null(sides: &[Truth]) -> Option<NullKind> {
    sides.iter().find_map(|s| match s {
        Truth::Null(kind) => Some(*kind),
        Truth::NotBool => Some(NullKind::BadType),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic_stays_int() {
        assert_eq!(Value::Int(2).add(&Value::Int(3)), Value::Int(5));
        assert_eq!(Value::Int(7).div(&Value::Int(2)), Value::Int(3));
        assert_eq!(Value::Int(7).rem(&Value::Int(2)), Value::Int(1));
    }

    #[test]
    fn int_overflow_is_null() {
        assert_eq!(
            Value::Int(i64::MAX).add(&Value::Int(1)),
            Value::Null(NullKind::ErrOverflow)
        );
        assert_eq!(
            Value::Int(i64::MIN).neg(),
            Value::Null(NullKind::ErrOverflow)
        );
    }

    #[test]
    fn mixing_promotes_to_float() {
        assert_eq!(Value::Int(1).add(&Value::float(0.5)), Value::float(1.5));
        assert_eq!(Value::float(4.0).mul(&Value::Int(2)), Value::float(8.0));
    }

    #[test]
    fn string_and_list_concat() {
        assert_eq!(
            Value::from("foo").add(&Value::from("bar")),
            Value::from("foobar")
        );
        assert_eq!(
            Value::List(vec![Value::Int(1)]).add(&Value::List(vec![Value::Int(2)])),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }

    #[test]
    fn division_by_zero() {
        assert_eq!(
            Value::Int(1).div(&Value::Int(0)),
            Value::Null(NullKind::DivByZero)
        );
        assert_eq!(
            Value::float(1.0).rem(&Value::Int(0)),
            Value::Null(NullKind::DivByZero)
        );
    }

    #[test]
    fn first_seen_null_kind_wins() {
        assert_eq!(
            Value::Null(NullKind::DivByZero).add(&Value::Null(NullKind::BadData)),
            Value::Null(NullKind::DivByZero)
        );
        assert_eq!(
            Value::Int(1).add(&Value::Null(NullKind::BadData)),
            Value::Null(NullKind::BadData)
        );
    }

    #[test]
    fn unsupported_operands_are_bad_type() {
        assert_eq!(
            Value::from("a").add(&Value::Int(1)),
            Value::Null(NullKind::BadType)
        );
        assert_eq!(Value::Bool(true).mul(&Value::Int(1)), Value::Null(NullKind::BadType));
    }

    #[test]
    fn three_valued_logic() {
        let null = Value::NULL;
        assert_eq!(Value::Bool(true).and(&null), Value::NULL);
        assert_eq!(Value::Bool(false).and(&null), Value::Bool(false));
        assert_eq!(null.or(&Value::Bool(true)), Value::Bool(true));
        assert_eq!(null.or(&Value::Bool(false)), Value::NULL);
        assert_eq!(null.not(), Value::NULL);
        assert_eq!(Value::Bool(true).xor(&Value::Bool(false)), Value::Bool(true));
        assert_eq!(Value::Bool(true).xor(&Value::Bool(true)), Value::Bool(false));
    }
}
