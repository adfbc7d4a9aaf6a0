//! Builtin scalar functions. This registry is the seam an external UDF host
//! plugs into: storage- and graph-side evaluation both resolve names here
//! first and fall back to `Null(UnknownProp)` for anything unknown.

use quasar_types::types::{NullKind, Value};

pub fn call(name: &str, args: &[Value]) -> Value {
    // NULL arguments short-circuit for every builtin except coalesce.
    if !name.eq_ignore_ascii_case("coalesce") {
        if let Some(Value::Null(kind)) = args.iter().find(|a| a.is_null()) {
            return Value::Null(*kind);
        }
    }
    match name.to_ascii_lowercase().as_str() {
        "abs" => numeric_unary(args, |f| f.abs(), |i| i.checked_abs()),
        "ceil" => float_unary(args, f64::ceil),
        "floor" => float_unary(args, f64::floor),
        "round" => float_unary(args, f64::round),
        "sqrt" => match one_number(args) {
            Some(f) if f >= 0.0 => Value::float(f.sqrt()),
            Some(_) => Value::Null(NullKind::NaN),
            None => Value::Null(NullKind::BadType),
        },
        "pow" => match (args.first(), args.get(1)) {
            (Some(Value::Int(base)), Some(Value::Int(exp))) if *exp >= 0 => {
                match base.checked_pow((*exp).min(u32::MAX as i64) as u32) {
                    Some(v) => Value::Int(v),
                    None => Value::Null(NullKind::ErrOverflow),
                }
            }
            (Some(a), Some(b)) => match (number_of(a), number_of(b)) {
                (Some(x), Some(y)) => Value::float(x.powf(y)),
                _ => Value::Null(NullKind::BadType),
            },
            _ => Value::Null(NullKind::BadType),
        },
        "sign" => match one_number(args) {
            Some(f) => Value::Int(if f > 0.0 {
                1
            } else if f < 0.0 {
                -1
            } else {
                0
            }),
            None => Value::Null(NullKind::BadType),
        },
        "size" | "length" => match args.first() {
            Some(Value::Str(s)) => Value::Int(s.chars().count() as i64),
            Some(Value::List(items)) => Value::Int(items.len() as i64),
            Some(Value::Set(items)) => Value::Int(items.len() as i64),
            Some(Value::Map(map)) => Value::Int(map.len() as i64),
            Some(Value::Path(p)) if name.eq_ignore_ascii_case("length") => {
                Value::Int(p.len() as i64)
            }
            _ => Value::Null(NullKind::BadType),
        },
        "lower" | "tolower" => str_unary(args, |s| s.to_lowercase()),
        "upper" | "toupper" => str_unary(args, |s| s.to_uppercase()),
        "trim" => str_unary(args, |s| s.trim().to_string()),
        "left" => str_take(args, true),
        "right" => str_take(args, false),
        "contains" => match (args.first(), args.get(1)) {
            (Some(Value::Str(a)), Some(Value::Str(b))) => Value::Bool(a.contains(b.as_str())),
            _ => Value::Null(NullKind::BadType),
        },
        "head" => match args.first() {
            Some(Value::List(items)) => items.first().cloned().unwrap_or(Value::NULL),
            _ => Value::Null(NullKind::BadType),
        },
        "last" => match args.first() {
            Some(Value::List(items)) => items.last().cloned().unwrap_or(Value::NULL),
            _ => Value::Null(NullKind::BadType),
        },
        "range" => match (args.first(), args.get(1)) {
            (Some(Value::Int(start)), Some(Value::Int(end))) => {
                let step = match args.get(2) {
                    Some(Value::Int(s)) if *s != 0 => *s,
                    None => 1,
                    _ => return Value::Null(NullKind::BadType),
                };
                let mut out = vec![];
                let mut at = *start;
                while (step > 0 && at <= *end) || (step < 0 && at >= *end) {
                    out.push(Value::Int(at));
                    at += step;
                }
                Value::List(out)
            }
            _ => Value::Null(NullKind::BadType),
        },
        "keys" => match args.first() {
            Some(Value::Map(map)) => {
                let mut keys: Vec<String> = map.keys().cloned().collect();
                keys.sort_unstable();
                Value::List(keys.into_iter().map(Value::Str).collect())
            }
            Some(Value::Vertex(v)) => {
                let mut keys: Vec<String> = v
                    .tags
                    .iter()
                    .flat_map(|t| t.props.keys().cloned())
                    .collect();
                keys.sort_unstable();
                keys.dedup();
                Value::List(keys.into_iter().map(Value::Str).collect())
            }
            Some(Value::Edge(e)) => {
                let mut keys: Vec<String> = e.props.keys().cloned().collect();
                keys.sort_unstable();
                Value::List(keys.into_iter().map(Value::Str).collect())
            }
            _ => Value::Null(NullKind::BadType),
        },
        "id" => match args.first() {
            Some(Value::Vertex(v)) => v.vid.clone(),
            _ => Value::Null(NullKind::BadType),
        },
        "coalesce" => args
            .iter()
            .find(|a| !a.is_null() && !a.is_empty_value())
            .cloned()
            .unwrap_or(Value::NULL),
        _ => Value::Null(NullKind::UnknownProp),
    }
}

fn number_of(v: &Value) -> Option<f64> {
    match v {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(f.0),
        _ => None,
    }
}

fn one_number(args: &[Value]) -> Option<f64> {
    args.first().and_then(number_of)
}

fn numeric_unary(
    args: &[Value],
    float_op: impl Fn(f64) -> f64,
    int_op: impl Fn(i64) -> Option<i64>,
) -> Value {
    match args.first() {
        Some(Value::Int(i)) => match int_op(*i) {
            Some(v) => Value::Int(v),
            None => Value::Null(NullKind::ErrOverflow),
        },
        Some(Value::Float(f)) => Value::float(float_op(f.0)),
        _ => Value::Null(NullKind::BadType),
    }
}

fn float_unary(args: &[Value], op: impl Fn(f64) -> f64) -> Value {
    match one_number(args) {
        Some(f) => Value::float(op(f)),
        None => Value::Null(NullKind::BadType),
    }
}

fn str_unary(args: &[Value], op: impl Fn(&str) -> String) -> Value {
    match args.first() {
        Some(Value::Str(s)) => Value::Str(op(s)),
        _ => Value::Null(NullKind::BadType),
    }
}

fn str_take(args: &[Value], from_start: bool) -> Value {
    match (args.first(), args.get(1)) {
        (Some(Value::Str(s)), Some(Value::Int(n))) => {
            if *n < 0 {
                return Value::Null(NullKind::BadType);
            }
            let n = *n as usize;
            let chars: Vec<char> = s.chars().collect();
            let taken: String = if from_start {
                chars.iter().take(n).collect()
            } else {
                let skip = chars.len().saturating_sub(n);
                chars.iter().skip(skip).collect()
            };
            Value::Str(taken)
        }
        _ => Value::Null(NullKind::BadType),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_builtins() {
        assert_eq!(call("abs", &[Value::Int(-3)]), Value::Int(3));
        assert_eq!(call("abs", &[Value::float(-1.5)]), Value::float(1.5));
        assert_eq!(call("floor", &[Value::float(2.7)]), Value::float(2.0));
        assert_eq!(call("pow", &[Value::Int(2), Value::Int(10)]), Value::Int(1024));
        assert_eq!(call("sqrt", &[Value::Int(-1)]), Value::Null(NullKind::NaN));
        assert_eq!(call("sign", &[Value::Int(-9)]), Value::Int(-1));
    }

    #[test]
    fn string_builtins() {
        assert_eq!(call("upper", &[Value::from("abc")]), Value::from("ABC"));
        assert_eq!(call("size", &[Value::from("abc")]), Value::Int(3));
        assert_eq!(
            call("left", &[Value::from("hello"), Value::Int(2)]),
            Value::from("he")
        );
        assert_eq!(
            call("right", &[Value::from("hello"), Value::Int(2)]),
            Value::from("lo")
        );
    }

    #[test]
    fn list_builtins() {
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call("head", &[list.clone()]), Value::Int(1));
        assert_eq!(call("last", &[list.clone()]), Value::Int(2));
        assert_eq!(call("size", &[list]), Value::Int(2));
        assert_eq!(
            call("range", &[Value::Int(1), Value::Int(3)]),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn null_arguments_short_circuit() {
        assert_eq!(
            call("abs", &[Value::Null(NullKind::DivByZero)]),
            Value::Null(NullKind::DivByZero)
        );
        assert_eq!(
            call("coalesce", &[Value::NULL, Value::Int(7)]),
            Value::Int(7)
        );
    }

    #[test]
    fn unknown_function_is_unknown_prop() {
        assert_eq!(call("no_such_fn", &[]), Value::Null(NullKind::UnknownProp));
    }
}
