use quasar_types::types::{NullKind, PropertyMap, Value};

use crate::expr::{ArithOp, Expr, ExprArena, ExprId, RelOp};
use crate::functions;

/// What an expression may ask of its surroundings. Property lookups that the
/// context cannot answer return `Null(UnknownProp)`.
pub trait EvalContext {
    fn input_prop(&self, _col: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn var_prop(&self, _var: &str, _col: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn tag_prop(&self, _tag: &str, _prop: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn edge_prop(&self, _edge: &str, _prop: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn src_prop(&self, _tag: &str, _prop: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn dst_prop(&self, _tag: &str, _prop: &str) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn column(&self, _index: usize) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn vertex(&self) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    fn edge(&self) -> Value {
        Value::Null(NullKind::UnknownProp)
    }

    /// Comprehension inner variables. Contexts that support them keep a
    /// small scoped map; the default supports none.
    fn set_inner_var(&mut self, _name: &str, _value: Value) {}

    fn unset_inner_var(&mut self, _name: &str) {}

    fn inner_var(&self, _name: &str) -> Option<Value> {
        None
    }
}

impl ExprArena {
    /// Evaluates the subtree rooted at `id`. Total: data-level failures come
    /// back as `Null(kind)` values, never as errors, so one bad row cannot
    /// fail a scan.
    pub fn eval(&self, id: ExprId, ctx: &mut dyn EvalContext) -> Value {
        match self.node(id) {
            Expr::Constant(v) => v.clone(),
            Expr::Arithmetic { op, left, right } => {
                let lhs = self.eval(*left, ctx);
                let rhs = self.eval(*right, ctx);
                match op {
                    ArithOp::Add => lhs.add(&rhs),
                    ArithOp::Sub => lhs.sub(&rhs),
                    ArithOp::Mul => lhs.mul(&rhs),
                    ArithOp::Div => lhs.div(&rhs),
                    ArithOp::Mod => lhs.rem(&rhs),
                }
            }
            Expr::Negate(operand) => self.eval(*operand, ctx).neg(),
            Expr::Relational { op, left, right } => {
                let lhs = self.eval(*left, ctx);
                let rhs = self.eval(*right, ctx);
                eval_relational(*op, &lhs, &rhs)
            }
            Expr::And(operands) => self.eval_and(operands, ctx),
            Expr::Or(operands) => self.eval_or(operands, ctx),
            Expr::Xor { left, right } => {
                let lhs = self.eval(*left, ctx);
                let rhs = self.eval(*right, ctx);
                lhs.xor(&rhs)
            }
            Expr::Not(operand) => self.eval(*operand, ctx).not(),
            Expr::TagProp { tag, prop } => ctx.tag_prop(tag, prop),
            Expr::EdgeProp { edge, prop } => ctx.edge_prop(edge, prop),
            Expr::InputProp { col } => match ctx.inner_var(col) {
                Some(v) => v,
                None => ctx.input_prop(col),
            },
            Expr::VarProp { var, col } => ctx.var_prop(var, col),
            Expr::SrcProp { tag, prop } => ctx.src_prop(tag, prop),
            Expr::DstProp { tag, prop } => ctx.dst_prop(tag, prop),
            Expr::EdgeSrc => edge_attr(ctx.edge(), "_src"),
            Expr::EdgeTypeRef => edge_attr(ctx.edge(), "_type"),
            Expr::EdgeRank => edge_attr(ctx.edge(), "_rank"),
            Expr::EdgeDst => edge_attr(ctx.edge(), "_dst"),
            Expr::LabelTagProp { label: _, tag, prop } => ctx.tag_prop(tag, prop),
            Expr::ListCtor(items) => {
                Value::List(items.iter().map(|i| self.eval(*i, ctx)).collect())
            }
            Expr::SetCtor(items) => {
                Value::Set(items.iter().map(|i| self.eval(*i, ctx)).collect())
            }
            Expr::MapCtor(items) => {
                let mut map = PropertyMap::new();
                for (key, value) in items {
                    map.insert(key.clone(), self.eval(*value, ctx));
                }
                Value::Map(map)
            }
            Expr::Subscript { collection, index } => {
                let target = self.eval(*collection, ctx);
                let key = self.eval(*index, ctx);
                eval_subscript(&target, &key)
            }
            Expr::SubscriptRange { collection, lo, hi } => {
                let target = self.eval(*collection, ctx);
                let lo = lo.map(|l| self.eval(l, ctx));
                let hi = hi.map(|h| self.eval(h, ctx));
                eval_subscript_range(&target, lo, hi)
            }
            Expr::FunctionCall { name, args } => {
                let args: Vec<Value> = args.iter().map(|a| self.eval(*a, ctx)).collect();
                functions::call(name, &args)
            }
            // The aggregate executor owns accumulator state; evaluated as a
            // plain expression, an aggregate yields its argument.
            Expr::Aggregate { arg, .. } => self.eval(*arg, ctx),
            Expr::ListComprehension {
                inner_var,
                collection,
                filter,
                mapping,
            } => self.eval_list_comprehension(inner_var, *collection, *filter, *mapping, ctx),
            Expr::Column(index) => ctx.column(*index),
            Expr::VertexRef => ctx.vertex(),
            Expr::EdgeRef => ctx.edge(),
            Expr::Uuid => Value::Str(uuid::Uuid::new_v4().to_string()),
            Expr::Label(_) => Value::Null(NullKind::UnknownProp),
        }
    }

    fn eval_and(&self, operands: &[ExprId], ctx: &mut dyn EvalContext) -> Value {
        let mut result = Value::Bool(true);
        for operand in operands {
            let v = self.eval(*operand, ctx);
            if v == Value::Bool(false) {
                return Value::Bool(false);
            }
            result = result.and(&v);
        }
        result
    }

    fn eval_or(&self, operands: &[ExprId], ctx: &mut dyn EvalContext) -> Value {
        let mut result = Value::Bool(false);
        for operand in operands {
            let v = self.eval(*operand, ctx);
            if v == Value::Bool(true) {
                return Value::Bool(true);
            }
            result = result.or(&v);
        }
        result
    }

    fn eval_list_comprehension(
        &self,
        inner_var: &str,
        collection: ExprId,
        filter: Option<ExprId>,
        mapping: Option<ExprId>,
        ctx: &mut dyn EvalContext,
    ) -> Value {
        let source = self.eval(collection, ctx);
        if source.is_null() || source.is_empty_value() {
            return source;
        }
        let Value::List(items) = source else {
            return Value::Null(NullKind::BadType);
        };

        let mut out = Vec::new();
        for item in items {
            ctx.set_inner_var(inner_var, item.clone());
            let mut keep = true;
            if let Some(filter) = filter {
                let decision = self.eval(filter, ctx);
                if !decision.is_null() && !decision.is_empty_value() && !decision.is_bool() {
                    ctx.unset_inner_var(inner_var);
                    return Value::Null(NullKind::BadType);
                }
                keep = decision == Value::Bool(true);
            }
            if keep {
                match mapping {
                    Some(mapping) => out.push(self.eval(mapping, ctx)),
                    None => out.push(item),
                }
            }
            ctx.unset_inner_var(inner_var);
        }
        Value::List(out)
    }
}

fn eval_relational(op: RelOp, lhs: &Value, rhs: &Value) -> Value {
    match op {
        RelOp::Eq => lhs.equal(rhs),
        RelOp::Ne => lhs.not_equal(rhs),
        RelOp::Lt => lhs.less_than(rhs),
        RelOp::Le => lhs.less_equal(rhs),
        RelOp::Gt => lhs.greater_than(rhs),
        RelOp::Ge => lhs.greater_equal(rhs),
        RelOp::In => eval_in(lhs, rhs),
        RelOp::NotIn => eval_in(lhs, rhs).not(),
        RelOp::Contains => str_pair(lhs, rhs, |a, b| a.contains(b)),
        RelOp::StartsWith => str_pair(lhs, rhs, |a, b| a.starts_with(b)),
        RelOp::EndsWith => str_pair(lhs, rhs, |a, b| a.ends_with(b)),
    }
}

fn eval_in(needle: &Value, haystack: &Value) -> Value {
    if let Value::Null(kind) = needle {
        return Value::Null(*kind);
    }
    match haystack {
        Value::Null(kind) => Value::Null(*kind),
        Value::List(items) => membership(needle, items.iter()),
        Value::Set(items) => membership(needle, items.iter()),
        Value::Map(map) => match needle {
            Value::Str(key) => Value::Bool(map.contains_key(key.as_str())),
            _ => Value::Bool(false),
        },
        _ => Value::Null(NullKind::BadType),
    }
}

fn membership<'a>(needle: &Value, items: impl Iterator<Item = &'a Value>) -> Value {
    let mut saw_null = None;
    for item in items {
        match needle.equal(item) {
            Value::Bool(true) => return Value::Bool(true),
            Value::Null(kind) => {
                saw_null.get_or_insert(kind);
            }
            _ => {}
        }
    }
    match saw_null {
        Some(kind) => Value::Null(kind),
        None => Value::Bool(false),
    }
}

fn str_pair(lhs: &Value, rhs: &Value, f: impl Fn(&str, &str) -> bool) -> Value {
    if let Value::Null(kind) = lhs {
        return Value::Null(*kind);
    }
    if let Value::Null(kind) = rhs {
        return Value::Null(*kind);
    }
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => Value::Bool(f(a, b)),
        _ => Value::Null(NullKind::BadType),
    }
}

fn edge_attr(edge: Value, attr: &str) -> Value {
    match edge {
        Value::Edge(e) => match attr {
            "_src" => e.src.clone(),
            "_dst" => e.dst.clone(),
            "_rank" => Value::Int(e.rank),
            "_type" => Value::Int(e.etype as i64),
            _ => Value::Null(NullKind::UnknownProp),
        },
        Value::Null(kind) => Value::Null(kind),
        _ => Value::Null(NullKind::BadType),
    }
}

/// Subscript semantics, shared by the evaluator and the iterators:
/// negative list indices count from the end, out-of-range and missing map
/// keys are bad data, a non-string key on a map is a plain NULL, and the
/// reserved `_`-prefixed names route to vertex/edge headers.
pub fn eval_subscript(target: &Value, key: &Value) -> Value {
    match target {
        Value::Null(kind) => Value::Null(*kind),
        Value::Empty => Value::Empty,
        Value::List(items) => match key {
            Value::Int(i) => list_index(items, *i),
            _ => Value::Null(NullKind::BadData),
        },
        Value::DataSet(ds) => match key {
            Value::Int(i) => {
                if *i < 0 || *i as usize >= ds.rows.len() {
                    Value::Null(NullKind::BadData)
                } else {
                    Value::List(ds.rows[*i as usize].values.clone())
                }
            }
            _ => Value::Null(NullKind::BadData),
        },
        Value::Map(map) => match key {
            Value::Str(k) => match map.get(k.as_str()) {
                Some(v) => v.clone(),
                None => Value::Null(NullKind::BadData),
            },
            _ => Value::NULL,
        },
        Value::Vertex(vertex) => match key {
            Value::Str(k) => {
                if k == "_vid" {
                    vertex.vid.clone()
                } else if k.starts_with('_') {
                    Value::Null(NullKind::UnknownProp)
                } else {
                    match vertex.property(k) {
                        Some(v) => v.clone(),
                        None => Value::NULL,
                    }
                }
            }
            _ => Value::NULL,
        },
        Value::Edge(edge) => match key {
            Value::Str(k) => match k.as_str() {
                "_src" => edge.src.clone(),
                "_dst" => edge.dst.clone(),
                "_rank" => Value::Int(edge.rank),
                "_type" => Value::Int(edge.etype as i64),
                _ if k.starts_with('_') => Value::Null(NullKind::UnknownProp),
                _ => match edge.props.get(k.as_str()) {
                    Some(v) => v.clone(),
                    None => Value::NULL,
                },
            },
            _ => Value::NULL,
        },
        _ => Value::Null(NullKind::BadType),
    }
}

fn list_index(items: &[Value], index: i64) -> Value {
    let len = items.len() as i64;
    let effective = if index < 0 { len + index } else { index };
    if effective < 0 || effective >= len {
        return Value::Null(NullKind::BadData);
    }
    items[effective as usize].clone()
}

/// Python-like slicing: missing bounds reach the edge, negatives count from
/// the end, everything clamps, and an inverted range is an empty list.
pub fn eval_subscript_range(target: &Value, lo: Option<Value>, hi: Option<Value>) -> Value {
    match target {
        Value::Null(kind) => Value::Null(*kind),
        Value::Empty => Value::Empty,
        Value::List(items) => {
            let len = items.len() as i64;
            let normalize = |bound: &Value| -> Option<i64> {
                match bound {
                    Value::Int(i) => Some((if *i < 0 { len + i } else { *i }).clamp(0, len)),
                    _ => None,
                }
            };
            let lo = match &lo {
                Some(v) => match normalize(v) {
                    Some(b) => b,
                    None => return Value::Null(NullKind::BadType),
                },
                None => 0,
            };
            let hi = match &hi {
                Some(v) => match normalize(v) {
                    Some(b) => b,
                    None => return Value::Null(NullKind::BadType),
                },
                None => len,
            };
            if lo >= hi {
                return Value::List(vec![]);
            }
            Value::List(items[lo as usize..hi as usize].to_vec())
        }
        _ => Value::Null(NullKind::BadType),
    }
}

#[cfg(test)]
mod tests {
    use quasar_types::types::{NullKind, Value};

    use crate::context::BasicContext;
    use crate::expr::{ArithOp, Expr, ExprArena, RelOp};

    fn list_1234(arena: &mut ExprArena) -> crate::ExprId {
        let items = (1..=4).map(|i| arena.constant(i as i64)).collect();
        arena.list(items)
    }

    #[test]
    fn list_subscript_seed_scenario() {
        let cases: &[(i64, Value)] = &[
            (0, Value::Int(1)),
            (3, Value::Int(4)),
            (4, Value::Null(NullKind::BadData)),
            (-1, Value::Int(4)),
            (-5, Value::Null(NullKind::BadData)),
        ];
        for (index, expected) in cases {
            let mut arena = ExprArena::new();
            let list = list_1234(&mut arena);
            let key = arena.constant(*index);
            let expr = arena.subscript(list, key);
            let mut ctx = BasicContext::default();
            assert_eq!(&arena.eval(expr, &mut ctx), expected, "index {index}");
        }

        // A string index on a list is bad data, not bad type.
        let mut arena = ExprArena::new();
        let list = list_1234(&mut arena);
        let key = arena.constant("0");
        let expr = arena.subscript(list, key);
        let mut ctx = BasicContext::default();
        assert_eq!(arena.eval(expr, &mut ctx), Value::Null(NullKind::BadData));
    }

    #[test]
    fn list_range_seed_scenario() {
        let cases: &[(Option<i64>, Option<i64>, Vec<i64>)] = &[
            (Some(0), None, vec![0, 1, 2, 3, 4, 5]),
            (Some(0), Some(10), vec![0, 1, 2, 3, 4, 5]),
            (Some(-10), Some(-1), vec![0, 1, 2, 3, 4]),
            (Some(3), Some(2), vec![]),
            (Some(-2), Some(-3), vec![]),
        ];
        for (lo, hi, expected) in cases {
            let mut arena = ExprArena::new();
            let items = (0..=5).map(|i| arena.constant(i as i64)).collect();
            let list = arena.list(items);
            let lo = lo.map(|l| arena.constant(l));
            let hi = hi.map(|h| arena.constant(h));
            let expr = arena.add(Expr::SubscriptRange {
                collection: list,
                lo,
                hi,
            });
            let mut ctx = BasicContext::default();
            let expected = Value::List(expected.iter().map(|i| Value::Int(*i)).collect());
            assert_eq!(arena.eval(expr, &mut ctx), expected);
        }
    }

    #[test]
    fn map_subscript_kinds() {
        let mut arena = ExprArena::new();
        let one = arena.constant(1i64);
        let map = arena.add(Expr::MapCtor(vec![("key1".to_string(), one)]));

        let hit = arena.constant("key1");
        let expr = arena.subscript(map, hit);
        let mut ctx = BasicContext::default();
        assert_eq!(arena.eval(expr, &mut ctx), Value::Int(1));

        let miss = arena.constant("key4");
        let expr = arena.subscript(map, miss);
        assert_eq!(arena.eval(expr, &mut ctx), Value::Null(NullKind::BadData));

        let non_str = arena.constant(0i64);
        let expr = arena.subscript(map, non_str);
        // A non-string key on a map is a plain NULL, not a bad one.
        assert_eq!(arena.eval(expr, &mut ctx), Value::NULL);
    }

    #[test]
    fn vertex_and_edge_reserved_attributes() {
        use quasar_types::types::{Edge, PropertyMap, Tag, Vertex};

        let mut props = PropertyMap::new();
        props.insert("Mull".to_string(), Value::from("Kintyre"));
        let vertex = Value::Vertex(Box::new(Vertex::new(
            Value::from("vid"),
            vec![Tag::new("t", props.clone())],
        )));

        assert_eq!(
            crate::eval::eval_subscript(&vertex, &Value::from("_vid")),
            Value::from("vid")
        );
        assert_eq!(
            crate::eval::eval_subscript(&vertex, &Value::from("Mull")),
            Value::from("Kintyre")
        );

        let edge = Value::Edge(Box::new(Edge::new(
            "knows",
            Value::from("a"),
            Value::from("b"),
            7,
            -1,
            props,
        )));
        assert_eq!(
            crate::eval::eval_subscript(&edge, &Value::from("_src")),
            Value::from("a")
        );
        assert_eq!(
            crate::eval::eval_subscript(&edge, &Value::from("_rank")),
            Value::Int(7)
        );
        assert_eq!(
            crate::eval::eval_subscript(&edge, &Value::from("_type")),
            Value::Int(-1)
        );
        assert_eq!(
            crate::eval::eval_subscript(&edge, &Value::from("Mull")),
            Value::from("Kintyre")
        );
    }

    #[test]
    fn and_or_short_circuit() {
        let mut arena = ExprArena::new();
        let f = arena.constant(false);
        let null = arena.add(Expr::Constant(Value::NULL));
        let and = arena.and(vec![f, null]);
        let mut ctx = BasicContext::default();
        assert_eq!(arena.eval(and, &mut ctx), Value::Bool(false));

        let t = arena.constant(true);
        let null2 = arena.add(Expr::Constant(Value::NULL));
        let or = arena.or(vec![null2, t]);
        assert_eq!(arena.eval(or, &mut ctx), Value::Bool(true));

        let t2 = arena.constant(true);
        let null3 = arena.add(Expr::Constant(Value::NULL));
        let and2 = arena.and(vec![t2, null3]);
        assert_eq!(arena.eval(and2, &mut ctx), Value::NULL);
    }

    #[test]
    fn in_and_string_predicates() {
        let mut arena = ExprArena::new();
        let needle = arena.constant(3i64);
        let list = list_1234(&mut arena);
        let expr = arena.relational(RelOp::In, needle, list);
        let mut ctx = BasicContext::default();
        assert_eq!(arena.eval(expr, &mut ctx), Value::Bool(true));

        let needle = arena.constant(9i64);
        let list = list_1234(&mut arena);
        let expr = arena.relational(RelOp::NotIn, needle, list);
        assert_eq!(arena.eval(expr, &mut ctx), Value::Bool(true));

        let s = arena.constant("facebook");
        let sub = arena.constant("ace");
        let expr = arena.relational(RelOp::Contains, s, sub);
        assert_eq!(arena.eval(expr, &mut ctx), Value::Bool(true));

        let s = arena.constant("facebook");
        let prefix = arena.constant("face");
        let expr = arena.relational(RelOp::StartsWith, s, prefix);
        assert_eq!(arena.eval(expr, &mut ctx), Value::Bool(true));

        let s = arena.constant("facebook");
        let suffix = arena.constant("book");
        let expr = arena.relational(RelOp::EndsWith, s, suffix);
        assert_eq!(arena.eval(expr, &mut ctx), Value::Bool(true));
    }

    #[test]
    fn list_comprehension_filters_and_maps() {
        // [x IN [1,2,3,4] WHERE x > 2 | x * 10] == [30, 40]
        let mut arena = ExprArena::new();
        let list = list_1234(&mut arena);
        let x = arena.add(Expr::InputProp { col: "x".into() });
        let two = arena.constant(2i64);
        let filter = arena.relational(RelOp::Gt, x, two);
        let x2 = arena.add(Expr::InputProp { col: "x".into() });
        let ten = arena.constant(10i64);
        let mapping = arena.arithmetic(ArithOp::Mul, x2, ten);
        let expr = arena.add(Expr::ListComprehension {
            inner_var: "x".to_string(),
            collection: list,
            filter: Some(filter),
            mapping: Some(mapping),
        });
        let mut ctx = BasicContext::default();
        assert_eq!(
            arena.eval(expr, &mut ctx),
            Value::List(vec![Value::Int(30), Value::Int(40)])
        );
    }

    #[test]
    fn list_comprehension_rejects_non_list() {
        let mut arena = ExprArena::new();
        let not_list = arena.constant(5i64);
        let expr = arena.add(Expr::ListComprehension {
            inner_var: "x".to_string(),
            collection: not_list,
            filter: None,
            mapping: None,
        });
        let mut ctx = BasicContext::default();
        assert_eq!(arena.eval(expr, &mut ctx), Value::Null(NullKind::BadType));
    }
}
