//! Result iterators over merged storage responses.
//!
//! A GetNeighbors response is a dataset with conventional column names:
//! `_vid` (the source id), optionally `_stats`, one `_tag:<name>:<p1>,<p2>`
//! column per requested tag (the cell is a list of property values, or
//! NULL when the vertex lacks the tag) and one `_edge:<sign><name>:<p1>,…`
//! column per requested edge type (the cell is a list of edge entries;
//! every entry is a list shaped `[dst, rank, p1, p2, …]`).
//!
//! Iterators are single-pass; `reset()` restarts from the beginning.

use quasar_types::types::{DataSet, Edge, NullKind, PropertyMap, Row, Tag, Value, Vertex};

/// One neighbor expansion: the source vertex (with any requested tag
/// props), one adjacent edge if the row has edges, and the stat columns.
#[derive(Clone, Debug)]
pub struct NeighborEntry {
    pub vertex: Value,
    pub edge: Option<Value>,
    pub stats: Option<Value>,
}

struct ParsedCols {
    vid: Option<usize>,
    stats: Option<usize>,
    /// (column index, tag name, prop names)
    tags: Vec<(usize, String, Vec<String>)>,
    /// (column index, etype sign, edge name, prop names)
    edges: Vec<(usize, i8, String, Vec<String>)>,
}

fn parse_cols(col_names: &[String]) -> ParsedCols {
    let mut parsed = ParsedCols {
        vid: None,
        stats: None,
        tags: vec![],
        edges: vec![],
    };
    for (index, name) in col_names.iter().enumerate() {
        if name == "_vid" {
            parsed.vid = Some(index);
        } else if name == "_stats" {
            parsed.stats = Some(index);
        } else if let Some(rest) = name.strip_prefix("_tag:") {
            let (tag, props) = rest.split_once(':').unwrap_or((rest, ""));
            parsed.tags.push((index, tag.to_string(), split_props(props)));
        } else if let Some(rest) = name.strip_prefix("_edge:") {
            let (edge, props) = rest.split_once(':').unwrap_or((rest, ""));
            let (sign, edge_name) = match edge.as_bytes().first() {
                Some(b'-') => (-1, &edge[1..]),
                Some(b'+') => (1, &edge[1..]),
                _ => (1, edge),
            };
            parsed
                .edges
                .push((index, sign, edge_name.to_string(), split_props(props)));
        }
    }
    parsed
}

fn split_props(spec: &str) -> Vec<String> {
    if spec.is_empty() {
        vec![]
    } else {
        spec.split(',').map(|s| s.to_string()).collect()
    }
}

/// Merges any number of per-host datasets and yields one [`NeighborEntry`]
/// per (row, edge) pair; a row without edges yields once with `edge: None`.
pub struct GetNeighborsIter {
    datasets: Vec<(DataSet, ParsedCols)>,
    at_dataset: usize,
    at_row: usize,
    at_edge: usize,
}

impl GetNeighborsIter {
    pub fn new(datasets: Vec<DataSet>) -> Self {
        let datasets = datasets
            .into_iter()
            .map(|ds| {
                let parsed = parse_cols(&ds.col_names);
                (ds, parsed)
            })
            .collect();
        Self {
            datasets,
            at_dataset: 0,
            at_row: 0,
            at_edge: 0,
        }
    }

    pub fn reset(&mut self) {
        self.at_dataset = 0;
        self.at_row = 0;
        self.at_edge = 0;
    }

    pub fn num_rows(&self) -> usize {
        self.datasets.iter().map(|(ds, _)| ds.rows.len()).sum()
    }

    fn build_vertex(parsed: &ParsedCols, row: &Row) -> Value {
        let vid = parsed
            .vid
            .and_then(|i| row.values.get(i))
            .cloned()
            .unwrap_or(Value::Null(NullKind::BadData));
        let mut tags = vec![];
        for (index, tag_name, prop_names) in &parsed.tags {
            match row.values.get(*index) {
                Some(Value::List(values)) => {
                    let mut props = PropertyMap::new();
                    for (prop, value) in prop_names.iter().zip(values) {
                        props.insert(prop.clone(), value.clone());
                    }
                    tags.push(Tag::new(tag_name.clone(), props));
                }
                // NULL or Empty cell: the vertex does not carry this tag.
                _ => continue,
            }
        }
        Value::Vertex(Box::new(Vertex::new(vid, tags)))
    }

    fn build_edge(
        parsed_edge: &(usize, i8, String, Vec<String>),
        src: &Value,
        entry: &Value,
    ) -> Option<Value> {
        let (_, sign, name, prop_names) = parsed_edge;
        let Value::List(fields) = entry else {
            return None;
        };
        let dst = fields.first().cloned()?;
        let rank = match fields.get(1) {
            Some(Value::Int(r)) => *r,
            _ => 0,
        };
        let mut props = PropertyMap::new();
        for (prop, value) in prop_names.iter().zip(fields.iter().skip(2)) {
            props.insert(prop.clone(), value.clone());
        }
        Some(Value::Edge(Box::new(Edge::new(
            name.clone(),
            src.clone(),
            dst,
            rank,
            *sign,
            props,
        ))))
    }

    /// Flattened edge list of one row: (edge column, entry index).
    fn edges_of(parsed: &ParsedCols, row: &Row) -> Vec<(usize, usize)> {
        let mut out = vec![];
        for (slot, (index, ..)) in parsed.edges.iter().enumerate() {
            if let Some(Value::List(entries)) = row.values.get(*index) {
                for entry in 0..entries.len() {
                    out.push((slot, entry));
                }
            }
        }
        out
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<NeighborEntry> {
        loop {
            let (dataset, parsed) = self.datasets.get(self.at_dataset)?;
            let Some(row) = dataset.rows.get(self.at_row) else {
                self.at_dataset += 1;
                self.at_row = 0;
                self.at_edge = 0;
                continue;
            };

            let edges = Self::edges_of(parsed, row);
            let vertex = Self::build_vertex(parsed, row);
            let stats = parsed.stats.and_then(|i| row.values.get(i)).cloned();

            if edges.is_empty() {
                self.at_row += 1;
                self.at_edge = 0;
                return Some(NeighborEntry {
                    vertex,
                    edge: None,
                    stats,
                });
            }

            if self.at_edge >= edges.len() {
                self.at_row += 1;
                self.at_edge = 0;
                continue;
            }

            let (slot, entry_index) = edges[self.at_edge];
            self.at_edge += 1;
            let parsed_edge = &parsed.edges[slot];
            let entries = match row.values.get(parsed_edge.0) {
                Some(Value::List(entries)) => entries,
                _ => continue,
            };
            let edge = Self::build_edge(parsed_edge, &vertex_vid(&vertex), &entries[entry_index]);
            return Some(NeighborEntry {
                vertex,
                edge,
                stats,
            });
        }
    }

    /// Drains the iterator into (vertex, edge) pairs. Convenience for
    /// executors that need the whole expansion at once.
    pub fn collect_entries(&mut self) -> Vec<NeighborEntry> {
        let mut out = vec![];
        while let Some(entry) = self.next() {
            out.push(entry);
        }
        out
    }
}

fn vertex_vid(vertex: &Value) -> Value {
    match vertex {
        Value::Vertex(v) => v.vid.clone(),
        other => other.clone(),
    }
}

/// Builds an edge value from one `_edge:` column entry, outside the
/// iterator. Used by executors that rewrite edge cells in place.
pub(crate) fn edge_from_cell_entry(col_name: &str, src: &Value, entry: &Value) -> Option<Value> {
    let rest = col_name.strip_prefix("_edge:")?;
    let (edge, props) = rest.split_once(':').unwrap_or((rest, ""));
    let (sign, name) = match edge.as_bytes().first() {
        Some(b'-') => (-1, &edge[1..]),
        Some(b'+') => (1, &edge[1..]),
        _ => (1, edge),
    };
    GetNeighborsIter::build_edge(&(0, sign, name.to_string(), split_props(props)), src, entry)
}

/// Plain positional iterator over one dataset; the shape every row-wise
/// executor (filter, project, …) consumes.
pub struct SequentialIter<'a> {
    dataset: &'a DataSet,
    at: usize,
}

impl<'a> SequentialIter<'a> {
    pub fn new(dataset: &'a DataSet) -> Self {
        Self { dataset, at: 0 }
    }

    pub fn reset(&mut self) {
        self.at = 0;
    }

    pub fn col_names(&self) -> &'a [String] {
        &self.dataset.col_names
    }
}

impl<'a> Iterator for SequentialIter<'a> {
    type Item = &'a Row;

    fn next(&mut self) -> Option<&'a Row> {
        let row = self.dataset.rows.get(self.at)?;
        self.at += 1;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neighbors_dataset() -> DataSet {
        let mut ds = DataSet::new(vec![
            "_vid".to_string(),
            "_stats".to_string(),
            "_tag:person:name".to_string(),
            "_edge:+like:weight".to_string(),
        ]);
        // v1 likes v2 (rank 0) and v3 (rank 1).
        ds.push(Row::new(vec![
            Value::from("v1"),
            Value::List(vec![Value::Int(2)]),
            Value::List(vec![Value::from("alice")]),
            Value::List(vec![
                Value::List(vec![Value::from("v2"), Value::Int(0), Value::float(0.5)]),
                Value::List(vec![Value::from("v3"), Value::Int(1), Value::float(0.9)]),
            ]),
        ]));
        // v4 has no edges.
        ds.push(Row::new(vec![
            Value::from("v4"),
            Value::List(vec![Value::Int(0)]),
            Value::Null(quasar_types::types::NullKind::Generic),
            Value::List(vec![]),
        ]));
        ds
    }

    #[test]
    fn yields_one_entry_per_edge_and_one_for_edgeless_rows() {
        let mut iter = GetNeighborsIter::new(vec![neighbors_dataset()]);
        let entries = iter.collect_entries();
        assert_eq!(entries.len(), 3);

        match &entries[0].edge {
            Some(Value::Edge(e)) => {
                assert_eq!(e.name, "like");
                assert_eq!(e.src, Value::from("v1"));
                assert_eq!(e.dst, Value::from("v2"));
                assert_eq!(e.etype, 1);
                assert_eq!(e.props["weight"], Value::float(0.5));
            }
            other => panic!("expected edge, got {other:?}"),
        }
        match &entries[1].edge {
            Some(Value::Edge(e)) => {
                assert_eq!(e.dst, Value::from("v3"));
                assert_eq!(e.rank, 1);
            }
            other => panic!("expected edge, got {other:?}"),
        }
        assert!(entries[2].edge.is_none());

        match &entries[0].vertex {
            Value::Vertex(v) => {
                assert_eq!(v.vid, Value::from("v1"));
                assert_eq!(v.tags.len(), 1);
                assert_eq!(v.tags[0].props["name"], Value::from("alice"));
            }
            other => panic!("expected vertex, got {other:?}"),
        }
        // The tag cell was NULL: no tag on the second vertex.
        match &entries[2].vertex {
            Value::Vertex(v) => assert!(v.tags.is_empty()),
            other => panic!("expected vertex, got {other:?}"),
        }
    }

    #[test]
    fn reset_restarts_iteration() {
        let mut iter = GetNeighborsIter::new(vec![neighbors_dataset()]);
        let first = iter.collect_entries();
        iter.reset();
        let second = iter.collect_entries();
        assert_eq!(first.len(), second.len());
    }

    #[test]
    fn merges_multiple_datasets() {
        let mut iter = GetNeighborsIter::new(vec![neighbors_dataset(), neighbors_dataset()]);
        assert_eq!(iter.collect_entries().len(), 6);
        assert_eq!(iter.num_rows(), 4);
    }

    #[test]
    fn inbound_edge_columns_carry_the_sign() {
        let mut ds = DataSet::new(vec!["_vid".to_string(), "_edge:-like:".to_string()]);
        ds.push(Row::new(vec![
            Value::from("v2"),
            Value::List(vec![Value::List(vec![Value::from("v1"), Value::Int(0)])]),
        ]));
        let mut iter = GetNeighborsIter::new(vec![ds]);
        let entries = iter.collect_entries();
        match &entries[0].edge {
            Some(Value::Edge(e)) => assert_eq!(e.etype, -1),
            other => panic!("expected edge, got {other:?}"),
        }
    }
}
