//! The synchronized graph document.
//!
//! `GraphData` is the value of the widget's `data` field: a deep copy of a
//! graph taken at snapshot time. The front-end consumes it positionally, so
//! the wire format is fixed:
//!
//! ```text
//! {
//!   "nodes":    [["n1", {…attrs}], ["n2", {…attrs}], …],
//!   "edges":    [["n1", "n2", {…attrs}], …],
//!   "directed": true
//! }
//! ```
//!
//! Two construction paths exist. `snapshot` walks a typed `GraphSource` and
//! can only fail on attribute serialization. `from_value` validates a
//! dynamic JSON document (the inbound sync path) and rejects shape
//! violations as `InvalidGraphKind`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WidgetError;
use crate::graph::{AttrMap, GraphSource};

// =============================================================================
// RECORDS - positional node/edge encoding
// =============================================================================

/// One node as the front-end consumes it: serializes as `[id, {attrs}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord(pub String, pub AttrMap);

impl NodeRecord {
    pub fn new(id: impl Into<String>, attrs: AttrMap) -> Self {
        Self(id.into(), attrs)
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.1
    }
}

/// One edge as the front-end consumes it: serializes as
/// `[source, target, {attrs}]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord(pub String, pub String, pub AttrMap);

impl EdgeRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, attrs: AttrMap) -> Self {
        Self(source.into(), target.into(), attrs)
    }

    pub fn source(&self) -> &str {
        &self.0
    }

    pub fn target(&self) -> &str {
        &self.1
    }

    pub fn attrs(&self) -> &AttrMap {
        &self.2
    }
}

// =============================================================================
// GRAPH DATA - the synchronized document
// =============================================================================

/// A deep, serializable copy of a graph taken at snapshot time.
///
/// Later mutation of the source graph never shows up in an existing
/// `GraphData`. The empty document is directed with no nodes or edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
    #[serde(default = "default_directed")]
    pub directed: bool,
}

fn default_directed() -> bool {
    true
}

impl Default for GraphData {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            directed: true,
        }
    }
}

impl GraphData {
    /// Deep-copy the graph into the wire document.
    ///
    /// Node and edge attributes must serialize to JSON objects. `Null`
    /// (unit attribute payloads) coerces to the empty object; any other
    /// non-object payload is a `Serialization` error naming the node or
    /// edge. Bare scalar edge weights fall under that rule; wrap them in a
    /// struct or map with a `weight` key.
    pub fn snapshot<G: GraphSource>(graph: &G) -> Result<Self, WidgetError> {
        let mut nodes = Vec::new();
        for (id, attrs) in graph.nodes() {
            let value = serde_json::to_value(attrs)
                .map_err(|err| WidgetError::serialization(format!("node `{id}` attributes"), err))?;
            let attrs = attr_object(value).map_err(|got| {
                WidgetError::serialization(
                    format!("node `{id}` attributes"),
                    format!("expected a JSON object, got {got}"),
                )
            })?;
            nodes.push(NodeRecord(id, attrs));
        }

        let mut edges = Vec::new();
        for (source, target, attrs) in graph.edges() {
            let value = serde_json::to_value(attrs).map_err(|err| {
                WidgetError::serialization(format!("edge ({source}, {target}) attributes"), err)
            })?;
            let attrs = attr_object(value).map_err(|got| {
                WidgetError::serialization(
                    format!("edge ({source}, {target}) attributes"),
                    format!("expected a JSON object, got {got}"),
                )
            })?;
            edges.push(EdgeRecord(source, target, attrs));
        }

        Ok(Self {
            nodes,
            edges,
            directed: graph.is_directed(),
        })
    }

    /// Validate and decode a dynamic JSON document (the inbound sync path).
    ///
    /// Missing `nodes`/`edges` default to empty, missing `directed` to
    /// `true`; unknown keys are ignored. Any shape violation is
    /// `InvalidGraphKind` with a reason naming the offending element.
    pub fn from_value(value: Value) -> Result<Self, WidgetError> {
        let mut map = match value {
            Value::Object(map) => map,
            other => {
                return Err(WidgetError::invalid_graph(format!(
                    "expected a graph document object, got {}",
                    json_kind(&other)
                )))
            }
        };

        let directed = match map.remove("directed") {
            None => true,
            Some(Value::Bool(flag)) => flag,
            Some(other) => {
                return Err(WidgetError::invalid_graph(format!(
                    "`directed` must be a boolean, got {}",
                    json_kind(&other)
                )))
            }
        };

        let nodes = match map.remove("nodes") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| decode_node(index, item))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(WidgetError::invalid_graph(format!(
                    "`nodes` must be an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        let edges = match map.remove("edges") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| decode_edge(index, item))
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(WidgetError::invalid_graph(format!(
                    "`edges` must be an array, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self {
            nodes,
            edges,
            directed,
        })
    }

    /// The wire document as a JSON value. Infallible: records hold JSON
    /// values already.
    pub fn to_value(&self) -> Value {
        let nodes: Vec<Value> = self
            .nodes
            .iter()
            .map(|node| {
                Value::Array(vec![
                    Value::String(node.0.clone()),
                    Value::Object(node.1.clone()),
                ])
            })
            .collect();
        let edges: Vec<Value> = self
            .edges
            .iter()
            .map(|edge| {
                Value::Array(vec![
                    Value::String(edge.0.clone()),
                    Value::String(edge.1.clone()),
                    Value::Object(edge.2.clone()),
                ])
            })
            .collect();

        let mut map = AttrMap::new();
        map.insert("nodes".into(), Value::Array(nodes));
        map.insert("edges".into(), Value::Array(edges));
        map.insert("directed".into(), Value::Bool(self.directed));
        Value::Object(map)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

// =============================================================================
// DECODE HELPERS
// =============================================================================

fn decode_node(index: usize, value: Value) -> Result<NodeRecord, WidgetError> {
    let parts = match value {
        Value::Array(parts) => parts,
        other => {
            return Err(WidgetError::invalid_graph(format!(
                "nodes[{index}]: expected an [id, attrs] pair, got {}",
                json_kind(&other)
            )))
        }
    };
    if parts.len() != 2 {
        return Err(WidgetError::invalid_graph(format!(
            "nodes[{index}]: expected 2 elements [id, attrs], got {}",
            parts.len()
        )));
    }
    let mut parts = parts.into_iter();
    let (Some(id_value), Some(attrs_value)) = (parts.next(), parts.next()) else {
        return Err(WidgetError::invalid_graph(format!(
            "nodes[{index}]: expected 2 elements [id, attrs]"
        )));
    };

    let id = match id_value {
        Value::String(id) => id,
        other => {
            return Err(WidgetError::invalid_graph(format!(
                "nodes[{index}]: id must be a string, got {}",
                json_kind(&other)
            )))
        }
    };
    let attrs = attr_object(attrs_value).map_err(|got| {
        WidgetError::invalid_graph(format!(
            "nodes[{index}] (`{id}`): attrs must be a JSON object, got {got}"
        ))
    })?;

    Ok(NodeRecord(id, attrs))
}

fn decode_edge(index: usize, value: Value) -> Result<EdgeRecord, WidgetError> {
    let parts = match value {
        Value::Array(parts) => parts,
        other => {
            return Err(WidgetError::invalid_graph(format!(
                "edges[{index}]: expected a [source, target, attrs] triple, got {}",
                json_kind(&other)
            )))
        }
    };
    if parts.len() != 3 {
        return Err(WidgetError::invalid_graph(format!(
            "edges[{index}]: expected 3 elements [source, target, attrs], got {}",
            parts.len()
        )));
    }
    let mut parts = parts.into_iter();
    let (Some(source_value), Some(target_value), Some(attrs_value)) =
        (parts.next(), parts.next(), parts.next())
    else {
        return Err(WidgetError::invalid_graph(format!(
            "edges[{index}]: expected 3 elements [source, target, attrs]"
        )));
    };

    let source = match source_value {
        Value::String(source) => source,
        other => {
            return Err(WidgetError::invalid_graph(format!(
                "edges[{index}]: source must be a string, got {}",
                json_kind(&other)
            )))
        }
    };
    let target = match target_value {
        Value::String(target) => target,
        other => {
            return Err(WidgetError::invalid_graph(format!(
                "edges[{index}]: target must be a string, got {}",
                json_kind(&other)
            )))
        }
    };
    let attrs = attr_object(attrs_value).map_err(|got| {
        WidgetError::invalid_graph(format!(
            "edges[{index}] ({source}, {target}): attrs must be a JSON object, got {got}"
        ))
    })?;

    Ok(EdgeRecord(source, target, attrs))
}

/// Coerce a serialized attribute payload into an object. `Null` becomes the
/// empty object; anything else non-object reports its JSON kind.
fn attr_object(value: Value) -> Result<AttrMap, &'static str> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(AttrMap::new()),
        other => Err(json_kind(&other)),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::graph::AttrGraph;
    use proptest::prelude::*;

    // -- Strategy helpers --

    fn arb_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| Value::from(n)),
            "[a-z]{0,8}".prop_map(Value::String),
        ]
    }

    fn arb_attr_map() -> impl Strategy<Value = AttrMap> {
        prop::collection::btree_map("[a-zA-Z]{1,10}", arb_value(), 0..4)
            .prop_map(|map| map.into_iter().collect())
    }

    fn arb_attr_graph() -> impl Strategy<Value = AttrGraph> {
        let nodes = prop::collection::vec(("[a-z0-9]{1,6}", arb_attr_map()), 0..8);
        let edges = prop::collection::vec(
            ("[a-z0-9]{1,6}", "[a-z0-9]{1,6}", arb_attr_map()),
            0..6,
        );
        (any::<bool>(), nodes, edges).prop_map(|(directed, nodes, edges)| {
            let mut graph = AttrGraph::new(directed);
            for (id, attrs) in nodes {
                graph.add_node_with(id, attrs);
            }
            for (source, target, attrs) in edges {
                graph.add_edge_with(source, target, attrs);
            }
            graph
        })
    }

    proptest! {
        /// Counts and directedness carry over into every snapshot.
        #[test]
        fn snapshot_mirrors_the_graph(graph in arb_attr_graph()) {
            let data = GraphData::snapshot(&graph).unwrap();
            prop_assert_eq!(data.node_count(), graph.node_count());
            prop_assert_eq!(data.edge_count(), graph.edge_count());
            prop_assert_eq!(data.directed, graph.is_directed());
        }

        /// A snapshot survives the wire round trip unchanged.
        #[test]
        fn snapshot_round_trips_through_the_wire(graph in arb_attr_graph()) {
            let data = GraphData::snapshot(&graph).unwrap();
            let back = GraphData::from_value(data.to_value()).unwrap();
            prop_assert_eq!(back, data);
        }

        /// `to_value` and the serde encoding agree on every snapshot.
        #[test]
        fn to_value_agrees_with_serde(graph in arb_attr_graph()) {
            let data = GraphData::snapshot(&graph).unwrap();
            prop_assert_eq!(data.to_value(), serde_json::to_value(&data).unwrap());
        }
    }
}
