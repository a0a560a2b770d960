//! Attributed graph model and the snapshot source seam.
//!
//! `AttrGraph` is the crate's own graph representation: nodes and edges in
//! insertion order, each carrying a JSON attribute map, plus a fixed
//! directed/undirected flag. The GEXF reader produces one, and callers can
//! build one by hand.
//!
//! `GraphSource` is the trait the widget snapshots through. Anything that
//! can enumerate nodes and edges with serializable attributes qualifies;
//! implementations are provided for `AttrGraph` and for `petgraph::Graph`.

use petgraph::graph::{Graph, IndexType};
use petgraph::visit::EdgeRef;
use petgraph::EdgeType;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Attribute dictionary for one node or edge: a string-keyed JSON object.
pub type AttrMap = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// GRAPH SOURCE - anything the widget can snapshot
// =============================================================================

/// A graph the widget can snapshot: enumerable nodes and edges with
/// serializable attribute payloads and a directedness flag.
///
/// Node identity is a `String`. Implementations that index nodes some other
/// way (petgraph) render their indices as strings.
pub trait GraphSource {
    /// Per-node attribute payload.
    type NodeAttrs: Serialize;
    /// Per-edge attribute payload.
    type EdgeAttrs: Serialize;

    fn is_directed(&self) -> bool;

    /// Nodes in a stable order. The order is preserved in the snapshot.
    fn nodes(&self) -> impl Iterator<Item = (String, &Self::NodeAttrs)>;

    /// Edges in a stable order, as (source, target, attrs).
    fn edges(&self) -> impl Iterator<Item = (String, String, &Self::EdgeAttrs)>;
}

// =============================================================================
// ATTR GRAPH - the crate's own attributed graph
// =============================================================================

/// An attributed graph with insertion-ordered nodes and edges.
///
/// Adding an existing node again merges into its attribute map instead of
/// duplicating it. Adding an edge creates missing endpoints implicitly with
/// empty attributes. Parallel edges are allowed and kept in order.
#[derive(Debug, Clone, Default)]
pub struct AttrGraph {
    directed: bool,
    node_ids: Vec<String>,
    node_attrs: HashMap<String, AttrMap>,
    edges: Vec<(String, String, AttrMap)>,
}

impl AttrGraph {
    /// An empty graph with the given directedness.
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            ..Self::default()
        }
    }

    /// An empty directed graph.
    pub fn directed() -> Self {
        Self::new(true)
    }

    /// An empty undirected graph.
    pub fn undirected() -> Self {
        Self::new(false)
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn node_count(&self) -> usize {
        self.node_ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_attrs.contains_key(id)
    }

    /// The attribute map of a node, if present.
    pub fn node_attrs(&self, id: &str) -> Option<&AttrMap> {
        self.node_attrs.get(id)
    }

    /// Insert a node if absent and return its attribute map for mutation.
    /// Re-adding an existing id returns the existing map unchanged.
    pub fn add_node(&mut self, id: impl Into<String>) -> &mut AttrMap {
        match self.node_attrs.entry(id.into()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.node_ids.push(entry.key().clone());
                entry.insert(AttrMap::new())
            }
        }
    }

    /// Insert a node and merge the given attributes into its map.
    pub fn add_node_with(&mut self, id: impl Into<String>, attrs: AttrMap) {
        self.add_node(id).extend(attrs);
    }

    /// Append an edge and return its attribute map for mutation. Endpoints
    /// that are not yet nodes are created implicitly with empty attributes.
    pub fn add_edge(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> &mut AttrMap {
        let source = source.into();
        let target = target.into();
        self.ensure_node(&source);
        self.ensure_node(&target);
        self.edges.push((source, target, AttrMap::new()));
        let last = self.edges.len() - 1;
        &mut self.edges[last].2
    }

    /// Append an edge carrying the given attributes.
    pub fn add_edge_with(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        attrs: AttrMap,
    ) {
        self.add_edge(source, target).extend(attrs);
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &AttrMap)> {
        self.node_ids
            .iter()
            .filter_map(move |id| self.node_attrs.get(id).map(|attrs| (id.as_str(), attrs)))
    }

    /// Edges in insertion order, as (source, target, attrs).
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &AttrMap)> {
        self.edges
            .iter()
            .map(|(source, target, attrs)| (source.as_str(), target.as_str(), attrs))
    }

    fn ensure_node(&mut self, id: &str) {
        if !self.node_attrs.contains_key(id) {
            self.node_ids.push(id.to_string());
            self.node_attrs.insert(id.to_string(), AttrMap::new());
        }
    }
}

impl GraphSource for AttrGraph {
    type NodeAttrs = AttrMap;
    type EdgeAttrs = AttrMap;

    fn is_directed(&self) -> bool {
        self.directed
    }

    fn nodes(&self) -> impl Iterator<Item = (String, &AttrMap)> {
        self.node_ids
            .iter()
            .filter_map(move |id| self.node_attrs.get(id).map(|attrs| (id.clone(), attrs)))
    }

    fn edges(&self) -> impl Iterator<Item = (String, String, &AttrMap)> {
        self.edges
            .iter()
            .map(|(source, target, attrs)| (source.clone(), target.clone(), attrs))
    }
}

// =============================================================================
// PETGRAPH INTEROP - snapshot petgraph graphs directly
// =============================================================================

/// Node ids are the petgraph node indices rendered as decimal strings, so
/// the front-end sees stable ids without requiring an id field on `N`.
impl<N, E, Ty, Ix> GraphSource for Graph<N, E, Ty, Ix>
where
    N: Serialize,
    E: Serialize,
    Ty: EdgeType,
    Ix: IndexType,
{
    type NodeAttrs = N;
    type EdgeAttrs = E;

    fn is_directed(&self) -> bool {
        Ty::is_directed()
    }

    fn nodes(&self) -> impl Iterator<Item = (String, &N)> {
        self.node_indices()
            .map(move |idx| (idx.index().to_string(), &self[idx]))
    }

    fn edges(&self) -> impl Iterator<Item = (String, String, &E)> {
        self.edge_references().map(|edge| {
            (
                edge.source().index().to_string(),
                edge.target().index().to_string(),
                edge.weight(),
            )
        })
    }
}
