use std::fmt;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::capability::Schema;
use crate::error::{GraphError, QueryError};
use crate::node::NodeRef;
use crate::property::Properties;
use crate::source::SourceText;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIndex(pub usize);

/// Relation kind of an edge. Every label except the four reserved ones is hierarchical.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub enum EdgeLabel {
    Next,
    Previous,
    First,
    Last,
    Hierarchical(String),
}

impl EdgeLabel {
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "next" => Self::Next,
            "previous" => Self::Previous,
            "first" => Self::First,
            "last" => Self::Last,
            other => Self::Hierarchical(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::First => "first",
            Self::Last => "last",
            Self::Hierarchical(label) => label,
        }
    }

    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Hierarchical(_))
    }

    /// Label that `next`/`previous` edges must be paired with.
    #[must_use]
    pub fn sequence_inverse(&self) -> Option<Self> {
        match self {
            Self::Next => Some(Self::Previous),
            Self::Previous => Some(Self::Next),
            _ => None,
        }
    }
}

impl fmt::Display for EdgeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Node {
    pub id: String,
    pub node_type: String,
    pub properties: Properties,
    #[serde(skip)]
    pub(crate) outgoing: Vec<EdgeIndex>,
    #[serde(skip)]
    pub(crate) incoming: Vec<EdgeIndex>,
}

impl Node {
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>, properties: Properties) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties,
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Edge {
    pub label: EdgeLabel,
    pub from: NodeIndex,
    pub to: NodeIndex,
}

impl Edge {
    #[must_use]
    pub const fn new(label: EdgeLabel, from: NodeIndex, to: NodeIndex) -> Self {
        Self { label, from, to }
    }
}

/// Finished, immutable annotation graph.
///
/// Nodes and edges live in arenas owned by the graph; everything else refers to them
/// by index. Nodes keep document order, edges keep declaration order.
#[derive(Debug, Clone)]
pub struct Graph {
    source: SourceText,
    schema: Schema,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    order: Vec<NodeIndex>,
    by_id: FxHashMap<String, NodeIndex>,
    by_type: FxHashMap<String, Vec<NodeIndex>>,
    type_order: Vec<String>,
}

impl Graph {
    /// Assembles a graph from resolved parts and freezes its indices.
    pub fn from_parts(
        source: SourceText,
        schema: Schema,
        mut nodes: Vec<Node>,
        edges: Vec<Edge>,
    ) -> Result<Self, GraphError> {
        let mut by_id = FxHashMap::default();
        let mut by_type: FxHashMap<String, Vec<NodeIndex>> = FxHashMap::default();
        let mut type_order = Vec::new();

        for (position, node) in nodes.iter_mut().enumerate() {
            let index = NodeIndex(position);
            if by_id.insert(node.id.clone(), index).is_some() {
                return Err(GraphError::DuplicateId {
                    id: node.id.clone(),
                });
            }
            match by_type.get_mut(&node.node_type) {
                Some(indices) => indices.push(index),
                None => {
                    type_order.push(node.node_type.clone());
                    by_type.insert(node.node_type.clone(), vec![index]);
                }
            }
            node.outgoing.clear();
            node.incoming.clear();
        }

        for (position, edge) in edges.iter().enumerate() {
            let (from, to) = (edge.from.0, edge.to.0);
            if from >= nodes.len() || to >= nodes.len() {
                let missing = if from >= nodes.len() { from } else { to };
                return Err(GraphError::DanglingReference {
                    label: edge.label.to_string(),
                    from: endpoint_name(&nodes, from),
                    to: endpoint_name(&nodes, to),
                    missing: format!("#{missing}"),
                });
            }
            nodes[from].outgoing.push(EdgeIndex(position));
            nodes[to].incoming.push(EdgeIndex(position));
        }

        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            types = type_order.len(),
            "graph indices frozen"
        );

        Ok(Self {
            source,
            schema,
            order: (0..nodes.len()).map(NodeIndex).collect(),
            nodes,
            edges,
            by_id,
            by_type,
            type_order,
        })
    }

    /// All nodes in document order.
    #[must_use]
    pub fn nodes(&self) -> NodeList<'_> {
        NodeList {
            graph: self,
            indices: &self.order,
        }
    }

    /// Nodes of `node_type` in document order; empty for unknown types.
    #[must_use]
    pub fn nodes_by_type(&self, node_type: &str) -> NodeList<'_> {
        NodeList {
            graph: self,
            indices: self.by_type.get(node_type).map_or(&[][..], Vec::as_slice),
        }
    }

    pub fn node_by_id(&self, id: &str) -> Result<NodeRef<'_>, QueryError> {
        self.by_id
            .get(id)
            .map(|index| NodeRef::new(self, *index))
            .ok_or_else(|| QueryError::NotFound { id: id.to_string() })
    }

    #[must_use]
    pub fn node(&self, index: NodeIndex) -> Option<NodeRef<'_>> {
        (index.0 < self.nodes.len()).then(|| NodeRef::new(self, index))
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edges(&self) -> impl ExactSizeIterator<Item = &Edge> {
        self.edges.iter()
    }

    /// Node type labels in order of first appearance.
    pub fn node_types(&self) -> impl ExactSizeIterator<Item = &str> {
        self.type_order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn source(&self) -> &SourceText {
        &self.source
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn node_data(&self, index: NodeIndex) -> &Node {
        &self.nodes[index.0]
    }

    pub(crate) fn edge_data(&self, index: EdgeIndex) -> &Edge {
        &self.edges[index.0]
    }
}

fn endpoint_name(nodes: &[Node], index: usize) -> String {
    nodes
        .get(index)
        .map_or_else(|| format!("#{index}"), |node| node.id.clone())
}

/// Ordered view over a set of nodes of one graph.
#[derive(Debug, Clone, Copy)]
pub struct NodeList<'g> {
    graph: &'g Graph,
    indices: &'g [NodeIndex],
}

impl<'g> NodeList<'g> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<NodeRef<'g>> {
        self.indices
            .get(position)
            .map(|index| NodeRef::new(self.graph, *index))
    }

    #[must_use]
    pub fn first(&self) -> Option<NodeRef<'g>> {
        self.get(0)
    }

    #[must_use]
    pub fn iter(&self) -> NodeIter<'g> {
        NodeIter {
            graph: self.graph,
            inner: self.indices.iter(),
        }
    }
}

impl<'g> IntoIterator for NodeList<'g> {
    type Item = NodeRef<'g>;
    type IntoIter = NodeIter<'g>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Clone)]
pub struct NodeIter<'g> {
    graph: &'g Graph,
    inner: std::slice::Iter<'g, NodeIndex>,
}

impl<'g> Iterator for NodeIter<'g> {
    type Item = NodeRef<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|index| NodeRef::new(self.graph, *index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for NodeIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner
            .next_back()
            .map(|index| NodeRef::new(self.graph, *index))
    }
}

impl ExactSizeIterator for NodeIter<'_> {}

#[cfg(test)]
mod tests {
    use super::{Edge, EdgeLabel, Graph, Node, NodeIndex};
    use crate::capability::Schema;
    use crate::error::{GraphError, QueryError};
    use crate::property::Properties;
    use crate::source::SourceText;

    fn token(id: &str, start: usize, length: usize) -> Node {
        Node::new(
            id,
            "TOK",
            [("start", start.to_string()), ("length", length.to_string())]
                .into_iter()
                .collect(),
        )
    }

    fn small_graph() -> Graph {
        let nodes = vec![
            token("t1", 0, 3),
            token("t2", 4, 5),
            Node::new("s1", "SB", Properties::new()),
        ];
        let edges = vec![
            Edge::new(EdgeLabel::Next, NodeIndex(0), NodeIndex(1)),
            Edge::new(EdgeLabel::Previous, NodeIndex(1), NodeIndex(0)),
            Edge::new(EdgeLabel::First, NodeIndex(2), NodeIndex(0)),
            Edge::new(EdgeLabel::Last, NodeIndex(2), NodeIndex(1)),
        ];
        Graph::from_parts(SourceText::from("the quick"), Schema::default(), nodes, edges)
            .expect("valid graph")
    }

    #[test]
    fn indexes_nodes_by_id_and_type() {
        let graph = small_graph();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.nodes_by_type("TOK").len(), 2);
        assert_eq!(graph.nodes_by_type("SB").len(), 1);
        assert_eq!(graph.node_types().collect::<Vec<_>>(), vec!["TOK", "SB"]);
        assert_eq!(graph.node_by_id("t2").expect("t2").index(), NodeIndex(1));
    }

    #[test]
    fn unknown_type_yields_empty_list() {
        let graph = small_graph();
        let list = graph.nodes_by_type("THIS_DOES_NOT_EXIST");
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let graph = small_graph();
        assert_eq!(
            graph.node_by_id("nope").unwrap_err(),
            QueryError::NotFound {
                id: "nope".to_string()
            }
        );
    }

    #[test]
    fn nodes_keep_document_order() {
        let graph = small_graph();
        let ids: Vec<_> = graph.nodes().into_iter().map(|node| node.id()).collect();
        assert_eq!(ids, vec!["t1", "t2", "s1"]);
        assert_eq!(graph.nodes().first().map(|node| node.id()), Some("t1"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let nodes = vec![token("a", 0, 1), token("a", 1, 1)];
        let err = Graph::from_parts(SourceText::from("ab"), Schema::default(), nodes, Vec::new())
            .unwrap_err();
        assert_eq!(err, GraphError::DuplicateId { id: "a".to_string() });
    }

    #[test]
    fn rejects_edges_to_missing_indices() {
        let nodes = vec![token("a", 0, 1)];
        let edges = vec![Edge::new(EdgeLabel::Next, NodeIndex(0), NodeIndex(3))];
        let err = Graph::from_parts(SourceText::from("a"), Schema::default(), nodes, edges)
            .unwrap_err();
        assert!(matches!(err, GraphError::DanglingReference { .. }));
    }

    #[test]
    fn edge_labels_round_trip_through_strings() {
        for label in ["next", "previous", "first", "last", "contains"] {
            assert_eq!(EdgeLabel::parse(label).as_str(), label);
        }
        assert!(EdgeLabel::parse("mention").is_hierarchical());
        assert!(!EdgeLabel::parse("first").is_hierarchical());
        assert_eq!(EdgeLabel::Next.sequence_inverse(), Some(EdgeLabel::Previous));
        assert_eq!(EdgeLabel::First.sequence_inverse(), None);
    }

    #[test]
    fn graph_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Graph>();
    }
}
