use std::fmt;
use std::ptr;

use crate::capability::{Capability, CapabilitySet};
use crate::error::QueryError;
use crate::graph::{Edge, EdgeLabel, Graph, NodeIndex};
use crate::property::Properties;

/// Borrowed handle to one node of a [`Graph`].
///
/// Two handles are equal only when they point at the same node of the same graph.
#[derive(Clone, Copy)]
pub struct NodeRef<'g> {
    graph: &'g Graph,
    index: NodeIndex,
}

impl<'g> NodeRef<'g> {
    pub(crate) fn new(graph: &'g Graph, index: NodeIndex) -> Self {
        Self { graph, index }
    }

    #[must_use]
    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    #[must_use]
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    #[must_use]
    pub fn id(&self) -> &'g str {
        &self.graph.node_data(self.index).id
    }

    #[must_use]
    pub fn node_type(&self) -> &'g str {
        &self.graph.node_data(self.index).node_type
    }

    #[must_use]
    pub fn properties(&self) -> &'g Properties {
        &self.graph.node_data(self.index).properties
    }

    /// First value recorded for `name`.
    #[must_use]
    pub fn first_prop(&self, name: &str) -> Option<&'g str> {
        self.properties().first(name)
    }

    /// Authoritative (last recorded) value for `name`.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&'g str> {
        self.properties().get(name)
    }

    #[must_use]
    pub fn capabilities(&self) -> CapabilitySet {
        self.graph.schema().capabilities_of(self.node_type())
    }

    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(capability)
    }

    pub(crate) fn require(&self, capability: Capability) -> Result<(), QueryError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(QueryError::Unsupported {
                node: self.id().to_string(),
                node_type: self.node_type().to_string(),
                capability,
            })
        }
    }

    /// Outgoing edges in declaration order.
    pub fn outgoing(&self) -> impl Iterator<Item = &'g Edge> + use<'g> {
        let graph = self.graph;
        graph
            .node_data(self.index)
            .outgoing
            .iter()
            .map(move |edge| graph.edge_data(*edge))
    }

    /// Incoming edges in declaration order.
    pub fn incoming(&self) -> impl Iterator<Item = &'g Edge> + use<'g> {
        let graph = self.graph;
        graph
            .node_data(self.index)
            .incoming
            .iter()
            .map(move |edge| graph.edge_data(*edge))
    }

    /// Targets of outgoing edges labelled `label`.
    pub fn targets(&self, label: EdgeLabel) -> impl Iterator<Item = NodeRef<'g>> + use<'g> {
        let graph = self.graph;
        self.outgoing()
            .filter(move |edge| edge.label == label)
            .map(move |edge| NodeRef::new(graph, edge.to))
    }

    pub(crate) fn target(&self, label: &EdgeLabel) -> Option<NodeRef<'g>> {
        self.outgoing()
            .find(|edge| edge.label == *label)
            .map(|edge| NodeRef::new(self.graph, edge.to))
    }

    pub(crate) fn expect_target(&self, label: &EdgeLabel) -> Result<NodeRef<'g>, QueryError> {
        self.target(label).ok_or_else(|| QueryError::NoSuchEdge {
            node: self.id().to_string(),
            label: label.to_string(),
        })
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.graph, other.graph) && self.index == other.index
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("type", &self.node_type())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::capability::{Capability, Schema};
    use crate::error::QueryError;
    use crate::graph::{Edge, EdgeLabel, Graph, Node, NodeIndex};
    use crate::property::Properties;
    use crate::source::SourceText;

    fn graph() -> Graph {
        let nodes = vec![
            Node::new(
                "w1",
                "TOK",
                [("pos", "NN"), ("pos", "NNP")].into_iter().collect(),
            ),
            Node::new("np", "NP", Properties::new()),
        ];
        let edges = vec![
            Edge::new(EdgeLabel::parse("child"), NodeIndex(1), NodeIndex(0)),
            Edge::new(EdgeLabel::parse("head"), NodeIndex(1), NodeIndex(0)),
        ];
        Graph::from_parts(SourceText::from("Mary"), Schema::default(), nodes, edges)
            .expect("graph")
    }

    #[test]
    fn property_accessors() {
        let graph = graph();
        let node = graph.node_by_id("w1").expect("w1");
        assert_eq!(node.first_prop("pos"), Some("NN"));
        assert_eq!(node.prop("pos"), Some("NNP"));
        assert_eq!(node.prop("lemma"), None);
    }

    #[test]
    fn identity_equality() {
        let graph = graph();
        let a = graph.node_by_id("w1").expect("w1");
        let b = graph.node(NodeIndex(0)).expect("index 0");
        assert_eq!(a, b);
        assert_ne!(a, graph.node_by_id("np").expect("np"));

        let twin = graph.clone();
        assert_ne!(a, twin.node_by_id("w1").expect("w1 in clone"));
    }

    #[test]
    fn capability_lookup_follows_type() {
        let graph = graph();
        let token = graph.node_by_id("w1").expect("w1");
        assert!(token.supports(Capability::Span));
        let phrase = graph.node_by_id("np").expect("np");
        assert!(!phrase.supports(Capability::Span));
        assert!(phrase.supports(Capability::Ancestry));
        assert!(matches!(
            phrase.require(Capability::Sequence),
            Err(QueryError::Unsupported { .. })
        ));
    }

    #[test]
    fn edges_are_reachable_both_ways() {
        let graph = graph();
        let phrase = graph.node_by_id("np").expect("np");
        let token = graph.node_by_id("w1").expect("w1");
        assert_eq!(phrase.outgoing().count(), 2);
        assert_eq!(token.incoming().count(), 2);
        assert_eq!(
            phrase.targets(EdgeLabel::parse("child")).collect::<Vec<_>>(),
            vec![token]
        );
        assert!(matches!(
            token.expect_target(&EdgeLabel::Next),
            Err(QueryError::NoSuchEdge { .. })
        ));
    }
}
