use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use lg_core::{Edge, EdgeLabel, Graph, GraphError, Node, NodeIndex, Properties, Schema, SourceText};

use crate::event::{EdgeDecl, GraphEvent, NodeDecl};

/// Edge read from the markup but not wired yet; its endpoints may be declared later.
#[derive(Debug, Clone)]
struct PendingEdge {
    label: String,
    from: String,
    to: String,
}

/// Where a resolved `next`/`previous` link came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Declared,
    Synthesized,
}

/// Two-phase graph construction: nodes are declared as they arrive, edges are kept
/// as pending id triples and resolved in [`GraphBuilder::finish`].
pub(crate) struct GraphBuilder {
    schema: Schema,
    synthesize_inverse_sequence: bool,
    nodes: Vec<Node>,
    node_index_by_id: FxHashMap<String, NodeIndex>,
    pending: Vec<PendingEdge>,
}

impl GraphBuilder {
    pub(crate) fn new(schema: Schema, synthesize_inverse_sequence: bool) -> Self {
        Self {
            schema,
            synthesize_inverse_sequence,
            nodes: Vec::new(),
            node_index_by_id: FxHashMap::default(),
            pending: Vec::new(),
        }
    }

    pub(crate) fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn pending_edge_count(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn apply(&mut self, event: GraphEvent) -> Result<(), GraphError> {
        match event {
            GraphEvent::Node(decl) => self.declare_node(decl).map(|_| ()),
            GraphEvent::Edge(decl) => self.push_edge(decl),
        }
    }

    pub(crate) fn declare_node(&mut self, decl: NodeDecl) -> Result<NodeIndex, GraphError> {
        if decl.id.is_empty() {
            return Err(GraphError::malformed_event("node declaration with an empty id"));
        }
        if decl.node_type.is_empty() {
            return Err(GraphError::malformed_event(format!(
                "node '{}' has an empty type",
                decl.id
            )));
        }
        if self.node_index_by_id.contains_key(&decl.id) {
            return Err(GraphError::DuplicateId { id: decl.id });
        }

        let index = NodeIndex(self.nodes.len());
        let properties: Properties = decl.properties.into_iter().collect();
        trace!(id = %decl.id, node_type = %decl.node_type, properties = properties.len(), "declared node");
        self.node_index_by_id.insert(decl.id.clone(), index);
        self.nodes.push(Node::new(decl.id, decl.node_type, properties));
        Ok(index)
    }

    pub(crate) fn push_edge(&mut self, decl: EdgeDecl) -> Result<(), GraphError> {
        if decl.label.is_empty() {
            return Err(GraphError::malformed_event(format!(
                "edge {} -> {} has an empty label",
                decl.from, decl.to
            )));
        }
        if decl.from.is_empty() || decl.to.is_empty() {
            return Err(GraphError::malformed_event(format!(
                "'{}' edge with an empty endpoint",
                decl.label
            )));
        }
        self.pending.push(PendingEdge {
            label: decl.label,
            from: decl.from,
            to: decl.to,
        });
        Ok(())
    }

    /// Resolves pending edges in declaration order and freezes the graph.
    pub(crate) fn finish(self, source: SourceText) -> Result<Graph, GraphError> {
        let mut edges = Vec::with_capacity(self.pending.len());
        let mut links = SequenceLinks::default();

        for pending in &self.pending {
            let from = self.resolve(pending, &pending.from)?;
            let to = self.resolve(pending, &pending.to)?;
            let label = EdgeLabel::parse(&pending.label);
            trace!(label = %label, from = %pending.from, to = %pending.to, "resolved edge");

            let Some(inverse) = label.sequence_inverse() else {
                edges.push(Edge::new(label, from, to));
                continue;
            };
            if links.record(&self.nodes, &label, from, to, Origin::Declared)? {
                edges.push(Edge::new(label, from, to));
            }
            if self.synthesize_inverse_sequence
                && links.record(&self.nodes, &inverse, to, from, Origin::Synthesized)?
            {
                edges.push(Edge::new(inverse, to, from));
            }
        }

        Graph::from_parts(source, self.schema, self.nodes, edges)
    }

    fn resolve(&self, pending: &PendingEdge, id: &str) -> Result<NodeIndex, GraphError> {
        self.node_index_by_id
            .get(id)
            .copied()
            .ok_or_else(|| GraphError::DanglingReference {
                label: pending.label.clone(),
                from: pending.from.clone(),
                to: pending.to.clone(),
                missing: id.to_string(),
            })
    }
}

/// Resolved `next`/`previous` targets per node, used to merge duplicates and to
/// reject a node with two different successors (or predecessors).
#[derive(Default)]
struct SequenceLinks {
    next: FxHashMap<NodeIndex, (NodeIndex, Origin)>,
    previous: FxHashMap<NodeIndex, (NodeIndex, Origin)>,
}

impl SequenceLinks {
    /// Returns `true` when the edge is new and must be added to the graph.
    fn record(
        &mut self,
        nodes: &[Node],
        label: &EdgeLabel,
        from: NodeIndex,
        to: NodeIndex,
        origin: Origin,
    ) -> Result<bool, GraphError> {
        let table = match label {
            EdgeLabel::Next => &mut self.next,
            _ => &mut self.previous,
        };
        match table.get(&from).copied() {
            None => {
                table.insert(from, (to, origin));
                Ok(true)
            }
            Some((existing, _)) if existing != to => Err(GraphError::malformed_event(format!(
                "node '{}' has two '{label}' targets: '{}' and '{}'",
                nodes[from.0].id, nodes[existing.0].id, nodes[to.0].id
            ))),
            Some((_, Origin::Declared)) if origin == Origin::Declared => {
                warn!(
                    label = %label,
                    from = %nodes[from.0].id,
                    to = %nodes[to.0].id,
                    "duplicate sequence edge merged"
                );
                Ok(false)
            }
            Some(_) => {
                trace!(label = %label, from = %nodes[from.0].id, "sequence edge already present");
                Ok(false)
            }
        }
    }
}
