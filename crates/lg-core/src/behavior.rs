//! Query behaviors shared by every node kind.
//!
//! Which of them a node answers is decided by its type through the graph's
//! [`Schema`](crate::capability::Schema), see [`NodeRef::supports`].

use std::collections::VecDeque;

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::capability::Capability;
use crate::error::QueryError;
use crate::graph::{EdgeLabel, NodeIndex};
use crate::node::NodeRef;

pub const START_PROPERTY: &str = "start";
pub const LENGTH_PROPERTY: &str = "length";

/// Linear document order over `next`/`previous` edges.
pub trait Sequence<'g> {
    fn has_next(&self) -> bool;
    fn has_previous(&self) -> bool;
    fn next(&self) -> Result<NodeRef<'g>, QueryError>;
    fn previous(&self) -> Result<NodeRef<'g>, QueryError>;
}

impl<'g> Sequence<'g> for NodeRef<'g> {
    fn has_next(&self) -> bool {
        self.supports(Capability::Sequence) && self.target(&EdgeLabel::Next).is_some()
    }

    fn has_previous(&self) -> bool {
        self.supports(Capability::Sequence) && self.target(&EdgeLabel::Previous).is_some()
    }

    fn next(&self) -> Result<NodeRef<'g>, QueryError> {
        self.require(Capability::Sequence)?;
        self.expect_target(&EdgeLabel::Next)
    }

    fn previous(&self) -> Result<NodeRef<'g>, QueryError> {
        self.require(Capability::Sequence)?;
        self.expect_target(&EdgeLabel::Previous)
    }
}

/// Character extent of a node in the source text.
///
/// Resolution order: direct `start`/`length` properties on types with
/// [`Capability::Span`], then the `first` (resp. `last`) edge followed, then the smallest start (resp.
/// largest end) over hierarchical children. A dead end is
/// [`QueryError::NoSpanResolvable`].
pub trait Extent<'g> {
    fn start_index(&self) -> Result<usize, QueryError>;
    fn end_index(&self) -> Result<usize, QueryError>;
    /// Source text between the resolved offsets, including any characters that no
    /// intermediate node covers.
    fn text(&self) -> Result<&'g str, QueryError>;
}

impl<'g> Extent<'g> for NodeRef<'g> {
    fn start_index(&self) -> Result<usize, QueryError> {
        resolve_offset(*self, Side::Start)
    }

    fn end_index(&self) -> Result<usize, QueryError> {
        resolve_offset(*self, Side::End)
    }

    fn text(&self) -> Result<&'g str, QueryError> {
        let start = self.start_index()?;
        let end = self.end_index()?;
        self.graph().source().substring(start, end)
    }
}

/// Access to the `first`/`last` boundary nodes of a container.
pub trait SpanContainer<'g> {
    fn first(&self) -> Result<NodeRef<'g>, QueryError>;
    fn last(&self) -> Result<NodeRef<'g>, QueryError>;
}

impl<'g> SpanContainer<'g> for NodeRef<'g> {
    fn first(&self) -> Result<NodeRef<'g>, QueryError> {
        self.require(Capability::SpanContainer)?;
        self.expect_target(&EdgeLabel::First)
    }

    fn last(&self) -> Result<NodeRef<'g>, QueryError> {
        self.require(Capability::SpanContainer)?;
        self.expect_target(&EdgeLabel::Last)
    }
}

/// Typed lookups over hierarchical edges.
///
/// Nodes whose type lacks [`Capability::Ancestry`] report no parents at all.
pub trait Ancestry<'g> {
    /// Direct parents in edge declaration order.
    fn parents(&self) -> Vec<NodeRef<'g>>;
    /// Direct children in edge declaration order.
    fn children(&self) -> Vec<NodeRef<'g>>;
    /// Every ancestor once, breadth first, edges visited in declaration order.
    fn ancestors(&self) -> Ancestors<'g>;
    fn first_parent_of_type(&self, node_type: &str) -> Option<NodeRef<'g>>;
    fn parents_of_type(&self, node_type: &str) -> Vec<NodeRef<'g>>;
}

impl<'g> Ancestry<'g> for NodeRef<'g> {
    fn parents(&self) -> Vec<NodeRef<'g>> {
        if !self.supports(Capability::Ancestry) {
            return Vec::new();
        }
        unique(hierarchical_parents(*self))
    }

    fn children(&self) -> Vec<NodeRef<'g>> {
        if !self.supports(Capability::Ancestry) {
            return Vec::new();
        }
        unique(hierarchical_children(*self))
    }

    fn ancestors(&self) -> Ancestors<'g> {
        Ancestors::new(*self, self.supports(Capability::Ancestry))
    }

    fn first_parent_of_type(&self, node_type: &str) -> Option<NodeRef<'g>> {
        self.ancestors()
            .find(|ancestor| ancestor.node_type() == node_type)
    }

    fn parents_of_type(&self, node_type: &str) -> Vec<NodeRef<'g>> {
        self.ancestors()
            .filter(|ancestor| ancestor.node_type() == node_type)
            .collect()
    }
}

/// Breadth-first walk up the hierarchical edges. Cycles are cut by a visited set.
#[derive(Debug, Clone)]
pub struct Ancestors<'g> {
    queue: VecDeque<NodeRef<'g>>,
    seen: FxHashSet<NodeIndex>,
}

impl<'g> Ancestors<'g> {
    fn new(origin: NodeRef<'g>, enabled: bool) -> Self {
        let mut seen = FxHashSet::default();
        seen.insert(origin.index());
        let mut walk = Self {
            queue: VecDeque::new(),
            seen,
        };
        if enabled {
            walk.enqueue_parents(origin);
        }
        walk
    }

    fn enqueue_parents(&mut self, node: NodeRef<'g>) {
        for parent in hierarchical_parents(node) {
            if self.seen.insert(parent.index()) {
                self.queue.push_back(parent);
            }
        }
    }
}

impl<'g> Iterator for Ancestors<'g> {
    type Item = NodeRef<'g>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.queue.pop_front()?;
        self.enqueue_parents(node);
        Some(node)
    }
}

fn hierarchical_parents<'g>(node: NodeRef<'g>) -> impl Iterator<Item = NodeRef<'g>> {
    let graph = node.graph();
    node.incoming()
        .filter(|edge| edge.label.is_hierarchical())
        .filter_map(move |edge| graph.node(edge.from))
}

fn hierarchical_children<'g>(node: NodeRef<'g>) -> impl Iterator<Item = NodeRef<'g>> {
    let graph = node.graph();
    node.outgoing()
        .filter(|edge| edge.label.is_hierarchical())
        .filter_map(move |edge| graph.node(edge.to))
}

fn unique<'g>(nodes: impl Iterator<Item = NodeRef<'g>>) -> Vec<NodeRef<'g>> {
    let mut seen = FxHashSet::default();
    nodes.filter(|node| seen.insert(node.index())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

impl Side {
    fn boundary(self) -> EdgeLabel {
        match self {
            Self::Start => EdgeLabel::First,
            Self::End => EdgeLabel::Last,
        }
    }

    fn pick(self, current: usize, candidate: usize) -> usize {
        match self {
            Self::Start => current.min(candidate),
            Self::End => current.max(candidate),
        }
    }
}

fn resolve_offset(node: NodeRef<'_>, side: Side) -> Result<usize, QueryError> {
    let mut visiting = FxHashSet::default();
    let mut pending = vec![node];
    let mut best: Option<usize> = None;

    while let Some(mut current) = pending.pop() {
        loop {
            if !visiting.insert(current.index()) {
                break;
            }
            if let Some(offset) = direct_offset(current, side)? {
                best = Some(best.map_or(offset, |found| side.pick(found, offset)));
                break;
            }
            if let Some(boundary) = current.target(&side.boundary()) {
                trace!(node = current.id(), target = boundary.id(), ?side, "following boundary edge");
                current = boundary;
                continue;
            }
            // Reversed so children are visited in declaration order.
            let mark = pending.len();
            pending.extend(hierarchical_children(current));
            pending[mark..].reverse();
            break;
        }
    }

    best.ok_or_else(|| QueryError::NoSpanResolvable {
        node: node.id().to_string(),
    })
}

/// Offset taken from the node's own `start`/`length`. Only types with
/// [`Capability::Span`] carry one.
fn direct_offset(node: NodeRef<'_>, side: Side) -> Result<Option<usize>, QueryError> {
    if !node.supports(Capability::Span) {
        return Ok(None);
    }
    let Some((start, length)) = direct_span(node)? else {
        return Ok(None);
    };
    match side {
        Side::Start => Ok(Some(start)),
        Side::End => start
            .checked_add(length)
            .map(Some)
            .ok_or_else(|| QueryError::InvalidProperty {
                node: node.id().to_string(),
                name: LENGTH_PROPERTY.to_string(),
                value: length.to_string(),
            }),
    }
}

/// `start`/`length` pair carried by the node itself, if both are present.
fn direct_span(node: NodeRef<'_>) -> Result<Option<(usize, usize)>, QueryError> {
    let start = offset_property(node, START_PROPERTY)?;
    let length = offset_property(node, LENGTH_PROPERTY)?;
    Ok(start.zip(length))
}

fn offset_property(node: NodeRef<'_>, name: &str) -> Result<Option<usize>, QueryError> {
    node.properties()
        .get_as::<usize>(name)
        .map_err(|value| QueryError::InvalidProperty {
            node: node.id().to_string(),
            name: name.to_string(),
            value,
        })
}
