#![forbid(unsafe_code)]

//! Typed annotation graph: tokens, constituents, coreference and sentence nodes
//! connected by sequence, boundary and hierarchical edges over one source text.

pub mod behavior;
pub mod capability;
pub mod error;
pub mod graph;
pub mod node;
pub mod property;
pub mod source;

pub use behavior::{Ancestors, Ancestry, Extent, Sequence, SpanContainer};
pub use capability::{Capability, CapabilitySet, Schema};
pub use error::{ErrorCode, GraphError, QueryError};
pub use graph::{Edge, EdgeIndex, EdgeLabel, Graph, Node, NodeIndex, NodeIter, NodeList};
pub use node::NodeRef;
pub use property::Properties;
pub use source::SourceText;
