use serde::{Deserialize, Serialize};

/// One self-contained declaration read from the markup, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraphEvent {
    Node(NodeDecl),
    Edge(EdgeDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDecl {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Every `(name, value)` pair in declaration order, repeats included.
    #[serde(default)]
    pub properties: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeDecl {
    pub label: String,
    pub from: String,
    pub to: String,
}

impl NodeDecl {
    #[must_use]
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }
}

impl EdgeDecl {
    #[must_use]
    pub fn new(label: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            from: from.into(),
            to: to.into(),
        }
    }
}

impl From<NodeDecl> for GraphEvent {
    fn from(decl: NodeDecl) -> Self {
        Self::Node(decl)
    }
}

impl From<EdgeDecl> for GraphEvent {
    fn from(decl: EdgeDecl) -> Self {
        Self::Edge(decl)
    }
}
