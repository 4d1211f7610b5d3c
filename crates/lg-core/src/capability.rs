//! Behaviors a node may expose, keyed by node type rather than by a type hierarchy.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// Linear `next`/`previous` order.
    Sequence,
    /// Direct `start`/`length` offsets into the source text.
    Span,
    /// Extent derived from `first`/`last` edges.
    SpanContainer,
    /// Typed ancestor lookup over hierarchical edges.
    Ancestry,
}

impl Capability {
    pub const ALL: [Self; 4] = [
        Self::Sequence,
        Self::Span,
        Self::SpanContainer,
        Self::Ancestry,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequence => "sequence",
            Self::Span => "span",
            Self::SpanContainer => "span-container",
            Self::Ancestry => "ancestry",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Self::Sequence => 1,
            Self::Span => 1 << 1,
            Self::SpanContainer => 1 << 2,
            Self::Ancestry => 1 << 3,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(from = "Vec<Capability>", into = "Vec<Capability>")]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0b1111);

    #[must_use]
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    #[must_use]
    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |capability| self.contains(*capability))
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl From<Vec<Capability>> for CapabilitySet {
    fn from(capabilities: Vec<Capability>) -> Self {
        capabilities.into_iter().collect()
    }
}

impl From<CapabilitySet> for Vec<Capability> {
    fn from(set: CapabilitySet) -> Self {
        set.iter().collect()
    }
}

/// Capability table consulted by every node query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Schema {
    pub types: BTreeMap<String, CapabilitySet>,
    /// Capabilities of node types missing from `types`.
    pub fallback: CapabilitySet,
}

impl Default for Schema {
    fn default() -> Self {
        use Capability::{Ancestry, Sequence, Span, SpanContainer};

        let mut types = BTreeMap::new();
        types.insert(
            "TOK".to_string(),
            [Sequence, Span, Ancestry].into_iter().collect(),
        );
        types.insert(
            "SB".to_string(),
            [Sequence, SpanContainer, Ancestry].into_iter().collect(),
        );
        types.insert(
            "COREF".to_string(),
            [SpanContainer, Ancestry].into_iter().collect(),
        );
        Self {
            types,
            fallback: CapabilitySet::EMPTY.with(Ancestry),
        }
    }
}

impl Schema {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: BTreeMap::new(),
            fallback: CapabilitySet::EMPTY,
        }
    }

    #[must_use]
    pub fn with_type(mut self, node_type: impl Into<String>, capabilities: CapabilitySet) -> Self {
        self.types.insert(node_type.into(), capabilities);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, capabilities: CapabilitySet) -> Self {
        self.fallback = capabilities;
        self
    }

    #[must_use]
    pub fn capabilities_of(&self, node_type: &str) -> CapabilitySet {
        self.types.get(node_type).copied().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Capability, CapabilitySet, Schema};

    #[test]
    fn set_membership() {
        let set = CapabilitySet::EMPTY
            .with(Capability::Span)
            .with(Capability::Ancestry);
        assert!(set.contains(Capability::Span));
        assert!(set.contains(Capability::Ancestry));
        assert!(!set.contains(Capability::Sequence));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Capability::Span, Capability::Ancestry]
        );
        assert!(CapabilitySet::EMPTY.is_empty());
        assert_eq!(Capability::ALL.into_iter().collect::<CapabilitySet>(), CapabilitySet::ALL);
    }

    #[test]
    fn default_schema_covers_annotation_types() {
        let schema = Schema::default();
        let tok = schema.capabilities_of("TOK");
        assert!(tok.contains(Capability::Sequence));
        assert!(tok.contains(Capability::Span));
        assert!(!tok.contains(Capability::SpanContainer));

        let coref = schema.capabilities_of("COREF");
        assert!(coref.contains(Capability::SpanContainer));
        assert!(!coref.contains(Capability::Sequence));

        let unknown = schema.capabilities_of("NE");
        assert_eq!(unknown, CapabilitySet::EMPTY.with(Capability::Ancestry));
    }

    #[test]
    fn schema_deserializes_from_json() {
        let schema: Schema = serde_json::from_value(json!({
            "types": { "WORD": ["sequence", "span"], "PHRASE": ["span-container"] },
            "fallback": []
        }))
        .expect("schema json");
        assert!(schema.capabilities_of("WORD").contains(Capability::Span));
        assert!(
            schema
                .capabilities_of("PHRASE")
                .contains(Capability::SpanContainer)
        );
        assert!(schema.capabilities_of("TOK").is_empty());
    }

    #[test]
    fn capability_set_serializes_as_names() {
        let set = CapabilitySet::EMPTY.with(Capability::SpanContainer);
        assert_eq!(
            serde_json::to_value(set).expect("serialize"),
            json!(["span-container"])
        );
    }
}
