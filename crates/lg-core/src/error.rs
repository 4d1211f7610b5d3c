use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capability::Capability;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    MalformedInput,
    DuplicateId,
    DanglingReference,
    IncompleteStream,
    Io,
    NotFound,
    NoSuchEdge,
    NoSpanResolvable,
    Unsupported,
    InvalidProperty,
    OutOfBounds,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MalformedInput => "graph/error/malformed-input",
            Self::DuplicateId => "graph/error/duplicate-id",
            Self::DanglingReference => "graph/error/dangling-reference",
            Self::IncompleteStream => "graph/error/incomplete-stream",
            Self::Io => "graph/error/io",
            Self::NotFound => "query/error/not-found",
            Self::NoSuchEdge => "query/error/no-such-edge",
            Self::NoSpanResolvable => "query/error/no-span-resolvable",
            Self::Unsupported => "query/error/unsupported",
            Self::InvalidProperty => "query/error/invalid-property",
            Self::OutOfBounds => "query/error/out-of-bounds",
        }
    }
}

/// Fatal errors raised while a graph is being built. No partial graph survives one.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum GraphError {
    /// `offset` is the byte offset of the offending element when the input was markup.
    #[error("malformed input: {message}")]
    MalformedInput {
        message: String,
        offset: Option<usize>,
    },
    #[error("duplicate node id '{id}'")]
    DuplicateId { id: String },
    #[error("edge '{label}' from '{from}' to '{to}' references undeclared node '{missing}'")]
    DanglingReference {
        label: String,
        from: String,
        to: String,
        missing: String,
    },
    #[error("stream ended before the document was complete: {message}")]
    IncompleteStream { message: String },
    #[error("failed reading stream: {message}")]
    Io { message: String },
}

impl GraphError {
    #[must_use]
    pub fn malformed(message: impl Into<String>, offset: usize) -> Self {
        Self::MalformedInput {
            message: format!("{} (at byte {offset})", message.into()),
            offset: Some(offset),
        }
    }

    /// Malformed event that did not come from a located markup element.
    #[must_use]
    pub fn malformed_event(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
            offset: None,
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MalformedInput { .. } => ErrorCode::MalformedInput,
            Self::DuplicateId { .. } => ErrorCode::DuplicateId,
            Self::DanglingReference { .. } => ErrorCode::DanglingReference,
            Self::IncompleteStream { .. } => ErrorCode::IncompleteStream,
            Self::Io { .. } => ErrorCode::Io,
        }
    }
}

impl From<std::io::Error> for GraphError {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: error.to_string(),
        }
    }
}

/// Errors local to a single query. The graph is untouched and the caller may retry.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("no node with id '{id}'")]
    NotFound { id: String },
    #[error("node '{node}' has no '{label}' edge")]
    NoSuchEdge { node: String, label: String },
    #[error("no span-bearing node is reachable from node '{node}'")]
    NoSpanResolvable { node: String },
    #[error("node '{node}' of type '{node_type}' does not support {capability}")]
    Unsupported {
        node: String,
        node_type: String,
        capability: Capability,
    },
    #[error("property '{name}' of node '{node}' has invalid value '{value}'")]
    InvalidProperty {
        node: String,
        name: String,
        value: String,
    },
    #[error("offsets {start}..{end} fall outside the source text of {len} characters")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

impl QueryError {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::NoSuchEdge { .. } => ErrorCode::NoSuchEdge,
            Self::NoSpanResolvable { .. } => ErrorCode::NoSpanResolvable,
            Self::Unsupported { .. } => ErrorCode::Unsupported,
            Self::InvalidProperty { .. } => ErrorCode::InvalidProperty,
            Self::OutOfBounds { .. } => ErrorCode::OutOfBounds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, GraphError, QueryError};
    use crate::capability::Capability;

    #[test]
    fn error_codes_are_stable() {
        let err = GraphError::DuplicateId { id: "7".to_string() };
        assert_eq!(err.code(), ErrorCode::DuplicateId);
        assert_eq!(err.code().as_str(), "graph/error/duplicate-id");
        assert_eq!(
            QueryError::NotFound { id: "x".to_string() }.code().as_str(),
            "query/error/not-found"
        );
    }

    #[test]
    fn messages_name_the_offending_ids() {
        let err = GraphError::DanglingReference {
            label: "next".to_string(),
            from: "1".to_string(),
            to: "99".to_string(),
            missing: "99".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "edge 'next' from '1' to '99' references undeclared node '99'"
        );

        let err = QueryError::Unsupported {
            node: "5".to_string(),
            node_type: "COREF".to_string(),
            capability: Capability::Sequence,
        };
        assert_eq!(
            err.to_string(),
            "node '5' of type 'COREF' does not support sequence"
        );
    }

    #[test]
    fn malformed_errors_carry_offsets() {
        let err = GraphError::malformed("unknown element <span>", 42);
        assert_eq!(
            err.to_string(),
            "malformed input: unknown element <span> (at byte 42)"
        );
        assert!(matches!(
            err,
            GraphError::MalformedInput {
                offset: Some(42),
                ..
            }
        ));
        assert!(matches!(
            GraphError::malformed_event("empty id"),
            GraphError::MalformedInput { offset: None, .. }
        ));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = GraphError::from(io);
        assert_eq!(err.code(), ErrorCode::Io);
        assert!(err.to_string().contains("pipe closed"));
    }
}
