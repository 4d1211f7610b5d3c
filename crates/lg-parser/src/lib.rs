#![forbid(unsafe_code)]

//! Reads annotation-graph markup into an immutable [`lg_core::Graph`].
//!
//! The markup is consumed incrementally from any [`tokio::io::AsyncRead`]; edges may
//! name nodes declared later in the document and are wired once the stream ends.

mod builder;
pub mod config;
mod element;
pub mod event;
pub mod markup;

use std::pin::pin;

use futures::{Stream, StreamExt};
use lg_core::{Graph, GraphError, SourceText};
use serde::Serialize;
use tokio::io::AsyncRead;
use tracing::debug;

use crate::builder::GraphBuilder;

pub use config::{ConfigError, ParserConfig};
pub use event::{EdgeDecl, GraphEvent, NodeDecl};
pub use markup::MarkupReader;

/// Lifecycle of a [`GraphParser`]. Node and edge declarations are read interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseState {
    Init,
    Reading,
    Resolving,
    Done,
    Failed,
}

impl ParseState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Reading => "reading",
            Self::Resolving => "resolving",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

/// Drives one parse at a time. A parser can be reused; each call starts from
/// [`ParseState::Init`] and produces a new, independent graph.
#[derive(Debug, Clone)]
pub struct GraphParser {
    config: ParserConfig,
    state: ParseState,
}

impl Default for GraphParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl GraphParser {
    #[must_use]
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            state: ParseState::Init,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    #[must_use]
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Parses markup read from `reader`. `source` is the text the node offsets
    /// point into.
    pub async fn parse<R>(
        &mut self,
        reader: R,
        source: impl Into<SourceText>,
    ) -> Result<Graph, GraphError>
    where
        R: AsyncRead + Unpin,
    {
        let events = MarkupReader::with_config(reader, &self.config).into_events();
        self.parse_events(events, source).await
    }

    /// Builds a graph from any stream of declarations. The first error aborts the
    /// parse and no graph is returned.
    pub async fn parse_events<S>(
        &mut self,
        events: S,
        source: impl Into<SourceText>,
    ) -> Result<Graph, GraphError>
    where
        S: Stream<Item = Result<GraphEvent, GraphError>>,
    {
        self.transition(ParseState::Init);
        let result = self.run(events, source.into()).await;
        if let Err(err) = &result {
            debug!(code = err.code().as_str(), error = %err, "parse failed");
            self.transition(ParseState::Failed);
        }
        result
    }

    /// Synchronous entry point for markup that is already fully in memory.
    pub fn parse_buffered(
        &mut self,
        markup: &str,
        source: impl Into<SourceText>,
    ) -> Result<Graph, GraphError> {
        futures::executor::block_on(self.parse(markup.as_bytes(), source))
    }

    async fn run<S>(&mut self, events: S, source: SourceText) -> Result<Graph, GraphError>
    where
        S: Stream<Item = Result<GraphEvent, GraphError>>,
    {
        let mut events = pin!(events);
        let mut builder = GraphBuilder::new(
            self.config.schema.clone(),
            self.config.synthesize_inverse_sequence,
        );

        self.transition(ParseState::Reading);
        while let Some(event) = events.next().await {
            builder.apply(event?)?;
        }

        debug!(
            nodes = builder.node_count(),
            pending_edges = builder.pending_edge_count(),
            "declarations read"
        );
        self.transition(ParseState::Resolving);
        let graph = builder.finish(source)?;
        self.transition(ParseState::Done);
        Ok(graph)
    }

    fn transition(&mut self, next: ParseState) {
        debug!(from = self.state.as_str(), to = next.as_str(), "parse state");
        self.state = next;
    }
}

/// Parses with the default configuration.
pub async fn parse<R>(reader: R, source: impl Into<SourceText>) -> Result<Graph, GraphError>
where
    R: AsyncRead + Unpin,
{
    GraphParser::default().parse(reader, source).await
}

/// Parses fully buffered markup with the default configuration.
pub fn parse_str(markup: &str, source: impl Into<SourceText>) -> Result<Graph, GraphError> {
    GraphParser::default().parse_buffered(markup, source)
}
