//! Incremental reader for graph markup.
//!
//! Bytes are pulled from an [`AsyncRead`] in fixed-size chunks and buffered until
//! one complete top-level element is available. Only then is the element handed to
//! the grammar in [`crate::element`], so a parse suspends between elements and never
//! inside one.

use futures::Stream;
use lg_core::GraphError;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::config::ParserConfig;
use crate::element::{Item, parse_element};
use crate::event::GraphEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeGraph,
    InGraph,
    AfterGraph,
}

/// Result of scanning the front of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    /// Not enough bytes buffered to decide.
    NeedMore,
    /// Prolog, doctype or comment of `len` bytes.
    Skip(usize),
    /// A complete element of `len` bytes.
    Element(usize),
}

pub struct MarkupReader<R> {
    reader: R,
    scratch: Box<[u8]>,
    buffer: Vec<u8>,
    /// Stream offset of `buffer[0]`.
    consumed: usize,
    max_element_bytes: usize,
    position: Position,
    eof: bool,
}

impl<R: AsyncRead + Unpin> MarkupReader<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, &ParserConfig::default())
    }

    #[must_use]
    pub fn with_config(reader: R, config: &ParserConfig) -> Self {
        Self {
            reader,
            scratch: vec![0; config.read_chunk_size.max(1)].into_boxed_slice(),
            buffer: Vec::new(),
            consumed: 0,
            max_element_bytes: config.max_element_bytes.max(1),
            position: Position::BeforeGraph,
            eof: false,
        }
    }

    /// Next declaration, or `None` once `</graph>` has been read and the stream is
    /// exhausted.
    pub async fn next_event(&mut self) -> Result<Option<GraphEvent>, GraphError> {
        loop {
            self.skip_whitespace();
            match self.scan()? {
                Scan::Skip(len) => {
                    trace!(offset = self.consumed, bytes = len, "skipped markup declaration");
                    self.consume(len);
                }
                Scan::Element(len) => {
                    let offset = self.consumed;
                    let item = {
                        let chunk = std::str::from_utf8(&self.buffer[..len]).map_err(|err| {
                            GraphError::malformed(
                                format!("invalid UTF-8 in element: {err}"),
                                offset + err.valid_up_to(),
                            )
                        })?;
                        parse_element(chunk, offset)?
                    };
                    self.consume(len);
                    trace!(offset, bytes = len, "element");
                    if let Some(event) = self.advance(item, offset)? {
                        return Ok(Some(event));
                    }
                }
                Scan::NeedMore if self.eof => return self.finish().map(|()| None),
                Scan::NeedMore => self.fill().await?,
            }
        }
    }

    /// Turns the reader into a stream of events. The stream ends after the first
    /// error.
    pub fn into_events(self) -> impl Stream<Item = Result<GraphEvent, GraphError>> {
        futures::stream::try_unfold(self, |mut reader| async move {
            let event = reader.next_event().await?;
            Ok(event.map(|event| (event, reader)))
        })
    }

    async fn fill(&mut self) -> Result<(), GraphError> {
        let read = self.reader.read(&mut self.scratch).await?;
        if read == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&self.scratch[..read]);
            trace!(bytes = read, buffered = self.buffer.len(), "read chunk");
        }
        Ok(())
    }

    fn consume(&mut self, len: usize) {
        self.buffer.drain(..len);
        self.consumed += len;
    }

    fn skip_whitespace(&mut self) {
        let len = self
            .buffer
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .unwrap_or(self.buffer.len());
        if len > 0 {
            self.consume(len);
        }
    }

    fn scan(&self) -> Result<Scan, GraphError> {
        let scan = scan_item(&self.buffer).map_err(|message| GraphError::malformed(message, self.consumed))?;
        if scan == Scan::NeedMore && self.buffer.len() > self.max_element_bytes {
            return Err(GraphError::malformed(
                format!("element exceeds {} bytes", self.max_element_bytes),
                self.consumed,
            ));
        }
        Ok(scan)
    }

    fn advance(&mut self, item: Item, offset: usize) -> Result<Option<GraphEvent>, GraphError> {
        let position = self.position;
        let misplaced = |what: &str| GraphError::malformed(what.to_string(), offset);
        match (item, position) {
            (Item::GraphOpen, Position::BeforeGraph) => {
                self.position = Position::InGraph;
                Ok(None)
            }
            (Item::EmptyGraph, Position::BeforeGraph) => {
                self.position = Position::AfterGraph;
                Ok(None)
            }
            (Item::GraphClose, Position::InGraph) => {
                self.position = Position::AfterGraph;
                Ok(None)
            }
            (Item::Event(event), Position::InGraph) => Ok(Some(event)),
            (_, Position::AfterGraph) => Err(misplaced("content after </graph>")),
            (Item::GraphOpen | Item::EmptyGraph, Position::InGraph) => {
                Err(misplaced("nested <graph> element"))
            }
            (Item::GraphClose, Position::BeforeGraph) => {
                Err(misplaced("</graph> without a matching <graph>"))
            }
            (Item::Event(_), Position::BeforeGraph) => {
                Err(misplaced("declaration outside of <graph>"))
            }
        }
    }

    fn finish(&self) -> Result<(), GraphError> {
        if !self.buffer.is_empty() {
            return Err(GraphError::IncompleteStream {
                message: format!(
                    "stream ended inside an element at byte {} ({} bytes pending)",
                    self.consumed,
                    self.buffer.len()
                ),
            });
        }
        match self.position {
            Position::AfterGraph => Ok(()),
            Position::BeforeGraph => Err(GraphError::IncompleteStream {
                message: "stream ended before <graph>".to_string(),
            }),
            Position::InGraph => Err(GraphError::IncompleteStream {
                message: "stream ended before </graph>".to_string(),
            }),
        }
    }
}

/// Classifies the item at the front of `buffer`, which starts at a
/// non-whitespace byte (or is empty).
fn scan_item(buffer: &[u8]) -> Result<Scan, String> {
    let Some(&first) = buffer.first() else {
        return Ok(Scan::NeedMore);
    };
    if first != b'<' {
        return Err("text outside of an element".to_string());
    }
    if buffer.len() < 2 {
        return Ok(Scan::NeedMore);
    }

    match buffer[1] {
        b'?' => Ok(find(buffer, b"?>", 2).map_or(Scan::NeedMore, |end| Scan::Skip(end + 2))),
        b'!' => {
            if buffer.len() < 4 {
                return Ok(Scan::NeedMore);
            }
            if buffer.starts_with(b"<!--") {
                Ok(find(buffer, b"-->", 4).map_or(Scan::NeedMore, |end| Scan::Skip(end + 3)))
            } else {
                Ok(tag_end(buffer, 2).map_or(Scan::NeedMore, |end| Scan::Skip(end + 1)))
            }
        }
        b'/' => Ok(tag_end(buffer, 2).map_or(Scan::NeedMore, |end| Scan::Element(end + 1))),
        _ => {
            let Some(end) = tag_end(buffer, 1) else {
                return Ok(Scan::NeedMore);
            };
            if buffer[end - 1] == b'/' {
                return Ok(Scan::Element(end + 1));
            }
            let name = tag_name(&buffer[1..end]);
            if name == b"graph" {
                return Ok(Scan::Element(end + 1));
            }
            let mut closing = Vec::with_capacity(name.len() + 2);
            closing.extend_from_slice(b"</");
            closing.extend_from_slice(name);
            let Some(close_start) = find(buffer, &closing, end + 1) else {
                return Ok(Scan::NeedMore);
            };
            Ok(tag_end(buffer, close_start + closing.len())
                .map_or(Scan::NeedMore, |close_end| Scan::Element(close_end + 1)))
        }
    }
}

fn tag_name(tag: &[u8]) -> &[u8] {
    let len = tag
        .iter()
        .position(|byte| byte.is_ascii_whitespace() || matches!(byte, b'/' | b'>'))
        .unwrap_or(tag.len());
    &tag[..len]
}

/// Index of the `>` closing the tag that starts before `from`, ignoring any `>`
/// inside quoted attribute values.
fn tag_end(buffer: &[u8], from: usize) -> Option<usize> {
    let mut quote = None;
    for (index, &byte) in buffer.iter().enumerate().skip(from) {
        match (quote, byte) {
            (Some(open), _) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(byte),
            (None, b'>') => return Some(index),
            (None, _) => {}
        }
    }
    None
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|position| position + from)
}
