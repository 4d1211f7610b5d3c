use chumsky::prelude::*;
use lg_core::GraphError;

use crate::event::{EdgeDecl, GraphEvent, NodeDecl};

const GRAPH_TAG: &str = "graph";
const NODE_TAG: &str = "node";
const PROP_TAG: &str = "prop";
const EDGE_TAG: &str = "edge";

/// One top-level piece of markup after lowering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Item {
    GraphOpen,
    GraphClose,
    /// `<graph/>`: a document without declarations.
    EmptyGraph,
    Event(GraphEvent),
}

// ---------------------------------------------------------------------------
// Raw syntax produced by the chumsky grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct RawTag<'a> {
    name: &'a str,
    attributes: Vec<(&'a str, &'a str)>,
}

#[derive(Debug, Clone)]
enum RawChunk<'a> {
    /// `<name .../>`
    Empty(RawTag<'a>),
    /// `<name ...>` with nothing after it in the chunk.
    Open(RawTag<'a>),
    /// `</name>`
    Close(&'a str),
    /// `<name ...> <child .../>* </closing>`
    Element {
        tag: RawTag<'a>,
        children: Vec<RawTag<'a>>,
        closing: &'a str,
    },
}

/// Grammar for a single top-level chunk, as cut out by the markup reader.
fn chunk_parser<'a>() -> impl Parser<'a, &'a str, RawChunk<'a>, extra::Err<Rich<'a, char>>> {
    let ws_char = any().filter(|c: &char| c.is_whitespace());
    let ws = ws_char.clone().repeated();

    let name = any()
        .filter(|c: &char| c.is_ascii_alphanumeric() || matches!(*c, '_' | '-' | '.' | ':'))
        .repeated()
        .at_least(1)
        .to_slice();

    let quoted = {
        let double_q = just('"')
            .ignore_then(any().filter(|c: &char| *c != '"' && *c != '<').repeated().to_slice())
            .then_ignore(just('"'));
        let single_q = just('\'')
            .ignore_then(any().filter(|c: &char| *c != '\'' && *c != '<').repeated().to_slice())
            .then_ignore(just('\''));
        double_q.or(single_q)
    };

    let attribute = name
        .clone()
        .then_ignore(ws.clone())
        .then_ignore(just('='))
        .then_ignore(ws.clone())
        .then(quoted);
    let attributes = ws_char
        .repeated()
        .at_least(1)
        .ignore_then(attribute)
        .repeated()
        .collect::<Vec<_>>();

    let tag_head = just('<')
        .ignore_then(name.clone())
        .then(attributes)
        .then_ignore(ws.clone())
        .map(|(name, attributes)| RawTag { name, attributes });
    let empty_tag = tag_head.clone().then_ignore(just("/>"));
    let open_tag = tag_head.then_ignore(just('>'));
    let close_tag = just("</")
        .ignore_then(name)
        .then_ignore(ws.clone())
        .then_ignore(just('>'));

    let element = open_tag
        .clone()
        .then(
            ws.clone()
                .ignore_then(empty_tag.clone())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(ws.clone())
        .then(close_tag.clone())
        .map(|((tag, children), closing)| RawChunk::Element {
            tag,
            children,
            closing,
        });

    choice((
        empty_tag.map(RawChunk::Empty),
        element,
        open_tag.map(RawChunk::Open),
        close_tag.map(RawChunk::Close),
    ))
    .padded_by(ws)
    .then_ignore(end())
}

/// Parses and lowers one chunk. `offset` is the chunk's byte offset in the
/// stream and is only used for error reporting.
pub(crate) fn parse_element(chunk: &str, offset: usize) -> Result<Item, GraphError> {
    let (raw, errors) = chunk_parser().parse(chunk).into_output_errors();
    match (raw, errors.first()) {
        (Some(raw), None) => lower_chunk(raw, offset),
        (_, Some(err)) => Err(GraphError::malformed(
            format!("{err} in {}", excerpt(chunk)),
            offset + err.span().start,
        )),
        (None, None) => Err(GraphError::malformed(
            format!("unparseable element {}", excerpt(chunk)),
            offset,
        )),
    }
}

// ---------------------------------------------------------------------------
// Lowering
// ---------------------------------------------------------------------------

fn lower_chunk(raw: RawChunk<'_>, offset: usize) -> Result<Item, GraphError> {
    match raw {
        RawChunk::Open(tag) if tag.name == GRAPH_TAG => Ok(Item::GraphOpen),
        RawChunk::Empty(tag) if tag.name == GRAPH_TAG => Ok(Item::EmptyGraph),
        RawChunk::Close(GRAPH_TAG) => Ok(Item::GraphClose),
        RawChunk::Empty(tag) if tag.name == NODE_TAG => lower_node(&tag, &[], offset),
        RawChunk::Empty(tag) if tag.name == EDGE_TAG => lower_edge(&tag, offset),
        RawChunk::Element {
            tag,
            children,
            closing,
        } => {
            if closing != tag.name {
                return Err(GraphError::malformed(
                    format!("<{}> closed by </{closing}>", tag.name),
                    offset,
                ));
            }
            match tag.name {
                NODE_TAG => lower_node(&tag, &children, offset),
                EDGE_TAG if children.is_empty() => lower_edge(&tag, offset),
                EDGE_TAG => Err(GraphError::malformed(
                    "<edge> does not take child elements",
                    offset,
                )),
                other => Err(unknown_element(other, offset)),
            }
        }
        RawChunk::Open(tag) => Err(GraphError::malformed(
            format!("unterminated <{}> element", tag.name),
            offset,
        )),
        RawChunk::Close(name) => Err(GraphError::malformed(
            format!("unexpected closing tag </{name}>"),
            offset,
        )),
        RawChunk::Empty(tag) => Err(unknown_element(tag.name, offset)),
    }
}

fn lower_node(tag: &RawTag<'_>, children: &[RawTag<'_>], offset: usize) -> Result<Item, GraphError> {
    let id = required_attribute(tag, "id", offset)?;
    let node_type = required_attribute(tag, "type", offset)?;

    let mut properties = Vec::with_capacity(children.len());
    for child in children {
        if child.name != PROP_TAG {
            return Err(GraphError::malformed(
                format!("unexpected <{}> inside <node id=\"{id}\">", child.name),
                offset,
            ));
        }
        let name = required_attribute(child, "name", offset)?;
        let value = match attribute(child, "value") {
            Some(raw) => decode_entities(raw).map_err(|message| GraphError::malformed(message, offset))?,
            None => {
                return Err(GraphError::malformed(
                    format!("<prop name=\"{name}\"> on node '{id}' has no value attribute"),
                    offset,
                ));
            }
        };
        properties.push((name, value));
    }

    Ok(Item::Event(GraphEvent::Node(NodeDecl {
        id,
        node_type,
        properties,
    })))
}

fn lower_edge(tag: &RawTag<'_>, offset: usize) -> Result<Item, GraphError> {
    Ok(Item::Event(GraphEvent::Edge(EdgeDecl {
        label: required_attribute(tag, "label", offset)?,
        from: required_attribute(tag, "from", offset)?,
        to: required_attribute(tag, "to", offset)?,
    })))
}

fn attribute<'a>(tag: &RawTag<'a>, name: &str) -> Option<&'a str> {
    tag.attributes
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| *value)
}

/// Decoded, non-empty attribute value.
fn required_attribute(tag: &RawTag<'_>, name: &str, offset: usize) -> Result<String, GraphError> {
    let raw = attribute(tag, name).ok_or_else(|| {
        GraphError::malformed(
            format!("<{}> is missing the '{name}' attribute", tag.name),
            offset,
        )
    })?;
    let value = decode_entities(raw).map_err(|message| GraphError::malformed(message, offset))?;
    if value.is_empty() {
        return Err(GraphError::malformed(
            format!("<{}> has an empty '{name}' attribute", tag.name),
            offset,
        ));
    }
    Ok(value)
}

fn unknown_element(name: &str, offset: usize) -> GraphError {
    GraphError::malformed(format!("unknown element <{name}>"), offset)
}

/// Decodes the predefined entities and numeric character references.
pub(crate) fn decode_entities(raw: &str) -> Result<String, String> {
    if !raw.contains('&') {
        return Ok(raw.to_string());
    }

    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| format!("unterminated entity in \"{raw}\""))?;
        let entity = &after[..semi];
        let ch = match entity {
            "lt" => '<',
            "gt" => '>',
            "amp" => '&',
            "quot" => '"',
            "apos" => '\'',
            _ => numeric_reference(entity)
                .ok_or_else(|| format!("unknown entity &{entity}; in \"{raw}\""))?,
        };
        decoded.push(ch);
        rest = &after[semi + 1..];
    }
    decoded.push_str(rest);
    Ok(decoded)
}

fn numeric_reference(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix('x').or_else(|| digits.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}

fn excerpt(chunk: &str) -> String {
    const MAX_CHARS: usize = 48;
    let trimmed = chunk.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        format!("`{trimmed}`")
    } else {
        let head: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("`{head}...`")
    }
}

#[cfg(test)]
mod tests {
    use lg_core::GraphError;

    use super::{Item, decode_entities, parse_element};
    use crate::event::{EdgeDecl, GraphEvent, NodeDecl};

    fn event(chunk: &str) -> GraphEvent {
        match parse_element(chunk, 0) {
            Ok(Item::Event(event)) => event,
            other => panic!("expected an event for {chunk:?}, got {other:?}"),
        }
    }

    fn malformed(chunk: &str) -> String {
        match parse_element(chunk, 100) {
            Err(GraphError::MalformedInput {
                message,
                offset: Some(offset),
            }) => {
                assert!(offset >= 100, "offset {offset} is relative to the chunk");
                message
            }
            other => panic!("expected MalformedInput for {chunk:?}, got {other:?}"),
        }
    }

    #[test]
    fn graph_markers() {
        assert_eq!(parse_element("<graph>", 0), Ok(Item::GraphOpen));
        assert_eq!(parse_element("<graph version='2'>", 0), Ok(Item::GraphOpen));
        assert_eq!(parse_element("</graph >", 0), Ok(Item::GraphClose));
        assert_eq!(parse_element("<graph/>", 0), Ok(Item::EmptyGraph));
    }

    #[test]
    fn node_with_repeated_properties() {
        let chunk = r#"<node id="24" type="TOK">
            <prop name="pos" value="NN"/>
            <prop name='start' value='0' />
            <prop name="pos" value="NNP"/>
        </node>"#;
        assert_eq!(
            event(chunk),
            GraphEvent::Node(
                NodeDecl::new("24", "TOK")
                    .with_property("pos", "NN")
                    .with_property("start", "0")
                    .with_property("pos", "NNP")
            )
        );
    }

    #[test]
    fn self_closing_node_and_edge() {
        assert_eq!(
            event(r#"<node id="68" type="SB"/>"#),
            GraphEvent::Node(NodeDecl::new("68", "SB"))
        );
        assert_eq!(
            event(r#"<edge label="next" from="0" to="1"/>"#),
            GraphEvent::Edge(EdgeDecl::new("next", "0", "1"))
        );
    }

    #[test]
    fn attribute_values_are_decoded() {
        let GraphEvent::Node(node) = event(
            r#"<node id="q" type="TOK"><prop name="word" value="&quot;A&amp;B&#x27;&#33;"/></node>"#,
        ) else {
            panic!("node expected");
        };
        assert_eq!(node.properties, vec![("word".to_string(), "\"A&B'!".to_string())]);
    }

    #[test]
    fn unknown_and_mismatched_elements_are_malformed() {
        assert!(malformed(r#"<span id="1"/>"#).contains("unknown element <span>"));
        assert!(malformed(r#"<node id="1" type="TOK"></edge>"#).contains("closed by </edge>"));
        assert!(malformed(r#"<node id="1" type="TOK"><span/></node>"#).contains("unexpected <span>"));
        assert!(malformed(r#"<node id="1" type="TOK">"#).contains("unterminated <node>"));
        assert!(malformed("</node>").contains("unexpected closing tag"));
    }

    #[test]
    fn missing_or_empty_attributes_are_malformed() {
        assert!(malformed(r#"<node type="TOK"/>"#).contains("missing the 'id' attribute"));
        assert!(malformed(r#"<node id="" type="TOK"/>"#).contains("empty 'id'"));
        assert!(malformed(r#"<edge label="" from="a" to="b"/>"#).contains("empty 'label'"));
        assert!(malformed(r#"<node id="1" type="TOK"><prop name="pos"/></node>"#).contains("no value"));
    }

    #[test]
    fn syntax_errors_point_into_the_chunk() {
        let err = parse_element(r#"<edge label="next from="0"/>"#, 10).expect_err("bad quoting");
        assert!(matches!(err, GraphError::MalformedInput { offset: Some(at), .. } if at >= 10));
    }

    #[test]
    fn entity_decoding() {
        assert_eq!(decode_entities("plain"), Ok("plain".to_string()));
        assert_eq!(decode_entities("a &lt; b &gt; c"), Ok("a < b > c".to_string()));
        assert_eq!(decode_entities("&#233;t&#xE9;"), Ok("été".to_string()));
        assert!(decode_entities("&bogus;").is_err());
        assert!(decode_entities("tail &amp").is_err());
        assert!(decode_entities("&#xD800;").is_err());
    }
}
