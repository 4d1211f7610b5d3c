#![no_main]

use libfuzzer_sys::fuzz_target;
use lg_core::{Ancestry, Extent, Sequence, SpanContainer};

// Any graph that parses must answer every query without panicking.
fuzz_target!(|data: &str| {
    let (markup, text) = data.split_once('\u{0}').unwrap_or((data, ""));
    let Ok(graph) = lg_parser::parse_str(markup, text) else {
        return;
    };
    for node in graph.nodes() {
        let _ = node.next();
        let _ = node.previous();
        let _ = node.first();
        let _ = node.last();
        let _ = node.text();
        let _ = node.ancestors().count();
        let _ = node.children();
    }
});
