#![no_main]

use libfuzzer_sys::fuzz_target;
use lg_parser::{GraphParser, ParserConfig};

// First byte picks the read chunk size so element splitting is exercised at
// every boundary; the rest is fed to the reader as raw bytes.
fuzz_target!(|data: &[u8]| {
    let Some((&chunk, markup)) = data.split_first() else {
        return;
    };
    let mut parser = GraphParser::new(ParserConfig {
        read_chunk_size: usize::from(chunk) + 1,
        max_element_bytes: 4096,
        ..ParserConfig::default()
    });
    let _ = futures::executor::block_on(parser.parse(markup, ""));
});
