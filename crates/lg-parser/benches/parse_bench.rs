use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lg_parser::{GraphParser, ParserConfig};

const MARKUP: &str = include_str!("../tests/fixtures/mary.xml");
const TEXT: &str = include_str!("../tests/fixtures/mary.txt");

fn bench_parse_fixture(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_mary");
    group.throughput(Throughput::Bytes(MARKUP.len() as u64));

    for chunk in [256usize, 8 * 1024, 64 * 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            let mut parser = GraphParser::new(ParserConfig {
                read_chunk_size: chunk,
                ..ParserConfig::default()
            });
            b.iter(|| {
                let graph = parser
                    .parse_buffered(black_box(MARKUP), TEXT)
                    .expect("fixture parses");
                black_box(graph.node_count())
            });
        });
    }

    group.finish();
}

fn bench_sentence_text(c: &mut Criterion) {
    use lg_core::Extent;

    let graph = lg_parser::parse_str(MARKUP, TEXT).expect("fixture parses");
    c.bench_function("sentence_text", |b| {
        b.iter(|| {
            for sentence in graph.nodes_by_type("SB") {
                black_box(sentence.text().expect("sentence text"));
            }
        });
    });
}

criterion_group!(benches, bench_parse_fixture, bench_sentence_text);
criterion_main!(benches);
