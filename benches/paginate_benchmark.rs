//! Benchmarks for the codec and the pagination engine.
//!
//! Run with: cargo bench
//!
//! Inputs are synthetic plans are deterministic so runs compare.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use plandoc::paginate::SectionHeights;
use plandoc::{DocumentCodec, DocumentNode, Mark, PaginationOptions, Paginator};

/// Creates a section tree with `paragraphs` marked paragraphs and a list.
fn create_test_tree(paragraphs: usize) -> DocumentNode {
    let mut content = Vec::with_capacity(paragraphs + 1);
    for i in 0..paragraphs {
        content.push(DocumentNode::paragraph(vec![
            DocumentNode::text(format!("Paragraph {} describes ", i)),
            DocumentNode::marked_text("revenue", vec![Mark::Bold]),
            DocumentNode::text(" and "),
            DocumentNode::marked_text("costs", vec![Mark::Italic, Mark::highlight()]),
            DocumentNode::HardBreak,
            DocumentNode::marked_text("growth", vec![Mark::color("#1a7f37")]),
        ]));
    }
    content.push(DocumentNode::bullet_list(
        (0..10)
            .map(|i| DocumentNode::list_item(vec![DocumentNode::paragraph_text(format!("point {}", i))]))
            .collect(),
    ));
    DocumentNode::doc(content)
}

/// Creates section heights cycling through typical item sizes.
fn create_test_heights(sections: usize, items: usize) -> Vec<SectionHeights> {
    let sizes = [72.0, 240.0, 480.0, 120.0, 36.0, 900.0];
    (0..sections)
        .map(|s| {
            SectionHeights::new(
                (0..items)
                    .map(|i| sizes[(s * 7 + i) % sizes.len()])
                    .collect(),
            )
        })
        .collect()
}

/// Benchmark encode and decode at various sizes.
fn bench_codec(c: &mut Criterion) {
    let codec = DocumentCodec::default();
    let mut group = c.benchmark_group("codec");

    for paragraphs in [10, 100, 500].iter() {
        let tree = create_test_tree(*paragraphs);
        let items = codec.encode(&tree);

        group.bench_function(format!("encode_{}_paragraphs", paragraphs), |b| {
            b.iter(|| codec.encode(black_box(&tree)));
        });
        group.bench_function(format!("decode_{}_paragraphs", paragraphs), |b| {
            b.iter(|| codec.decode(black_box(&items)));
        });
    }

    group.finish();
}

/// Benchmark pagination at various sizes.
fn bench_pagination(c: &mut Criterion) {
    let paginator = Paginator::new(PaginationOptions::a4());
    let mut group = c.benchmark_group("pagination");

    for (sections, items) in [(5, 10), (20, 50), (50, 200)].iter() {
        let heights = create_test_heights(*sections, *items);
        group.bench_function(format!("{}x{}_items", sections, items), |b| {
            b.iter(|| paginator.paginate(black_box(&heights)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_pagination);
criterion_main!(benches);
