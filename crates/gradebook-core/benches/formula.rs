use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gradebook_core::binding::bind_items;
use gradebook_core::formula::Formula;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("formula_parse");

    let weighted = "N1 * 0.4 + N2 * 0.6";
    let nested = "((test_1 + test_2) / 2) * 0.7 + (lab - -1) * 0.3";
    let long = (1..=40)
        .map(|i| format!("N{i} * 0.025"))
        .collect::<Vec<_>>()
        .join(" + ");

    group.bench_function("weighted", |b| {
        b.iter(|| Formula::parse(black_box(weighted)))
    });
    group.bench_function("nested", |b| b.iter(|| Formula::parse(black_box(nested))));
    group.bench_function("forty_terms", |b| {
        b.iter(|| Formula::parse(black_box(&long)))
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("formula_evaluate");

    let names: Vec<String> = (1..=40).map(|i| format!("Item {i}")).collect();
    let bindings = bind_items(
        names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), Some((i % 10) as f64))),
    );
    let formula = Formula::parse(
        &(1..=40)
            .map(|i| format!("item_{i} * 0.025"))
            .collect::<Vec<_>>()
            .join(" + "),
    )
    .unwrap();

    group.bench_function("forty_terms", |b| {
        b.iter(|| formula.evaluate(black_box(&bindings)))
    });
    group.bench_function("bind_forty_items", |b| {
        b.iter(|| {
            bind_items(
                names
                    .iter()
                    .map(|n| (black_box(n.as_str()), Some(7.5))),
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_parse, bench_evaluate);
criterion_main!(benches);
