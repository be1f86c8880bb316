use criterion::{black_box, criterion_group, criterion_main, Criterion};

use gradebook_core::class_average::compute_class_average;
use gradebook_core::model::{AveragingMode, Class, EvaluationItem, Grade, Unit};
use gradebook_core::unit_average::compute_unit_average;

fn make_unit(mode: AveragingMode, formula: Option<&str>, items: usize) -> (Unit, Vec<EvaluationItem>) {
    let unit = Unit {
        id: "u1".into(),
        class_id: "c1".into(),
        name: "Unit 1".into(),
        averaging_mode: mode,
        formula: formula.map(String::from),
    };
    let items = (1..=items)
        .map(|i| EvaluationItem {
            id: format!("i{i}"),
            unit_id: "u1".into(),
            name: format!("Test {i}"),
        })
        .collect();
    (unit, items)
}

fn make_grades(items: &[EvaluationItem]) -> Vec<Grade> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 4 != 3)
        .map(|(i, item)| Grade {
            student_id: "s1".into(),
            evaluation_item_id: item.id.clone(),
            value: (i % 11) as f64,
            comment: None,
        })
        .collect()
}

fn bench_unit_average(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_average");

    let (simple, items) = make_unit(AveragingMode::Simple, None, 20);
    let grades = make_grades(&items);
    group.bench_function("simple_20_items", |b| {
        b.iter(|| compute_unit_average("s1", black_box(&simple), &items, &grades))
    });

    let formula = (1..=20)
        .map(|i| format!("N{i} * 0.05"))
        .collect::<Vec<_>>()
        .join(" + ");
    let (personalized, items) = make_unit(AveragingMode::Personalized, Some(&formula), 20);
    group.bench_function("personalized_20_items", |b| {
        b.iter(|| compute_unit_average("s1", black_box(&personalized), &items, &grades))
    });

    group.finish();
}

fn bench_class_average(c: &mut Criterion) {
    let (unit, items) = make_unit(AveragingMode::Simple, None, 6);
    let grades = make_grades(&items);
    let unit_result = compute_unit_average("s1", &unit, &items, &grades).unwrap();
    let class = Class {
        id: "c1".into(),
        name: "Math".into(),
        teacher_id: "t1".into(),
        averaging_mode: AveragingMode::Personalized,
        formula: Some("(u1 + u2) * 0.3 + (u3 + u4) * 0.2".into()),
    };

    c.bench_function("class_average_personalized", |b| {
        b.iter(|| {
            compute_class_average("s1", black_box(&class), vec![unit_result.clone(); 4])
        })
    });
}

criterion_group!(benches, bench_unit_average, bench_class_average);
criterion_main!(benches);
