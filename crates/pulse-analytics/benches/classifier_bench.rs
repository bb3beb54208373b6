//! Stage classifier benchmark.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pulse_analytics::revenue::classifier::classify_stage;
use pulse_analytics::revenue::normalize::normalize_stage;

fn bench_normalize(c: &mut Criterion) {
    let stages = [
        "C2:WON",
        "DT182_1:PREPARATION",
        "Closed - Lost",
        "Demo Scheduled!",
        "negotiation/review",
    ];
    c.bench_function("normalize_stage", |b| {
        b.iter(|| {
            for stage in &stages {
                black_box(normalize_stage(black_box(stage)));
            }
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let stages = [
        "C2:WON",
        "CLOSED LOST",
        "Qualified",
        "Proposal Sent",
        "DT182_1:PREPARATION",
    ];
    c.bench_function("classify_stage", |b| {
        b.iter(|| {
            for stage in &stages {
                black_box(classify_stage(black_box(stage), 10));
            }
        })
    });
}

criterion_group!(benches, bench_normalize, bench_classify);
criterion_main!(benches);
