#[macro_use]
extern crate criterion;

use criterion::{black_box, Criterion};

use cyclex_core::prelude::*;

fn bench_statistics_sample(c: &mut Criterion) {
    c.bench_function("statistics_sample", |b| {
        let mut stats = StatisticsCollector::new(40_000_000);
        let mut now = Timestamp::ZERO;
        b.iter(|| {
            now = now.add_nanos(40_000_000);
            black_box(stats.sample(black_box(now)));
        });
    });
}

/// Full loop overhead per cycle on the virtual clock.
fn bench_virtual_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("virtual_cycles");
    for cycles in [1_000u64, 10_000] {
        group.throughput(criterion::Throughput::Elements(cycles));
        group.bench_function(format!("cycles_{}", cycles), |b| {
            b.iter(|| {
                let spec = CycleSpec::builder(40_000_000)
                    .subtask("work", 10_000_000, || {})
                    .build()
                    .unwrap();
                let mut scheduler =
                    CyclicScheduler::new(spec, VirtualClock::new(0), RunMode::Bounded(cycles))
                        .unwrap();
                black_box(scheduler.run().unwrap());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_statistics_sample, bench_virtual_cycles);
criterion_main!(benches);
