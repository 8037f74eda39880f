use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use progresscoord::domain::{FilterId, Rank};
use progresscoord::progress::ProgressLedger;

fn filled_ledger(filters: i32, ranks: usize) -> ProgressLedger {
    let mut ledger = ProgressLedger::with_ranks(ranks);
    for filter in 0..filters {
        for rank in 0..ranks {
            let percent = ((filter as usize * 31 + rank * 17) % 101) as u8;
            ledger.record_local(FilterId(filter), Rank(rank), percent);
        }
    }
    ledger
}

fn bench_min_progress(c: &mut Criterion) {
    let mut group = c.benchmark_group("min_progress");
    for (filters, ranks) in [(8, 4), (32, 64), (128, 256)] {
        let ledger = filled_ledger(filters, ranks);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", filters, ranks)),
            &ledger,
            |b, ledger| b.iter(|| black_box(ledger.min_progress())),
        );
    }
    group.finish();
}

fn bench_record_and_reset(c: &mut Criterion) {
    c.bench_function("record_then_reset_64_ranks", |b| {
        let mut ledger = filled_ledger(16, 64);
        b.iter(|| {
            ledger.reset();
            for rank in 0..64 {
                ledger.record_local(FilterId(3), Rank(rank), black_box(42));
            }
        })
    });
}

criterion_group!(benches, bench_min_progress, bench_record_and_reset);
criterion_main!(benches);
