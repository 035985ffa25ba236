//! Performance benchmarks for tally-engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tally_engine::{
    merge_records, ConflictDetector, InventoryEntry, ProgressRecord, Resolve, ResolutionStrategy,
};

const T: u64 = 1_706_745_600_000;

fn create_record(items: usize, offset: u64) -> ProgressRecord {
    let mut record = ProgressRecord::new(T);
    record.score = 1000 + offset;
    record.level = 10;
    record.xp = 5000 + offset;
    record.coins = 300;
    record.last_modified = T + offset;
    record.inventory = (0..items)
        .map(|i| {
            InventoryEntry::new(
                format!("item_{}", i),
                "Item",
                (i % 8) as u32,
                (i as u32 % 5) + 1 + offset as u32 % 3,
                T + i as u64,
            )
        })
        .collect();
    record.unlocked_areas = (0..(items as u32 / 4)).collect();
    record.achievements = (0..(items / 4)).map(|i| format!("ach_{}", i)).collect();
    record
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");
    let detector = ConflictDetector::default();

    for size in [10, 100, 1000] {
        let local = create_record(size, 0);
        let server = create_record(size, 2000);

        group.bench_with_input(BenchmarkId::new("detect", size), &size, |b, _| {
            b.iter(|| detector.detect(black_box(&local), black_box(&server)))
        });
    }

    // Within threshold short-circuits before comparing content
    let local = create_record(1000, 0);
    let server = create_record(1000, 500);
    group.bench_function("detect_within_threshold", |b| {
        b.iter(|| detector.detect(black_box(&local), black_box(&server)))
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    for size in [10, 100, 1000] {
        let local = create_record(size, 0);
        let server = create_record(size, 2000);

        group.bench_with_input(BenchmarkId::new("merge", size), &size, |b, _| {
            b.iter(|| merge_records(black_box(&local), black_box(&server)))
        });
    }

    let local = create_record(100, 0);
    let server = create_record(100, 2000);
    for strategy in ResolutionStrategy::ALL {
        group.bench_function(BenchmarkId::new("resolve", strategy.as_str()), |b| {
            b.iter(|| strategy.resolve(black_box(&local), black_box(&server)))
        });
    }

    group.finish();
}

fn bench_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialization");
    let record = create_record(500, 0);
    let json = record.to_json().unwrap();

    group.bench_function("record_to_json", |b| {
        b.iter(|| black_box(&record).to_json())
    });

    group.bench_function("record_from_json", |b| {
        b.iter(|| ProgressRecord::from_json(black_box(&json)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_detection,
    bench_resolution,
    bench_serialization
);
criterion_main!(benches);
