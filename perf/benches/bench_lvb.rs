use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use lvb_core::{Lvb, RingConfig};
use lvb_perf::periodic::Sample;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

fn make_sample(step: u64) -> Sample {
    Sample { step, ts_ns: step }
}

fn bench_put_get(c: &mut Criterion) {
    let (mut writer, mut reader) = Lvb::<Sample>::new().split();

    let mut group = c.benchmark_group("lvb");
    group.throughput(Throughput::Elements(1));

    let mut step = 0;
    group.bench_function("put+get", |b| {
        b.iter(|| {
            step += 1;
            writer.put(black_box(make_sample(step)));
            black_box(reader.get_with_staleness());
        });
    });

    group.finish();
}

fn bench_stale_writer(c: &mut Criterion) {
    let (mut writer, _reader) = Lvb::<Sample>::new().split();
    // Fill the ring so every further advance is refused.
    while writer.put(make_sample(0)) == 0 {}

    let mut group = c.benchmark_group("lvb");
    group.throughput(Throughput::Elements(1));

    group.bench_function("writer_advance (full)", |b| {
        b.iter(|| black_box(writer.writer_advance()));
    });

    group.finish();
}

fn bench_reader_advance_empty(c: &mut Criterion) {
    let (_writer, mut reader) = Lvb::<Sample>::new().split();

    let mut group = c.benchmark_group("lvb");
    group.throughput(Throughput::Elements(1));

    group.bench_function("reader_advance (empty)", |b| {
        b.iter(|| black_box(reader.reader_advance()));
    });

    group.finish();
}

fn bench_reader_advance_latest(c: &mut Criterion) {
    let (mut writer, mut reader) = Lvb::<Sample>::with_config(RingConfig::new(16)).split();

    let mut group = c.benchmark_group("lvb");
    group.throughput(Throughput::Elements(1));

    group.bench_function("reader_advance_latest (8 pending)", |b| {
        b.iter_custom(|iters| {
            let mut total = std::time::Duration::ZERO;
            for i in 0..iters {
                for k in 0..8 {
                    writer.put(make_sample(i * 8 + k));
                }
                let start = Instant::now();
                black_box(reader.reader_advance_latest());
                total += start.elapsed();
            }
            total
        });
    });

    group.finish();
}

fn bench_round_trip_slack(c: &mut Criterion) {
    let mut group = c.benchmark_group("lvb_slack");
    group.throughput(Throughput::Elements(1));

    for &slack in &[1usize, 4, 16, 64] {
        let (mut writer, mut reader) = Lvb::<Sample>::with_config(RingConfig::new(slack)).split();
        let mut step = 0;

        group.bench_function(format!("round_trip_slack_{slack}"), |b| {
            b.iter(|| {
                step += 1;
                writer.put(black_box(make_sample(step)));
                black_box(reader.reader_advance());
                black_box(*reader.reading());
            });
        });
    }

    group.finish();
}

fn bench_cross_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("lvb_cross_thread");
    group.throughput(Throughput::Elements(1));

    for &slack in &[1usize, 16] {
        group.bench_function(format!("put_under_reader_slack_{slack}"), |b| {
            b.iter_custom(|iters| {
                let (mut writer, mut reader) =
                    Lvb::<Sample>::with_config(RingConfig::new(slack)).split();
                let done = AtomicBool::new(false);

                thread::scope(|s| {
                    s.spawn(|| {
                        while !done.load(Ordering::Relaxed) {
                            black_box(reader.reader_advance_latest());
                        }
                    });

                    let start = Instant::now();
                    for i in 0..iters {
                        black_box(writer.put(make_sample(i)));
                    }
                    let elapsed = start.elapsed();
                    done.store(true, Ordering::Relaxed);
                    elapsed
                })
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_put_get,
    bench_stale_writer,
    bench_reader_advance_empty,
    bench_reader_advance_latest,
    bench_round_trip_slack,
    bench_cross_thread,
);
criterion_main!(benches);
