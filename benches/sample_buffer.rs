//! Criterion benchmarks for the sampling and detection hot paths.
//!
//! Key metrics:
//! - Append throughput (samples/sec) per channel and per frame
//! - Snapshot cost (swap + view registration on 8 channels)
//! - Detection pass latency for different smoothing windows
//! - Query latency (range query, interpolation) on a full buffer
//!
//! Run with: cargo bench --bench sample_buffer

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;
use touch_daq::data::sample_buffer::SampleBuffer;
use touch_daq::{ChannelStore, DetectorConfig, Sample, TouchDetector, CHANNEL_COUNT};

/// Append throughput at different capacities (eviction kicks in once full).
fn sample_buffer_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_buffer_append");
    group.throughput(Throughput::Elements(1));

    for capacity in [256usize, 2048, 16_384] {
        let buffer = SampleBuffer::new(capacity).unwrap();
        let mut t = 0.0;
        group.bench_with_input(BenchmarkId::new("append", capacity), &capacity, |b, _| {
            b.iter(|| {
                t += 0.001;
                buffer.append(black_box(Sample::new(t, 0.5))).unwrap();
            });
        });
    }

    group.finish();
}

/// Append cost when every append also replays a swapped-out backlog.
fn sample_buffer_append_after_swap(c: &mut Criterion) {
    let buffer = SampleBuffer::new(2048).unwrap();
    let mut t = 0.0;

    c.bench_function("sample_buffer_append_swap_every_64", |b| {
        b.iter(|| {
            for _ in 0..64 {
                t += 0.001;
                buffer.append(Sample::new(t, 0.5)).unwrap();
            }
            black_box(buffer.swap());
        });
    });
}

/// Full 8-channel frame ingest.
fn channel_store_append_frame(c: &mut Criterion) {
    let store = ChannelStore::new(2048).unwrap();
    let frame = [0.1, 0.2, 0.9, 0.8, 0.1, 0.1, 0.3, 0.1];
    let mut t = 0.0;

    let mut group = c.benchmark_group("channel_store");
    group.throughput(Throughput::Elements(CHANNEL_COUNT as u64));
    group.bench_function("append_frame", |b| {
        b.iter(|| {
            t += 0.001;
            black_box(store.append_frame(t, black_box(&frame)));
        });
    });
    group.finish();
}

/// Snapshot with fresh data on every channel.
fn channel_store_snapshot(c: &mut Criterion) {
    let store = ChannelStore::new(2048).unwrap();
    let mut t = 0.0;

    c.bench_function("channel_store_snapshot", |b| {
        b.iter(|| {
            t += 0.001;
            store.append_frame(t, &[0.2; CHANNEL_COUNT]);
            let snapshot = store.snapshot();
            black_box(snapshot.has_data());
        });
    });
}

/// Detection pass latency as the smoothing window grows.
fn touch_detector_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("touch_detector");

    let store = ChannelStore::new(4096).unwrap();
    for i in 0..4096 {
        let t = i as f64 * 0.001;
        let phase = (i % 100) as f64 / 100.0;
        store.append_frame(t, &[0.1, phase, 0.9, 0.85, 0.1, phase, 0.7, 0.1]);
    }
    let snapshot = store.snapshot();

    for window in [1usize, 16, 256] {
        let detector =
            TouchDetector::new(DetectorConfig::default().with_smoothing_window(window).unwrap());
        group.bench_with_input(BenchmarkId::new("detect", window), &window, |b, _| {
            b.iter(|| black_box(detector.detect(&snapshot)));
        });
    }

    group.finish();
}

/// Range query and interpolation on a full buffer.
fn sample_buffer_queries(c: &mut Criterion) {
    let buffer = SampleBuffer::new(16_384).unwrap();
    for i in 0..16_384 {
        buffer.append(Sample::new(i as f64, (i % 7) as f64)).unwrap();
    }
    buffer.swap();
    let view = buffer.view();

    c.bench_function("standby_range_query_1k", |b| {
        b.iter(|| black_box(view.range_query(black_box(5_000.0), black_box(6_000.0))));
    });

    c.bench_function("standby_interpolate_at", |b| {
        b.iter(|| black_box(view.interpolate_at(black_box(8_192.5))));
    });
}

/// Producer and consumer threads running against one store.
fn concurrent_ingest_and_detect(c: &mut Criterion) {
    let store = Arc::new(ChannelStore::new(2048).unwrap());
    let detector = Arc::new(TouchDetector::default());

    c.bench_function("concurrent_ingest_1k_frames", |b| {
        let mut base = 0.0;
        b.iter(|| {
            let writer_store = Arc::clone(&store);
            let start = base;
            let writer = thread::spawn(move || {
                for i in 0..1_000 {
                    writer_store.append_frame(start + i as f64 * 0.001, &[0.6; CHANNEL_COUNT]);
                }
            });

            for _ in 0..50 {
                black_box(detector.detect(&store.snapshot()));
            }
            writer.join().unwrap();
            base += 1.0;
        });
    });
}

criterion_group!(
    benches,
    sample_buffer_append,
    sample_buffer_append_after_swap,
    channel_store_append_frame,
    channel_store_snapshot,
    touch_detector_detect,
    sample_buffer_queries,
    concurrent_ingest_and_detect
);
criterion_main!(benches);
