//! Benchmarks the First Bytes send/recv round-trip at a few payload sizes,
//! mirroring the teacher's `benches/*.rs` + `criterion` convention.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::io::Cursor;
use taskit_core::Frame;

fn roundtrip(frame: &Frame, payload: &[u8]) -> Vec<u8> {
    let mut wire = Vec::new();
    frame.send(&mut wire, payload).unwrap();
    frame.recv(&mut Cursor::new(wire)).unwrap()
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing_roundtrip");
    let frame = Frame::new(2048);

    for size in [64usize, 2048, 16_384, 65_536] {
        let payload = vec![b'x'; size];
        group.bench_with_input(BenchmarkId::from_parameter(size), &payload, |b, payload| {
            b.iter(|| black_box(roundtrip(&frame, payload)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_framing);
criterion_main!(benches);
