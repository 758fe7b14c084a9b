//! Access layer benchmarks for TurBytes
//!
//! Compares the same primitive and bulk operations across handle types, and
//! measures chunk swapping on a mapped cursor.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box as hint_black_box;
use tempfile::tempdir;
use turbytes::bytes::{HeapBytes, NativeBytes, StreamingInput, StreamingOutput};
use turbytes::mapped::MappedFile;
use turbytes::store::{HeapStore, NativeStore};

const STORE_SIZE: usize = 64 * 1024;

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_i64");

    let heap = HeapStore::allocate(STORE_SIZE).unwrap();
    let native = NativeStore::allocate(STORE_SIZE).unwrap();

    group.bench_function("heap_write_read", |b| {
        b.iter(|| {
            for offset in (0..1024).step_by(8) {
                heap.write_i64(offset, black_box(offset as i64)).unwrap();
                hint_black_box(heap.read_i64(offset).unwrap());
            }
        });
    });

    group.bench_function("native_write_read", |b| {
        b.iter(|| {
            for offset in (0..1024).step_by(8) {
                native.write_i64(offset, black_box(offset as i64)).unwrap();
                hint_black_box(native.read_i64(offset).unwrap());
            }
        });
    });

    group.bench_function("native_get_and_add", |b| {
        b.iter(|| hint_black_box(native.get_and_add_i64(0, black_box(1)).unwrap()));
    });

    group.finish();
}

fn bench_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk");

    for len in [15usize, 256, 4096] {
        group.throughput(Throughput::Bytes(len as u64));

        let heap = HeapStore::allocate(STORE_SIZE).unwrap();
        let native = NativeStore::allocate(STORE_SIZE).unwrap();

        group.bench_with_input(BenchmarkId::new("copy_heap_to_native", len), &len, |b, &len| {
            b.iter(|| heap.copy_to(0, &native, 0, black_box(len)).unwrap());
        });

        group.bench_with_input(BenchmarkId::new("range_equals", len), &len, |b, &len| {
            b.iter(|| hint_black_box(native.range_equals(0, &heap, 0, black_box(len)).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("fill", len), &len, |b, &len| {
            b.iter(|| native.fill(0, black_box(len), 0x5A).unwrap());
        });
    }

    group.finish();
}

fn bench_cursors(c: &mut Criterion) {
    let mut group = c.benchmark_group("cursor_sequential_i64");
    group.throughput(Throughput::Bytes(STORE_SIZE as u64));

    group.bench_function("heap", |b| {
        let mut bytes = HeapBytes::allocate(STORE_SIZE).unwrap();
        b.iter(|| {
            bytes.clear();
            while bytes.remaining() >= 8 {
                bytes.write_i64(black_box(7)).unwrap();
            }
            bytes.flip();
            while bytes.remaining() >= 8 {
                hint_black_box(bytes.read_i64().unwrap());
            }
        });
    });

    group.bench_function("native", |b| {
        let mut bytes = NativeBytes::allocate(STORE_SIZE).unwrap();
        b.iter(|| {
            bytes.clear();
            while bytes.remaining() >= 8 {
                bytes.write_i64(black_box(7)).unwrap();
            }
            bytes.flip();
            while bytes.remaining() >= 8 {
                hint_black_box(bytes.read_i64().unwrap());
            }
        });
    });

    let dir = tempdir().unwrap();
    let file = MappedFile::open(dir.path().join("bench.dat"), 16 * 1024).unwrap();

    group.bench_function("mapped_across_chunks", |b| {
        let mut bytes = file.bytes().unwrap();
        b.iter(|| {
            bytes.clear();
            for _ in 0..STORE_SIZE / 8 {
                bytes.write_i64(black_box(7)).unwrap();
            }
            bytes.flip();
            for _ in 0..STORE_SIZE / 8 {
                hint_black_box(bytes.read_i64().unwrap());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_bulk, bench_cursors);

criterion_main!(benches);
