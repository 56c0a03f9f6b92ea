//! Benchmark suite for the IP lookup engine.
//!
//! Covers the core `Reader` path: exact-match lookup, path resolution
//! into a nested record, and a full-record walk.
//!
//! Run: cargo bench --bench lookup_bench

#[path = "../tests/support/builder.rs"]
mod builder;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use builder::{map_val, str_val, uint32_val, DatabaseBuilder};
use mmdb::mmdb::PathStep;
use mmdb::Reader;

fn build_benchmark_database(network_count: usize) -> Vec<u8> {
    let mut builder = DatabaseBuilder::new(4);
    for i in 0..network_count {
        let octet2 = (i / 256) % 256;
        let octet3 = i % 256;
        let network = format!("10.{octet2}.{octet3}.0/24");
        builder.insert(
            &network,
            map_val(vec![
                ("country", map_val(vec![("iso_code", str_val("US"))])),
                ("asn", uint32_val(64512 + i as u32)),
            ]),
        );
    }
    builder.build()
}

fn bench_exact_match(c: &mut Criterion) {
    let image = build_benchmark_database(4096);
    let reader = Reader::from_buffer(image).unwrap();

    c.bench_function("lookup exact match", |b| {
        b.iter(|| reader.lookup_address(black_box("10.3.200.1")).unwrap())
    });
}

fn bench_path_resolution(c: &mut Criterion) {
    let image = build_benchmark_database(4096);
    let reader = Reader::from_buffer(image).unwrap();
    let path = [PathStep::key("country"), PathStep::key("iso_code")];

    c.bench_function("lookup + path resolve", |b| {
        b.iter(|| {
            reader
                .lookup_path(black_box("10.3.200.1"), &path)
                .unwrap()
        })
    });
}

fn bench_full_record_walk(c: &mut Criterion) {
    let image = build_benchmark_database(4096);
    let reader = Reader::from_buffer(image).unwrap();

    c.bench_function("lookup + walk full record", |b| {
        b.iter(|| reader.lookup_all(black_box("10.3.200.1")).unwrap())
    });
}

fn bench_miss(c: &mut Criterion) {
    let image = build_benchmark_database(4096);
    let reader = Reader::from_buffer(image).unwrap();

    c.bench_function("lookup miss (unassigned branch)", |b| {
        b.iter(|| reader.lookup_address(black_box("203.0.113.1")).unwrap())
    });
}

criterion_group!(
    benches,
    bench_exact_match,
    bench_path_resolution,
    bench_full_record_walk,
    bench_miss
);
criterion_main!(benches);
