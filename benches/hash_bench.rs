use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use learned_hashing::{
    ChtHash, MonotoneRmiHash, PgmHash, RadixSplineHash, RmiHash, TrieSplineHash,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stats_alloc::{INSTRUMENTED_SYSTEM, Region, StatsAlloc};
use std::alloc::System;

#[global_allocator]
static GLOBAL: &StatsAlloc<System> = &INSTRUMENTED_SYSTEM;

fn generate_uniform_data(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data: Vec<u64> = (0..n).map(|_| rng.r#gen()).collect();
    data.sort();
    data.dedup();
    data
}

fn generate_dense_data(n: usize) -> Vec<u64> {
    (0..n as u64).collect()
}

fn generate_queries(data: &[u64], num_queries: usize, seed: u64) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let min_key = data.first().copied().unwrap_or(0);
    let max_key = data.last().copied().unwrap_or(u64::MAX);
    (0..num_queries)
        .map(|_| rng.gen_range(min_key..=max_key))
        .collect()
}

fn report_model_sizes(data: &[u64]) {
    let region = Region::new(GLOBAL);
    let rmi = RmiHash::new(data, data.len(), 10_000);
    let stats = region.change();
    println!(
        "{:>28}: {:>10} model bytes, {:>10} allocated",
        rmi.name(),
        rmi.byte_size(),
        stats.bytes_allocated
    );

    let region = Region::new(GLOBAL);
    let rs = RadixSplineHash::new(data, data.len());
    let stats = region.change();
    println!(
        "{:>28}: {:>10} model bytes, {:>10} allocated",
        rs.name(),
        rs.byte_size(),
        stats.bytes_allocated
    );

    let region = Region::new(GLOBAL);
    let pgm = PgmHash::new(data, data.len(), 64, 4).unwrap();
    let stats = region.change();
    println!(
        "{:>28}: {:>10} model bytes, {:>10} allocated",
        pgm.name(),
        pgm.byte_size(),
        stats.bytes_allocated
    );
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("construction");

    for &n in &[100_000usize, 1_000_000] {
        let data = generate_uniform_data(n, 42);
        group.throughput(Throughput::Elements(data.len() as u64));

        for &models in &[100usize, 10_000] {
            group.bench_with_input(
                BenchmarkId::new(format!("rmi_{}", models), n),
                &data,
                |b, data| {
                    b.iter(|| RmiHash::new(black_box(data), data.len(), models));
                },
            );
            group.bench_with_input(
                BenchmarkId::new(format!("monotone_rmi_{}", models), n),
                &data,
                |b, data| {
                    b.iter(|| MonotoneRmiHash::new(black_box(data), data.len(), models));
                },
            );
        }

        group.bench_with_input(BenchmarkId::new("radix_spline", n), &data, |b, data| {
            b.iter(|| RadixSplineHash::new(black_box(data), data.len()));
        });

        group.bench_with_input(BenchmarkId::new("cht", n), &data, |b, data| {
            b.iter(|| ChtHash::new(black_box(data), data.len()));
        });

        group.bench_with_input(BenchmarkId::new("trie_spline", n), &data, |b, data| {
            b.iter(|| TrieSplineHash::new(black_box(data), data.len()));
        });

        for &eps in &[16usize, 64, 256] {
            group.bench_with_input(
                BenchmarkId::new(format!("pgm_eps{}", eps), n),
                &(&data, eps),
                |b, (data, eps)| {
                    b.iter(|| PgmHash::new(black_box(*data), data.len(), *eps, 4).unwrap());
                },
            );
        }
    }

    group.finish();
}

fn bench_hash_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("hash");

    let n = 1_000_000usize;
    let num_queries = 10_000usize;

    for (tag, data) in [
        ("uniform", generate_uniform_data(n, 42)),
        ("dense", generate_dense_data(n)),
    ] {
        let queries = generate_queries(&data, num_queries, 7);
        group.throughput(Throughput::Elements(num_queries as u64));

        let rmi = RmiHash::new(&data, data.len(), 10_000);
        group.bench_with_input(BenchmarkId::new("rmi_10000", tag), &queries, |b, queries| {
            b.iter(|| {
                let mut acc = 0usize;
                for &q in queries {
                    acc = acc.wrapping_add(rmi.hash(black_box(q)));
                }
                acc
            });
        });

        let mono = MonotoneRmiHash::new(&data, data.len(), 10_000);
        group.bench_with_input(
            BenchmarkId::new("monotone_rmi_10000", tag),
            &queries,
            |b, queries| {
                b.iter(|| {
                    let mut acc = 0usize;
                    for &q in queries {
                        acc = acc.wrapping_add(mono.hash(black_box(q)));
                    }
                    acc
                });
            },
        );

        let rs = RadixSplineHash::new(&data, data.len());
        group.bench_with_input(BenchmarkId::new("radix_spline", tag), &queries, |b, queries| {
            b.iter(|| {
                let mut acc = 0usize;
                for &q in queries {
                    acc = acc.wrapping_add(rs.hash(black_box(q)));
                }
                acc
            });
        });

        let cht = ChtHash::new(&data, data.len());
        group.bench_with_input(BenchmarkId::new("cht", tag), &queries, |b, queries| {
            b.iter(|| {
                let mut acc = 0usize;
                for &q in queries {
                    acc = acc.wrapping_add(cht.hash(black_box(q)));
                }
                acc
            });
        });

        let ts = TrieSplineHash::new(&data, data.len());
        group.bench_with_input(BenchmarkId::new("trie_spline", tag), &queries, |b, queries| {
            b.iter(|| {
                let mut acc = 0usize;
                for &q in queries {
                    acc = acc.wrapping_add(ts.hash(black_box(q)));
                }
                acc
            });
        });

        let pgm = PgmHash::new(&data, data.len(), 64, 4).unwrap();
        group.bench_with_input(BenchmarkId::new("pgm_eps64", tag), &queries, |b, queries| {
            b.iter(|| {
                let mut acc = 0usize;
                for &q in queries {
                    acc = acc.wrapping_add(pgm.hash(black_box(q)));
                }
                acc
            });
        });
    }

    group.finish();
}

fn bench_memory_report(c: &mut Criterion) {
    let data = generate_uniform_data(1_000_000, 42);
    report_model_sizes(&data);

    // Keep criterion happy with a trivial measurement so the report always runs.
    c.bench_function("noop", |b| b.iter(|| black_box(0u64)));
}

criterion_group!(
    benches,
    bench_construction,
    bench_hash_throughput,
    bench_memory_report
);
criterion_main!(benches);
