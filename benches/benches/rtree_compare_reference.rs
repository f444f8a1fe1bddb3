// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use arbor_index::{Config, LinearIndex, RTree, SpatialIndex};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::{Point, Rect};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, extent: f64, max_size: f64) -> Vec<(Rect, u32)> {
    let mut rng = Rng::new(0x51f0_37a9);
    let mut out = Vec::with_capacity(count);
    for id in 0..count {
        let x0 = rng.next_f64() * extent;
        let y0 = rng.next_f64() * extent;
        let w = rng.next_f64() * max_size;
        let h = rng.next_f64() * max_size;
        out.push((Rect::new(x0, y0, x0 + w, y0 + h), id as u32));
    }
    out
}

fn gen_query_rects(count: usize, extent: f64, size: f64) -> Vec<Rect> {
    let mut rng = Rng::new(0x0b5e_55ed);
    (0..count)
        .map(|_| {
            let x0 = rng.next_f64() * extent;
            let y0 = rng.next_f64() * extent;
            Rect::new(x0, y0, x0 + size, y0 + size)
        })
        .collect()
}

fn small_tree() -> RTree {
    RTree::new(Config {
        max_entries: 8,
        min_entries: 4,
        ..Default::default()
    })
}

fn count_intersecting(index: &mut dyn SpatialIndex, queries: &[Rect]) -> usize {
    let mut total = 0;
    for q in queries {
        index.intersects(*q, &mut |_| total += 1);
    }
    total
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[1_000usize, 10_000] {
        let rects = gen_random_rects(n, 1_000.0, 10.0);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_function(format!("rtree_{n}"), |b| {
            b.iter_batched(
                || rects.clone(),
                |rects| {
                    let mut tree = small_tree();
                    for (r, id) in rects {
                        tree.add(r, id);
                    }
                    black_box(tree.size())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_query_intersects(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_intersects");
    for &n in &[1_000usize, 10_000] {
        let rects = gen_random_rects(n, 1_000.0, 10.0);
        let queries = gen_query_rects(100, 1_000.0, 50.0);

        let mut tree = small_tree();
        let mut linear = LinearIndex::new();
        for &(r, id) in &rects {
            tree.add(r, id);
            linear.add(r, id);
        }

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_function(format!("rtree_{n}"), |b| {
            b.iter(|| black_box(count_intersecting(&mut tree, &queries)));
        });
        group.bench_function(format!("linear_{n}"), |b| {
            b.iter(|| black_box(count_intersecting(&mut linear, &queries)));
        });
    }
    group.finish();
}

fn bench_nearest(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest");
    for &n in &[1_000usize, 10_000] {
        let rects = gen_random_rects(n, 1_000.0, 10.0);
        let mut points = Rng::new(0xdead_beef);
        let queries: Vec<Point> = (0..100)
            .map(|_| Point::new(points.next_f64() * 1_000.0, points.next_f64() * 1_000.0))
            .collect();

        let mut tree = small_tree();
        let mut linear = LinearIndex::new();
        for &(r, id) in &rects {
            tree.add(r, id);
            linear.add(r, id);
        }

        group.throughput(Throughput::Elements(queries.len() as u64));
        group.bench_function(format!("rtree_{n}"), |b| {
            b.iter(|| {
                let mut found = 0;
                for p in &queries {
                    tree.nearest(*p, |_| found += 1, f64::INFINITY);
                }
                black_box(found)
            });
        });
        group.bench_function(format!("linear_{n}"), |b| {
            b.iter(|| {
                let mut found = 0;
                for p in &queries {
                    linear.nearest(*p, &mut |_| found += 1, f64::INFINITY);
                }
                black_box(found)
            });
        });
    }
    group.finish();
}

fn bench_delete_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete");
    let n = 1_000usize;
    let rects = gen_random_rects(n, 1_000.0, 10.0);
    group.throughput(Throughput::Elements(n as u64));
    group.bench_function(format!("rtree_{n}"), |b| {
        b.iter_batched(
            || {
                let mut tree = small_tree();
                for &(r, id) in &rects {
                    tree.add(r, id);
                }
                tree
            },
            |mut tree| {
                for &(r, id) in &rects {
                    assert!(tree.delete(r, id), "benchmark data must be present");
                }
                black_box(tree.size())
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_query_intersects,
    bench_nearest,
    bench_delete_rebuild
);
criterion_main!(benches);
