// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Replays randomized operation sequences against the tree and the
//! linear-scan reference index and compares every result set.

use arbor_index::{Config, LinearIndex, RTree, SpatialIndex};
use kurbo::{Point, Rect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_rect(rng: &mut StdRng) -> Rect {
    let x0 = rng.random_range(0.0..100.0);
    let y0 = rng.random_range(0.0..100.0);
    let w = rng.random_range(0.1..8.0);
    let h = rng.random_range(0.1..8.0);
    Rect::new(x0, y0, x0 + w, y0 + h)
}

fn collect_intersects(index: &mut dyn SpatialIndex, query: Rect) -> Vec<u32> {
    let mut out = Vec::new();
    index.intersects(query, &mut |id| out.push(id));
    out.sort_unstable();
    out
}

fn collect_contains(index: &mut dyn SpatialIndex, query: Rect) -> Vec<u32> {
    let mut out = Vec::new();
    index.contains(query, &mut |id| out.push(id));
    out.sort_unstable();
    out
}

fn collect_nearest(index: &mut dyn SpatialIndex, point: Point, max_distance: f64) -> Vec<u32> {
    let mut out = Vec::new();
    index.nearest(point, &mut |id| out.push(id), max_distance);
    out.sort_unstable();
    out
}

#[test]
fn randomized_operations_match_the_linear_reference() {
    for seed in 0..4u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut tree = RTree::new(Config {
            max_entries: 4,
            min_entries: 2,
            ..Default::default()
        });
        let mut reference = LinearIndex::new();
        let mut live: Vec<(Rect, u32)> = Vec::new();
        let mut next_id = 0u32;

        for _round in 0..30 {
            for _ in 0..12 {
                let delete = !live.is_empty() && rng.random_range(0..100) < 40;
                if delete {
                    let at = rng.random_range(0..live.len());
                    let (rect, id) = live.swap_remove(at);
                    assert!(tree.delete(rect, id));
                    assert!(reference.delete(rect, id));
                } else {
                    let rect = random_rect(&mut rng);
                    tree.add(rect, next_id);
                    reference.add(rect, next_id);
                    live.push((rect, next_id));
                    next_id += 1;
                }
            }

            tree.check_consistency()
                .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
            assert_eq!(tree.size(), reference.size());
            assert_eq!(tree.bounds(), reference.bounds());

            for _ in 0..8 {
                let pad = rng.random_range(0.0..12.0);
                let query = random_rect(&mut rng).inflate(pad, pad);
                assert_eq!(
                    collect_intersects(&mut tree, query),
                    collect_intersects(&mut reference, query),
                    "intersects diverged for seed {seed}, query {query:?}"
                );
                assert_eq!(
                    collect_contains(&mut tree, query),
                    collect_contains(&mut reference, query),
                    "contains diverged for seed {seed}, query {query:?}"
                );
            }

            for _ in 0..8 {
                let point = Point::new(
                    rng.random_range(-20.0..120.0),
                    rng.random_range(-20.0..120.0),
                );
                let max_distance = match rng.random_range(0..3) {
                    0 => f64::INFINITY,
                    1 => 10.0,
                    _ => 0.5,
                };
                assert_eq!(
                    collect_nearest(&mut tree, point, max_distance),
                    collect_nearest(&mut reference, point, max_distance),
                    "nearest diverged for seed {seed}, point {point:?}, max {max_distance}"
                );
            }
        }
    }
}

#[test]
fn draining_every_entry_matches_the_reference() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut tree = RTree::new(Config {
        max_entries: 4,
        min_entries: 2,
        ..Default::default()
    });
    let mut reference = LinearIndex::new();
    let mut live: Vec<(Rect, u32)> = Vec::new();

    for id in 0..150u32 {
        let rect = random_rect(&mut rng);
        tree.add(rect, id);
        reference.add(rect, id);
        live.push((rect, id));
    }

    let everything = Rect::new(-1000.0, -1000.0, 1000.0, 1000.0);
    while let Some(at) = (!live.is_empty()).then(|| rng.random_range(0..live.len())) {
        let (rect, id) = live.swap_remove(at);
        assert!(tree.delete(rect, id));
        assert!(reference.delete(rect, id));
        tree.check_consistency().unwrap();
        assert_eq!(
            collect_intersects(&mut tree, everything),
            collect_intersects(&mut reference, everything)
        );
    }

    assert_eq!(tree.size(), 0);
    assert_eq!(tree.bounds(), None);
}
