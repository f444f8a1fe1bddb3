// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Basic usage of Arbor Index: insert, query three ways, delete.

use arbor_index::{Config, RTree};
use kurbo::{Point, Rect};

fn main() {
    let mut tree = RTree::new(Config {
        max_entries: 4,
        min_entries: 2,
        ..Default::default()
    });

    for i in 0..12u32 {
        let x = f64::from(i % 4) * 10.0;
        let y = f64::from(i / 4) * 10.0;
        tree.add(Rect::new(x, y, x + 6.0, y + 6.0), i);
    }
    println!("tree: {tree:?}");
    println!("bounds: {:?}", tree.bounds());

    let viewport = Rect::new(5.0, 5.0, 20.0, 20.0);
    let mut visible = Vec::new();
    tree.intersects(viewport, |id| visible.push(id));
    visible.sort();
    println!("intersecting {viewport:?}: {visible:?}");

    let mut inside = Vec::new();
    tree.contains(Rect::new(-1.0, -1.0, 17.0, 17.0), |id| inside.push(id));
    inside.sort();
    println!("contained by (-1,-1)-(17,17): {inside:?}");

    let mut nearest = Vec::new();
    tree.nearest(Point::new(25.0, 25.0), |id| nearest.push(id), f64::INFINITY);
    println!("nearest to (25,25): {nearest:?}");

    let removed = tree.delete(Rect::new(0.0, 0.0, 6.0, 6.0), 0);
    println!("deleted box 0: {removed}, size now {}", tree.size());
}
