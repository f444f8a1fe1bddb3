// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reference indexes used to cross-check the tree in tests and benches.
//!
//! These are deliberately independent implementations of [`SpatialIndex`],
//! not variants of the tree: a sequence of operations replayed against both
//! the tree and [`LinearIndex`] must produce the same result sets.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use kurbo::{Point, Rect};

use crate::geometry;
use crate::index::SpatialIndex;

/// Linear-scan index: every query walks the whole entry map.
///
/// Very slow past a few thousand entries, and intended only for generating
/// reference results. Adds and deletes, on the other hand, are cheap.
#[derive(Clone, Debug, Default)]
pub struct LinearIndex {
    entries: BTreeMap<u32, Rect>,
}

impl LinearIndex {
    /// Create an empty reference index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for LinearIndex {
    fn add(&mut self, rect: Rect, id: u32) {
        self.entries.insert(id, rect);
    }

    fn delete(&mut self, rect: Rect, id: u32) -> bool {
        if self.entries.get(&id) == Some(&rect) {
            self.entries.remove(&id);
            true
        } else {
            false
        }
    }

    fn intersects(&mut self, rect: Rect, visitor: &mut dyn FnMut(u32)) {
        for (&id, r) in &self.entries {
            if rect.overlaps(*r) {
                visitor(id);
            }
        }
    }

    fn contains(&mut self, rect: Rect, visitor: &mut dyn FnMut(u32)) {
        for (&id, r) in &self.entries {
            if rect.contains_rect(*r) {
                visitor(id);
            }
        }
    }

    fn nearest(&mut self, point: Point, visitor: &mut dyn FnMut(u32), max_distance: f64) {
        if max_distance < 0.0 {
            return;
        }
        let mut bound_sq = max_distance * max_distance;
        let mut nearest: Vec<u32> = Vec::new();
        for (&id, r) in &self.entries {
            let d = geometry::distance_sq(r, point);
            if d < bound_sq {
                bound_sq = d;
                nearest.clear();
            }
            if d <= bound_sq {
                nearest.push(id);
            }
        }
        for id in nearest {
            visitor(id);
        }
    }

    fn size(&self) -> usize {
        self.entries.len()
    }

    fn bounds(&self) -> Option<Rect> {
        let mut bounds = geometry::EMPTY;
        for r in self.entries.values() {
            geometry::expand_to_include(&mut bounds, r);
        }
        (!geometry::is_empty(&bounds)).then_some(bounds)
    }
}

/// Index that stores nothing and finds nothing.
///
/// A baseline for measuring replay-harness overhead.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIndex;

impl NullIndex {
    /// Create the index. All of them are the same.
    pub fn new() -> Self {
        Self
    }
}

impl SpatialIndex for NullIndex {
    fn add(&mut self, _rect: Rect, _id: u32) {}

    fn delete(&mut self, _rect: Rect, _id: u32) -> bool {
        false
    }

    fn intersects(&mut self, _rect: Rect, _visitor: &mut dyn FnMut(u32)) {}

    fn contains(&mut self, _rect: Rect, _visitor: &mut dyn FnMut(u32)) {}

    fn nearest(&mut self, _point: Point, _visitor: &mut dyn FnMut(u32), _max_distance: f64) {}

    fn size(&self) -> usize {
        0
    }

    fn bounds(&self) -> Option<Rect> {
        None
    }
}
