// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle operations the tree needs beyond what Kurbo provides.
//!
//! Boxes are plain [`kurbo::Rect`] values. An "unset" box (one with no
//! content yet) is represented by [`EMPTY`]; union with it yields the other
//! operand, and every overlap test against it is false.

use kurbo::{Point, Rect};

/// The unset rectangle: greater than any coordinate on its low edges, smaller
/// on its high edges.
pub const EMPTY: Rect = Rect::new(
    f64::INFINITY,
    f64::INFINITY,
    f64::NEG_INFINITY,
    f64::NEG_INFINITY,
);

/// Whether `r` is unset (inverted on either axis).
pub fn is_empty(r: &Rect) -> bool {
    r.x1 < r.x0 || r.y1 < r.y0
}

/// Grow `dst` in place to cover `src`.
pub fn expand_to_include(dst: &mut Rect, src: &Rect) {
    *dst = dst.union(*src);
}

/// Area `r` would gain if grown to cover `add`. Neither rectangle is altered.
pub fn enlargement(r: &Rect, add: &Rect) -> f64 {
    r.union(*add).area() - r.area()
}

/// Whether `b` reaches the boundary of `a`.
///
/// Used after a removal to decide if cached bounds could have shrunk: a box
/// strictly inside `a` cannot have determined any of its four edges, so the
/// O(capacity) recomputation can be skipped.
pub fn edge_overlaps(a: &Rect, b: &Rect) -> bool {
    a.x0 == b.x0 || a.x1 == b.x1 || a.y0 == b.y0 || a.y1 == b.y1
}

/// Squared minimum distance from `p` to `r`; zero when `p` is inside.
///
/// Squared distances order the same way as true distances, which is all the
/// nearest-neighbor search compares, and they need no `sqrt` in `no_std`.
pub fn distance_sq(r: &Rect, p: Point) -> f64 {
    let dx = (r.x0 - p.x).max(p.x - r.x1).max(0.0);
    let dy = (r.y0 - p.y).max(p.y - r.y1).max(0.0);
    dx * dx + dy * dy
}
