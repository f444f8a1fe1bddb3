// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=arbor_index --heading-base-level=0

//! Arbor Index: a Kurbo-native 2D R-tree spatial index.
//!
//! Arbor Index answers region queries over axis-aligned bounding boxes
//! without a linear scan over the geometry.
//!
//! - Insert and delete [`kurbo::Rect`] boxes keyed by opaque caller ids.
//! - Query by intersection, containment, or nearest-neighbor to a point.
//! - Balanced Guttman-style tree: bounded fan-out, every leaf at the same
//!   depth, tight cached bounds, with node splitting on insert and tree
//!   condensation on delete.
//!
//! The engine is [`RTree`]. The [`SpatialIndex`] trait names the operation
//! set so trivial reference implementations ([`LinearIndex`], [`NullIndex`])
//! can stand in for the tree when generating comparison results.
//!
//! The tree stores its nodes in a table keyed by integer node ids, reusing
//! retired ids through a free list, and keeps its traversal scratch per
//! instance. Queries therefore take `&mut self`; this also makes it
//! impossible for a visitor to mutate the tree mid-traversal.
//!
//! # Example
//!
//! ```
//! use arbor_index::{Config, RTree};
//! use kurbo::{Point, Rect};
//!
//! let mut tree = RTree::new(Config {
//!     max_entries: 4,
//!     min_entries: 2,
//!     ..Default::default()
//! });
//!
//! tree.add(Rect::new(0.0, 0.0, 1.0, 1.0), 1);
//! tree.add(Rect::new(5.0, 5.0, 6.0, 6.0), 2);
//! tree.add(Rect::new(0.5, 0.5, 2.0, 2.0), 3);
//!
//! // Which boxes touch the unit square's neighborhood?
//! let mut hits = Vec::new();
//! tree.intersects(Rect::new(0.0, 0.0, 2.0, 2.0), |id| hits.push(id));
//! hits.sort();
//! assert_eq!(hits, [1, 3]);
//!
//! // Which boxes are closest to a point?
//! let mut near = Vec::new();
//! tree.nearest(Point::new(5.5, 5.5), |id| near.push(id), f64::INFINITY);
//! assert_eq!(near, [2]);
//!
//! // Deletion identifies entries by their exact (box, id) pair.
//! assert!(tree.delete(Rect::new(5.0, 5.0, 6.0, 6.0), 2));
//! assert_eq!(tree.size(), 2);
//! ```
//!
//! ## Replaying against a reference
//!
//! ```
//! use arbor_index::{LinearIndex, RTree, SpatialIndex};
//! use kurbo::Rect;
//!
//! fn collect(index: &mut dyn SpatialIndex, query: Rect) -> Vec<u32> {
//!     let mut out = Vec::new();
//!     index.intersects(query, &mut |id| out.push(id));
//!     out.sort();
//!     out
//! }
//!
//! let mut tree = RTree::default();
//! let mut reference = LinearIndex::new();
//! for i in 0..10u32 {
//!     let r = Rect::new(f64::from(i), 0.0, f64::from(i) + 2.0, 1.0);
//!     tree.add(r, i);
//!     reference.add(r, i);
//! }
//! let query = Rect::new(3.5, 0.0, 4.5, 1.0);
//! assert_eq!(collect(&mut tree, query), collect(&mut reference, query));
//! ```
//!
//! This crate is `no_std` and uses `alloc`.

#![no_std]

extern crate alloc;

pub mod check;
pub mod geometry;
pub mod index;
mod node;
pub mod reference;
pub mod rtree;

pub use check::ConsistencyError;
pub use index::{Config, SpatialIndex, SplitPolicy};
pub use reference::{LinearIndex, NullIndex};
pub use rtree::RTree;
