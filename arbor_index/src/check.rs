// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Optional structural verification of a tree.
//!
//! The checker walks the whole tree, recomputing every cached bound and
//! verifying level, fan-out, and parent-entry agreement. Any failure is a
//! bug in the tree itself, never bad caller input, so nothing on the normal
//! operation paths calls this; tests and debugging sessions do.

use alloc::vec::Vec;
use kurbo::Rect;
use thiserror::Error;

use crate::geometry;
use crate::rtree::RTree;

/// A structural invariant violation found by [`RTree::check_consistency`].
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum ConsistencyError {
    /// An entry referenced a node id with no live node behind it.
    #[error("node {id} is referenced but not present in the node table")]
    DanglingNodeId {
        /// The referenced id.
        id: u32,
    },
    /// A node's level did not agree with its depth below the root.
    #[error("node {id} has level {actual}, expected {expected}")]
    LevelMismatch {
        /// The offending node.
        id: u32,
        /// Level implied by the node's depth.
        expected: u32,
        /// Level the node carries.
        actual: u32,
    },
    /// A cached bound differed from the union of the node's live entries.
    #[error("node {id} cached bounds differ from the union of its entries")]
    StaleBounds {
        /// The offending node.
        id: u32,
    },
    /// A parent entry's box differed from the child's cached bounds.
    #[error("entry for node {id} in parent {parent} is out of date")]
    ParentEntryMismatch {
        /// The child node.
        id: u32,
        /// The parent holding the stale entry.
        parent: u32,
    },
    /// A non-root node's entry count fell outside the configured fan-out.
    #[error("node {id} holds {count} entries, outside {min}..={max}")]
    FanOutOutOfBounds {
        /// The offending node.
        id: u32,
        /// Live entry count.
        count: usize,
        /// Configured floor.
        min: usize,
        /// Configured ceiling.
        max: usize,
    },
    /// The leaf entry tally disagreed with the tracked size.
    #[error("tree reports {tracked} entries but its leaves hold {counted}")]
    SizeMismatch {
        /// Size the tree tracks incrementally.
        tracked: usize,
        /// Entries actually found in leaves.
        counted: usize,
    },
}

impl RTree {
    /// Verify the structural invariants of the whole tree.
    ///
    /// Walks every reachable node, recomputing cached bounds and checking
    /// levels, fan-out, parent entries, and the entry tally. Disabled by
    /// default in the sense that no operation ever runs it implicitly; call
    /// it from tests or while hunting a corruption.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        let mut pending: Vec<(u32, u32, Option<(u32, Rect)>)> = Vec::new();
        pending.push((self.root_id, self.height, None));
        let mut leaf_entries = 0_usize;

        while let Some((id, expected_level, parent_entry)) = pending.pop() {
            let Some(node) = self.nodes.get(id as usize).and_then(|slot| slot.as_ref()) else {
                return Err(ConsistencyError::DanglingNodeId { id });
            };

            if node.level != expected_level {
                return Err(ConsistencyError::LevelMismatch {
                    id,
                    expected: expected_level,
                    actual: node.level,
                });
            }

            let mut union = geometry::EMPTY;
            for entry in &node.entries {
                geometry::expand_to_include(&mut union, &entry.rect);
            }
            if node.mbr != union {
                return Err(ConsistencyError::StaleBounds { id });
            }

            if let Some((parent, rect)) = parent_entry
                && rect != node.mbr
            {
                return Err(ConsistencyError::ParentEntryMismatch { id, parent });
            }

            let count = node.entries.len();
            let below_floor = id != self.root_id && count < self.min_entries;
            if below_floor || count > self.max_entries {
                return Err(ConsistencyError::FanOutOutOfBounds {
                    id,
                    count,
                    min: self.min_entries,
                    max: self.max_entries,
                });
            }

            if node.is_leaf() {
                leaf_entries += count;
            } else {
                for entry in &node.entries {
                    pending.push((entry.id, node.level - 1, Some((id, entry.rect))));
                }
            }
        }

        if leaf_entries != self.size {
            return Err(ConsistencyError::SizeMismatch {
                tracked: self.size,
                counted: leaf_entries,
            });
        }
        Ok(())
    }
}
