// Copyright 2025 the Arbor Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The R-tree engine: insertion with node splitting, deletion with tree
//! condensation, and the intersection, containment, and nearest traversals.
//!
//! Nodes live in a table keyed by id and never reference each other
//! directly; retired ids go to a free list and are reused. Parent tracking
//! during mutation uses explicit stacks recorded on the way down rather than
//! recursion, which also lets the containment and deletion descents resume a
//! half-scanned node after backtracking.

use alloc::vec::Vec;
use core::mem;

use kurbo::{Point, Rect};

use crate::geometry;
use crate::index::{Config, SpatialIndex, SplitPolicy};
use crate::node::{Entry, Node};

/// Seed candidate during a node split: the incoming entry, or an existing
/// slot of the node being split.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Seed {
    Incoming,
    Slot(usize),
}

/// A resumable scan position used by the backtracking traversals.
///
/// `next` is the first entry index not yet tested; `next - 1` is the entry
/// currently descended into, which is what the condensation pass reads back.
#[derive(Clone, Copy, Debug)]
struct Cursor {
    node: u32,
    next: usize,
}

/// In-memory R-tree over axis-aligned rectangles keyed by caller ids.
///
/// The balanced-tree invariants hold after every operation: all leaves sit at
/// the same depth, every non-root node keeps its entry count within the
/// configured fan-out bounds, and every cached bound is the exact union of
/// the entries below it.
///
/// Single-threaded and non-reentrant; wrap it in external synchronization
/// for shared use.
#[derive(Clone)]
pub struct RTree {
    pub(crate) max_entries: usize,
    pub(crate) min_entries: usize,
    split_policy: SplitPolicy,
    /// Node table: the sole owner of every node, keyed by node id.
    pub(crate) nodes: Vec<Option<Node>>,
    /// Retired node ids, reused before the table grows.
    free_ids: Vec<u32>,
    pub(crate) root_id: u32,
    /// Levels from leaf (1) to root.
    pub(crate) height: u32,
    pub(crate) size: usize,
    // Reusable traversal scratch, owned per tree so queries do not allocate
    // on every call. Each operation clears what it uses on entry; an early
    // return may leave any of these non-empty.
    path: Vec<(u32, usize)>,
    cursors: Vec<Cursor>,
    visit: Vec<u32>,
    split_assigned: Vec<bool>,
    split_kept: Vec<bool>,
    nearest_ids: Vec<u32>,
}

impl Default for RTree {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl core::fmt::Debug for RTree {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let total = self.nodes.len();
        let alive = self.nodes.iter().filter(|n| n.is_some()).count();
        f.debug_struct("RTree")
            .field("max_entries", &self.max_entries)
            .field("min_entries", &self.min_entries)
            .field("nodes_total", &total)
            .field("nodes_alive", &alive)
            .field("free_ids", &self.free_ids.len())
            .field("height", &self.height)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl RTree {
    /// Create an empty tree from `config`, correcting unusable fan-out
    /// bounds (see [`Config`]).
    pub fn new(config: Config) -> Self {
        let config = config.sanitized();
        log::debug!(
            "configured r-tree: max_entries={}, min_entries={}",
            config.max_entries,
            config.min_entries
        );
        let mut nodes = Vec::new();
        nodes.push(Some(Node::new(1, config.max_entries)));
        Self {
            max_entries: config.max_entries,
            min_entries: config.min_entries,
            split_policy: config.split_policy,
            nodes,
            free_ids: Vec::new(),
            root_id: 0,
            height: 1,
            size: 0,
            path: Vec::new(),
            cursors: Vec::new(),
            visit: Vec::new(),
            split_assigned: Vec::new(),
            split_kept: Vec::new(),
            nearest_ids: Vec::new(),
        }
    }

    /// Insert `rect` under the caller's `id`.
    pub fn add(&mut self, rect: Rect, id: u32) {
        log::trace!("add rect={rect:?} id={id}");
        self.insert_at_level(rect, id, 1);
        self.size += 1;
    }

    /// Remove the exact `(rect, id)` pair. Returns whether it was found.
    pub fn delete(&mut self, rect: Rect, id: u32) -> bool {
        log::trace!("delete rect={rect:?} id={id}");
        // Locate the leaf without recursion. An entry can only live under
        // ancestors whose boxes fully contain it, so the descent filters on
        // containment rather than overlap, resuming each node's scan where
        // it left off when a subtree comes up empty.
        self.cursors.clear();
        self.cursors.push(Cursor {
            node: self.root_id,
            next: 0,
        });

        let mut found: Option<(u32, usize)> = None;
        while found.is_none() && !self.cursors.is_empty() {
            let top = self.cursors[self.cursors.len() - 1];
            let mut descend: Option<(u32, usize)> = None;
            {
                let n = self.node(top.node);
                if n.is_leaf() {
                    if let Some(i) = n.find_entry(&rect, id) {
                        found = Some((top.node, i));
                    }
                } else {
                    for i in top.next..n.entries.len() {
                        if n.entries[i].rect.contains_rect(rect) {
                            descend = Some((n.entries[i].id, i));
                            break;
                        }
                    }
                }
            }
            match descend {
                Some((child, at)) => {
                    let last = self.cursors.len() - 1;
                    self.cursors[last].next = at + 1;
                    self.cursors.push(Cursor { node: child, next: 0 });
                }
                None => {
                    self.cursors.pop();
                }
            }
        }

        if let Some((leaf, index)) = found {
            let min_entries = self.min_entries;
            self.node_mut(leaf).remove_entry(index, min_entries);
            self.condense_tree(leaf);
            self.size -= 1;
        }

        // The root sheds levels while it holds a single child.
        while self.node(self.root_id).entries.len() == 1 && self.height > 1 {
            let old_root = self.root_id;
            let child = self.node(old_root).entries[0].id;
            self.retire_node(old_root);
            self.root_id = child;
            self.height -= 1;
        }

        found.is_some()
    }

    /// Visit the id of every entry whose box intersects `rect`.
    ///
    /// No ordering guarantee. The visitor must not touch the tree, which the
    /// exclusive borrow enforces.
    pub fn intersects(&mut self, rect: Rect, mut visitor: impl FnMut(u32)) {
        let mut stack = mem::take(&mut self.visit);
        stack.clear();
        stack.push(self.root_id);
        while let Some(id) = stack.pop() {
            let n = self.node(id);
            if n.is_leaf() {
                for entry in &n.entries {
                    if rect.overlaps(entry.rect) {
                        visitor(entry.id);
                    }
                }
            } else {
                for entry in &n.entries {
                    if rect.overlaps(entry.rect) {
                        stack.push(entry.id);
                    }
                }
            }
        }
        self.visit = stack;
    }

    /// Visit the id of every entry whose box `rect` fully contains.
    ///
    /// The descent tests *intersection*, not containment: a child's bounds
    /// can intersect the query without being contained while still holding
    /// entries that are. Only leaf entries are filtered on containment.
    pub fn contains(&mut self, rect: Rect, mut visitor: impl FnMut(u32)) {
        self.cursors.clear();
        if !self.node(self.root_id).mbr.overlaps(rect) {
            return;
        }
        self.cursors.push(Cursor {
            node: self.root_id,
            next: 0,
        });
        while let Some(top) = self.cursors.last().copied() {
            let mut descend: Option<(u32, usize)> = None;
            {
                let n = self.node(top.node);
                if n.is_leaf() {
                    for entry in &n.entries {
                        if rect.contains_rect(entry.rect) {
                            visitor(entry.id);
                        }
                    }
                } else {
                    for i in top.next..n.entries.len() {
                        if rect.overlaps(n.entries[i].rect) {
                            descend = Some((n.entries[i].id, i));
                            break;
                        }
                    }
                }
            }
            match descend {
                Some((child, at)) => {
                    let last = self.cursors.len() - 1;
                    self.cursors[last].next = at + 1;
                    self.cursors.push(Cursor { node: child, next: 0 });
                }
                None => {
                    self.cursors.pop();
                }
            }
        }
    }

    /// Visit the ids of the entries nearest to `point`, once each, after the
    /// search completes, in no particular order.
    ///
    /// The search starts bounded at `max_distance` (Euclidean); entries at
    /// exactly the current bound accumulate, strictly closer ones replace
    /// the accumulated set. Pass `f64::INFINITY` to always find the nearest.
    pub fn nearest(&mut self, point: Point, mut visitor: impl FnMut(u32), max_distance: f64) {
        self.nearest_ids.clear();
        if max_distance < 0.0 {
            return;
        }
        let mut bound_sq = max_distance * max_distance;
        let mut stack = mem::take(&mut self.visit);
        let mut candidates = mem::take(&mut self.nearest_ids);
        stack.clear();
        stack.push(self.root_id);
        while let Some(id) = stack.pop() {
            let n = self.node(id);
            if n.is_leaf() {
                for entry in &n.entries {
                    let d = geometry::distance_sq(&entry.rect, point);
                    if d < bound_sq {
                        bound_sq = d;
                        candidates.clear();
                    }
                    if d <= bound_sq {
                        candidates.push(entry.id);
                    }
                }
            } else {
                // A subtree can only improve on the bound if its covering
                // box is at least that close.
                for entry in &n.entries {
                    if geometry::distance_sq(&entry.rect, point) <= bound_sq {
                        stack.push(entry.id);
                    }
                }
            }
        }
        for &id in &candidates {
            visitor(id);
        }
        candidates.clear();
        self.visit = stack;
        self.nearest_ids = candidates;
    }

    /// Number of live entries.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Tight bounds over every entry, or `None` when the tree is empty.
    pub fn bounds(&self) -> Option<Rect> {
        let mbr = self.node(self.root_id).mbr;
        (!geometry::is_empty(&mbr)).then_some(mbr)
    }

    // --- node table ---

    pub(crate) fn node(&self, id: u32) -> &Node {
        self.nodes[id as usize].as_ref().expect("dangling node id")
    }

    fn node_mut(&mut self, id: u32) -> &mut Node {
        self.nodes[id as usize].as_mut().expect("dangling node id")
    }

    fn alloc_node_id(&mut self) -> u32 {
        if let Some(id) = self.free_ids.pop() {
            id
        } else {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "node ids are 32-bit by design"
            )]
            let id = self.nodes.len() as u32;
            self.nodes.push(None);
            id
        }
    }

    fn retire_node(&mut self, id: u32) {
        self.nodes[id as usize] = None;
        self.free_ids.push(id);
    }

    // --- insertion ---

    /// Insert an entry into some node at `level`, splitting and growing the
    /// tree as needed. Leaf entries enter at level 1; condensation reinserts
    /// whole subtrees higher up.
    fn insert_at_level(&mut self, rect: Rect, id: u32, level: u32) {
        let target = self.choose_node(rect, level);
        let mut split = if self.node(target).entries.len() < self.max_entries {
            self.node_mut(target).push_entry(rect, id);
            None
        } else {
            Some(self.split_node(target, rect, id))
        };

        // Walk the recorded path back up, tightening each parent's entry to
        // the child's bounds and propagating splits.
        let mut child = target;
        while let Some((parent_id, entry_index)) = self.path.pop() {
            let child_mbr = self.node(child).mbr;
            {
                let parent = self.node_mut(parent_id);
                debug_assert_eq!(
                    parent.entries[entry_index].id, child,
                    "recorded path is out of step with the tree"
                );
                if parent.entries[entry_index].rect != child_mbr {
                    parent.entries[entry_index].rect = child_mbr;
                    parent.refresh_mbr();
                }
            }
            if let Some(sibling) = split {
                let sibling_mbr = self.node(sibling).mbr;
                split = if self.node(parent_id).entries.len() < self.max_entries {
                    self.node_mut(parent_id).push_entry(sibling_mbr, sibling);
                    None
                } else {
                    Some(self.split_node(parent_id, sibling_mbr, sibling))
                };
            }
            child = parent_id;
        }

        // A split that escapes the root grows the tree by one level.
        if let Some(sibling) = split {
            let old_root = self.root_id;
            let new_root_id = self.alloc_node_id();
            self.height += 1;
            let mut root = Node::new(self.height, self.max_entries);
            root.push_entry(self.node(sibling).mbr, sibling);
            root.push_entry(self.node(old_root).mbr, old_root);
            self.nodes[new_root_id as usize] = Some(root);
            self.root_id = new_root_id;
        }
    }

    /// Descend from the root to a node at `level`, recording the path taken
    /// as (node id, entry index) frames.
    ///
    /// At each internal node the child needing least enlargement to cover
    /// `rect` wins; ties go to the smaller box, then to the first match.
    fn choose_node(&mut self, rect: Rect, level: u32) -> u32 {
        self.path.clear();
        let mut id = self.root_id;
        loop {
            let (index, child) = {
                let n = self.node(id);
                if n.level == level {
                    return id;
                }
                let mut index = 0;
                let mut least = geometry::enlargement(&n.entries[0].rect, &rect);
                for (i, entry) in n.entries.iter().enumerate().skip(1) {
                    let grow = geometry::enlargement(&entry.rect, &rect);
                    if grow < least
                        || (grow == least && entry.rect.area() < n.entries[index].rect.area())
                    {
                        index = i;
                        least = grow;
                    }
                }
                (index, n.entries[index].id)
            };
            self.path.push((id, index));
            id = child;
        }
    }

    // --- node splitting ---

    /// Split a full node around an incoming entry. Returns the id of the new
    /// sibling at the same level.
    ///
    /// The original node keeps one group, compacted to a contiguous prefix;
    /// the sibling takes the other. Both cached bounds end exact.
    fn split_node(&mut self, node_id: u32, new_rect: Rect, new_id: u32) -> u32 {
        let mut n = self.nodes[node_id as usize]
            .take()
            .expect("dangling node id");
        let sibling_id = self.alloc_node_id();
        let mut sibling = Node::new(n.level, self.max_entries);

        self.split_assigned.clear();
        self.split_assigned.resize(self.max_entries, false);
        self.split_kept.clear();
        self.split_kept.resize(self.max_entries, false);

        // Seed separations are normalized by the extent of the whole
        // candidate set, so the bounds must cover the incoming entry first.
        geometry::expand_to_include(&mut n.mbr, &new_rect);
        let (seed_sibling, seed_kept) = match self.split_policy {
            SplitPolicy::Linear => Self::pick_seeds(&n, &new_rect),
        };

        // The highest-low extreme seeds the sibling; when it is an existing
        // entry, the incoming entry takes over its slot in the original.
        match seed_sibling {
            Seed::Incoming => sibling.push_entry(new_rect, new_id),
            Seed::Slot(i) => {
                let moved = n.entries[i];
                sibling.push_entry(moved.rect, moved.id);
                n.entries[i] = Entry {
                    rect: new_rect,
                    id: new_id,
                };
            }
        }
        let kept_seed_slot = match seed_kept {
            Seed::Slot(i) => i,
            // The incoming entry was the low-high extreme as well; it now
            // sits in the slot vacated by the sibling's seed.
            Seed::Incoming => match seed_sibling {
                Seed::Slot(i) => i,
                Seed::Incoming => unreachable!("one entry cannot be both split seeds"),
            },
        };
        self.split_assigned[kept_seed_slot] = true;
        self.split_kept[kept_seed_slot] = true;
        let mut kept_count = 1_usize;
        n.mbr = n.entries[kept_seed_slot].rect;

        // Assign the rest: each round the entry with the most lopsided
        // preference goes to the group it enlarges least, until one group
        // must take everything left to reach the minimum.
        while kept_count + sibling.entries.len() < self.max_entries + 1 {
            let remaining = self.max_entries + 1 - kept_count - sibling.entries.len();
            if kept_count + remaining == self.min_entries {
                for i in 0..self.max_entries {
                    if !self.split_assigned[i] {
                        self.split_assigned[i] = true;
                        self.split_kept[i] = true;
                        geometry::expand_to_include(&mut n.mbr, &n.entries[i].rect);
                        kept_count += 1;
                    }
                }
                break;
            }
            if sibling.entries.len() + remaining == self.min_entries {
                for i in 0..self.max_entries {
                    if !self.split_assigned[i] {
                        self.split_assigned[i] = true;
                        let entry = n.entries[i];
                        sibling.push_entry(entry.rect, entry.id);
                    }
                }
                break;
            }

            // PickNext: largest difference in enlargement between the two
            // groups, assigned to the cheaper one; ties go to the smaller
            // group area, then to the group with fewer entries.
            let mut best_difference = f64::NEG_INFINITY;
            let mut next = 0_usize;
            let mut next_kept = true;
            for i in 0..self.max_entries {
                if self.split_assigned[i] {
                    continue;
                }
                let rect = n.entries[i].rect;
                let grow_kept = n.enlargement(&rect);
                let grow_sibling = sibling.enlargement(&rect);
                let difference = (grow_kept - grow_sibling).abs();
                if difference > best_difference {
                    next = i;
                    next_kept = if grow_kept < grow_sibling {
                        true
                    } else if grow_sibling < grow_kept {
                        false
                    } else if n.mbr.area() < sibling.mbr.area() {
                        true
                    } else if sibling.mbr.area() < n.mbr.area() {
                        false
                    } else {
                        kept_count <= sibling.entries.len()
                    };
                    best_difference = difference;
                }
            }
            self.split_assigned[next] = true;
            if next_kept {
                self.split_kept[next] = true;
                geometry::expand_to_include(&mut n.mbr, &n.entries[next].rect);
                kept_count += 1;
            } else {
                let entry = n.entries[next];
                sibling.push_entry(entry.rect, entry.id);
            }
        }

        // Compact the kept group into a contiguous prefix.
        let mut kept_entries = Vec::with_capacity(self.max_entries);
        for (i, entry) in n.entries.iter().enumerate() {
            if self.split_kept[i] {
                kept_entries.push(*entry);
            }
        }
        n.entries = kept_entries;

        self.nodes[node_id as usize] = Some(n);
        self.nodes[sibling_id as usize] = Some(sibling);
        sibling_id
    }

    /// Choose the two split seeds: along each axis, the entry with the
    /// highest low edge and the entry with the lowest high edge, separations
    /// normalized by the candidate set's extent; the widest-separated pair
    /// across both axes wins.
    ///
    /// Returns (sibling seed, kept seed). The incoming entry participates
    /// like any other candidate.
    fn pick_seeds(n: &Node, new_rect: &Rect) -> (Seed, Seed) {
        let full = n.mbr;
        let mut best_separation = 0.0_f64;
        let mut highest_low = Seed::Slot(0);
        let mut lowest_high = Seed::Slot(0);

        let mut high_low_x = new_rect.x0;
        let mut high_low_x_seed = Seed::Incoming;
        let mut low_high_x = new_rect.x1;
        let mut low_high_x_seed = Seed::Incoming;
        let mut high_low_y = new_rect.y0;
        let mut high_low_y_seed = Seed::Incoming;
        let mut low_high_y = new_rect.y1;
        let mut low_high_y_seed = Seed::Incoming;

        for (i, entry) in n.entries.iter().enumerate() {
            let low_x = entry.rect.x0;
            if low_x >= high_low_x {
                high_low_x = low_x;
                high_low_x_seed = Seed::Slot(i);
            } else {
                // The same entry must never end up as both extremes.
                let high_x = entry.rect.x1;
                if high_x <= low_high_x {
                    low_high_x = high_x;
                    low_high_x_seed = Seed::Slot(i);
                }
            }
            let low_y = entry.rect.y0;
            if low_y >= high_low_y {
                high_low_y = low_y;
                high_low_y_seed = Seed::Slot(i);
            } else {
                let high_y = entry.rect.y1;
                if high_y <= low_high_y {
                    low_high_y = high_y;
                    low_high_y_seed = Seed::Slot(i);
                }
            }

            let separation_x = (high_low_x - low_high_x) / (full.x1 - full.x0);
            let separation_y = (high_low_y - low_high_y) / (full.y1 - full.y0);
            if separation_x > best_separation {
                best_separation = separation_x;
                highest_low = high_low_x_seed;
                lowest_high = low_high_x_seed;
            }
            if separation_y > best_separation {
                best_separation = separation_y;
                highest_low = high_low_y_seed;
                lowest_high = low_high_y_seed;
            }
        }

        (highest_low, lowest_high)
    }

    // --- deletion ---

    /// Walk from `leaf` back to the root after a removal: detach nodes that
    /// fell below the minimum fan-out, tighten surviving parent entries,
    /// then reinsert every entry of every detached node at its original
    /// level so subtrees rejoin at the correct height.
    ///
    /// Expects `self.cursors` to hold the ancestors of `leaf`, as recorded
    /// by the deletion descent.
    fn condense_tree(&mut self, leaf: u32) {
        let mut eliminated: Vec<u32> = Vec::new();
        let mut current = leaf;
        while self.node(current).level != self.height {
            let cursor = self.cursors.pop().expect("ancestor stack exhausted");
            let parent_id = cursor.node;
            // The cursor stopped one past the entry it descended into.
            let parent_entry = cursor.next - 1;
            if self.node(current).entries.len() < self.min_entries {
                let min_entries = self.min_entries;
                self.node_mut(parent_id).remove_entry(parent_entry, min_entries);
                eliminated.push(current);
            } else {
                let mbr = self.node(current).mbr;
                let parent = self.node_mut(parent_id);
                if parent.entries[parent_entry].rect != mbr {
                    let old = parent.entries[parent_entry].rect;
                    parent.entries[parent_entry].rect = mbr;
                    parent.refresh_mbr_if_shrunk(&old);
                }
            }
            current = parent_id;
        }

        while let Some(node_id) = eliminated.pop() {
            let node = self.nodes[node_id as usize]
                .take()
                .expect("dangling node id");
            for entry in &node.entries {
                self.insert_at_level(entry.rect, entry.id, node.level);
            }
            self.free_ids.push(node_id);
        }

        // The root is exempt from the fan-out floor, so its removal path may
        // have skipped the bounds recompute; settle it before returning.
        self.node_mut(self.root_id).refresh_mbr();
    }
}

impl SpatialIndex for RTree {
    fn add(&mut self, rect: Rect, id: u32) {
        Self::add(self, rect, id);
    }

    fn delete(&mut self, rect: Rect, id: u32) -> bool {
        Self::delete(self, rect, id)
    }

    fn intersects(&mut self, rect: Rect, visitor: &mut dyn FnMut(u32)) {
        Self::intersects(self, rect, visitor);
    }

    fn contains(&mut self, rect: Rect, visitor: &mut dyn FnMut(u32)) {
        Self::contains(self, rect, visitor);
    }

    fn nearest(&mut self, point: Point, visitor: &mut dyn FnMut(u32), max_distance: f64) {
        Self::nearest(self, point, visitor, max_distance);
    }

    fn size(&self) -> usize {
        Self::size(self)
    }

    fn bounds(&self) -> Option<Rect> {
        Self::bounds(self)
    }
}
