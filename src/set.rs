//! Ordered integer sets with O(1) snapshots.
//!
//! All sets created from one [`Forest`] live in the same treap engine and
//! share nodes with each other. Cloning a [`VersionedSet`] only registers one
//! more owner of its root; the two copies diverge lazily, one cloned search
//! path at a time, as either of them is modified.
//!
//! ```
//! use snapset::Forest;
//!
//! let forest = Forest::seeded(1);
//! let mut base = forest.set_from([1, 2, 3]);
//! let snapshot = base.clone();
//!
//! base.erase(2);
//! assert_eq!(base.iter().collect::<Vec<_>>(), vec![1, 3]);
//! assert_eq!(snapshot.iter().collect::<Vec<_>>(), vec![1, 2, 3]);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::iter::FusedIterator;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::arena::BLOCK_BYTES;
use crate::treap::{NodeId, Treap};

/// Construction parameters of a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestConfig {
    /// Seed for node priorities. `None` seeds from the operating system.
    ///
    /// Priorities only influence the shape of the trees, never their content.
    pub seed: Option<u64>,
    /// Size of the arena blocks nodes are allocated from.
    pub block_bytes: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        ForestConfig {
            seed: None,
            block_bytes: BLOCK_BYTES,
        }
    }
}

/// Node accounting of a [`Forest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestStats {
    /// Nodes ever allocated, including released ones whose memory is kept.
    pub allocated: usize,
    /// Nodes reachable from at least one set.
    pub live: usize,
    /// Arena blocks allocated.
    pub blocks: usize,
}

/// The shared engine the sets of one session live in.
///
/// A forest is a cheap handle; clones refer to the same engine. It is neither
/// `Send` nor `Sync`.
#[derive(Clone)]
pub struct Forest {
    engine: Rc<RefCell<Treap>>,
}

impl Forest {
    pub fn new() -> Self {
        Self::with_config(ForestConfig::default())
    }

    /// A forest with deterministic priorities.
    pub fn seeded(seed: u64) -> Self {
        Self::with_config(ForestConfig {
            seed: Some(seed),
            ..ForestConfig::default()
        })
    }

    pub fn with_config(config: ForestConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Forest {
            engine: Rc::new(RefCell::new(Treap::new(rng, config.block_bytes))),
        }
    }

    /// Creates a new, empty set.
    pub fn set(&self) -> VersionedSet {
        VersionedSet {
            forest: self.clone(),
            root: None,
            count: 0,
            min: 0,
            max: 0,
        }
    }

    /// Creates a set holding `keys`.
    pub fn set_from<I>(&self, keys: I) -> VersionedSet
    where
        I: IntoIterator<Item = i64>,
    {
        let mut set = self.set();
        set.extend(keys);
        set
    }

    pub fn stats(&self) -> ForestStats {
        let engine = self.engine.borrow();
        ForestStats {
            allocated: engine.allocated(),
            live: engine.live(),
            blocks: engine.blocks(),
        }
    }
}

impl Default for Forest {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Forest").field(&self.stats()).finish()
    }
}

/// One version of an ordered set of `i64` keys.
///
/// `clone` is O(1) and yields an independent set that shares all nodes with
/// the original until one of them is modified.
pub struct VersionedSet {
    forest: Forest,
    root: Option<NodeId>,
    count: usize,
    min: i64,
    max: i64,
}

impl VersionedSet {
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Identity of the root node. Two sets reporting the same id share their
    /// entire tree.
    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    /// Smallest key, tracked without walking the tree.
    pub fn first(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.min)
    }

    /// Largest key, tracked without walking the tree.
    pub fn last(&self) -> Option<i64> {
        (!self.is_empty()).then_some(self.max)
    }

    pub fn contains(&self, key: i64) -> bool {
        self.forest.engine.borrow().contains(self.root, key)
    }

    /// Inserts `key`. Returns `false` if it was already present.
    pub fn emplace(&mut self, key: i64) -> bool {
        let mut treap = self.forest.engine.borrow_mut();
        if treap.contains(self.root, key) {
            return false;
        }

        if let Some(root) = self.root {
            treap.consume(root);
        }
        let (low, high) = treap.split_lower(self.root, key);
        let leaf = treap.leaf(key);
        let joined = treap.merge(low, Some(leaf));
        self.root = treap.merge(joined, high);

        if self.count == 0 {
            self.min = key;
            self.max = key;
        } else {
            self.min = self.min.min(key);
            self.max = self.max.max(key);
        }
        self.count += 1;
        true
    }

    /// Removes `key`. Returns the number of removed keys, `0` or `1`.
    pub fn erase(&mut self, key: i64) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut treap = self.forest.engine.borrow_mut();
        if !treap.contains(Some(root), key) {
            return 0;
        }

        treap.consume(root);
        let (low, rest) = treap.split_lower(Some(root), key);
        if let Some(rest) = rest {
            treap.consume(rest);
        }
        let (matched, high) = treap.split_greater(rest, key);
        self.root = treap.merge(low, high);

        debug_assert_eq!(treap.size(matched), 1);
        if let Some(matched) = matched {
            treap.release(matched);
        }

        self.count -= 1;
        if self.count == 0 {
            debug_assert!(self.root.is_none());
            self.min = 0;
            self.max = 0;
        } else {
            if key == self.min {
                self.min = treap.leftmost(self.root).unwrap_or(self.min);
            }
            if key == self.max {
                self.max = treap.rightmost(self.root).unwrap_or(self.max);
            }
        }
        1
    }

    /// Counts the keys in `low..=high`.
    ///
    /// The range is carved out of the tree and stitched back in, so the nodes
    /// along both boundaries may be replaced by copies. The content of this
    /// set and of every other set is unchanged.
    pub fn range(&mut self, low: i64, high: i64) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        if high < low {
            return 0;
        }

        let mut treap = self.forest.engine.borrow_mut();
        treap.consume(root);
        let (below, rest) = treap.split_lower(Some(root), low);
        if let Some(rest) = rest {
            treap.consume(rest);
        }
        let (inside, above) = treap.split_greater(rest, high);
        let count = treap.size(inside);

        let joined = treap.merge(below, inside);
        self.root = treap.merge(joined, above);
        count
    }

    /// Greatest key strictly less than `key`.
    pub fn predecessor(&self, key: i64) -> Option<i64> {
        self.forest.engine.borrow().predecessor(self.root, key)
    }

    /// Least key strictly greater than `key`.
    pub fn successor(&self, key: i64) -> Option<i64> {
        self.forest.engine.borrow().successor(self.root, key)
    }

    /// Iterates the keys in ascending order.
    ///
    /// The iterator works on its own snapshot, so the set can be modified
    /// while iterating.
    pub fn iter(&self) -> Iter {
        Iter {
            front: self.first(),
            back: self.last(),
            remaining: self.count,
            snapshot: self.clone(),
        }
    }

    /// Asserts the tree invariants of this set.
    ///
    /// Walks the whole tree; meant for tests and debugging.
    #[doc(hidden)]
    pub fn debug_check(&self) {
        let keys = self.forest.engine.borrow().check(self.root);
        assert_eq!(keys.len(), self.count, "count out of sync");
        assert_eq!(keys.first().copied(), self.first(), "cached minimum out of sync");
        assert_eq!(keys.last().copied(), self.last(), "cached maximum out of sync");
    }
}

impl Clone for VersionedSet {
    fn clone(&self) -> Self {
        if let Some(root) = self.root {
            self.forest.engine.borrow_mut().retain(root);
        }
        VersionedSet {
            forest: self.forest.clone(),
            root: self.root,
            count: self.count,
            min: self.min,
            max: self.max,
        }
    }
}

impl Drop for VersionedSet {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            match self.forest.engine.try_borrow_mut() {
                Ok(mut treap) => treap.release(root),
                Err(_) => debug_assert!(false, "set dropped while its engine is borrowed"),
            }
        }
    }
}

impl Extend<i64> for VersionedSet {
    fn extend<I: IntoIterator<Item = i64>>(&mut self, keys: I) {
        for key in keys {
            self.emplace(key);
        }
    }
}

impl PartialEq for VersionedSet {
    fn eq(&self, other: &Self) -> bool {
        self.count == other.count && (self.root == other.root || self.iter().eq(other.iter()))
    }
}

impl Eq for VersionedSet {}

impl fmt::Debug for VersionedSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a VersionedSet {
    type Item = i64;
    type IntoIter = Iter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Ascending iterator over a snapshot of a [`VersionedSet`].
pub struct Iter {
    snapshot: VersionedSet,
    front: Option<i64>,
    back: Option<i64>,
    remaining: usize,
}

impl Iterator for Iter {
    type Item = i64;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.front?;
        self.remaining -= 1;
        self.front = self.snapshot.successor(key);
        Some(key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let key = self.back?;
        self.remaining -= 1;
        self.back = self.snapshot.predecessor(key);
        Some(key)
    }
}

impl ExactSizeIterator for Iter {}

impl FusedIterator for Iter {}
