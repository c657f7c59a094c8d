//! Copy-on-write treap engine.
//!
//! Every tree handled here is identified by an optional root [`NodeId`] into
//! one shared [`Arena`]. Trees share nodes freely; the `owners` count of a
//! node decides whether a split may relink it in place or has to allocate a
//! clone so that the other trees keep seeing the old shape.
//!
//! The structural entry points follow one protocol:
//!
//! 1. the caller [`consume`](Treap::consume)s the root it hands to a split,
//! 2. [`split_lower`](Treap::split_lower) / [`split_greater`](Treap::split_greater)
//!    reuse nodes that nobody else holds and clone the rest, consuming the
//!    edge to the child they descend into only when they reuse,
//! 3. [`merge`](Treap::merge) stitches trees produced by splits back
//!    together; it only walks spines made of nodes the split left exclusively
//!    owned, so it relinks in place.
//!
//! Released nodes are never handed back to the arena.

mod node;

pub use node::{Node, NodeId};

use rand::rngs::StdRng;
use rand::Rng;

use crate::arena::Arena;

pub struct Treap {
    nodes: Arena<Node>,
    rng: StdRng,
    live: usize,
}

impl Treap {
    pub fn new(rng: StdRng, block_bytes: usize) -> Self {
        Treap {
            nodes: Arena::with_block_bytes(block_bytes),
            rng,
            live: 0,
        }
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes.get(id)
    }

    #[inline]
    pub fn size(&self, root: Option<NodeId>) -> usize {
        root.map_or(0, |id| self.nodes.get(id).size)
    }

    /// Nodes ever allocated, live or released.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes still held by at least one tree.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn blocks(&self) -> usize {
        self.nodes.blocks()
    }

    /// Allocates a detached single-node tree with a fresh random priority.
    pub fn leaf(&mut self, key: i64) -> NodeId {
        let priority = self.rng.gen::<u32>();
        self.live += 1;
        self.nodes.alloc(Node::leaf(key, priority))
    }

    /// Copies `id`'s key and priority into a new node with the given children.
    /// The children gain an edge from the copy.
    fn clone_with(&mut self, id: NodeId, left: Option<NodeId>, right: Option<NodeId>) -> NodeId {
        let Node { key, priority, .. } = *self.nodes.get(id);
        let mut node = Node::leaf(key, priority);
        node.left = left;
        node.right = right;
        for child in left.into_iter().chain(right) {
            self.retain(child);
            node.size += self.nodes.get(child).size;
        }
        self.live += 1;
        self.nodes.alloc(node)
    }

    /// Registers one more holder of `id`.
    pub fn retain(&mut self, id: NodeId) {
        let node = self.nodes.get_mut(id);
        node.owners = node
            .owners
            .checked_add(1)
            .expect("max owner count exceeded");
    }

    /// Gives up the holder that is about to be restructured.
    ///
    /// Unlike [`release`](Treap::release) this never retires the node; the
    /// split that follows takes it over when the count drops to zero.
    pub fn consume(&mut self, id: NodeId) {
        let node = self.nodes.get_mut(id);
        debug_assert!(node.owners > 0, "consumed a node without owners");
        node.owners -= 1;
    }

    /// Drops one holder of `id`, retiring the subtree parts nobody holds anymore.
    pub fn release(&mut self, id: NodeId) {
        let mut pending = vec![id];
        while let Some(id) = pending.pop() {
            let node = self.nodes.get_mut(id);
            debug_assert!(node.owners > 0, "released a node without owners");
            node.owners -= 1;
            if node.owners == 0 {
                let (left, right) = (node.left, node.right);
                self.live -= 1;
                pending.extend(left);
                pending.extend(right);
            }
        }
    }

    fn update_size(&mut self, id: NodeId) {
        let Node { left, right, .. } = *self.nodes.get(id);
        let size = 1 + self.size(left) + self.size(right);
        self.nodes.get_mut(id).size = size;
    }

    /// Joins two trees where every key of `left` is below every key of `right`.
    ///
    /// On equal priorities the root of `left` stays on top.
    pub fn merge(&mut self, left: Option<NodeId>, right: Option<NodeId>) -> Option<NodeId> {
        let (l, r) = match (left, right) {
            (None, right) => return right,
            (left, None) => return left,
            (Some(l), Some(r)) => (l, r),
        };
        let (ln, rn) = (*self.nodes.get(l), *self.nodes.get(r));
        debug_assert!(ln.key < rn.key, "merge inputs overlap");

        if ln.priority >= rn.priority {
            debug_assert_eq!(ln.owners, 1, "merge spine node is shared");
            let merged = self.merge(ln.right, Some(r));
            self.nodes.get_mut(l).right = merged;
            self.update_size(l);
            Some(l)
        } else {
            debug_assert_eq!(rn.owners, 1, "merge spine node is shared");
            let merged = self.merge(Some(l), rn.left);
            self.nodes.get_mut(r).left = merged;
            self.update_size(r);
            Some(r)
        }
    }

    /// Splits into keys `< key` and keys `>= key`.
    ///
    /// The root must already have been consumed by the caller.
    pub fn split_lower(
        &mut self,
        root: Option<NodeId>,
        key: i64,
    ) -> (Option<NodeId>, Option<NodeId>) {
        self.split_by(root, &|k| k < key)
    }

    /// Splits into keys `<= key` and keys `> key`.
    ///
    /// The root must already have been consumed by the caller.
    pub fn split_greater(
        &mut self,
        root: Option<NodeId>,
        key: i64,
    ) -> (Option<NodeId>, Option<NodeId>) {
        self.split_by(root, &|k| k <= key)
    }

    fn split_by<F>(&mut self, root: Option<NodeId>, goes_low: &F) -> (Option<NodeId>, Option<NodeId>)
    where
        F: Fn(i64) -> bool,
    {
        let Some(id) = root else {
            return (None, None);
        };
        let node = *self.nodes.get(id);

        if goes_low(node.key) {
            // `id` heads the low tree, its right subtree gets split further.
            let low = if node.owners == 0 {
                self.nodes.get_mut(id).owners += 1;
                if let Some(right) = node.right {
                    self.consume(right);
                }
                id
            } else {
                self.clone_with(id, node.left, None)
            };
            let (inner_low, high) = self.split_by(node.right, goes_low);
            self.nodes.get_mut(low).right = inner_low;
            self.update_size(low);
            (Some(low), high)
        } else {
            let high = if node.owners == 0 {
                self.nodes.get_mut(id).owners += 1;
                if let Some(left) = node.left {
                    self.consume(left);
                }
                id
            } else {
                self.clone_with(id, None, node.right)
            };
            let (low, inner_high) = self.split_by(node.left, goes_low);
            self.nodes.get_mut(high).left = inner_high;
            self.update_size(high);
            (low, Some(high))
        }
    }

    /// The node holding `key`, if any.
    pub fn find(&self, root: Option<NodeId>, key: i64) -> Option<NodeId> {
        let mut cursor = root;
        while let Some(id) = cursor {
            let node = self.nodes.get(id);
            cursor = match key.cmp(&node.key) {
                std::cmp::Ordering::Less => node.left,
                std::cmp::Ordering::Greater => node.right,
                std::cmp::Ordering::Equal => return Some(id),
            };
        }
        None
    }

    pub fn contains(&self, root: Option<NodeId>, key: i64) -> bool {
        self.find(root, key).is_some()
    }

    pub fn leftmost(&self, root: Option<NodeId>) -> Option<i64> {
        let mut node = self.nodes.get(root?);
        while let Some(left) = node.left {
            node = self.nodes.get(left);
        }
        Some(node.key)
    }

    pub fn rightmost(&self, root: Option<NodeId>) -> Option<i64> {
        let mut node = self.nodes.get(root?);
        while let Some(right) = node.right {
            node = self.nodes.get(right);
        }
        Some(node.key)
    }

    /// Greatest key strictly below `key`.
    pub fn predecessor(&self, root: Option<NodeId>, key: i64) -> Option<i64> {
        let mut found = None;
        let mut cursor = root;
        while let Some(id) = cursor {
            let node = self.nodes.get(id);
            if node.key < key {
                found = Some(node.key);
                cursor = node.right;
            } else {
                cursor = node.left;
            }
        }
        found
    }

    /// Least key strictly above `key`.
    pub fn successor(&self, root: Option<NodeId>, key: i64) -> Option<i64> {
        let mut found = None;
        let mut cursor = root;
        while let Some(id) = cursor {
            let node = self.nodes.get(id);
            if key < node.key {
                found = Some(node.key);
                cursor = node.left;
            } else {
                cursor = node.right;
            }
        }
        found
    }

    /// Walks the whole tree asserting order, heap, size and ownership
    /// invariants. Returns the keys in order.
    pub fn check(&self, root: Option<NodeId>) -> Vec<i64> {
        let mut keys = Vec::with_capacity(self.size(root));
        if let Some(id) = root {
            self.check_node(id, None, None, &mut keys);
        }
        keys
    }

    fn check_node(&self, id: NodeId, lo: Option<i64>, hi: Option<i64>, keys: &mut Vec<i64>) -> usize {
        let node = self.nodes.get(id);
        assert!(node.owners > 0, "reachable node {id:?} has no owners");
        assert!(lo.map_or(true, |lo| lo < node.key), "order violated at {id:?}");
        assert!(hi.map_or(true, |hi| node.key < hi), "order violated at {id:?}");

        let mut size = 1;
        if let Some(left) = node.left {
            assert!(self.nodes.get(left).priority <= node.priority, "heap violated at {id:?}");
            size += self.check_node(left, lo, Some(node.key), keys);
        }
        keys.push(node.key);
        if let Some(right) = node.right {
            assert!(self.nodes.get(right).priority <= node.priority, "heap violated at {id:?}");
            size += self.check_node(right, Some(node.key), hi, keys);
        }
        assert_eq!(node.size, size, "stale size at {id:?}");
        size
    }
}
