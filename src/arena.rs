//! Bump allocation of tree nodes in large fixed-size blocks.
//!
//! Structural sharing produces a lot of short-lived node clones, one per
//! visited node on every split path. The arena trades reclamation for
//! allocation speed: slots are handed out by bumping an index inside the
//! current block, a fresh block is allocated when it runs out, and nothing is
//! ever given back until the arena itself is dropped. A node that has been
//! released by the tree keeps occupying its slot.
//!
//! Blocks are never grown after creation, so an [`Idx`] stays valid for the
//! whole lifetime of the arena.

use std::fmt;
use std::marker::PhantomData;
use std::mem::size_of;

/// Size of a single arena block in bytes.
pub const BLOCK_BYTES: usize = 1 << 20;

/// A stable handle to a slot inside an [`Arena`].
///
/// Handles are plain indices; they carry the type of the slot they point to
/// but no lifetime, so the arena they came from has to be used to resolve them.
pub struct Idx<T> {
    raw: u32,
    slot: PhantomData<fn() -> T>,
}

impl<T> Idx<T> {
    #[inline]
    fn new(raw: usize) -> Self {
        Self {
            raw: u32::try_from(raw).expect("arena exceeded u32::MAX slots"),
            slot: PhantomData,
        }
    }

    /// The position of the slot in allocation order.
    #[inline]
    pub fn index(self) -> usize {
        self.raw as usize
    }
}

impl<T> Clone for Idx<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Idx<T> {}

impl<T> PartialEq for Idx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<T> Eq for Idx<T> {}

impl<T> std::hash::Hash for Idx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<T> fmt::Debug for Idx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.raw)
    }
}

/// Append-only slot storage backed by fixed-size blocks.
pub struct Arena<T> {
    blocks: Vec<Vec<T>>,
    per_block: usize,
    len: usize,
}

impl<T> Arena<T> {
    /// Creates an arena with [`BLOCK_BYTES`] sized blocks.
    pub fn new() -> Self {
        Self::with_block_bytes(BLOCK_BYTES)
    }

    /// Creates an arena whose blocks hold `block_bytes` worth of slots.
    ///
    /// Every block holds at least one slot, however small `block_bytes` is.
    pub fn with_block_bytes(block_bytes: usize) -> Self {
        let per_block = (block_bytes / size_of::<T>().max(1)).max(1);
        Arena {
            blocks: Vec::new(),
            per_block,
            len: 0,
        }
    }

    /// Moves `value` into the arena and returns its handle.
    pub fn alloc(&mut self, value: T) -> Idx<T> {
        let full = self
            .blocks
            .last()
            .map_or(true, |block| block.len() == self.per_block);
        if full {
            self.blocks.push(Vec::with_capacity(self.per_block));
            tracing::debug!(
                blocks = self.blocks.len(),
                slots_per_block = self.per_block,
                "arena block allocated"
            );
        }
        let block = self
            .blocks
            .last_mut()
            .expect("a block with spare capacity was just ensured");
        debug_assert!(block.len() < block.capacity());
        block.push(value);

        let idx = Idx::new(self.len);
        self.len += 1;
        idx
    }

    #[inline]
    pub fn get(&self, idx: Idx<T>) -> &T {
        let i = idx.index();
        &self.blocks[i / self.per_block][i % self.per_block]
    }

    #[inline]
    pub fn get_mut(&mut self, idx: Idx<T>) -> &mut T {
        let i = idx.index();
        &mut self.blocks[i / self.per_block][i % self.per_block]
    }

    /// Number of slots handed out so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of blocks allocated so far.
    pub fn blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of slots that fit into one block.
    pub fn slots_per_block(&self) -> usize {
        self.per_block
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("len", &self.len)
            .field("blocks", &self.blocks.len())
            .field("per_block", &self.per_block)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_arena_has_no_blocks() {
        let arena = Arena::<u64>::new();
        assert!(arena.is_empty());
        assert_eq!(arena.blocks(), 0);
        assert_eq!(arena.slots_per_block(), BLOCK_BYTES / 8);
    }

    #[test]
    fn alloc_returns_sequential_handles() {
        let mut arena = Arena::new();
        let a = arena.alloc(10u64);
        let b = arena.alloc(20u64);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(*arena.get(a), 10);
        assert_eq!(*arena.get(b), 20);
        assert_eq!(arena.blocks(), 1);
    }

    #[test]
    fn get_mut_writes_through() {
        let mut arena = Arena::new();
        let a = arena.alloc(1u32);
        *arena.get_mut(a) += 41;
        assert_eq!(*arena.get(a), 42);
    }

    #[test]
    fn spills_into_new_blocks() {
        // Four u64 slots per block.
        let mut arena = Arena::with_block_bytes(32);
        assert_eq!(arena.slots_per_block(), 4);
        let handles: Vec<_> = (0..10u64).map(|v| arena.alloc(v)).collect();
        assert_eq!(arena.blocks(), 3);
        assert_eq!(arena.len(), 10);
        for (v, idx) in handles.into_iter().enumerate() {
            assert_eq!(*arena.get(idx), v as u64);
        }
    }

    #[test]
    fn tiny_blocks_still_hold_one_slot() {
        let mut arena = Arena::with_block_bytes(1);
        assert_eq!(arena.slots_per_block(), 1);
        arena.alloc([0u8; 64]);
        arena.alloc([1u8; 64]);
        assert_eq!(arena.blocks(), 2);
    }

    proptest! {
        #[test]
        fn handles_stay_valid(values in prop::collection::vec(any::<i64>(), 1..2048),
                              block_bytes in 8usize..512) {
            let mut arena = Arena::with_block_bytes(block_bytes);
            let handles: Vec<_> = values.iter().map(|&v| arena.alloc(v)).collect();
            for (idx, v) in handles.iter().zip(values.iter()) {
                prop_assert_eq!(arena.get(*idx), v);
            }
            prop_assert_eq!(arena.len(), values.len());
        }
    }
}
