//! Persistent ordered sets of `i64` keys with constant-time snapshots.
//!
//! Sets live in a shared copy-on-write treap ([`treap`]) whose nodes are
//! bump-allocated from an [`arena`]. [`set`] wraps that engine in the
//! [`VersionedSet`] API and [`session`] drives numbered versions of it from a
//! stream of integer commands.

pub mod arena;
pub mod session;
pub mod set;
pub mod treap;

pub use session::{Command, Cursor, Reply, Session, SessionConfig, SessionError};
pub use set::{Forest, ForestConfig, ForestStats, Iter, VersionedSet};
