use crate::arena::Idx;

pub type NodeId = Idx<Node>;

/// A treap node living in the engine's arena.
///
/// `owners` counts the holders of the node: the parent edge of every tree it
/// is linked into plus every version that uses it as root. A structural
/// operation consumes the edge it is about to replace before it looks at the
/// count, so a node seen with `owners == 0` belongs to that operation alone.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub key: i64,
    pub priority: u32,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    pub owners: u32,
    pub size: usize,
}

impl Node {
    pub(crate) fn leaf(key: i64, priority: u32) -> Self {
        Node {
            key,
            priority,
            left: None,
            right: None,
            owners: 1,
            size: 1,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.owners > 1
    }
}
