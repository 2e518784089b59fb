//! Structural change records.
//!
//! [§ 4.3.3 Interface MutationRecord](https://dom.spec.whatwg.org/#interface-mutationrecord)
//!
//! A child-list mutation is described the way a `childList` mutation record
//! describes it: the target parent, the position of the edit, and the nodes
//! that left and entered the child list.

use crate::{DomTree, NodeId};

/// One child-list edit of a single parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralChange {
    /// "target": the node whose children changed.
    pub parent: NodeId,
    /// Index in the parent's child list where the edit happened.
    pub index: usize,
    /// "removedNodes"
    pub removed: Vec<NodeId>,
    /// "addedNodes"
    pub added: Vec<NodeId>,
}

impl StructuralChange {
    /// Describe an insertion of `added` at `index` without removals.
    #[must_use]
    pub const fn inserted(parent: NodeId, index: usize, added: Vec<NodeId>) -> Self {
        Self {
            parent,
            index,
            removed: Vec::new(),
            added,
        }
    }

    /// Net change in the parent's child count.
    #[must_use]
    pub fn delta(&self) -> isize {
        let added = isize::try_from(self.added.len()).unwrap_or(isize::MAX);
        let removed = isize::try_from(self.removed.len()).unwrap_or(isize::MAX);
        added - removed
    }

    /// Returns true if `node` was added or removed by this change, or lies
    /// inside an added subtree of `tree`.
    #[must_use]
    pub fn touches(&self, tree: &DomTree, node: NodeId) -> bool {
        self.removed.contains(&node)
            || self
                .added
                .iter()
                .any(|&added| tree.is_inclusive_descendant_of(node, added))
    }
}
