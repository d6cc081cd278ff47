//! Selections anchored to node identities instead of offsets.

use crate::node::NodeId;

/// One selection endpoint.
///
/// `Node(id)` places the caret just before the node `id`. The position past
/// the last visible node has no node to sit before, so it is `End`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    Node(NodeId),
    End,
}

impl Anchor {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(*id),
            Self::End => None,
        }
    }
}

impl From<NodeId> for Anchor {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

/// Selection expressed as a pair of anchors.
///
/// Remote inserts and tombstones shift offsets constantly; anchors keep the
/// caret next to the same character across them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchorSelection {
    pub start: Anchor,
    pub end: Anchor,
    pub reverse: bool,
}

impl AnchorSelection {
    pub fn new(start: Anchor, end: Anchor, reverse: bool) -> Self {
        Self {
            start,
            end,
            reverse,
        }
    }

    pub fn collapsed(at: Anchor) -> Self {
        Self::new(at, at, false)
    }

    /// Caret after the last visible character.
    pub fn at_end() -> Self {
        Self::collapsed(Anchor::End)
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl Default for AnchorSelection {
    fn default() -> Self {
        Self::at_end()
    }
}
