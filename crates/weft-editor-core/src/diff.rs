//! Turning position-based edits into identity-based operations.

use tracing::{debug, warn};

use crate::operation::{Operation, Protocol};
use crate::sequence::Sequence;
use crate::text::TextRope;
use crate::widget::{ChangeAction, ContentChange};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Remove,
}

/// An edit over the visible text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edit {
    pub kind: EditKind,
    /// Visible offset where the edit starts.
    pub from: usize,
    /// Inserted or removed characters.
    pub chars: Vec<char>,
}

impl Edit {
    pub fn insert(from: usize, text: &str) -> Self {
        Self {
            kind: EditKind::Insert,
            from,
            chars: text.chars().collect(),
        }
    }

    /// A removal of `removed`, which starts at `from`.
    pub fn remove(from: usize, removed: &str) -> Self {
        Self {
            kind: EditKind::Remove,
            from,
            chars: removed.chars().collect(),
        }
    }

    /// Convert a widget change into visible coordinates.
    ///
    /// `before` is the text as it stood before the change. The start of a
    /// change maps to the same offset before and after it happened.
    pub fn from_change(change: &ContentChange, before: &TextRope) -> Self {
        let from = before.position_to_offset(change.start);
        let text = change.text();
        match change.action {
            ChangeAction::Insert => Self::insert(from, &text),
            ChangeAction::Remove => Self::remove(from, &text),
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }
}

impl Sequence {
    /// Compute the operations for an edit.
    ///
    /// Operations come out in the order they must be applied. Offsets past the
    /// visible text clamp to it, so no operation ever names a node that does
    /// not exist. New nodes get fresh identities from this replica's clock;
    /// an insert the clock cannot cover produces no operations.
    pub fn diff(&mut self, edit: &Edit) -> Vec<Operation> {
        let visible_len = self.visible_len();
        let from = edit.from.min(visible_len);

        let ops = match edit.kind {
            EditKind::Insert => self.diff_insert(from, &edit.chars),
            EditKind::Remove => self
                .visible_nodes()
                .skip(from)
                .take(edit.len())
                .map(|node| Operation::delete(node.id))
                .collect(),
        };

        debug!(
            kind = ?edit.kind,
            from = edit.from,
            clamped = from != edit.from,
            ops = ops.len(),
            "diffed edit"
        );
        ops
    }

    fn diff_insert(&mut self, from: usize, chars: &[char]) -> Vec<Operation> {
        let Some((&first, rest)) = chars.split_first() else {
            return Vec::new();
        };

        let prev = from
            .checked_sub(1)
            .and_then(|idx| self.node_at(idx))
            .map(|node| node.id);

        if self.identities_left() < chars.len() as u64 {
            warn!(
                replica = %self.replica(),
                wanted = chars.len(),
                left = self.identities_left(),
                "replica identities exhausted, dropping insert"
            );
            return Vec::new();
        }

        // A plain add lands after this replica's previous node on every
        // replica, so it only means "at the start" before the first one.
        let first = match (prev, self.protocol()) {
            (Some(after), _) => Operation::add_after(first, after),
            (None, Protocol::Current) if self.last_created(self.replica()).is_none() => {
                Operation::add(first)
            }
            (None, _) => Operation::add_at_beginning(first),
        };

        let mut ops = Vec::with_capacity(chars.len());
        for op in std::iter::once(first).chain(rest.iter().map(|&c| Operation::add(c))) {
            let Some(id) = self.mint() else {
                return Vec::new();
            };
            ops.push(op.with_node(id));
        }
        ops
    }
}
