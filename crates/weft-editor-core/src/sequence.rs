//! The tombstoned node list and operation application.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::node::{Node, NodeId, ReplicaClock, ReplicaId};
use crate::operation::{Operation, Protocol};
use crate::selection::Anchor;

/// Ordered list of nodes, the single source of truth for the visible text.
///
/// Nodes are only ever inserted or tombstoned. Nothing is removed, reordered
/// or compacted, so any identity that was once valid stays resolvable.
#[derive(Clone, Debug)]
pub struct Sequence {
    nodes: Vec<Node>,
    /// Identity to list position. Every node has an entry; entries below
    /// `indexed` are exact, the rest may be stale after a mid-list insert.
    index: HashMap<NodeId, usize>,
    indexed: usize,
    /// Where each replica's next plain `Add` lands.
    runs: HashMap<ReplicaId, RunTail>,
    clock: ReplicaClock,
    protocol: Protocol,
}

/// Counts of what an [`Sequence::apply`] call did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub inserted: usize,
    pub deleted: usize,
    /// Echoes of already-applied operations and no-op deletes.
    pub duplicate: usize,
    /// Operations whose anchor or target is unknown.
    pub skipped: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunTail {
    /// After the last node the replica created.
    After(NodeId),
    /// The replica's last anchored add was skipped; its plain adds are
    /// dropped until the next anchored one.
    Lost,
}

/// Where the next anonymous `Add` of a batch lands.
#[derive(Clone, Copy, Debug)]
enum InsertCursor {
    Start,
    After(usize),
    Lost,
}

impl Sequence {
    /// Create an empty sequence authored by `replica`.
    pub fn new(replica: ReplicaId) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            indexed: 0,
            runs: HashMap::new(),
            clock: ReplicaClock::new(replica),
            protocol: Protocol::default(),
        }
    }

    /// Create a sequence from a snapshot.
    pub fn from_nodes(replica: ReplicaId, nodes: Vec<Node>) -> Self {
        let mut sequence = Self::new(replica);
        sequence.replace(nodes);
        sequence
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
    }

    pub fn replica(&self) -> ReplicaId {
        self.clock.replica()
    }

    /// All nodes, tombstones included, in list order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Live nodes in list order. Recomputed on every call.
    pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> + Clone + '_ {
        self.nodes.iter().filter(|node| node.is_visible())
    }

    pub fn visible_len(&self) -> usize {
        self.visible_nodes().count()
    }

    /// The visible text.
    pub fn text(&self) -> String {
        self.visible_nodes().map(|node| node.value).collect()
    }

    /// The live node at a visible offset.
    pub fn node_at(&self, visible_index: usize) -> Option<&Node> {
        self.visible_nodes().nth(visible_index)
    }

    /// Raw list position of a node.
    pub fn position(&self, id: NodeId) -> Option<usize> {
        let pos = *self.index.get(&id)?;
        if pos < self.indexed {
            return Some(pos);
        }
        self.nodes[self.indexed..]
            .iter()
            .position(|node| node.id == id)
            .map(|offset| self.indexed + offset)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    /// The last node `replica` created, which its next plain `Add` follows.
    pub fn last_created(&self, replica: ReplicaId) -> Option<NodeId> {
        match self.runs.get(&replica) {
            Some(RunTail::After(id)) => Some(*id),
            _ => None,
        }
    }

    /// Identities this replica can still mint.
    pub fn identities_left(&self) -> u64 {
        self.clock.remaining()
    }

    pub(crate) fn mint(&mut self) -> Option<NodeId> {
        self.clock.tick()
    }

    /// Replace the whole list with a snapshot.
    ///
    /// Each replica's run continues after its highest identity in the
    /// snapshot.
    pub fn replace(&mut self, nodes: Vec<Node>) {
        self.runs.clear();
        for node in &nodes {
            self.clock.observe(node.id);
            self.catch_up_run(node.id);
        }
        debug!(nodes = nodes.len(), "replaced sequence from snapshot");
        self.nodes = nodes;
        self.index.clear();
        self.indexed = 0;
        self.reindex();
    }

    /// Resolve an anchor identity to a visible offset.
    ///
    /// Walks backward from the anchor's list position to the first live node
    /// and returns that node's visible offset. Resolves to 0 when nothing
    /// live precedes the anchor, and when the identity is unknown.
    pub fn index_or_prev(&self, id: NodeId) -> usize {
        let Some(pos) = self.position(id) else {
            warn!(%id, "selection anchor not in sequence, falling back to start");
            return 0;
        };
        match self.nodes[..=pos].iter().rposition(Node::is_visible) {
            Some(live) => self.nodes[..live].iter().filter(|n| n.is_visible()).count(),
            None => 0,
        }
    }

    /// Resolve a selection endpoint to a visible offset.
    pub fn resolve(&self, anchor: Anchor) -> usize {
        match anchor {
            Anchor::Node(id) => self.index_or_prev(id),
            Anchor::End => self.visible_len(),
        }
    }

    /// Anchor for the caret at a visible offset.
    pub fn anchor_at(&self, visible_index: usize) -> Anchor {
        self.node_at(visible_index)
            .map(|node| Anchor::Node(node.id))
            .unwrap_or(Anchor::End)
    }

    /// Apply operations in order.
    ///
    /// A plain `Add` that names its node follows the last node created by
    /// the same replica, or goes first if that replica has created none. An
    /// anonymous `Add` follows the previous add of the same call, or goes
    /// first.
    ///
    /// Never fails: echoes of nodes already present are ignored, and
    /// operations referring to unknown identities are skipped with a warning.
    pub fn apply(&mut self, ops: &[Operation]) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut cursor = InsertCursor::Start;
        let mut last: Option<(NodeId, usize)> = None;

        for op in ops {
            if let Some(id) = op.created() {
                if let Some(existing) = self.locate(id, last) {
                    self.catch_up_run(id);
                    report.duplicate += 1;
                    cursor = InsertCursor::After(existing);
                    last = Some((id, existing));
                    continue;
                }
            }

            let at = match op {
                Operation::Add { node: Some(id), .. } => match self.runs.get(&id.replica).copied() {
                    None => Some(0),
                    Some(RunTail::After(prev)) => self.locate(prev, last).map(|pos| pos + 1),
                    Some(RunTail::Lost) => None,
                },
                Operation::Add { node: None, .. } => match cursor {
                    InsertCursor::Start => Some(0),
                    InsertCursor::After(pos) => Some(pos + 1),
                    InsertCursor::Lost => None,
                },
                Operation::AddAfter { after, node, .. } => {
                    let at = self.locate(*after, last).map(|pos| pos + 1);
                    if at.is_none() {
                        warn!(%after, "skipping addAfter with unknown anchor");
                        if let Some(id) = node {
                            self.runs.insert(id.replica, RunTail::Lost);
                        }
                    }
                    at
                }
                Operation::AddAtBeginning { .. } => Some(0),
                Operation::Delete { id } => {
                    match self.locate(*id, last) {
                        Some(pos) if self.nodes[pos].is_deleted => report.duplicate += 1,
                        Some(pos) => {
                            self.nodes[pos].is_deleted = true;
                            report.deleted += 1;
                        }
                        None => {
                            warn!(%id, "skipping delete of unknown node");
                            report.skipped += 1;
                        }
                    }
                    continue;
                }
            };

            let inserted = match (at, op.value()) {
                (Some(at), Some(value)) => self.insert_at(at, value, op.created()),
                _ => None,
            };
            match inserted {
                Some((id, pos)) => {
                    report.inserted += 1;
                    cursor = InsertCursor::After(pos);
                    last = Some((id, pos));
                }
                None => {
                    if at.is_none() && !matches!(op, Operation::AddAfter { .. }) {
                        warn!(?op, "dropping add that follows an unresolved anchor");
                    }
                    report.skipped += 1;
                    cursor = InsertCursor::Lost;
                }
            }
        }

        self.reindex();
        debug!(?report, ops = ops.len(), "applied operations");
        report
    }

    /// Position of `id`, short-circuiting on the node the current batch
    /// touched last.
    fn locate(&self, id: NodeId, last: Option<(NodeId, usize)>) -> Option<usize> {
        match last {
            Some((last_id, pos)) if last_id == id => Some(pos),
            _ => self.position(id),
        }
    }

    fn insert_at(
        &mut self,
        at: usize,
        value: char,
        node: Option<NodeId>,
    ) -> Option<(NodeId, usize)> {
        let id = match node {
            Some(id) => {
                self.clock.observe(id);
                self.runs.insert(id.replica, RunTail::After(id));
                id
            }
            None => match self.mint() {
                Some(id) => id,
                None => {
                    warn!(replica = %self.replica(), "replica identities exhausted, dropping add");
                    return None;
                }
            },
        };

        let at = at.min(self.nodes.len());
        if at == self.nodes.len() && self.indexed == at {
            self.indexed += 1;
        } else {
            self.indexed = self.indexed.min(at);
        }
        self.nodes.insert(at, Node::new(id, value));
        self.index.insert(id, at);
        Some((id, at))
    }

    /// Move a replica's run to `id` if it is the newest node seen from it.
    fn catch_up_run(&mut self, id: NodeId) {
        let tail = self.runs.entry(id.replica).or_insert(RunTail::After(id));
        if matches!(*tail, RunTail::After(prev) if prev.seq < id.seq) {
            *tail = RunTail::After(id);
        }
    }

    /// Bring every stale index entry up to date.
    fn reindex(&mut self) {
        for (pos, node) in self.nodes.iter().enumerate().skip(self.indexed) {
            self.index.insert(node.id, pos);
        }
        self.indexed = self.nodes.len();
    }
}
