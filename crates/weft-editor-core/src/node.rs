//! Nodes of the replicated sequence and the identities that name them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one editing replica.
///
/// Replica ids are drawn below 2^19 so a packed [`NodeId`] stays inside the
/// range a JSON number can carry without loss.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplicaId(pub u32);

impl ReplicaId {
    /// Upper bound (exclusive) for randomly drawn replica ids.
    pub const RANDOM_BOUND: u32 = 1 << 19;

    /// Draw a random replica id.
    pub fn random() -> Self {
        Self(rand::random_range(0..Self::RANDOM_BOUND))
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identity of a node, assigned by the replica that authored it.
///
/// On the wire this is a single integer: the replica id in the high 32 bits,
/// the replica-local sequence number in the low 32 bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct NodeId {
    pub replica: ReplicaId,
    pub seq: u32,
}

impl NodeId {
    pub fn new(replica: ReplicaId, seq: u32) -> Self {
        Self { replica, seq }
    }
}

impl From<u64> for NodeId {
    fn from(raw: u64) -> Self {
        Self {
            replica: ReplicaId((raw >> 32) as u32),
            seq: raw as u32,
        }
    }
}

impl From<NodeId> for u64 {
    fn from(id: NodeId) -> Self {
        ((id.replica.0 as u64) << 32) | id.seq as u64
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.replica, self.seq)
    }
}

/// One character of the replicated sequence.
///
/// Deleted nodes stay in the list as tombstones so operations anchored on
/// them keep resolving.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub value: char,
    #[serde(default)]
    pub is_deleted: bool,
}

impl Node {
    /// Create a live node.
    pub fn new(id: impl Into<NodeId>, value: char) -> Self {
        Self {
            id: id.into(),
            value,
            is_deleted: false,
        }
    }

    /// Create a tombstoned node.
    pub fn tombstone(id: impl Into<NodeId>, value: char) -> Self {
        Self {
            id: id.into(),
            value,
            is_deleted: true,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.is_deleted
    }
}

/// Hands out fresh identities for nodes authored by this replica.
///
/// Sequence numbers start at 1 and never wrap: once `u32::MAX` has been
/// handed out the clock is exhausted and [`tick`](Self::tick) returns `None`.
#[derive(Clone, Debug)]
pub struct ReplicaClock {
    replica: ReplicaId,
    next_seq: u64,
}

impl ReplicaClock {
    pub fn new(replica: ReplicaId) -> Self {
        Self {
            replica,
            next_seq: 1,
        }
    }

    pub fn replica(&self) -> ReplicaId {
        self.replica
    }

    /// Allocate the next identity. Identities are never handed out twice.
    pub fn tick(&mut self) -> Option<NodeId> {
        let seq = u32::try_from(self.next_seq).ok()?;
        self.next_seq += 1;
        Some(NodeId::new(self.replica, seq))
    }

    /// Identities left before the clock is exhausted.
    pub fn remaining(&self) -> u64 {
        (u64::from(u32::MAX) + 1).saturating_sub(self.next_seq)
    }

    /// Make sure identities already seen for this replica are never reissued.
    pub fn observe(&mut self, id: NodeId) {
        if id.replica == self.replica {
            self.next_seq = self.next_seq.max(u64::from(id.seq) + 1);
        }
    }
}
