//! Identity-based operations exchanged with the merge service.

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeId};

/// One replicated edit.
///
/// Serialized as `{"op": "...", ...}`. The anchor/target identity is carried
/// in `id`; the historical field name `path` is accepted on input. Add-kind
/// operations may carry the identity the authoring replica gave the new node
/// in `node`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Operation {
    /// Insert without an identity anchor.
    ///
    /// The first plain add of a batch goes before every node; later ones
    /// follow the node the batch created just before.
    Add {
        value: char,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
    },
    /// Insert immediately after `after`, as it stands when applied.
    AddAfter {
        value: char,
        #[serde(rename = "id", alias = "path")]
        after: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
    },
    /// Legacy: insert before every current node.
    AddAtBeginning {
        value: char,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        node: Option<NodeId>,
    },
    /// Tombstone the node `id`.
    Delete {
        #[serde(alias = "path")]
        id: NodeId,
    },
}

impl Operation {
    pub fn add(value: char) -> Self {
        Self::Add { value, node: None }
    }

    pub fn add_after(value: char, after: impl Into<NodeId>) -> Self {
        Self::AddAfter {
            value,
            after: after.into(),
            node: None,
        }
    }

    pub fn add_at_beginning(value: char) -> Self {
        Self::AddAtBeginning { value, node: None }
    }

    pub fn delete(id: impl Into<NodeId>) -> Self {
        Self::Delete { id: id.into() }
    }

    /// Attach the identity of the node this operation creates.
    ///
    /// Has no effect on `Delete`.
    pub fn with_node(mut self, id: NodeId) -> Self {
        match &mut self {
            Self::Add { node, .. }
            | Self::AddAfter { node, .. }
            | Self::AddAtBeginning { node, .. } => *node = Some(id),
            Self::Delete { .. } => {}
        }
        self
    }

    /// Character inserted by this operation, if it inserts one.
    pub fn value(&self) -> Option<char> {
        match self {
            Self::Add { value, .. }
            | Self::AddAfter { value, .. }
            | Self::AddAtBeginning { value, .. } => Some(*value),
            Self::Delete { .. } => None,
        }
    }

    /// Identity of the node this operation creates, if known.
    pub fn created(&self) -> Option<NodeId> {
        match self {
            Self::Add { node, .. }
            | Self::AddAfter { node, .. }
            | Self::AddAtBeginning { node, .. } => *node,
            Self::Delete { .. } => None,
        }
    }

    pub fn is_insert(&self) -> bool {
        !matches!(self, Self::Delete { .. })
    }
}

/// Which operation the diff emits for an insert with no preceding node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Plain `Add`.
    #[default]
    Current,
    /// `AddAtBeginning`.
    Legacy,
}

/// An update delivered by the merge service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteUpdate {
    /// Replaces the whole node list.
    Snapshot(Vec<Node>),
    /// Applied in order on top of the current list.
    Operations(Vec<Operation>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ReplicaId;

    #[test]
    fn test_wire_shapes() {
        let json = serde_json::to_string(&Operation::add_after('X', 1)).unwrap();
        insta::assert_snapshot!(json, @r#"{"op":"addAfter","value":"X","id":1}"#);

        let json = serde_json::to_string(&Operation::delete(2)).unwrap();
        insta::assert_snapshot!(json, @r#"{"op":"delete","id":2}"#);

        let op = Operation::add_at_beginning('h').with_node(NodeId::new(ReplicaId(1), 5));
        let json = serde_json::to_string(&op).unwrap();
        insta::assert_snapshot!(json, @r#"{"op":"addAtBeginning","value":"h","node":4294967301}"#);
    }

    #[test]
    fn test_path_alias() {
        let op: Operation = serde_json::from_str(r#"{"op":"delete","path":9}"#).unwrap();
        assert_eq!(op, Operation::delete(9));

        let op: Operation =
            serde_json::from_str(r#"{"op":"addAfter","value":"q","path":3}"#).unwrap();
        assert_eq!(op, Operation::add_after('q', 3));
    }

    #[test]
    fn test_rejects_multi_char_value() {
        assert!(serde_json::from_str::<Operation>(r#"{"op":"add","value":"ab"}"#).is_err());
        assert!(serde_json::from_str::<Operation>(r#"{"op":"add"}"#).is_err());
        assert!(serde_json::from_str::<Operation>(r#"{"op":"shuffle","value":"a"}"#).is_err());
    }

    #[test]
    fn test_with_node_ignores_delete() {
        let op = Operation::delete(1).with_node(NodeId::from(5));
        assert_eq!(op.created(), None);
        assert_eq!(op.value(), None);
        assert!(!op.is_insert());
    }
}
