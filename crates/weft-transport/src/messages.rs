//! Wire messages exchanged with the document service.
//!
//! Every message is one JSON document. Outgoing messages are single
//! operations. Incoming messages are a single operation, a batch
//! `{"ops": [...]}` or a full snapshot `{"nodes": [...]}`.

use serde::{Deserialize, Serialize};
use weft_editor_core::{Node, Operation, RemoteUpdate};

use crate::error::TransportError;

/// An incoming message, before it is handed to the view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Snapshot { nodes: Vec<Node> },
    Batch { ops: Vec<Operation> },
    Single(Operation),
}

impl Inbound {
    /// Parse an incoming text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn into_update(self) -> RemoteUpdate {
        match self {
            Self::Snapshot { nodes } => RemoteUpdate::Snapshot(nodes),
            Self::Batch { ops } => RemoteUpdate::Operations(ops),
            Self::Single(op) => RemoteUpdate::Operations(vec![op]),
        }
    }
}

/// Serialize an outgoing operation.
pub fn encode(op: &Operation) -> Result<String, TransportError> {
    Ok(serde_json::to_string(op)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_editor_core::NodeId;

    #[test]
    fn test_single_op_frames_keep_typing_order() {
        use weft_editor_core::{Edit, Node, ReplicaId, Sequence};

        let snapshot = vec![Node::new(1, 'a'), Node::new(2, 'b')];
        let mut author = Sequence::from_nodes(ReplicaId(1), snapshot.clone());
        let mut follower = Sequence::from_nodes(ReplicaId(2), snapshot);

        let ops = author.diff(&Edit::insert(1, "xyz"));
        author.apply(&ops);
        for op in &ops {
            let frame = encode(op).unwrap();
            match Inbound::decode(&frame).unwrap().into_update() {
                RemoteUpdate::Operations(batch) => follower.apply(&batch),
                other => panic!("expected operations, got {other:?}"),
            };
        }

        assert_eq!(author.text(), "axyzb");
        assert_eq!(follower.text(), "axyzb");
    }

    #[test]
    fn test_decode_single() {
        let msg = Inbound::decode(r#"{"op":"delete","id":2}"#).unwrap();
        assert_eq!(msg, Inbound::Single(Operation::delete(2)));
        assert_eq!(
            msg.into_update(),
            RemoteUpdate::Operations(vec![Operation::delete(2)])
        );
    }

    #[test]
    fn test_decode_legacy_path_field() {
        let msg = Inbound::decode(r#"{"op":"addAfter","value":"x","path":3}"#).unwrap();
        assert_eq!(msg, Inbound::Single(Operation::add_after('x', 3)));
    }

    #[test]
    fn test_decode_batch() {
        let msg = Inbound::decode(
            r#"{"ops":[{"op":"add","value":"h"},{"op":"add","value":"i"}]}"#,
        )
        .unwrap();
        assert_eq!(
            msg.into_update(),
            RemoteUpdate::Operations(vec![Operation::add('h'), Operation::add('i')])
        );
    }

    #[test]
    fn test_decode_snapshot() {
        let msg = Inbound::decode(
            r#"{"nodes":[{"id":1,"value":"a"},{"id":2,"value":"b","isDeleted":true}]}"#,
        )
        .unwrap();
        assert_eq!(
            msg.into_update(),
            RemoteUpdate::Snapshot(vec![Node::new(1, 'a'), Node::tombstone(2, 'b')])
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Inbound::decode("not json").is_err());
        assert!(Inbound::decode(r#"{"op":"teleport","id":1}"#).is_err());
        assert!(Inbound::decode(r#"{"ops":"nope"}"#).is_err());
        assert!(Inbound::decode("[]").is_err());
    }

    #[test]
    fn test_encode() {
        let op = Operation::add_after('X', 1).with_node(NodeId::from(7));
        insta::assert_snapshot!(encode(&op).unwrap(), @r#"{"op":"addAfter","value":"X","id":1,"node":7}"#);
    }
}
