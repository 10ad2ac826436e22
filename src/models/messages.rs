use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ErrorKind, Presence};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: String,
    pub token: String,
}

/// Opaque document snapshot sent by an editor. Relayed and persisted verbatim.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ChangeMessage {
    pub payload: Value,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LeaveMessage {}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PingMessage {}

/// Messages accepted from clients.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "change")]
    Change(ChangeMessage),
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
    #[serde(rename = "ping")]
    Ping(PingMessage),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceJoinedMessage {
    pub presence: Presence,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PresenceLeftMessage {
    pub connection_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterMessage {
    pub document_id: String,
    pub presences: Vec<Presence>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RelayedChangeMessage {
    pub payload: Value,
    pub sender_user_id: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Messages sent to clients.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "presence-joined")]
    PresenceJoined(PresenceJoinedMessage),
    #[serde(rename = "presence-left")]
    PresenceLeft(PresenceLeftMessage),
    #[serde(rename = "roster")]
    Roster(RosterMessage),
    #[serde(rename = "change")]
    Change(RelayedChangeMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_tagged_client_messages() {
        let join: ReceivedMessage =
            serde_json::from_value(json!({"type": "join", "documentId": "doc1", "token": "t"})).unwrap();
        assert!(matches!(join, ReceivedMessage::Join(ref m) if m.document_id == "doc1" && m.token == "t"));

        let change: ReceivedMessage =
            serde_json::from_value(json!({"type": "change", "payload": {"ops": [{"insert": "hi"}]}})).unwrap();
        match change {
            ReceivedMessage::Change(m) => assert_eq!(m.payload, json!({"ops": [{"insert": "hi"}]})),
            other => panic!("unexpected {:?}", other),
        }

        let leave: ReceivedMessage = serde_json::from_value(json!({"type": "leave"})).unwrap();
        assert!(matches!(leave, ReceivedMessage::Leave(_)));
    }

    #[test]
    fn rejects_unknown_type_and_missing_fields() {
        assert!(serde_json::from_value::<ReceivedMessage>(json!({"type": "rename"})).is_err());
        assert!(serde_json::from_value::<ReceivedMessage>(json!({"type": "join", "documentId": "d"})).is_err());
    }

    #[test]
    fn outbound_messages_use_kebab_tags_and_camel_fields() {
        let msg = SendMessage::Change(RelayedChangeMessage {
            payload: json!("X"),
            sender_user_id: "u1".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"type": "change", "payload": "X", "senderUserId": "u1"})
        );

        let left = SendMessage::PresenceLeft(PresenceLeftMessage { connection_id: "c1".to_string() });
        assert_eq!(
            serde_json::to_value(&left).unwrap(),
            json!({"type": "presence-left", "connectionId": "c1"})
        );

        let err = SendMessage::Error(ErrorMessage {
            kind: ErrorKind::NotFound,
            message: "Document not found".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"type": "error", "kind": "not-found", "message": "Document not found"})
        );
    }
}
