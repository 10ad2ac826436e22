use serde_json::Value;
use tracing::{info, warn};

use crate::models::{Presence, SessionError};
use crate::state::AppState;
use crate::ws::outbox::Outbox;
use crate::ws::relay;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    /// Open connection, no identity, no room.
    Connected,
    /// Joined to a document room.
    InRoom { document_id: String, presence: Presence },
    /// Transport gone. Terminal.
    Closed,
}

/// Per-connection session.
///
/// Holds only identifiers of its room; the room itself is owned by the
/// presence registry and reached through it.
pub struct Session {
    connection_id: String,
    outbox: Outbox,
    state: SessionState,
}

impl Session {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            connection_id: outbox.connection_id().to_string(),
            outbox,
            state: SessionState::Connected,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn document_id(&self) -> Option<&str> {
        match &self.state {
            SessionState::InRoom { document_id, .. } => Some(document_id),
            _ => None,
        }
    }

    /// Authenticate against a document and enter its room.
    ///
    /// Token, document and user are all checked before anything changes: on
    /// failure the session keeps its current state, room included. On
    /// success a session already in a room leaves it first. Returns the
    /// roster including this connection.
    pub async fn join(&mut self, app: &AppState, document_id: &str, token: &str) -> Result<Vec<Presence>, SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::protocol("Connection is closed"));
        }

        let identity = app.identity.verify(token).await.map_err(|e| {
            warn!("Join rejected for connection {}: {}", self.connection_id, e);
            SessionError::AuthFailure { reason: e.to_string() }
        })?;

        if !app.documents.exists(document_id).await? {
            return Err(SessionError::NotFound("Document"));
        }

        let profile = app
            .users
            .find_user(&identity.user_id)
            .await?
            .ok_or(SessionError::NotFound("User"))?;

        if matches!(self.state, SessionState::InRoom { .. }) {
            self.leave(app);
        }

        let presence = Presence::new(&identity, &profile, &self.connection_id);
        let roster = app.registry.join(document_id, presence.clone(), self.outbox.clone());
        info!(
            "User {} joined document {} on connection {} ({} present)",
            presence.username,
            document_id,
            self.connection_id,
            roster.len()
        );

        self.state = SessionState::InRoom {
            document_id: document_id.to_string(),
            presence,
        };
        Ok(roster)
    }

    /// Leave the current room, if any. The connection stays open.
    pub fn leave(&mut self, app: &AppState) -> Option<Presence> {
        let SessionState::InRoom { document_id, .. } = &self.state else {
            return None;
        };
        let removed = app.registry.leave(document_id, &self.connection_id);
        if let Some(presence) = &removed {
            info!("User {} left document {}", presence.username, document_id);
        }
        self.state = SessionState::Connected;
        removed
    }

    /// Relay an edit to the room's other members and persist it.
    ///
    /// Returns the number of peers the edit was queued for.
    pub fn change(&self, app: &AppState, payload: Value) -> Result<usize, SessionError> {
        let SessionState::InRoom { document_id, presence } = &self.state else {
            return Err(SessionError::protocol("Not in a document room"));
        };

        let delivered = relay::publish(&app.registry, document_id, presence, payload.clone())?;
        app.persistence.persist(document_id, payload);
        Ok(delivered)
    }

    /// Transport closed: leave any room and end the session.
    pub fn close(&mut self, app: &AppState) {
        if self.state == SessionState::Closed {
            return;
        }
        self.leave(app);
        self.state = SessionState::Closed;
    }

    /// Send an error to this connection only.
    pub fn report(&self, err: &SessionError) {
        self.outbox.report(err);
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, SendMessage};
    use crate::services::auth_service::tests::token_for;
    use crate::state::test_support::fixture;
    use crate::ws::outbox::Outbound;
    use serde_json::json;
    use tokio::sync::mpsc::Receiver;

    fn drain(rx: &mut Receiver<Outbound>) -> Vec<SendMessage> {
        let mut out = Vec::new();
        while let Ok(item) = rx.try_recv() {
            if let Outbound::Message(msg) = item {
                out.push(msg);
            }
        }
        out
    }

    fn session(conn: &str) -> (Session, Receiver<Outbound>) {
        let (outbox, rx) = Outbox::channel(conn);
        (Session::new(outbox), rx)
    }

    #[tokio::test]
    async fn join_moves_to_room_and_returns_roster() {
        let f = fixture();
        let (mut a, mut rx_a) = session("a");

        let roster = a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();

        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].username, "alice");
        assert_eq!(roster[0].connection_id, "a");
        assert_eq!(a.document_id(), Some("doc1"));
        assert!(matches!(&drain(&mut rx_a)[..], [SendMessage::Roster(r)] if r.document_id == "doc1"));
    }

    #[tokio::test]
    async fn failed_joins_keep_connection_in_connected_state() {
        let f = fixture();
        let (mut a, _rx) = session("a");

        let err = a.join(&f.app, "doc1", "garbage").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AuthFailure);

        let err = a.join(&f.app, "nope", &token_for("u1", "alice@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "Document not found");

        let err = a.join(&f.app, "doc1", &token_for("ghost", "g@example.com")).await.unwrap_err();
        assert_eq!(err.to_string(), "User not found");

        assert_eq!(a.state(), &SessionState::Connected);
        assert_eq!(f.app.registry.snapshot("doc1"), None);
    }

    #[tokio::test]
    async fn failed_rejoin_keeps_current_room() {
        let f = fixture();
        let (mut a, _rx) = session("a");
        let token = token_for("u1", "alice@example.com");
        a.join(&f.app, "doc1", &token).await.unwrap();

        assert!(a.join(&f.app, "nope", &token).await.is_err());
        assert_eq!(a.document_id(), Some("doc1"));
        assert_eq!(f.app.registry.snapshot("doc1").map(|r| r.len()), Some(1));
    }

    #[tokio::test]
    async fn rejoining_elsewhere_leaves_old_room_first() {
        let f = fixture();
        let (mut a, _rx_a) = session("a");
        let (mut b, mut rx_b) = session("b");
        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();
        b.join(&f.app, "doc1", &token_for("u2", "bob@example.com")).await.unwrap();
        drain(&mut rx_b);

        a.join(&f.app, "doc2", &token_for("u1", "alice@example.com")).await.unwrap();

        assert_eq!(a.document_id(), Some("doc2"));
        assert_eq!(f.app.registry.room_of("a"), Some("doc2".to_string()));
        let to_b = drain(&mut rx_b);
        assert!(matches!(&to_b[..], [SendMessage::PresenceLeft(m)] if m.connection_id == "a"));
    }

    #[tokio::test]
    async fn change_relays_and_persists() {
        let f = fixture();
        let (mut a, mut rx_a) = session("a");
        let (mut b, mut rx_b) = session("b");
        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();
        b.join(&f.app, "doc1", &token_for("u2", "bob@example.com")).await.unwrap();
        drain(&mut rx_a);
        drain(&mut rx_b);

        assert_eq!(a.change(&f.app, json!("X")).unwrap(), 1);

        assert!(drain(&mut rx_a).is_empty());
        match &drain(&mut rx_b)[..] {
            [SendMessage::Change(change)] => {
                assert_eq!(change.payload, json!("X"));
                assert_eq!(change.sender_user_id, "u1");
            }
            other => panic!("unexpected {:?}", other),
        }

        for _ in 0..100 {
            if f.store.content("doc1") == Some(json!("X")) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("edit was never persisted");
    }

    #[tokio::test]
    async fn change_outside_room_is_a_protocol_violation() {
        let f = fixture();
        let (mut a, _rx) = session("a");
        let err = a.change(&f.app, json!("X")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);

        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();
        a.leave(&f.app);
        assert!(a.change(&f.app, json!("X")).is_err());
        assert_eq!(f.store.writes(), 0);
    }

    #[tokio::test]
    async fn persistence_failure_does_not_block_relay() {
        let f = fixture();
        f.store.set_fail_writes(true);
        let (mut a, _rx_a) = session("a");
        let (mut b, mut rx_b) = session("b");
        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();
        b.join(&f.app, "doc1", &token_for("u2", "bob@example.com")).await.unwrap();
        drain(&mut rx_b);

        assert_eq!(a.change(&f.app, json!("Y")).unwrap(), 1);
        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn close_cleans_up_and_is_terminal() {
        let f = fixture();
        let (mut a, _rx) = session("a");
        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();

        a.close(&f.app);
        a.close(&f.app);
        assert_eq!(a.state(), &SessionState::Closed);
        assert_eq!(f.app.registry.snapshot("doc1"), None);

        let err = a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolViolation);
    }

    #[tokio::test]
    async fn leave_then_close_is_harmless() {
        let f = fixture();
        let (mut a, _rx_a) = session("a");
        let (mut b, mut rx_b) = session("b");
        a.join(&f.app, "doc1", &token_for("u1", "alice@example.com")).await.unwrap();
        b.join(&f.app, "doc1", &token_for("u2", "bob@example.com")).await.unwrap();
        drain(&mut rx_b);

        assert!(a.leave(&f.app).is_some());
        assert!(a.leave(&f.app).is_none());
        a.close(&f.app);

        assert_eq!(drain(&mut rx_b).len(), 1);
    }

    #[tokio::test]
    async fn valid_token_for_removed_user_is_not_found() {
        let f = fixture();
        f.users.remove("u2");
        let (mut b, _rx) = session("b");
        let err = b.join(&f.app, "doc1", &token_for("u2", "bob@example.com")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(f.users.lookups(), 1);
    }
}
