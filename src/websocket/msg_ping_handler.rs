use chrono::Utc;
use tracing::debug;

use crate::models::{PingMessage, PongMessage, SendMessage, SessionError};
use crate::ws::session::Session;

/// Handle PingMessage - send a pong message back.
pub fn handle_ping_message(_ping_msg: &PingMessage, session: &Session) -> Result<(), SessionError> {
    debug!("Ping message received on connection {}", session.connection_id());

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if !session.outbox().send(pong) {
        return Err(SessionError::TransportFailure("outbound queue closed".to_string()));
    }
    Ok(())
}
