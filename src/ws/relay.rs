use serde_json::Value;
use tracing::debug;

use crate::models::{Presence, RelayedChangeMessage, SendMessage, SessionError};
use crate::ws::registry::PresenceRegistry;

/// Deliver an edit payload to every member of the sender's room but the sender.
///
/// Fan-out only queues onto the peers' outboxes and never awaits, so one
/// sender's edits reach each peer in the order they were published.
/// Returns the number of peers the payload was queued for.
pub fn publish(
    registry: &PresenceRegistry,
    document_id: &str,
    sender: &Presence,
    payload: Value,
) -> Result<usize, SessionError> {
    let msg = SendMessage::Change(RelayedChangeMessage {
        payload,
        sender_user_id: sender.user_id.clone(),
    });

    let delivered = registry
        .broadcast_from(document_id, &sender.connection_id, &msg)
        .ok_or_else(|| SessionError::protocol("Not in a document room"))?;

    debug!(
        "Relayed change from {} on document {} to {} peer(s)",
        sender.connection_id, document_id, delivered
    );
    Ok(delivered)
}
