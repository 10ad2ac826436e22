use tracing::debug;

use crate::models::{ChangeMessage, SessionError};
use crate::state::AppState;
use crate::ws::session::Session;

/// Handle ChangeMessage - relay to the room and persist
pub fn handle_change_message(change_msg: ChangeMessage, session: &Session, app: &AppState) -> Result<(), SessionError> {
    let peers = session.change(app, change_msg.payload)?;
    debug!("Change from connection {} queued for {} peer(s)", session.connection_id(), peers);
    Ok(())
}
