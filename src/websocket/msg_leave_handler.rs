use tracing::debug;

use crate::models::{LeaveMessage, SessionError};
use crate::state::AppState;
use crate::ws::session::Session;

/// Handle LeaveMessage. Leaving while not in a room is not an error.
pub fn handle_leave_message(_leave_msg: &LeaveMessage, session: &mut Session, app: &AppState) -> Result<(), SessionError> {
    if session.leave(app).is_none() {
        debug!("Leave on connection {} outside of any room", session.connection_id());
    }
    Ok(())
}
