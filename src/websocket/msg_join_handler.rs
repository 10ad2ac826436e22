use tracing::{info, warn};

use crate::models::{JoinMessage, SessionError};
use crate::state::AppState;
use crate::ws::session::Session;

/// Handle JoinMessage
pub async fn handle_join_message(join_msg: &JoinMessage, session: &mut Session, app: &AppState) -> Result<(), SessionError> {
    info!("Join requested for document {} on connection {}", join_msg.document_id, session.connection_id());

    match session.join(app, &join_msg.document_id, &join_msg.token).await {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!("Join of document {} failed on connection {}: {}", join_msg.document_id, session.connection_id(), e);
            Err(e)
        }
    }
}
