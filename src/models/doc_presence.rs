use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Presence;

/// Current roster of a document room
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPresenceResponse {
    pub document_id: String,
    pub presences: Vec<Presence>,
}
