use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A user identity as verified by the identity gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedIdentity {
    pub user_id: String,
    pub email: String,
}

/// Display profile of a user, as returned by the user directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
}

/// One connection's participation in a document room.
///
/// Presences are never deduplicated by user: the same user connected
/// twice holds two independent presences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub connection_id: String,
}

impl Presence {
    pub fn new(identity: &VerifiedIdentity, profile: &UserProfile, connection_id: &str) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            connection_id: connection_id.to_string(),
        }
    }
}
