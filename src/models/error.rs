use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

/// Category of an error reported to a client, stable across message wording.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    AuthFailure,
    NotFound,
    ProtocolViolation,
    Unavailable,
    Internal,
}

/// Failures of the session layer.
///
/// `AuthFailure`, `NotFound`, `ProtocolViolation` and `Unavailable` are
/// reported to the offending connection and never close it.
/// `PersistenceFailure` is only ever logged: an edit that fails to persist
/// has still been relayed to peers. `TransportFailure` ends the connection
/// and triggers the same cleanup as an explicit leave.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid or expired token")]
    AuthFailure { reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    ProtocolViolation(String),

    #[error("Failed to persist document: {0}")]
    PersistenceFailure(String),

    #[error("Connection lost: {0}")]
    TransportFailure(String),

    #[error("Service temporarily unavailable")]
    Unavailable { reason: String },
}

impl SessionError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolViolation(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::AuthFailure { .. } => ErrorKind::AuthFailure,
            SessionError::NotFound(_) => ErrorKind::NotFound,
            SessionError::ProtocolViolation(_) => ErrorKind::ProtocolViolation,
            SessionError::Unavailable { .. } => ErrorKind::Unavailable,
            SessionError::PersistenceFailure(_) | SessionError::TransportFailure(_) => ErrorKind::Internal,
        }
    }
}

/// Failure of an external collaborator (document store, user directory).
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("document '{0}' does not exist")]
    MissingDocument(String),

    #[error("{0}")]
    Unavailable(String),
}

impl From<BackendError> for SessionError {
    fn from(e: BackendError) -> Self {
        SessionError::Unavailable { reason: e.to_string() }
    }
}
