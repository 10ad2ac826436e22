use axum::{extract::{Path, State}, http::StatusCode, Json};
use std::sync::Arc;
use tracing::debug;

use crate::models::{DocumentPresenceResponse, ErrorResponse};
use crate::state::AppState;

/// Current roster of a document
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}/presence",
    params(("document_id" = String, Path, description = "Document identifier")),
    responses(
        (status = 200, description = "Presences in join order", body = DocumentPresenceResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Nobody is present on the document", body = ErrorResponse)
    )
)]
pub async fn doc_presence(
    State(app): State<Arc<AppState>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentPresenceResponse>, (StatusCode, Json<ErrorResponse>)> {
    debug!("Presence requested for document {}", document_id);

    match app.registry.snapshot(&document_id) {
        Some(presences) => Ok(Json(DocumentPresenceResponse { document_id, presences })),
        None => {
            let status = StatusCode::NOT_FOUND;
            Err((status, Json(ErrorResponse {
                code: status.as_u16(),
                status: status.to_string(),
                error: format!("No active room for document '{}'", document_id),
            })))
        }
    }
}
