use crate::{handlers::{diagnostics, doc_presence, health_check, ready_check}, routes::auth_middleware::auth_middleware, state::AppState};
use axum::{routing::get, Router, middleware};
use std::sync::Arc;

/// Create API routes
pub fn create_api_routes(app: Arc<AppState>) -> Router<Arc<AppState>> {
    let protected = Router::new()
        .route("/v1/diagnostics", get(diagnostics))
        .route("/v1/documents/:document_id/presence", get(doc_presence))
        .route_layer(middleware::from_fn_with_state(app, auth_middleware)); // Applies to all routes added above

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(ready_check))
        .merge(protected)
}
