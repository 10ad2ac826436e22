use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::services::auth_service::get_auth_token;
use crate::state::AppState;

/// Require a valid session token on HTTP routes.
///
/// The verified identity is stored in the request extensions for
/// downstream handlers.
pub async fn auth_middleware(
    State(app): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {

    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => {
            debug!("Rejecting request without token: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 2. Validate it with the identity gate
    let identity = match app.identity.verify(&token).await {
        Ok(identity) => identity,
        Err(e) => {
            warn!("Token validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Set the identity into request extensions for downstream handlers
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
