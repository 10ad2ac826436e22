use utoipa::OpenApi;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::health_check,
        crate::handlers::health::ready_check,
        crate::handlers::doc_presence::doc_presence,
        crate::handlers::diagnostics::diagnostics,
    ),
    components(
        schemas(HealthResponse, DiagnosticsResponse, DocumentPresenceResponse, Presence, ErrorResponse)
    ),
    tags(
        (name = "api", description = "Session layer HTTP endpoints")
    )
)]
pub struct ApiDoc;
