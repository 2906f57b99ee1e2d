use axum::Json;
use tracing::debug;
use uuid::Uuid;

use crate::models::SessionResponse;

/// GET `/session`: mints a fresh opaque session token for a page visit.
pub async fn new_session_handler() -> Json<SessionResponse> {
    let session = Uuid::new_v4().simple().to_string();
    debug!(%session, "issued session token");
    Json(SessionResponse { session })
}

/// GET `/health`
pub async fn health_handler() -> &'static str {
    "ok"
}
