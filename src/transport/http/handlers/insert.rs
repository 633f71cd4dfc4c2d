use crate::domain::{ContentTypeId, GatewayError};
use crate::transport::http::dispatch::{self, HandlerResult};
use crate::transport::http::handlers::common::{authenticate, declared_content_type, read_body};
use crate::transport::http::types::{AppState, ErrorBody};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use tracing::{error, warn};

/// Auth guard, then resolve, read, decode and hand the payload to the backend.
/// Every branch ends in `dispatch::respond`.
#[utoipa::path(
    post,
    path = "/insert",
    responses(
        (status = 200, description = "Points inserted; body in the request's content type"),
        (status = 401, description = "Missing credentials or invalid secret", body = ErrorBody),
        (status = 422, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Unreadable body or insert failure", body = ErrorBody),
        (status = 503, description = "Database or connection pool unavailable", body = ErrorBody)
    )
)]
pub async fn insert_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    if let Err(resp) = authenticate(&state, &parts.headers).await {
        return resp;
    }

    let (ct, result) = match ContentTypeId::resolve(declared_content_type(&parts.headers)) {
        Ok(ct) => (ct, insert(&state, ct, body).await),
        Err(e) => {
            warn!(error = %e, "insert with unsupported content type");
            (ContentTypeId::Unsupported, Err(GatewayError::Insert(e.to_string())))
        }
    };
    dispatch::respond(&state.registry, ct, result)
}

async fn insert(state: &AppState, ct: ContentTypeId, body: Body) -> HandlerResult {
    let decoded = match read_body(body).await {
        Ok(bytes) => state.registry.decode_insert(ct, &bytes),
        Err(e) => Err(e),
    };
    let payload = decoded.map_err(|e| {
        warn!(content_type = ?ct, error = %e, "failed to decode insert body");
        GatewayError::Insert(e.to_string())
    })?;

    state.backend.insert(payload).await.map_err(|e| {
        error!(error = %e, "insert failed");
        GatewayError::from(e)
    })
}
