use crate::domain::{ContentTypeId, GatewayError};
use crate::transport::http::dispatch::{self, HandlerResult};
use crate::transport::http::handlers::common::{authenticate, declared_content_type, read_body};
use crate::transport::http::types::{AppState, ErrorBody};
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::Response;
use tracing::{debug, error, warn};

#[utoipa::path(
    post,
    path = "/query",
    responses(
        (status = 200, description = "Query result; body in the request's content type"),
        (status = 401, description = "Missing credentials or invalid secret", body = ErrorBody),
        (status = 422, description = "Invalid or expired token", body = ErrorBody),
        (status = 500, description = "Unreadable query or query failure", body = ErrorBody),
        (status = 503, description = "Database or connection pool unavailable", body = ErrorBody)
    )
)]
pub async fn query_handler(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    if let Err(resp) = authenticate(&state, &parts.headers).await {
        return resp;
    }

    let (ct, result) = match ContentTypeId::resolve(declared_content_type(&parts.headers)) {
        Ok(ct) => (ct, query(&state, ct, body).await),
        Err(e) => {
            warn!(error = %e, "query with unsupported content type");
            (ContentTypeId::Unsupported, Err(GatewayError::Query(e.to_string())))
        }
    };
    dispatch::respond(&state.registry, ct, result)
}

async fn query(state: &AppState, ct: ContentTypeId, body: Body) -> HandlerResult {
    let decoded = match read_body(body).await {
        Ok(bytes) => state.registry.decode_query(ct, &bytes),
        Err(e) => Err(e),
    };
    let query = decoded.map_err(|e| {
        warn!(content_type = ?ct, error = %e, "failed to decode query body");
        GatewayError::Query(e.to_string())
    })?;

    debug!(query = %query, "processing query");
    state.backend.query(&query).await.map_err(|e| {
        error!(error = %e, "query failed");
        GatewayError::from(e)
    })
}
