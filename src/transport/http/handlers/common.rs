use crate::codec::DecodeError;
use crate::domain::ContentTypeId;
use crate::transport::http::dispatch;
use crate::transport::http::types::{AppState, MAX_BODY_BYTES};
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::Response;

/// The declared `Content-Type`, or `""` when absent or not visible ASCII.
pub fn declared_content_type(headers: &HeaderMap) -> &str {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Runs the auth guard for a protected route.
///
/// On failure the error is encoded with the request's content type if it
/// resolves, else as plain text.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(auth) = &state.auth else {
        return Ok(());
    };
    auth.guard(headers).await.map_err(|e| {
        let ct = ContentTypeId::resolve_or_unsupported(declared_content_type(headers));
        dispatch::respond(&state.registry, ct, Err(e))
    })
}

pub async fn read_body(body: Body) -> Result<Bytes, DecodeError> {
    axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| DecodeError(format!("failed to read request body: {}", e)))
}
