//! `/get-token` and `/refresh-token`.
//!
//! Neither route runs the generic guard: each matches its own scheme first,
//! then resolves the content type, then calls the credential store.

use crate::app::{AuthValidator, TokenPayload};
use crate::domain::{ContentTypeId, GatewayError};
use crate::transport::http::dispatch::{self, HandlerResult};
use crate::transport::http::handlers::common::declared_content_type;
use crate::transport::http::types::{AppState, ErrorBody};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;

#[utoipa::path(
    get,
    path = "/get-token",
    responses(
        (status = 200, description = "Issued token", body = TokenPayload),
        (status = 401, description = "Missing or invalid secret", body = ErrorBody),
        (status = 415, description = "Unsupported content type", body = ErrorBody)
    )
)]
pub async fn get_token_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (ct, result) = get_token(&state, &headers).await;
    dispatch::respond(&state.registry, ct, result)
}

#[utoipa::path(
    get,
    path = "/refresh-token",
    responses(
        (status = 200, description = "Replacement token", body = TokenPayload),
        (status = 401, description = "Missing refresh token", body = ErrorBody),
        (status = 415, description = "Unsupported content type", body = ErrorBody),
        (status = 422, description = "Invalid refresh token", body = ErrorBody)
    )
)]
pub async fn refresh_token_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let (ct, result) = refresh_token(&state, &headers).await;
    dispatch::respond(&state.registry, ct, result)
}

async fn get_token(state: &AppState, headers: &HeaderMap) -> (ContentTypeId, HandlerResult) {
    let Some(auth) = &state.auth else {
        return (ContentTypeId::Unsupported, Err(auth_disabled()));
    };
    let secret = match AuthValidator::secret_from(headers) {
        Ok(secret) => secret,
        Err(e) => return (ContentTypeId::Unsupported, Err(e)),
    };
    let ct = match ContentTypeId::resolve(declared_content_type(headers)) {
        Ok(ct) => ct,
        Err(e) => return (ContentTypeId::Unsupported, Err(e)),
    };
    (ct, auth.get_token(&secret).await.and_then(to_value))
}

async fn refresh_token(state: &AppState, headers: &HeaderMap) -> (ContentTypeId, HandlerResult) {
    let Some(auth) = &state.auth else {
        return (ContentTypeId::Unsupported, Err(auth_disabled()));
    };
    let refresh = match AuthValidator::refresh_from(headers) {
        Ok(refresh) => refresh,
        Err(e) => return (ContentTypeId::Unsupported, Err(e)),
    };
    let ct = match ContentTypeId::resolve(declared_content_type(headers)) {
        Ok(ct) => ct,
        Err(e) => return (ContentTypeId::Unsupported, Err(e)),
    };
    (ct, auth.refresh_token(&refresh).await.and_then(to_value))
}

fn to_value(payload: TokenPayload) -> HandlerResult {
    serde_json::to_value(payload).map_err(|e| GatewayError::Encode(e.to_string()))
}

fn auth_disabled() -> GatewayError {
    GatewayError::NotFound("Authentication is not enabled".to_string())
}
