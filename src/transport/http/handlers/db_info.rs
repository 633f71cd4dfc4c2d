use crate::domain::ContentTypeId;
use crate::transport::http::dispatch;
use crate::transport::http::types::AppState;
use axum::extract::State;
use axum::response::Response;

#[utoipa::path(
    get,
    path = "/db-info",
    responses(
        (status = 200, description = "Database name, version and time precision (JSON)")
    )
)]
pub async fn db_info_handler(State(state): State<AppState>) -> Response {
    dispatch::respond(&state.registry, ContentTypeId::Json, Ok(state.backend.db_info()))
}
