use crate::domain::{ContentTypeId, GatewayError};
use crate::transport::http::dispatch;
use crate::transport::http::types::AppState;
use axum::extract::State;
use axum::http::{header, Uri};
use axum::response::{Html, IntoResponse, Response};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Time-series gateway</title>
  <link rel="stylesheet" href="/static/layout.css">
</head>
<body>
  <h1>Time-series gateway</h1>
  <p>POST <code>/insert</code> and <code>/query</code> with a JSON, MessagePack, QPack or CSV body.</p>
  <p>Database info: <a href="/db-info">/db-info</a> &middot; API docs: <a href="/swagger-ui">/swagger-ui</a></p>
</body>
</html>
"#;

pub async fn index_handler() -> Response {
    (
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*")],
        Html(INDEX_HTML),
    )
        .into_response()
}

pub async fn not_found_handler(State(state): State<AppState>, uri: Uri) -> Response {
    dispatch::respond(
        &state.registry,
        ContentTypeId::Unsupported,
        Err(GatewayError::NotFound(format!("Not found: {}", uri.path()))),
    )
}
