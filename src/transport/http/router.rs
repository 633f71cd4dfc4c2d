use crate::app::TokenPayload;
use crate::transport::http::handlers::{db_info, insert, query, token, web};
use crate::transport::http::types::{AppState, ErrorBody};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        db_info::db_info_handler,
        insert::insert_handler,
        query::query_handler,
        token::get_token_handler,
        token::refresh_token_handler
    ),
    components(schemas(ErrorBody, TokenPayload))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    let mut router = Router::new()
        .route("/db-info", get(db_info::db_info_handler))
        .route("/insert", post(insert::insert_handler))
        .route("/query", post(query::query_handler));

    if let Some(auth) = &app_state.auth {
        info!(token_required = auth.token_required(), "enable authentication routes");
        router = router
            .route("/get-token", get(token::get_token_handler))
            .route("/refresh-token", get(token::refresh_token_handler));
    }

    if let Some(web_options) = &app_state.web {
        info!(static_dir = %web_options.static_dir.display(), "enable web server routes");
        router = router
            .route("/", get(web::index_handler))
            .nest_service("/static", ServeDir::new(&web_options.static_dir))
            .route_service(
                "/favicon.ico",
                ServeFile::new(web_options.static_dir.join("favicon.ico")),
            )
            .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .fallback(web::not_found_handler)
        .with_state(app_state)
        .layer(cors)
}
