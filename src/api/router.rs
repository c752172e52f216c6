use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::controllers::HomeController;
use super::middleware::{error_handling_middleware, logging_middleware};
use super::rest;
use super::routes::API_PREFIX;
use super::state::AppState;
use super::types::HttpError;
use super::web;
use crate::infrastructure::upload::UPLOADS_URL_PREFIX;

/// URL prefix the public directory is served under
pub const PUBLIC_URL_PREFIX: &str = "/public";

/// Multipart framing allowance on top of the file payload
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;
/// Files accepted per upload request at the maximum size
const MAX_FILES_PER_REQUEST: usize = 10;

/// Build the application router, mounted under `app.base_path`
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.settings();
    let public_dir = settings.app.public_path();
    let upload_dir = state.uploads.upload_dir().to_path_buf();
    let body_limit = body_limit(settings.upload.max_size);

    let app = Router::new()
        .merge(web::create_web_router())
        .nest(API_PREFIX, rest::create_api_router())
        .nest_service(PUBLIC_URL_PREFIX, ServeDir::new(public_dir))
        .nest_service(UPLOADS_URL_PREFIX, ServeDir::new(upload_dir))
        .fallback(not_found);

    let base_path = state.base_path().to_string();
    let app = if base_path.is_empty() {
        app
    } else {
        Router::new()
            .route(&format!("{}/", base_path), get(HomeController::index))
            .nest(&base_path, app)
            .fallback(not_found)
    };

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn_with_state(state.clone(), error_handling_middleware))
        .layer(from_fn(logging_middleware))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn not_found() -> HttpError {
    HttpError::not_found("Page not found")
}

fn body_limit(max_upload_size: u64) -> usize {
    usize::try_from(max_upload_size)
        .unwrap_or(usize::MAX)
        .saturating_mul(MAX_FILES_PER_REQUEST)
        .saturating_add(BODY_LIMIT_OVERHEAD)
}
