//! JSON API mounted under `/api`

pub mod status;
pub mod uploads;

use axum::{
    routing::{get, post},
    Router,
};

use super::routes::paths;
use super::state::AppState;

pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .route(paths::API_STATUS, get(status::status))
        .route(paths::API_UPLOADS, post(uploads::upload_files))
}
