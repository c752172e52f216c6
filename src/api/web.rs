//! Server-rendered web routes

use std::fmt;

use axum::{extract::State, response::Response, routing::get, Router};
use chrono::Local;
use serde::Serialize;
use serde_json::Value;

use super::controllers::HomeController;
use super::routes::paths;
use super::state::AppState;
use super::types::{HttpError, Json};
use crate::infrastructure::helpers::dump;

pub const GREETINGS: &str = "Reporting! Hello there!";

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub greetings: &'static str,
    pub now: String,
}

pub fn create_web_router() -> Router<AppState> {
    Router::new()
        .route(paths::HOME_INDEX, get(HomeController::index))
        .route(paths::HOME, get(HomeController::index))
        .route(paths::HOME_ERROR, get(HomeController::error))
        .route(paths::PING, get(ping))
        .route(paths::ERROR, get(raise_not_found))
        .route(paths::DEBUG_SETTINGS, get(debug_settings))
}

/// GET /ping
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        greetings: GREETINGS,
        now: Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
    })
}

/// GET /error - exercises the error-handling middleware
pub async fn raise_not_found() -> Result<Response, HttpError> {
    Err(HttpError::not_found("Something went wrong"))
}

/// GET /debug/settings - resolved settings, only in debug mode
pub async fn debug_settings(State(state): State<AppState>) -> Result<Response, HttpError> {
    if !state.debug_mode() {
        return Err(HttpError::not_found("Page not found"));
    }

    Ok(dump(&SettingsDump {
        env: state.settings.env().to_string(),
        settings: state.settings.redacted(),
    }))
}

struct SettingsDump {
    env: String,
    settings: Value,
}

impl fmt::Debug for SettingsDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pretty = serde_json::to_string_pretty(&self.settings).map_err(|_| fmt::Error)?;
        writeln!(f, "APP_ENV = {}", self.env)?;
        f.write_str(&pretty)
    }
}
