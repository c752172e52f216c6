//! Classroom MVC
//!
//! A small server-rendered web application skeleton:
//! - Named routes dispatched to controllers or inline handlers
//! - File-based views with escaping, includes and asset helpers
//! - Layered settings with per-environment files
//! - A lazily connected MySQL service and a model base
//! - Validated file uploads

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::{AppSettings, SettingsLoader};

use api::state::AppState;
use tracing::{info, warn};

/// Build the application state from resolved settings.
///
/// The upload directory is created if missing; the database is only
/// connected when first used.
pub async fn create_app_state(settings: AppSettings) -> anyhow::Result<AppState> {
    info!(env = %settings.env(), "Creating application state");

    let state = AppState::new(settings);

    let upload_dir = state.uploads.upload_dir();
    tokio::fs::create_dir_all(upload_dir).await?;
    info!(path = %upload_dir.display(), "Upload directory ready");

    if !state.views.views_dir().is_dir() {
        warn!(
            path = %state.views.views_dir().display(),
            "Views directory does not exist"
        );
    }

    if state.debug_mode() {
        warn!("Debug mode is enabled; templates are re-read on every request");
    }

    Ok(state)
}

/// Load settings from `config_dir` and build the application state
pub async fn create_app_state_from_dir(
    config_dir: impl Into<std::path::PathBuf>,
) -> anyhow::Result<AppState> {
    let settings = SettingsLoader::new(config_dir).load()?;
    create_app_state(settings).await
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::config::{AppEnv, Settings};

    #[tokio::test]
    async fn test_create_app_state_creates_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.app.base_dir = dir.path().to_path_buf();
        let settings = AppSettings::from_settings(AppEnv::Dev, settings).unwrap();

        let state = create_app_state(settings).await.unwrap();
        assert!(dir.path().join("public/uploads").is_dir());
        assert!(!state.db.is_connected());
    }

    #[tokio::test]
    async fn test_create_app_state_requires_env_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("config")).unwrap();

        let err = create_app_state_from_dir(dir.path().join("config"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("env.toml"));
    }
}
