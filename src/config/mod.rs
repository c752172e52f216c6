//! Settings cascade: built-in defaults, then environment-specific files, then
//! `APP__*` environment variables.

mod app_config;
mod error;
mod loader;
mod settings;

pub use app_config::{
    AppSection, DatabaseSettings, ErrorSettings, LogFormat, LoggingConfig, PoolSettings,
    ServerConfig, SessionSettings, Settings, UploadSettings,
};
pub use error::SettingsError;
pub use loader::{AppEnv, SettingsLoader, DEFAULT_CONFIG_DIR, ENV_FILE};
pub use settings::{AppSettings, REDACTED};
