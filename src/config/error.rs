use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or reading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(
        "{} not found. Create it in the config folder by copying env.example.toml and renaming it to env.toml",
        path.display()
    )]
    MissingEnvFile { path: PathBuf },

    #[error("Undefined settings key: {key}")]
    UndefinedKey { key: String },

    #[error("Invalid settings value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("Failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}
