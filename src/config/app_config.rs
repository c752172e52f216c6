use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Typed application settings.
///
/// Every section falls back to its defaults, so an environment file only needs
/// to carry the keys it overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSection,
    pub server: ServerConfig,
    pub error: ErrorSettings,
    pub session: SessionSettings,
    pub logger: LoggingConfig,
    pub db: DatabaseSettings,
    pub upload: UploadSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: String,
    /// Directory every relative path below is resolved against
    pub base_dir: PathBuf,
    /// URL prefix when the app is mounted in a sub-directory, e.g. `/my-app`
    pub base_path: String,
    pub debug_mode: bool,
    /// URL path of the assets directory, also its location under `base_dir`
    pub assets_dir: String,
    pub views_dir: PathBuf,
    pub timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorSettings {
    /// Should stay false in production
    pub display_error_details: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub name: String,
    pub lifetime: u64,
    pub path: String,
    pub domain: String,
    pub secure: bool,
    pub httponly: bool,
    pub cache_limiter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    /// Directory for rolling log files; console only when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: String,
    pub encoding: String,
    pub collation: String,
    pub pool: PoolSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_size: u64,
    pub allowed_types: Vec<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "classroom-mvc".to_string(),
            base_dir: PathBuf::from("."),
            base_path: String::new(),
            debug_mode: false,
            assets_dir: "/public/assets".to_string(),
            views_dir: PathBuf::from("views"),
            timezone: "America/Toronto".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: "app_session".to_string(),
            lifetime: 30 * 557_200,
            path: "/".to_string(),
            domain: "localhost".to_string(),
            secure: false,
            httponly: true,
            cache_limiter: "nocache".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "debug".to_string(),
            format: LogFormat::default(),
            path: None,
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: None,
            username: None,
            password: String::new(),
            encoding: "utf8mb4".to_string(),
            collation: "utf8mb4_unicode_ci".to_string(),
            pool: PoolSettings::default(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 0,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
        }
    }
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public/uploads"),
            max_size: 5 * 1024 * 1024,
            allowed_types: [
                "image/jpeg",
                "image/png",
                "image/gif",
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AppSection {
    /// Resolve a path relative to the application's base directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Filesystem location of the assets directory
    pub fn assets_path(&self) -> PathBuf {
        self.resolve(self.assets_dir.trim_start_matches('/'))
    }

    /// Filesystem location of the public directory that holds the assets
    pub fn public_path(&self) -> PathBuf {
        self.resolve("public")
    }

    /// Base path normalised to either `""` or `/segment` without a trailing slash
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}
