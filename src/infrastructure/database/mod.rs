//! MySQL access with a lazily opened connection pool

mod model;

pub use model::{BaseModel, ExecuteResult, SqlParam};

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::DatabaseSettings;
use crate::domain::DomainError;

/// Owns the database configuration and the pool built from it.
///
/// Nothing connects until [`pool`](DatabaseService::pool) is first awaited;
/// the pool is then reused for the lifetime of the service.
#[derive(Debug)]
pub struct DatabaseService {
    config: DatabaseSettings,
    pool: OnceCell<MySqlPool>,
}

impl DatabaseService {
    pub fn new(config: DatabaseSettings) -> Self {
        Self {
            config,
            pool: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &DatabaseSettings {
        &self.config
    }

    /// Whether the pool has been opened
    pub fn is_connected(&self) -> bool {
        self.pool.initialized()
    }

    /// Connection options built from the `db` settings.
    ///
    /// `database` and `username` are required.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions, DomainError> {
        let database = required(self.config.database.as_deref())
            .ok_or_else(|| DomainError::configuration("Database name is required in configuration."))?;
        let username = required(self.config.username.as_deref())
            .ok_or_else(|| DomainError::configuration("Username is required in configuration."))?;

        Ok(MySqlConnectOptions::new()
            .host(&self.config.host)
            .port(self.config.port)
            .database(database)
            .username(username)
            .password(&self.config.password)
            .charset(&self.config.encoding)
            .collation(&self.config.collation))
    }

    /// Connection string without the password, for logs
    pub fn dsn(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}?charset={}",
            self.config.username.as_deref().unwrap_or_default(),
            self.config.host,
            self.config.port,
            self.config.database.as_deref().unwrap_or_default(),
            self.config.encoding
        )
    }

    /// The shared pool, connecting on first use
    pub async fn pool(&self) -> Result<&MySqlPool, DomainError> {
        self.pool
            .get_or_try_init(|| async {
                let options = self.connect_options()?;
                let pool_config = &self.config.pool;

                info!(dsn = %self.dsn(), "Connecting to MySQL...");

                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_config.max_connections)
                    .min_connections(pool_config.min_connections)
                    .acquire_timeout(Duration::from_secs(pool_config.acquire_timeout_secs))
                    .idle_timeout(Duration::from_secs(pool_config.idle_timeout_secs))
                    .connect_with(options)
                    .await
                    .map_err(|e| DomainError::storage(format!("Failed to connect to MySQL: {}", e)))?;

                info!("MySQL connection established");
                Ok::<_, DomainError>(pool)
            })
            .await
    }

    /// Close the pool if it was opened
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}

fn required(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
