use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::app_config::Settings;
use super::error::SettingsError;
use super::settings::AppSettings;

/// Directory searched for settings files when none is given
pub const DEFAULT_CONFIG_DIR: &str = "config";

/// Local settings file that every deployment must provide
pub const ENV_FILE: &str = "env.toml";

/// Environment overrides are `APP__SECTION__KEY`
pub const ENV_PREFIX: &str = "APP";
pub const ENV_SEPARATOR: &str = "__";

/// Deployment environment, selects `settings.{env}.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AppEnv {
    #[default]
    Dev,
    Prod,
    Custom(String),
}

impl AppEnv {
    pub const VAR: &'static str = "APP_ENV";

    /// Read `APP_ENV`, defaulting to `dev`
    pub fn from_env() -> Self {
        std::env::var(Self::VAR)
            .map(|value| Self::parse(&value))
            .unwrap_or(Self::Dev)
    }

    /// Docker containers run with the dev settings.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "" | "dev" | "docker" => Self::Dev,
            "prod" => Self::Prod,
            other if is_valid_env_name(other) => Self::Custom(other.to_string()),
            _ => Self::Dev,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
            Self::Custom(name) => name,
        }
    }

    /// Name of the environment-specific settings file
    pub fn settings_file(&self) -> String {
        format!("settings.{}.toml", self.as_str())
    }
}

impl fmt::Display for AppEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_valid_env_name(name: &str) -> bool {
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Builds [`AppSettings`] from the settings cascade.
///
/// Sources are merged in order and the last write wins:
/// 1. built-in defaults ([`Settings::default`])
/// 2. `{config_dir}/settings.{env}.toml` (optional)
/// 3. `{config_dir}/env.toml` (required)
/// 4. `{config_dir}/../../env.toml` (optional, lives outside the app root)
/// 5. `APP__SECTION__KEY` environment variables
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    config_dir: PathBuf,
    app_env: Option<AppEnv>,
    environment: bool,
    env_vars: Option<config::Map<String, String>>,
}

impl SettingsLoader {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            app_env: None,
            environment: true,
            env_vars: None,
        }
    }

    /// Use a fixed environment instead of reading `APP_ENV`
    pub fn app_env(mut self, app_env: AppEnv) -> Self {
        self.app_env = Some(app_env);
        self
    }

    /// Toggle the `APP__*` environment variable source
    pub fn with_environment(mut self, enabled: bool) -> Self {
        self.environment = enabled;
        self
    }

    /// Read `APP__*` variables from `vars` instead of the process environment
    pub fn environment_source<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Settings files in the order they are applied
    pub fn candidate_files(&self, app_env: &AppEnv) -> Vec<PathBuf> {
        vec![
            self.config_dir.join(app_env.settings_file()),
            self.config_dir.join(ENV_FILE),
            self.config_dir.join("..").join("..").join(ENV_FILE),
        ]
    }

    pub fn load(&self) -> Result<AppSettings, SettingsError> {
        let app_env = self.app_env.clone().unwrap_or_else(AppEnv::from_env);

        let env_file = self.config_dir.join(ENV_FILE);
        if !env_file.is_file() {
            return Err(SettingsError::MissingEnvFile { path: env_file });
        }

        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?);

        for file in self.candidate_files(&app_env) {
            if !file.is_file() {
                debug!(path = %file.display(), "Settings file not present, skipping");
                continue;
            }

            debug!(path = %file.display(), "Applying settings file");
            builder = builder.add_source(config::File::from(file).required(true));
        }

        if self.environment {
            builder = builder.add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(self.env_vars.clone()),
            );
        }

        let merged = builder.build()?;
        let raw: serde_json::Value = merged.clone().try_deserialize()?;
        let settings: Settings = merged.try_deserialize()?;

        Ok(AppSettings::new(app_env, settings, raw))
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_app_env_parse() {
        assert_eq!(AppEnv::parse("dev"), AppEnv::Dev);
        assert_eq!(AppEnv::parse("docker"), AppEnv::Dev);
        assert_eq!(AppEnv::parse(" PROD "), AppEnv::Prod);
        assert_eq!(AppEnv::parse("staging"), AppEnv::Custom("staging".to_string()));
        assert_eq!(AppEnv::parse("../etc"), AppEnv::Dev);
        assert_eq!(AppEnv::parse(""), AppEnv::Dev);
    }

    #[test]
    fn test_settings_file_name() {
        assert_eq!(AppEnv::Prod.settings_file(), "settings.prod.toml");
        assert_eq!(
            AppEnv::Custom("qa".to_string()).settings_file(),
            "settings.qa.toml"
        );
    }

    #[test]
    fn test_missing_env_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = SettingsLoader::new(dir.path())
            .app_env(AppEnv::Dev)
            .with_environment(false)
            .load();

        let err = result.unwrap_err();
        assert!(matches!(err, SettingsError::MissingEnvFile { .. }));
        assert!(err.to_string().contains("env.example.toml"));
    }

    #[test]
    fn test_cascade_last_write_wins() {
        let root = tempfile::tempdir().unwrap();
        let config_dir = root.path().join("site").join("app").join("config");

        write(
            &config_dir.join("settings.dev.toml"),
            r#"
            [app]
            debug_mode = true

            [error]
            display_error_details = true

            [db]
            database = "your_database_name"
            "#,
        );
        write(
            &config_dir.join("env.toml"),
            r#"
            [db]
            database = "worldcup"
            username = "student"
            "#,
        );
        write(
            &root.path().join("site").join("env.toml"),
            r#"
            [db]
            password = "s3cret"
            "#,
        );

        let settings = SettingsLoader::new(&config_dir)
            .app_env(AppEnv::Dev)
            .with_environment(false)
            .load()
            .unwrap();

        let typed = settings.settings();
        assert!(typed.app.debug_mode);
        assert!(typed.error.display_error_details);
        assert_eq!(typed.db.database.as_deref(), Some("worldcup"));
        assert_eq!(typed.db.username.as_deref(), Some("student"));
        assert_eq!(typed.db.password, "s3cret");
        assert_eq!(typed.db.host, "localhost");
        assert_eq!(settings.env(), &AppEnv::Dev);
    }

    #[test]
    fn test_prod_ignores_dev_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("settings.dev.toml"),
            "[error]\ndisplay_error_details = true\n",
        );
        write(&dir.path().join("env.toml"), "[server]\nport = 9000\n");

        let settings = SettingsLoader::new(dir.path())
            .app_env(AppEnv::Prod)
            .with_environment(false)
            .load()
            .unwrap();

        assert!(!settings.settings().error.display_error_details);
        assert_eq!(settings.settings().server.port, 9000);
    }

    #[test]
    fn test_environment_overrides_files() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("env.toml"),
            "[server]\nport = 9000\n\n[db.pool]\nmax_connections = 20\n",
        );

        let settings = SettingsLoader::new(dir.path())
            .app_env(AppEnv::Dev)
            .environment_source([
                ("APP__SERVER__PORT", "9100"),
                ("APP__DB__POOL__MAX_CONNECTIONS", "3"),
                ("APP__DB__HOST", "db.internal"),
                ("APP_ENV", "prod"),
                ("OTHER__SERVER__PORT", "1"),
            ])
            .load()
            .unwrap();

        let typed = settings.settings();
        assert_eq!(typed.server.port, 9100);
        assert_eq!(typed.db.pool.max_connections, 3);
        assert_eq!(typed.db.host, "db.internal");
        assert_eq!(settings.get("db.host").unwrap(), "db.internal");
    }

    #[test]
    fn test_environment_disabled_ignores_variables() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("env.toml"), "[server]\nport = 9000\n");

        let settings = SettingsLoader::new(dir.path())
            .app_env(AppEnv::Dev)
            .environment_source([("APP__SERVER__PORT", "9100")])
            .with_environment(false)
            .load()
            .unwrap();

        assert_eq!(settings.settings().server.port, 9000);
    }
}
