use serde::de::DeserializeOwned;
use serde_json::Value;

use super::app_config::Settings;
use super::error::SettingsError;
use super::loader::AppEnv;

pub const REDACTED: &str = "[REDACTED]";

/// Resolved, read-only application settings.
///
/// Holds the typed [`Settings`] alongside the merged key/value tree so that
/// ad-hoc keys added to an environment file stay reachable through [`get`].
///
/// [`get`]: AppSettings::get
#[derive(Debug, Clone)]
pub struct AppSettings {
    env: AppEnv,
    settings: Settings,
    raw: Value,
}

impl AppSettings {
    pub fn new(env: AppEnv, settings: Settings, raw: Value) -> Self {
        Self { env, settings, raw }
    }

    /// Build from typed settings only, the raw tree mirrors them exactly
    pub fn from_settings(env: AppEnv, settings: Settings) -> Result<Self, SettingsError> {
        let raw = serde_json::to_value(&settings)?;
        Ok(Self::new(env, settings, raw))
    }

    pub fn env(&self) -> &AppEnv {
        &self.env
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Look up a dotted key such as `db.host`.
    ///
    /// An empty key returns the whole tree. Undefined keys are an error rather
    /// than a silent default.
    pub fn get(&self, key: &str) -> Result<&Value, SettingsError> {
        if key.is_empty() {
            return Ok(&self.raw);
        }

        let mut current = &self.raw;
        for segment in key.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };

            current = next.ok_or_else(|| SettingsError::UndefinedKey {
                key: key.to_string(),
            })?;
        }

        Ok(current)
    }

    /// The whole tree with `db.password` masked, for display
    pub fn redacted(&self) -> Value {
        let mut raw = self.raw.clone();
        if let Some(password) = raw.pointer_mut("/db/password") {
            if password.as_str().is_some_and(|p| !p.is_empty()) {
                *password = Value::String(REDACTED.to_string());
            }
        }
        raw
    }

    /// Typed variant of [`get`](AppSettings::get)
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, SettingsError> {
        let value = self.get(key)?.clone();
        serde_json::from_value(value).map_err(|e| SettingsError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })
    }
}
