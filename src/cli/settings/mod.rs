//! Settings command - prints the resolved settings cascade

use std::path::Path;

use clap::Args;
use serde_json::Value;

use crate::config::{AppEnv, SettingsLoader};

#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Dotted key to print, e.g. `db.host`; prints everything when omitted
    #[arg(long)]
    pub key: Option<String>,

    /// Environment to resolve instead of APP_ENV
    #[arg(long)]
    pub env: Option<String>,
}

pub fn run(config_dir: &Path, args: SettingsArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    println!("{}", render(config_dir, &args)?);
    Ok(())
}

/// Resolved settings as TOML, or a single value when a key is given.
///
/// The database password is masked.
pub fn render(config_dir: &Path, args: &SettingsArgs) -> anyhow::Result<String> {
    let mut loader = SettingsLoader::new(config_dir);
    if let Some(env) = &args.env {
        loader = loader.app_env(AppEnv::parse(env));
    }
    let settings = loader.load()?;

    let key = args.key.as_deref().unwrap_or_default();
    settings.get(key)?;

    let redacted = settings.redacted();
    let mut value = if key.is_empty() {
        redacted
    } else {
        redacted
            .pointer(&format!("/{}", key.replace('.', "/")))
            .cloned()
            .unwrap_or(Value::Null)
    };
    strip_nulls(&mut value);

    let rendered = match value {
        Value::Object(_) => {
            let header = format!("# APP_ENV = {}\n", settings.env());
            header + &toml::to_string_pretty(&value)?
        }
        Value::String(s) => s,
        Value::Null => String::new(),
        other => serde_json::to_string(&other)?,
    };

    Ok(rendered)
}

/// TOML has no null; unset values are left out
fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(strip_nulls);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    fn config_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("env.toml"),
            "[db]\ndatabase = \"school\"\nusername = \"instructor\"\npassword = \"hunter2\"\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("settings.dev.toml"),
            "[app]\ndebug_mode = true\n",
        )
        .unwrap();
        dir
    }

    fn args(key: Option<&str>) -> SettingsArgs {
        SettingsArgs {
            key: key.map(str::to_string),
            env: Some("dev".to_string()),
        }
    }

    #[test]
    fn test_render_masks_password() {
        let dir = config_dir();
        let output = render(dir.path(), &args(None)).unwrap();

        assert!(output.starts_with("# APP_ENV = dev"));
        assert!(output.contains("[db]"));
        assert!(output.contains("database = \"school\""));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("hunter2"));
    }

    #[test]
    fn test_render_single_key() {
        let dir = config_dir();
        assert_eq!(render(dir.path(), &args(Some("db.username"))).unwrap(), "instructor");
        assert_eq!(render(dir.path(), &args(Some("app.debug_mode"))).unwrap(), "true");
        assert_eq!(render(dir.path(), &args(Some("db.password"))).unwrap(), "[REDACTED]");
    }

    #[test]
    fn test_render_undefined_key_fails() {
        let dir = config_dir();
        assert!(render(dir.path(), &args(Some("db.nope"))).is_err());
    }

    #[test]
    fn test_strip_nulls() {
        let mut value = json!({"a": null, "b": {"c": null, "d": 1}, "e": [null, 2]});
        strip_nulls(&mut value);
        assert_eq!(value, json!({"b": {"d": 1}, "e": [2]}));
    }
}
