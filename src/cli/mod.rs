//! Command-line interface
//!
//! - `serve`: run the web server
//! - `settings`: print the resolved settings

pub mod serve;
pub mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_DIR;

/// Classroom MVC - a small server-rendered web application
#[derive(Parser)]
#[command(name = "classroom-mvc")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding env.toml and the settings.{env}.toml files
    #[arg(long, global = true, env = "APP_CONFIG_DIR", default_value = DEFAULT_CONFIG_DIR)]
    pub config_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the web server
    Serve,

    /// Print the resolved settings as TOML
    Settings(settings::SettingsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_config_dir() {
        let cli = Cli::parse_from(["classroom-mvc", "serve", "--config-dir", "/srv/app/config"]);
        assert!(matches!(cli.command, Command::Serve));
        assert_eq!(cli.config_dir, PathBuf::from("/srv/app/config"));
    }

    #[test]
    fn test_parse_settings_key() {
        let cli = Cli::parse_from(["classroom-mvc", "settings", "--key", "db.host"]);
        match cli.command {
            Command::Settings(args) => assert_eq!(args.key.as_deref(), Some("db.host")),
            Command::Serve => panic!("expected settings command"),
        }
    }
}
