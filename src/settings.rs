//! Server and database settings, read from `config.toml` and the process environment.

use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::env;

pub const DEFAULT_CONFIG_PATH: &str = "config";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LogSettings {
    /// A `tracing_subscriber::EnvFilter` directive, e.g. `info,class_attendance=debug`.
    pub filter: String,
}

impl Settings {
    /// Loads settings from the optional config file at `path` (any extension the `config` crate
    /// understands), overridden by `HOST`, `PORT`, `DATABASE_URL` and `RUST_LOG`. A `.env` file
    /// in the working directory is read first.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::load_with_env(path, |key| env::var(key).ok())
    }

    /// Like [`Settings::load`], but looks environment variables up through `lookup`.
    pub fn load_with_env(
        path: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.url", "attendance.db")?
            .set_default("log.filter", "info")?
            .add_source(File::with_name(path).required(false))
            .set_override_option("server.host", lookup("HOST"))?
            .set_override_option("server.port", lookup("PORT"))?
            .set_override_option("database.url", lookup("DATABASE_URL"))?
            .set_override_option("log.filter", lookup("RUST_LOG"))?
            .build()?
            .try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");

        let settings = Settings::load_with_env(path.to_str().unwrap(), no_env).unwrap();
        assert_eq!(settings.bind_address(), "0.0.0.0:5000");
        assert_eq!(settings.database.url, "attendance.db");
        assert_eq!(settings.log.filter, "info");
    }

    #[test]
    fn file_then_environment() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[server]\nhost = \"127.0.0.1\"\nport = 8080\n\n[database]\nurl = \"school.db\"\n",
        )
        .unwrap();

        let settings = Settings::load_with_env(path.to_str().unwrap(), no_env).unwrap();
        assert_eq!(settings.bind_address(), "127.0.0.1:8080");
        assert_eq!(settings.database.url, "school.db");

        let settings = Settings::load_with_env(path.to_str().unwrap(), |key| match key {
            "PORT" => Some("9000".to_string()),
            "DATABASE_URL" => Some(":memory:".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.bind_address(), "127.0.0.1:9000");
        assert_eq!(settings.database.url, ":memory:");
    }

    #[test]
    fn bad_port_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing");

        let result = Settings::load_with_env(path.to_str().unwrap(), |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }
}
