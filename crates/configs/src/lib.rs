//! # configs
//!
//! Layered runtime settings. Later sources win:
//!
//! 1. built-in defaults
//! 2. `config/default.toml` (optional)
//! 3. `config/local.toml` (optional, not committed)
//! 4. environment, `ESTATE__SECTION__KEY` (a `.env` file is loaded first)
//!
//! Secrets are wrapped in [`SecretString`] so they never show up in `Debug`
//! output or logs.

use std::net::SocketAddr;
use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const ENV_PREFIX: &str = "ESTATE";
pub const MIN_SESSION_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn invalid(key: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid { key, reason: reason.into() }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub media: MediaSettings,
    pub notifications: NotificationSettings,
    pub log: LogSettings,
    #[serde(default)]
    pub redis: Option<RedisSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Holds the HTML pages and client assets.
    pub static_dir: PathBuf,
}

impl ServerSettings {
    pub fn addr(&self) -> Result<SocketAddr, SettingsError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| invalid("server.host", format!("{e}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    /// Without a URL the server runs on the in-memory store.
    #[serde(default)]
    pub url: Option<SecretString>,
    pub max_connections: u32,
    pub run_migrations: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub secret: SecretString,
    pub cookie_name: String,
    pub ttl_hours: i64,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub upload_dir: PathBuf,
    pub url_prefix: String,
    pub max_upload_bytes: usize,
    pub max_images: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationSettings {
    pub channel_capacity: usize,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directives; `RUST_LOG` still wins when set.
    pub filter: String,
    pub format: LogFormat,
}

#[derive(Debug, Deserialize)]
pub struct RedisSettings {
    pub url: SecretString,
}

impl Settings {
    /// Loads `.env`, then every layer from the working directory.
    pub fn load() -> Result<Self, SettingsError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!(path = %path.display(), "loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(invalid(".env", e.to_string())),
        }

        let settings: Settings = Self::defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// The built-in layer. Everything except the session secret has a default.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, SettingsError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.static_dir", "public")?
            .set_default("database.max_connections", 10)?
            .set_default("database.run_migrations", true)?
            .set_default("session.cookie_name", "estate_session")?
            .set_default("session.ttl_hours", 24)?
            .set_default("session.secure_cookie", false)?
            .set_default("media.upload_dir", "uploads")?
            .set_default("media.url_prefix", "/uploads")?
            .set_default("media.max_upload_bytes", 25 * 1024 * 1024)?
            .set_default("media.max_images", 10)?
            .set_default("notifications.channel_capacity", 64)?
            .set_default("notifications.keep_alive_secs", 15)?
            .set_default("log.filter", "info,tower_http=info,sqlx=warn")?
            .set_default("log.format", "pretty")?)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.session.secret.expose_secret().len() < MIN_SESSION_SECRET_LEN {
            return Err(invalid(
                "session.secret",
                format!("must be at least {MIN_SESSION_SECRET_LEN} bytes"),
            ));
        }
        if self.session.ttl_hours <= 0 {
            return Err(invalid("session.ttl_hours", "must be positive"));
        }
        if !self.media.url_prefix.starts_with('/') {
            return Err(invalid("media.url_prefix", "must start with '/'"));
        }
        // Uploads are nested under the prefix; the root is taken by the pages.
        if self.media.url_prefix.trim_end_matches('/').is_empty() {
            return Err(invalid("media.url_prefix", "must not be the site root"));
        }
        if self.media.max_images == 0 {
            return Err(invalid("media.max_images", "must allow at least one image"));
        }
        if self.notifications.channel_capacity == 0 {
            return Err(invalid("notifications.channel_capacity", "must be positive"));
        }
        if self.notifications.keep_alive_secs == 0 {
            return Err(invalid("notifications.keep_alive_secs", "must be positive"));
        }
        self.server.addr()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn build(overrides: &[(&str, &str)]) -> Result<Settings, SettingsError> {
        let mut builder = Settings::defaults()?.set_override("session.secret", SECRET)?;
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    #[test]
    fn test_defaults_are_complete() {
        let settings = build(&[]).unwrap();
        assert_eq!(settings.server.port, 3000);
        assert!(settings.database.url.is_none());
        assert!(settings.redis.is_none());
        assert_eq!(settings.log.format, LogFormat::Pretty);
        assert_eq!(settings.server.addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_secret_is_redacted_in_debug() {
        let settings = build(&[]).unwrap();
        assert!(!format!("{:?}", settings.session).contains(SECRET));
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = build(&[("session.secret", "short")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "session.secret", .. }));
    }

    #[test]
    fn test_missing_secret_fails_to_load() {
        let result: Result<Settings, _> = Settings::defaults()
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize();
        assert!(result.is_err());
    }

    #[test]
    fn test_relative_url_prefix_rejected() {
        let err = build(&[("media.url_prefix", "uploads")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "media.url_prefix", .. }));
    }

    #[test]
    fn test_zero_keep_alive_rejected() {
        let err = build(&[("notifications.keep_alive_secs", "0")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "notifications.keep_alive_secs", .. }));
    }

    #[test]
    fn test_root_url_prefix_rejected() {
        let err = build(&[("media.url_prefix", "/")]).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "media.url_prefix", .. }));
    }
}
