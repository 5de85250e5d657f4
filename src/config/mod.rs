//! Configuration loading for the Invoicing API.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `INVOICING_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locale::Locale;

/// Minimum accepted length of the token signing secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Application configuration derived from `INVOICING_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_db_acquire_timeout_ms")]
    pub db_acquire_timeout_ms: u64,
    /// HMAC secret used to sign bearer tokens for both guards
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_seconds")]
    pub jwt_ttl_seconds: u64,
    /// Locale used when a request does not name a supported one
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
    /// Bootstrap administrator created by `seed` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Cron task scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    #[serde(default = "default_scheduler_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            database_url: default_database_url(),
            db_max_connections: default_db_max_connections(),
            db_acquire_timeout_ms: default_db_acquire_timeout_ms(),
            jwt_secret: String::new(),
            jwt_ttl_seconds: default_jwt_ttl_seconds(),
            default_locale: default_locale(),
            cors_allowed_origins: Vec::new(),
            admin_email: None,
            admin_password: None,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            tick_interval_seconds: default_scheduler_tick_interval_seconds(),
        }
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_seconds < 10 || self.tick_interval_seconds > 300 {
            return Err(ConfigError::InvalidSchedulerTickInterval {
                value: self.tick_interval_seconds,
            });
        }

        Ok(())
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Returns the fallback locale, defaulting to Czech when misconfigured.
    pub fn locale(&self) -> Locale {
        self.default_locale.parse().unwrap_or_default()
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        if !config.jwt_secret.is_empty() {
            config.jwt_secret = "[REDACTED]".to_string();
        }
        if config.admin_password.is_some() {
            config.admin_password = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error if required settings are missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        if self.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::JwtSecretTooShort {
                length: self.jwt_secret.len(),
            });
        }

        if self.jwt_ttl_seconds < 60 {
            return Err(ConfigError::InvalidJwtTtl {
                value: self.jwt_ttl_seconds,
            });
        }

        if self.default_locale.parse::<Locale>().is_err() {
            return Err(ConfigError::UnsupportedLocale {
                value: self.default_locale.clone(),
            });
        }

        match (&self.admin_email, &self.admin_password) {
            (Some(_), None) | (None, Some(_)) => return Err(ConfigError::IncompleteAdminBootstrap),
            (Some(_), Some(password)) if password.len() < 8 => {
                return Err(ConfigError::WeakAdminPassword);
            }
            _ => {}
        }

        self.scheduler.validate()?;

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_database_url() -> String {
    "postgresql://localhost:5432/invoicing".to_string()
}

fn default_db_max_connections() -> u32 {
    10
}

fn default_db_acquire_timeout_ms() -> u64 {
    5000
}

fn default_jwt_ttl_seconds() -> u64 {
    3600 * 8 // one working day
}

fn default_locale() -> String {
    "cs".to_string()
}

fn default_scheduler_enabled() -> bool {
    true
}

fn default_scheduler_tick_interval_seconds() -> u64 {
    60
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("token signing secret is missing; set INVOICING_JWT_SECRET")]
    MissingJwtSecret,
    #[error("token signing secret must be at least 32 bytes, got {length}")]
    JwtSecretTooShort { length: usize },
    #[error("token lifetime must be at least 60 seconds, got {value}")]
    InvalidJwtTtl { value: u64 },
    #[error("unsupported default locale '{value}'; expected one of cs, sk, en")]
    UnsupportedLocale { value: String },
    #[error("INVOICING_ADMIN_EMAIL and INVOICING_ADMIN_PASSWORD must be set together")]
    IncompleteAdminBootstrap,
    #[error("bootstrap admin password must be at least 8 characters")]
    WeakAdminPassword,
    #[error("scheduler tick interval must be between 10 and 300 seconds, got {value}")]
    InvalidSchedulerTickInterval { value: u64 },
}

/// Loads configuration using layered `.env` files and `INVOICING_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads `.env`, `.env.local`, `.env.<profile>`, `.env.<profile>.local`
    /// and finally the process environment, later layers winning.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("INVOICING_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let config = Self::from_layered(layered, profile_hint);

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn from_layered(mut layered: BTreeMap<String, String>, profile_hint: String) -> AppConfig {
        let mut take = |key: &str| layered.remove(key).filter(|v| !v.trim().is_empty());

        let profile = take("PROFILE").unwrap_or(profile_hint);
        let api_bind_addr = take("API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take("LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format = take("LOG_FORMAT").unwrap_or_else(default_log_format);
        let database_url = take("DATABASE_URL").unwrap_or_else(default_database_url);
        let db_max_connections = take("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_max_connections);
        let db_acquire_timeout_ms = take("DB_ACQUIRE_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_db_acquire_timeout_ms);
        let jwt_secret = take("JWT_SECRET").unwrap_or_default();
        let jwt_ttl_seconds = take("JWT_TTL_SECONDS")
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(default_jwt_ttl_seconds);
        let default_locale = take("DEFAULT_LOCALE")
            .map(|v| v.trim().to_lowercase())
            .unwrap_or_else(default_locale);
        let cors_allowed_origins = take("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let admin_email = take("ADMIN_EMAIL").map(|v| v.trim().to_string());
        let admin_password = take("ADMIN_PASSWORD");

        let scheduler = SchedulerConfig {
            enabled: take("SCHEDULER_ENABLED")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
                .unwrap_or_else(default_scheduler_enabled),
            tick_interval_seconds: take("SCHEDULER_TICK_INTERVAL_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_scheduler_tick_interval_seconds),
        };

        AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            database_url,
            db_max_connections,
            db_acquire_timeout_ms,
            jwt_secret,
            jwt_ttl_seconds,
            default_locale,
            cors_allowed_origins,
            admin_email,
            admin_password,
            scheduler,
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("INVOICING_PROFILE")
            .ok()
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("INVOICING_") {
                        values.insert(stripped.to_string(), value);
                    }
                }
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            jwt_secret: "x".repeat(MIN_JWT_SECRET_LEN),
            ..Default::default()
        }
    }

    #[test]
    fn default_config_requires_secret() {
        assert!(matches!(
            AppConfig::default().validate(),
            Err(ConfigError::MissingJwtSecret)
        ));
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn short_secret_is_rejected() {
        let config = AppConfig {
            jwt_secret: "short".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::JwtSecretTooShort { length: 5 })
        ));
    }

    #[test]
    fn admin_bootstrap_must_be_complete() {
        let config = AppConfig {
            admin_email: Some("admin@example.com".to_string()),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompleteAdminBootstrap)
        ));

        let config = AppConfig {
            admin_email: Some("admin@example.com".to_string()),
            admin_password: Some("short".to_string()),
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ConfigError::WeakAdminPassword)));
    }

    #[test]
    fn scheduler_tick_bounds() {
        let mut config = valid_config();
        config.scheduler.tick_interval_seconds = 5;
        assert!(config.validate().is_err());

        config.scheduler.tick_interval_seconds = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unsupported_locale_is_rejected() {
        let config = AppConfig {
            default_locale: "de".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnsupportedLocale { .. })
        ));
    }

    #[test]
    fn redacted_json_hides_secrets() {
        let config = AppConfig {
            admin_email: Some("admin@example.com".to_string()),
            admin_password: Some("supersecret".to_string()),
            ..valid_config()
        };

        let json = config.redacted_json().unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("supersecret"));
        assert!(!json.contains(&"x".repeat(MIN_JWT_SECRET_LEN)));
    }
}
