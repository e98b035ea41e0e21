//! Server configuration loaded from environment variables.
//!
//! Every setting has a default so the server starts with zero configuration
//! for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use realty_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: none (platform data directory).
    pub database_path: Option<PathBuf>,

    /// Site name reported by `/` and `/admin/status`.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Realty"`
    pub instance_name: String,

    /// Admin API bearer token. Required to access /admin/* endpoints.
    /// Env: `ADMIN_TOKEN`
    /// Default: empty (admin API disabled).
    pub admin_token: Option<String>,

    /// Whether new accounts can be registered.
    /// Env: `REGISTRATION_OPEN` (true/false)
    /// Default: `true`
    pub registration_open: bool,

    /// How long an issued captcha stays answerable.
    /// Env: `CAPTCHA_TTL_SECS`
    /// Default: 600
    pub captcha_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: APP_NAME.to_string(),
            admin_token: None,
            registration_open: true,
            captcha_ttl: Duration::from_secs(600),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(token) = lookup("ADMIN_TOKEN") {
            if !token.is_empty() {
                config.admin_token = Some(token);
            }
        }

        if let Some(val) = lookup("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        if let Some(val) = lookup("CAPTCHA_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.captcha_ttl = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid CAPTCHA_TTL_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.database_path.is_none());
        assert_eq!(config.instance_name, "Realty");
        assert!(config.admin_token.is_none());
        assert!(config.registration_open);
        assert_eq!(config.captcha_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/realty.db"),
            ("INSTANCE_NAME", "Homes"),
            ("ADMIN_TOKEN", "s3cret"),
            ("REGISTRATION_OPEN", "0"),
            ("CAPTCHA_TTL_SECS", "30"),
        ]);
        assert_eq!(config.http_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/realty.db")));
        assert_eq!(config.instance_name, "Homes");
        assert_eq!(config.admin_token.as_deref(), Some("s3cret"));
        assert!(!config.registration_open);
        assert_eq!(config.captcha_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = config_from(&[
            ("HTTP_ADDR", "not an address"),
            ("ADMIN_TOKEN", ""),
            ("CAPTCHA_TTL_SECS", "0"),
        ]);
        assert_eq!(config.http_addr.port(), 8080);
        assert!(config.admin_token.is_none());
        assert_eq!(config.captcha_ttl, Duration::from_secs(600));
    }
}
