//! Configuration module for StudyOlle.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, StudyOlleError};

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL used when building links in outgoing mail.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            cors_origins: vec![],
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/studyolle.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/studyolle.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Secret used to sign session tokens (must be set).
    #[serde(default)]
    pub secret: String,
    /// Session lifetime in seconds.
    #[serde(default = "default_session_expiry")]
    pub expiry_secs: u64,
    /// Mark the session cookie `Secure` (HTTPS only).
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_session_expiry() -> u64 {
    60 * 60 * 24 * 14 // 14 days
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expiry_secs: default_session_expiry(),
            secure_cookie: false,
        }
    }
}

/// Outbound mail configuration.
///
/// When `enabled` is false, messages are written to the log instead of
/// being delivered.
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    /// Whether SMTP delivery is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// SMTP host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    /// SMTP port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    /// SMTP user name (empty for unauthenticated relays).
    #[serde(default)]
    pub smtp_username: String,
    /// SMTP password.
    #[serde(default)]
    pub smtp_password: String,
    /// Sender address.
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "StudyOlle <no-reply@studyolle.com>".to_string()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: default_from_address(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Mail configuration.
    #[serde(default)]
    pub mail: MailConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StudyOlleError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StudyOlleError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STUDYOLLE_SESSION_SECRET`: session signing secret
    /// - `STUDYOLLE_SMTP_PASSWORD`: SMTP password
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("STUDYOLLE_SESSION_SECRET") {
            if !secret.is_empty() {
                self.session.secret = secret;
            }
        }
        if let Ok(password) = std::env::var("STUDYOLLE_SMTP_PASSWORD") {
            if !password.is_empty() {
                self.mail.smtp_password = password;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the session secret is not set or the base URL
    /// does not parse.
    pub fn validate(&self) -> Result<()> {
        if self.session.secret.is_empty() {
            return Err(StudyOlleError::Config(
                "session secret is not set. \
                 Set it in config.toml or via STUDYOLLE_SESSION_SECRET environment variable."
                    .to_string(),
            ));
        }
        if let Err(e) = url::Url::parse(&self.server.base_url) {
            return Err(StudyOlleError::Config(format!(
                "server.base_url {:?} is not a valid URL: {e}",
                self.server.base_url
            )));
        }
        if self.mail.enabled && self.mail.smtp_host.is_empty() {
            return Err(StudyOlleError::Config(
                "mail is enabled but smtp_host is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.base_url, "http://localhost:8080");
        assert!(config.server.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/studyolle.db");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/studyolle.log");

        assert!(config.session.secret.is_empty());
        assert_eq!(config.session.expiry_secs, 1_209_600);
        assert!(!config.session.secure_cookie);

        assert!(!config.mail.enabled);
        assert_eq!(config.mail.smtp_port, 587);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000
base_url = "https://studyolle.com"
cors_origins = ["https://studyolle.com"]

[database]
path = "custom/db.sqlite"

[logging]
level = "debug"
file = "custom/logs/app.log"

[session]
secret = "test-secret"
expiry_secs = 3600
secure_cookie = true

[mail]
enabled = true
smtp_host = "smtp.gmail.com"
smtp_port = 465
smtp_username = "mailer"
smtp_password = "pw"
from_address = "noreply@studyolle.com"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.base_url, "https://studyolle.com");
        assert_eq!(config.server.cors_origins.len(), 1);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.session.secret, "test-secret");
        assert_eq!(config.session.expiry_secs, 3600);
        assert!(config.session.secure_cookie);
        assert!(config.mail.enabled);
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp_port, 465);
        assert_eq!(config.mail.smtp_username, "mailer");
        assert_eq!(config.mail.from_address, "noreply@studyolle.com");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/studyolle.db");
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");

        assert!(result.is_err());
        if let Err(StudyOlleError::Config(msg)) = result {
            assert!(msg.contains("config parse error"));
        } else {
            panic!("Expected Config error");
        }
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(StudyOlleError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nsecret = \"from-file\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.session.secret, "from-file");
    }

    #[test]
    fn test_apply_env_overrides_ignores_empty_value() {
        let original = std::env::var("STUDYOLLE_SMTP_PASSWORD").ok();
        std::env::set_var("STUDYOLLE_SMTP_PASSWORD", "");

        let mut config = Config::default();
        config.mail.smtp_password = "original".to_string();
        config.apply_env_overrides();

        assert_eq!(config.mail.smtp_password, "original");

        if let Some(val) = original {
            std::env::set_var("STUDYOLLE_SMTP_PASSWORD", val);
        } else {
            std::env::remove_var("STUDYOLLE_SMTP_PASSWORD");
        }
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();
        let result = config.validate();
        assert!(matches!(result, Err(StudyOlleError::Config(msg)) if msg.contains("secret")));
    }

    #[test]
    fn test_validate_with_secret() {
        let mut config = Config::default();
        config.session.secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = Config::default();
        config.session.secret = "secret".to_string();
        config.server.base_url = "localhost without scheme".to_string();
        let result = config.validate();
        assert!(matches!(result, Err(StudyOlleError::Config(msg)) if msg.contains("base_url")));
    }
}
