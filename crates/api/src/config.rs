//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; an in-memory store is used when unset
/// - `ARTIFACT_DIR`: where receipts are written (default: `"./artifacts"`)
/// - `ARTIFACT_BASE_URL`: prefix of returned document locators
///   (default: `file://` followed by the artifact directory)
/// - `STEP_TIMEOUT_MS`: bound on every external call (default: `5000`)
/// - `APP_ENV`: environment label for request metrics (default: `"local"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub artifact_dir: PathBuf,
    pub artifact_base_url: Option<String>,
    pub step_timeout: Duration,
    pub environment: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            artifact_dir: lookup("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.artifact_dir),
            artifact_base_url: lookup("ARTIFACT_BASE_URL").filter(|url| !url.trim().is_empty()),
            step_timeout: lookup("STEP_TIMEOUT_MS")
                .and_then(|ms| ms.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.step_timeout),
            environment: lookup("APP_ENV").unwrap_or(defaults.environment),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the prefix for document locators.
    pub fn artifact_base_url(&self) -> String {
        match &self.artifact_base_url {
            Some(url) => url.clone(),
            None => format!("file://{}", self.artifact_dir.display()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            artifact_dir: PathBuf::from("./artifacts"),
            artifact_base_url: None,
            step_timeout: Duration::from_millis(5000),
            environment: "local".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert_eq!(config.step_timeout, Duration::from_secs(5));
        assert_eq!(config.environment, "local");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_values_from_environment() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("LOG_FORMAT", "JSON"),
            ("DATABASE_URL", "postgres://localhost/sales"),
            ("ARTIFACT_DIR", "/var/receipts"),
            ("STEP_TIMEOUT_MS", "250"),
            ("APP_ENV", "production"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/sales"));
        assert_eq!(config.artifact_base_url(), "file:///var/receipts");
        assert_eq!(config.step_timeout, Duration::from_millis(250));
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("PORT", "not-a-port"),
            ("STEP_TIMEOUT_MS", "0"),
            ("DATABASE_URL", "  "),
            ("LOG_FORMAT", "pretty"),
        ]);
        assert_eq!(config.port, 3000);
        assert_eq!(config.step_timeout, Duration::from_secs(5));
        assert!(config.database_url.is_none());
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_explicit_artifact_base_url() {
        let config = config_from(&[("ARTIFACT_BASE_URL", "https://cdn.example.com/docs")]);
        assert_eq!(config.artifact_base_url(), "https://cdn.example.com/docs");
    }
}
