//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: `REST_DIALECT_`, `__` separates nested keys)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/rest-dialect/{service_name}/config.toml
//! 4. System directory: /etc/rest-dialect/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "things-api"
//! port = 8080
//!
//! [controller]
//! query_options = "lenient"
//! count_errors = "fail"
//! total_count_header = "X-Total-Count"
//! ```
//!
//! The same settings from the environment:
//! `REST_DIALECT_CONTROLLER__QUERY_OPTIONS=lenient`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::HeaderName;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::handlers::TOTAL_COUNT_HEADER;

const ENV_PREFIX: &str = "REST_DIALECT_";
const ENV_SEPARATOR: &str = "__";
const CONFIG_DIR: &str = "rest-dialect";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Defaults for every resource's controller
    #[serde(default)]
    pub controller: ControllerConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level or `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            port: default_port(),
            log_level: default_log_level(),
            timeout_secs: default_timeout(),
        }
    }
}

impl ServiceConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How malformed query options are handled on collection reads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// A malformed `_filters` or unknown `_order` answers 400
    #[default]
    Strict,
    /// The malformed part is dropped with a warning
    Lenient,
}

impl ParsePolicy {
    /// Check if malformed options fail the request
    #[must_use]
    pub const fn is_strict(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

/// What a collection read does when counting fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountErrorPolicy {
    /// Log a warning and report a total of 0
    #[default]
    Ignore,
    /// Answer with the error, like a failed read
    Fail,
}

/// Controller behavior shared by the resources it is given to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Handling of malformed `_filters` and `_order`
    #[serde(default)]
    pub query_options: ParsePolicy,

    /// Handling of count failures on collection reads
    #[serde(default)]
    pub count_errors: CountErrorPolicy,

    /// Header carrying the total count on collection reads
    #[serde(default = "default_total_count_header")]
    pub total_count_header: String,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            query_options: ParsePolicy::default(),
            count_errors: CountErrorPolicy::default(),
            total_count_header: default_total_count_header(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ControllerConfig {
    /// Parsed total-count header name
    ///
    /// Falls back to `X-Total-Count` if the configured name is not a valid
    /// header name. [`Config::validate`] rejects such names at load time.
    pub fn total_count_header_name(&self) -> HeaderName {
        HeaderName::from_bytes(self.total_count_header.as_bytes()).unwrap_or_else(|_| {
            tracing::warn!(
                header = %self.total_count_header,
                "Invalid total count header name, using {}", TOTAL_COUNT_HEADER
            );
            HeaderName::from_static("x-total-count")
        })
    }
}

fn default_service_name() -> String {
    "rest-dialect".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_total_count_header() -> String {
    TOTAL_COUNT_HEADER.to_string()
}

fn default_max_body_bytes() -> usize {
    2 * 1024 * 1024 // 2 MB
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name, used to locate config files, is the binary's name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(default_service_name);

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config: Config = figment.merge(Self::env()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file, plus the environment
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: Config = Self::figment_from(path).merge(Self::env()).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults merged with one TOML file, without the environment
    pub fn figment_from(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
    }

    /// Check values that deserialize fine but cannot be used
    pub fn validate(&self) -> Result<()> {
        if HeaderName::from_bytes(self.controller.total_count_header.as_bytes()).is_err() {
            return Err(Error::InvalidConfig(format!(
                "controller.total_count_header is not a valid header name: {:?}",
                self.controller.total_count_header
            )));
        }
        if self.controller.max_body_bytes == 0 {
            return Err(Error::InvalidConfig(
                "controller.max_body_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split(ENV_SEPARATOR)
    }

    /// Possible config file paths, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.port, 8080);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.service.timeout(), Duration::from_secs(30));
        assert_eq!(config.controller.query_options, ParsePolicy::Strict);
        assert_eq!(config.controller.count_errors, CountErrorPolicy::Ignore);
        assert_eq!(config.controller.total_count_header, "X-Total-Count");
        assert_eq!(config.controller.max_body_bytes, 2 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [service]
            name = "things-api"
            port = 9090

            [controller]
            query_options = "lenient"
            count_errors = "fail"
            total_count_header = "X-Count"
            "#,
        );

        let config: Config = Config::figment_from(file.path()).extract().unwrap();
        assert_eq!(config.service.name, "things-api");
        assert_eq!(config.service.port, 9090);
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.controller.query_options, ParsePolicy::Lenient);
        assert_eq!(config.controller.count_errors, CountErrorPolicy::Fail);
        assert_eq!(config.controller.total_count_header, "X-Count");
        assert_eq!(config.controller.max_body_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config: Config = Config::figment_from(dir.path().join("absent.toml"))
            .extract()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unknown_policy_is_a_config_error() {
        let file = write_config(
            r#"
            [controller]
            query_options = "sloppy"
            "#,
        );
        let result: std::result::Result<Config, _> = Config::figment_from(file.path()).extract();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_header_name() {
        let mut config = Config::default();
        config.controller.total_count_header = "X Total Count".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert_eq!(
            config.controller.total_count_header_name(),
            HeaderName::from_static("x-total-count")
        );
    }

    #[test]
    fn test_validate_rejects_zero_body_limit() {
        let mut config = Config::default();
        config.controller.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_header_name_is_case_insensitive() {
        let config = ControllerConfig {
            total_count_header: "X-Count".to_string(),
            ..ControllerConfig::default()
        };
        assert_eq!(config.total_count_header_name().as_str(), "x-count");
    }

    #[test]
    fn test_policy_helpers() {
        assert!(ParsePolicy::Strict.is_strict());
        assert!(!ParsePolicy::Lenient.is_strict());
    }
}
