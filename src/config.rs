//! Server configuration from environment variables.
//!
//! | Variable                  | Default      |
//! |---------------------------|--------------|
//! | `HOST`                    | `0.0.0.0`    |
//! | `PORT`                    | `8080`       |
//! | `WWWROOT`                 | `./wwwroot`  |
//! | `REBUILD_MIN_INTERVAL_MS` | `0` (off)    |
//! | `SHOW_VERBOSE`            | `true`       |
//! | `SHOW_DEBUG`              | `true`       |
//!
//! `RUST_LOG`, when set, replaces the filter derived from the two `SHOW_*`
//! switches.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served as the static web root.
    pub wwwroot: PathBuf,
    /// Minimum gap between miss-triggered index rebuilds. Zero disables it.
    pub rebuild_min_interval: Duration,
    pub show_verbose: bool,
    pub show_debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            wwwroot: PathBuf::from("./wwwroot"),
            rebuild_min_interval: Duration::ZERO,
            show_verbose: true,
            show_debug: true,
        }
    }
}

impl ServerConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(host) = lookup("HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: port })?;
        }
        if let Some(root) = lookup("WWWROOT") {
            config.wwwroot = PathBuf::from(root);
        }
        if let Some(ms) = lookup("REBUILD_MIN_INTERVAL_MS") {
            let parsed: u64 = ms.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "REBUILD_MIN_INTERVAL_MS",
                value: ms,
            })?;
            config.rebuild_min_interval = Duration::from_millis(parsed);
        }
        if let Some(flag) = lookup("SHOW_VERBOSE") {
            config.show_verbose = parse_flag("SHOW_VERBOSE", flag)?;
        }
        if let Some(flag) = lookup("SHOW_DEBUG") {
            config.show_debug = parse_flag("SHOW_DEBUG", flag)?;
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Tracing filter for this crate's events.
    pub fn log_filter(&self) -> String {
        let level = if self.show_verbose {
            "trace"
        } else if self.show_debug {
            "debug"
        } else {
            "info"
        };
        format!("warn,{}={},tower_http=info", env!("CARGO_CRATE_NAME"), level)
    }
}

fn parse_flag(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.wwwroot, PathBuf::from("./wwwroot"));
        assert!(config.rebuild_min_interval.is_zero());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("WWWROOT", "/srv/www"),
            ("REBUILD_MIN_INTERVAL_MS", "250"),
            ("SHOW_VERBOSE", "false"),
            ("SHOW_DEBUG", "OFF"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.wwwroot, PathBuf::from("/srv/www"));
        assert_eq!(config.rebuild_min_interval, Duration::from_millis(250));
        assert!(!config.show_verbose);
        assert!(!config.show_debug);
        assert_eq!(config.log_filter(), "warn,surfaceserve=info,tower_http=info");
    }

    #[test]
    fn test_invalid_values() {
        let error = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert_eq!(error.to_string(), "invalid value for PORT: 'eighty'");

        assert!(config_from(&[("SHOW_DEBUG", "maybe")]).is_err());
        assert!(config_from(&[("REBUILD_MIN_INTERVAL_MS", "-1")]).is_err());
    }

    #[test]
    fn test_log_filter_levels() {
        let mut config = ServerConfig::default();
        assert_eq!(config.log_filter(), "warn,surfaceserve=trace,tower_http=info");
        config.show_verbose = false;
        assert_eq!(config.log_filter(), "warn,surfaceserve=debug,tower_http=info");
    }
}
