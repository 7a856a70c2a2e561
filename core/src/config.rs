//! Engine configuration.
//!
//! # Load Order
//!
//! 1. Compile-time defaults
//! 2. A TOML file, when one is given
//! 3. `TESSERA_*` environment variables
//!
//! Each layer overrides the previous one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_LOG: &str = "TESSERA_LOG";
pub const ENV_LOG_FORMAT: &str = "TESSERA_LOG_FORMAT";
pub const ENV_MAX_DEPTH: &str = "TESSERA_MAX_DEPTH";
pub const ENV_WAIT_TIMEOUT_MS: &str = "TESSERA_WAIT_TIMEOUT_MS";
pub const ENV_BIND: &str = "TESSERA_BIND";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "TESSERA_REQUEST_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid_env_var(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info,tessera_runtime=debug`.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Upper bound for one request's dispatch. Nothing can answer a `waitFor`
    /// after the response, so every request ends by this deadline.
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            request_timeout_ms: 30_000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum nesting of dispatches (sub-actions, `onSuccess`, `onError`).
    pub max_depth: usize,
    /// Upper bound for `event` actions with `waitFor`. `None` waits until the scope ends.
    pub wait_timeout_ms: Option<u64>,
    pub log: LogConfig,
    pub server: ServerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 64,
            wait_timeout_ms: None,
            log: LogConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` (when given) and apply the process environment on top.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let source = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&source)?
            }
            None => Self::default(),
        };
        config.apply_env_from(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `TESSERA_*` overrides read through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(filter) = lookup(ENV_LOG) {
            self.log.filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log.format = match format.to_ascii_lowercase().as_str() {
                "pretty" => LogFormat::Pretty,
                "json" => LogFormat::Json,
                _ => return Err(ConfigError::invalid_env_var(ENV_LOG_FORMAT, "expected `pretty` or `json`")),
            };
        }
        if let Some(depth) = lookup(ENV_MAX_DEPTH) {
            self.max_depth = depth
                .parse()
                .map_err(|_| ConfigError::invalid_env_var(ENV_MAX_DEPTH, "expected a positive integer"))?;
        }
        if let Some(timeout) = lookup(ENV_WAIT_TIMEOUT_MS) {
            self.wait_timeout_ms = match timeout.as_str() {
                "" | "none" => None,
                ms => Some(ms.parse().map_err(|_| {
                    ConfigError::invalid_env_var(ENV_WAIT_TIMEOUT_MS, "expected milliseconds")
                })?),
            };
        }
        if let Some(bind) = lookup(ENV_BIND) {
            self.server.bind = bind;
        }
        if let Some(timeout) = lookup(ENV_REQUEST_TIMEOUT_MS) {
            self.server.request_timeout_ms = timeout.parse().map_err(|_| {
                ConfigError::invalid_env_var(ENV_REQUEST_TIMEOUT_MS, "expected milliseconds")
            })?;
        }
        self.validate()
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.wait_timeout_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.server.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.request_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.wait_timeout(), None);
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.server.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            wait_timeout_ms = 250

            [log]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.wait_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.log.filter, "info");
        assert_eq!(config.max_depth, 64);
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [(ENV_MAX_DEPTH, "8"), (ENV_BIND, "0.0.0.0:8080")].into();
        let mut config = EngineConfig::from_toml_str("max_depth = 32").unwrap();
        config
            .apply_env_from(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.server.bind, "0.0.0.0:8080");
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_env_from(|name| (name == ENV_LOG_FORMAT).then(|| "xml".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
        assert!(EngineConfig::from_toml_str("max_depth = 0").is_err());
        assert!(EngineConfig::from_toml_str("max_depth = \"deep\"").is_err());
        assert!(EngineConfig::from_toml_str("[server]\nrequest_timeout_ms = 0").is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nbind = \"127.0.0.1:4000\"").unwrap();
        let mut config = EngineConfig::from_toml_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        config.apply_env_from(|_| None).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:4000");

        let missing = EngineConfig::load(Some(Path::new("/definitely/not/here.toml")));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));
    }
}
