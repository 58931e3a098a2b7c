use std::{
    env, fs, io,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG_PATH";

/// Startup settings for the bridge. Immutable once the listener is bound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bind: SocketAddr,
    pub max_request_bytes: usize,
    pub connection_timeout_ms: u64,
    pub frame_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 7777)),
            max_request_bytes: 64 * 1024,
            connection_timeout_ms: 5_000,
            frame_interval_ms: 16,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: &Path) -> Result<Self, BridgeConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| BridgeConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let config = BridgeConfig::from_json_str(&contents)?;
        Ok(config)
    }

    /// Load from `BRIDGE_CONFIG_PATH` when set, defaults otherwise.
    pub fn from_env() -> Result<Self, BridgeConfigError> {
        match env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[derive(Debug, Error)]
pub enum BridgeConfigError {
    #[error("failed to parse bridge config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read bridge config from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = BridgeConfig::from_json_str(r#"{"bind": "0.0.0.0:9000"}"#).unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.max_request_bytes, 65_536);
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let config =
            BridgeConfig::from_json_str(r#"{"connection_timeout_ms": 250, "frame_interval_ms": 8}"#)
                .unwrap();
        assert_eq!(config.connection_timeout(), Duration::from_millis(250));
        assert_eq!(config.frame_interval(), Duration::from_millis(8));
        assert_eq!(config.bind, BridgeConfig::default().bind);
    }

    #[test]
    fn unreadable_file_names_the_path() {
        let err = BridgeConfig::from_file(Path::new("/nonexistent/bridge.json")).unwrap_err();
        assert!(matches!(err, BridgeConfigError::ReadFailed { .. }));
        assert!(err.to_string().contains("bridge.json"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(BridgeConfig::from_json_str("{\"bind\": 7}").is_err());
    }
}
