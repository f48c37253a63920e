//! Runtime configuration from flags, the environment and `.env` files.
//!
//! Precedence is flag, then environment, then the built-in default.

use tracing::warn;

use crate::playback::Speed;

/// Default relay bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";
/// Default relay port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default relay URL for viewers.
pub const DEFAULT_URL: &str = "ws://127.0.0.1:8080";

const HOST_VAR: &str = "FIBERSCOPE_HOST";
const PORT_VAR: &str = "FIBERSCOPE_PORT";
const ECHO_VAR: &str = "FIBERSCOPE_ECHO";
const URL_VAR: &str = "FIBERSCOPE_URL";
const SPEED_VAR: &str = "FIBERSCOPE_SPEED";

/// A configuration value could not be used.
#[derive(Debug, thiserror::Error)]
#[error("invalid {var} value {value:?}: {reason}")]
pub struct ConfigError {
    /// Variable or flag name.
    pub var: &'static str,
    /// Rejected value.
    pub value: String,
    /// Why it was rejected.
    pub reason: String,
}

/// Loads `.env` from the working directory or its parents, if present.
pub fn load_dotenv() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            warn!(error = %err, "ignoring unreadable .env file");
        }
    }
}

/// Relay server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Echo frames back to a client that is alone on the relay.
    pub echo_single_client: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            echo_single_client: true,
        }
    }
}

impl RelayConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(host) = lookup(HOST_VAR) {
            config.host = host;
        }
        if let Some(port) = lookup(PORT_VAR) {
            config.port = parse_port(PORT_VAR, &port)?;
        }
        if let Some(echo) = lookup(ECHO_VAR) {
            config.echo_single_client = parse_flag(ECHO_VAR, &echo)?;
        }
        Ok(config)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
        no_echo: bool,
    ) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        if no_echo {
            self.echo_single_client = false;
        }
        self
    }

    /// `host:port` for binding.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Viewer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerConfig {
    /// Relay URL.
    pub url: String,
    /// Playback speed.
    pub speed: Speed,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            speed: Speed::default(),
        }
    }
}

impl ViewerConfig {
    /// Reads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(URL_VAR) {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(ConfigError {
                    var: URL_VAR,
                    value: url,
                    reason: "expected a ws:// or wss:// URL".into(),
                });
            }
            config.url = url;
        }
        if let Some(speed) = lookup(SPEED_VAR) {
            config.speed = speed
                .parse()
                .map_err(|err: crate::playback::ParseSpeedError| ConfigError {
                    var: SPEED_VAR,
                    value: speed.clone(),
                    reason: err.to_string(),
                })?;
        }
        Ok(config)
    }

    /// Applies command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, url: Option<String>, speed: Option<Speed>) -> Self {
        if let Some(url) = url {
            self.url = url;
        }
        if let Some(speed) = speed {
            self.speed = speed;
        }
        self
    }
}

fn parse_port(var: &'static str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse().map_err(|err: std::num::ParseIntError| ConfigError {
        var,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError {
            var,
            value: value.to_string(),
            reason: "expected true or false".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        assert_eq!(RelayConfig::from_lookup(env(&[])).unwrap(), RelayConfig::default());
        let viewer = ViewerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(viewer.url, "ws://127.0.0.1:8080");
        assert_eq!(viewer.speed, Speed::Normal);
    }

    #[test]
    fn environment_overrides_defaults() {
        let relay = RelayConfig::from_lookup(env(&[
            ("FIBERSCOPE_HOST", "0.0.0.0"),
            ("FIBERSCOPE_PORT", "9001"),
            ("FIBERSCOPE_ECHO", "no"),
        ]))
        .unwrap();
        assert_eq!(relay.bind_addr(), "0.0.0.0:9001");
        assert!(!relay.echo_single_client);

        let viewer = ViewerConfig::from_lookup(env(&[("FIBERSCOPE_SPEED", "fast")])).unwrap();
        assert_eq!(viewer.speed, Speed::Fast);
    }

    #[test]
    fn flags_override_environment() {
        let relay = RelayConfig::from_lookup(env(&[("FIBERSCOPE_PORT", "9001")]))
            .unwrap()
            .with_overrides(None, Some(7000), true);
        assert_eq!(relay.port, 7000);
        assert_eq!(relay.host, DEFAULT_HOST);
        assert!(!relay.echo_single_client);

        let viewer =
            ViewerConfig::default().with_overrides(Some("ws://relay:1".into()), Some(Speed::Slow));
        assert_eq!(viewer.url, "ws://relay:1");
        assert_eq!(viewer.speed, Speed::Slow);
    }

    #[test]
    fn invalid_values_are_errors() {
        let err = RelayConfig::from_lookup(env(&[("FIBERSCOPE_PORT", "eighty")])).unwrap_err();
        assert_eq!(err.var, "FIBERSCOPE_PORT");
        assert!(RelayConfig::from_lookup(env(&[("FIBERSCOPE_ECHO", "maybe")])).is_err());
        assert!(ViewerConfig::from_lookup(env(&[("FIBERSCOPE_SPEED", "warp")])).is_err());
        assert!(ViewerConfig::from_lookup(env(&[("FIBERSCOPE_URL", "http://x")])).is_err());
    }
}
