//! Client configuration.
//!
//! Defaults point at a local server; every field can be overridden through
//! environment variables:
//!
//! - `DART_DUEL_HOST`: server host (default: "localhost")
//! - `DART_DUEL_PORT`: server port (default: 5000)
//! - `DART_DUEL_MALFORMED_FRAMES`: "skip" or "disconnect" (default: "skip")

use dart_duel_types::{DEFAULT_HOST, DEFAULT_PORT};

/// What the message bridge does with a line that is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MalformedFramePolicy {
    /// Log the line and keep reading.
    #[default]
    Skip,
    /// Stop reading; the connection is considered dead.
    Disconnect,
}

impl MalformedFramePolicy {
    /// Parse a policy name (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("skip") {
            Some(Self::Skip)
        } else if s.eq_ignore_ascii_case("disconnect") {
            Some(Self::Disconnect)
        } else {
            None
        }
    }
}

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub malformed_frames: MalformedFramePolicy,
    /// Name given to the background receive thread.
    pub bridge_thread_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            malformed_frames: MalformedFramePolicy::Skip,
            bridge_thread_name: "dart-duel-bridge".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let host = var("DART_DUEL_HOST")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);

        let port = var("DART_DUEL_PORT")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let malformed_frames = var("DART_DUEL_MALFORMED_FRAMES")
            .and_then(|s| MalformedFramePolicy::from_str(s.trim()))
            .unwrap_or(defaults.malformed_frames);

        Self {
            host,
            port,
            malformed_frames,
            bridge_thread_name: defaults.bridge_thread_name,
        }
    }

    /// `host:port` as passed to the resolver.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_local_server() {
        let config = ClientConfig::default();
        assert_eq!(config.address(), "localhost:5000");
        assert_eq!(config.malformed_frames, MalformedFramePolicy::Skip);
    }

    #[test]
    fn reads_overrides() {
        let config = ClientConfig::from_vars(vars(&[
            ("DART_DUEL_HOST", "10.0.0.7"),
            ("DART_DUEL_PORT", "6000"),
            ("DART_DUEL_MALFORMED_FRAMES", "Disconnect"),
        ]));
        assert_eq!(config.address(), "10.0.0.7:6000");
        assert_eq!(config.malformed_frames, MalformedFramePolicy::Disconnect);
    }

    #[test]
    fn bad_values_fall_back_to_defaults() {
        let config = ClientConfig::from_vars(vars(&[
            ("DART_DUEL_HOST", "  "),
            ("DART_DUEL_PORT", "seventy"),
            ("DART_DUEL_MALFORMED_FRAMES", "explode"),
        ]));
        assert_eq!(config.address(), "localhost:5000");
        assert_eq!(config.malformed_frames, MalformedFramePolicy::Skip);
    }

    #[test]
    fn from_env_does_not_panic() {
        let _config = ClientConfig::from_env();
    }
}
