//! Client configuration.
//!
//! Every knob has a compiled-in default; environment variables override them.
//! Unparsable values are logged and ignored rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use crate::application::dedup::{DEFAULT_HIGH_WATER, DEFAULT_RETAIN};

pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_RECONNECT_BASE_MS: u64 = 2_000;
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address as typed by the user; normalized at connect time.
    pub server: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub reconnect_base_delay: Duration,
    pub max_reconnect_attempts: u32,
    pub dedup_high_water: usize,
    pub dedup_retain: usize,
    pub hide_others: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: None,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            reconnect_base_delay: Duration::from_millis(DEFAULT_RECONNECT_BASE_MS),
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            dedup_high_water: DEFAULT_HIGH_WATER,
            dedup_retain: DEFAULT_RETAIN,
            hide_others: false,
        }
    }
}

impl ClientConfig {
    /// Read `HEARTHLINK_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            Duration::from_millis(parse_or(&lookup, key, default.as_millis() as u64))
        };

        Self {
            server: lookup("HEARTHLINK_SERVER").filter(|s| !s.trim().is_empty()),
            connect_timeout: millis("HEARTHLINK_CONNECT_TIMEOUT_MS", defaults.connect_timeout),
            request_timeout: millis("HEARTHLINK_REQUEST_TIMEOUT_MS", defaults.request_timeout),
            reconnect_base_delay: millis(
                "HEARTHLINK_RECONNECT_BASE_MS",
                defaults.reconnect_base_delay,
            ),
            max_reconnect_attempts: parse_or(
                &lookup,
                "HEARTHLINK_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            ),
            dedup_high_water: defaults.dedup_high_water,
            dedup_retain: defaults.dedup_retain,
            hide_others: parse_or(&lookup, "HEARTHLINK_HIDE_OTHERS", defaults.hide_others),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, default = ?default, "Invalid config value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("HEARTHLINK_SERVER", "localhost"),
            ("HEARTHLINK_REQUEST_TIMEOUT_MS", "2500"),
            ("HEARTHLINK_MAX_RECONNECT_ATTEMPTS", "3"),
            ("HEARTHLINK_HIDE_OTHERS", "true"),
        ]));
        assert_eq!(config.server.as_deref(), Some("localhost"));
        assert_eq!(config.request_timeout, Duration::from_millis(2500));
        assert_eq!(config.max_reconnect_attempts, 3);
        assert!(config.hide_others);
    }

    #[test]
    fn test_garbage_falls_back() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("HEARTHLINK_CONNECT_TIMEOUT_MS", "soon"),
            ("HEARTHLINK_SERVER", "   "),
        ]));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.server, None);
    }
}
