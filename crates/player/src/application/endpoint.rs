//! Server address normalization.
//!
//! Players type bare hosts. Tunnel providers only serve TLS, LAN hosts run the
//! plain-text server on its default port, anything else is assumed public.

use thiserror::Error;
use url::Url;

/// Port the server listens on when reached directly on a LAN.
pub const DEFAULT_LAN_PORT: u16 = 8766;

/// Tunnel providers that only serve TLS. Matched at the end of the host.
const TUNNEL_SUFFIXES: [&str; 7] = [
    ".tmole.io",
    ".trycloudflare.com",
    ".loca.lt",
    ".ngrok.io",
    ".serveo.net",
    ".pagekite.me",
    ".bore.pub",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EndpointError {
    #[error("server address is empty")]
    Empty,

    #[error("'{input}' is not a valid address: {reason}")]
    Invalid { input: String, reason: String },
}

/// Turn user input into a websocket URL.
pub fn normalize_server_url(input: &str) -> Result<String, EndpointError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(EndpointError::Empty);
    }

    let normalized = if input.starts_with("ws://") || input.starts_with("wss://") {
        input.to_string()
    } else {
        let host = strip_http_scheme(input);
        if host.is_empty() {
            return Err(EndpointError::Empty);
        }
        let lower = host.to_ascii_lowercase();
        if TUNNEL_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            format!("wss://{}", host)
        } else if is_local(&lower) {
            format!("ws://{}:{}", host, DEFAULT_LAN_PORT)
        } else {
            format!("wss://{}", host)
        }
    };

    Url::parse(&normalized).map_err(|e| EndpointError::Invalid {
        input: input.to_string(),
        reason: e.to_string(),
    })?;

    Ok(normalized)
}

fn strip_http_scheme(input: &str) -> &str {
    for scheme in ["https://", "http://"] {
        if let (Some(head), Some(rest)) = (input.get(..scheme.len()), input.get(scheme.len()..)) {
            if head.eq_ignore_ascii_case(scheme) {
                return rest;
            }
        }
    }
    input
}

/// Loopback and private ranges. `host` is lowercase.
fn is_local(host: &str) -> bool {
    if host == "localhost" || host == "127.0.0.1" {
        return true;
    }
    if host.starts_with("192.168.") || host.starts_with("10.") {
        return true;
    }
    // 172.16.0.0/12 only
    host.strip_prefix("172.")
        .and_then(|rest| rest.split_once('.'))
        .and_then(|(octet, _)| octet.parse::<u8>().ok())
        .is_some_and(|octet| (16..=31).contains(&octet))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_localhost_gets_lan_port() {
        assert_eq!(
            normalize_server_url("localhost").as_deref(),
            Ok("ws://localhost:8766")
        );
    }

    #[test]
    fn test_tunnel_hosts_use_tls() {
        assert_eq!(
            normalize_server_url("foo.trycloudflare.com").as_deref(),
            Ok("wss://foo.trycloudflare.com")
        );
        assert_eq!(
            normalize_server_url("abc.tmole.io").as_deref(),
            Ok("wss://abc.tmole.io")
        );
        assert_eq!(
            normalize_server_url("x.loca.lt").as_deref(),
            Ok("wss://x.loca.lt")
        );
    }

    #[test]
    fn test_explicit_scheme_untouched() {
        assert_eq!(
            normalize_server_url("wss://already.set").as_deref(),
            Ok("wss://already.set")
        );
        assert_eq!(
            normalize_server_url("ws://10.0.0.2:9000").as_deref(),
            Ok("ws://10.0.0.2:9000")
        );
    }

    #[test]
    fn test_private_ranges() {
        assert_eq!(
            normalize_server_url("192.168.1.20").as_deref(),
            Ok("ws://192.168.1.20:8766")
        );
        assert_eq!(
            normalize_server_url("10.1.1.1").as_deref(),
            Ok("ws://10.1.1.1:8766")
        );
        assert_eq!(
            normalize_server_url("172.16.0.4").as_deref(),
            Ok("ws://172.16.0.4:8766")
        );
    }

    #[test]
    fn test_public_host_uses_tls() {
        assert_eq!(
            normalize_server_url("1.2.3.4").as_deref(),
            Ok("wss://1.2.3.4")
        );
    }

    #[test]
    fn test_input_is_trimmed() {
        assert_eq!(
            normalize_server_url("  localhost \n").as_deref(),
            Ok("ws://localhost:8766")
        );
    }

    #[test]
    fn test_empty_and_garbage() {
        assert_eq!(normalize_server_url("   "), Err(EndpointError::Empty));
        assert!(matches!(
            normalize_server_url("bad host name"),
            Err(EndpointError::Invalid { .. })
        ));
    }

    #[test]
    fn test_loopback_address_is_local() {
        assert_eq!(
            normalize_server_url("127.0.0.1").as_deref(),
            Ok("ws://127.0.0.1:8766")
        );
    }

    #[test]
    fn test_public_172_hosts_use_tls() {
        assert_eq!(
            normalize_server_url("172.217.1.1").as_deref(),
            Ok("wss://172.217.1.1")
        );
        assert_eq!(
            normalize_server_url("172.31.255.1").as_deref(),
            Ok("ws://172.31.255.1:8766")
        );
        assert_eq!(
            normalize_server_url("172.15.0.1").as_deref(),
            Ok("wss://172.15.0.1")
        );
    }

    #[test]
    fn test_tunnel_suffix_must_end_host() {
        assert_eq!(
            normalize_server_url("abc.ngrok.io").as_deref(),
            Ok("wss://abc.ngrok.io")
        );
        assert_eq!(
            normalize_server_url("me.serveo.net").as_deref(),
            Ok("wss://me.serveo.net")
        );
        assert_eq!(
            normalize_server_url("me.pagekite.me").as_deref(),
            Ok("wss://me.pagekite.me")
        );
        assert_eq!(
            normalize_server_url("x.bore.pub").as_deref(),
            Ok("wss://x.bore.pub")
        );
        // suffix in the middle of the host does not count
        assert_eq!(
            normalize_server_url("10.0.0.1.loca.lt.example").as_deref(),
            Ok("ws://10.0.0.1.loca.lt.example:8766")
        );
    }

    #[test]
    fn test_http_prefix_is_stripped() {
        assert_eq!(
            normalize_server_url("http://foo.trycloudflare.com").as_deref(),
            Ok("wss://foo.trycloudflare.com")
        );
        assert_eq!(
            normalize_server_url("HTTPS://192.168.0.5").as_deref(),
            Ok("ws://192.168.0.5:8766")
        );
        assert_eq!(normalize_server_url("http://"), Err(EndpointError::Empty));
    }

    #[test]
    fn test_patterns_ignore_case() {
        assert_eq!(
            normalize_server_url("LOCALHOST").as_deref(),
            Ok("ws://LOCALHOST:8766")
        );
        assert_eq!(
            normalize_server_url("Foo.TryCloudflare.com").as_deref(),
            Ok("wss://Foo.TryCloudflare.com")
        );
    }
}
