//! Proxy-aware client IP extraction
//!
//! Resolves the network origin of a request from forwarding headers, falling
//! back to the direct peer address the embedding server recorded. Malformed
//! header values are skipped, never fatal.

use std::net::{IpAddr, SocketAddr};

use http::header::HeaderMap;
use http::Extensions;

/// Direct peer address of the connection, inserted into request extensions by
/// the embedding server (the equivalent of a connect-info extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerAddr(pub SocketAddr);

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";
const FORWARDED: &str = "forwarded";

/// Resolves the caller's IP address.
///
/// Checks, in order: `X-Forwarded-For` (first valid hop), `X-Real-IP`,
/// RFC 7239 `Forwarded` (`for=` pairs), then the [`PeerAddr`] extension.
/// Returns `None` when no source yields a syntactically valid address.
#[must_use]
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    from_x_forwarded_for(headers)
        .or_else(|| from_x_real_ip(headers))
        .or_else(|| from_forwarded(headers))
        .or_else(|| extensions.get::<PeerAddr>().map(|peer| peer.0.ip()))
}

/// First syntactically valid hop of any `X-Forwarded-For` header.
fn from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|hop| parse_ip(hop.trim()))
}

fn from_x_real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(X_REAL_IP)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| parse_ip(value.trim()))
}

/// RFC 7239 `Forwarded` header: the first valid `for=` pair wins.
fn from_forwarded(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(FORWARDED)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split([';', ',']))
        .filter_map(|pair| {
            let (name, node) = pair.trim().split_once('=')?;
            name.eq_ignore_ascii_case("for").then_some(node)
        })
        .find_map(|node| parse_ip(node.trim().trim_matches('"')))
}

/// Parses a single node identifier into an IP address.
///
/// Accepts bare addresses, bracketed IPv6 (`[::1]`), and `ip:port` forms.
fn parse_ip(node: &str) -> Option<IpAddr> {
    if node.is_empty() {
        return None;
    }
    if let Ok(ip) = node.parse::<IpAddr>() {
        return Some(ip);
    }
    if let Ok(addr) = node.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    // Bracketed IPv6 without a port
    node.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .and_then(|inner| inner.parse::<IpAddr>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_x_forwarded_for_first_hop_wins() {
        let headers = headers_with(X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1, 10.0.0.2");
        let ip = client_ip(&headers, &Extensions::new());
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_x_forwarded_for_skips_invalid_hops() {
        let headers = headers_with(X_FORWARDED_FOR, "unknown, garbage, 198.51.100.4");
        let ip = client_ip(&headers, &Extensions::new());
        assert_eq!(ip, Some("198.51.100.4".parse().unwrap()));
    }

    #[test]
    fn test_x_real_ip_used_when_no_forwarded_for() {
        let headers = headers_with(X_REAL_IP, "2001:db8::1");
        let ip = client_ip(&headers, &Extensions::new());
        assert_eq!(ip, Some("2001:db8::1".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_header_for_pair() {
        let headers = headers_with(FORWARDED, "for=\"[2001:db8::2]:4711\";proto=https");
        let ip = client_ip(&headers, &Extensions::new());
        assert_eq!(ip, Some("2001:db8::2".parse().unwrap()));
    }

    #[test]
    fn test_peer_addr_fallback() {
        let mut extensions = Extensions::new();
        extensions.insert(PeerAddr("192.0.2.9:50123".parse().unwrap()));
        let ip = client_ip(&HeaderMap::new(), &extensions);
        assert_eq!(ip, Some("192.0.2.9".parse().unwrap()));
    }

    #[test]
    fn test_headers_take_precedence_over_peer() {
        let headers = headers_with(X_FORWARDED_FOR, "203.0.113.7");
        let mut extensions = Extensions::new();
        extensions.insert(PeerAddr("192.0.2.9:50123".parse().unwrap()));
        let ip = client_ip(&headers, &extensions);
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_unresolvable_yields_none() {
        let headers = headers_with(X_FORWARDED_FOR, "not-an-ip, also-not");
        assert_eq!(client_ip(&headers, &Extensions::new()), None);
    }

    proptest! {
        /// Arbitrary header garbage must never panic, and anything returned
        /// must be a real address.
        #[test]
        fn prop_client_ip_never_panics(value in "[ -~]{0,64}") {
            if let Ok(header_value) = HeaderValue::from_str(&value) {
                let mut headers = HeaderMap::new();
                headers.insert(X_FORWARDED_FOR, header_value);
                let _ = client_ip(&headers, &Extensions::new());
            }
        }

        /// A valid address anywhere in the first hop position is recovered.
        #[test]
        fn prop_first_valid_ipv4_recovered(a in 1u8..=254, b in 0u8..=255) {
            let ip = format!("{a}.{b}.0.1");
            let headers = headers_with(X_FORWARDED_FOR, &format!("{ip}, 10.0.0.1"));
            prop_assert_eq!(
                client_ip(&headers, &Extensions::new()),
                Some(ip.parse().unwrap())
            );
        }
    }
}
