//! Client IP extraction for the failed-attempt limiter
//!
//! `X-Forwarded-For` is only honored behind trusted proxies, otherwise it
//! could be spoofed to dodge the limiter.

use axum::http::HeaderMap;
use std::net::{IpAddr, SocketAddr};

fn is_valid_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

/// Client IP, or "unknown" when nothing trustworthy is available
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<&SocketAddr>,
    trusted_proxy_count: usize,
) -> String {
    if trusted_proxy_count > 0 {
        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| from_forwarded_for(v, trusted_proxy_count))
        {
            return ip;
        }
    }

    if let Some(addr) = socket_addr {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// With N trusted proxies the client is the entry N positions from the end
fn from_forwarded_for(header_value: &str, trusted_proxy_count: usize) -> Option<String> {
    let ips: Vec<&str> = header_value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    let position = ips.len().checked_sub(trusted_proxy_count)?;
    let candidate = ips.get(position)?;
    is_valid_ip(candidate).then(|| candidate.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(forwarded: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_str(forwarded).unwrap());
        headers
    }

    #[test]
    fn single_proxy_uses_last_entry() {
        let ip = extract_client_ip(&headers("203.0.113.7"), None, 1);
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn spoofed_prefix_is_ignored() {
        let ip = extract_client_ip(&headers("1.1.1.1, 203.0.113.7"), None, 1);
        assert_eq!(ip, "203.0.113.7");
    }

    #[test]
    fn untrusted_header_falls_back_to_socket() {
        let socket: SocketAddr = "198.51.100.2:5555".parse().unwrap();
        let ip = extract_client_ip(&headers("203.0.113.7"), Some(&socket), 0);
        assert_eq!(ip, "198.51.100.2");
        assert_eq!(extract_client_ip(&HeaderMap::new(), None, 1), "unknown");
    }

    #[test]
    fn garbage_is_not_an_ip() {
        assert_eq!(extract_client_ip(&headers("not-an-ip"), None, 1), "unknown");
    }
}
