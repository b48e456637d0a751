//! The proxy-trust front door: reconstructs the authoritative
//! scheme/host/port/remote-address from `Forwarded` / `X-Forwarded-*`
//! headers under a configurable trust policy.

use std::net::IpAddr;

use crate::config::ProxyTrust;
use crate::http::HeaderMap;
use crate::request::Origin;

/// Builds the authoritative [`Origin`] for a request.
///
/// If the peer is untrusted under `trust`, proxy headers are ignored
/// entirely (logged at error level) and direct mode is used — scheme/host
/// come from the connection itself and `Host`, remote from the peer
/// address.
pub fn resolve(
    headers: &HeaderMap,
    peer: IpAddr,
    direct_scheme: &str,
    trust: &ProxyTrust,
) -> Origin {
    if !trust.trusts(peer) {
        if headers.contains("forwarded") || headers.contains("x-forwarded-for") {
            tracing::error!(%peer, "ignoring proxy headers from untrusted peer");
        }
        return direct_origin(headers, peer, direct_scheme);
    }

    if let Some(forwarded) = headers.get_one("forwarded") {
        if let Some(origin) = from_forwarded(forwarded, peer, direct_scheme, headers) {
            return origin;
        }
    }

    if headers.contains("x-forwarded-for") {
        return from_legacy(headers, peer, direct_scheme);
    }

    direct_origin(headers, peer, direct_scheme)
}

fn direct_origin(headers: &HeaderMap, peer: IpAddr, direct_scheme: &str) -> Origin {
    let host = headers.get_one("host").map(sanitize_host).unwrap_or_default();
    Origin {
        scheme: direct_scheme.to_string(),
        port: default_port(direct_scheme),
        host,
        remote_ip: Some(peer),
        remote: peer.to_string(),
        via_proxy: false,
    }
}

/// One `key=value` pair within a `Forwarded` element.
struct ForwardedElement {
    for_: Option<String>,
    proto: Option<String>,
    host: Option<String>,
    port: Option<String>,
}

/// Parses `pair (";" pair)* ("," pair (";" pair)*)*`, lowercasing tokens and
/// unescaping quoted strings, returning only the last (most recent proxy)
/// element — the only one this front door trusts.
fn parse_forwarded(header: &str) -> Option<ForwardedElement> {
    let last_element = header.split(',').next_back()?;

    let mut element = ForwardedElement { for_: None, proto: None, host: None, port: None };
    for pair in last_element.split(';') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=')?;
        let key = key.trim().to_ascii_lowercase();
        let value = unquote(value.trim());

        match key.as_str() {
            "for" => element.for_ = Some(value),
            "proto" => element.proto = Some(value.to_ascii_lowercase()),
            "host" => element.host = Some(value),
            "port" => element.port = Some(value),
            _ => {}
        }
    }

    Some(element)
}

fn unquote(value: &str) -> String {
    let inner = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                out.push(escaped);
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn from_forwarded(
    header: &str,
    peer: IpAddr,
    direct_scheme: &str,
    headers: &HeaderMap,
) -> Option<Origin> {
    let element = parse_forwarded(header)?;

    let scheme = element.proto.unwrap_or_else(|| direct_scheme.to_string());
    let (remote_ip, remote) = element
        .for_
        .as_deref()
        .map(|v| parse_for(v, peer))
        .unwrap_or((Some(peer), peer.to_string()));

    let host = element
        .host
        .map(|h| sanitize_host(&h))
        .or_else(|| headers.get_one("host").map(sanitize_host))
        .unwrap_or_default();

    let port = element
        .port
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| default_port(&scheme));

    Some(Origin { scheme, host, port, remote_ip, remote, via_proxy: true })
}

fn from_legacy(headers: &HeaderMap, peer: IpAddr, direct_scheme: &str) -> Origin {
    // first-hop-wins: the left-most entry in X-Forwarded-For is the
    // original client, unlike Forwarded's last-element-wins convention.
    let for_header = headers.get_one("x-forwarded-for").unwrap_or_default();
    let first_hop = for_header.split(',').next().unwrap_or_default().trim();
    let (remote_ip, remote) = parse_for(first_hop, peer);

    let scheme = headers
        .get_one("x-forwarded-proto")
        .map(|s| s.to_ascii_lowercase())
        .unwrap_or_else(|| direct_scheme.to_string());

    let host = headers
        .get_one("x-forwarded-host")
        .map(sanitize_host)
        .or_else(|| headers.get_one("host").map(sanitize_host))
        .unwrap_or_default();

    let port = headers
        .get_one("x-forwarded-port")
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(|| default_port(&scheme));

    Origin { scheme, host, port, remote_ip, remote, via_proxy: true }
}

/// Parses a `for=` value: `[IPv6]:port`, `[IPv6]`, a bare IPv4/IPv6, or (if
/// unparseable) falls back to the peer address while still recording a
/// sanitized printable form of the claimed value.
///
/// Preserves the claimed-but-unparseable string as the printable remote
/// rather than discarding it, per the open design question this behavior
/// was carried forward from: it can mask a misconfigured proxy, but losing
/// the value entirely is worse for diagnosing one.
fn parse_for(value: &str, peer: IpAddr) -> (Option<IpAddr>, String) {
    let trimmed = value.trim();

    if let Some(rest) = trimmed.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            let ip_part = &rest[..end];
            if let Ok(ip) = ip_part.parse::<IpAddr>() {
                return (Some(ip), ip.to_string());
            }
        }
    } else if let Ok(ip) = trimmed.parse::<IpAddr>() {
        return (Some(ip), ip.to_string());
    } else if let Some((host, _port)) = trimmed.rsplit_once(':') {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return (Some(ip), ip.to_string());
        }
    }

    (Some(peer), sanitize_printable(trimmed))
}

/// Replaces any character outside URI-unreserved (`A-Za-z0-9-._~`) with
/// `-`, so an unparseable `for=` claim can be logged/displayed safely.
fn sanitize_printable(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() || "-._~".contains(c) { c } else { '-' })
        .collect()
}

/// Lowercases, preserves `[IPv6]` literals verbatim, retains `a-z0-9.-`,
/// truncates at `:`, replaces anything else with `-`. Prevents
/// header-smuggling from an upstream that doesn't validate `Host` itself.
fn sanitize_host(host: &str) -> String {
    if host.starts_with('[') {
        if let Some(end) = host.find(']') {
            return host[..=end].to_ascii_lowercase();
        }
    }

    let before_colon = host.split(':').next().unwrap_or(host);
    before_colon
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-' { c } else { '-' })
        .collect()
}

fn default_port(scheme: &str) -> u16 {
    if scheme.eq_ignore_ascii_case("https") {
        443
    } else {
        80
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn peer() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))
    }

    #[test]
    fn trusted_forwarded_is_applied() {
        let mut headers = HeaderMap::new();
        headers.set("Forwarded", "for=203.0.113.7;proto=https;host=a.example;port=8443");
        let origin = resolve(&headers, peer(), "http", &ProxyTrust::Local);

        assert_eq!(origin.remote, "203.0.113.7");
        assert_eq!(origin.scheme, "https");
        assert_eq!(origin.host, "a.example");
        assert_eq!(origin.port, 8443);
        assert!(origin.via_proxy);
    }

    #[test]
    fn untrusted_peer_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.set("Forwarded", "for=203.0.113.7;proto=https;host=a.example;port=8443");
        headers.set("Host", "a");
        let untrusted_peer = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));

        let origin = resolve(&headers, untrusted_peer, "http", &ProxyTrust::Local);

        assert_eq!(origin.remote, untrusted_peer.to_string());
        assert_eq!(origin.scheme, "http");
        assert!(!origin.via_proxy);
    }

    #[test]
    fn legacy_x_forwarded_for_first_hop_wins() {
        let mut headers = HeaderMap::new();
        headers.set("X-Forwarded-For", "203.0.113.7, 10.0.0.1");
        headers.set("X-Forwarded-Proto", "https");
        let origin = resolve(&headers, peer(), "http", &ProxyTrust::Any);
        assert_eq!(origin.remote, "203.0.113.7");
        assert_eq!(origin.scheme, "https");
    }

    #[test]
    fn unparseable_for_falls_back_to_peer() {
        let (ip, remote) = parse_for("not-an-ip!!", peer());
        assert_eq!(ip, Some(peer()));
        assert_eq!(remote, "not-an-ip--");
    }

    #[test]
    fn host_sanitization_strips_port_and_bad_chars() {
        assert_eq!(sanitize_host("Example.com:8080"), "example.com");
        assert_eq!(sanitize_host("evil<script>"), "evil-script-");
        assert_eq!(sanitize_host("[::1]:8080"), "[::1]");
    }
}
