// Copyright (C) 2020-2026  The Blockhouse Technology Limited (TBTL).
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or (at your
// option) any later version.
//
// This program is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU Affero General Public
// License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Matching of reference identities against names presented by a
//! certificate.

use std::net::IpAddr;

/// Validates a reference hostname, ignoring one trailing dot.
///
/// Returns `None` for names that can never be matched.
pub(crate) fn normalize_host(host: &str) -> Option<&str> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    if host
        .bytes()
        .any(|c| c == 0 || c == b'*' || c.is_ascii_whitespace())
    {
        return None;
    }
    if host.split('.').any(str::is_empty) {
        return None;
    }
    Some(host)
}

fn split_first_label(name: &[u8]) -> Option<(&[u8], &[u8])> {
    let dot = name.iter().position(|&c| c == b'.')?;
    Some((&name[..dot], &name[dot + 1..]))
}

/// Whether the presented DNS name `pattern` covers the normalized `host`.
///
/// ASCII is compared case-insensitively.  A wildcard is honored only as the
/// whole leftmost label followed by at least two labels, and covers exactly
/// one label.
pub(crate) fn host_matches(pattern: &[u8], host: &str, allow_wildcards: bool) -> bool {
    let host = host.as_bytes();
    if pattern.is_empty() || pattern.contains(&0) {
        return false;
    }
    if !pattern.contains(&b'*') {
        return pattern.eq_ignore_ascii_case(host);
    }
    if !allow_wildcards {
        return false;
    }

    let Some((wildcard, suffix)) = split_first_label(pattern) else {
        return false;
    };
    if wildcard != b"*" || suffix.contains(&b'*') {
        return false;
    }
    let mut labels = suffix.split(|&c| c == b'.');
    if labels.clone().count() < 2 || labels.any(<[u8]>::is_empty) {
        return false;
    }

    let Some((first, rest)) = split_first_label(host) else {
        return false;
    };
    !first.is_empty() && rest.eq_ignore_ascii_case(suffix)
}

/// Splits a reference email into local part and domain.
pub(crate) fn split_email(email: &str) -> Option<(&str, &str)> {
    if email.contains('\0') {
        return None;
    }
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some((local, domain))
}

/// Whether the presented address has exactly the local part `local` and a
/// domain equal to `domain` ignoring ASCII case.
pub(crate) fn email_matches(presented: &[u8], local: &str, domain: &str) -> bool {
    let Some(at) = presented.iter().rposition(|&c| c == b'@') else {
        return false;
    };
    let (presented_local, presented_domain) = (&presented[..at], &presented[at + 1..]);
    presented_local == local.as_bytes()
        && presented_domain.eq_ignore_ascii_case(domain.as_bytes())
}

/// Network-order octets of an IPv4 or IPv6 literal.
pub(crate) fn parse_ip(ip: &str) -> Option<Vec<u8>> {
    match ip.parse::<IpAddr>().ok()? {
        IpAddr::V4(addr) => Some(addr.octets().to_vec()),
        IpAddr::V6(addr) => Some(addr.octets().to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("example.com"), Some("example.com"));
        assert_eq!(normalize_host("example.com."), Some("example.com"));
        assert_eq!(normalize_host("localhost"), Some("localhost"));

        assert_eq!(normalize_host(""), None);
        assert_eq!(normalize_host("."), None);
        assert_eq!(normalize_host("example.com.."), None);
        assert_eq!(normalize_host("a..b"), None);
        assert_eq!(normalize_host(".example.com"), None);
        assert_eq!(normalize_host("*.example.com"), None);
        assert_eq!(normalize_host("exa mple.com"), None);
        assert_eq!(normalize_host("example\0.com"), None);
    }

    #[test]
    fn test_exact_host_match() {
        assert!(host_matches(b"www.example.com", "www.example.com", true));
        assert!(host_matches(b"WWW.Example.COM", "www.example.com", true));
        assert!(!host_matches(b"example.com", "www.example.com", true));
        assert!(!host_matches(b"", "example.com", true));
        assert!(!host_matches(b"example.com\0.evil", "example.com", true));
    }

    #[test]
    fn test_non_ascii_is_compared_exactly() {
        assert!(host_matches("bücher.de".as_bytes(), "bücher.de", true));
        assert!(!host_matches("BÜCHER.de".as_bytes(), "bücher.de", true));
    }

    #[test]
    fn test_wildcard_covers_one_label() {
        assert!(host_matches(b"*.example.com", "www.example.com", true));
        assert!(host_matches(b"*.Example.com", "WWW.example.COM", true));
        assert!(host_matches(b"*.example.com", "xn--bcher-kva.example.com", true));

        assert!(!host_matches(b"*.example.com", "example.com", true));
        assert!(!host_matches(b"*.example.com", "a.b.example.com", true));
        assert!(!host_matches(b"*.example.com", ".example.com", true));
    }

    #[test]
    fn test_wildcard_needs_two_following_labels() {
        assert!(!host_matches(b"*.com", "example.com", true));
        assert!(!host_matches(b"*", "localhost", true));
        assert!(!host_matches(b"*.example..com", "a.example..com", true));
    }

    #[test]
    fn test_partial_wildcards_never_match() {
        assert!(!host_matches(b"w*.example.com", "www.example.com", true));
        assert!(!host_matches(b"*w.example.com", "www.example.com", true));
        assert!(!host_matches(b"xn--*.example.com", "xn--a.example.com", true));
        assert!(!host_matches(b"www.*.com", "www.example.com", true));
        assert!(!host_matches(b"*.*.example.com", "a.b.example.com", true));
    }

    #[test]
    fn test_wildcards_disabled() {
        assert!(!host_matches(b"*.example.com", "www.example.com", false));
        assert!(host_matches(b"www.example.com", "www.example.com", false));
    }

    #[test]
    fn test_split_email() {
        assert_eq!(split_email("user@example.com"), Some(("user", "example.com")));

        assert_eq!(split_email("user"), None);
        assert_eq!(split_email("@example.com"), None);
        assert_eq!(split_email("user@"), None);
        assert_eq!(split_email("a@b@c"), None);
        assert_eq!(split_email("us\0er@example.com"), None);
    }

    #[test]
    fn test_email_matches() {
        assert!(email_matches(b"user@example.com", "user", "example.com"));
        assert!(email_matches(b"user@EXAMPLE.com", "user", "example.COM"));

        assert!(!email_matches(b"User@example.com", "user", "example.com"));
        assert!(!email_matches(b"user@example.org", "user", "example.com"));
        assert!(!email_matches(b"userexample.com", "user", "example.com"));
    }

    #[test]
    fn test_parse_ip() {
        assert_eq!(parse_ip("127.0.0.1"), Some(vec![127, 0, 0, 1]));

        let v6 = parse_ip("::1").unwrap();
        assert_eq!(v6.len(), 16);
        assert_eq!(v6[15], 1);

        assert_eq!(parse_ip("not-an-ip"), None);
        assert_eq!(parse_ip("256.0.0.1"), None);
        assert_eq!(parse_ip("example.com"), None);
        assert_eq!(parse_ip(""), None);
    }
}
