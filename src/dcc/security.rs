//! DCC safety checks.
//!
//! - **Private IP rejection**: optionally refuse offers that point into
//!   private, loopback or link-local ranges (a classic way to make a bot
//!   probe its own network).
//! - **Filename sanitizing**: SEND offers carry a peer-chosen filename, which
//!   is reduced to a bare name before it is logged or handed on.

use std::net::IpAddr;

/// Whether `ip` points somewhere a remote peer has no business sending us.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00 // unique local
                || (first & 0xffc0) == 0xfe80 // link local
        }
    }
}

/// Reduce a peer-supplied filename to a safe bare name, or `None` if nothing
/// usable is left.
pub fn sanitize_filename(filename: &str) -> Option<String> {
    // Backslash is a valid character on Unix, so split on both by hand.
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != ':')
        .collect();
    let cleaned = cleaned.trim_start_matches('.').trim();
    if cleaned.is_empty() {
        return None;
    }

    let mut end = cleaned.len().min(255);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    Some(cleaned[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hello.txt"), Some("hello.txt".into()));
        assert_eq!(sanitize_filename("../../../etc/passwd"), Some("passwd".into()));
        assert_eq!(sanitize_filename("..\\..\\windows\\system32"), Some("system32".into()));
        assert_eq!(sanitize_filename(".hidden"), Some("hidden".into()));
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("bell\x07.txt"), Some("bell.txt".into()));
        assert_eq!(sanitize_filename("normal file.pdf"), Some("normal file.pdf".into()));
    }

    #[test]
    fn long_names_are_truncated_on_char_boundary() {
        let name = "é".repeat(200);
        let cleaned = sanitize_filename(&name).unwrap();
        assert!(cleaned.len() <= 255);
        assert!(cleaned.chars().all(|c| c == 'é'));
    }

    #[test]
    fn test_is_private_ip() {
        assert!(is_private_ip(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"192.168.1.1".parse().unwrap()));
        assert!(is_private_ip(&"10.0.0.1".parse().unwrap()));
        assert!(is_private_ip(&"fd00::1".parse().unwrap()));
        assert!(is_private_ip(&"fe80::1".parse().unwrap()));
        assert!(!is_private_ip(&"8.8.8.8".parse().unwrap()));
        assert!(!is_private_ip(&"2001:db8::1".parse().unwrap()));
    }
}
