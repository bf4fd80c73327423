//! Cookie header parsing and session cookie construction.
//!
//! The parser is total: any header string produces a name→value map,
//! independent of pair ordering and tolerant of surrounding whitespace.
//! Values may themselves contain `=` (token payloads do).

use std::collections::HashMap;

/// Parses a `Cookie` request header into a name→value map.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    // ---
    header
        .split(';')
        .filter_map(|pair| {
            // ---
            let pair = pair.trim();
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Builds the `Set-Cookie` value carrying a session token.
///
/// HttpOnly keeps the token away from page scripts; SameSite=Lax limits
/// cross-site sends; Max-Age matches the session validity window so the
/// cookie and the claims expire together.
pub fn session_cookie(name: &str, token: &str, max_age_secs: u64, secure: bool) -> String {
    // ---
    let mut cookie = format!("{name}={token}; Path=/; Max-Age={max_age_secs}; HttpOnly");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie.push_str("; SameSite=Lax");
    cookie
}

/// Builds the `Set-Cookie` value that discards the session cookie.
pub fn clear_session_cookie(name: &str, secure: bool) -> String {
    // ---
    session_cookie(name, "", 0, secure)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn parses_multiple_pairs_any_order() {
        // ---
        let a = parse_cookie_header("ready_session=tok; theme=dark");
        let b = parse_cookie_header("theme=dark; ready_session=tok");

        assert_eq!(a.get("ready_session").map(String::as_str), Some("tok"));
        assert_eq!(b.get("ready_session").map(String::as_str), Some("tok"));
        assert_eq!(a, b);
    }

    #[test]
    fn tolerates_whitespace_and_empty_segments() {
        // ---
        let parsed = parse_cookie_header("  a=1 ;; b = 2 ;  ;c=3");
        assert_eq!(parsed.get("a").map(String::as_str), Some("1"));
        assert_eq!(parsed.get("b").map(String::as_str), Some("2"));
        assert_eq!(parsed.get("c").map(String::as_str), Some("3"));
    }

    #[test]
    fn values_may_contain_equals() {
        // ---
        // Session tokens are dotted base64url and may embed '='-free
        // segments, but other cookies can legally carry '='.
        let parsed = parse_cookie_header("t=a=b=c");
        assert_eq!(parsed.get("t").map(String::as_str), Some("a=b=c"));
    }

    #[test]
    fn garbage_never_panics() {
        // ---
        for header in ["", ";;;", "=", "=value", "noequals", " ; = ; "] {
            let _ = parse_cookie_header(header);
        }
    }

    #[test]
    fn session_cookie_attributes() {
        // ---
        let cookie = session_cookie("ready_session", "tok", 1209600, true);
        assert!(cookie.starts_with("ready_session=tok"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=1209600"));
    }

    #[test]
    fn insecure_transport_drops_secure_flag() {
        // ---
        let cookie = session_cookie("ready_session", "tok", 60, false);
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        // ---
        let cookie = clear_session_cookie("ready_session", true);
        assert!(cookie.contains("Max-Age=0"));
        assert!(cookie.starts_with("ready_session=;"));
    }
}
