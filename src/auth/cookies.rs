//! Cookie-header parsing for credential extraction.
//!
//! The authorizer's sole identity source is the `cookie` header; the signed
//! token travels in the `token` cookie.

use std::collections::HashMap;

/// Name of the cookie carrying the signed credential.
pub const TOKEN_COOKIE: &str = "token";

/// Parse a raw `Cookie` header value into a name/value map.
///
/// Returns `None` when the header is absent — a missing credential is a
/// normal state, not a fault. Pairs without an `=` are skipped rather than
/// failing the whole parse.
pub fn parse_cookies(header: Option<&str>) -> Option<HashMap<String, String>> {
    let raw = header?;

    let mut cookies = HashMap::new();
    for pair in raw.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            cookies.insert(name.to_string(), value.to_string());
        }
    }

    Some(cookies)
}

/// Pull the raw credential string out of a request's cookie header.
pub fn extract_token(header: Option<&str>) -> Option<String> {
    parse_cookies(header)?.remove(TOKEN_COOKIE)
}
