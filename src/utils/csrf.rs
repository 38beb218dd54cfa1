// src/utils/csrf.rs

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, header},
    middleware::Next,
    response::Response,
};
use rand::RngCore;

use crate::error::AppError;

pub const CSRF_COOKIE: &str = "portal_csrf";
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Issues a fresh double-submit token: 32 random bytes, hex encoded.
pub fn issue_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// The Set-Cookie value for a token. Readable by the frontend (not HttpOnly)
/// so it can be echoed back in the request header; SameSite=Lax keeps it off
/// cross-site form posts.
pub fn cookie_header(token: &str) -> String {
    format!("{}={}; Path=/; SameSite=Lax", CSRF_COOKIE, token)
}

/// Reads a single cookie value out of the Cookie header(s).
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    for raw in headers.get_all(header::COOKIE) {
        let raw = raw.to_str().ok()?;
        for pair in raw.split(';') {
            if let Some((k, v)) = pair.trim().split_once('=') {
                if k == name {
                    return Some(v.to_string());
                }
            }
        }
    }
    None
}

/// Whether a request must pass the double-submit check.
///
/// Safe methods are exempt, as are the auth endpoints (no token exists
/// before login). So are requests carrying a bearer Authorization header:
/// a cross-site form cannot attach one, which is the attack this guard
/// exists for.
fn requires_check(method: &Method, path: &str, headers: &HeaderMap) -> bool {
    if matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS) {
        return false;
    }
    if path.starts_with("/api/auth") {
        return false;
    }
    let has_bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer "));
    !has_bearer
}

fn tokens_match(cookie: Option<&str>, header: Option<&str>) -> bool {
    match (cookie, header) {
        (Some(c), Some(h)) => !c.is_empty() && c == h,
        _ => false,
    }
}

/// Axum Middleware: CSRF double-submit guard.
///
/// Mutating requests must present the same token in the csrf cookie and the
/// `x-csrf-token` header.
pub async fn csrf_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    if requires_check(req.method(), req.uri().path(), req.headers()) {
        let cookie = cookie_value(req.headers(), CSRF_COOKIE);
        let header = req
            .headers()
            .get(CSRF_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        if !tokens_match(cookie.as_deref(), header.as_deref()) {
            return Err(AppError::Forbidden("CSRF token mismatch".to_string()));
        }
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_unique() {
        let a = issue_token();
        let b = issue_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cookie_parsing_handles_multiple_pairs() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; portal_csrf=abc123; lang=en".parse().unwrap(),
        );
        assert_eq!(cookie_value(&headers, CSRF_COOKIE).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn safe_methods_skip_the_check() {
        let headers = HeaderMap::new();
        assert!(!requires_check(&Method::GET, "/api/articles", &headers));
        assert!(!requires_check(&Method::HEAD, "/api/articles", &headers));
        assert!(requires_check(&Method::POST, "/api/articles", &headers));
        assert!(requires_check(&Method::DELETE, "/api/comments/1", &headers));
    }

    #[test]
    fn auth_endpoints_are_exempt() {
        let headers = HeaderMap::new();
        assert!(!requires_check(&Method::POST, "/api/auth/login", &headers));
        assert!(!requires_check(&Method::POST, "/api/auth/register", &headers));
    }

    #[test]
    fn bearer_requests_are_exempt() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer sometoken".parse().unwrap());
        assert!(!requires_check(&Method::POST, "/api/articles", &headers));

        // Basic auth is not exempt.
        headers.insert(header::AUTHORIZATION, "Basic Zm9v".parse().unwrap());
        assert!(requires_check(&Method::POST, "/api/articles", &headers));
    }

    #[test]
    fn mismatched_tokens_fail() {
        assert!(tokens_match(Some("abc"), Some("abc")));
        assert!(!tokens_match(Some("abc"), Some("abd")));
        assert!(!tokens_match(Some(""), Some("")));
        assert!(!tokens_match(None, Some("abc")));
        assert!(!tokens_match(Some("abc"), None));
    }
}
