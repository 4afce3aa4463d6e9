use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderName};
use axum::response::AppendHeaders;

use super::{claims::TokenKind, jwt::JwtKeys, services::TokenPair};

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

pub type CookieHeaders = AppendHeaders<[(HeaderName, String); 2]>;

fn token_cookie(name: &str, value: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; Path=/; SameSite=Lax; Max-Age={}",
        name,
        value,
        max_age.as_secs()
    )
}

fn clear_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; Secure; Path=/; SameSite=Lax; Max-Age=0", name)
}

/// `Set-Cookie` headers carrying both tokens; each cookie lives as long as its token.
pub fn session_cookies(pair: &TokenPair, keys: &JwtKeys) -> CookieHeaders {
    AppendHeaders([
        (
            header::SET_COOKIE,
            token_cookie(
                ACCESS_TOKEN_COOKIE,
                &pair.access_token,
                keys.ttl(TokenKind::Access),
            ),
        ),
        (
            header::SET_COOKIE,
            token_cookie(
                REFRESH_TOKEN_COOKIE,
                &pair.refresh_token,
                keys.ttl(TokenKind::Refresh),
            ),
        ),
    ])
}

pub fn cleared_session_cookies() -> CookieHeaders {
    AppendHeaders([
        (header::SET_COOKIE, clear_cookie(ACCESS_TOKEN_COOKIE)),
        (header::SET_COOKIE, clear_cookie(REFRESH_TOKEN_COOKIE)),
    ])
}

/// Value of a named cookie across all `Cookie` headers. Empty values count as absent.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name && !value.is_empty()).then_some(value)
        })
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; accessToken=abc.def"));
        headers.append(header::COOKIE, HeaderValue::from_static("refreshToken=xyz"));
        assert_eq!(cookie_value(&headers, ACCESS_TOKEN_COOKIE), Some("abc.def"));
        assert_eq!(cookie_value(&headers, REFRESH_TOKEN_COOKIE), Some("xyz"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("accessToken="));
        assert_eq!(cookie_value(&headers, ACCESS_TOKEN_COOKIE), None);
    }

    #[test]
    fn reads_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok"));
        assert_eq!(bearer_token(&headers), Some("tok"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn token_cookie_is_http_only_and_secure() {
        let c = token_cookie(ACCESS_TOKEN_COOKIE, "t", Duration::from_secs(60));
        assert!(c.starts_with("accessToken=t;"));
        assert!(c.contains("HttpOnly"));
        assert!(c.contains("Secure"));
        assert!(c.contains("Max-Age=60"));
        assert!(clear_cookie(REFRESH_TOKEN_COOKIE).contains("Max-Age=0"));
    }
}
