//! Authentication middleware layer for protecting routes.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

use super::jwt;
use super::types::{
    AuthConfig, AuthUser, Claims, AUTH_COOKIE_NAME, LOGIN_STATE_COOKIE_NAME,
    LOGIN_STATE_MAX_AGE_SECS,
};

/// Middleware function that requires authentication.
///
/// Used with `axum::middleware::from_fn_with_state`. On success the [`AuthUser`]
/// is inserted into the request extensions for handlers to extract.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let config = &state.auth_config;

    let claims = match authenticate(request.headers(), config) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(AuthUser {
        email: claims.sub.clone(),
        name: claims.name.clone(),
    });

    let response = next.run(request).await;

    // Sliding session: reissue the cookie once the token is a day old
    if jwt::should_refresh(&claims) {
        if let Ok(new_token) = jwt::create_token(config, &claims.sub, claims.name.clone()) {
            let cookie = build_auth_cookie(config, &new_token);
            let (mut parts, body) = response.into_parts();
            // Keep a cookie set by the handler itself (e.g. sign-out)
            if !parts.headers.contains_key(header::SET_COOKIE) {
                if let Ok(cookie_value) = cookie.parse() {
                    parts.headers.insert(header::SET_COOKIE, cookie_value);
                }
            }
            return Response::from_parts(parts, body);
        }
    }

    response
}

/// Value of the named cookie from the request's `Cookie` header.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    cookie::Cookie::split_parse(cookie_header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|s| s.to_string())
}

/// Validate the session token from cookie or `Authorization` header.
pub fn authenticate(headers: &HeaderMap, config: &AuthConfig) -> Result<Claims, ApiError> {
    let token = read_cookie(headers, AUTH_COOKIE_NAME)
        .or_else(|| extract_token_from_header(headers))
        .ok_or_else(|| ApiError::unauthorized("Missing authentication"))?;

    let claims = jwt::validate_token(config, &token)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    // Verify email is still allowed
    if !config.is_email_allowed(&claims.sub) {
        return Err(ApiError::Forbidden("Email not authorized".to_string()));
    }

    Ok(claims)
}

/// Build an auth cookie string.
pub fn build_auth_cookie(config: &AuthConfig, value: &str) -> String {
    let max_age = config.token_duration_days * 24 * 60 * 60;
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{}",
        AUTH_COOKIE_NAME, value, max_age, secure
    )
}

/// Cookie that removes the session.
pub fn clear_auth_cookie() -> String {
    format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        AUTH_COOKIE_NAME
    )
}

/// Cookie binding a login attempt to the browser that started it.
///
/// Scoped to `/auth` and lives only as long as the consent screen should.
pub fn build_login_state_cookie(config: &AuthConfig, state: &str) -> String {
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/auth; HttpOnly; SameSite=Lax; Max-Age={}{}",
        LOGIN_STATE_COOKIE_NAME, state, LOGIN_STATE_MAX_AGE_SECS, secure
    )
}

pub fn clear_login_state_cookie() -> String {
    format!(
        "{}=; Path=/auth; HttpOnly; SameSite=Lax; Max-Age=0",
        LOGIN_STATE_COOKIE_NAME
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::test_config;
    use axum::http::HeaderValue;

    fn headers_with(name: header::HeaderName, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_token_read_from_cookie_among_others() {
        let config = test_config();
        let token = jwt::create_token(&config, "test@example.com", None).unwrap();
        let headers = headers_with(
            header::COOKIE,
            &format!("theme=dark; {}={}; lang=en", AUTH_COOKIE_NAME, token),
        );

        let claims = authenticate(&headers, &config).unwrap();
        assert_eq!(claims.sub, "test@example.com");
    }

    #[test]
    fn test_token_read_from_bearer_header() {
        let config = test_config();
        let token = jwt::create_token(&config, "test@example.com", None).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        assert!(authenticate(&headers, &config).is_ok());
    }

    #[test]
    fn test_missing_token_is_unauthorized() {
        let err = authenticate(&HeaderMap::new(), &test_config()).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized(_)));
    }

    #[test]
    fn test_disallowed_email_is_forbidden() {
        let config = test_config();
        let token = jwt::create_token(&config, "intruder@example.com", None).unwrap();
        let headers = headers_with(header::AUTHORIZATION, &format!("Bearer {}", token));

        let err = authenticate(&headers, &config).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_login_state_cookie() {
        let cookie = build_login_state_cookie(&test_config(), "abc123");
        assert!(cookie.starts_with("oauth_state=abc123;"));
        assert!(cookie.contains("Path=/auth"));
        assert!(cookie.contains("Max-Age=600"));

        let headers = headers_with(header::COOKIE, "auth_token=x; oauth_state=abc123");
        assert_eq!(read_cookie(&headers, LOGIN_STATE_COOKIE_NAME).as_deref(), Some("abc123"));
        assert!(clear_login_state_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_cookie_flags() {
        let mut config = test_config();
        let cookie = build_auth_cookie(&config, "abc");
        assert!(cookie.starts_with("auth_token=abc;"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(!cookie.contains("Secure"));

        config.secure_cookies = true;
        assert!(build_auth_cookie(&config, "abc").ends_with("; Secure"));
    }
}
