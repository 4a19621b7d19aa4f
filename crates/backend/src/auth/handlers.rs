//! Authentication HTTP handlers.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::repository::GoogleLogin;

use super::middleware::{build_login_state_cookie, clear_login_state_cookie, read_cookie};
use super::{
    authenticate, build_auth_cookie, clear_auth_cookie, jwt,
    types::{AuthUserResponse, LoginInitResponse, LOGIN_STATE_COOKIE_NAME},
};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes for login plus read/write access to the user's calendars
const LOGIN_SCOPES: [&str; 4] = [
    "openid",
    "email",
    "profile",
    "https://www.googleapis.com/auth/calendar",
];

/// Start Google OAuth login flow.
///
/// Returns a URL that the client should send the user to, and remembers the
/// login's `state` in a cookie so the callback can be matched to this browser.
pub async fn auth_login(State(state): State<AppState>) -> ApiResult<Response> {
    let config = &state.auth_config;

    // Google echoes this back on the callback
    let csrf_state = uuid::Uuid::new_v4().simple().to_string();

    // Offline access with forced consent so Google issues a refresh token
    let auth_url = format!(
        "{}?\
         client_id={}&\
         redirect_uri={}&\
         response_type=code&\
         scope={}&\
         access_type=offline&\
         prompt=consent&\
         state={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&config.google_client_id),
        urlencoding::encode(&config.auth_redirect_uri),
        urlencoding::encode(&LOGIN_SCOPES.join(" ")),
        csrf_state
    );

    Ok((
        [(
            header::SET_COOKIE,
            build_login_state_cookie(config, &csrf_state),
        )],
        Json(LoginInitResponse { auth_url }),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct AuthCallbackParams {
    pub code: String,
    pub state: String,
}

/// Whether the callback's `state` is the one this browser was given at login.
fn login_state_matches(headers: &HeaderMap, state: &str) -> bool {
    !state.is_empty()
        && read_cookie(headers, LOGIN_STATE_COOKIE_NAME).is_some_and(|expected| expected == state)
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    name: Option<String>,
}

/// Handle Google OAuth callback.
///
/// Checks the login `state`, exchanges the authorization code for tokens,
/// validates the user's email against the allowlist, stores the tokens on the
/// user record and sets an auth cookie on success.
pub async fn auth_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AuthCallbackParams>,
) -> Response {
    let mut response = if !login_state_matches(&headers, &params.state) {
        tracing::warn!("Login callback with missing or mismatched state");
        Redirect::to("/?auth_error=invalid_state").into_response()
    } else {
        match handle_callback_inner(&state, params).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Auth callback error: {:?}", e);
                Redirect::to("/?auth_error=auth_failed").into_response()
            }
        }
    };

    // A login state is single-use
    if let Ok(value) = HeaderValue::from_str(&clear_login_state_cookie()) {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
    response
}

async fn handle_callback_inner(
    state: &AppState,
    params: AuthCallbackParams,
) -> Result<Response, ApiError> {
    let config = &state.auth_config;
    let client = &state.http;

    let token_response = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", params.code.as_str()),
            ("client_id", config.google_client_id.as_str()),
            ("client_secret", config.google_client_secret.as_str()),
            ("redirect_uri", config.auth_redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Token exchange failed: {}", e)))?;

    if !token_response.status().is_success() {
        let status = token_response.status();
        let body = token_response.text().await.unwrap_or_default();
        tracing::error!("Token exchange failed: {} - {}", status, body);
        return Ok(Redirect::to("/?auth_error=token_exchange_failed").into_response());
    }

    let tokens: GoogleTokenResponse = token_response
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid token response: {}", e)))?;

    let user_info: GoogleUserInfo = client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&tokens.access_token)
        .send()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to get user info: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Invalid user info response: {}", e)))?;

    tracing::info!("OAuth login attempt from: {}", user_info.email);

    if !config.is_email_allowed(&user_info.email) {
        tracing::warn!("Unauthorized login attempt from: {}", user_info.email);
        return Ok(Redirect::to("/?auth_error=unauthorized_email").into_response());
    }

    if tokens.refresh_token.is_none() {
        tracing::warn!(
            "No refresh token received for {}, keeping any stored one",
            user_info.email
        );
    }

    let login = GoogleLogin {
        email: user_info.email.to_lowercase(),
        name: user_info.name.clone(),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: tokens
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs)),
    };
    state.users.save_login(&login).await?;

    let token = jwt::create_token(config, &login.email, user_info.name)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Failed to create token: {}", e)))?;
    let cookie = build_auth_cookie(config, &token);

    tracing::info!("Successful login for: {}", login.email);

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/"),
            (header::SET_COOKIE, cookie.as_str()),
        ],
    )
        .into_response())
}

/// Get current authenticated user info.
pub async fn auth_me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<AuthUserResponse>> {
    let claims = authenticate(&headers, &state.auth_config)?;

    Ok(Json(AuthUserResponse {
        email: claims.sub,
        name: claims.name,
    }))
}

/// Logout - clear auth cookie.
pub async fn auth_logout() -> impl IntoResponse {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_auth_cookie()),
        ],
    )
}
