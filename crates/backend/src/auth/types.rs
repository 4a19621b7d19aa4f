//! Auth-related types and configuration.

use serde::{Deserialize, Serialize};

// Re-export shared types for convenience
pub use shared_types::{AuthUserResponse, LoginInitResponse};

/// Name of the session cookie carrying the JWT
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Holds the `state` sent to Google until the login callback arrives
pub const LOGIN_STATE_COOKIE_NAME: &str = "oauth_state";
pub const LOGIN_STATE_MAX_AGE_SECS: i64 = 600;

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user email)
    pub sub: String,
    /// User display name from Google
    pub name: Option<String>,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Validated user from JWT, available to handlers as a request extension
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub name: Option<String>,
}

/// Auth configuration loaded from environment
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Empty means any Google account may sign in
    pub allowed_emails: Vec<String>,
    pub token_duration_days: i64,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub auth_redirect_uri: String,
    /// Adds `Secure` to the session cookie
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Load auth configuration from environment variables.
    ///
    /// Required env vars:
    /// - `JWT_SECRET`: Secret key for signing JWTs
    /// - `GOOGLE_CLIENT_ID`: Google OAuth client ID
    /// - `GOOGLE_CLIENT_SECRET`: Google OAuth client secret
    /// - `AUTH_REDIRECT_URI`: OAuth callback URI for user login
    ///
    /// Optional:
    /// - `ALLOWED_EMAILS`: Comma-separated list of allowed email addresses
    /// - `RUST_ENV=production`: mark the session cookie `Secure`
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret =
            std::env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;

        let allowed_emails: Vec<String> = std::env::var("ALLOWED_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if allowed_emails.is_empty() {
            tracing::warn!("ALLOWED_EMAILS not set, any Google account can sign in");
        }

        Ok(Self {
            jwt_secret,
            allowed_emails,
            token_duration_days: 7,
            google_client_id: std::env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| "GOOGLE_CLIENT_ID must be set".to_string())?,
            google_client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .map_err(|_| "GOOGLE_CLIENT_SECRET must be set".to_string())?,
            auth_redirect_uri: std::env::var("AUTH_REDIRECT_URI")
                .map_err(|_| "AUTH_REDIRECT_URI must be set".to_string())?,
            secure_cookies: std::env::var("RUST_ENV").unwrap_or_default() == "production",
        })
    }

    /// Check if an email address may sign in.
    pub fn is_email_allowed(&self, email: &str) -> bool {
        self.allowed_emails.is_empty() || self.allowed_emails.contains(&email.to_lowercase())
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret-key-for-testing-only".to_string(),
        allowed_emails: vec!["test@example.com".to_string()],
        token_duration_days: 7,
        google_client_id: "client-id".to_string(),
        google_client_secret: "client-secret".to_string(),
        auth_redirect_uri: "http://localhost:3000/auth/callback".to_string(),
        secure_cookies: false,
    }
}
