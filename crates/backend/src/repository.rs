//! Storage abstraction for the user record.
//!
//! Handlers depend on [`UserStore`] rather than on the connection pool so the
//! HTTP layer can be exercised without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::User;

/// Tokens and profile returned by a completed Google login
#[derive(Debug, Clone)]
pub struct GoogleLogin {
    pub email: String,
    pub name: Option<String>,
    pub access_token: String,
    /// Google only issues a refresh token on consent; `None` keeps the stored one
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Create the user on first login, otherwise refresh their stored tokens.
    async fn save_login(&self, login: &GoogleLogin) -> anyhow::Result<User>;
}
