//! Authentication module for JWT-based auth with Google OAuth login.
//!
//! This module provides:
//! - JWT token creation and validation
//! - Google OAuth flow for user login, storing the user's calendar tokens
//! - Login `state` bound to the browser through a short-lived cookie
//! - `require_auth` middleware for protecting routes
//! - Optional email allowlist validation

mod handlers;
pub(crate) mod jwt;
mod middleware;
pub mod types;

pub use handlers::{auth_callback, auth_login, auth_logout, auth_me};
pub use middleware::{authenticate, build_auth_cookie, clear_auth_cookie, require_auth};
pub use types::{AuthConfig, AuthUser};
