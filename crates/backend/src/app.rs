use std::sync::Arc;

use axum::{
    http::{header, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{self, AuthConfig};
use crate::calendar::CalendarConnector;
use crate::config::CalendarConfig;
use crate::handlers;
use crate::repository::UserStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub auth_config: AuthConfig,
    pub calendar_config: Arc<CalendarConfig>,
    pub users: Arc<dyn UserStore>,
    pub calendars: Arc<dyn CalendarConnector>,
    /// Client for the OAuth token and userinfo endpoints
    pub http: reqwest::Client,
}

pub fn build_router(state: AppState) -> Router {
    // Every event route requires a signed-in user
    let events = Router::new()
        .route(
            "/api/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/api/events/new", get(handlers::new_event))
        .route(
            "/api/events/:id",
            get(handlers::show_event).delete(handlers::cancel_event),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/auth/login", get(auth::auth_login))
        .route("/auth/callback", get(auth::auth_callback))
        .route("/auth/me", get(auth::auth_me))
        .route("/auth/logout", post(auth::auth_logout))
        .merge(events)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build CORS layer from the configured origins.
///
/// With no origins configured, defaults to permissive CORS (for development only).
pub fn build_cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let origins: Vec<_> = allowed_origins
        .unwrap_or_default()
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS_ALLOWED_ORIGINS not set or empty, using permissive CORS (not recommended for production)"
        );
        return CorsLayer::permissive();
    }

    tracing::info!("CORS configured for origins: {:?}", origins);
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}

/// State wired to in-memory fakes, with `user` already stored
#[cfg(test)]
pub(crate) fn test_state(
    calendar: Arc<crate::calendar::testing::FakeCalendar>,
    user: crate::models::User,
) -> AppState {
    use crate::calendar::testing::FakeConnector;
    use crate::repository::testing::MemoryUserStore;

    AppState {
        auth_config: auth::types::test_config(),
        calendar_config: Arc::new(CalendarConfig::default()),
        users: Arc::new(MemoryUserStore::with_user(user)),
        calendars: Arc::new(FakeConnector(calendar)),
        http: reqwest::Client::new(),
    }
}
