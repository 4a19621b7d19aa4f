use std::sync::Arc;

use anyhow::anyhow;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod auth;
mod calendar;
mod config;
mod db;
pub mod error;
mod handlers;
mod models;
pub mod repository;
mod schema;

use app::AppState;
use auth::AuthConfig;
use calendar::GoogleCalendarConnector;
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "events_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Both the database TLS and the Google client use rustls
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        tracing::warn!("A rustls crypto provider was already installed");
    }

    let config = AppConfig::from_env()?;
    let auth_config = AuthConfig::from_env().map_err(|e| anyhow!(e))?;

    let pool = db::establish_connection_pool(&config.database_url)?;

    let calendars = GoogleCalendarConnector::new(
        auth_config.google_client_id.clone(),
        auth_config.google_client_secret.clone(),
        config.calendar.calendar_id.clone(),
    );

    tracing::info!(
        "Using calendar '{}' in {}",
        config.calendar.calendar_id,
        config.calendar.time_zone
    );

    let state = AppState {
        auth_config,
        calendar_config: Arc::new(config.calendar.clone()),
        users: Arc::new(db::PgUserStore::new(pool)),
        calendars: Arc::new(calendars),
        http: reqwest::Client::new(),
    };

    let app = app::build_router(state)
        .layer(app::build_cors_layer(config.cors_allowed_origins.as_deref()));

    tracing::info!("Server listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
