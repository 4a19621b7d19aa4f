//! Google Calendar API client and the per-user connector that builds it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use google_calendar3::api::Event;
use google_calendar3::hyper_rustls::HttpsConnector;
use google_calendar3::CalendarHub;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::sync::RwLock;

use super::CalendarError;
use crate::models::User;

/// One page of events from a listing
#[derive(Debug, Clone, Default)]
pub struct EventsPage {
    pub items: Vec<Event>,
    pub next_page_token: Option<String>,
}

/// Who Google should notify about a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notify {
    /// "all", "externalOnly" or "none"
    pub send_updates: String,
    pub send_notifications: bool,
}

impl Default for Notify {
    fn default() -> Self {
        Self {
            send_updates: "all".to_string(),
            send_notifications: true,
        }
    }
}

/// Operations against a single user's calendar.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn list_events(
        &self,
        page_token: Option<&str>,
        max_results: i32,
    ) -> Result<EventsPage, CalendarError>;

    async fn get_event(&self, event_id: &str) -> Result<Event, CalendarError>;

    /// Insert with conference data support enabled.
    async fn insert_event(&self, event: Event, notify: &Notify) -> Result<Event, CalendarError>;

    async fn delete_event(&self, event_id: &str, notify: &Notify) -> Result<(), CalendarError>;
}

/// Builds a [`CalendarApi`] authorized as the given user.
#[async_trait]
pub trait CalendarConnector: Send + Sync {
    async fn connect(&self, user: &User) -> Result<Arc<dyn CalendarApi>, CalendarError>;
}

/// Client for interacting with Google Calendar API
pub struct GoogleCalendarClient {
    hub: CalendarHub<HttpsConnector<HttpConnector>>,
    calendar_id: String,
}

impl GoogleCalendarClient {
    /// Create a client from a user's stored refresh token.
    ///
    /// Access tokens are fetched and refreshed by the authenticator as needed.
    pub async fn from_refresh_token(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        calendar_id: &str,
    ) -> Result<Self, CalendarError> {
        // Use the yup_oauth2 re-exported by google_calendar3 to avoid version mismatch
        let secret = google_calendar3::yup_oauth2::authorized_user::AuthorizedUserSecret {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            key_type: "authorized_user".to_string(),
        };

        let auth = google_calendar3::yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .map_err(|e| {
                CalendarError::Transport(format!("Failed to build authenticator: {}", e))
            })?;

        let connector = google_calendar3::hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| CalendarError::Transport(format!("Failed to load native TLS roots: {}", e)))?
            .https_or_http()
            .enable_http1()
            .build();

        let client = Client::builder(TokioExecutor::new()).build(connector);
        let hub = CalendarHub::new(client, auth);

        Ok(Self {
            hub,
            calendar_id: calendar_id.to_string(),
        })
    }
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_events(
        &self,
        page_token: Option<&str>,
        max_results: i32,
    ) -> Result<EventsPage, CalendarError> {
        let mut call = self
            .hub
            .events()
            .list(&self.calendar_id)
            .always_include_email(true)
            .single_events(true)
            .max_results(max_results);

        if let Some(token) = page_token {
            call = call.page_token(token);
        }

        let (_, events) = call.doit().await?;

        Ok(EventsPage {
            items: events.items.unwrap_or_default(),
            next_page_token: events.next_page_token,
        })
    }

    async fn get_event(&self, event_id: &str) -> Result<Event, CalendarError> {
        let (_, event) = self
            .hub
            .events()
            .get(&self.calendar_id, event_id)
            .doit()
            .await?;

        Ok(event)
    }

    async fn insert_event(&self, event: Event, notify: &Notify) -> Result<Event, CalendarError> {
        let (_, created) = self
            .hub
            .events()
            .insert(event, &self.calendar_id)
            .send_updates(&notify.send_updates)
            .send_notifications(notify.send_notifications)
            .conference_data_version(1)
            .doit()
            .await?;

        tracing::info!(
            "Created calendar event {:?} in {}",
            created.id,
            self.calendar_id
        );
        Ok(created)
    }

    async fn delete_event(&self, event_id: &str, notify: &Notify) -> Result<(), CalendarError> {
        self.hub
            .events()
            .delete(&self.calendar_id, event_id)
            .send_updates(&notify.send_updates)
            .send_notifications(notify.send_notifications)
            .doit()
            .await?;

        tracing::info!("Deleted calendar event {} in {}", event_id, self.calendar_id);
        Ok(())
    }
}

/// Connector that authorizes clients with the app's OAuth client and each user's refresh token.
///
/// Clients are cached per user so the authenticator's access token survives between requests.
/// A cached client is replaced when the user's stored refresh token changes.
pub struct GoogleCalendarConnector {
    client_id: String,
    client_secret: String,
    calendar_id: String,
    clients: RwLock<HashMap<String, (String, Arc<GoogleCalendarClient>)>>,
}

impl GoogleCalendarConnector {
    pub fn new(client_id: String, client_secret: String, calendar_id: String) -> Self {
        Self {
            client_id,
            client_secret,
            calendar_id,
            clients: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CalendarConnector for GoogleCalendarConnector {
    async fn connect(&self, user: &User) -> Result<Arc<dyn CalendarApi>, CalendarError> {
        let refresh_token = user.refresh_token().ok_or_else(|| {
            tracing::warn!("User {} has no Google refresh token stored", user.email);
            CalendarError::Unauthorized
        })?;

        if let Some((cached_token, client)) = self.clients.read().await.get(&user.email) {
            if cached_token == refresh_token {
                return Ok(client.clone());
            }
        }

        let client = Arc::new(
            GoogleCalendarClient::from_refresh_token(
                &self.client_id,
                &self.client_secret,
                refresh_token,
                &self.calendar_id,
            )
            .await?,
        );

        self.clients
            .write()
            .await
            .insert(user.email.clone(), (refresh_token.to_string(), client.clone()));

        Ok(client)
    }
}
