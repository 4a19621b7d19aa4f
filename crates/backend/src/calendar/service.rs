//! Calendar operations for the signed-in user.

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use google_calendar3::api::Event;
use shared_types::CreateEventRequest;

use super::client::{CalendarApi, EventsPage, Notify};
use super::mapping::build_event;
use super::CalendarError;
use crate::config::CalendarConfig;

/// Event data as submitted by the user
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub summary: String,
    pub description: String,
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub attendees: Vec<String>,
}

/// Times repeated by a DST fall-back resolve to their first occurrence;
/// times skipped by a spring-forward are rejected.
fn localize(naive: &NaiveDateTime, tz: Tz, field: &str) -> Result<DateTime<Tz>, CalendarError> {
    tz.from_local_datetime(naive).earliest().ok_or_else(|| {
        CalendarError::invalid_event(format!(
            "{} {} does not exist in {}",
            field,
            naive,
            tz.name()
        ))
    })
}

impl EventDraft {
    /// Interpret a create request's wall-clock times in `tz`.
    pub fn from_request(request: &CreateEventRequest, tz: Tz) -> Result<Self, CalendarError> {
        let attendees = request.attendee_emails().map_err(|member| {
            CalendarError::invalid_event(format!("{} is not a valid email address", member))
        })?;

        Ok(Self {
            summary: request.title.trim().to_string(),
            description: request.description.trim().to_string(),
            start: localize(&request.start_date, tz, "start_date")?,
            end: localize(&request.end_date, tz, "end_date")?,
            attendees,
        })
    }

    pub fn validate(&self) -> Result<(), CalendarError> {
        if self.summary.is_empty() && self.description.is_empty() {
            return Err(CalendarError::invalid_event(
                "title and description are both empty",
            ));
        }
        if self.end < self.start {
            return Err(CalendarError::invalid_event("end_date is before start_date"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderOverride {
    /// "email" or "popup"
    pub method: String,
    pub minutes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceRequest {
    /// e.g. "hangoutsMeet"
    pub solution_type: String,
    /// Client-chosen id; Google deduplicates create requests on it
    pub request_id: String,
}

/// Customisation applied on top of an [`EventDraft`]
#[derive(Debug, Clone, Default)]
pub struct EventOptions {
    pub location: Option<String>,
    pub reminders: Vec<ReminderOverride>,
    pub guests_can_modify: bool,
    pub guests_can_invite_others: bool,
    pub guests_can_see_other_guests: bool,
    pub recurrence: Vec<String>,
    pub visibility: Option<String>,
    pub conference: Option<ConferenceRequest>,
    pub notify: Notify,
}

impl EventOptions {
    /// Options every event created through the API gets: a single occurrence with a Meet
    /// link, email and popup reminders, and guests unable to edit, invite or see each other.
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self {
            location: Some(config.default_location.clone()),
            reminders: vec![
                ReminderOverride {
                    method: "email".to_string(),
                    minutes: config.reminder_email_minutes,
                },
                ReminderOverride {
                    method: "popup".to_string(),
                    minutes: config.reminder_popup_minutes,
                },
            ],
            guests_can_modify: false,
            guests_can_invite_others: false,
            guests_can_see_other_guests: false,
            recurrence: vec!["RRULE:FREQ=DAILY;INTERVAL=1;COUNT=1".to_string()],
            visibility: Some("default".to_string()),
            conference: Some(ConferenceRequest {
                solution_type: "hangoutsMeet".to_string(),
                request_id: uuid::Uuid::new_v4().simple().to_string(),
            }),
            notify: Notify::default(),
        }
    }
}

/// Wraps a user's calendar client with the app's event semantics.
pub struct CalendarService {
    api: Arc<dyn CalendarApi>,
    max_results: i32,
}

impl CalendarService {
    pub fn new(api: Arc<dyn CalendarApi>, max_results: i32) -> Self {
        Self { api, max_results }
    }

    /// Expanded (single) events of the calendar, one page at a time.
    pub async fn current_users_events(
        &self,
        page_token: Option<&str>,
    ) -> Result<EventsPage, CalendarError> {
        self.api.list_events(page_token, self.max_results).await
    }

    pub async fn show_event(&self, event_id: &str) -> Result<Event, CalendarError> {
        self.api.get_event(event_id).await
    }

    pub async fn create_calendar_event(
        &self,
        draft: &EventDraft,
        options: &EventOptions,
    ) -> Result<Event, CalendarError> {
        draft.validate()?;
        let event = build_event(draft, options);
        self.api.insert_event(event, &options.notify).await
    }

    /// Delete the event and notify attendees. An event Google reports as gone counts as cancelled.
    pub async fn cancel_event(&self, event_id: &str) -> Result<(), CalendarError> {
        match self.api.delete_event(event_id, &Notify::default()).await {
            Err(e) if e.is_gone() => {
                tracing::info!("Event {} was already cancelled", event_id);
                Ok(())
            }
            other => other,
        }
    }
}
