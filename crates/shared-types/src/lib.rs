use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ============================================================================
// Calendar Event Types
// ============================================================================

/// Start or end of an event. Timed events carry `date_time`, all-day events carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    pub date_time: Option<DateTime<Utc>>,
    pub date: Option<NaiveDate>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttendee {
    pub email: String,
    pub display_name: Option<String>,
    pub response_status: Option<String>, // "needsAction", "accepted", "declined", "tentative"
}

/// Plain view of a Google Calendar event as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub html_link: Option<String>,
    /// Google Meet link when a conference was attached
    pub hangout_link: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    #[serde(default)]
    pub attendees: Vec<EventAttendee>,
    pub organizer_email: Option<String>,
    #[serde(default)]
    pub recurrence: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

/// Query parameters for listing events
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EventListQuery {
    pub page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventListResponse {
    pub items: Vec<CalendarEvent>,
    pub next_page_token: Option<String>,
}

/// Request body for creating an event.
///
/// `start_date` and `end_date` are wall-clock times in the server's configured
/// calendar time zone. `members` is a comma-separated list of attendee emails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    #[serde(default)]
    pub members: String,
}

impl CreateEventRequest {
    /// Attendee emails from `members`, trimmed with empty entries dropped.
    ///
    /// Returns the first entry that does not look like an email address as the error.
    pub fn attendee_emails(&self) -> Result<Vec<String>, String> {
        parse_members(&self.members)
    }
}

/// Blank event form returned by `GET /api/events/new`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEventForm {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub members: String,
    pub time_zone: String,
    pub location: String,
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s,]+@[^@\s,]+\.[^@\s,]+$").expect("valid email regex")
    })
}

/// Split a comma-separated member list into attendee emails.
pub fn parse_members(raw: &str) -> Result<Vec<String>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(|member| {
            if email_pattern().is_match(member) {
                Ok(member.to_string())
            } else {
                Err(member.to_string())
            }
        })
        .collect()
}

// ============================================================================
// Auth Types
// ============================================================================

/// Response for current authenticated user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUserResponse {
    pub email: String,
    pub name: Option<String>,
}

/// Response when initiating login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInitResponse {
    pub auth_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_members_trims_and_drops_empty() {
        let members = parse_members(" a@example.com,b@example.com , ,").unwrap();
        assert_eq!(members, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_parse_members_empty_string() {
        assert!(parse_members("").unwrap().is_empty());
        assert!(parse_members("   ").unwrap().is_empty());
    }

    #[test]
    fn test_parse_members_rejects_invalid_entry() {
        let err = parse_members("a@example.com, not-an-email").unwrap_err();
        assert_eq!(err, "not-an-email");
    }

    #[test]
    fn test_create_request_deserializes_with_defaults() {
        let req: CreateEventRequest = serde_json::from_str(
            r#"{"title":"Standup","start_date":"2024-03-01T10:00:00","end_date":"2024-03-01T10:30:00"}"#,
        )
        .unwrap();

        assert_eq!(req.title, "Standup");
        assert!(req.description.is_empty());
        assert!(req.attendee_emails().unwrap().is_empty());
    }

    #[test]
    fn test_calendar_event_missing_lists_default_to_empty() {
        let event: CalendarEvent = serde_json::from_str(
            r#"{"id":"abc","summary":null,"description":null,"location":null,"status":null,
                "html_link":null,"hangout_link":null,"start":null,"end":null,
                "organizer_email":null,"created":null,"updated":null}"#,
        )
        .unwrap();

        assert!(event.attendees.is_empty());
        assert!(event.recurrence.is_empty());
    }
}
