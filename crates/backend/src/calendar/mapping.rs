//! Conversion between the plain event types and the google-calendar3 object model.

use chrono::Utc;
use google_calendar3::api::{
    ConferenceData, ConferenceSolutionKey, CreateConferenceRequest, Event, EventAttendee,
    EventDateTime, EventReminder, EventReminders,
};
use shared_types::{CalendarEvent, EventTime};

use super::service::{EventDraft, EventOptions};

/// Build the API event for a draft, applying the customisation options.
pub fn build_event(draft: &EventDraft, options: &EventOptions) -> Event {
    let time_zone = draft.start.timezone().name().to_string();

    let mut event = Event {
        summary: Some(draft.summary.clone()),
        description: Some(draft.description.clone()),
        start: Some(EventDateTime {
            date_time: Some(draft.start.with_timezone(&Utc)),
            time_zone: Some(time_zone.clone()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(draft.end.with_timezone(&Utc)),
            time_zone: Some(time_zone),
            ..Default::default()
        }),
        location: options.location.clone(),
        guests_can_modify: Some(options.guests_can_modify),
        guests_can_invite_others: Some(options.guests_can_invite_others),
        guests_can_see_other_guests: Some(options.guests_can_see_other_guests),
        visibility: options.visibility.clone(),
        ..Default::default()
    };

    if !options.recurrence.is_empty() {
        event.recurrence = Some(options.recurrence.clone());
    }

    if !options.reminders.is_empty() {
        let overrides = options
            .reminders
            .iter()
            .map(|reminder| EventReminder {
                method: Some(reminder.method.clone()),
                minutes: Some(reminder.minutes),
            })
            .collect();

        event.reminders = Some(EventReminders {
            use_default: Some(false),
            overrides: Some(overrides),
        });
    }

    if !draft.attendees.is_empty() {
        let attendees = draft
            .attendees
            .iter()
            .map(|email| EventAttendee {
                email: Some(email.clone()),
                ..Default::default()
            })
            .collect();
        event.attendees = Some(attendees);
    }

    if let Some(conference) = &options.conference {
        event.conference_data = Some(ConferenceData {
            create_request: Some(CreateConferenceRequest {
                conference_solution_key: Some(ConferenceSolutionKey {
                    type_: Some(conference.solution_type.clone()),
                }),
                request_id: Some(conference.request_id.clone()),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    event
}

fn event_time(time: EventDateTime) -> EventTime {
    EventTime {
        date_time: time.date_time,
        date: time.date,
        time_zone: time.time_zone,
    }
}

/// Flatten an API event into the plain view returned to clients.
pub fn to_calendar_event(event: Event) -> CalendarEvent {
    let attendees = event
        .attendees
        .unwrap_or_default()
        .into_iter()
        .filter_map(|attendee| {
            Some(shared_types::EventAttendee {
                email: attendee.email?,
                display_name: attendee.display_name,
                response_status: attendee.response_status,
            })
        })
        .collect();

    CalendarEvent {
        id: event.id.unwrap_or_default(),
        summary: event.summary,
        description: event.description,
        location: event.location,
        status: event.status,
        html_link: event.html_link,
        hangout_link: event.hangout_link,
        start: event.start.map(event_time),
        end: event.end.map(event_time),
        attendees,
        organizer_email: event.organizer.and_then(|organizer| organizer.email),
        recurrence: event.recurrence.unwrap_or_default(),
        created: event.created,
        updated: event.updated,
    }
}
