//! Google Calendar wrapper.
//!
//! This module provides:
//! - `CalendarApi`, the seam over the google-calendar3 client, and its per-user connector
//! - `CalendarService`, which applies the app's event semantics on top of it
//! - Mapping between plain event data and the API object model
//! - `CalendarError`, the classification of API failures

mod client;
mod error;
pub mod mapping;
mod service;

pub use client::{CalendarApi, CalendarConnector, GoogleCalendarConnector};
pub use error::CalendarError;
pub use service::{CalendarService, EventDraft, EventOptions};

#[cfg(test)]
pub(crate) use service::testing;
