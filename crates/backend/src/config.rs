//! Server configuration loaded from environment variables.

use std::env;
use std::net::SocketAddr;

use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` means permissive CORS (development only)
    pub cors_allowed_origins: Option<Vec<String>>,
    pub calendar: CalendarConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
                .parse()
                .context("BIND_ADDR must be a socket address like 0.0.0.0:3000")?,
            cors_allowed_origins,
            calendar: CalendarConfig::from_env()?,
        })
    }
}

/// Settings applied to every calendar request and to newly created events
#[derive(Debug, Clone)]
pub struct CalendarConfig {
    /// Calendar events are read from and written to (default: the user's primary calendar)
    pub calendar_id: String,
    /// Zone used to interpret submitted wall-clock times and stamped on created events
    pub time_zone: Tz,
    pub default_location: String,
    /// Page size for event listing. Google caps this at 2500.
    pub max_results: i32,
    pub reminder_email_minutes: i32,
    pub reminder_popup_minutes: i32,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: chrono_tz::Asia::Kolkata,
            default_location: "Tntra Vadodara".to_string(),
            max_results: 2500,
            reminder_email_minutes: 20,
            reminder_popup_minutes: 10,
        }
    }
}

impl CalendarConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let time_zone = match env::var("CALENDAR_TIME_ZONE") {
            Ok(name) => name
                .parse::<Tz>()
                .map_err(|_| anyhow!("CALENDAR_TIME_ZONE is not a valid IANA zone: {}", name))?,
            Err(_) => defaults.time_zone,
        };

        let max_results = parse_or("CALENDAR_MAX_RESULTS", defaults.max_results).clamp(1, 2500);

        Ok(Self {
            calendar_id: env::var("CALENDAR_ID").unwrap_or(defaults.calendar_id),
            time_zone,
            default_location: env::var("CALENDAR_DEFAULT_LOCATION")
                .unwrap_or(defaults.default_location),
            max_results,
            reminder_email_minutes: parse_or(
                "CALENDAR_REMINDER_EMAIL_MINUTES",
                defaults.reminder_email_minutes,
            ),
            reminder_popup_minutes: parse_or(
                "CALENDAR_REMINDER_POPUP_MINUTES",
                defaults.reminder_popup_minutes,
            ),
        })
    }
}

fn parse_or(var: &str, default: i32) -> i32 {
    env::var(var)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
