use anyhow::{bail, Context};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shared_types::{CalendarEvent, CreateEventRequest, EventListResponse, NewEventForm};

#[derive(Parser)]
#[command(name = "events-cli")]
#[command(about = "CLI for viewing, creating and cancelling Google Calendar events via the backend API")]
#[command(
    long_about = "A command-line interface for the events backend server.\n\n\
    Lists the signed-in user's calendar events, shows a single event, creates\n\
    events with attendees and a Meet link, and cancels events."
)]
struct Cli {
    /// Backend server URL to connect to.
    #[arg(
        short,
        long,
        default_value = "http://localhost:3000",
        env = "EVENTS_API_URL"
    )]
    base_url: String,

    /// Session token, sent as a Bearer token.
    ///
    /// Copy the value of the auth_token cookie after signing in with Google.
    #[arg(short, long, env = "EVENTS_API_TOKEN", hide_env_values = true)]
    token: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List events on the calendar
    ///
    /// Events sharing a title are shown once. When more events are available
    /// the token for the next page is printed.
    List {
        /// Token printed by a previous 'list' to fetch the next page.
        #[arg(short, long, value_name = "TOKEN")]
        page_token: Option<String>,
    },

    /// Show a single event with its attendees
    Show {
        /// The event ID, as shown in brackets by 'list'.
        id: String,
    },

    /// Print the defaults the server uses for new events
    New,

    /// Create an event and invite its members
    ///
    /// Times are wall-clock times in the server's calendar time zone
    /// (see 'new'). Accepted formats: 2024-03-01T10:00 or "2024-03-01 10:00".
    Create {
        #[arg(short, long, default_value = "", value_name = "TEXT")]
        title: String,

        #[arg(short, long, default_value = "", value_name = "TEXT")]
        description: String,

        #[arg(short, long, value_name = "DATETIME", value_parser = parse_datetime)]
        start: NaiveDateTime,

        #[arg(short, long, value_name = "DATETIME", value_parser = parse_datetime)]
        end: NaiveDateTime,

        /// Comma-separated attendee emails.
        #[arg(short, long, default_value = "", value_name = "EMAILS")]
        members: String,
    },

    /// Cancel an event and notify its attendees
    Cancel {
        /// The event ID, as shown in brackets by 'list'.
        id: String,
    },
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

fn parse_datetime(value: &str) -> Result<NaiveDateTime, String> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value.trim(), format).ok())
        .ok_or_else(|| format!("'{}' is not a date and time like 2024-03-01T10:00", value))
}

/// Error body returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: String,
    details: Option<String>,
}

async fn check(response: Response) -> anyhow::Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(err) => match err.details {
            Some(details) => bail!("{} ({}): {}", err.error, status, details),
            None => bail!("{} ({})", err.error, status),
        },
        Err(_) => bail!("Request failed with {}: {}", status, body),
    }
}

async fn fetch<T: DeserializeOwned>(request: RequestBuilder) -> anyhow::Result<T> {
    let response = check(request.send().await.context("Failed to reach server")?).await?;
    response.json().await.context("Unexpected response from server")
}

fn print_event(event: &CalendarEvent) {
    let title = event.summary.as_deref().unwrap_or("(no title)");
    // All-day events only carry a date
    let when = match &event.start {
        Some(start) => match (start.date_time, start.date) {
            (Some(date_time), _) => date_time.to_rfc3339(),
            (None, Some(date)) => date.to_string(),
            (None, None) => String::new(),
        },
        None => String::new(),
    };
    println!("[{}] {}  {}", event.id, title, when);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let url = format!("{}/api/events", cli.base_url.trim_end_matches('/'));

    match cli.command {
        Commands::List { page_token } => {
            let mut request = client.get(&url).bearer_auth(&cli.token);
            if let Some(page_token) = &page_token {
                request = request.query(&[("page_token", page_token)]);
            }
            let page: EventListResponse = fetch(request).await?;

            if page.items.is_empty() {
                println!("No events found.");
            }
            for event in &page.items {
                print_event(event);
            }
            if let Some(next) = page.next_page_token {
                println!("\nMore events: events-cli list --page-token {}", next);
            }
        }
        Commands::Show { id } => {
            let event: CalendarEvent = fetch(
                client
                    .get(format!("{}/{}", url, urlencoding::encode(&id)))
                    .bearer_auth(&cli.token),
            )
            .await?;

            print_event(&event);
            if let Some(description) = &event.description {
                println!("    {}", description);
            }
            if let Some(location) = &event.location {
                println!("    Location: {}", location);
            }
            if let Some(meet) = &event.hangout_link {
                println!("    Meet: {}", meet);
            }
            for attendee in &event.attendees {
                println!(
                    "    - {} ({})",
                    attendee.email,
                    attendee.response_status.as_deref().unwrap_or("needsAction")
                );
            }
        }
        Commands::New => {
            let form: NewEventForm =
                fetch(client.get(format!("{}/new", url)).bearer_auth(&cli.token)).await?;
            println!("Time zone: {}", form.time_zone);
            println!("Location:  {}", form.location);
            println!("Next slot: {} to {}", form.start_date, form.end_date);
        }
        Commands::Create {
            title,
            description,
            start,
            end,
            members,
        } => {
            let req = CreateEventRequest {
                title,
                description,
                start_date: start,
                end_date: end,
                members,
            };
            let event: CalendarEvent =
                fetch(client.post(&url).bearer_auth(&cli.token).json(&req)).await?;
            print!("Created event: ");
            print_event(&event);
            if let Some(link) = &event.html_link {
                println!("    {}", link);
            }
        }
        Commands::Cancel { id } => {
            check(
                client
                    .delete(format!("{}/{}", url, urlencoding::encode(&id)))
                    .bearer_auth(&cli.token)
                    .send()
                    .await
                    .context("Failed to reach server")?,
            )
            .await?;
            println!("Cancelled event: {}", id);
        }
    }

    Ok(())
}
