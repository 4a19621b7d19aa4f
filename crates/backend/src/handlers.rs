use std::collections::HashSet;

use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};
use chrono::{Duration, DurationRound, NaiveDateTime, Utc};
use shared_types::{
    CalendarEvent, CreateEventRequest, EventListQuery, EventListResponse, NewEventForm,
};

use crate::app::AppState;
use crate::auth::AuthUser;
use crate::calendar::{
    mapping::to_calendar_event, CalendarError, CalendarService, EventDraft, EventOptions,
};
use crate::error::ApiResult;

pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Calendar service acting as the signed-in user.
///
/// A user with no stored record or refresh token has to go through login
/// again, so both cases surface as an unauthorized calendar error.
async fn calendar_for(state: &AppState, user: &AuthUser) -> ApiResult<CalendarService> {
    let record = state
        .users
        .find_by_email(&user.email)
        .await?
        .ok_or(CalendarError::Unauthorized)?;

    let api = state.calendars.connect(&record).await?;
    Ok(CalendarService::new(api, state.calendar_config.max_results))
}

/// Keep the first event of each summary, in the order Google returned them
fn dedupe_by_summary(events: impl IntoIterator<Item = CalendarEvent>) -> Vec<CalendarEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(event.summary.clone()))
        .collect()
}

pub async fn list_events(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<EventListQuery>,
) -> ApiResult<Json<EventListResponse>> {
    let service = calendar_for(&state, &user).await?;
    let page = service
        .current_users_events(query.page_token.as_deref())
        .await?;

    let items = dedupe_by_summary(page.items.into_iter().map(to_calendar_event));

    Ok(Json(EventListResponse {
        items,
        next_page_token: page.next_page_token,
    }))
}

fn next_whole_hour(now: NaiveDateTime) -> NaiveDateTime {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now) + Duration::hours(1)
}

/// Blank form prefilled with a one hour slot starting at the next whole hour.
pub async fn new_event(State(state): State<AppState>) -> Json<NewEventForm> {
    let config = &state.calendar_config;
    let now = Utc::now().with_timezone(&config.time_zone).naive_local();
    let start_date = next_whole_hour(now);

    Json(NewEventForm {
        title: String::new(),
        description: String::new(),
        start_date,
        end_date: start_date + Duration::hours(1),
        members: String::new(),
        time_zone: config.time_zone.name().to_string(),
        location: config.default_location.clone(),
    })
}

pub async fn show_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> ApiResult<Json<CalendarEvent>> {
    let service = calendar_for(&state, &user).await?;
    let event = service.show_event(&event_id).await?;

    Ok(Json(to_calendar_event(event)))
}

pub async fn create_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateEventRequest>,
) -> ApiResult<Response> {
    let config = &state.calendar_config;
    let draft = EventDraft::from_request(&payload, config.time_zone)?;
    let options = EventOptions::from_config(config);

    let service = calendar_for(&state, &user).await?;
    let created = to_calendar_event(service.create_calendar_event(&draft, &options).await?);

    tracing::info!(
        "{} created event {} with {} attendee(s)",
        user.email,
        created.id,
        draft.attendees.len()
    );

    let location = format!("/api/events/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(created),
    )
        .into_response())
}

pub async fn cancel_event(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(event_id): Path<String>,
) -> ApiResult<StatusCode> {
    let service = calendar_for(&state, &user).await?;
    service.cancel_event(&event_id).await?;

    tracing::info!("{} cancelled event {}", user.email, event_id);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{body::Body, http::Request, Router};
    use google_calendar3::api::Event;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::app::{build_router, test_state};
    use crate::auth::types::test_config;
    use crate::calendar::testing::FakeCalendar;
    use crate::models::User;

    const EMAIL: &str = "test@example.com";

    fn app_with(calendar: Arc<FakeCalendar>, user: User) -> Router {
        build_router(test_state(calendar, user))
    }

    fn app(calendar: Arc<FakeCalendar>) -> Router {
        app_with(calendar, User::for_test(EMAIL, Some("refresh")))
    }

    fn bearer() -> String {
        let token = crate::auth::jwt::create_token(&test_config(), EMAIL, None).unwrap();
        format!("Bearer {}", token)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, bearer())
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::AUTHORIZATION, bearer())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn event(id: &str, summary: Option<&str>) -> Event {
        Event {
            id: Some(id.to_string()),
            summary: summary.map(String::from),
            ..Default::default()
        }
    }

    fn standup() -> Value {
        json!({
            "title": "Standup",
            "description": "Daily sync",
            "start_date": "2024-03-01T10:00:00",
            "end_date": "2024-03-01T10:30:00",
            "members": "a@example.com, b@example.com"
        })
    }

    #[test]
    fn test_next_whole_hour() {
        let now = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 41, 12)
            .unwrap();
        assert_eq!(next_whole_hour(now).to_string(), "2024-03-01 10:00:00");
    }

    #[tokio::test]
    async fn test_events_require_login() {
        let response = app(Arc::new(FakeCalendar::default()))
            .oneshot(Request::get("/api/events").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = app(Arc::new(FakeCalendar::default()))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_keeps_first_event_per_summary() {
        let calendar = FakeCalendar {
            next_page_token: Some("page2".to_string()),
            ..FakeCalendar::with_events(vec![
                event("1", Some("Standup")),
                event("2", Some("Standup")),
                event("3", Some("Retro")),
                event("4", None),
                event("5", None),
            ])
        };

        let response = app(Arc::new(calendar)).oneshot(get("/api/events")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        let ids: Vec<_> = body["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
        assert_eq!(body["next_page_token"], "page2");
    }

    #[tokio::test]
    async fn test_new_event_form_defaults() {
        let response = app(Arc::new(FakeCalendar::default()))
            .oneshot(get("/api/events/new"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let form: NewEventForm = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(form.time_zone, "Asia/Kolkata");
        assert_eq!(form.location, "Tntra Vadodara");
        assert_eq!(form.end_date - form.start_date, Duration::hours(1));
        assert_eq!(form.start_date.format("%M:%S").to_string(), "00:00");
    }

    #[tokio::test]
    async fn test_show_missing_event_passes_status_through() {
        let response = app(Arc::new(FakeCalendar::default()))
            .oneshot(get("/api/events/nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Please try again. There seems to be a Not Found error."
        );
    }

    #[tokio::test]
    async fn test_create_event() {
        let calendar = Arc::new(FakeCalendar::default());
        let response = app(calendar.clone())
            .oneshot(post_json("/api/events", standup()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::LOCATION], "/api/events/evt1");

        let body = body_json(response).await;
        assert_eq!(body["id"], "evt1");
        assert_eq!(body["summary"], "Standup");

        let inserted = calendar.inserted.lock().unwrap();
        let (event, notify) = &inserted[0];
        assert_eq!(event.attendees.as_ref().map(Vec::len), Some(2));
        assert_eq!(event.location.as_deref(), Some("Tntra Vadodara"));
        assert!(event.conference_data.is_some());
        assert_eq!(notify.send_updates, "all");
    }

    #[tokio::test]
    async fn test_create_without_details_is_unprocessable() {
        let calendar = Arc::new(FakeCalendar::default());
        let mut payload = standup();
        payload["title"] = json!("");
        payload["description"] = json!("");

        let response = app(calendar.clone())
            .oneshot(post_json("/api/events", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(
            body["error"],
            "Please pass necessary details for creating an event"
        );
        assert!(calendar.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_bad_member_is_unprocessable() {
        let calendar = Arc::new(FakeCalendar::default());
        let mut payload = standup();
        payload["members"] = json!("a@example.com, not-an-email");

        let response = app(calendar.clone())
            .oneshot(post_json("/api/events", payload))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(calendar.inserted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoked_google_access_signs_user_out() {
        let response = app(Arc::new(FakeCalendar::failing(401)))
            .oneshot(get("/api/events"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.starts_with("auth_token=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn test_user_without_refresh_token_is_unauthorized() {
        let response = app_with(
            Arc::new(FakeCalendar::default()),
            User::for_test(EMAIL, None),
        )
        .oneshot(get("/api/events"))
        .await
        .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_google_outage_is_bad_gateway() {
        let response = app(Arc::new(FakeCalendar::failing(503)))
            .oneshot(get("/api/events/evt1"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_cancel_event() {
        let calendar = Arc::new(FakeCalendar::with_events(vec![event("evt9", Some("Retro"))]));
        let request = Request::delete("/api/events/evt9")
            .header(header::AUTHORIZATION, bearer())
            .body(Body::empty())
            .unwrap();

        let response = app(calendar.clone()).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(*calendar.deleted.lock().unwrap(), vec!["evt9".to_string()]);
    }
}
