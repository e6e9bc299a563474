//! Google Calendar v3 REST accessor.
//!
//! [`GoogleCalendar`] implements [`CalendarAccessor`] for one calendar over
//! HTTPS, authenticating every request with a bearer token from a
//! [`TokenSource`]. [`GoogleConnector`] vends one per calendar id and is what
//! [`crate::GoogleEvents`] is usually built on.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Months, NaiveTime, Utc};
use gcal_core::Params;
use gcal_core::time::format_rfc3339;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::auth::TokenSource;
use crate::calendar::{BoxFuture, CalendarAccessor, CalendarConnector, EventPage, Payload};
use crate::config::CalendarSettings;
use crate::error::{EventsError, EventsResult};
use crate::events::{GoogleEvents, ORDER_BY};

/// Base URL for Google Calendar API v3.
pub const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client.
pub fn http_client(timeout: Duration) -> EventsResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EventsError::internal(format!("failed to create HTTP client: {e}")).with_source(e))
}

/// Query parameters for a listing: the defaults, then the caller's.
///
/// Without bounds the window runs from today 00:00 UTC to the end of the day
/// one year from `now`. Caller parameters are applied last and win.
pub fn list_query(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    parameters: &Params,
    now: DateTime<Utc>,
) -> Params {
    let time_min = start.unwrap_or_else(|| now.date_naive().and_time(NaiveTime::MIN).and_utc());
    let time_max = end.unwrap_or_else(|| {
        let day = now
            .checked_add_months(Months::new(12))
            .unwrap_or(now)
            .date_naive();
        day.and_hms_opt(23, 59, 59)
            .map(|at| at.and_utc())
            .unwrap_or(now)
    });

    let mut query = Params::new();
    query.insert("singleEvents".into(), Value::Bool(true));
    query.insert(ORDER_BY.into(), Value::String("startTime".into()));
    query.insert("timeMin".into(), Value::String(format_rfc3339(&time_min)));
    query.insert("timeMax".into(), Value::String(format_rfc3339(&time_max)));
    query.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
    query
}

/// Flattens parameters into query string pairs.
fn query_pairs(parameters: &Params) -> Vec<(String, String)> {
    parameters
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), value)
        })
        .collect()
}

/// The events resource of one Google calendar.
pub struct GoogleCalendar {
    calendar_id: String,
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleCalendar {
    pub fn new(calendar_id: impl Into<String>, tokens: Arc<dyn TokenSource>) -> EventsResult<Self> {
        Ok(Self {
            calendar_id: calendar_id.into(),
            base_url: CALENDAR_API_BASE.to_string(),
            http: http_client(DEFAULT_TIMEOUT)?,
            tokens,
        })
    }

    /// Builder method to point the accessor at another API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(&self.calendar_id)
        )
    }

    fn event_url(&self, event_id: &str) -> String {
        format!("{}/{}", self.events_url(), urlencoding::encode(event_id))
    }

    async fn send(&self, request: RequestBuilder) -> EventsResult<reqwest::Response> {
        let token = self.tokens.access_token().await?;

        let response = request.bearer_auth(token).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timeout".to_string()
            } else if e.is_connect() {
                format!("connection failed: {e}")
            } else {
                format!("request failed: {e}")
            };
            EventsError::network(message).with_source(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                Err(EventsError::rate_limited(format!(
                    "rate limit exceeded{}",
                    retry_after
                        .map(|s| format!(", retry after {s} seconds"))
                        .unwrap_or_default()
                )))
            }
            StatusCode::UNAUTHORIZED => Err(EventsError::authentication(
                "access token expired or invalid",
            )),
            StatusCode::FORBIDDEN => Err(EventsError::authorization(format!(
                "access denied to calendar {}",
                self.calendar_id
            ))),
            StatusCode::NOT_FOUND => Err(EventsError::not_found(format!(
                "not found: {}",
                response.url().path()
            ))),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(EventsError::server(format!("API error ({status}): {body}")))
            }
        }
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> EventsResult<T> {
        let body = response
            .text()
            .await
            .map_err(|e| EventsError::network(format!("failed to read response: {e}")))?;

        serde_json::from_str(&body).map_err(|e| {
            EventsError::invalid_response(format!("failed to parse response: {e}")).with_source(e)
        })
    }
}

impl CalendarAccessor for GoogleCalendar {
    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn list_events<'a>(
        &'a self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        parameters: &'a Params,
    ) -> BoxFuture<'a, EventsResult<EventPage>> {
        Box::pin(async move {
            let query = list_query(start, end, parameters, Utc::now());
            debug!(calendar_id = %self.calendar_id, ?query, "listing events");

            let request = self.http.get(self.events_url()).query(&query_pairs(&query));
            let page: EventPage = Self::parse(self.send(request).await?).await?;

            debug!(count = page.items.len(), has_more = page.next_page_token.is_some(), "fetched page");
            Ok(page)
        })
    }

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, EventsResult<Payload>> {
        Box::pin(async move {
            let request = self.http.get(self.event_url(event_id));
            Self::parse(self.send(request).await?).await
        })
    }

    fn insert_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>> {
        Box::pin(async move {
            let request = self
                .http
                .post(self.events_url())
                .query(&query_pairs(options))
                .json(&event);
            Self::parse(self.send(request).await?).await
        })
    }

    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, EventsResult<Payload>> {
        Box::pin(async move {
            let request = self
                .http
                .post(format!("{}/quickAdd", self.events_url()))
                .query(&[("text", text)]);
            Self::parse(self.send(request).await?).await
        })
    }

    fn update_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>> {
        Box::pin(async move {
            let event_id = match event.get("id") {
                Some(Value::String(id)) if !id.is_empty() => id.clone(),
                Some(Value::Number(id)) => id.to_string(),
                _ => return Err(EventsError::invalid_event("cannot update an event without an id")),
            };

            let request = self
                .http
                .put(self.event_url(&event_id))
                .query(&query_pairs(options))
                .json(&event);
            Self::parse(self.send(request).await?).await
        })
    }

    fn delete_event<'a>(
        &'a self,
        event_id: &'a str,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<()>> {
        Box::pin(async move {
            let request = self
                .http
                .delete(self.event_url(event_id))
                .query(&query_pairs(options));
            self.send(request).await?;
            Ok(())
        })
    }
}

/// Vends [`GoogleCalendar`] accessors sharing one HTTP client and token source.
pub struct GoogleConnector {
    base_url: String,
    http: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleConnector {
    pub fn new(tokens: Arc<dyn TokenSource>) -> EventsResult<Self> {
        Ok(Self {
            base_url: CALENDAR_API_BASE.to_string(),
            http: http_client(DEFAULT_TIMEOUT)?,
            tokens,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl CalendarConnector for GoogleConnector {
    fn connect(&self, calendar_id: &str) -> EventsResult<Arc<dyn CalendarAccessor>> {
        Ok(Arc::new(GoogleCalendar {
            calendar_id: calendar_id.to_string(),
            base_url: self.base_url.clone(),
            http: self.http.clone(),
            tokens: self.tokens.clone(),
        }))
    }
}

impl GoogleEvents {
    /// Builds the real gateway from validated settings.
    pub fn from_settings(settings: &CalendarSettings) -> EventsResult<Self> {
        let tokens = settings.token_source()?;
        let connector = GoogleConnector::new(tokens)?;
        let mut events = GoogleEvents::new(Arc::new(connector));
        if let Some(calendar_id) = settings.calendar_id() {
            events = events.with_default_calendar_id(calendar_id);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenSource;
    use crate::error::ErrorCode;
    use chrono::TimeZone;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn calendar(server: &MockServer, calendar_id: &str) -> Arc<dyn CalendarAccessor> {
        let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("test-token"));
        GoogleConnector::new(tokens)
            .unwrap()
            .with_base_url(server.uri())
            .connect(calendar_id)
            .unwrap()
    }

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn list_query_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let query = list_query(None, None, &Params::new(), now);

        assert_eq!(query["singleEvents"], json!(true));
        assert_eq!(query["orderBy"], json!("startTime"));
        assert_eq!(query["timeMin"], json!("2024-03-15T00:00:00+00:00"));
        assert_eq!(query["timeMax"], json!("2025-03-15T23:59:59+00:00"));
    }

    #[test]
    fn list_query_caller_parameters_win() {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let parameters = Params::from([
            ("orderBy".to_string(), json!("updated")),
            ("q".to_string(), json!("standup")),
        ]);

        let query = list_query(Some(start), None, &parameters, now);

        assert_eq!(query["orderBy"], json!("updated"));
        assert_eq!(query["q"], json!("standup"));
        assert_eq!(query["timeMin"], json!("2024-01-01T08:00:00+00:00"));
    }

    #[test]
    fn query_pairs_stringify_values() {
        let pairs = query_pairs(&Params::from([
            ("conferenceDataVersion".to_string(), json!(1)),
            ("sendUpdates".to_string(), json!("all")),
            ("singleEvents".to_string(), json!(true)),
            ("skipped".to_string(), Value::Null),
        ]));

        assert_eq!(
            pairs,
            [
                ("conferenceDataVersion".to_string(), "1".to_string()),
                ("sendUpdates".to_string(), "all".to_string()),
                ("singleEvents".to_string(), "true".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn list_events_sends_defaults_and_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/team%40example.com/events"))
            .and(header("authorization", "Bearer test-token"))
            .and(query_param("singleEvents", "true"))
            .and(query_param("orderBy", "startTime"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "kind": "calendar#events",
                "items": [{"id": "evt", "summary": "Standup"}],
                "nextPageToken": "p3",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let parameters = Params::from([("pageToken".to_string(), json!("p2"))]);
        let page = calendar(&server, "team@example.com")
            .list_events(None, None, &parameters)
            .await
            .unwrap();

        assert_eq!(page.items[0]["summary"], "Standup");
        assert_eq!(page.next_page_token.as_deref(), Some("p3"));
    }

    #[tokio::test]
    async fn insert_sends_payload_and_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .and(query_param("conferenceDataVersion", "1"))
            .and(body_json(json!({"summary": "Planning"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "new", "summary": "Planning"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let options = Params::from([("conferenceDataVersion".to_string(), json!(1))]);
        let created = calendar(&server, "primary")
            .insert_event(payload(json!({"summary": "Planning"})), &options)
            .await
            .unwrap();

        assert_eq!(created["id"], "new");
    }

    #[tokio::test]
    async fn quick_add_sends_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events/quickAdd"))
            .and(query_param("text", "Lunch tomorrow at noon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "quick"})))
            .expect(1)
            .mount(&server)
            .await;

        let created = calendar(&server, "primary")
            .quick_add("Lunch tomorrow at noon")
            .await
            .unwrap();
        assert_eq!(created["id"], "quick");
    }

    #[tokio::test]
    async fn update_puts_to_event_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/calendars/primary/events/evt1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "evt1", "summary": "Renamed"})))
            .expect(1)
            .mount(&server)
            .await;

        let updated = calendar(&server, "primary")
            .update_event(payload(json!({"id": "evt1", "summary": "Renamed"})), &Params::new())
            .await
            .unwrap();
        assert_eq!(updated["summary"], "Renamed");
    }

    #[tokio::test]
    async fn update_without_id_is_rejected_locally() {
        let server = MockServer::start().await;
        let err = calendar(&server, "primary")
            .update_event(payload(json!({"summary": "x"})), &Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEvent);
    }

    #[tokio::test]
    async fn delete_accepts_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/evt1"))
            .and(query_param("sendUpdates", "none"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let options = Params::from([("sendUpdates".to_string(), json!("none"))]);
        calendar(&server, "primary")
            .delete_event("evt1", &options)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn status_codes_map_to_error_codes() {
        let cases = [
            (401, ErrorCode::AuthenticationFailed),
            (403, ErrorCode::AuthorizationFailed),
            (404, ErrorCode::NotFound),
            (500, ErrorCode::ServerError),
        ];

        for (status, code) in cases {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let err = calendar(&server, "primary").get_event("evt").await.unwrap_err();
            assert_eq!(err.code(), code, "status {status}");
        }
    }

    #[tokio::test]
    async fn rate_limit_reports_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let err = calendar(&server, "primary").get_event("evt").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::RateLimited);
        assert_eq!(err.message(), "rate limit exceeded, retry after 30 seconds");
    }

    #[tokio::test]
    async fn unparsable_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = calendar(&server, "primary").get_event("evt").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidResponse);
    }

    #[tokio::test]
    async fn gateway_over_rest_accessor() {
        use crate::events::{EventQuery, EventsGateway};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"id": "b", "start": {"dateTime": "2024-03-15T11:00:00+00:00"}},
                    {"id": "a", "start": {"dateTime": "2024-03-15T09:00:00+00:00"}},
                ]
            })))
            .mount(&server)
            .await;

        let tokens: Arc<dyn TokenSource> = Arc::new(StaticTokenSource::new("t"));
        let connector = GoogleConnector::new(tokens).unwrap().with_base_url(server.uri());
        let events = GoogleEvents::new(Arc::new(connector)).with_default_calendar_id("primary");

        let listed = events.get(EventQuery::new()).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, ["a", "b"]);
    }
}
