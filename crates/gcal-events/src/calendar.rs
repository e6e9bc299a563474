//! The per-calendar accessor contract.
//!
//! A [`CalendarAccessor`] is bound to one calendar id and exposes the raw
//! events resource: list, get, insert, quick-add, update, delete. Payloads are
//! plain JSON objects; wrapping them into [`gcal_core::Event`]s is the
//! gateway's job. Authentication, transport and error mapping live behind
//! this trait.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gcal_core::Params;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::EventsResult;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A JSON event resource.
pub type Payload = Map<String, Value>;

/// Query parameter carrying the continuation cursor of a listing.
pub const PAGE_TOKEN: &str = "pageToken";

/// One page of an events listing.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPage {
    #[serde(default)]
    pub items: Vec<Payload>,
    pub next_page_token: Option<String>,
}

impl EventPage {
    pub fn new(items: Vec<Payload>) -> Self {
        Self {
            items,
            next_page_token: None,
        }
    }

    /// Builder method to set the continuation cursor.
    pub fn with_next_page_token(mut self, token: impl Into<String>) -> Self {
        self.next_page_token = Some(token.into());
        self
    }
}

/// Access to the events of a single calendar.
pub trait CalendarAccessor: Send + Sync {
    /// The calendar this accessor is bound to.
    fn calendar_id(&self) -> &str;

    /// Lists one page of events in `[start, end)`.
    fn list_events<'a>(
        &'a self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        parameters: &'a Params,
    ) -> BoxFuture<'a, EventsResult<EventPage>>;

    /// Fetches one event by id.
    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, EventsResult<Payload>>;

    /// Creates an event.
    fn insert_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>>;

    /// Creates an event from free text; parsing happens remotely.
    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, EventsResult<Payload>>;

    /// Replaces an existing event; the payload must carry its `id`.
    fn update_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>>;

    /// Deletes an event.
    fn delete_event<'a>(
        &'a self,
        event_id: &'a str,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<()>>;
}

/// Vends an accessor for a calendar id.
pub trait CalendarConnector: Send + Sync {
    fn connect(&self, calendar_id: &str) -> EventsResult<Arc<dyn CalendarAccessor>>;
}
