//! The events gateway.
//!
//! [`EventsGateway`] is the surface applications program against: create,
//! quick-create, update, find, list and delete events, with calendar-id
//! resolution. [`GoogleEvents`] implements it on top of a
//! [`CalendarConnector`]; [`crate::testing::EventsFake`] implements it in
//! memory for tests. Hand the gateway around as `Arc<dyn EventsGateway>` and
//! substitute the fake where a test needs one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gcal_core::{Event, Params, PropertyBag};
use serde_json::Value;
use tracing::debug;

use crate::calendar::{BoxFuture, CalendarAccessor, CalendarConnector, PAGE_TOKEN};
use crate::error::{EventsError, EventsResult};

/// Query parameter that makes the remote ordering authoritative.
pub const ORDER_BY: &str = "orderBy";

/// What to create: a prepared record or a bag of properties.
#[derive(Debug, Clone, PartialEq)]
pub enum EventInput {
    Properties(PropertyBag),
    Event(Event),
}

impl From<PropertyBag> for EventInput {
    fn from(value: PropertyBag) -> Self {
        Self::Properties(value)
    }
}

impl From<Event> for EventInput {
    fn from(value: Event) -> Self {
        Self::Event(value)
    }
}

/// Arguments of a listing: time window, extra query parameters, calendar.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventQuery {
    /// Lower bound (inclusive) on event end times.
    pub start: Option<DateTime<Utc>>,
    /// Upper bound (exclusive) on event start times.
    pub end: Option<DateTime<Utc>>,
    /// Extra query parameters (`orderBy`, `q`, `maxResults`, ...).
    pub parameters: Params,
    /// Calendar to list; the configured default when unset.
    pub calendar_id: Option<String>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Params) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn in_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    /// True when the caller asked for a specific remote ordering.
    pub fn has_order_by(&self) -> bool {
        self.parameters.contains_key(ORDER_BY)
    }
}

/// Calendar event operations.
pub trait EventsGateway: Send + Sync {
    /// Resolves the calendar to use: the argument, else the configured default.
    ///
    /// # Errors
    ///
    /// A configuration error when neither is available.
    fn calendar_id(&self, calendar_id: Option<&str>) -> EventsResult<String>;

    /// The accessor for a calendar, resolved like [`EventsGateway::calendar_id`].
    fn calendar(&self, calendar_id: Option<&str>) -> EventsResult<Arc<dyn CalendarAccessor>>;

    /// Creates an event in `calendar_id`, else the record's own calendar, else
    /// the default.
    fn create<'a>(
        &'a self,
        input: EventInput,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<Event>>;

    /// Creates an event from a free-text description.
    fn quick_create<'a>(
        &'a self,
        text: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>>;

    /// Sends a saved event's current state to its calendar.
    fn update<'a>(&'a self, event: Event, options: Params) -> BoxFuture<'a, EventsResult<Event>>;

    /// Fetches one event by id.
    fn find<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>>;

    /// Lists events, following every page.
    fn get<'a>(&'a self, query: EventQuery) -> BoxFuture<'a, EventsResult<Vec<Event>>>;

    /// Deletes an event by id.
    fn delete<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<()>>;

    /// Updates the event if it has been saved before, creates it otherwise.
    fn save<'a>(&'a self, event: Event, options: Params) -> BoxFuture<'a, EventsResult<Event>> {
        if event.exists() {
            self.update(event, options)
        } else {
            self.create(event.into(), None, options)
        }
    }

    /// Quick-creates `text` in the calendar of `event`.
    fn quick_save<'a>(&'a self, event: &'a Event, text: &'a str) -> BoxFuture<'a, EventsResult<Event>> {
        self.quick_create(text, event.calendar_id())
    }

    /// Applies `attributes` to the event and saves it.
    fn update_with<'a>(
        &'a self,
        mut event: Event,
        attributes: &PropertyBag,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        if let Err(err) = event.apply(attributes) {
            return Box::pin(async move { Err(err.into()) });
        }
        self.save(event, options)
    }

    /// Deletes a saved event; does nothing for one that was never saved.
    fn delete_event<'a>(&'a self, event: &'a Event, options: Params) -> BoxFuture<'a, EventsResult<()>> {
        match event.id().filter(|id| !id.is_empty()) {
            Some(id) => self.delete(id, event.calendar_id(), options),
            None => Box::pin(async { Ok(()) }),
        }
    }
}

/// The gateway backed by a remote calendar service.
pub struct GoogleEvents {
    connector: Arc<dyn CalendarConnector>,
    default_calendar_id: Option<String>,
}

impl GoogleEvents {
    pub fn new(connector: Arc<dyn CalendarConnector>) -> Self {
        Self {
            connector,
            default_calendar_id: None,
        }
    }

    /// Builder method to set the calendar used when none is passed.
    pub fn with_default_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.default_calendar_id = Some(calendar_id.into()).filter(|id| !id.is_empty());
        self
    }

    pub fn default_calendar_id(&self) -> Option<&str> {
        self.default_calendar_id.as_deref()
    }

    fn accessor(&self, calendar_id: &str) -> EventsResult<Arc<dyn CalendarAccessor>> {
        self.connector.connect(calendar_id)
    }
}

/// Orders events by sort date, keeping arrival order among equal keys.
fn sort_by_sort_date(events: Vec<Event>) -> EventsResult<Vec<Event>> {
    let mut keyed = Vec::with_capacity(events.len());
    for event in events {
        keyed.push((event.sort_date()?.sort_key(), event));
    }
    keyed.sort_by_key(|(key, _)| *key);
    Ok(keyed.into_iter().map(|(_, event)| event).collect())
}

impl EventsGateway for GoogleEvents {
    fn calendar_id(&self, calendar_id: Option<&str>) -> EventsResult<String> {
        calendar_id
            .or(self.default_calendar_id.as_deref())
            .map(str::to_string)
            .ok_or_else(EventsError::no_default_calendar_id)
    }

    fn calendar(&self, calendar_id: Option<&str>) -> EventsResult<Arc<dyn CalendarAccessor>> {
        let calendar_id = self.calendar_id(calendar_id)?;
        self.accessor(&calendar_id)
    }

    fn create<'a>(
        &'a self,
        input: EventInput,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        Box::pin(async move {
            let event = match input {
                EventInput::Event(event) => event,
                EventInput::Properties(properties) => Event::from_properties(&properties, None)?,
            };
            let calendar_id = self.calendar_id(calendar_id.or(event.calendar_id()))?;

            let mut options = options;
            options.extend(event.additional_options());

            debug!(calendar_id, "inserting event");
            let calendar = self.accessor(&calendar_id)?;
            let payload = calendar.insert_event(event.into_payload(), &options).await?;

            Ok(Event::from_payload(payload, Some(&calendar_id)))
        })
    }

    fn quick_create<'a>(
        &'a self,
        text: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        Box::pin(async move {
            let calendar_id = self.calendar_id(calendar_id)?;

            debug!(calendar_id, text, "quick-adding event");
            let calendar = self.accessor(&calendar_id)?;
            let payload = calendar.quick_add(text).await?;

            Ok(Event::from_payload(payload, Some(&calendar_id)))
        })
    }

    fn update<'a>(&'a self, event: Event, options: Params) -> BoxFuture<'a, EventsResult<Event>> {
        Box::pin(async move {
            if !event.exists() {
                return Err(EventsError::invalid_event(
                    "cannot update an event without an id",
                ));
            }
            let calendar_id = self.calendar_id(event.calendar_id())?;

            let mut options = options;
            options.extend(event.additional_options());

            debug!(calendar_id, event_id = event.id(), "updating event");
            let calendar = self.accessor(&calendar_id)?;
            let payload = calendar.update_event(event.into_payload(), &options).await?;

            Ok(Event::from_payload(payload, Some(&calendar_id)))
        })
    }

    fn find<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        Box::pin(async move {
            let calendar_id = self.calendar_id(calendar_id)?;

            debug!(calendar_id, event_id, "fetching event");
            let calendar = self.accessor(&calendar_id)?;
            let payload = calendar.get_event(event_id).await?;

            Ok(Event::from_payload(payload, Some(&calendar_id)))
        })
    }

    fn get<'a>(&'a self, query: EventQuery) -> BoxFuture<'a, EventsResult<Vec<Event>>> {
        Box::pin(async move {
            let calendar_id = self.calendar_id(query.calendar_id.as_deref())?;
            let calendar = self.accessor(&calendar_id)?;
            let use_caller_order = query.has_order_by();
            let EventQuery {
                start,
                end,
                mut parameters,
                ..
            } = query;

            let mut page = calendar.list_events(start, end, &parameters).await?;
            let mut items = std::mem::take(&mut page.items);
            let mut pages = 1usize;

            while let Some(token) = page.next_page_token.take().filter(|t| !t.is_empty()) {
                parameters.insert(PAGE_TOKEN.into(), Value::String(token));
                page = calendar.list_events(start, end, &parameters).await?;
                items.append(&mut page.items);
                pages += 1;
            }

            debug!(calendar_id, pages, count = items.len(), "listed events");

            let events = items
                .into_iter()
                .map(|payload| Event::from_payload(payload, Some(&calendar_id)))
                .collect::<Vec<_>>();

            if use_caller_order {
                Ok(events)
            } else {
                sort_by_sort_date(events)
            }
        })
    }

    fn delete<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<()>> {
        Box::pin(async move {
            let calendar_id = self.calendar_id(calendar_id)?;

            debug!(calendar_id, event_id, "deleting event");
            let calendar = self.accessor(&calendar_id)?;
            calendar.delete_event(event_id, &options).await
        })
    }
}
