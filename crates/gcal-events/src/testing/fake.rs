//! The fake events gateway.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use gcal_core::{Event, Params, PropertyBag};
use tracing::debug;

use super::calendar::{MockCalendar, MockConnector};
use crate::calendar::{BoxFuture, CalendarAccessor};
use crate::error::{EventsError, EventsResult};
use crate::events::{EventInput, EventQuery, EventsGateway};

/// Calendar id used when no default is configured.
pub const PLACEHOLDER_CALENDAR_ID: &str = "calendarId";

/// Key of the quick-create fixture used when no text-specific one exists.
const DEFAULT_QUICK_CREATE: &str = "|DEFAULT|";

/// A canned response for `find`.
#[derive(Debug, Clone, PartialEq)]
pub struct FindFake {
    pub properties: PropertyBag,
    pub event_id: Option<String>,
    pub calendar_id: Option<String>,
}

impl FindFake {
    /// Answers any `find` with an event built from `properties`.
    pub fn returning(properties: PropertyBag) -> Self {
        Self {
            properties,
            event_id: None,
            calendar_id: None,
        }
    }

    /// Only answer lookups of this event id.
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// Only answer lookups in this calendar.
    pub fn in_calendar(mut self, calendar_id: impl Into<String>) -> Self {
        self.calendar_id = Some(calendar_id.into());
        self
    }

    fn matches(&self, event_id: &str, calendar_id: Option<&str>) -> bool {
        self.event_id.as_deref().is_none_or(|id| id == event_id)
            && self
                .calendar_id
                .as_deref()
                .is_none_or(|id| Some(id) == calendar_id)
    }
}

/// A canned response for `get`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetFake {
    pub events: Vec<PropertyBag>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Matches any parameters when empty.
    pub parameters: Params,
    pub calendar_id: Option<String>,
}

impl GetFake {
    /// Answers any `get` with events built from `events`, in this order.
    pub fn returning(events: Vec<PropertyBag>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn starting_at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    pub fn ending_at(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
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

    fn matches(&self, query: &EventQuery) -> bool {
        self.start.is_none_or(|start| Some(start) == query.start)
            && self.end.is_none_or(|end| Some(end) == query.end)
            && self
                .calendar_id
                .as_deref()
                .is_none_or(|id| Some(id) == query.calendar_id.as_deref())
            && (self.parameters.is_empty() || self.parameters == query.parameters)
    }
}

/// A logged `create` call.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCall {
    /// The properties passed, or `None` when a prepared record was passed.
    pub properties: Option<PropertyBag>,
    /// The record that was returned.
    pub event: Event,
    /// The calendar id argument as given.
    pub calendar_id: Option<String>,
    pub options: Params,
}

/// A logged `update` call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub event: Event,
    pub options: Params,
}

/// What [`EventsFake::assert_updated`] looks for.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateExpectation {
    /// An updated record whose listed fields hold these values.
    Fields(PropertyBag),
    /// An update of this record, compared by event and calendar id.
    Event(Event),
}

impl From<PropertyBag> for UpdateExpectation {
    fn from(value: PropertyBag) -> Self {
        Self::Fields(value)
    }
}

impl From<Event> for UpdateExpectation {
    fn from(value: Event) -> Self {
        Self::Event(value)
    }
}

impl UpdateExpectation {
    fn matches(&self, event: &Event) -> bool {
        match self {
            Self::Fields(fields) => fields
                .iter()
                .all(|(alias, property)| event.matches(alias, property)),
            Self::Event(expected) => event.is(expected),
        }
    }
}

#[derive(Default)]
struct FakeState {
    create_calls: Vec<CreateCall>,
    quick_create_calls: BTreeMap<String, Event>,
    update_calls: Vec<UpdateCall>,
    quick_create_fakes: BTreeMap<String, PropertyBag>,
    find_fakes: Vec<FindFake>,
    get_fakes: Vec<GetFake>,
}

/// An in-memory [`EventsGateway`] for tests.
///
/// Creations are built locally and logged, `find` and `get` answer from
/// registered fixtures and fail with [`crate::ErrorCode::MissingFake`] when
/// none matches, and the `assert_*` methods panic with a fixed message when
/// their expectation does not hold. Unlike [`crate::GoogleEvents`], `get`
/// returns fixture events in registration order and never sorts them.
///
/// ```ignore
/// let fake = Arc::new(EventsFake::new().with_default_calendar_id("primary"));
/// let gateway: Arc<dyn EventsGateway> = fake.clone();
///
/// schedule_standup(&gateway).await?;
///
/// fake.assert_created(&PropertyBag::new().with("summary", "Standup"), None, &Params::new());
/// ```
#[derive(Default)]
pub struct EventsFake {
    default_calendar_id: Option<String>,
    state: Mutex<FakeState>,
    calendars: MockConnector,
}

impl EventsFake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the calendar used when none is passed.
    pub fn with_default_calendar_id(mut self, calendar_id: impl Into<String>) -> Self {
        self.default_calendar_id = Some(calendar_id.into()).filter(|id| !id.is_empty());
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resolve(&self, calendar_id: Option<&str>) -> String {
        calendar_id
            .or(self.default_calendar_id.as_deref())
            .unwrap_or(PLACEHOLDER_CALENDAR_ID)
            .to_string()
    }

    /// Registers the event returned by `quick_create(text)`; without `text`,
    /// the event returned for any text that has no fixture of its own.
    pub fn fake_quick_create(&self, properties: PropertyBag, text: Option<&str>) -> &Self {
        self.state()
            .quick_create_fakes
            .insert(text.unwrap_or(DEFAULT_QUICK_CREATE).to_string(), properties);
        self
    }

    /// Appends a `find` fixture; earlier registrations take precedence.
    pub fn fake_find(&self, fake: FindFake) -> &Self {
        self.state().find_fakes.push(fake);
        self
    }

    /// Appends a `get` fixture; earlier registrations take precedence.
    pub fn fake_get(&self, fake: GetFake) -> &Self {
        self.state().get_fakes.push(fake);
        self
    }

    /// Installs a fresh mock calendar for `calendar_id` and returns it.
    pub fn fake_google_calendar(&self, calendar_id: &str) -> Arc<MockCalendar> {
        self.calendars.replace(calendar_id)
    }

    /// The mock calendar for `calendar_id` (or the default), created on first
    /// access and memoized afterwards.
    pub fn google_calendar(&self, calendar_id: Option<&str>) -> Arc<MockCalendar> {
        self.calendars.calendar(&self.resolve(calendar_id))
    }

    /// Logged `create` calls, in order.
    pub fn created(&self) -> Vec<CreateCall> {
        self.state().create_calls.clone()
    }

    /// Logged `quick_create` calls by text.
    pub fn quick_created(&self) -> BTreeMap<String, Event> {
        self.state().quick_create_calls.clone()
    }

    /// Logged `update` calls, in order.
    pub fn updated(&self) -> Vec<UpdateCall> {
        self.state().update_calls.clone()
    }

    fn record_create(
        &self,
        input: EventInput,
        calendar_id: Option<&str>,
        options: Params,
    ) -> EventsResult<Event> {
        let (properties, event) = match input {
            EventInput::Properties(properties) => {
                let event = Event::from_properties(&properties, Some(&self.resolve(calendar_id)))?;
                (Some(properties), event)
            }
            EventInput::Event(mut event) => {
                let resolved = self.resolve(calendar_id.or(event.calendar_id()));
                event.set_calendar_id(resolved);
                (None, event)
            }
        };

        debug!(calendar_id, "fake create");
        self.state().create_calls.push(CreateCall {
            properties,
            event: event.clone(),
            calendar_id: calendar_id.map(str::to_string),
            options,
        });
        Ok(event)
    }

    fn record_quick_create(&self, text: &str, calendar_id: Option<&str>) -> EventsResult<Event> {
        let resolved = self.resolve(calendar_id);
        let mut state = self.state();
        let fixture = state
            .quick_create_fakes
            .get(text)
            .or_else(|| state.quick_create_fakes.get(DEFAULT_QUICK_CREATE));

        let event = match fixture {
            Some(properties) => Event::from_properties(properties, Some(&resolved))?,
            None => {
                let mut event = Event::new();
                event.set_calendar_id(resolved);
                event
            }
        };

        debug!(text, "fake quick create");
        state
            .quick_create_calls
            .insert(text.to_string(), event.clone());
        Ok(event)
    }

    fn was_created(&self, properties: &PropertyBag, calendar_id: Option<&str>, options: &Params) -> bool {
        self.state().create_calls.iter().any(|call| {
            call.properties.as_ref() == Some(properties)
                && call.calendar_id.as_deref() == calendar_id
                && &call.options == options
        })
    }

    /// Panics unless `create` was called with exactly these arguments.
    #[track_caller]
    pub fn assert_created(&self, properties: &PropertyBag, calendar_id: Option<&str>, options: &Params) {
        assert!(
            self.was_created(properties, calendar_id, options),
            "No fake create event matches the given parameters."
        );
    }

    /// Panics if `create` was called with exactly these arguments.
    #[track_caller]
    pub fn assert_not_created(&self, properties: &PropertyBag, calendar_id: Option<&str>, options: &Params) {
        assert!(
            !self.was_created(properties, calendar_id, options),
            "A fake create event matches the given parameters."
        );
    }

    #[track_caller]
    pub fn assert_nothing_created(&self) {
        assert!(self.state().create_calls.is_empty(), "An event was created.");
    }

    #[track_caller]
    pub fn assert_quick_created(&self, text: &str) {
        assert!(
            self.state().quick_create_calls.contains_key(text),
            "No fake quick create event matches the given text."
        );
    }

    #[track_caller]
    pub fn assert_not_quick_created(&self, text: &str) {
        assert!(
            !self.state().quick_create_calls.contains_key(text),
            "A fake quick create event matches the given text."
        );
    }

    #[track_caller]
    pub fn assert_nothing_quick_created(&self) {
        assert!(
            self.state().quick_create_calls.is_empty(),
            "An event was quick created."
        );
    }

    /// Panics unless some `update` call matches `expected`.
    #[track_caller]
    pub fn assert_updated(&self, expected: impl Into<UpdateExpectation>) {
        let expected = expected.into();
        let found = self
            .state()
            .update_calls
            .iter()
            .any(|call| expected.matches(&call.event));
        assert!(found, "No fake update event matches the given parameters.");
    }
}

impl EventsGateway for EventsFake {
    fn calendar_id(&self, calendar_id: Option<&str>) -> EventsResult<String> {
        Ok(self.resolve(calendar_id))
    }

    fn calendar(&self, calendar_id: Option<&str>) -> EventsResult<Arc<dyn CalendarAccessor>> {
        Ok(self.google_calendar(calendar_id))
    }

    fn create<'a>(
        &'a self,
        input: EventInput,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        let result = self.record_create(input, calendar_id, options);
        Box::pin(async move { result })
    }

    fn quick_create<'a>(
        &'a self,
        text: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        let result = self.record_quick_create(text, calendar_id);
        Box::pin(async move { result })
    }

    fn update<'a>(&'a self, event: Event, options: Params) -> BoxFuture<'a, EventsResult<Event>> {
        self.state().update_calls.push(UpdateCall {
            event: event.clone(),
            options,
        });
        Box::pin(async move { Ok(event) })
    }

    fn find<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
    ) -> BoxFuture<'a, EventsResult<Event>> {
        let result = self
            .state()
            .find_fakes
            .iter()
            .find(|fake| fake.matches(event_id, calendar_id))
            .map(|fake| fake.properties.clone())
            .ok_or_else(EventsError::missing_find)
            .and_then(|properties| {
                Event::from_properties(&properties, Some(&self.resolve(calendar_id)))
                    .map_err(EventsError::from)
            });
        Box::pin(async move { result })
    }

    fn get<'a>(&'a self, query: EventQuery) -> BoxFuture<'a, EventsResult<Vec<Event>>> {
        let fixture = self
            .state()
            .get_fakes
            .iter()
            .find(|fake| fake.matches(&query))
            .map(|fake| fake.events.clone());

        let result = fixture.ok_or_else(EventsError::missing_get).and_then(|events| {
            let calendar_id = self.resolve(query.calendar_id.as_deref());
            events
                .iter()
                .map(|properties| {
                    Event::from_properties(properties, Some(&calendar_id)).map_err(EventsError::from)
                })
                .collect::<EventsResult<Vec<_>>>()
        });
        Box::pin(async move { result })
    }

    fn delete<'a>(
        &'a self,
        event_id: &'a str,
        calendar_id: Option<&'a str>,
        options: Params,
    ) -> BoxFuture<'a, EventsResult<()>> {
        let calendar = self.google_calendar(calendar_id);
        Box::pin(async move { calendar.delete_event(event_id, &options).await })
    }
}
