//! In-memory calendar accessors.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use gcal_core::Params;

use crate::calendar::{BoxFuture, CalendarAccessor, CalendarConnector, EventPage, Payload};
use crate::error::{EventsError, EventsResult};

/// One call received by a [`MockCalendar`].
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarCall {
    List {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        parameters: Params,
    },
    Get {
        event_id: String,
    },
    Insert {
        event: Payload,
        options: Params,
    },
    QuickAdd {
        text: String,
    },
    Update {
        event: Payload,
        options: Params,
    },
    Delete {
        event_id: String,
        options: Params,
    },
}

#[derive(Default)]
struct MockState {
    calls: Vec<CalendarCall>,
    pages: VecDeque<EventPage>,
    payloads: VecDeque<Payload>,
    failures: VecDeque<EventsError>,
}

/// A calendar that records every call and answers from queued responses.
///
/// Without queued responses a listing is an empty page, `get_event` and
/// `quick_add` return an empty payload, and `insert_event`/`update_event`
/// echo the payload they were sent.
pub struct MockCalendar {
    calendar_id: String,
    state: Mutex<MockState>,
}

impl MockCalendar {
    pub fn new(calendar_id: impl Into<String>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            state: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues pages answered by successive `list_events` calls.
    pub fn queue_pages(&self, pages: impl IntoIterator<Item = EventPage>) -> &Self {
        self.state().pages.extend(pages);
        self
    }

    /// Queues a payload answered by the next get, quick-add, insert or update.
    pub fn queue_payload(&self, payload: Payload) -> &Self {
        self.state().payloads.push_back(payload);
        self
    }

    /// Makes the next call fail with `error`.
    pub fn fail_next(&self, error: EventsError) -> &Self {
        self.state().failures.push_back(error);
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<CalendarCall> {
        self.state().calls.clone()
    }

    /// Number of received calls matching `predicate`.
    pub fn received(&self, predicate: impl Fn(&CalendarCall) -> bool) -> usize {
        self.state().calls.iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: CalendarCall) -> EventsResult<MutexGuard<'_, MockState>> {
        let mut state = self.state();
        state.calls.push(call);
        match state.failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }

    fn answer(&self, call: CalendarCall, echo: Option<Payload>) -> EventsResult<Payload> {
        let mut state = self.record(call)?;
        Ok(state.payloads.pop_front().or(echo).unwrap_or_default())
    }
}

impl CalendarAccessor for MockCalendar {
    fn calendar_id(&self) -> &str {
        &self.calendar_id
    }

    fn list_events<'a>(
        &'a self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        parameters: &'a Params,
    ) -> BoxFuture<'a, EventsResult<EventPage>> {
        let result = self
            .record(CalendarCall::List {
                start,
                end,
                parameters: parameters.clone(),
            })
            .map(|mut state| state.pages.pop_front().unwrap_or_default());
        Box::pin(async move { result })
    }

    fn get_event<'a>(&'a self, event_id: &'a str) -> BoxFuture<'a, EventsResult<Payload>> {
        let result = self.answer(
            CalendarCall::Get {
                event_id: event_id.to_string(),
            },
            None,
        );
        Box::pin(async move { result })
    }

    fn insert_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>> {
        let result = self.answer(
            CalendarCall::Insert {
                event: event.clone(),
                options: options.clone(),
            },
            Some(event),
        );
        Box::pin(async move { result })
    }

    fn quick_add<'a>(&'a self, text: &'a str) -> BoxFuture<'a, EventsResult<Payload>> {
        let result = self.answer(
            CalendarCall::QuickAdd {
                text: text.to_string(),
            },
            None,
        );
        Box::pin(async move { result })
    }

    fn update_event<'a>(
        &'a self,
        event: Payload,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<Payload>> {
        let result = self.answer(
            CalendarCall::Update {
                event: event.clone(),
                options: options.clone(),
            },
            Some(event),
        );
        Box::pin(async move { result })
    }

    fn delete_event<'a>(
        &'a self,
        event_id: &'a str,
        options: &'a Params,
    ) -> BoxFuture<'a, EventsResult<()>> {
        let result = self
            .record(CalendarCall::Delete {
                event_id: event_id.to_string(),
                options: options.clone(),
            })
            .map(|_| ());
        Box::pin(async move { result })
    }
}

/// Hands out one memoized [`MockCalendar`] per calendar id.
#[derive(Default)]
pub struct MockConnector {
    calendars: Mutex<BTreeMap<String, Arc<MockCalendar>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn calendars(&self) -> MutexGuard<'_, BTreeMap<String, Arc<MockCalendar>>> {
        self.calendars.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The calendar for `calendar_id`, created on first access.
    pub fn calendar(&self, calendar_id: &str) -> Arc<MockCalendar> {
        self.calendars()
            .entry(calendar_id.to_string())
            .or_insert_with(|| Arc::new(MockCalendar::new(calendar_id)))
            .clone()
    }

    /// Installs a fresh calendar for `calendar_id`, dropping any previous one.
    pub fn replace(&self, calendar_id: &str) -> Arc<MockCalendar> {
        let calendar = Arc::new(MockCalendar::new(calendar_id));
        self.calendars()
            .insert(calendar_id.to_string(), calendar.clone());
        calendar
    }

    /// Ids of the calendars handed out so far.
    pub fn calendar_ids(&self) -> Vec<String> {
        self.calendars().keys().cloned().collect()
    }
}

impl CalendarConnector for MockConnector {
    fn connect(&self, calendar_id: &str) -> EventsResult<Arc<dyn CalendarAccessor>> {
        Ok(self.calendar(calendar_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn defaults_answer_empty_or_echo() {
        let calendar = MockCalendar::new("primary");
        let event = payload(json!({"summary": "Echo"}));

        assert_eq!(calendar.calendar_id(), "primary");
        assert!(calendar.get_event("x").await.unwrap().is_empty());
        assert_eq!(
            calendar.insert_event(event.clone(), &Params::new()).await.unwrap(),
            event
        );
        assert_eq!(
            calendar.list_events(None, None, &Params::new()).await.unwrap(),
            EventPage::default()
        );
        assert_eq!(calendar.calls().len(), 3);
    }

    #[tokio::test]
    async fn queued_responses_are_used_in_order() {
        let calendar = MockCalendar::new("primary");
        calendar
            .queue_payload(payload(json!({"id": "1"})))
            .queue_payload(payload(json!({"id": "2"})));

        assert_eq!(calendar.get_event("a").await.unwrap()["id"], "1");
        assert_eq!(calendar.quick_add("b").await.unwrap()["id"], "2");
        assert!(calendar.get_event("c").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failures_are_recorded_and_returned() {
        let calendar = MockCalendar::new("primary");
        calendar.fail_next(EventsError::server("boom"));

        let err = calendar.delete_event("evt", &Params::new()).await.unwrap_err();
        assert_eq!(err.message(), "boom");
        assert_eq!(
            calendar.received(|call| matches!(call, CalendarCall::Delete { .. })),
            1
        );
        calendar.delete_event("evt", &Params::new()).await.unwrap();
    }

    #[test]
    fn connector_memoizes_per_id() {
        let connector = MockConnector::new();
        let first = connector.calendar("a");

        assert!(Arc::ptr_eq(&first, &connector.calendar("a")));
        assert!(!Arc::ptr_eq(&first, &connector.calendar("b")));
        assert!(!Arc::ptr_eq(&first, &connector.replace("a")));
        assert_eq!(connector.calendar_ids(), ["a", "b"]);
    }
}
