//! The event record.
//!
//! An [`Event`] wraps the JSON payload of one Google Calendar event together
//! with the id of the calendar it belongs to. Fields are read and written
//! through aliases (see [`crate::fields`]); the four date fields and `source`
//! are converted between typed values and their wire shape on the way.

use chrono::{DateTime, FixedOffset, NaiveDate};
use rand::Rng as _;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{FieldError, FieldResult};
use crate::fields::{self, DatePath, SORT_DATE, SOURCE};
use crate::time::{EventTimestamp, parse_date, parse_date_time};
use crate::value::{self, EventSource, FieldValue, Params, Property, PropertyBag};

/// Response status given to attendees added without one.
pub const DEFAULT_RESPONSE_STATUS: &str = "needsAction";

/// Conference solution requested by [`Event::add_meet_link`].
pub const MEET_SOLUTION: &str = "hangoutsMeet";

/// Request option that must accompany conference creation requests.
pub const CONFERENCE_DATA_VERSION: &str = "conferenceDataVersion";

const REQUEST_ID_LENGTH: usize = 10;

/// An attendee of an event, in the shape the events API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub response_status: String,
}

impl Attendee {
    /// Creates an attendee that has not responded yet.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            comment: None,
            response_status: DEFAULT_RESPONSE_STATUS.to_string(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_response_status(mut self, status: impl Into<String>) -> Self {
        self.response_status = status.into();
        self
    }

    fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(comment) = &self.comment {
            object.insert("comment".into(), Value::String(comment.clone()));
        }
        if let Some(name) = &self.display_name {
            object.insert("displayName".into(), Value::String(name.clone()));
        }
        object.insert("email".into(), Value::String(self.email.clone()));
        object.insert(
            "responseStatus".into(),
            Value::String(self.response_status.clone()),
        );
        Value::Object(object)
    }
}

/// One calendar event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    payload: Map<String, Value>,
    calendar_id: Option<String>,
    attendees: Vec<Attendee>,
    has_meet_link: bool,
}

impl Event {
    /// Creates an empty, unsaved event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an event by writing every property in order.
    pub fn from_properties(properties: &PropertyBag, calendar_id: Option<&str>) -> FieldResult<Self> {
        let mut event = Self::new();
        event.calendar_id = calendar_id.map(str::to_string);
        event.apply(properties)?;
        Ok(event)
    }

    /// Wraps a payload returned by the events API.
    pub fn from_payload(payload: Map<String, Value>, calendar_id: Option<&str>) -> Self {
        Self {
            payload,
            calendar_id: calendar_id.map(str::to_string),
            ..Self::default()
        }
    }

    /// Writes every property of the bag, in order.
    pub fn apply(&mut self, properties: &PropertyBag) -> FieldResult<()> {
        for (name, value) in properties.iter() {
            self.set(name, value.clone())?;
        }
        Ok(())
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn into_payload(self) -> Map<String, Value> {
        self.payload
    }

    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id.as_deref()
    }

    pub fn set_calendar_id(&mut self, calendar_id: impl Into<String>) {
        self.calendar_id = Some(calendar_id.into());
    }

    /// The stored wire value behind an alias, without any conversion.
    pub fn raw(&self, alias: &str) -> Option<&Value> {
        value::get_path(&self.payload, fields::resolve(alias))
    }

    /// Reads a field.
    ///
    /// # Errors
    ///
    /// Fails when a date field holds a string that does not parse.
    pub fn get(&self, alias: &str) -> FieldResult<FieldValue> {
        let path = fields::resolve(alias);

        if path == SORT_DATE {
            return self.sort_date();
        }
        if path == SOURCE {
            return Ok(self.source().map_or(FieldValue::Empty, FieldValue::Source));
        }

        let stored = match value::get_path(&self.payload, path) {
            None | Some(Value::Null) => return Ok(FieldValue::Empty),
            Some(stored) => stored,
        };

        let Some(date_path) = DatePath::from_path(path) else {
            return Ok(FieldValue::Value(stored.clone()));
        };

        match stored.as_str() {
            Some("") => Ok(FieldValue::Empty),
            Some(text) if date_path.is_date_only() => parse_date(path, text).map(FieldValue::Date),
            Some(text) => parse_date_time(path, text).map(FieldValue::DateTime),
            None if date_path.is_date_only() => {
                Err(FieldError::invalid_date(path, stored.to_string()))
            }
            None => Err(FieldError::invalid_date_time(path, stored.to_string())),
        }
    }

    /// Writes a field.
    ///
    /// Date fields replace the whole `start`/`end` object with
    /// `{date|dateTime, timeZone}`; `source` replaces the source object.
    ///
    /// # Errors
    ///
    /// Fails when a date field is given something other than a timestamp or
    /// `source` something other than a title/url pair.
    pub fn set(&mut self, alias: &str, value: impl Into<Property>) -> FieldResult<()> {
        let path = fields::resolve(alias);
        let value = value.into();

        if let Some(date_path) = DatePath::from_path(path) {
            let Property::Time(timestamp) = value else {
                return Err(FieldError::unexpected(path, "a date or date-time"));
            };
            self.set_date_property(date_path, &timestamp);
            return Ok(());
        }

        if path == SOURCE {
            let source = match value {
                Property::Source(source) => source,
                Property::Value(value) => serde_json::from_value(value)
                    .map_err(|_| FieldError::unexpected(path, "a title and url"))?,
                Property::Time(_) => return Err(FieldError::unexpected(path, "a title and url")),
            };
            self.set_source(source);
            return Ok(());
        }

        let raw = match value {
            Property::Value(value) => value,
            Property::Time(timestamp) => Value::String(timestamp.to_rfc3339()),
            Property::Source(source) => json!({"title": source.title, "url": source.url}),
        };
        value::set_path(&mut self.payload, path, raw);
        Ok(())
    }

    /// True when the stored value behind `alias` equals what writing
    /// `property` would store there.
    pub fn matches(&self, alias: &str, property: &Property) -> bool {
        let mut probe = Self::new();
        if probe.set(alias, property.clone()).is_err() {
            return false;
        }
        let path = fields::resolve(alias);
        value::get_path(&probe.payload, path) == value::get_path(&self.payload, path)
    }

    fn set_date_property(&mut self, date_path: DatePath, timestamp: &EventTimestamp) {
        let formatted = if date_path.is_date_only() {
            timestamp.format_date()
        } else {
            timestamp.to_rfc3339()
        };

        let mut boundary = Map::new();
        boundary.insert(date_path.key().into(), Value::String(formatted));
        boundary.insert(
            "timeZone".into(),
            Value::String(timestamp.timezone().to_string()),
        );

        self.payload
            .insert(date_path.boundary().into(), Value::Object(boundary));
    }

    pub fn id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.payload.get("summary").and_then(Value::as_str)
    }

    pub fn description(&self) -> Option<&str> {
        self.payload.get("description").and_then(Value::as_str)
    }

    pub fn location(&self) -> Option<&str> {
        self.payload.get("location").and_then(Value::as_str)
    }

    pub fn start_date(&self) -> FieldResult<Option<NaiveDate>> {
        Ok(self.get(DatePath::StartDate.path())?.as_date())
    }

    pub fn end_date(&self) -> FieldResult<Option<NaiveDate>> {
        Ok(self.get(DatePath::EndDate.path())?.as_date())
    }

    pub fn start_date_time(&self) -> FieldResult<Option<DateTime<FixedOffset>>> {
        Ok(self.get(DatePath::StartDateTime.path())?.as_date_time())
    }

    pub fn end_date_time(&self) -> FieldResult<Option<DateTime<FixedOffset>>> {
        Ok(self.get(DatePath::EndDateTime.path())?.as_date_time())
    }

    pub fn set_start_date(&mut self, date: impl Into<EventTimestamp>) {
        self.set_date_property(DatePath::StartDate, &date.into());
    }

    pub fn set_end_date(&mut self, date: impl Into<EventTimestamp>) {
        self.set_date_property(DatePath::EndDate, &date.into());
    }

    pub fn set_start_date_time(&mut self, at: impl Into<EventTimestamp>) {
        self.set_date_property(DatePath::StartDateTime, &at.into());
    }

    pub fn set_end_date_time(&mut self, at: impl Into<EventTimestamp>) {
        self.set_date_property(DatePath::EndDateTime, &at.into());
    }

    /// The start date if set, else the start date-time, else empty.
    pub fn sort_date(&self) -> FieldResult<FieldValue> {
        let date = self.get(DatePath::StartDate.path())?;
        if !date.is_empty() {
            return Ok(date);
        }
        let at = self.get(DatePath::StartDateTime.path())?;
        if !at.is_empty() {
            return Ok(at);
        }
        Ok(FieldValue::Empty)
    }

    pub fn source(&self) -> Option<EventSource> {
        let source = self.payload.get(SOURCE)?.as_object()?;
        let text = |key: &str| {
            source
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Some(EventSource::new(text("title"), text("url")))
    }

    pub fn set_source(&mut self, source: EventSource) {
        self.payload.insert(
            SOURCE.into(),
            json!({"title": source.title, "url": source.url}),
        );
    }

    /// Sets the event color from the calendar's color palette.
    pub fn set_color_id(&mut self, color_id: u32) {
        self.payload
            .insert("colorId".into(), Value::String(color_id.to_string()));
    }

    /// True when the start has no date-time component.
    pub fn is_all_day_event(&self) -> bool {
        value::get_path(&self.payload, DatePath::StartDateTime.path()).is_none_or(Value::is_null)
    }

    /// True once the event carries a non-empty id, i.e. it has been saved.
    pub fn exists(&self) -> bool {
        match self.payload.get("id") {
            None | Some(Value::Null) => false,
            Some(Value::String(id)) => !id.is_empty(),
            Some(_) => true,
        }
    }

    /// Attendees added through [`Event::add_attendee`].
    pub fn attendees(&self) -> &[Attendee] {
        &self.attendees
    }

    /// Appends an attendee and rewrites the payload's attendee list.
    pub fn add_attendee(&mut self, attendee: Attendee) {
        self.attendees.push(attendee);
        let list = self.attendees.iter().map(Attendee::to_value).collect();
        self.payload.insert("attendees".into(), Value::Array(list));
    }

    /// Requests a video meeting to be attached when the event is saved.
    pub fn add_meet_link(&mut self) {
        let request_id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(REQUEST_ID_LENGTH)
            .map(char::from)
            .collect();

        self.payload.insert(
            "conferenceData".into(),
            json!({
                "createRequest": {
                    "requestId": request_id,
                    "conferenceSolutionKey": {"type": MEET_SOLUTION},
                },
            }),
        );
        self.has_meet_link = true;
    }

    pub fn conference_data(&self) -> Option<&Value> {
        self.payload.get("conferenceData")
    }

    /// Request options this event needs on save.
    pub fn additional_options(&self) -> Params {
        let mut options = Params::new();
        if self.has_meet_link {
            options.insert(CONFERENCE_DATA_VERSION.into(), Value::from(1));
        }
        options
    }

    /// Same logical event: equal ids and equal calendar ids.
    pub fn is(&self, other: &Event) -> bool {
        self.id() == other.id() && self.calendar_id == other.calendar_id
    }
}
