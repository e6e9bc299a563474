//! Event commands.
//!
//! Each command runs against any [`EventsGateway`] and returns the events it
//! produced; [`render`] and [`render_one`] turn them into output text.

use chrono::Duration;
use gcal_core::{Attendee, Event, FieldValue, Params, PropertyBag};
use gcal_events::{EventQuery, EventsError, EventsGateway, ORDER_BY};
use serde_json::Value;
use tracing::debug;

use crate::cli::When;
use crate::error::{ClientError, ClientResult};

/// Arguments of `gcal list`.
#[derive(Debug, Clone, Default)]
pub struct ListArgs {
    pub from: Option<When>,
    pub to: Option<When>,
    pub order_by: Option<String>,
    pub query: Vec<(String, Value)>,
}

/// Arguments of `gcal create`.
#[derive(Debug, Clone)]
pub struct CreateArgs {
    pub summary: String,
    pub start: When,
    pub end: Option<When>,
    pub all_day: bool,
    pub description: Option<String>,
    pub location: Option<String>,
    pub attendees: Vec<String>,
    pub meet: bool,
}

/// Builds the gateway query for `gcal list`.
pub fn list_query(args: ListArgs, calendar_id: Option<&str>) -> EventQuery {
    let mut query = EventQuery::new();
    if let Some(from) = args.from {
        query = query.starting_at(from.to_utc());
    }
    if let Some(to) = args.to {
        query = query.ending_at(to.to_utc());
    }
    for (name, value) in args.query {
        query = query.with_parameter(name, value);
    }
    if let Some(order_by) = args.order_by {
        query = query.with_parameter(ORDER_BY, order_by);
    }
    if let Some(calendar_id) = calendar_id {
        query = query.in_calendar(calendar_id);
    }
    query
}

pub async fn list(
    gateway: &dyn EventsGateway,
    args: ListArgs,
    calendar_id: Option<&str>,
) -> ClientResult<Vec<Event>> {
    let query = list_query(args, calendar_id);
    debug!(?query, "listing events");
    Ok(gateway.get(query).await?)
}

pub async fn show(
    gateway: &dyn EventsGateway,
    event_id: &str,
    calendar_id: Option<&str>,
) -> ClientResult<Event> {
    Ok(gateway.find(event_id, calendar_id).await?)
}

/// Builds the record sent by `gcal create`.
///
/// The event is all-day when asked for or when both bounds are bare dates.
/// A missing end is one day (all-day) or one hour after the start.
pub fn build_event(args: CreateArgs) -> ClientResult<Event> {
    let all_day = args.all_day
        || (matches!(args.start, When::Date(_))
            && args.end.is_none_or(|end| matches!(end, When::Date(_))));

    let mut properties = PropertyBag::new().with("summary", args.summary);
    if let Some(description) = args.description {
        properties = properties.with("description", description);
    }
    if let Some(location) = args.location {
        properties = properties.with("location", location);
    }

    if all_day {
        let start = args.start.date();
        let end = args.end.map_or(start + Duration::days(1), |end| end.date());
        if end < start {
            return Err(ClientError::argument("the end date is before the start date"));
        }
        properties = properties.with("startDate", start).with("endDate", end);
    } else {
        let start = args.start.instant();
        let end = args.end.map_or(start + Duration::hours(1), |end| end.instant());
        if end < start {
            return Err(ClientError::argument("the end is before the start"));
        }
        properties = properties
            .with("startDateTime", start)
            .with("endDateTime", end);
    }

    let mut event = Event::from_properties(&properties, None).map_err(EventsError::from)?;
    for email in args.attendees {
        event.add_attendee(Attendee::new(email));
    }
    if args.meet {
        event.add_meet_link();
    }
    Ok(event)
}

pub async fn create(
    gateway: &dyn EventsGateway,
    args: CreateArgs,
    calendar_id: Option<&str>,
) -> ClientResult<Event> {
    let event = build_event(args)?;
    Ok(gateway.create(event.into(), calendar_id, Params::new()).await?)
}

pub async fn quick_add(
    gateway: &dyn EventsGateway,
    text: &str,
    calendar_id: Option<&str>,
) -> ClientResult<Event> {
    Ok(gateway.quick_create(text, calendar_id).await?)
}

pub async fn delete(
    gateway: &dyn EventsGateway,
    event_id: &str,
    calendar_id: Option<&str>,
) -> ClientResult<()> {
    gateway.delete(event_id, calendar_id, Params::new()).await?;
    Ok(())
}

/// Renders events one per line, or as a JSON array.
pub fn render(events: &[Event], json: bool) -> ClientResult<String> {
    if json {
        let payloads: Vec<_> = events.iter().map(Event::payload).collect();
        return serde_json::to_string_pretty(&payloads)
            .map_err(|e| ClientError::Output(e.to_string()));
    }
    if events.is_empty() {
        return Ok("No events.".to_string());
    }
    Ok(events.iter().map(line).collect::<Vec<_>>().join("\n"))
}

/// Renders one event as a line, or as a JSON object.
pub fn render_one(event: &Event, json: bool) -> ClientResult<String> {
    if json {
        return serde_json::to_string_pretty(event.payload())
            .map_err(|e| ClientError::Output(e.to_string()));
    }
    Ok(line(event))
}

fn line(event: &Event) -> String {
    let when = match event.sort_date() {
        Ok(FieldValue::Date(date)) => format!("{}  all day", date.format("%Y-%m-%d")),
        Ok(FieldValue::DateTime(at)) => at.format("%Y-%m-%d %H:%M %:z").to_string(),
        _ => "-".to_string(),
    };
    let mut line = format!("{when}  {}", event.summary().unwrap_or("(no title)"));
    if let Some(id) = event.id() {
        line.push_str(&format!("  [{id}]"));
    }
    line
}
