//! Google Calendar events gateway.
//!
//! This crate provides the calendar-facing half of gcal:
//!
//! - [`EventsGateway`] - create, quick-create, update, find, list and delete events
//! - [`GoogleEvents`] - the gateway backed by a [`CalendarConnector`]
//! - [`CalendarAccessor`] - raw access to the events of one calendar
//! - [`testing::EventsFake`] - an in-memory gateway with call assertions for tests
//! - [`CalendarSettings`] - configuration and authentication profile selection
//! - [`EventsError`] - error types for gateway operations
//!
//! # Architecture
//!
//! ```text
//!   application code
//!          │  Arc<dyn EventsGateway>
//!          ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │  GoogleEvents   │    │   EventsFake    │
//! └────────┬────────┘    └────────┬────────┘
//!          │ CalendarConnector     │
//!          ▼                      ▼
//! ┌─────────────────┐    ┌─────────────────┐
//! │ GoogleCalendar  │    │  MockCalendar   │
//! └────────┬────────┘    └─────────────────┘
//!          │ TokenSource
//!          ▼
//!   Google Calendar v3
//! ```
//!
//! # Example
//!
//! ```ignore
//! use gcal_events::{CalendarSettings, EventQuery, EventsGateway, GoogleEvents};
//!
//! let settings = CalendarSettings::load()?;
//! let events = GoogleEvents::from_settings(&settings)?;
//! for event in events.get(EventQuery::new()).await? {
//!     println!("{}", event.summary().unwrap_or_default());
//! }
//! ```

#[cfg(feature = "google")]
pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
#[cfg(feature = "google")]
pub mod google;
pub mod testing;

// Re-export main types at crate root
pub use calendar::{BoxFuture, CalendarAccessor, CalendarConnector, EventPage, PAGE_TOKEN, Payload};
pub use config::{CalendarSettings, ConfigError};
pub use error::{ErrorCode, EventsError, EventsResult};
pub use events::{EventInput, EventQuery, EventsGateway, GoogleEvents, ORDER_BY};
#[cfg(feature = "google")]
pub use google::{GoogleCalendar, GoogleConnector};
