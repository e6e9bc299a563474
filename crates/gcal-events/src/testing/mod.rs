//! Test doubles.
//!
//! [`EventsFake`] stands in for the real gateway; [`MockCalendar`] and
//! [`MockConnector`] stand in for calendar accessors, either behind the fake
//! or underneath a [`crate::GoogleEvents`].

mod calendar;
mod fake;

pub use calendar::{CalendarCall, MockCalendar, MockConnector};
pub use fake::{
    CreateCall, EventsFake, FindFake, GetFake, PLACEHOLDER_CALENDAR_ID, UpdateCall,
    UpdateExpectation,
};
