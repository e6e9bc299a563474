//! Core types: event record, field aliases, property values, wire time formats

pub mod error;
pub mod event;
pub mod fields;
pub mod time;
pub mod tracing;
pub mod value;

pub use error::{FieldError, FieldResult};
pub use event::{Attendee, CONFERENCE_DATA_VERSION, Event};
pub use fields::DatePath;
pub use time::EventTimestamp;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
pub use value::{EventSource, FieldValue, Params, Property, PropertyBag};
