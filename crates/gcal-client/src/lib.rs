//! The `gcal` command-line interface.
//!
//! Commands run against any [`gcal_events::EventsGateway`], so they can be
//! exercised with the in-memory fake as well as the Google Calendar API.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
