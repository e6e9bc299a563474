//! Command-line interface definition.

use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// gcal - Google Calendar events from the command line
#[derive(Debug, Parser)]
#[command(name = "gcal")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Calendar to operate on instead of the configured one
    #[arg(long, global = true)]
    pub calendar: Option<String>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// List events, sorted by start
    List {
        /// Earliest start (YYYY-MM-DD or RFC 3339); defaults to today
        #[arg(long, value_parser = parse_when)]
        from: Option<When>,

        /// Latest end (YYYY-MM-DD or RFC 3339); defaults to a year from now
        #[arg(long, value_parser = parse_when)]
        to: Option<When>,

        /// Let the API order results (startTime or updated)
        #[arg(long)]
        order_by: Option<String>,

        /// Extra list parameter as key=value (can be repeated)
        #[arg(long = "query", value_parser = parse_key_value, action = clap::ArgAction::Append)]
        query: Vec<(String, Value)>,
    },

    /// Show one event
    Show {
        /// Event id
        id: String,
    },

    /// Create an event
    Create {
        #[arg(long)]
        summary: String,

        /// Start (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_when)]
        start: When,

        /// End; defaults to one hour (or one day) after the start
        #[arg(long, value_parser = parse_when)]
        end: Option<When>,

        /// Create an all-day event
        #[arg(long)]
        all_day: bool,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        location: Option<String>,

        /// Attendee email address (can be repeated)
        #[arg(long, action = clap::ArgAction::Append)]
        attendee: Vec<String>,

        /// Attach a Google Meet link
        #[arg(long)]
        meet: bool,
    },

    /// Create an event from a text such as "Lunch tomorrow at noon"
    QuickAdd {
        text: String,
    },

    /// Delete an event
    Delete {
        /// Event id
        id: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

/// A point in time given on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum When {
    Date(NaiveDate),
    DateTime(DateTime<FixedOffset>),
}

impl When {
    /// The calendar date, in the value's own offset.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Date(date) => *date,
            Self::DateTime(at) => at.date_naive(),
        }
    }

    /// The instant; a bare date is midnight UTC.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        match self {
            Self::Date(date) => date.and_time(NaiveTime::MIN).and_utc().fixed_offset(),
            Self::DateTime(at) => *at,
        }
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.instant().to_utc()
    }
}

/// Parses `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_when(input: &str) -> Result<When, String> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(When::DateTime(at));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map(When::Date)
        .map_err(|_| format!("expected YYYY-MM-DD or an RFC 3339 timestamp, got `{input}`"))
}

/// Parses `key=value`; numbers and booleans become JSON scalars.
pub fn parse_key_value(input: &str) -> Result<(String, Value), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{input}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{input}`"));
    }
    let value = match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => value
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(value.to_string())),
    };
    Ok((key.to_string(), value))
}
