//! Wire formats for event dates and date-times.
//!
//! Google Calendar stores all-day boundaries as `YYYY-MM-DD` strings and
//! timed boundaries as RFC 3339 strings with an explicit offset, each next to
//! a `timeZone` name. [`EventTimestamp`] carries both halves so that writing a
//! zoned value keeps the zone name, not just its offset.

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, FieldResult};

/// Format of calendar-date fields.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// An instant together with the timezone it was expressed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTimestamp {
    instant: DateTime<FixedOffset>,
    timezone: String,
}

impl EventTimestamp {
    /// Creates a timestamp from an instant and a timezone name.
    pub fn new(instant: DateTime<FixedOffset>, timezone: impl Into<String>) -> Self {
        Self {
            instant,
            timezone: timezone.into(),
        }
    }

    /// The instant, in its original offset.
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    /// The timezone name (IANA name, `UTC`, or a bare offset such as `+02:00`).
    pub fn timezone(&self) -> &str {
        &self.timezone
    }

    /// The calendar date in the timestamp's own offset.
    pub fn date(&self) -> NaiveDate {
        self.instant.date_naive()
    }

    /// Formats the calendar date as `YYYY-MM-DD`.
    pub fn format_date(&self) -> String {
        self.date().format(DATE_FORMAT).to_string()
    }

    /// Formats the instant as RFC 3339 with whole seconds and its own offset.
    pub fn to_rfc3339(&self) -> String {
        format_rfc3339(&self.instant)
    }
}

impl From<DateTime<Tz>> for EventTimestamp {
    fn from(value: DateTime<Tz>) -> Self {
        let timezone = value.timezone().name().to_string();
        Self::new(value.fixed_offset(), timezone)
    }
}

impl From<DateTime<Utc>> for EventTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::new(value.fixed_offset(), "UTC")
    }
}

impl From<DateTime<FixedOffset>> for EventTimestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        let timezone = value.offset().to_string();
        Self::new(value, timezone)
    }
}

impl From<NaiveDate> for EventTimestamp {
    fn from(value: NaiveDate) -> Self {
        value.and_time(NaiveTime::MIN).and_utc().into()
    }
}

/// Formats any zoned date-time as RFC 3339 (`2024-03-15T10:00:00+04:00`).
pub fn format_rfc3339<Z: TimeZone>(value: &DateTime<Z>) -> String {
    value.fixed_offset().to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parses a stored calendar date.
pub fn parse_date(path: &str, value: &str) -> FieldResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| FieldError::invalid_date(path, value))
}

/// Parses a stored RFC 3339 date-time, keeping its offset.
pub fn parse_date_time(path: &str, value: &str) -> FieldResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).map_err(|_| FieldError::invalid_date_time(path, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoned_timestamp_keeps_zone_name_and_offset() {
        let reunion: Tz = "Indian/Reunion".parse().unwrap();
        let at = reunion.with_ymd_and_hms(2024, 3, 15, 10, 30, 0).unwrap();

        let ts = EventTimestamp::from(at);

        assert_eq!(ts.timezone(), "Indian/Reunion");
        assert_eq!(ts.to_rfc3339(), "2024-03-15T10:30:00+04:00");
        assert_eq!(ts.format_date(), "2024-03-15");
    }

    #[test]
    fn utc_timestamp_uses_numeric_offset() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let ts = EventTimestamp::from(at);
        assert_eq!(ts.timezone(), "UTC");
        assert_eq!(ts.to_rfc3339(), "2024-01-02T03:04:05+00:00");
    }

    #[test]
    fn fixed_offset_timestamp_names_the_offset() {
        let at = DateTime::parse_from_rfc3339("2024-06-01T23:15:00-05:00").unwrap();
        let ts = EventTimestamp::from(at);
        assert_eq!(ts.timezone(), "-05:00");
        assert_eq!(ts.format_date(), "2024-06-01");
    }

    #[test]
    fn date_becomes_utc_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let ts = EventTimestamp::from(date);
        assert_eq!(ts.to_rfc3339(), "2025-02-05T00:00:00+00:00");
        assert_eq!(ts.date(), date);
    }

    #[test]
    fn subsecond_precision_is_dropped() {
        let at = DateTime::parse_from_rfc3339("2024-03-15T10:00:00.123456+01:00").unwrap();
        assert_eq!(format_rfc3339(&at), "2024-03-15T10:00:00+01:00");
    }

    #[test]
    fn parse_errors_name_the_path() {
        let err = parse_date("start.date", "15/03/2024").unwrap_err();
        assert_eq!(
            err,
            FieldError::InvalidDate {
                path: "start.date".into(),
                value: "15/03/2024".into()
            }
        );
        assert!(parse_date_time("end.dateTime", "tomorrow").is_err());
        assert!(parse_date_time("end.dateTime", "2024-03-15T10:00:00Z").is_ok());
    }
}
