//! Field aliases and canonical paths.
//!
//! Callers address event fields by short aliases (`name`, `startDate`, ...)
//! or directly by the dotted path of the Google event resource
//! (`start.date`, `summary`, `conferenceData.createRequest.requestId`).

/// Derived field: start date, else start date-time, else empty.
pub const SORT_DATE: &str = "sortDate";

/// Field materialized as a `{title, url}` pair.
pub const SOURCE: &str = "source";

const ALIASES: [(&str, &str); 5] = [
    ("name", "summary"),
    ("startDate", "start.date"),
    ("endDate", "end.date"),
    ("startDateTime", "start.dateTime"),
    ("endDateTime", "end.dateTime"),
];

/// Resolves an alias to its canonical dotted path.
///
/// Names that are not aliases are already paths and pass through unchanged.
pub fn resolve(alias: &str) -> &str {
    ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map_or(alias, |(_, path)| path)
}

/// One of the four date fields that get typed (de)serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePath {
    StartDate,
    EndDate,
    StartDateTime,
    EndDateTime,
}

impl DatePath {
    /// Classifies a canonical path.
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "start.date" => Some(Self::StartDate),
            "end.date" => Some(Self::EndDate),
            "start.dateTime" => Some(Self::StartDateTime),
            "end.dateTime" => Some(Self::EndDateTime),
            _ => None,
        }
    }

    /// The canonical path of this field.
    pub fn path(self) -> &'static str {
        match self {
            Self::StartDate => "start.date",
            Self::EndDate => "end.date",
            Self::StartDateTime => "start.dateTime",
            Self::EndDateTime => "end.dateTime",
        }
    }

    /// The payload key of the sub-object holding this field (`start` or `end`).
    pub fn boundary(self) -> &'static str {
        match self {
            Self::StartDate | Self::StartDateTime => "start",
            Self::EndDate | Self::EndDateTime => "end",
        }
    }

    /// The key inside the boundary object (`date` or `dateTime`).
    pub fn key(self) -> &'static str {
        if self.is_date_only() { "date" } else { "dateTime" }
    }

    /// True for the calendar-date fields, false for the date-time ones.
    pub fn is_date_only(self) -> bool {
        matches!(self, Self::StartDate | Self::EndDate)
    }
}
