//! Calendar backend capability.
//!
//! The tools only see [`CalendarBackend`]; the Google implementation lives in
//! [`google`]. Events are never cached on this side.

pub mod google;

pub use google::GoogleCalendar;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Start or end of an event. Timed events carry `dateTime`, all-day events
/// carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    pub fn at(instant: DateTime<FixedOffset>, time_zone: &str) -> Self {
        Self {
            date_time: Some(instant.to_rfc3339()),
            date: None,
            time_zone: Some(time_zone.to_string()),
        }
    }

    /// The instant this boundary denotes. All-day dates resolve to midnight
    /// UTC.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = &self.date_time {
            return DateTime::parse_from_rfc3339(dt)
                .ok()
                .map(|t| t.with_timezone(&Utc));
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// The raw value as sent by the backend.
    pub fn as_str(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
}

/// An event to insert into the primary calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub summary: String,
    pub description: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub time_zone: String,
}

#[async_trait]
pub trait CalendarBackend: Send + Sync {
    /// Upcoming events after `after`, recurring events expanded into single
    /// occurrences, ordered by start time, at most `max` of them.
    async fn list_events(
        &self,
        after: DateTime<Utc>,
        max: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError>;

    /// Insert `event` and return the backend's viewable link for it.
    async fn insert_event(&self, event: &NewEvent) -> Result<String, CalendarError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timed_event_instant_is_normalized_to_utc() {
        let dt = EventDateTime {
            date_time: Some("2026-10-20T10:00:00+09:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            dt.instant(),
            Some(Utc.with_ymd_and_hms(2026, 10, 20, 1, 0, 0).unwrap())
        );
    }

    #[test]
    fn all_day_event_resolves_to_midnight() {
        let dt = EventDateTime {
            date: Some("2026-12-24".to_string()),
            ..Default::default()
        };
        assert_eq!(
            dt.instant(),
            Some(Utc.with_ymd_and_hms(2026, 12, 24, 0, 0, 0).unwrap())
        );
        assert_eq!(dt.as_str(), "2026-12-24");
    }

    #[test]
    fn deserializes_google_event_shape() {
        let json = r#"{
            "id": "abc123",
            "summary": "Standup",
            "start": {"dateTime": "2026-10-20T09:00:00+09:00", "timeZone": "Asia/Tokyo"},
            "end": {"dateTime": "2026-10-20T09:15:00+09:00", "timeZone": "Asia/Tokyo"},
            "htmlLink": "https://calendar.example/abc123"
        }"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.id, "abc123");
        assert_eq!(event.description, "");
        assert_eq!(event.start.time_zone.as_deref(), Some("Asia/Tokyo"));
    }
}
