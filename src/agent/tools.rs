//! Tool implementations for the calendar assistant.
//!
//! [`ToolExecutor`] runs an already-validated [`ToolInvocation`] against the
//! injected calendar backend and clock. Backend failures are returned as
//! `Err(String)` so the dispatch loop can hand them back to the model; they
//! never abort the conversation.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::validator::ToolInvocation;
use crate::calendar::{CalendarBackend, CalendarEvent, NewEvent};

/// Largest page the Calendar API serves for one list request.
const MAX_LIST_WINDOW: u32 = 2500;

/// Source of "now". Swappable so listing boundaries can be tested.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Format an instant the way the clock tool reports it (RFC 3339, UTC,
/// second precision).
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a timestamp in the exchange format used by the tools.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw)
}

pub struct ToolExecutor {
    calendar: Arc<dyn CalendarBackend>,
    time_zone: String,
    clock: Clock,
}

impl ToolExecutor {
    pub fn new(calendar: Arc<dyn CalendarBackend>, time_zone: impl Into<String>) -> Self {
        Self {
            calendar,
            time_zone: time_zone.into(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Run one tool. `Ok` is the payload object handed back to the model.
    pub async fn execute(&self, invocation: ToolInvocation) -> Result<Map<String, Value>, String> {
        match invocation {
            ToolInvocation::TimeNow => Ok(self.time_now()),
            ToolInvocation::ListEvents { count } => self.list_events(count).await,
            ToolInvocation::RegisterEvent {
                start,
                end,
                summary,
                description,
            } => self.register_event(start, end, summary, description).await,
        }
    }

    fn time_now(&self) -> Map<String, Value> {
        let mut payload = Map::new();
        payload.insert(
            "current_time".to_string(),
            Value::String(format_timestamp((self.clock)())),
        );
        payload
    }

    async fn list_events(&self, count: u32) -> Result<Map<String, Value>, String> {
        let now = (self.clock)();
        let mut payload = Map::new();

        if count == 0 {
            payload.insert("events".to_string(), json!([]));
            return Ok(payload);
        }

        // The backend window includes events still in progress, which are
        // dropped here; widen it until enough upcoming events remain.
        let mut window = count.min(MAX_LIST_WINDOW);
        let events = loop {
            let fetched = self
                .calendar
                .list_events(now, window)
                .await
                .map_err(|e| {
                    tracing::warn!("Failed to list events: {}", e);
                    format!("Failed to list events: {e}")
                })?;
            let exhausted = fetched.len() < window as usize;
            let events = upcoming(fetched, now, count as usize);

            if events.len() >= count as usize || exhausted || window >= MAX_LIST_WINDOW {
                break events;
            }
            window = window.saturating_mul(2).min(MAX_LIST_WINDOW);
            tracing::debug!(window, "Widening event listing window");
        };

        let listed: Vec<Value> = events.iter().map(event_to_json).collect();
        payload.insert("events".to_string(), Value::Array(listed));
        Ok(payload)
    }

    async fn register_event(
        &self,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
        summary: String,
        description: String,
    ) -> Result<Map<String, Value>, String> {
        let event = NewEvent {
            summary,
            description,
            start,
            end,
            time_zone: self.time_zone.clone(),
        };

        let link = self.calendar.insert_event(&event).await.map_err(|e| {
            tracing::warn!("Failed to register event: {}", e);
            format!("Failed to register event: {e}")
        })?;

        let mut payload = Map::new();
        payload.insert("summary".into(), Value::String(event.summary));
        payload.insert("description".into(), Value::String(event.description));
        payload.insert("start".into(), Value::String(event.start.to_rfc3339()));
        payload.insert("end".into(), Value::String(event.end.to_rfc3339()));
        payload.insert("event_link".into(), Value::String(link));
        Ok(payload)
    }
}

/// Keep events starting at or after `now`, in start order, at most `count`.
/// Events whose start cannot be read are dropped.
fn upcoming(events: Vec<CalendarEvent>, now: DateTime<Utc>, count: usize) -> Vec<CalendarEvent> {
    let mut timed: Vec<(DateTime<Utc>, CalendarEvent)> = events
        .into_iter()
        .filter_map(|e| match e.start.instant() {
            Some(start) => Some((start, e)),
            None => {
                tracing::debug!(id = %e.id, "Skipping event without a readable start");
                None
            }
        })
        .filter(|(start, _)| *start >= now)
        .collect();
    timed.sort_by_key(|(start, _)| *start);
    timed.into_iter().take(count).map(|(_, e)| e).collect()
}

fn event_to_json(event: &CalendarEvent) -> Value {
    json!({
        "id": event.id,
        "summary": event.summary,
        "description": event.description,
        "start": event.start.as_str(),
        "end": event.end.as_str(),
    })
}
