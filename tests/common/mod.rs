#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use calmate::agent::{ConversationSession, ModelConversation, ModelReply, ToolCallRequest, Turn};
use calmate::calendar::{CalendarBackend, CalendarEvent, EventDateTime, NewEvent};
use calmate::error::{CalendarError, ModelError};
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

// ─── Scripted model ───────────────────────────────────────────────────

/// Replays canned replies in order and records every transcript it was
/// shown. Clones share state.
#[derive(Clone, Default)]
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<Result<ModelReply, ModelError>>>>,
    seen: Arc<Mutex<Vec<Vec<Turn>>>>,
    delay: StdDuration,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<ModelReply, ModelError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            seen: Arc::default(),
            delay: StdDuration::ZERO,
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// The transcript passed on the most recent call.
    pub fn last_transcript(&self) -> Vec<Turn> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ModelConversation for ScriptedModel {
    async fn respond(&self, session: &ConversationSession) -> Result<ModelReply, ModelError> {
        self.seen.lock().unwrap().push(session.turns().to_vec());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Stream("script exhausted".into())))
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    ToolCallRequest {
        call_id: id.to_string(),
        name: name.to_string(),
        arguments,
    }
}

// ─── In-memory calendar ───────────────────────────────────────────────

/// Behaves like the Calendar API: events that have not ended yet, by start
/// time, at most `max`.
pub struct FakeCalendar {
    events: Vec<CalendarEvent>,
    link: String,
    pub inserted: Mutex<Vec<NewEvent>>,
    /// `max` of every list request, in order.
    pub list_requests: Mutex<Vec<u32>>,
}

impl FakeCalendar {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self {
            events,
            link: "https://www.google.com/calendar/event?eid=abc123".to_string(),
            inserted: Mutex::new(Vec::new()),
            list_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn link(&self) -> &str {
        &self.link
    }
}

#[async_trait]
impl CalendarBackend for FakeCalendar {
    async fn list_events(
        &self,
        after: DateTime<Utc>,
        max: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.list_requests.lock().unwrap().push(max);
        let mut events: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|e| e.end.instant().is_some_and(|end| end > after))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start.instant());
        events.truncate(max as usize);
        Ok(events)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<String, CalendarError> {
        self.inserted.lock().unwrap().push(event.clone());
        Ok(self.link.clone())
    }
}

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap()
}

pub fn event_at(id: &str, start: DateTime<Utc>) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: format!("Meeting {id}"),
        description: String::new(),
        start: EventDateTime {
            date_time: Some(start.to_rfc3339()),
            ..Default::default()
        },
        end: EventDateTime {
            date_time: Some((start + Duration::minutes(30)).to_rfc3339()),
            ..Default::default()
        },
    }
}
