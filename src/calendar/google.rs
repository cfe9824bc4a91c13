//! Google Calendar v3 REST client.
//!
//! Talks to `{api_base}/calendars/primary/events` with a bearer access token
//! obtained from the authorization flow. The token is not refreshed; a
//! session that outlives it sees `401` errors, which surface as tool errors.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{CalendarBackend, CalendarEvent, EventDateTime, NewEvent};
use crate::error::CalendarError;

pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

const CALENDAR_ID: &str = "primary";

#[derive(Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

#[derive(Deserialize)]
struct CreatedEvent {
    #[serde(rename = "htmlLink", default)]
    html_link: String,
}

pub struct GoogleCalendar {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
}

impl GoogleCalendar {
    pub fn new(
        api_base: &str,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CalendarError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CalendarError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    fn events_url(&self) -> String {
        format!("{}/calendars/{}/events", self.api_base, CALENDAR_ID)
    }
}

/// Map a non-success status to [`CalendarError::Api`], keeping the body for
/// the model to read.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, CalendarError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CalendarError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl CalendarBackend for GoogleCalendar {
    async fn list_events(
        &self,
        after: DateTime<Utc>,
        max: u32,
    ) -> Result<Vec<CalendarEvent>, CalendarError> {
        let time_min = after.to_rfc3339_opts(SecondsFormat::Secs, true);
        let max_results = max.to_string();

        let resp = self
            .http
            .get(self.events_url())
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.as_str()),
                ("maxResults", max_results.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ])
            .send()
            .await
            .map_err(|e| CalendarError::Transport(e.to_string()))?;

        let page: EventsPage = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| CalendarError::Decode(e.to_string()))?;

        tracing::debug!(count = page.items.len(), "Listed calendar events");
        Ok(page.items)
    }

    async fn insert_event(&self, event: &NewEvent) -> Result<String, CalendarError> {
        let body = json!({
            "summary": event.summary,
            "description": event.description,
            "start": EventDateTime::at(event.start, &event.time_zone),
            "end": EventDateTime::at(event.end, &event.time_zone),
        });

        let resp = self
            .http
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| CalendarError::Transport(e.to_string()))?;

        let created: CreatedEvent = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| CalendarError::Decode(e.to_string()))?;

        tracing::info!(summary = %event.summary, "Calendar event created");
        Ok(created.html_link)
    }
}
