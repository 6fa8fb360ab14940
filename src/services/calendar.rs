// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar API client and the authorized calendar proxy.
//!
//! [`GoogleCalendarClient`] speaks HTTP and reports [`RemoteCallError`].
//! [`CalendarProxy`] is what handlers call: it gates on the session
//! credential, validates input before any remote call, and maps every remote
//! failure onto [`AppError`]. Remote failures are never retried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AppError;
use crate::middleware::session::RequestContext;
use crate::models::{Ack, CalendarEvent, EventPatch, NewEvent, PatchTime, Reminders, Visibility};
use crate::time_utils::{format_utc_rfc3339, parse_client_instant};

/// Events returned by `/calendar/sync` when no limit is given.
pub const DEFAULT_LIST_LIMIT: u32 = 10;
/// Largest page we ask the calendar API for.
pub const MAX_LIST_LIMIT: u32 = 250;
const PRIMARY_CALENDAR: &str = "primary";

/// Failures talking to the remote calendar.
#[derive(Debug, thiserror::Error)]
pub enum RemoteCallError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Access token rejected")]
    Unauthorized,

    #[error("Event not found")]
    NotFound,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Decode(String),
}

/// Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    fn event_url(&self, calendar_id: &str, event_id: &str) -> String {
        format!(
            "{}/{}",
            self.events_url(calendar_id),
            urlencoding::encode(event_id)
        )
    }

    /// List single (expanded) events starting at `time_min`, ordered by start.
    pub async fn list_events(
        &self,
        access_token: &str,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, RemoteCallError> {
        let response = self
            .http
            .get(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", format_utc_rfc3339(time_min)),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        let list: EventList = Self::check_response_json(response).await?;
        Ok(list.items)
    }

    pub async fn insert_event<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        calendar_id: &str,
        body: &B,
    ) -> Result<CalendarEvent, RemoteCallError> {
        let response = self
            .http
            .post(self.events_url(calendar_id))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        Self::check_response_json(response).await
    }

    pub async fn patch_event<B: Serialize + ?Sized>(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
        body: &B,
    ) -> Result<CalendarEvent, RemoteCallError> {
        let response = self
            .http
            .patch(self.event_url(calendar_id, event_id))
            .bearer_auth(access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        Self::check_response_json(response).await
    }

    pub async fn delete_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event_id: &str,
    ) -> Result<(), RemoteCallError> {
        let response = self
            .http
            .delete(self.event_url(calendar_id, event_id))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| RemoteCallError::Transport(e.to_string()))?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Check response status and return error if not successful.
    async fn check_response(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RemoteCallError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status.as_u16() {
            401 => Err(RemoteCallError::Unauthorized),
            // 410 Gone is what Google returns for an already-deleted event.
            404 | 410 => Err(RemoteCallError::NotFound),
            429 => {
                tracing::warn!("Calendar API rate limit hit (429)");
                Err(RemoteCallError::RateLimited)
            }
            code => {
                let body = response.text().await.unwrap_or_default();
                Err(RemoteCallError::Status { status: code, body })
            }
        }
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
    ) -> Result<T, RemoteCallError> {
        Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| RemoteCallError::Decode(e.to_string()))
    }
}

#[derive(Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

// ─────────────────────────────────────────────────────────────────────────────
// CalendarProxy - authorized operations on the user's primary calendar
// ─────────────────────────────────────────────────────────────────────────────

/// Outgoing timed value, always in UTC with a `Z` suffix.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UtcTime {
    date_time: String,
}

impl From<DateTime<Utc>> for UtcTime {
    fn from(instant: DateTime<Utc>) -> Self {
        Self {
            date_time: format_utc_rfc3339(instant),
        }
    }
}

#[derive(Serialize)]
struct Attendee<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct InsertEventBody<'a> {
    summary: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    start: UtcTime,
    end: UtcTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendees: Option<Vec<Attendee<'a>>>,
    reminders: Reminders,
    visibility: Visibility,
}

#[derive(Serialize)]
struct PatchEventBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<&'a PatchTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<&'a PatchTime>,
}

/// Authorized proxy to the user's primary calendar.
#[derive(Clone)]
pub struct CalendarProxy {
    client: GoogleCalendarClient,
    calendar_id: String,
}

impl CalendarProxy {
    pub fn new(client: GoogleCalendarClient) -> Self {
        Self {
            client,
            calendar_id: PRIMARY_CALENDAR.to_string(),
        }
    }

    /// Upcoming events from now, ascending by start, at most `limit`.
    pub async fn list_upcoming(
        &self,
        ctx: &RequestContext,
        limit: u32,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let credential = ctx.require_authenticated()?;

        if limit == 0 || limit > MAX_LIST_LIMIT {
            return Err(AppError::BadRequest(format!(
                "limit must be between 1 and {}",
                MAX_LIST_LIMIT
            )));
        }

        let mut events = self
            .client
            .list_events(
                credential.access_token(),
                &self.calendar_id,
                Utc::now(),
                limit,
            )
            .await
            .map_err(|e| remote_failure(e, "Failed to fetch calendar events"))?;

        // Keep the remote order: all-day dates sort in the calendar's own zone.
        events.truncate(limit as usize);

        tracing::debug!(count = events.len(), "Fetched upcoming events");
        Ok(events)
    }

    /// Create an event. Rejects `start > end` locally, before any remote call.
    pub async fn create_event(
        &self,
        ctx: &RequestContext,
        event: NewEvent,
    ) -> Result<CalendarEvent, AppError> {
        let credential = ctx.require_authenticated()?;

        event
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Invalid event: {}", e)))?;
        let title = event.title.trim();
        if title.is_empty() {
            return Err(AppError::BadRequest("Event title is required".to_string()));
        }

        let start = parse_client_instant(&event.start).ok_or_else(|| {
            AppError::BadRequest("Invalid 'start': expected an RFC3339 datetime".to_string())
        })?;
        let end = parse_client_instant(&event.end).ok_or_else(|| {
            AppError::BadRequest("Invalid 'end': expected an RFC3339 datetime".to_string())
        })?;
        if start > end {
            return Err(AppError::BadRequest(
                "Event start must not be after its end".to_string(),
            ));
        }

        let body = InsertEventBody {
            summary: title,
            description: event.description.as_deref(),
            location: event.location.as_deref(),
            start: start.into(),
            end: end.into(),
            attendees: event
                .attendees
                .as_ref()
                .map(|emails| emails.iter().map(|email| Attendee { email }).collect()),
            reminders: event.reminders.clone().unwrap_or_default(),
            visibility: event.visibility.unwrap_or_default(),
        };

        let created = self
            .client
            .insert_event(credential.access_token(), &self.calendar_id, &body)
            .await
            .map_err(|e| remote_failure(e, "Failed to create event"))?;

        tracing::info!(event_id = ?created.id, "Calendar event created");
        Ok(created)
    }

    /// Patch an existing event; only supplied fields change.
    pub async fn update_event(
        &self,
        ctx: &RequestContext,
        patch: EventPatch,
    ) -> Result<CalendarEvent, AppError> {
        let credential = ctx.require_authenticated()?;

        patch
            .validate()
            .map_err(|e| AppError::BadRequest(format!("Invalid update: {}", e)))?;
        if patch.is_empty() {
            return Err(AppError::BadRequest("No fields to update".to_string()));
        }
        if let (Some(start), Some(end)) = (&patch.start, &patch.end) {
            if range_is_inverted(start, end) {
                return Err(AppError::BadRequest(
                    "Event start must not be after its end".to_string(),
                ));
            }
        }

        let body = PatchEventBody {
            summary: patch.summary.as_deref(),
            description: patch.description.as_deref(),
            location: patch.location.as_deref(),
            start: patch.start.as_ref(),
            end: patch.end.as_ref(),
        };

        let updated = self
            .client
            .patch_event(credential.access_token(), &self.calendar_id, &patch.id, &body)
            .await
            .map_err(|e| match e {
                RemoteCallError::NotFound => {
                    AppError::NotFound(format!("Event {} not found", patch.id))
                }
                other => remote_failure(other, "Failed to update event"),
            })?;

        tracing::info!(event_id = %patch.id, "Calendar event updated");
        Ok(updated)
    }

    /// Delete an event. An unknown or already-deleted id is `NotFound`.
    pub async fn delete_event(&self, ctx: &RequestContext, event_id: &str) -> Result<Ack, AppError> {
        let credential = ctx.require_authenticated()?;

        if event_id.trim().is_empty() {
            return Err(AppError::BadRequest("Event id is required".to_string()));
        }

        self.client
            .delete_event(credential.access_token(), &self.calendar_id, event_id)
            .await
            .map_err(|e| match e {
                RemoteCallError::NotFound => {
                    AppError::NotFound(format!("Event {} not found", event_id))
                }
                other => remote_failure(other, "Failed to delete event."),
            })?;

        tracing::info!(event_id = %event_id, "Calendar event deleted");
        Ok(Ack {
            message: "Event deleted successfully.".to_string(),
        })
    }
}

/// True when both ends are comparable and start comes after end.
///
/// Local date-times without an offset are left to the remote to judge.
fn range_is_inverted(start: &PatchTime, end: &PatchTime) -> bool {
    if let (Some(start), Some(end)) = (start.absolute(), end.absolute()) {
        return start > end;
    }
    match (start, end) {
        (
            PatchTime { date_time: None, date: Some(start), .. },
            PatchTime { date_time: None, date: Some(end), .. },
        ) => start > end,
        _ => false,
    }
}

/// Map a remote failure onto the application taxonomy.
///
/// A rejected access token means the session's credential is stale. It is
/// reported as `Unauthenticated` and the binding is left alone; a token
/// refresh would hook in here.
fn remote_failure(err: RemoteCallError, context: &'static str) -> AppError {
    match err {
        RemoteCallError::Unauthorized => {
            tracing::warn!(context, "Calendar API rejected the access token");
            AppError::Unauthenticated
        }
        RemoteCallError::NotFound => AppError::NotFound("Calendar resource not found".to_string()),
        other => AppError::RemoteError {
            context,
            cause: other.to_string(),
        },
    }
}
