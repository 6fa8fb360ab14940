// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar event DTOs exchanged with the browser and the remote calendar.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Upper bound for reminder offsets accepted by the calendar API (4 weeks).
pub const MAX_REMINDER_MINUTES: u32 = 40_320;
/// Upper bound on attendees per event accepted locally.
pub const MAX_ATTENDEES: usize = 200;

/// A calendar event as returned by the remote calendar.
///
/// Only the fields this service inspects are typed; everything else the remote
/// returns is carried through `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Start or end of an event: either a timed instant or an all-day date.
///
/// All-day dates are local to the calendar's own time zone and have no
/// absolute instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// Start or end in an update request, forwarded to the calendar as given.
///
/// `dateTime` is either RFC 3339 with an offset, or a local
/// `YYYY-MM-DDTHH:MM:SS` when `timeZone` names the zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_patch_time"))]
pub struct PatchTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl PatchTime {
    /// The instant, when `dateTime` carries its own UTC offset.
    pub fn absolute(&self) -> Option<DateTime<FixedOffset>> {
        self.date_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
    }

    fn has_time_zone(&self) -> bool {
        self.time_zone.as_deref().is_some_and(|tz| !tz.trim().is_empty())
    }
}

fn validate_patch_time(time: &PatchTime) -> Result<(), ValidationError> {
    match (time.date_time.as_deref(), time.date) {
        (None, None) => Err(ValidationError::new("missing_date_or_date_time")),
        (Some(_), _) if time.absolute().is_some() => Ok(()),
        (Some(local), _) => {
            let parsed = NaiveDateTime::parse_from_str(local, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
            if parsed && time.has_time_zone() {
                Ok(())
            } else {
                Err(ValidationError::new("date_time_needs_offset_or_time_zone"))
            }
        }
        (None, Some(_)) => Ok(()),
    }
}

/// Event visibility as understood by the calendar API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Default,
    Public,
    Private,
    Confidential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderOverride {
    pub method: ReminderMethod,
    pub minutes: u32,
}

/// Reminder policy for a new event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    /// Absent means `false`: the overrides alone decide.
    #[serde(default)]
    pub use_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = "validate_reminder_overrides"))]
    pub overrides: Option<Vec<ReminderOverride>>,
}

impl Default for Reminders {
    /// Provider default reminders.
    fn default() -> Self {
        Self {
            use_default: true,
            overrides: None,
        }
    }
}

/// Body of `POST /calendar/event`.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewEvent {
    #[validate(length(min = 1, max = 1024))]
    pub title: String,
    #[validate(length(max = 8192))]
    pub description: Option<String>,
    #[validate(length(max = 1024))]
    pub location: Option<String>,
    /// RFC 3339 instant, or a naive `YYYY-MM-DDTHH:MM[:SS]` taken as UTC
    pub start: String,
    pub end: String,
    #[validate(custom(function = "validate_attendees"))]
    pub attendees: Option<Vec<String>>,
    #[validate(nested)]
    pub reminders: Option<Reminders>,
    pub visibility: Option<Visibility>,
}

/// Body of `PUT /calendar/update-event`. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EventPatch {
    #[validate(length(min = 1, max = 1024))]
    pub id: String,
    #[validate(length(min = 1, max = 1024))]
    pub summary: Option<String>,
    #[validate(length(max = 8192))]
    pub description: Option<String>,
    #[validate(length(max = 1024))]
    pub location: Option<String>,
    #[validate(nested)]
    pub start: Option<PatchTime>,
    #[validate(nested)]
    pub end: Option<PatchTime>,
}

impl EventPatch {
    /// True when nothing besides the id was supplied.
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.start.is_none()
            && self.end.is_none()
    }
}

/// Acknowledgment returned by delete.
#[derive(Debug, Clone, Serialize)]
pub struct Ack {
    pub message: String,
}

// validator hands custom checks a reference to the field type.
#[allow(clippy::ptr_arg)]
fn validate_attendees(attendees: &Vec<String>) -> Result<(), ValidationError> {
    if attendees.len() > MAX_ATTENDEES {
        return Err(ValidationError::new("too_many_attendees"));
    }
    if attendees.iter().all(|email| looks_like_email(email)) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_attendee_email"))
    }
}

#[allow(clippy::ptr_arg)]
fn validate_reminder_overrides(overrides: &Vec<ReminderOverride>) -> Result<(), ValidationError> {
    if overrides.iter().all(|o| o.minutes <= MAX_REMINDER_MINUTES) {
        Ok(())
    } else {
        Err(ValidationError::new("reminder_minutes_out_of_range"))
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
