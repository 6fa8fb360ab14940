// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod event;
pub mod session;

pub use event::{
    Ack, CalendarEvent, EventPatch, EventTime, NewEvent, PatchTime, Reminders, Visibility,
};
pub use session::{Credential, Identity, SessionBinding, SessionId};
