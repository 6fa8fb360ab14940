// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod calendar;
pub mod identity;
pub mod signing;

pub use calendar::{CalendarProxy, GoogleCalendarClient, RemoteCallError};
pub use identity::IdentityBroker;
