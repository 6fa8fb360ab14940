// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar Gateway: Google sign-in and an authorized calendar proxy.
//!
//! This crate provides the backend API that signs a user in with Google,
//! keeps the resulting credential in a server-side session, and proxies
//! calendar reads and writes on the user's behalf.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod time_utils;

use config::Config;
use services::{CalendarProxy, GoogleCalendarClient, IdentityBroker};
use store::SharedCredentialStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: SharedCredentialStore,
    pub identity_broker: IdentityBroker,
    pub calendar: CalendarProxy,
}

impl AppState {
    /// Wire services from configuration around the given session store.
    pub fn new(config: Config, store: SharedCredentialStore) -> Self {
        let identity_broker = IdentityBroker::new(&config);
        let calendar = CalendarProxy::new(GoogleCalendarClient::new(
            config.calendar_api_base.clone(),
        ));
        Self {
            config,
            store,
            identity_broker,
            calendar,
        }
    }
}
