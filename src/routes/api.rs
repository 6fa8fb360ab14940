// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile and calendar proxy.
//!
//! Each handler receives the [`RequestContext`] built by the session
//! middleware and passes it to the operation, which does the auth gate.

use crate::error::{AppError, Result};
use crate::middleware::session::RequestContext;
use crate::models::{Ack, CalendarEvent, EventPatch, Identity, NewEvent};
use crate::services::calendar::DEFAULT_LIST_LIMIT;
use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use std::fmt::Display;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(get_me))
        .route("/calendar/sync", get(sync_calendar))
        .route("/calendar/event", post(create_event))
        .route("/calendar/update-event", put(update_event))
        .route("/calendar/event/{event_id}", delete(delete_event))
}

/// Unwrap an extractor result, checking authentication first so an
/// anonymous request with a bad body still gets 401.
fn accept<T>(
    context: &RequestContext,
    extracted: std::result::Result<T, impl Display>,
) -> Result<T> {
    context.require_authenticated()?;
    extracted.map_err(|e| AppError::BadRequest(e.to_string()))
}

// ─── User Profile ────────────────────────────────────────────

/// Get the signed-in identity. No credential fields are exposed.
async fn get_me(Extension(context): Extension<RequestContext>) -> Result<Json<Identity>> {
    Ok(Json(context.require_identity()?.clone()))
}

// ─── Calendar ────────────────────────────────────────────────

#[derive(Deserialize)]
struct SyncQuery {
    limit: Option<u32>,
}

/// Upcoming events on the primary calendar.
async fn sync_calendar(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    query: std::result::Result<Query<SyncQuery>, QueryRejection>,
) -> Result<Json<Vec<CalendarEvent>>> {
    let Query(query) = accept(&context, query)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);

    let events = state.calendar.list_upcoming(&context, limit).await?;
    Ok(Json(events))
}

async fn create_event(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    body: std::result::Result<Json<NewEvent>, JsonRejection>,
) -> Result<Json<CalendarEvent>> {
    let Json(event) = accept(&context, body)?;
    let created = state.calendar.create_event(&context, event).await?;
    Ok(Json(created))
}

async fn update_event(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    body: std::result::Result<Json<EventPatch>, JsonRejection>,
) -> Result<Json<CalendarEvent>> {
    let Json(patch) = accept(&context, body)?;
    let updated = state.calendar.update_event(&context, patch).await?;
    Ok(Json(updated))
}

async fn delete_event(
    State(state): State<Arc<AppState>>,
    Extension(context): Extension<RequestContext>,
    Path(event_id): Path<String>,
) -> Result<Json<Ack>> {
    let ack = state.calendar.delete_event(&context, &event_id).await?;
    Ok(Json(ack))
}
