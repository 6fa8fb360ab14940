// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process credential store backed by a concurrent map.

use super::{CredentialStore, StoreError};
use crate::models::{Credential, Identity, SessionBinding, SessionId};
use async_trait::async_trait;
use dashmap::DashMap;

/// In-memory store. Bindings are lost on restart.
#[derive(Default)]
pub struct MemoryCredentialStore {
    sessions: DashMap<SessionId, SessionBinding>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn bind(
        &self,
        session_id: &SessionId,
        identity: Identity,
        credential: Credential,
    ) -> Result<(), StoreError> {
        let binding = SessionBinding {
            identity,
            credential,
            created_at: chrono::Utc::now(),
        };
        if self.sessions.insert(session_id.clone(), binding).is_some() {
            tracing::debug!(session = %session_id, "Replaced existing session binding");
        }
        Ok(())
    }

    async fn resolve(&self, session_id: &SessionId) -> Result<Option<SessionBinding>, StoreError> {
        // Clone out so the shard guard is released before returning.
        Ok(self.sessions.get(session_id).map(|entry| entry.clone()))
    }

    async fn unbind(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.sessions.remove(session_id);
        Ok(())
    }
}
