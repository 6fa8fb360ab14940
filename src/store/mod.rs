// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store: session id -> (identity, credential).
//!
//! Callers only see the [`CredentialStore`] trait. The in-memory
//! implementation is process-local; a networked store (Redis, Firestore, ...)
//! can implement the same trait without changing any handler.

pub mod memory;

pub use memory::MemoryCredentialStore;

use crate::models::{Credential, Identity, SessionBinding, SessionId};
use async_trait::async_trait;
use std::sync::Arc;

/// Shared handle used in `AppState`.
pub type SharedCredentialStore = Arc<dyn CredentialStore>;

/// Storage for session bindings.
///
/// Each operation is atomic on its own; no cross-operation transactions are
/// offered. Implementations must not hold locks across `.await` points of
/// their callers.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Bind the pair to `session_id`, replacing any previous binding.
    async fn bind(
        &self,
        session_id: &SessionId,
        identity: Identity,
        credential: Credential,
    ) -> Result<(), StoreError>;

    /// Look up the binding for `session_id`. Unknown ids yield `None`.
    async fn resolve(&self, session_id: &SessionId) -> Result<Option<SessionBinding>, StoreError>;

    /// Remove the binding. Unknown ids are a no-op.
    async fn unbind(&self, session_id: &SessionId) -> Result<(), StoreError>;
}

/// Session store errors (only remote stores produce these).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}
