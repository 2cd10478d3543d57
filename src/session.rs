//! Session bridge for external users.
//!
//! Maps an externally supplied user identifier to a stable internal identity
//! and private room, created once per process lifetime and reused on every
//! later message. The map is a concurrent `DashMap`; publication goes through
//! `entry().or_insert` so two racing first messages agree on a single session.
//!
//! Sessions are process-local. The account row written on creation is
//! durable, so scores survive a restart even though a new session (with fresh
//! ids) is minted for returning users.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::errors::GameError;
use crate::ledger::SqliteLedger;

/// Namespace for v5 identity/room derivation.
static SESSION_NAMESPACE: Lazy<Uuid> = Lazy::new(|| {
    Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").expect("valid namespace uuid")
});

/// An external user's binding to an internal identity and room.
#[derive(Debug, Clone)]
pub struct Session {
    /// Internal identity id used for ledger entries and gateway calls.
    pub identity_id: String,
    /// Private conversation room for this user.
    pub room_id: String,
    /// Refreshed on every lookup.
    pub last_interaction: DateTime<Utc>,
}

/// Process-local registry of external-user sessions.
pub struct SessionBridge {
    ledger: Arc<SqliteLedger>,
    sessions: DashMap<String, Session>,
}

impl SessionBridge {
    pub fn new(ledger: Arc<SqliteLedger>) -> Self {
        Self {
            ledger,
            sessions: DashMap::new(),
        }
    }

    /// Resolve the session for `external_user_id`, creating it on first use.
    ///
    /// Creation derives namespaced ids salted with the current time (so ids
    /// never collide across restarts), upserts the account row first, and only
    /// then publishes the session — a failed upsert caches nothing. When two
    /// callers race on the same new user, `or_insert` keeps whichever session
    /// landed first and both callers observe it.
    pub async fn get_or_create(
        &self,
        external_user_id: &str,
        display_name: Option<&str>,
    ) -> Result<Session, GameError> {
        if let Some(mut existing) = self.sessions.get_mut(external_user_id) {
            existing.last_interaction = Utc::now();
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let identity_id = Uuid::new_v5(
            &SESSION_NAMESPACE,
            format!("user-{}-{}", external_user_id, now.timestamp_millis()).as_bytes(),
        )
        .to_string();
        let room_id = Uuid::new_v5(
            &SESSION_NAMESPACE,
            format!("room-{}-{}", identity_id, now.timestamp_millis()).as_bytes(),
        )
        .to_string();

        self.ledger
            .upsert_account(
                &identity_id,
                display_name.unwrap_or(external_user_id),
                external_user_id,
                &format!("{}@example.com", external_user_id),
            )
            .await?;

        let session = Session {
            identity_id,
            room_id,
            last_interaction: now,
        };
        let entry = self
            .sessions
            .entry(external_user_id.to_string())
            .or_insert(session);
        log::info!(
            "session for external user {} -> identity {}",
            external_user_id,
            entry.identity_id
        );
        Ok(entry.clone())
    }

    /// Number of live sessions (for status reporting).
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}
