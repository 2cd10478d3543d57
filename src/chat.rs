//! External chat — outside users join the scoring pipeline.
//!
//! A single synchronous turn that bypasses the round cadence: resolve the
//! caller's session, record the message as an open entry, ask the host for a
//! reply, record the reply and score, and hand the reply straight back to the
//! caller. Runs concurrently with the round loop; the ledger's atomic close
//! keeps the overlap safe.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AgentProfile;
use crate::errors::GameError;
use crate::gateway::MessageGateway;
use crate::ledger::SqliteLedger;
use crate::session::SessionBridge;

/// Incoming external chat message.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    /// The user's message text.
    pub message: String,
    /// Externally supplied user identifier.
    pub user_id: String,
    /// Display name; defaults when absent.
    pub user_name: Option<String>,
}

/// Session identifiers echoed back so the caller can correlate later queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub user_id: String,
    pub room_id: String,
    pub original_user_id: String,
}

/// The host's reply to an external message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub message: String,
    pub score: i64,
    pub session_info: SessionInfo,
}

/// The external-chat pipeline.
pub struct ExternalChat {
    gateway: Arc<dyn MessageGateway>,
    ledger: Arc<SqliteLedger>,
    sessions: Arc<SessionBridge>,
    host: AgentProfile,
}

impl ExternalChat {
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        ledger: Arc<SqliteLedger>,
        sessions: Arc<SessionBridge>,
        host: AgentProfile,
    ) -> Self {
        Self {
            gateway,
            ledger,
            sessions,
            host,
        }
    }

    /// Run one external turn and return the host's reply and score.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, GameError> {
        if request.message.trim().is_empty() {
            return Err(GameError::validation("message is required"));
        }
        if request.user_id.trim().is_empty() {
            return Err(GameError::validation("user_id is required"));
        }

        let session = self
            .sessions
            .get_or_create(&request.user_id, request.user_name.as_deref())
            .await?;

        self.ledger
            .record_contestant_turn(&session.identity_id, &request.message, &session.room_id, None)
            .await?;

        let user_name = request.user_name.as_deref().unwrap_or("External User");
        let replies = self
            .gateway
            .send_message(
                &self.host.id,
                &request.message,
                &session.identity_id,
                user_name,
                &session.room_id,
            )
            .await?;
        let Some(reply) = replies.last() else {
            return Err(GameError::gateway("host returned no reply"));
        };

        let score = reply.score.unwrap_or(0);
        self.ledger
            .record_host_reply(&session.identity_id, &reply.text, score, None)
            .await?;

        log::info!(
            "external chat: {} scored {} (identity {})",
            request.user_id,
            score,
            session.identity_id
        );

        Ok(ChatReply {
            message: reply.text.clone(),
            score,
            session_info: SessionInfo {
                user_id: session.identity_id,
                room_id: session.room_id,
                original_user_id: request.user_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::gateway::{AgentReply, PersonaDescription};

    struct ScriptedHost {
        reply: Option<(String, Option<i64>)>,
    }

    #[async_trait]
    impl MessageGateway for ScriptedHost {
        async fn send_message(
            &self,
            _agent_id: &str,
            _text: &str,
            _user_id: &str,
            _user_name: &str,
            _room_id: &str,
        ) -> Result<Vec<AgentReply>, GameError> {
            Ok(self
                .reply
                .iter()
                .map(|(text, score)| AgentReply {
                    text: text.clone(),
                    score: *score,
                })
                .collect())
        }

        async fn generate_persona(&self, _agent_id: &str) -> Result<PersonaDescription, GameError> {
            Err(GameError::gateway("not used"))
        }
    }

    fn chat_with(reply: Option<(&str, Option<i64>)>) -> (tempfile::TempDir, ExternalChat) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SqliteLedger::new(dir.path().join("game.db")).unwrap());
        let sessions = Arc::new(SessionBridge::new(Arc::clone(&ledger)));
        let chat = ExternalChat::new(
            Arc::new(ScriptedHost {
                reply: reply.map(|(t, s)| (t.to_string(), s)),
            }),
            ledger,
            sessions,
            AgentProfile {
                id: "host".to_string(),
                name: "Marilyn".to_string(),
                ip_id: None,
                wallet_key: None,
                avatar_url: None,
                description: None,
            },
        );
        (dir, chat)
    }

    fn request(message: &str, user_id: &str) -> ChatRequest {
        ChatRequest {
            message: message.to_string(),
            user_id: user_id.to_string(),
            user_name: Some("Sam".to_string()),
        }
    }

    #[tokio::test]
    async fn records_one_closed_entry_per_message() {
        let (_dir, chat) = chat_with(Some(("lovely to meet you", Some(4))));

        let reply = chat.handle(request("hello there", "ext-1")).await.unwrap();
        assert_eq!(reply.message, "lovely to meet you");
        assert_eq!(reply.score, 4);

        let identity = reply.session_info.user_id.clone();
        let entries = chat.ledger.entries_for(&identity).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert!(!entries[0].is_open());
        assert_eq!(entries[0].host_response.as_deref(), Some("lovely to meet you"));
        assert_eq!(chat.ledger.score_of(&identity).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn repeated_messages_reuse_the_session_and_accumulate() {
        let (_dir, chat) = chat_with(Some(("noted", Some(3))));

        let first = chat.handle(request("one", "ext-2")).await.unwrap();
        let second = chat.handle(request("two", "ext-2")).await.unwrap();

        assert_eq!(first.session_info.user_id, second.session_info.user_id);
        assert_eq!(first.session_info.room_id, second.session_info.room_id);
        assert_eq!(
            chat.ledger
                .score_of(&first.session_info.user_id)
                .await
                .unwrap(),
            6
        );
    }

    #[tokio::test]
    async fn missing_score_defaults_to_zero() {
        let (_dir, chat) = chat_with(Some(("unscored reply", None)));
        let reply = chat.handle(request("hi", "ext-3")).await.unwrap();
        assert_eq!(reply.score, 0);
    }

    #[tokio::test]
    async fn empty_message_is_a_validation_error() {
        let (_dir, chat) = chat_with(Some(("x", None)));
        let err = chat.handle(request("   ", "ext-4")).await.unwrap_err();
        assert!(matches!(err, GameError::Validation { .. }));
    }

    #[tokio::test]
    async fn missing_user_id_is_a_validation_error() {
        let (_dir, chat) = chat_with(Some(("x", None)));
        let err = chat.handle(request("hello", "")).await.unwrap_err();
        assert!(matches!(err, GameError::Validation { .. }));
    }

    #[tokio::test]
    async fn silent_host_is_a_gateway_error_with_entry_left_open() {
        let (_dir, chat) = chat_with(None);
        let err = chat.handle(request("hello", "ext-5")).await.unwrap_err();
        assert!(matches!(err, GameError::Gateway { .. }));

        // The turn was recorded before the host call, so it stays open and
        // unscored.
        let session = chat.sessions.get_or_create("ext-5", None).await.unwrap();
        let open = chat
            .ledger
            .latest_open_entry(&session.identity_id)
            .await
            .unwrap();
        assert!(open.is_some());
        assert_eq!(chat.ledger.score_of(&session.identity_id).await.unwrap(), 0);
    }
}
