//! Agent message gateway — HTTP access to the opaque agent response service.
//!
//! Every agent (host and contestants alike) is addressable at
//! `POST {base}/{agent_id}/message`; the body carries the text plus the
//! sender's identity and room, and the response is an ordered array of
//! `{text, score?}` messages. The last element is the reply of record.
//!
//! The gateway also exposes the child-generation capability used at game end:
//! `POST {base}/{agent_id}/generate-child` asks the agent to produce a new
//! persona description derived from itself.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::GameError;

/// One message produced by an agent in response to a send.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentReply {
    /// The message text.
    pub text: String,
    /// Private score attached by the host when replying to a contestant.
    #[serde(default)]
    pub score: Option<i64>,
}

/// A generated persona description for the derived identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDescription {
    /// Name of the new character.
    pub name: String,
    /// System/character description.
    pub system: String,
    /// Optional portrait URL.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Opaque capability that turns a message into an agent's replies.
#[async_trait]
pub trait MessageGateway: Send + Sync {
    /// Send `text` to the agent identified by `agent_id`, speaking as
    /// `user_id`/`user_name` inside `room_id`. Returns the ordered reply
    /// sequence, which may be empty if the agent chose not to answer.
    async fn send_message(
        &self,
        agent_id: &str,
        text: &str,
        user_id: &str,
        user_name: &str,
        room_id: &str,
    ) -> Result<Vec<AgentReply>, GameError>;

    /// Ask the agent to generate a derived persona description.
    async fn generate_persona(&self, agent_id: &str) -> Result<PersonaDescription, GameError>;
}

/// Production gateway speaking HTTP/JSON to the agent service.
pub struct HttpMessageGateway {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundMessage<'a> {
    text: &'a str,
    user_id: &'a str,
    user_name: &'a str,
    room_id: &'a str,
}

impl HttpMessageGateway {
    /// Create a gateway against the given base URL (no trailing slash).
    ///
    /// No request timeout is set: agent generation latency is unbounded and
    /// the scheduler paces itself, so the connection-level defaults apply.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl MessageGateway for HttpMessageGateway {
    async fn send_message(
        &self,
        agent_id: &str,
        text: &str,
        user_id: &str,
        user_name: &str,
        room_id: &str,
    ) -> Result<Vec<AgentReply>, GameError> {
        let url = format!("{}/{}/message", self.base_url, agent_id);
        let response = self
            .client
            .post(&url)
            .json(&OutboundMessage {
                text,
                user_id,
                user_name,
                room_id,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GameError::Gateway {
                message: format!("agent {} returned HTTP {}", agent_id, response.status()),
            });
        }

        let replies: Vec<AgentReply> = response.json().await?;
        Ok(replies)
    }

    async fn generate_persona(&self, agent_id: &str) -> Result<PersonaDescription, GameError> {
        let url = format!("{}/{}/generate-child", self.base_url, agent_id);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GameError::Gateway {
                message: format!(
                    "child generation for {} returned HTTP {}",
                    agent_id,
                    response.status()
                ),
            });
        }

        let persona: PersonaDescription = response.json().await?;
        Ok(persona)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_score_is_optional_on_the_wire() {
        let replies: Vec<AgentReply> = serde_json::from_str(
            r#"[{"text": "hello"}, {"text": "I love hiking", "score": 7}]"#,
        )
        .unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].score, None);
        assert_eq!(replies[1].score, Some(7));
    }

    #[test]
    fn outbound_message_uses_camel_case_fields() {
        let body = serde_json::to_value(OutboundMessage {
            text: "hi",
            user_id: "u1",
            user_name: "User One",
            room_id: "r1",
        })
        .unwrap();
        assert_eq!(body["userId"], "u1");
        assert_eq!(body["userName"], "User One");
        assert_eq!(body["roomId"], "r1");
    }
}
