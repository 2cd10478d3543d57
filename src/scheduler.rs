//! Round-table scheduler.
//!
//! The continuous loop that drives the show: each round the host opens a
//! topic, every contestant answers in roster order, and the host privately
//! replies to (and scores) each answer. Every exchange is persisted through
//! the conversation ledger before and after the host call, so a crash can
//! lose at most the reply of the turn in flight.
//!
//! The loop never terminates on its own. Failures at the round boundary are
//! logged and followed by a cooldown that doubles per consecutive failure up
//! to a ceiling; any successful round resets it.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::AgentProfile;
use crate::errors::GameError;
use crate::gateway::MessageGateway;
use crate::ledger::SqliteLedger;

/// Prompt that asks the host to originate a round topic.
pub const OPEN_TOPIC_PROMPT: &str =
    "Start a group discussion with a thought-provoking dating or relationship question";

/// Cooldown after a failed round.
const COOLDOWN_BASE: Duration = Duration::from_secs(25);
/// Cooldown ceiling under sustained failure.
const COOLDOWN_CAP: Duration = Duration::from_secs(240);

fn response_prompt(topic: &str) -> String {
    format!("[Respond to the host's question: {}]", topic)
}

fn next_cooldown(current: Duration) -> Duration {
    (current * 2).min(COOLDOWN_CAP)
}

/// Delays between gateway calls within a round.
#[derive(Debug, Clone)]
pub struct Pacing {
    /// Sleep after a completed contestant turn.
    pub reply_delay: Duration,
    /// Gap between consecutive contestants.
    pub turn_gap: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_secs(5),
            turn_gap: Duration::from_secs(1),
        }
    }
}

/// Liveness signal for external health checks: the wall-clock time of the
/// last round that completed without a round-level error.
#[derive(Debug, Default)]
pub struct Liveness {
    last_round: RwLock<Option<DateTime<Utc>>>,
}

impl Liveness {
    pub fn new() -> Self {
        Self::default()
    }

    fn mark(&self) {
        *self.last_round.write() = Some(Utc::now());
    }

    pub fn last_successful_round(&self) -> Option<DateTime<Utc>> {
        *self.last_round.read()
    }
}

/// What a single round accomplished.
#[derive(Debug, Clone)]
pub struct RoundOutcome {
    /// The topic the host opened with; `None` when the host stayed silent and
    /// the round was skipped.
    pub topic: Option<String>,
    pub completed_turns: usize,
    pub failed_turns: usize,
}

/// The round-table coordinator.
pub struct RoundTable {
    gateway: Arc<dyn MessageGateway>,
    ledger: Arc<SqliteLedger>,
    host: AgentProfile,
    contestants: Vec<AgentProfile>,
    room_id: String,
    default_interval: Duration,
    pacing: Pacing,
    liveness: Arc<Liveness>,
}

impl RoundTable {
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        ledger: Arc<SqliteLedger>,
        host: AgentProfile,
        contestants: Vec<AgentProfile>,
        room_id: impl Into<String>,
        default_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            ledger,
            host,
            contestants,
            room_id: room_id.into(),
            default_interval,
            pacing: Pacing::default(),
            liveness: Arc::new(Liveness::new()),
        }
    }

    /// Override the in-round delays (used by tests and load rigs).
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Shared handle to the liveness clock.
    pub fn liveness(&self) -> Arc<Liveness> {
        Arc::clone(&self.liveness)
    }

    /// Run rounds until process termination. Never returns.
    pub async fn run_forever(&self) {
        let mut cooldown = COOLDOWN_BASE;
        loop {
            match self.run_round().await {
                Ok(outcome) => {
                    cooldown = COOLDOWN_BASE;
                    self.liveness.mark();
                    log::info!(
                        "round complete: topic={:?} completed={} failed={}",
                        outcome.topic,
                        outcome.completed_turns,
                        outcome.failed_turns
                    );
                    let pause = self.pause_interval().await;
                    log::info!("next round in {:?}", pause);
                    tokio::time::sleep(pause).await;
                }
                Err(e) => {
                    log::warn!("round failed: {}; cooling down for {:?}", e, cooldown);
                    tokio::time::sleep(cooldown).await;
                    cooldown = next_cooldown(cooldown);
                }
            }
        }
    }

    /// Execute one full round: topic, then one turn per contestant.
    pub async fn run_round(&self) -> Result<RoundOutcome, GameError> {
        let opening = self
            .gateway
            .send_message(
                &self.host.id,
                OPEN_TOPIC_PROMPT,
                &self.host.id,
                &self.host.name,
                &self.room_id,
            )
            .await?;

        let Some(first) = opening.first() else {
            log::warn!("host produced no topic; skipping round");
            return Ok(RoundOutcome {
                topic: None,
                completed_turns: 0,
                failed_turns: 0,
            });
        };
        let topic = first.text.clone();
        self.ledger
            .record_topic(&self.host.id, &topic, &self.room_id)
            .await?;
        log::info!("{} opens the round: {}", self.host.name, topic);

        let mut completed = 0;
        let mut failed = 0;
        for contestant in &self.contestants {
            if self.contestant_turn(contestant, &topic).await? {
                completed += 1;
                tokio::time::sleep(self.pacing.reply_delay).await;
            } else {
                failed += 1;
            }
            tokio::time::sleep(self.pacing.turn_gap).await;
        }

        Ok(RoundOutcome {
            topic: Some(topic),
            completed_turns: completed,
            failed_turns: failed,
        })
    }

    /// One contestant's turn plus the host's private scored reply.
    ///
    /// Gateway failures mark the turn failed and let the round advance;
    /// ledger failures propagate to the round boundary.
    async fn contestant_turn(
        &self,
        contestant: &AgentProfile,
        topic: &str,
    ) -> Result<bool, GameError> {
        let prompt = response_prompt(topic);
        let replies = match self
            .gateway
            .send_message(
                &contestant.id,
                &prompt,
                &contestant.id,
                &contestant.name,
                &self.room_id,
            )
            .await
        {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!("turn failed for {}: {}", contestant.name, e);
                return Ok(false);
            }
        };
        let Some(answer) = replies.last() else {
            log::warn!("{} gave no answer; skipping turn", contestant.name);
            return Ok(false);
        };

        self.ledger
            .record_contestant_turn(&contestant.id, &answer.text, &self.room_id, Some(topic))
            .await?;

        let host_replies = match self
            .gateway
            .send_message(
                &self.host.id,
                &answer.text,
                &contestant.id,
                &contestant.name,
                &self.room_id,
            )
            .await
        {
            Ok(replies) => replies,
            Err(e) => {
                log::warn!(
                    "host reply failed for {}; entry stays open: {}",
                    contestant.name,
                    e
                );
                return Ok(false);
            }
        };
        let Some(reply) = host_replies.last() else {
            log::warn!("host had no reply for {}; entry stays open", contestant.name);
            return Ok(false);
        };

        let score = reply.score.unwrap_or(0);
        self.ledger
            .record_host_reply(&contestant.id, &reply.text, score, Some(topic))
            .await?;
        log::info!("{} scored {} for {}", self.host.name, score, contestant.name);
        Ok(true)
    }

    /// Inter-round pause: the configured interval, or the default when no
    /// config row exists or the read fails.
    async fn pause_interval(&self) -> Duration {
        match self.ledger.game_config().await {
            Ok(Some(config)) => Duration::from_secs(config.round_interval_secs),
            Ok(None) => self.default_interval,
            Err(e) => {
                log::warn!("failed to read game config: {}", e);
                self.default_interval
            }
        }
    }
}
