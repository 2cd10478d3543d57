//! Conversation ledger over SQLite.
//!
//! Implements the append/update discipline of the game: conversation entries
//! are inserted open (no host response) and closed exactly once; score
//! accumulation is an additive upsert so repeated replies add rather than
//! overwrite. The close step is a single conditional UPDATE whose row
//! selection happens inside the statement, so a concurrent external chat and
//! round turn cannot close each other's entry.
//!
//! rusqlite is synchronous; every public method wraps the blocking work in a
//! tokio blocking task.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::errors::GameError;
use crate::gateway::PersonaDescription;

/// One exchange in the transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationEntry {
    pub id: i64,
    pub agent_id: String,
    pub contestant_message: String,
    pub contestant_message_time: DateTime<Utc>,
    pub host_response: Option<String>,
    pub host_response_time: Option<DateTime<Utc>>,
    pub interaction_score: Option<i64>,
    pub room_id: String,
    pub question: Option<String>,
}

impl ConversationEntry {
    /// An entry is open until the host's reply has been recorded.
    pub fn is_open(&self) -> bool {
        self.host_response.is_none()
    }
}

/// Asset metadata carried on an account row.
#[derive(Debug, Clone, Default)]
pub struct AssetMetadata {
    pub ip_id: Option<String>,
    pub wallet_address: Option<String>,
    pub license_term_id: Option<String>,
    pub registration_tx: Option<String>,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
}

/// Singleton game pacing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    pub round_interval_secs: u64,
    pub game_start: Option<DateTime<Utc>>,
    pub game_end: Option<DateTime<Utc>>,
}

/// Persisted cursor for the game-end derivation sequence.
///
/// Each field is written as soon as the corresponding external step succeeds,
/// so a crash mid-sequence resumes from the first `None` instead of repeating
/// irreversible registrations.
#[derive(Debug, Clone)]
pub struct DerivationState {
    pub winner_id: String,
    pub persona: PersonaDescription,
    pub derived_identity_id: Option<String>,
    pub registration_tx: Option<String>,
    pub host_license_id: Option<String>,
    pub winner_license_id: Option<String>,
    pub confirmation: Option<String>,
    pub completed: bool,
}

impl DerivationState {
    pub fn new(winner_id: impl Into<String>, persona: PersonaDescription) -> Self {
        Self {
            winner_id: winner_id.into(),
            persona,
            derived_identity_id: None,
            registration_tx: None,
            host_license_id: None,
            winner_license_id: None,
            confirmation: None,
            completed: false,
        }
    }
}

/// One line of a grouped transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMessage {
    pub name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Display profile attached to a transcript group.
#[derive(Debug, Clone, Serialize)]
pub struct ContestantProfile {
    pub name: String,
    pub avatar_url: Option<String>,
    pub description: Option<String>,
}

/// Per-identity view returned by the status query: cumulative score,
/// interleaved transcript, and the distinct topics raised.
#[derive(Debug, Clone, Serialize)]
pub struct ContestantTranscript {
    pub agent_id: String,
    pub name: String,
    pub score: i64,
    pub profile: ContestantProfile,
    pub messages: Vec<TranscriptMessage>,
    pub topics: Vec<String>,
}

fn fmt_time(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, GameError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| GameError::Persistence {
            message: format!("invalid stored timestamp {:?}: {}", s, e),
        })
}

fn parse_time_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, GameError> {
    s.as_deref().map(parse_time).transpose()
}

/// SQLite-backed ledger store.
///
/// Holds only the database path; a connection is opened per operation.
pub struct SqliteLedger {
    pub db_path: PathBuf,
}

impl SqliteLedger {
    /// Open (and if necessary create) the ledger at `db_path`.
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, GameError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| GameError::Persistence {
                message: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        let ledger = Self { db_path };
        ledger.initialize_db()?;
        Ok(ledger)
    }

    /// Create the game tables.
    fn initialize_db(&self) -> Result<(), GameError> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                username TEXT,
                email TEXT,
                created_at TEXT NOT NULL,
                ip_id TEXT,
                wallet_address TEXT,
                license_term_id TEXT,
                registration_tx TEXT,
                avatar_url TEXT,
                description TEXT
            );
            CREATE TABLE IF NOT EXISTS conversation_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                agent_id TEXT NOT NULL,
                contestant_message TEXT NOT NULL,
                contestant_message_time TEXT NOT NULL,
                host_response TEXT,
                host_response_time TEXT,
                interaction_score INTEGER,
                room_id TEXT NOT NULL,
                question TEXT
            );
            CREATE TABLE IF NOT EXISTS contestant_scores (
                agent_id TEXT PRIMARY KEY,
                score INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS game_config (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                round_interval_secs INTEGER NOT NULL,
                game_start TEXT,
                game_end TEXT
            );
            CREATE TABLE IF NOT EXISTS derivation_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                winner_id TEXT NOT NULL,
                persona TEXT NOT NULL,
                derived_identity_id TEXT,
                registration_tx TEXT,
                host_license_id TEXT,
                winner_license_id TEXT,
                confirmation TEXT,
                completed INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Run a closure against a fresh connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, GameError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, GameError> + Send + 'static,
    {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            f(&conn)
        })
        .await?
    }

    // -----------------------------------------------------------------------
    // Accounts
    // -----------------------------------------------------------------------

    /// Insert or refresh a lightweight account record.
    pub async fn upsert_account(
        &self,
        id: &str,
        name: &str,
        username: &str,
        email: &str,
    ) -> Result<(), GameError> {
        let (id, name, username, email) = (
            id.to_string(),
            name.to_string(),
            username.to_string(),
            email.to_string(),
        );
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO accounts (id, name, username, email, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE
                 SET name = excluded.name, username = excluded.username",
                params![id, name, username, email, fmt_time(Utc::now())],
            )?;
            Ok(())
        })
        .await
    }

    /// Attach registration/wallet metadata to an existing account row.
    pub async fn save_asset_metadata(
        &self,
        id: &str,
        metadata: &AssetMetadata,
    ) -> Result<(), GameError> {
        let id = id.to_string();
        let metadata = metadata.clone();
        self.with_conn(move |conn| {
            let affected = conn.execute(
                "UPDATE accounts
                 SET ip_id = ?2,
                     wallet_address = ?3,
                     license_term_id = ?4,
                     registration_tx = ?5,
                     avatar_url = COALESCE(?6, avatar_url),
                     description = COALESCE(?7, description)
                 WHERE id = ?1",
                params![
                    id,
                    metadata.ip_id,
                    metadata.wallet_address,
                    metadata.license_term_id,
                    metadata.registration_tx,
                    metadata.avatar_url,
                    metadata.description,
                ],
            )?;
            if affected == 0 {
                return Err(GameError::NotFound {
                    message: format!("no account row for {}", id),
                });
            }
            Ok(())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Conversation entries
    // -----------------------------------------------------------------------

    /// Insert a new open conversation entry and return its id.
    ///
    /// Never merges with a prior open entry for the same identity; if one
    /// exists it stays open and this insert is a distinct row.
    pub async fn record_contestant_turn(
        &self,
        agent_id: &str,
        message: &str,
        room_id: &str,
        question: Option<&str>,
    ) -> Result<i64, GameError> {
        let (agent_id, message, room_id) =
            (agent_id.to_string(), message.to_string(), room_id.to_string());
        let question = question.map(str::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO conversation_logs
                     (agent_id, contestant_message, contestant_message_time, room_id, question)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![agent_id, message, fmt_time(Utc::now()), room_id, question],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
    }

    /// Record the host's reply for an identity: apply the score, then close
    /// that identity's most recent open entry.
    ///
    /// The score is applied unconditionally; when no open entry exists the
    /// close is a no-op and the reply is absent from the transcript. This
    /// asymmetry is intentional and logged.
    pub async fn record_host_reply(
        &self,
        agent_id: &str,
        reply: &str,
        score: i64,
        question: Option<&str>,
    ) -> Result<(), GameError> {
        let (agent_id, reply) = (agent_id.to_string(), reply.to_string());
        let question = question.map(str::to_string);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO contestant_scores (agent_id, score) VALUES (?1, ?2)
                 ON CONFLICT(agent_id) DO UPDATE SET score = score + excluded.score",
                params![agent_id, score],
            )?;

            let closed = conn.execute(
                "UPDATE conversation_logs
                 SET host_response = ?2,
                     host_response_time = ?3,
                     interaction_score = ?4,
                     question = COALESCE(?5, question)
                 WHERE id = (
                     SELECT id FROM conversation_logs
                     WHERE agent_id = ?1 AND host_response IS NULL
                     ORDER BY contestant_message_time DESC, id DESC
                     LIMIT 1
                 )",
                params![agent_id, reply, fmt_time(Utc::now()), score, question],
            )?;
            if closed == 0 {
                log::warn!(
                    "host reply for {} had no open entry; score recorded without transcript update",
                    agent_id
                );
            }
            Ok(())
        })
        .await
    }

    /// Persist the round-framing row: the host's topic as an entry that is
    /// already closed (message and response are the topic itself, score 0).
    pub async fn record_topic(
        &self,
        host_id: &str,
        topic: &str,
        room_id: &str,
    ) -> Result<(), GameError> {
        let (host_id, topic, room_id) =
            (host_id.to_string(), topic.to_string(), room_id.to_string());
        self.with_conn(move |conn| {
            let now = fmt_time(Utc::now());
            conn.execute(
                "INSERT INTO conversation_logs
                     (agent_id, contestant_message, contestant_message_time,
                      host_response, host_response_time, interaction_score, room_id, question)
                 VALUES (?1, ?2, ?3, ?2, ?3, 0, ?4, ?2)",
                params![host_id, topic, now, room_id],
            )?;
            Ok(())
        })
        .await
    }

    fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEntry> {
        Ok(RawEntry {
            id: row.get(0)?,
            agent_id: row.get(1)?,
            contestant_message: row.get(2)?,
            contestant_message_time: row.get(3)?,
            host_response: row.get(4)?,
            host_response_time: row.get(5)?,
            interaction_score: row.get(6)?,
            room_id: row.get(7)?,
            question: row.get(8)?,
        })
    }

    /// The most recent open entry for an identity, if any.
    pub async fn latest_open_entry(
        &self,
        agent_id: &str,
    ) -> Result<Option<ConversationEntry>, GameError> {
        let agent_id = agent_id.to_string();
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT id, agent_id, contestant_message, contestant_message_time,
                            host_response, host_response_time, interaction_score, room_id, question
                     FROM conversation_logs
                     WHERE agent_id = ?1 AND host_response IS NULL
                     ORDER BY contestant_message_time DESC, id DESC
                     LIMIT 1",
                    params![agent_id],
                    Self::entry_from_row,
                )
                .optional()?;
            raw.map(RawEntry::into_entry).transpose()
        })
        .await
    }

    /// All entries for an identity in chronological order.
    pub async fn entries_for(&self, agent_id: &str) -> Result<Vec<ConversationEntry>, GameError> {
        let agent_id = agent_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, agent_id, contestant_message, contestant_message_time,
                        host_response, host_response_time, interaction_score, room_id, question
                 FROM conversation_logs
                 WHERE agent_id = ?1
                 ORDER BY contestant_message_time ASC, id ASC",
            )?;
            let rows = stmt.query_map(params![agent_id], Self::entry_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?.into_entry()?);
            }
            Ok(entries)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Scores
    // -----------------------------------------------------------------------

    /// Cumulative score for an identity (0 if never scored).
    pub async fn score_of(&self, agent_id: &str) -> Result<i64, GameError> {
        let agent_id = agent_id.to_string();
        self.with_conn(move |conn| {
            let score = conn
                .query_row(
                    "SELECT score FROM contestant_scores WHERE agent_id = ?1",
                    params![agent_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(score.unwrap_or(0))
        })
        .await
    }

    /// The single highest-scoring identity, ties broken by id for determinism.
    pub async fn top_scorer(&self) -> Result<Option<(String, i64)>, GameError> {
        self.with_conn(move |conn| {
            let top = conn
                .query_row(
                    "SELECT agent_id, score FROM contestant_scores
                     ORDER BY score DESC, agent_id ASC
                     LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(top)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Status query
    // -----------------------------------------------------------------------

    /// Grouped transcript/score view over a time window.
    ///
    /// Identities are grouped (not globally time-ordered); within each group
    /// messages interleave contestant line then host line, ascending by
    /// contestant-message time. `host_name` labels the host lines.
    pub async fn chat_data(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name_filter: Option<&str>,
        host_name: &str,
    ) -> Result<Vec<ContestantTranscript>, GameError> {
        let name_filter = name_filter.map(str::to_string);
        let host_name = host_name.to_string();
        self.with_conn(move |conn| {
            let sql = format!(
                "SELECT cs.agent_id, cs.score,
                        cl.contestant_message, cl.host_response,
                        cl.contestant_message_time, cl.host_response_time,
                        cl.question,
                        a.name, a.username, a.avatar_url, a.description
                 FROM contestant_scores cs
                 LEFT JOIN conversation_logs cl ON cs.agent_id = cl.agent_id
                 LEFT JOIN accounts a ON cs.agent_id = a.id
                 WHERE cl.contestant_message_time >= ?1
                   AND cl.contestant_message_time <= ?2
                   {}
                 ORDER BY cs.agent_id, cl.contestant_message_time ASC, cl.id ASC",
                if name_filter.is_some() { "AND a.name = ?3" } else { "" }
            );
            let mut stmt = conn.prepare(&sql)?;

            let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<ChatDataRow> {
                Ok(ChatDataRow {
                    agent_id: row.get(0)?,
                    score: row.get(1)?,
                    contestant_message: row.get(2)?,
                    host_response: row.get(3)?,
                    contestant_message_time: row.get(4)?,
                    host_response_time: row.get(5)?,
                    question: row.get(6)?,
                    name: row.get(7)?,
                    username: row.get(8)?,
                    avatar_url: row.get(9)?,
                    description: row.get(10)?,
                })
            };

            let start_s = fmt_time(start);
            let end_s = fmt_time(end);
            let rows: Vec<ChatDataRow> = match &name_filter {
                Some(name) => stmt
                    .query_map(params![start_s, end_s, name], map_row)?
                    .collect::<rusqlite::Result<_>>()?,
                None => stmt
                    .query_map(params![start_s, end_s], map_row)?
                    .collect::<rusqlite::Result<_>>()?,
            };

            let mut groups: Vec<ContestantTranscript> = Vec::new();
            for row in rows {
                let index = match groups.iter().position(|g| g.agent_id == row.agent_id) {
                    Some(i) => i,
                    None => {
                        let display = row
                            .username
                            .clone()
                            .or_else(|| row.name.clone())
                            .unwrap_or_else(|| row.agent_id.clone());
                        groups.push(ContestantTranscript {
                            agent_id: row.agent_id.clone(),
                            name: display.clone(),
                            score: row.score,
                            profile: ContestantProfile {
                                name: row.name.clone().unwrap_or(display),
                                avatar_url: row.avatar_url.clone(),
                                description: row.description.clone(),
                            },
                            messages: Vec::new(),
                            topics: Vec::new(),
                        });
                        groups.len() - 1
                    }
                };
                let group = &mut groups[index];

                group.messages.push(TranscriptMessage {
                    name: group.name.clone(),
                    content: row.contestant_message,
                    created_at: parse_time(&row.contestant_message_time)?,
                });
                if let Some(reply) = row.host_response {
                    let at = match row.host_response_time {
                        Some(t) => parse_time(&t)?,
                        None => parse_time(&row.contestant_message_time)?,
                    };
                    group.messages.push(TranscriptMessage {
                        name: host_name.clone(),
                        content: reply,
                        created_at: at,
                    });
                }
                if let Some(topic) = row.question {
                    if !group.topics.contains(&topic) {
                        group.topics.push(topic);
                    }
                }
            }
            Ok(groups)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Game config
    // -----------------------------------------------------------------------

    pub async fn upsert_game_config(&self, config: &GameConfig) -> Result<(), GameError> {
        let config = config.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO game_config (id, round_interval_secs, game_start, game_end)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE
                 SET round_interval_secs = excluded.round_interval_secs,
                     game_start = excluded.game_start,
                     game_end = excluded.game_end",
                params![
                    config.round_interval_secs as i64,
                    config.game_start.map(fmt_time),
                    config.game_end.map(fmt_time),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn game_config(&self) -> Result<Option<GameConfig>, GameError> {
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT round_interval_secs, game_start, game_end FROM game_config WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;
            raw.map(|(interval, start, end)| {
                Ok(GameConfig {
                    round_interval_secs: interval.max(0) as u64,
                    game_start: parse_time_opt(start)?,
                    game_end: parse_time_opt(end)?,
                })
            })
            .transpose()
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Derivation saga state
    // -----------------------------------------------------------------------

    pub async fn save_derivation(&self, state: &DerivationState) -> Result<(), GameError> {
        let persona_json =
            serde_json::to_string(&state.persona).map_err(|e| GameError::Persistence {
                message: format!("failed to serialize persona: {}", e),
            })?;
        let state = state.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO derivation_state
                     (id, winner_id, persona, derived_identity_id, registration_tx,
                      host_license_id, winner_license_id, confirmation, completed, updated_at)
                 VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE
                 SET winner_id = excluded.winner_id,
                     persona = excluded.persona,
                     derived_identity_id = excluded.derived_identity_id,
                     registration_tx = excluded.registration_tx,
                     host_license_id = excluded.host_license_id,
                     winner_license_id = excluded.winner_license_id,
                     confirmation = excluded.confirmation,
                     completed = excluded.completed,
                     updated_at = excluded.updated_at",
                params![
                    state.winner_id,
                    persona_json,
                    state.derived_identity_id,
                    state.registration_tx,
                    state.host_license_id,
                    state.winner_license_id,
                    state.confirmation,
                    state.completed as i64,
                    fmt_time(Utc::now()),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn load_derivation(&self) -> Result<Option<DerivationState>, GameError> {
        self.with_conn(move |conn| {
            let raw = conn
                .query_row(
                    "SELECT winner_id, persona, derived_identity_id, registration_tx,
                            host_license_id, winner_license_id, confirmation, completed
                     FROM derivation_state WHERE id = 1",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, Option<String>>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, Option<String>>(6)?,
                            row.get::<_, i64>(7)?,
                        ))
                    },
                )
                .optional()?;
            raw.map(
                |(winner_id, persona, derived, tx, host_lic, winner_lic, confirmation, done)| {
                    let persona: PersonaDescription = serde_json::from_str(&persona)
                        .map_err(|e| GameError::Persistence {
                            message: format!("invalid stored persona: {}", e),
                        })?;
                    Ok(DerivationState {
                        winner_id,
                        persona,
                        derived_identity_id: derived,
                        registration_tx: tx,
                        host_license_id: host_lic,
                        winner_license_id: winner_lic,
                        confirmation,
                        completed: done != 0,
                    })
                },
            )
            .transpose()
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Reset
    // -----------------------------------------------------------------------

    /// Wipe all game state: transcripts, scores, config, and the derivation
    /// cursor. Account rows survive; they are re-seeded at startup.
    pub async fn truncate_game_state(&self) -> Result<(), GameError> {
        self.with_conn(move |conn| {
            conn.execute_batch(
                "DELETE FROM conversation_logs;
                 DELETE FROM contestant_scores;
                 DELETE FROM game_config;
                 DELETE FROM derivation_state;",
            )?;
            Ok(())
        })
        .await
    }
}

/// Row as stored, timestamps still text.
struct RawEntry {
    id: i64,
    agent_id: String,
    contestant_message: String,
    contestant_message_time: String,
    host_response: Option<String>,
    host_response_time: Option<String>,
    interaction_score: Option<i64>,
    room_id: String,
    question: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> Result<ConversationEntry, GameError> {
        Ok(ConversationEntry {
            id: self.id,
            agent_id: self.agent_id,
            contestant_message: self.contestant_message,
            contestant_message_time: parse_time(&self.contestant_message_time)?,
            host_response: self.host_response,
            host_response_time: parse_time_opt(self.host_response_time)?,
            interaction_score: self.interaction_score,
            room_id: self.room_id,
            question: self.question,
        })
    }
}

struct ChatDataRow {
    agent_id: String,
    score: i64,
    contestant_message: String,
    host_response: Option<String>,
    contestant_message_time: String,
    host_response_time: Option<String>,
    question: Option<String>,
    name: Option<String>,
    username: Option<String>,
    avatar_url: Option<String>,
    description: Option<String>,
}
