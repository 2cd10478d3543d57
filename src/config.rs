//! Environment-driven service configuration.
//!
//! The roster (one host plus N contestants), gateway endpoints, wallet
//! credentials, and pacing defaults all come from environment variables so the
//! same binary can run any cast. Contestants are declared in numbered blocks
//! (`CONTESTANT1_ID`, `CONTESTANT1_NAME`, ...); enumeration stops at the first
//! missing block.
//!
//! # Environment Variables
//!
//! - `API_PORT`              — HTTP port (default: 8080)
//! - `DATABASE_PATH`         — SQLite ledger path (default: data/roundtable.db)
//! - `GATEWAY_URL`           — agent message gateway base URL (default: http://localhost:3000)
//! - `REGISTRY_URL`          — asset registration gateway base URL (default: http://localhost:3100)
//! - `GAME_END_SECRET`       — bearer credential for the game-end operation (required)
//! - `ROUND_INTERVAL_SECS`   — default pause between rounds (default: 5)
//! - `HOST_ID` / `HOST_NAME` / `HOST_IP_ID` / `HOST_WALLET_KEY` / `HOST_AVATAR_URL`
//! - `CONTESTANT{n}_ID` / `_NAME` / `_IP_ID` / `_WALLET_KEY` / `_AVATAR_URL` / `_DESCRIPTION`
//! - `DERIVED_WALLET_ADDRESS` / `DERIVED_WALLET_KEY` — wallet for the derived identity

use std::path::PathBuf;

use crate::errors::GameError;

/// One agent in the cast: the host or a contestant.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    /// Stable agent identifier (uuid text) used by the message gateway.
    pub id: String,
    /// Display name shown in transcripts.
    pub name: String,
    /// Registered identity id on the asset registry, if this agent has one.
    pub ip_id: Option<String>,
    /// Private credential used when this agent issues a license.
    pub wallet_key: Option<String>,
    /// Profile picture URL.
    pub avatar_url: Option<String>,
    /// Short profile description.
    pub description: Option<String>,
}

/// Full service settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_port: u16,
    pub database_path: PathBuf,
    pub gateway_url: String,
    pub registry_url: String,
    /// Shared-secret bearer credential for `POST /api/game/end`.
    pub game_end_secret: String,
    /// Default pause between rounds when no game-config row exists.
    pub round_interval_secs: u64,
    pub host: AgentProfile,
    pub contestants: Vec<AgentProfile>,
    /// Wallet address recorded on the derived identity's account row.
    pub derived_wallet_address: Option<String>,
    /// Credential used for the derivative-registration call.
    pub derived_wallet_key: Option<String>,
}

impl Settings {
    /// Resolve settings from process environment variables.
    pub fn from_env() -> Result<Self, GameError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Result<Self, GameError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_port = match get("API_PORT") {
            Some(raw) => raw.parse::<u16>().map_err(|_| GameError::Validation {
                message: format!("API_PORT is not a valid port: {}", raw),
            })?,
            None => 8080,
        };

        let round_interval_secs = match get("ROUND_INTERVAL_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| GameError::Validation {
                message: format!("ROUND_INTERVAL_SECS is not a number: {}", raw),
            })?,
            None => 5,
        };

        let host = AgentProfile {
            id: get("HOST_ID").ok_or_else(|| GameError::Validation {
                message: "HOST_ID is required".to_string(),
            })?,
            name: get("HOST_NAME").unwrap_or_else(|| "Host".to_string()),
            ip_id: get("HOST_IP_ID"),
            wallet_key: get("HOST_WALLET_KEY"),
            avatar_url: get("HOST_AVATAR_URL"),
            description: get("HOST_DESCRIPTION"),
        };

        let mut contestants = Vec::new();
        for n in 1.. {
            let Some(id) = get(&format!("CONTESTANT{}_ID", n)) else {
                break;
            };
            contestants.push(AgentProfile {
                id,
                name: get(&format!("CONTESTANT{}_NAME", n))
                    .unwrap_or_else(|| format!("Contestant {}", n)),
                ip_id: get(&format!("CONTESTANT{}_IP_ID", n)),
                wallet_key: get(&format!("CONTESTANT{}_WALLET_KEY", n)),
                avatar_url: get(&format!("CONTESTANT{}_AVATAR_URL", n)),
                description: get(&format!("CONTESTANT{}_DESCRIPTION", n)),
            });
        }

        Ok(Self {
            api_port,
            database_path: get("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/roundtable.db")),
            gateway_url: get("GATEWAY_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            registry_url: get("REGISTRY_URL")
                .unwrap_or_else(|| "http://localhost:3100".to_string()),
            game_end_secret: get("GAME_END_SECRET").ok_or_else(|| GameError::Validation {
                message: "GAME_END_SECRET is required".to_string(),
            })?,
            round_interval_secs,
            host,
            contestants,
            derived_wallet_address: get("DERIVED_WALLET_ADDRESS"),
            derived_wallet_key: get("DERIVED_WALLET_KEY"),
        })
    }

    /// Look up a configured contestant by agent id.
    pub fn contestant(&self, agent_id: &str) -> Option<&AgentProfile> {
        self.contestants.iter().find(|c| c.id == agent_id)
    }
}
