//! # Roundtable
//!
//! Orchestration core for a multi-agent, turn-based dating-show game: one
//! host agent conducts rounds of conversation with a fixed roster of
//! contestant agents, privately scores every reply, accumulates scores in an
//! append-only conversation ledger, and at game end mints a derived identity
//! jointly licensed by the host and the winning contestant.
//!
//! The language-model side of each agent is an external HTTP service (the
//! message gateway); the registration network is another (the asset
//! registry). Everything in between lives here: scheduling, sessions, the
//! ledger, and the derivation protocol.

pub mod chat;
pub mod config;
pub mod errors;
pub mod game;
pub mod gateway;
pub mod ledger;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;

pub use chat::ExternalChat;
pub use config::Settings;
pub use errors::GameError;
pub use game::GameEndSequencer;
pub use gateway::HttpMessageGateway;
pub use ledger::SqliteLedger;
pub use registry::HttpAssetRegistry;
pub use scheduler::RoundTable;
pub use session::SessionBridge;

/// Service version reported by the health endpoint.
pub const VERSION: &str = "0.3.1";
