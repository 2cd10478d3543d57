//! HTTP server for the round-table service.
//!
//! Exposes the scoring pipeline to the outside: external chat, transcript
//! queries, and the administrative game operations.
//!
//! # Endpoints
//!
//! - `GET  /health`           — Liveness probe (includes last successful round)
//! - `GET  /api/chat-data`    — Transcript and score query
//! - `POST /api/chat`         — External chat with the host
//! - `GET  /api/game/config`  — Current pacing configuration
//! - `POST /api/game/config`  — Set pacing configuration
//! - `POST /api/game/end`     — Run the derivation protocol (bearer auth)
//! - `POST /api/game/reset`   — Wipe all game state

pub mod routes;

pub use routes::{app_router, AppState};
