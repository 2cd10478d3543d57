//! roundtable HTTP server binary.
//!
//! Starts the round-table loop and an axum HTTP server exposing the external
//! chat, transcript query, and game administration endpoints.
//!
//! # Environment Variables
//!
//! - `API_PORT`        — HTTP port (default: 8080)
//! - `DATABASE_PATH`   — SQLite ledger path (default: data/roundtable.db)
//! - `GATEWAY_URL`     — agent message gateway base URL
//! - `REGISTRY_URL`    — asset registration gateway base URL
//! - `GAME_END_SECRET` — bearer credential for POST /api/game/end (required)
//! - `HOST_*` / `CONTESTANT{n}_*` — cast roster (see `roundtable::config`)
//! - `RUST_LOG`        — Tracing filter (default: "info")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use std::sync::Arc;
use std::time::Duration;

use roundtable::chat::ExternalChat;
use roundtable::config::Settings;
use roundtable::game::GameEndSequencer;
use roundtable::gateway::{HttpMessageGateway, MessageGateway};
use roundtable::ledger::{AssetMetadata, SqliteLedger};
use roundtable::registry::{AssetRegistry, HttpAssetRegistry};
use roundtable::scheduler::RoundTable;
use roundtable::server::{app_router, AppState};
use roundtable::session::SessionBridge;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,roundtable=debug".into()),
        )
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let ledger = match SqliteLedger::new(&settings.database_path) {
        Ok(ledger) => Arc::new(ledger),
        Err(e) => {
            tracing::error!("failed to open ledger: {}", e);
            std::process::exit(1);
        }
    };

    // Seed account rows for the cast so status queries and the derivation
    // protocol resolve names and asset metadata.
    for agent in std::iter::once(&settings.host).chain(settings.contestants.iter()) {
        let seeded = async {
            ledger
                .upsert_account(
                    &agent.id,
                    &agent.name,
                    &agent.name,
                    &format!("{}@example.com", agent.id),
                )
                .await?;
            ledger
                .save_asset_metadata(
                    &agent.id,
                    &AssetMetadata {
                        ip_id: agent.ip_id.clone(),
                        wallet_address: None,
                        license_term_id: None,
                        registration_tx: None,
                        avatar_url: agent.avatar_url.clone(),
                        description: agent.description.clone(),
                    },
                )
                .await
        };
        if let Err(e) = seeded.await {
            tracing::error!("failed to seed account for {}: {}", agent.name, e);
            std::process::exit(1);
        }
        tracing::info!("seeded account for {}", agent.name);
    }

    let gateway: Arc<dyn MessageGateway> =
        Arc::new(HttpMessageGateway::new(settings.gateway_url.clone()));
    let registry: Arc<dyn AssetRegistry> =
        Arc::new(HttpAssetRegistry::new(settings.registry_url.clone()));
    let sessions = Arc::new(SessionBridge::new(Arc::clone(&ledger)));

    // One shared room for the whole game.
    let room_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        "round table room {} with host {} and {} contestants",
        room_id,
        settings.host.name,
        settings.contestants.len()
    );

    let round_table = RoundTable::new(
        Arc::clone(&gateway),
        Arc::clone(&ledger),
        settings.host.clone(),
        settings.contestants.clone(),
        room_id,
        Duration::from_secs(settings.round_interval_secs),
    );
    let liveness = round_table.liveness();
    tokio::spawn(async move {
        round_table.run_forever().await;
    });

    let state = AppState {
        chat: Arc::new(ExternalChat::new(
            Arc::clone(&gateway),
            Arc::clone(&ledger),
            sessions,
            settings.host.clone(),
        )),
        sequencer: Arc::new(GameEndSequencer::new(
            gateway,
            registry,
            Arc::clone(&ledger),
            Arc::clone(&settings),
        )),
        liveness,
        ledger,
        settings: Arc::clone(&settings),
    };

    let bind_addr = format!("0.0.0.0:{}", settings.api_port);
    let app = app_router(state);

    tracing::info!("roundtable server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health          — liveness probe");
    tracing::info!("  GET  /api/chat-data   — transcript and score query");
    tracing::info!("  POST /api/chat        — external chat with the host");
    tracing::info!("  POST /api/game/end    — derivation protocol (bearer auth)");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app).await.expect("Server failed");
}
