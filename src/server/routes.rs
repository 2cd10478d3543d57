//! Axum route handlers for the round-table HTTP server.
//!
//! Request-scoped operations catch every internal error at this boundary and
//! translate it into a structured `{status, message}` body. Downstream
//! failures map to a generic 500 (detail is logged, not returned) with one
//! exception: the game-end operation returns the underlying error message to
//! aid manual recovery of the partially-executed registration protocol.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tower_http::cors::CorsLayer;

use crate::chat::{ChatRequest, ExternalChat};
use crate::config::Settings;
use crate::errors::GameError;
use crate::game::GameEndSequencer;
use crate::ledger::{GameConfig, SqliteLedger};
use crate::scheduler::Liveness;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<SqliteLedger>,
    pub chat: Arc<ExternalChat>,
    pub sequencer: Arc<GameEndSequencer>,
    pub liveness: Arc<Liveness>,
    pub settings: Arc<Settings>,
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat-data", get(chat_data_handler))
        .route("/api/chat", post(chat_handler))
        .route(
            "/api/game/config",
            get(get_game_config_handler).post(set_game_config_handler),
        )
        .route("/api/game/end", post(end_game_handler))
        .route("/api/game/reset", post(reset_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Translate a core error into an HTTP failure body.
///
/// Client errors always carry their message; server errors stay generic
/// unless `expose_detail` is set (game end only).
fn error_response(error: GameError, expose_detail: bool) -> (StatusCode, Json<Value>) {
    let status = match &error {
        GameError::Validation { .. } => StatusCode::BAD_REQUEST,
        GameError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        GameError::NotFound { .. } => StatusCode::NOT_FOUND,
        GameError::Persistence { .. } | GameError::Gateway { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let message = if status.is_client_error() || expose_detail {
        error.to_string()
    } else {
        log::error!("request failed: {}", error);
        "internal error".to_string()
    };
    (
        status,
        Json(serde_json::json!({"status": "error", "message": message})),
    )
}

/// GET /health — liveness probe, including the round-loop heartbeat.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": "roundtable",
        "last_successful_round": state.liveness.last_successful_round(),
    }))
}

#[derive(Debug, Deserialize)]
struct ChatDataParams {
    start_time: Option<String>,
    agent_name: Option<String>,
}

/// GET /api/chat-data — per-identity scores, transcripts, and topics.
async fn chat_data_handler(
    State(state): State<AppState>,
    Query(params): Query<ChatDataParams>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Some(start_raw) = params.start_time else {
        return Err(error_response(
            GameError::validation("start_time parameter is required"),
            false,
        ));
    };
    let start: DateTime<Utc> = start_raw.parse().map_err(|_| {
        error_response(
            GameError::validation(format!("start_time is not a timestamp: {}", start_raw)),
            false,
        )
    })?;

    let agents = state
        .ledger
        .chat_data(
            start,
            Utc::now(),
            params.agent_name.as_deref(),
            &state.settings.host.name,
        )
        .await
        .map_err(|e| error_response(e, false))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": { "agents": agents },
    })))
}

/// POST /api/chat — a single external turn with the host.
async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let reply = state
        .chat
        .handle(request)
        .await
        .map_err(|e| error_response(e, false))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": reply,
    })))
}

/// GET /api/game/config — current pacing plus the projected next round.
async fn get_game_config_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let config = state
        .ledger
        .game_config()
        .await
        .map_err(|e| error_response(e, false))?;

    let interval_secs = config
        .as_ref()
        .map(|c| c.round_interval_secs)
        .unwrap_or(state.settings.round_interval_secs);
    let next_round = state
        .liveness
        .last_successful_round()
        .map(|t| t + Duration::seconds(interval_secs as i64));

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": {
            "round_interval_secs": interval_secs,
            "game_start": config.as_ref().and_then(|c| c.game_start),
            "game_end": config.as_ref().and_then(|c| c.game_end),
            "next_round": next_round,
        },
    })))
}

#[derive(Debug, Deserialize)]
struct SetGameConfigRequest {
    round_interval_secs: u64,
    game_start: Option<DateTime<Utc>>,
    game_end: Option<DateTime<Utc>>,
}

/// POST /api/game/config — upsert the singleton pacing row.
async fn set_game_config_handler(
    State(state): State<AppState>,
    Json(request): Json<SetGameConfigRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if request.round_interval_secs == 0 {
        return Err(error_response(
            GameError::validation("round_interval_secs must be positive"),
            false,
        ));
    }
    state
        .ledger
        .upsert_game_config(&GameConfig {
            round_interval_secs: request.round_interval_secs,
            game_start: request.game_start,
            game_end: request.game_end,
        })
        .await
        .map_err(|e| error_response(e, false))?;

    Ok(Json(serde_json::json!({"status": "success"})))
}

/// POST /api/game/end — run the derivation protocol.
async fn end_game_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let credential = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            error_response(
                GameError::Unauthorized {
                    message: "missing bearer credential".to_string(),
                },
                true,
            )
        })?;

    let outcome = state
        .sequencer
        .end_game(credential)
        .await
        .map_err(|e| error_response(e, true))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": outcome,
    })))
}

/// POST /api/game/reset — irreversibly wipe all game state.
async fn reset_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    state
        .ledger
        .truncate_game_state()
        .await
        .map_err(|e| error_response(e, false))?;
    log::warn!("game state reset");
    Ok(Json(serde_json::json!({"status": "success"})))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use parking_lot::Mutex;
    use tower::ServiceExt;

    use crate::config::AgentProfile;
    use crate::gateway::{AgentReply, MessageGateway, PersonaDescription};
    use crate::registry::{AssetRegistry, IdentityMetadata, IdentityRegistration};
    use crate::session::SessionBridge;

    struct ScriptedGateway;

    #[async_trait]
    impl MessageGateway for ScriptedGateway {
        async fn send_message(
            &self,
            _agent_id: &str,
            _text: &str,
            _user_id: &str,
            _user_name: &str,
            _room_id: &str,
        ) -> Result<Vec<AgentReply>, GameError> {
            Ok(vec![AgentReply {
                text: "charmed, I'm sure".to_string(),
                score: Some(2),
            }])
        }

        async fn generate_persona(&self, _agent_id: &str) -> Result<PersonaDescription, GameError> {
            Ok(PersonaDescription {
                name: "Nova".to_string(),
                system: "child".to_string(),
                avatar_url: None,
            })
        }
    }

    #[derive(Default)]
    struct CountingRegistry {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl AssetRegistry for CountingRegistry {
        async fn register_identity(
            &self,
            _metadata: &IdentityMetadata,
        ) -> Result<IdentityRegistration, GameError> {
            *self.calls.lock() += 1;
            Ok(IdentityRegistration {
                identity_id: "0xchild".to_string(),
                tx_ref: "0xtx".to_string(),
            })
        }

        async fn issue_license(
            &self,
            _caller_credential: &str,
            _issuer_identity_id: &str,
            _holder_identity_id: &str,
        ) -> Result<String, GameError> {
            *self.calls.lock() += 1;
            Ok("license".to_string())
        }

        async fn register_derivative(
            &self,
            _caller_credential: &str,
            _child_identity_id: &str,
            _license_ids: &[String],
        ) -> Result<String, GameError> {
            *self.calls.lock() += 1;
            Ok("confirmed".to_string())
        }
    }

    fn test_settings() -> Settings {
        Settings {
            api_port: 0,
            database_path: "unused".into(),
            gateway_url: String::new(),
            registry_url: String::new(),
            game_end_secret: "s3cret".to_string(),
            round_interval_secs: 5,
            host: AgentProfile {
                id: "host".to_string(),
                name: "Marilyn".to_string(),
                ip_id: None,
                wallet_key: None,
                avatar_url: None,
                description: None,
            },
            contestants: vec![],
            derived_wallet_address: None,
            derived_wallet_key: None,
        }
    }

    fn test_state(registry: Arc<CountingRegistry>) -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SqliteLedger::new(dir.path().join("game.db")).unwrap());
        let settings = Arc::new(test_settings());
        let gateway: Arc<dyn MessageGateway> = Arc::new(ScriptedGateway);
        let sessions = Arc::new(SessionBridge::new(Arc::clone(&ledger)));
        let state = AppState {
            chat: Arc::new(ExternalChat::new(
                Arc::clone(&gateway),
                Arc::clone(&ledger),
                sessions,
                settings.host.clone(),
            )),
            sequencer: Arc::new(GameEndSequencer::new(
                Arc::clone(&gateway),
                registry,
                Arc::clone(&ledger),
                Arc::clone(&settings),
            )),
            liveness: Arc::new(Liveness::new()),
            ledger,
            settings,
        };
        (dir, state)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1 << 16)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], crate::VERSION);
        assert_eq!(json["service"], "roundtable");
        assert!(json["last_successful_round"].is_null());
    }

    #[tokio::test]
    async fn test_chat_data_requires_start_time() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat-data")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert!(json["message"].as_str().unwrap().contains("start_time"));
    }

    #[tokio::test]
    async fn test_chat_then_chat_data_round_trip() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({
                    "message": "hello Marilyn",
                    "user_id": "ext-1",
                    "user_name": "Sam",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["data"]["message"], "charmed, I'm sure");
        assert_eq!(json["data"]["score"], 2);
        assert_eq!(json["data"]["session_info"]["original_user_id"], "ext-1");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat-data?start_time=2020-01-01T00:00:00Z")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        let agents = json["data"]["agents"].as_array().unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0]["score"], 2);
        assert_eq!(agents[0]["messages"].as_array().unwrap().len(), 2);
        assert_eq!(agents[0]["messages"][1]["name"], "Marilyn");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_message() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({"message": "  ", "user_id": "ext-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_game_config_round_trip() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/game/config",
                serde_json::json!({"round_interval_secs": 120}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/game/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"]["round_interval_secs"], 120);
        // No round has completed, so no projection yet.
        assert!(json["data"]["next_round"].is_null());
    }

    #[tokio::test]
    async fn test_game_config_rejects_zero_interval() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .oneshot(post_json(
                "/api/game/config",
                serde_json::json!({"round_interval_secs": 0}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_end_game_requires_bearer() {
        let registry = Arc::new(CountingRegistry::default());
        let (_dir, state) = test_state(Arc::clone(&registry));
        let app = app_router(state);

        let response = app
            .oneshot(post_json("/api/game/end", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*registry.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_end_game_rejects_wrong_credential() {
        let registry = Arc::new(CountingRegistry::default());
        let (_dir, state) = test_state(Arc::clone(&registry));
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/end")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(*registry.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_end_game_with_no_contestants_is_not_found() {
        let registry = Arc::new(CountingRegistry::default());
        let (_dir, state) = test_state(Arc::clone(&registry));
        let app = app_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/game/end")
                    .header("Authorization", "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        // Underlying message is exposed on the game-end route.
        let json = body_json(response).await;
        assert!(json["message"].as_str().unwrap().contains("contestants"));
        assert_eq!(*registry.calls.lock(), 0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let (_dir, state) = test_state(Arc::default());
        let app = app_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/chat",
                serde_json::json!({"message": "hello", "user_id": "ext-1"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json("/api/game/reset", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/chat-data?start_time=2020-01-01T00:00:00Z")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(response).await;
        assert!(json["data"]["agents"].as_array().unwrap().is_empty());
    }
}
