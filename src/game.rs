//! Game-end sequencer.
//!
//! The one-shot derivation protocol: pick the winner, generate the derived
//! persona, register it, issue one license per parent, and record the
//! derivative relationship. Registration steps have irreversible external
//! side effects, so every completed step is persisted to the derivation-state
//! row before the next begins; a rerun after a mid-sequence failure resumes
//! from the first incomplete step instead of repeating registrations.
//!
//! The sequencer never retries internally and surfaces step failures verbatim
//! to the caller — recovery is a deliberate re-invocation.

use std::sync::Arc;

use serde::Serialize;

use crate::config::Settings;
use crate::errors::GameError;
use crate::gateway::{MessageGateway, PersonaDescription};
use crate::ledger::{AssetMetadata, DerivationState, SqliteLedger};
use crate::registry::{AssetRegistry, IdentityMetadata};

/// Result of a completed game end.
#[derive(Debug, Clone, Serialize)]
pub struct GameEndOutcome {
    pub winner_id: String,
    pub winner_name: String,
    pub winner_score: i64,
    pub persona: PersonaDescription,
    pub derived_identity_id: String,
}

/// Executes the end-of-game derivation protocol.
pub struct GameEndSequencer {
    gateway: Arc<dyn MessageGateway>,
    registry: Arc<dyn AssetRegistry>,
    ledger: Arc<SqliteLedger>,
    settings: Arc<Settings>,
}

impl GameEndSequencer {
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        registry: Arc<dyn AssetRegistry>,
        ledger: Arc<SqliteLedger>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            gateway,
            registry,
            ledger,
            settings,
        }
    }

    /// Run (or resume) the derivation protocol.
    pub async fn end_game(&self, credential: &str) -> Result<GameEndOutcome, GameError> {
        if credential != self.settings.game_end_secret {
            return Err(GameError::Unauthorized {
                message: "game-end credential mismatch".to_string(),
            });
        }

        // Resume an interrupted sequence, otherwise select the winner and
        // generate the persona — the only steps with nothing external behind
        // them, so restarting here is always safe.
        let mut state = match self.ledger.load_derivation().await? {
            Some(state) if !state.completed => {
                log::info!(
                    "resuming derivation for winner {} from persisted state",
                    state.winner_id
                );
                state
            }
            _ => {
                let (winner_id, score) = self
                    .ledger
                    .top_scorer()
                    .await?
                    .ok_or_else(|| GameError::not_found("no scored contestants"))?;
                log::info!("winner selected: {} with score {}", winner_id, score);

                let persona = self.gateway.generate_persona(&winner_id).await?;
                let state = DerivationState::new(winner_id, persona);
                self.ledger.save_derivation(&state).await?;
                state
            }
        };

        let winner = self
            .settings
            .contestant(&state.winner_id)
            .ok_or_else(|| {
                GameError::not_found(format!(
                    "winner {} has no configured credentials",
                    state.winner_id
                ))
            })?
            .clone();
        let winner_score = self.ledger.score_of(&state.winner_id).await?;

        let host = &self.settings.host;
        let host_ip = host
            .ip_id
            .as_deref()
            .ok_or_else(|| GameError::validation("host has no registered identity"))?;
        let host_key = host
            .wallet_key
            .as_deref()
            .ok_or_else(|| GameError::validation("host wallet credential missing"))?;
        let winner_ip = winner
            .ip_id
            .as_deref()
            .ok_or_else(|| GameError::validation("winner has no registered identity"))?;
        let winner_key = winner
            .wallet_key
            .as_deref()
            .ok_or_else(|| GameError::validation("winner wallet credential missing"))?;
        let child_key = self
            .settings
            .derived_wallet_key
            .as_deref()
            .ok_or_else(|| GameError::validation("derived wallet credential missing"))?;

        // Register the derived identity.
        if state.derived_identity_id.is_none() {
            let metadata = IdentityMetadata::for_persona(&state.persona)?;
            let registration = self.registry.register_identity(&metadata).await?;
            log::info!(
                "derived identity registered: {} (tx {})",
                registration.identity_id,
                registration.tx_ref
            );
            state.derived_identity_id = Some(registration.identity_id);
            state.registration_tx = Some(registration.tx_ref);
            self.ledger.save_derivation(&state).await?;
        }
        let derived_id = state
            .derived_identity_id
            .clone()
            .ok_or_else(|| GameError::persistence("derivation state lost its identity id"))?;

        // Host license, then winner license. An orphaned host license after a
        // winner-side failure is accepted; the persisted state prevents it
        // from being issued twice on retry.
        if state.host_license_id.is_none() {
            let license = self
                .registry
                .issue_license(host_key, host_ip, &derived_id)
                .await?;
            log::info!("host license issued: {}", license);
            state.host_license_id = Some(license);
            self.ledger.save_derivation(&state).await?;
        }
        if state.winner_license_id.is_none() {
            let license = self
                .registry
                .issue_license(winner_key, winner_ip, &derived_id)
                .await?;
            log::info!("winner license issued: {}", license);
            state.winner_license_id = Some(license);
            self.ledger.save_derivation(&state).await?;
        }

        // Record the parent-child relationship.
        if state.confirmation.is_none() {
            let licenses = [
                state.host_license_id.clone(),
                state.winner_license_id.clone(),
            ]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
            let confirmation = self
                .registry
                .register_derivative(child_key, &derived_id, &licenses)
                .await?;
            log::info!("derivative registered: {}", confirmation);
            state.confirmation = Some(confirmation);
            self.ledger.save_derivation(&state).await?;
        }

        // Persist the derived identity's account row.
        self.ledger
            .upsert_account(
                &derived_id,
                &state.persona.name,
                &state.persona.name,
                &format!("{}@example.com", derived_id),
            )
            .await?;
        self.ledger
            .save_asset_metadata(
                &derived_id,
                &AssetMetadata {
                    ip_id: Some(derived_id.clone()),
                    wallet_address: self.settings.derived_wallet_address.clone(),
                    license_term_id: None,
                    registration_tx: state.registration_tx.clone(),
                    avatar_url: state.persona.avatar_url.clone(),
                    description: Some(state.persona.system.clone()),
                },
            )
            .await?;

        state.completed = true;
        self.ledger.save_derivation(&state).await?;

        Ok(GameEndOutcome {
            winner_id: state.winner_id.clone(),
            winner_name: winner.name,
            winner_score,
            persona: state.persona.clone(),
            derived_identity_id: derived_id,
        })
    }
}
