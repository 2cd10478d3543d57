//! Asset registration gateway — identity, license, and derivative operations.
//!
//! Three operations with strict caller-side ordering: a derived identity must
//! be registered before either parent can license it, and both licenses must
//! exist before the derivative relationship is recorded. Each write has
//! irreversible external side effects; callers must not retry blindly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::GameError;
use crate::gateway::PersonaDescription;

/// Metadata payload for registering a new identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMetadata {
    pub title: String,
    pub description: String,
    pub ip_type: String,
    /// sha-256 over the canonical JSON of the persona, hex-encoded.
    pub content_hash: String,
}

impl IdentityMetadata {
    /// Build registration metadata for a generated persona.
    pub fn for_persona(persona: &PersonaDescription) -> Result<Self, GameError> {
        let canonical =
            serde_json::to_string(persona).map_err(|e| GameError::Persistence {
                message: format!("failed to serialize persona: {}", e),
            })?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(Self {
            title: persona.name.clone(),
            description: persona.system.clone(),
            ip_type: "character".to_string(),
            content_hash: hex::encode(digest),
        })
    }
}

/// Result of a successful identity registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRegistration {
    /// The registry-assigned identity id.
    pub identity_id: String,
    /// Transaction reference for the registration.
    pub tx_ref: String,
}

/// Opaque capability over the external registration network.
#[async_trait]
pub trait AssetRegistry: Send + Sync {
    /// Register a new identity; must succeed before any licensing step.
    async fn register_identity(
        &self,
        metadata: &IdentityMetadata,
    ) -> Result<IdentityRegistration, GameError>;

    /// Issue a license from `issuer_identity_id` to `holder_identity_id`,
    /// signed with the issuer's private credential. Returns the license id.
    async fn issue_license(
        &self,
        caller_credential: &str,
        issuer_identity_id: &str,
        holder_identity_id: &str,
    ) -> Result<String, GameError>;

    /// Record the parent-child relationship for `child_identity_id`, consuming
    /// the given licenses. Returns a confirmation reference.
    async fn register_derivative(
        &self,
        caller_credential: &str,
        child_identity_id: &str,
        license_ids: &[String],
    ) -> Result<String, GameError>;
}

/// Production registry speaking HTTP/JSON to the registration service.
pub struct HttpAssetRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAssetRegistry {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn expect_success(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<reqwest::Response, GameError> {
        if !response.status().is_success() {
            return Err(GameError::Gateway {
                message: format!("{} returned HTTP {}", operation, response.status()),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl AssetRegistry for HttpAssetRegistry {
    async fn register_identity(
        &self,
        metadata: &IdentityMetadata,
    ) -> Result<IdentityRegistration, GameError> {
        let url = format!("{}/identities", self.base_url);
        let response = self.client.post(&url).json(metadata).send().await?;
        let response = Self::expect_success(response, "register-identity").await?;
        Ok(response.json().await?)
    }

    async fn issue_license(
        &self,
        caller_credential: &str,
        issuer_identity_id: &str,
        holder_identity_id: &str,
    ) -> Result<String, GameError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct LicenseResponse {
            license_id: String,
        }

        let url = format!("{}/licenses", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(caller_credential)
            .json(&serde_json::json!({
                "issuerIdentityId": issuer_identity_id,
                "holderIdentityId": holder_identity_id,
            }))
            .send()
            .await?;
        let response = Self::expect_success(response, "issue-license").await?;
        let body: LicenseResponse = response.json().await?;
        Ok(body.license_id)
    }

    async fn register_derivative(
        &self,
        caller_credential: &str,
        child_identity_id: &str,
        license_ids: &[String],
    ) -> Result<String, GameError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct DerivativeResponse {
            confirmation: String,
        }

        let url = format!("{}/derivatives", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(caller_credential)
            .json(&serde_json::json!({
                "childIdentityId": child_identity_id,
                "licenseIds": license_ids,
            }))
            .send()
            .await?;
        let response = Self::expect_success(response, "register-derivative").await?;
        let body: DerivativeResponse = response.json().await?;
        Ok(body.confirmation)
    }
}
