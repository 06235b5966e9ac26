// The chain-service seam: every remote call the settlement integrity
// subsystem makes goes through the `ChainService` trait, with the
// reqwest client as the production implementation. Calls carry a
// bounded timeout; retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;

use accord_core::{Intent, Settlement, VerificationRequest, VerificationResponse};

use crate::wire::{
    BurnRequest, ChallengeAccepted, ChallengeEnvelope, ChallengeFiling, ChallengeResolution,
    MediatorInfo, PayoutRequest, VerificationRequestEnvelope, VerificationResponseEnvelope,
};

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain service unreachable: {0}")]
    Transport(String),

    #[error("chain service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable chain response: {0}")]
    Decode(String),

    #[error("record not found on ledger: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for ChainError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ChainError::Decode(err.to_string())
        } else {
            ChainError::Transport(err.to_string())
        }
    }
}

/// Shared ledger and coordination backend.
#[async_trait]
pub trait ChainService: Send + Sync {
    async fn get_intent(&self, hash: &str) -> Result<Intent, ChainError>;

    /// Foreign, unchallenged, proposed settlements for scanning.
    async fn recent_settlements(&self, limit: usize) -> Result<Vec<Settlement>, ChainError>;

    async fn get_settlement(&self, id: &str) -> Result<Settlement, ChainError>;

    async fn submit_settlement(&self, settlement: &Settlement) -> Result<(), ChainError>;

    async fn submit_burn(&self, burn: &BurnRequest) -> Result<(), ChainError>;

    async fn submit_payout(&self, payout: &PayoutRequest) -> Result<(), ChainError>;

    /// Active mediators with ledger weights, for quorum sampling.
    async fn active_mediators(&self) -> Result<Vec<MediatorInfo>, ChainError>;

    async fn submit_verification_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), ChainError>;

    /// Verification requests naming this node as a verifier.
    async fn pending_verification_requests(
        &self,
        verifier_id: &str,
    ) -> Result<Vec<VerificationRequest>, ChainError>;

    async fn submit_verification_response(
        &self,
        settlement_id: &str,
        response: &VerificationResponse,
    ) -> Result<(), ChainError>;

    /// Responses accumulated so far for a settlement this node is
    /// collecting corroboration on.
    async fn fetch_verification_responses(
        &self,
        settlement_id: &str,
    ) -> Result<Vec<VerificationResponse>, ChainError>;

    /// File a challenge; returns the ledger-assigned challenge id.
    async fn submit_challenge(&self, filing: &ChallengeFiling) -> Result<String, ChainError>;

    async fn get_challenge_resolution(
        &self,
        challenge_id: &str,
    ) -> Result<ChallengeResolution, ChainError>;
}

/// Production HTTP client for the chain service.
pub struct HttpChainClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpChainClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(HttpChainClient { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ChainError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ChainError::NotFound(body));
        }
        Err(ChainError::Status { status: status.as_u16(), body })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ChainError> {
        debug!("chain GET {}", path);
        let response = self.http.get(self.url(path)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn post_json<B: serde::Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, ChainError> {
        debug!("chain POST {}", path);
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::check(response).await
    }
}

#[async_trait]
impl ChainService for HttpChainClient {
    async fn get_intent(&self, hash: &str) -> Result<Intent, ChainError> {
        self.get_json(&format!("/intents/{hash}")).await
    }

    async fn recent_settlements(&self, limit: usize) -> Result<Vec<Settlement>, ChainError> {
        self.get_json(&format!("/settlements/recent?limit={limit}")).await
    }

    async fn get_settlement(&self, id: &str) -> Result<Settlement, ChainError> {
        self.get_json(&format!("/settlements/{id}")).await
    }

    async fn submit_settlement(&self, settlement: &Settlement) -> Result<(), ChainError> {
        self.post_json("/settlements", settlement).await?;
        Ok(())
    }

    async fn submit_burn(&self, burn: &BurnRequest) -> Result<(), ChainError> {
        self.post_json("/burns", burn).await?;
        Ok(())
    }

    async fn submit_payout(&self, payout: &PayoutRequest) -> Result<(), ChainError> {
        self.post_json("/payouts", payout).await?;
        Ok(())
    }

    async fn active_mediators(&self) -> Result<Vec<MediatorInfo>, ChainError> {
        self.get_json("/consensus/authorities").await
    }

    async fn submit_verification_request(
        &self,
        request: &VerificationRequest,
    ) -> Result<(), ChainError> {
        let envelope = VerificationRequestEnvelope { request: request.clone() };
        self.post_json("/verifications", &envelope).await?;
        Ok(())
    }

    async fn pending_verification_requests(
        &self,
        verifier_id: &str,
    ) -> Result<Vec<VerificationRequest>, ChainError> {
        self.get_json(&format!("/verification-requests/pending?verifierId={verifier_id}"))
            .await
    }

    async fn submit_verification_response(
        &self,
        settlement_id: &str,
        response: &VerificationResponse,
    ) -> Result<(), ChainError> {
        let envelope = VerificationResponseEnvelope { response: response.clone() };
        self.post_json(&format!("/verifications/{settlement_id}/responses"), &envelope)
            .await?;
        Ok(())
    }

    async fn fetch_verification_responses(
        &self,
        settlement_id: &str,
    ) -> Result<Vec<VerificationResponse>, ChainError> {
        self.get_json(&format!("/verifications/{settlement_id}/responses")).await
    }

    async fn submit_challenge(&self, filing: &ChallengeFiling) -> Result<String, ChainError> {
        let envelope = ChallengeEnvelope { challenge: filing.clone() };
        let accepted: ChallengeAccepted =
            self.post_json("/challenges", &envelope).await?.json().await?;
        Ok(accepted.challenge_id)
    }

    async fn get_challenge_resolution(
        &self,
        challenge_id: &str,
    ) -> Result<ChallengeResolution, ChainError> {
        self.get_json(&format!("/challenges/{challenge_id}")).await
    }
}
