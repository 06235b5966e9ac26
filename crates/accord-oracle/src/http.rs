// HTTP transport for a hosted reasoning service. The node never builds
// prompts; it ships the structured records and the service returns
// structured judgements.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use accord_core::{ContradictionAnalysis, Intent, Settlement, VerificationRequest};

use crate::{OracleError, ReasoningOracle, SettlementAssessment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AssessmentCall<'a> {
    settlement: &'a Settlement,
    request: &'a VerificationRequest,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContradictionCall<'a> {
    settlement: &'a Settlement,
    intent_a: &'a Intent,
    intent_b: &'a Intent,
}

#[derive(Deserialize)]
struct ContradictionReply {
    finding: Option<ContradictionAnalysis>,
}

#[derive(Serialize)]
struct EmbeddingCall<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingReply {
    embedding: Vec<f32>,
}

/// Production oracle client.
pub struct HttpReasoningOracle {
    http: reqwest::Client,
    base_url: String,
}

impl HttpReasoningOracle {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Unreachable(e.to_string()))?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(HttpReasoningOracle { http, base_url })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, OracleError>
    where
        B: Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        debug!("oracle POST {}", path);
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Unreachable(format!("status {status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))
    }
}

fn from_reqwest(err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout
    } else if err.is_decode() {
        OracleError::Malformed(err.to_string())
    } else {
        OracleError::Unreachable(err.to_string())
    }
}

#[async_trait]
impl ReasoningOracle for HttpReasoningOracle {
    async fn assess_settlement(
        &self,
        settlement: &Settlement,
        request: &VerificationRequest,
    ) -> Result<SettlementAssessment, OracleError> {
        self.post_json("/assessments", &AssessmentCall { settlement, request })
            .await
    }

    async fn analyze_contradiction(
        &self,
        settlement: &Settlement,
        intent_a: &Intent,
        intent_b: &Intent,
    ) -> Result<Option<ContradictionAnalysis>, OracleError> {
        let reply: ContradictionReply = self
            .post_json(
                "/contradictions",
                &ContradictionCall { settlement, intent_a, intent_b },
            )
            .await?;
        Ok(reply.finding)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError> {
        let reply: EmbeddingReply = self.post_json("/embeddings", &EmbeddingCall { text }).await?;
        Ok(reply.embedding)
    }
}
