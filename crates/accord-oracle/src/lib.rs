//! The reasoning-oracle seam. The node consumes three capabilities:
//! summarize-and-judge a settlement against a request snapshot, analyze
//! a settlement for contradictions against its source intents, and
//! embed a summary string.
//!
//! The oracle reports failure distinctly from "no finding": a failed
//! contradiction analysis is an `Err`, a clean analysis is `Ok(None)`.
//! Callers decide what a failure degrades to: detection treats it as
//! no finding, verification as a negative zero-confidence response.

pub mod http;

pub use http::HttpReasoningOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accord_core::{ContradictionAnalysis, Intent, Settlement, VerificationRequest};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle unreachable: {0}")]
    Unreachable(String),

    #[error("oracle produced an unstructured or unparseable reply: {0}")]
    Malformed(String),

    #[error("oracle call timed out")]
    Timeout,
}

/// The oracle's judgement of a settlement against a request snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementAssessment {
    /// Natural-language summary of what the settlement does
    pub summary: String,

    /// Whether the settlement looks faithful to its snapshot
    pub approves: bool,

    /// Confidence in the judgement, in [0, 1]
    pub confidence: f64,
}

/// Opaque natural-language reasoning backend.
#[async_trait]
pub trait ReasoningOracle: Send + Sync {
    /// Summarize and judge a settlement against the snapshot carried
    /// by a verification request.
    async fn assess_settlement(
        &self,
        settlement: &Settlement,
        request: &VerificationRequest,
    ) -> Result<SettlementAssessment, OracleError>;

    /// Check a settlement's terms against both intents' constraints.
    /// `Ok(None)` means "no structured finding", which is not an error.
    async fn analyze_contradiction(
        &self,
        settlement: &Settlement,
        intent_a: &Intent,
        intent_b: &Intent,
    ) -> Result<Option<ContradictionAnalysis>, OracleError>;

    /// Embed a text into the oracle's vector space.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OracleError>;
}
