// Semantic-consensus verification records. One record per settlement
// requiring corroboration; the record owns the request snapshot, the
// accumulated responses, and the consensus decision.
//
// SAFETY INVARIANTS:
// 1. Selected verifiers never include the requester or the mediator
// 2. At most one response per (settlement, verifier)
// 3. ConsensusReached / ConsensusFailed / Timeout are terminal
// 4. Timeout sweeps never touch records already terminal

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settlement::{hash_terms, Settlement};

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("verification record not found for settlement {0}")]
    NotFound(String),

    #[error("verification record for settlement {0} already exists")]
    AlreadyInitiated(String),

    #[error("record for settlement {0} is terminal and immutable")]
    Terminal(String),

    #[error("duplicate response from verifier {verifier_id} for settlement {settlement_id}")]
    DuplicateResponse { settlement_id: String, verifier_id: String },

    #[error("verifier {verifier_id} was not selected for settlement {settlement_id}")]
    NotSelected { settlement_id: String, verifier_id: String },

    #[error("this node already responded to settlement {0}")]
    AlreadyResponded(String),

    #[error("no verifier candidates available for settlement {0}")]
    NoCandidates(String),

    #[error("request snapshot does not match settlement {0}")]
    SnapshotMismatch(String),
}

/// Status of a verification record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum VerificationStatus {
    /// Request distributed, no responses yet
    Pending,

    /// At least one response received
    InProgress,

    /// Approvals reached the required consensus count
    ConsensusReached,

    /// Consensus became mathematically unreachable
    ConsensusFailed,

    /// Response deadline elapsed before a decision
    Timeout,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VerificationStatus::ConsensusReached
                | VerificationStatus::ConsensusFailed
                | VerificationStatus::Timeout
        )
    }
}

/// Signed, self-contained verification request distributed to the
/// sampled quorum. Verifiers check the snapshot against the ledger's
/// settlement rather than trusting the requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRequest {
    pub settlement_id: String,
    pub requester_id: String,
    pub intent_hash_a: String,
    pub intent_hash_b: String,
    pub proposed_terms: BTreeMap<String, serde_json::Value>,
    pub settlement_value: f64,
    pub selected_verifiers: Vec<String>,
    pub requested_at: DateTime<Utc>,
    pub response_deadline: DateTime<Utc>,
    pub signature: String,
}

impl VerificationRequest {
    /// Tamper check: the snapshot must agree with the settlement the
    /// ledger serves for the same id.
    pub fn matches_settlement(&self, settlement: &Settlement) -> bool {
        self.settlement_id == settlement.id
            && self.intent_hash_a == settlement.intent_hash_a
            && self.intent_hash_b == settlement.intent_hash_b
            && hash_terms(&self.proposed_terms) == settlement.terms_hash
    }
}

/// One verifier's judgement of a settlement. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    pub settlement_id: String,
    pub verifier_id: String,
    pub approves: bool,

    /// Verifier confidence in its judgement, in [0, 1]
    pub confidence: f64,

    /// Natural-language summary of what the settlement does
    pub semantic_summary: String,

    /// Embedding of the summary, used for equivalence scoring
    pub summary_embedding: Vec<f32>,
}

/// A verification request plus everything learned about it since.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub request: VerificationRequest,
    pub responses: Vec<VerificationResponse>,
    pub required_consensus: usize,
    pub status: VerificationStatus,
}

impl VerificationRecord {
    pub fn new(request: VerificationRequest, required_consensus: usize) -> Self {
        VerificationRecord {
            request,
            responses: Vec::new(),
            required_consensus,
            status: VerificationStatus::Pending,
        }
    }

    pub fn settlement_id(&self) -> &str {
        &self.request.settlement_id
    }

    pub fn approvals(&self) -> usize {
        self.responses.iter().filter(|r| r.approves).count()
    }

    /// Verifiers that have not responded yet.
    pub fn outstanding(&self) -> usize {
        self.request
            .selected_verifiers
            .len()
            .saturating_sub(self.responses.len())
    }

    /// Ingest a response, enforcing selection and uniqueness, then
    /// re-derive the consensus decision.
    pub fn ingest_response(&mut self, response: VerificationResponse) -> Result<(), VerificationError> {
        if self.status.is_terminal() {
            return Err(VerificationError::Terminal(self.request.settlement_id.clone()));
        }
        if !self
            .request
            .selected_verifiers
            .iter()
            .any(|v| v == &response.verifier_id)
        {
            return Err(VerificationError::NotSelected {
                settlement_id: self.request.settlement_id.clone(),
                verifier_id: response.verifier_id,
            });
        }
        if self.responses.iter().any(|r| r.verifier_id == response.verifier_id) {
            return Err(VerificationError::DuplicateResponse {
                settlement_id: self.request.settlement_id.clone(),
                verifier_id: response.verifier_id,
            });
        }
        self.responses.push(response);
        if self.status == VerificationStatus::Pending {
            self.status = VerificationStatus::InProgress;
        }
        self.recompute_status();
        Ok(())
    }

    /// Consensus determination. Reached once approvals meet the
    /// threshold; failed once the remaining unresponded verifiers can
    /// no longer get there.
    fn recompute_status(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        let approvals = self.approvals();
        if approvals >= self.required_consensus {
            self.status = VerificationStatus::ConsensusReached;
        } else if approvals + self.outstanding() < self.required_consensus {
            self.status = VerificationStatus::ConsensusFailed;
        }
    }

    /// Transition to Timeout if the deadline passed while the record
    /// was still undecided. Returns whether anything changed, so the
    /// sweep is idempotent.
    pub fn mark_timeout_if_due(&mut self, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if now > self.request.response_deadline {
            self.status = VerificationStatus::Timeout;
            return true;
        }
        false
    }
}
