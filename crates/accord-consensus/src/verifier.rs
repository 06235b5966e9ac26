// Semantic Consensus Verifier: decides which settlements need
// corroboration, distributes signed verification requests to a sampled
// quorum, answers requests addressed to this node, and sweeps records
// past their response deadline.
//
// SAFETY INVARIANTS:
// 1. A verifier that cannot reason about a settlement answers with a
//    default negative response, never a silent approval
// 2. This node responds at most once per settlement
// 3. Terminal records are never mutated by sweeps or late responses

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::DashSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accord_chain::{ChainError, ChainService, NodeSigner, SigningError};
use accord_core::{
    FileStore, Settlement, StoreError, VerificationError, VerificationRecord,
    VerificationRequest, VerificationResponse, VerificationStatus,
};
use accord_oracle::{ReasoningOracle, SettlementAssessment};

use crate::quorum::{self, QuorumWeighting};
use crate::semantic::{self, EquivalenceResult};

/// Summary text prefix marking a response produced without a working
/// oracle. Downstream consumers can spot degraded responses by it.
pub const GENERATION_FAILURE_MARKER: &str = "[generation-failure]";

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Record(#[from] VerificationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Tunables for the verification protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationConfig {
    /// Master switch; when off nothing requires verification
    pub enabled: bool,

    /// Settlements at or above this computed value need corroboration
    pub high_value_threshold: f64,

    /// Quorum size to sample
    pub required_verifiers: usize,

    /// Approvals needed for consensus
    pub required_consensus: usize,

    /// Hours verifiers have to respond
    pub response_deadline_hours: i64,

    /// Cosine-similarity threshold for semantic equivalence
    pub equivalence_threshold: f64,

    pub weighting: QuorumWeighting,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        VerificationConfig {
            enabled: true,
            high_value_threshold: 10_000.0,
            required_verifiers: 5,
            required_consensus: 3,
            response_deadline_hours: 24,
            equivalence_threshold: 0.85,
            weighting: QuorumWeighting::Uniform,
        }
    }
}

/// Counts of verification records by status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub consensus_reached: usize,
    pub consensus_failed: usize,
    pub timeout: usize,
}

pub struct SemanticConsensusVerifier {
    node_id: String,
    config: VerificationConfig,
    chain: Arc<dyn ChainService>,
    oracle: Arc<dyn ReasoningOracle>,
    signer: Arc<NodeSigner>,
    records: Arc<FileStore<VerificationRecord>>,

    /// Settlements this node has already responded to as a verifier.
    /// In-memory only: after a restart the chain service's
    /// one-response-per-(settlement, verifier) rule is the guard, and
    /// a replayed submission comes back as a rejection, not a
    /// duplicate response on the ledger.
    responded: DashSet<String>,
}

impl SemanticConsensusVerifier {
    pub fn new(
        node_id: String,
        config: VerificationConfig,
        chain: Arc<dyn ChainService>,
        oracle: Arc<dyn ReasoningOracle>,
        signer: Arc<NodeSigner>,
        records: Arc<FileStore<VerificationRecord>>,
    ) -> Self {
        SemanticConsensusVerifier {
            node_id,
            config,
            chain,
            oracle,
            signer,
            records,
            responded: DashSet::new(),
        }
    }

    /// True iff verification is enabled and the settlement's computed
    /// value is at or above the high-value threshold. Monotonic in
    /// settlement value for a fixed configuration.
    pub fn requires_verification(&self, settlement: &Settlement) -> bool {
        self.config.enabled && settlement.computed_value() >= self.config.high_value_threshold
    }

    /// Sample a quorum, sign and distribute a verification request,
    /// and store the resulting record. Fails if the mediator list
    /// cannot be fetched; corroboration cannot proceed without a
    /// candidate set.
    pub async fn initiate_verification(
        &self,
        settlement: &Settlement,
    ) -> Result<VerificationRecord, VerifierError> {
        if self.records.contains(&settlement.id) {
            return Err(VerificationError::AlreadyInitiated(settlement.id.clone()).into());
        }

        let candidates = self.chain.active_mediators().await?;
        let selected = quorum::select_verifiers(
            &candidates,
            self.config.required_verifiers,
            &[self.node_id.as_str(), settlement.mediator_id.as_str()],
            self.config.weighting,
            &settlement.id,
        );
        if selected.is_empty() {
            return Err(VerificationError::NoCandidates(settlement.id.clone()).into());
        }

        let now = Utc::now();
        let mut request = VerificationRequest {
            settlement_id: settlement.id.clone(),
            requester_id: self.node_id.clone(),
            intent_hash_a: settlement.intent_hash_a.clone(),
            intent_hash_b: settlement.intent_hash_b.clone(),
            proposed_terms: settlement.proposed_terms.clone(),
            settlement_value: settlement.computed_value(),
            selected_verifiers: selected,
            requested_at: now,
            response_deadline: now + Duration::hours(self.config.response_deadline_hours),
            signature: String::new(),
        };
        request.signature = self.signer.sign(&request)?;

        self.chain.submit_verification_request(&request).await?;

        let record = VerificationRecord::new(request, self.config.required_consensus);
        self.records.insert(record.clone())?;
        info!(
            "initiated verification for settlement {} with {} verifiers",
            settlement.id,
            record.request.selected_verifiers.len()
        );
        Ok(record)
    }

    /// Answer a verification request addressed to this node. Oracle
    /// degradation produces a default negative response; only chain
    /// submission failures propagate.
    pub async fn submit_verification_response(
        &self,
        request: &VerificationRequest,
        settlement: &Settlement,
    ) -> Result<VerificationResponse, VerifierError> {
        if self.responded.contains(&request.settlement_id) {
            return Err(
                VerificationError::AlreadyResponded(request.settlement_id.clone()).into(),
            );
        }

        let assessment = if !request.matches_settlement(settlement) {
            warn!(
                "verification request snapshot mismatch for settlement {}",
                request.settlement_id
            );
            negative_assessment("request snapshot does not match ledger settlement")
        } else {
            match self.oracle.assess_settlement(settlement, request).await {
                Ok(a) => a,
                Err(e) => {
                    warn!(
                        "oracle failed to assess settlement {}: {}",
                        request.settlement_id, e
                    );
                    negative_assessment(&e.to_string())
                }
            }
        };

        let summary_embedding = match self.oracle.embed(&assessment.summary).await {
            Ok(v) => v,
            Err(e) => {
                warn!(
                    "oracle failed to embed summary for settlement {}: {}",
                    request.settlement_id, e
                );
                Vec::new()
            }
        };

        let response = VerificationResponse {
            settlement_id: request.settlement_id.clone(),
            verifier_id: self.node_id.clone(),
            approves: assessment.approves,
            confidence: assessment.confidence,
            semantic_summary: assessment.summary,
            summary_embedding,
        };

        self.chain
            .submit_verification_response(&request.settlement_id, &response)
            .await?;
        self.responded.insert(request.settlement_id.clone());
        Ok(response)
    }

    /// Ingest a peer's response into a record this node requested.
    /// Duplicate or unselected responders are rejected idempotently.
    pub fn record_response(
        &self,
        settlement_id: &str,
        response: VerificationResponse,
    ) -> Result<VerificationStatus, VerifierError> {
        let status = self
            .records
            .with_mut(settlement_id, |record| {
                record.ingest_response(response).map(|_| record.status)
            })??;
        if status.is_terminal() {
            info!("verification for settlement {} is {:?}", settlement_id, status);
        }
        Ok(status)
    }

    /// Transition every overdue, undecided record to Timeout.
    /// Idempotent; terminal records are untouched. Returns how many
    /// records changed.
    pub fn check_verification_timeouts(&self) -> usize {
        let now = Utc::now();
        let mut expired = 0usize;
        for id in self.records.ids() {
            match self.records.with_mut(&id, |record| record.mark_timeout_if_due(now)) {
                Ok(true) => {
                    warn!("verification for settlement {} timed out", id);
                    expired += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("timeout sweep skipped record {}: {}", id, e),
            }
        }
        expired
    }

    /// Compare two verifier responses for semantic agreement at the
    /// configured threshold.
    pub fn check_semantic_equivalence(
        &self,
        a: &VerificationResponse,
        b: &VerificationResponse,
    ) -> EquivalenceResult {
        semantic::check_semantic_equivalence(
            &a.semantic_summary,
            &a.summary_embedding,
            &b.semantic_summary,
            &b.summary_embedding,
            self.config.equivalence_threshold,
        )
    }

    pub fn has_responded(&self, settlement_id: &str) -> bool {
        self.responded.contains(settlement_id)
    }

    pub fn get_verification(&self, settlement_id: &str) -> Option<VerificationRecord> {
        self.records.get(settlement_id)
    }

    /// Ids of records still awaiting a decision.
    pub fn undecided_settlements(&self) -> Vec<String> {
        self.records
            .all()
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .map(|r| r.request.settlement_id)
            .collect()
    }

    pub fn get_verification_stats(&self) -> VerificationStats {
        let mut by_status: HashMap<VerificationStatus, usize> = HashMap::new();
        let all = self.records.all();
        let total = all.len();
        for record in all {
            *by_status.entry(record.status).or_insert(0) += 1;
        }
        VerificationStats {
            total,
            pending: by_status.remove(&VerificationStatus::Pending).unwrap_or(0),
            in_progress: by_status.remove(&VerificationStatus::InProgress).unwrap_or(0),
            consensus_reached: by_status
                .remove(&VerificationStatus::ConsensusReached)
                .unwrap_or(0),
            consensus_failed: by_status
                .remove(&VerificationStatus::ConsensusFailed)
                .unwrap_or(0),
            timeout: by_status.remove(&VerificationStatus::Timeout).unwrap_or(0),
        }
    }
}

fn negative_assessment(reason: &str) -> SettlementAssessment {
    SettlementAssessment {
        summary: format!("{GENERATION_FAILURE_MARKER} {reason}"),
        approves: false,
        confidence: 0.0,
    }
}
