// Challenge lifecycle management: file signed challenges against
// foreign settlements, poll the ledger for resolutions, and feed the
// outcomes into reputation. The ledger is the durable record; local
// tracking exists only while a challenge is unresolved.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accord_chain::{ChainError, ChainService, ChallengeFiling, NodeSigner, SigningError};
use accord_core::{
    Challenge, ChallengeError, ChallengeStatus, ContradictionAnalysis, FileStore, Settlement,
    StoreError,
};
use accord_reputation::ReputationLedger;

#[derive(Debug, Error)]
pub enum ChallengeManagerError {
    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signing(#[from] SigningError),
}

/// Counts over this node's filed challenges. Resolved challenges are
/// dropped from local tracking, so resolved counts accumulate in the
/// manager rather than being derived from the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeStats {
    pub total: u64,
    pub pending: u64,
    pub upheld: u64,
    pub rejected: u64,
    /// upheld / (upheld + rejected); 0 until something resolves
    pub success_rate: f64,
}

pub struct ChallengeManager {
    node_id: String,
    chain: Arc<dyn ChainService>,
    signer: Arc<NodeSigner>,
    reputation: Arc<ReputationLedger>,
    tracked: Arc<FileStore<Challenge>>,

    /// Settlements this node has ever challenged; survives resolution
    /// so a settlement is never challenged twice
    challenged_settlements: DashSet<String>,

    upheld: AtomicU64,
    rejected: AtomicU64,
}

impl ChallengeManager {
    pub fn new(
        node_id: String,
        chain: Arc<dyn ChainService>,
        signer: Arc<NodeSigner>,
        reputation: Arc<ReputationLedger>,
        tracked: Arc<FileStore<Challenge>>,
    ) -> Self {
        let challenged_settlements = DashSet::new();
        for challenge in tracked.all() {
            challenged_settlements.insert(challenge.settlement_id);
        }
        ChallengeManager {
            node_id,
            chain,
            signer,
            reputation,
            tracked,
            challenged_settlements,
            upheld: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn has_challenged(&self, settlement_id: &str) -> bool {
        self.challenged_settlements.contains(settlement_id)
    }

    /// File a signed challenge on the ledger and begin tracking it.
    /// One challenge per (settlement, this node), enforced locally and
    /// assumed enforced again by the ledger.
    pub async fn submit_challenge(
        &self,
        settlement: &Settlement,
        analysis: ContradictionAnalysis,
    ) -> Result<Challenge, ChallengeManagerError> {
        if settlement.mediator_id == self.node_id {
            return Err(ChallengeError::OwnSettlement(settlement.id.clone()).into());
        }
        if self.challenged_settlements.contains(&settlement.id) {
            return Err(ChallengeError::Duplicate(settlement.id.clone()).into());
        }
        if !analysis.has_contradiction {
            return Err(ChallengeError::BelowThreshold(
                "analysis found no contradiction".into(),
            )
            .into());
        }

        let mut filing = ChallengeFiling {
            settlement_id: settlement.id.clone(),
            challenger_id: self.node_id.clone(),
            analysis: analysis.clone(),
            submitted_at: Utc::now(),
            signature: String::new(),
        };
        filing.signature = self.signer.sign(&filing)?;

        let challenge_id = self.chain.submit_challenge(&filing).await?;
        let challenge = Challenge {
            id: challenge_id,
            settlement_id: settlement.id.clone(),
            challenged_mediator_id: settlement.mediator_id.clone(),
            challenger_id: self.node_id.clone(),
            analysis,
            submitted_at: filing.submitted_at,
            status: ChallengeStatus::Pending,
        };
        self.tracked.insert(challenge.clone())?;
        self.challenged_settlements.insert(settlement.id.clone());
        info!(
            "filed challenge {} against settlement {} ({:?})",
            challenge.id, settlement.id, challenge.analysis.severity
        );
        Ok(challenge)
    }

    /// Poll the ledger for every tracked challenge. Terminal
    /// resolutions update reputation and end local tracking; a failed
    /// poll skips that challenge and moves on.
    pub async fn monitor_challenges(&self) -> usize {
        let mut resolved = 0usize;
        for challenge in self.tracked.all() {
            let resolution = match self.chain.get_challenge_resolution(&challenge.id).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("challenge {} poll failed: {}", challenge.id, e);
                    continue;
                }
            };
            match resolution.status {
                ChallengeStatus::Pending => {}
                ChallengeStatus::Upheld => {
                    self.upheld.fetch_add(1, Ordering::Relaxed);
                    self.reputation
                        .record_upheld_challenge_against(&challenge.challenged_mediator_id);
                    if let Err(e) = self.tracked.remove(&challenge.id) {
                        warn!("could not drop resolved challenge {}: {}", challenge.id, e);
                    }
                    info!("challenge {} upheld", challenge.id);
                    resolved += 1;
                }
                ChallengeStatus::Rejected => {
                    self.rejected.fetch_add(1, Ordering::Relaxed);
                    self.reputation.record_failed_challenge(&self.node_id);
                    if let Err(e) = self.tracked.remove(&challenge.id) {
                        warn!("could not drop resolved challenge {}: {}", challenge.id, e);
                    }
                    info!("challenge {} rejected", challenge.id);
                    resolved += 1;
                }
            }
        }
        resolved
    }

    pub fn get_challenges_for_settlement(&self, settlement_id: &str) -> Vec<Challenge> {
        self.tracked
            .all()
            .into_iter()
            .filter(|c| c.settlement_id == settlement_id)
            .collect()
    }

    /// Challenges still tracked locally, i.e. unresolved.
    pub fn get_submitted_challenges(&self) -> Vec<Challenge> {
        self.tracked.all()
    }

    pub fn get_challenge_stats(&self) -> ChallengeStats {
        let pending = self.tracked.len() as u64;
        let upheld = self.upheld.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let resolved = upheld + rejected;
        ChallengeStats {
            total: pending + resolved,
            pending,
            upheld,
            rejected,
            success_rate: if resolved == 0 { 0.0 } else { upheld as f64 / resolved as f64 },
        }
    }
}
