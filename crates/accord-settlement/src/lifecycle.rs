// Settlement Lifecycle Manager. Owns every lifecycle transition of the
// settlements this node mediates; the periodic monitor is the only
// other writer besides explicit contest/reverse calls.
//
// SAFETY INVARIANTS:
// 1. A settlement closes only with bilateral acceptance and no upheld
//    challenge
// 2. Closure runs burn, then payout, then drops the settlement from
//    the active set; a failed burn is logged, never blocks finality
// 3. Reversal links a reversal settlement and leaves the original's
//    terms untouched

use std::sync::Arc;

use dashmap::DashSet;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use accord_chain::{BurnRequest, ChainError, ChainService, PayoutRequest};
use accord_core::{
    FileStore, Party, Settlement, SettlementDraft, SettlementError, SettlementStatus,
    StoreError,
};
use accord_reputation::ReputationLedger;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("settlement {0} is not ready to close: {1}")]
    NotReady(String, String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LifecycleConfig {
    /// Fraction of settlement value burned on successful closure
    pub success_burn_rate: f64,

    /// Default acceptance window for proposals, in hours
    pub acceptance_window_hours: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        LifecycleConfig { success_burn_rate: 0.001, acceptance_window_hours: 24 }
    }
}

/// Settlement counts by status, plus the size of the active set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementStats {
    pub total: usize,
    pub proposed: usize,
    pub ready_to_close: usize,
    pub closed: usize,
    pub contested: usize,
    pub reversed: usize,
    pub active: usize,
}

pub struct SettlementLifecycleManager {
    node_id: String,
    config: LifecycleConfig,
    chain: Arc<dyn ChainService>,
    store: Arc<FileStore<Settlement>>,
    reputation: Arc<ReputationLedger>,

    /// Settlements still requiring monitor attention
    active: DashSet<String>,
}

impl SettlementLifecycleManager {
    pub fn new(
        node_id: String,
        config: LifecycleConfig,
        chain: Arc<dyn ChainService>,
        store: Arc<FileStore<Settlement>>,
        reputation: Arc<ReputationLedger>,
    ) -> Self {
        let active = DashSet::new();
        for settlement in store.all() {
            if settlement.status != SettlementStatus::Closed
                && !settlement.status.is_terminal()
            {
                active.insert(settlement.id.clone());
            }
        }
        SettlementLifecycleManager { node_id, config, chain, store, reputation, active }
    }

    /// Validate and submit a new settlement proposal. Nothing is
    /// stored if validation or ledger submission fails.
    pub async fn propose(&self, draft: SettlementDraft) -> Result<Settlement, LifecycleError> {
        let id = Uuid::new_v4().to_string();
        let settlement = Settlement::from_draft(id, self.node_id.clone(), draft)?;
        self.chain.submit_settlement(&settlement).await?;
        self.store.insert(settlement.clone())?;
        self.active.insert(settlement.id.clone());
        info!(
            "proposed settlement {} (value {:.2})",
            settlement.id,
            settlement.computed_value()
        );
        Ok(settlement)
    }

    /// Record one party's acceptance; promotes the settlement to
    /// ready-to-close once both flags are set.
    pub fn record_acceptance(
        &self,
        settlement_id: &str,
        party: Party,
        actor: &str,
    ) -> Result<Settlement, LifecycleError> {
        let result = self.store.with_mut(settlement_id, |s| {
            s.record_acceptance(party, actor)?;
            if s.both_accepted() && s.status == SettlementStatus::Proposed {
                s.transition_to(SettlementStatus::ReadyToClose)?;
            }
            Ok::<_, SettlementError>(s.clone())
        })??;
        Ok(result)
    }

    /// Close a settlement: burn, payout, drop from the active set.
    /// The burn is best-effort; payout failure leaves the settlement
    /// un-closed for a later attempt.
    pub async fn try_close(&self, settlement_id: &str) -> Result<Settlement, LifecycleError> {
        let settlement = self
            .store
            .get(settlement_id)
            .ok_or_else(|| StoreError::NotFound(settlement_id.to_string()))?;

        if !settlement.status.can_transition_to(SettlementStatus::Closed) {
            return Err(SettlementError::InvalidTransition {
                from: settlement.status,
                to: SettlementStatus::Closed,
            }
            .into());
        }
        if !settlement.both_accepted() {
            return Err(LifecycleError::NotReady(
                settlement_id.to_string(),
                "both parties must accept".into(),
            ));
        }
        if settlement.has_upheld_challenge() {
            return Err(SettlementError::UpheldChallenge(settlement_id.to_string()).into());
        }

        let value = settlement.computed_value();
        let burn = BurnRequest {
            settlement_id: settlement.id.clone(),
            mediator_id: settlement.mediator_id.clone(),
            amount: value * self.config.success_burn_rate,
        };
        if let Err(e) = self.chain.submit_burn(&burn).await {
            // economic side effect is best-effort; finality is not
            warn!("success burn failed for settlement {}: {}", settlement.id, e);
        }

        let payout = PayoutRequest {
            settlement_id: settlement.id.clone(),
            mediator_id: settlement.mediator_id.clone(),
            amount: settlement.facilitation_fee,
        };
        self.chain.submit_payout(&payout).await?;

        // the settlement was unlocked while burn and payout were in
        // flight; the monitor may have folded in a challenge or a
        // contest moved the status, so every closure condition is
        // re-verified under the entry lock before the transition
        let closed = self.store.with_mut(settlement_id, |s| {
            if !s.both_accepted() {
                return Err(LifecycleError::NotReady(
                    s.id.clone(),
                    "both parties must accept".into(),
                ));
            }
            if s.has_upheld_challenge() {
                return Err(SettlementError::UpheldChallenge(s.id.clone()).into());
            }
            s.transition_to(SettlementStatus::Closed)
                .map_err(LifecycleError::from)?;
            Ok(s.clone())
        })??;
        self.active.remove(settlement_id);
        self.reputation.record_successful_closure(&closed.mediator_id);
        info!("closed settlement {} (value {:.2})", settlement_id, value);
        Ok(closed)
    }

    /// Contest a settlement, recording the external dispute id.
    pub fn contest(
        &self,
        settlement_id: &str,
        dispute_id: &str,
    ) -> Result<Settlement, LifecycleError> {
        let contested = self.store.with_mut(settlement_id, |s| {
            s.transition_to(SettlementStatus::Contested)?;
            s.dispute_id = Some(dispute_id.to_string());
            Ok::<_, SettlementError>(s.clone())
        })??;
        warn!("settlement {} contested (dispute {})", settlement_id, dispute_id);
        Ok(contested)
    }

    /// Reverse a settlement, linking the reversal settlement that
    /// undoes it. The original's terms are never mutated; the mediator
    /// forfeits its fee.
    pub fn reverse(
        &self,
        settlement_id: &str,
        reversal_settlement_id: &str,
    ) -> Result<Settlement, LifecycleError> {
        let reversed = self.store.with_mut(settlement_id, |s| {
            s.transition_to(SettlementStatus::Reversed)?;
            s.reversal_settlement_id = Some(reversal_settlement_id.to_string());
            Ok::<_, SettlementError>(s.clone())
        })??;
        self.active.remove(settlement_id);
        self.reputation.record_forfeited_fee(&reversed.mediator_id);
        warn!(
            "settlement {} reversed by settlement {}",
            settlement_id, reversal_settlement_id
        );
        Ok(reversed)
    }

    /// Periodic monitor: re-poll the ledger for every active
    /// settlement, fold in acceptance and challenge state, and close
    /// whatever became closable. A failure on one settlement never
    /// aborts the sweep for the rest.
    pub async fn monitor_settlements(&self) -> usize {
        let ids: Vec<String> = self.active.iter().map(|id| id.clone()).collect();
        let mut closed = 0usize;
        for id in ids {
            let remote = match self.chain.get_settlement(&id).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("monitor: could not fetch settlement {}: {}", id, e);
                    continue;
                }
            };
            let ready = match self.store.with_mut(&id, |s| {
                // acceptance is monotonic, challenges fold in by id
                s.party_a_accepted |= remote.party_a_accepted;
                s.party_b_accepted |= remote.party_b_accepted;
                for challenge in &remote.challenges {
                    s.attach_challenge(challenge.clone());
                }
                if s.both_accepted() && s.status == SettlementStatus::Proposed {
                    if let Err(e) = s.transition_to(SettlementStatus::ReadyToClose) {
                        warn!("monitor: settlement {}: {}", s.id, e);
                    }
                }
                s.status == SettlementStatus::ReadyToClose
            }) {
                Ok(ready) => ready,
                Err(e) => {
                    warn!("monitor: could not update settlement {}: {}", id, e);
                    continue;
                }
            };
            if ready {
                match self.try_close(&id).await {
                    Ok(_) => closed += 1,
                    Err(e) => warn!("monitor: settlement {} not closed: {}", id, e),
                }
            }
        }
        closed
    }

    pub fn get(&self, settlement_id: &str) -> Option<Settlement> {
        self.store.get(settlement_id)
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active.iter().map(|id| id.clone()).collect()
    }

    pub fn stats(&self) -> SettlementStats {
        let mut stats = SettlementStats { active: self.active.len(), ..Default::default() };
        for settlement in self.store.all() {
            stats.total += 1;
            match settlement.status {
                SettlementStatus::Proposed => stats.proposed += 1,
                SettlementStatus::ReadyToClose => stats.ready_to_close += 1,
                SettlementStatus::Closed => stats.closed += 1,
                SettlementStatus::Contested => stats.contested += 1,
                SettlementStatus::Reversed => stats.reversed += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use accord_chain::{ChallengeFiling, ChallengeResolution, MediatorInfo};
    use accord_core::{
        ChallengeRef, ChallengeStatus, Intent, VerificationRequest, VerificationResponse,
    };

    use tokio::sync::Notify;

    /// Parks `submit_payout` until the test releases it, so state can
    /// be mutated while closure is suspended at the network boundary.
    struct PayoutGate {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[derive(Default)]
    struct TestChain {
        fail_burn: bool,
        fail_payout: bool,
        payout_gate: Option<PayoutGate>,
        remote: Mutex<HashMap<String, Settlement>>,
        burns: Mutex<Vec<BurnRequest>>,
        payouts: Mutex<Vec<PayoutRequest>>,
    }

    #[async_trait]
    impl ChainService for TestChain {
        async fn get_intent(&self, hash: &str) -> Result<Intent, ChainError> {
            Err(ChainError::NotFound(hash.to_string()))
        }

        async fn recent_settlements(&self, _limit: usize) -> Result<Vec<Settlement>, ChainError> {
            Ok(Vec::new())
        }

        async fn get_settlement(&self, id: &str) -> Result<Settlement, ChainError> {
            self.remote
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| ChainError::NotFound(id.to_string()))
        }

        async fn submit_settlement(&self, settlement: &Settlement) -> Result<(), ChainError> {
            self.remote
                .lock()
                .unwrap()
                .insert(settlement.id.clone(), settlement.clone());
            Ok(())
        }

        async fn submit_burn(&self, burn: &BurnRequest) -> Result<(), ChainError> {
            if self.fail_burn {
                return Err(ChainError::Transport("burn engine unreachable".into()));
            }
            self.burns.lock().unwrap().push(burn.clone());
            Ok(())
        }

        async fn submit_payout(&self, payout: &PayoutRequest) -> Result<(), ChainError> {
            if let Some(gate) = &self.payout_gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            if self.fail_payout {
                return Err(ChainError::Transport("payout engine unreachable".into()));
            }
            self.payouts.lock().unwrap().push(payout.clone());
            Ok(())
        }

        async fn active_mediators(&self) -> Result<Vec<MediatorInfo>, ChainError> {
            Ok(Vec::new())
        }

        async fn submit_verification_request(
            &self,
            _request: &VerificationRequest,
        ) -> Result<(), ChainError> {
            Ok(())
        }

        async fn pending_verification_requests(
            &self,
            _verifier_id: &str,
        ) -> Result<Vec<VerificationRequest>, ChainError> {
            Ok(Vec::new())
        }

        async fn submit_verification_response(
            &self,
            _settlement_id: &str,
            _response: &VerificationResponse,
        ) -> Result<(), ChainError> {
            Ok(())
        }

        async fn fetch_verification_responses(
            &self,
            _settlement_id: &str,
        ) -> Result<Vec<VerificationResponse>, ChainError> {
            Ok(Vec::new())
        }

        async fn submit_challenge(&self, _filing: &ChallengeFiling) -> Result<String, ChainError> {
            Ok("ch-1".into())
        }

        async fn get_challenge_resolution(
            &self,
            challenge_id: &str,
        ) -> Result<ChallengeResolution, ChainError> {
            Err(ChainError::NotFound(challenge_id.to_string()))
        }
    }

    fn draft() -> SettlementDraft {
        let mut terms = BTreeMap::new();
        terms.insert("price".to_string(), serde_json::json!(15000.0));
        SettlementDraft {
            intent_hash_a: "a".repeat(64),
            intent_hash_b: "b".repeat(64),
            party_a: "party-a".into(),
            party_b: "party-b".into(),
            reasoning: "matched intents".into(),
            proposed_terms: terms,
            facilitation_fee: 150.0,
            facilitation_fee_percent: 1.0,
            generation_integrity_hash: "hash".into(),
            acceptance_window_hours: 24,
        }
    }

    fn manager(chain: Arc<TestChain>) -> SettlementLifecycleManager {
        let dir = std::env::temp_dir().join(format!("accord-lifecycle-{}", Uuid::new_v4()));
        SettlementLifecycleManager::new(
            "this-node".into(),
            LifecycleConfig::default(),
            chain,
            Arc::new(FileStore::open(dir).unwrap()),
            Arc::new(ReputationLedger::new()),
        )
    }

    #[tokio::test]
    async fn test_propose_validates_and_stores() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain.clone());

        let settlement = mgr.propose(draft()).await.unwrap();
        assert_eq!(settlement.status, SettlementStatus::Proposed);
        assert_eq!(settlement.mediator_id, "this-node");
        assert!(mgr.get(&settlement.id).is_some());
        assert!(chain.remote.lock().unwrap().contains_key(&settlement.id));

        let mut bad = draft();
        bad.facilitation_fee = -1.0;
        assert!(mgr.propose(bad).await.is_err());
    }

    #[tokio::test]
    async fn test_close_requires_bilateral_acceptance() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain.clone());
        let s = mgr.propose(draft()).await.unwrap();

        let err = mgr.try_close(&s.id).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Settlement(_)));

        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();
        assert_eq!(mgr.get(&s.id).unwrap().status, SettlementStatus::ReadyToClose);

        let closed = mgr.try_close(&s.id).await.unwrap();
        assert_eq!(closed.status, SettlementStatus::Closed);
        assert!(!mgr.active_ids().contains(&s.id));

        // burn then payout, burn proportional to value
        let burns = chain.burns.lock().unwrap();
        let payouts = chain.payouts.lock().unwrap();
        assert_eq!(burns.len(), 1);
        assert_eq!(payouts.len(), 1);
        assert!((burns[0].amount - 15.0).abs() < 1e-9);
        assert!((payouts[0].amount - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_upheld_challenge_blocks_closure() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain);
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();

        mgr.store
            .with_mut(&s.id, |stl| {
                stl.attach_challenge(ChallengeRef {
                    challenge_id: "ch-1".into(),
                    status: ChallengeStatus::Upheld,
                });
            })
            .unwrap();

        let err = mgr.try_close(&s.id).await.unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Settlement(SettlementError::UpheldChallenge(_))
        ));
        assert_eq!(mgr.get(&s.id).unwrap().status, SettlementStatus::ReadyToClose);
    }

    #[tokio::test]
    async fn test_non_upheld_challenges_do_not_block_closure() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain);
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();
        mgr.store
            .with_mut(&s.id, |stl| {
                stl.attach_challenge(ChallengeRef {
                    challenge_id: "ch-1".into(),
                    status: ChallengeStatus::Pending,
                });
                stl.attach_challenge(ChallengeRef {
                    challenge_id: "ch-2".into(),
                    status: ChallengeStatus::Rejected,
                });
            })
            .unwrap();

        let closed = mgr.try_close(&s.id).await.unwrap();
        assert_eq!(closed.status, SettlementStatus::Closed);
    }

    #[tokio::test]
    async fn test_challenge_upheld_mid_closure_blocks_closure() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let chain = Arc::new(TestChain {
            payout_gate: Some(PayoutGate {
                entered: entered.clone(),
                release: release.clone(),
            }),
            ..Default::default()
        });
        let mgr = Arc::new(manager(chain));
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();

        let closing = tokio::spawn({
            let mgr = mgr.clone();
            let id = s.id.clone();
            async move { mgr.try_close(&id).await }
        });

        // closure is parked in the payout call; fold in an upheld
        // challenge the way the monitor would, then let it resume
        entered.notified().await;
        mgr.store
            .with_mut(&s.id, |stl| {
                stl.attach_challenge(ChallengeRef {
                    challenge_id: "ch-1".into(),
                    status: ChallengeStatus::Upheld,
                });
            })
            .unwrap();
        release.notify_one();

        let err = closing.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::Settlement(SettlementError::UpheldChallenge(_))
        ));
        let after = mgr.get(&s.id).unwrap();
        assert_ne!(after.status, SettlementStatus::Closed);
        assert!(mgr.active_ids().contains(&s.id));
    }

    #[tokio::test]
    async fn test_burn_failure_does_not_block_closure() {
        let chain = Arc::new(TestChain { fail_burn: true, ..Default::default() });
        let mgr = manager(chain.clone());
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();

        let closed = mgr.try_close(&s.id).await.unwrap();
        assert_eq!(closed.status, SettlementStatus::Closed);
        assert_eq!(chain.payouts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payout_failure_blocks_closure() {
        let chain = Arc::new(TestChain { fail_payout: true, ..Default::default() });
        let mgr = manager(chain);
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();

        assert!(mgr.try_close(&s.id).await.is_err());
        assert_eq!(mgr.get(&s.id).unwrap().status, SettlementStatus::ReadyToClose);
    }

    #[tokio::test]
    async fn test_contest_and_reverse() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain);
        let s = mgr.propose(draft()).await.unwrap();
        let original_terms = s.proposed_terms.clone();

        let contested = mgr.contest(&s.id, "dispute-7").unwrap();
        assert_eq!(contested.status, SettlementStatus::Contested);
        assert_eq!(contested.dispute_id.as_deref(), Some("dispute-7"));

        let reversed = mgr.reverse(&s.id, "stl-reversal").unwrap();
        assert_eq!(reversed.status, SettlementStatus::Reversed);
        assert_eq!(reversed.reversal_settlement_id.as_deref(), Some("stl-reversal"));
        assert_eq!(reversed.proposed_terms, original_terms);

        // terminal: no further transitions
        assert!(mgr.contest(&s.id, "dispute-8").is_err());
    }

    #[tokio::test]
    async fn test_reverse_after_close_forfeits_fee() {
        let chain = Arc::new(TestChain::default());
        let dir = std::env::temp_dir().join(format!("accord-lifecycle-{}", Uuid::new_v4()));
        let reputation = Arc::new(ReputationLedger::new());
        let mgr = SettlementLifecycleManager::new(
            "this-node".into(),
            LifecycleConfig::default(),
            chain,
            Arc::new(FileStore::open(dir).unwrap()),
            reputation.clone(),
        );
        let s = mgr.propose(draft()).await.unwrap();
        mgr.record_acceptance(&s.id, Party::A, "party-a").unwrap();
        mgr.record_acceptance(&s.id, Party::B, "party-b").unwrap();
        mgr.try_close(&s.id).await.unwrap();
        assert_eq!(reputation.state_of("this-node").successful_closures, 1);

        mgr.reverse(&s.id, "stl-reversal").unwrap();
        assert_eq!(reputation.state_of("this-node").forfeited_fees, 1);
    }

    #[tokio::test]
    async fn test_monitor_folds_in_remote_state() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain.clone());
        let s = mgr.propose(draft()).await.unwrap();

        // ledger saw both acceptances
        {
            let mut remote = chain.remote.lock().unwrap();
            let r = remote.get_mut(&s.id).unwrap();
            r.party_a_accepted = true;
            r.party_b_accepted = true;
        }

        let closed = mgr.monitor_settlements().await;
        assert_eq!(closed, 1);
        assert_eq!(mgr.get(&s.id).unwrap().status, SettlementStatus::Closed);
    }

    #[tokio::test]
    async fn test_monitor_skips_failing_items() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain.clone());
        let a = mgr.propose(draft()).await.unwrap();
        let mut second = draft();
        second.intent_hash_a = "c".repeat(64);
        let b = mgr.propose(second).await.unwrap();

        // first settlement disappears from the ledger; second accepted
        {
            let mut remote = chain.remote.lock().unwrap();
            remote.remove(&a.id);
            let r = remote.get_mut(&b.id).unwrap();
            r.party_a_accepted = true;
            r.party_b_accepted = true;
        }

        let closed = mgr.monitor_settlements().await;
        assert_eq!(closed, 1);
        assert_eq!(mgr.get(&b.id).unwrap().status, SettlementStatus::Closed);
        assert_eq!(mgr.get(&a.id).unwrap().status, SettlementStatus::Proposed);
    }

    #[tokio::test]
    async fn test_stats_breakdown() {
        let chain = Arc::new(TestChain::default());
        let mgr = manager(chain);
        let s = mgr.propose(draft()).await.unwrap();
        let mut second = draft();
        second.intent_hash_a = "c".repeat(64);
        mgr.propose(second).await.unwrap();
        mgr.contest(&s.id, "d-1").unwrap();

        let stats = mgr.stats();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.proposed, 1);
        assert_eq!(stats.contested, 1);
    }
}
