//! The mediator node: wires the stores and managers together and runs
//! the periodic work loops.
//!
//! Four loops, all log-and-continue: the settlement monitor, the
//! foreign-settlement contradiction scan, the verification poll
//! (answer requests naming this node, ingest peer responses for our
//! own records), and the verification timeout sweep. Shutdown is
//! cooperative through a watch flag; each loop exits after its
//! in-flight tick.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use log::{info, warn};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use accord_chain::{ChainService, NodeSigner, SigningError};
use accord_challenge::{ChallengeDetector, ChallengeManager, ChallengeStats};
use accord_consensus::{SemanticConsensusVerifier, VerificationStats, VerifierError};
use accord_core::{FileStore, Settlement, SettlementDraft, StoreError};
use accord_oracle::ReasoningOracle;
use accord_reputation::ReputationLedger;
use accord_settlement::{LifecycleError, SettlementLifecycleManager, SettlementStats};

use crate::config::NodeConfig;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Signing(#[from] SigningError),

    #[error("invalid secret key: {0}")]
    InvalidKey(String),
}

pub struct MediatorNode {
    node_id: String,
    config: NodeConfig,
    chain: Arc<dyn ChainService>,

    lifecycle: Arc<SettlementLifecycleManager>,
    verifier: Arc<SemanticConsensusVerifier>,
    detector: Arc<ChallengeDetector>,
    challenges: Arc<ChallengeManager>,
    reputation: Arc<ReputationLedger>,

    /// Settlement snapshots already scanned, keyed by id + terms hash
    /// so amended terms are scanned again
    scanned: DashSet<String>,

    shutdown: watch::Sender<bool>,
}

impl MediatorNode {
    pub fn new(
        config: NodeConfig,
        chain: Arc<dyn ChainService>,
        oracle: Arc<dyn ReasoningOracle>,
    ) -> Result<Self, NodeError> {
        let signer = Arc::new(match &config.secret_key_hex {
            Some(hex_key) => {
                let bytes: [u8; 32] = hex::decode(hex_key)
                    .map_err(|e| NodeError::InvalidKey(e.to_string()))?
                    .try_into()
                    .map_err(|_| NodeError::InvalidKey("secret must be 32 bytes".into()))?;
                NodeSigner::from_secret_bytes(&bytes)
            }
            None => {
                let signer = NodeSigner::generate();
                warn!(
                    "no secret key configured, generated ephemeral identity {}",
                    signer.public_key_hex()
                );
                signer
            }
        });
        let node_id = if config.node_id.is_empty() {
            signer.public_key_hex()
        } else {
            config.node_id.clone()
        };

        let settlements = Arc::new(FileStore::open(config.data_dir.join("settlements"))?);
        let verifications = Arc::new(FileStore::open(config.data_dir.join("verifications"))?);
        let challenges = Arc::new(FileStore::open(config.data_dir.join("challenges"))?);
        let reputation = Arc::new(ReputationLedger::new());

        let lifecycle = Arc::new(SettlementLifecycleManager::new(
            node_id.clone(),
            config.lifecycle.clone(),
            chain.clone(),
            settlements,
            reputation.clone(),
        ));
        let verifier = Arc::new(SemanticConsensusVerifier::new(
            node_id.clone(),
            config.verification.clone(),
            chain.clone(),
            oracle.clone(),
            signer.clone(),
            verifications,
        ));
        let detector = Arc::new(ChallengeDetector::new(config.challenge.clone(), oracle));
        let challenge_manager = Arc::new(ChallengeManager::new(
            node_id.clone(),
            chain.clone(),
            signer,
            reputation.clone(),
            challenges,
        ));

        let (shutdown, _) = watch::channel(false);
        Ok(MediatorNode {
            node_id,
            config,
            chain,
            lifecycle,
            verifier,
            detector,
            challenges: challenge_manager,
            reputation,
            scanned: DashSet::new(),
            shutdown,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn lifecycle(&self) -> &Arc<SettlementLifecycleManager> {
        &self.lifecycle
    }

    pub fn verifier(&self) -> &Arc<SemanticConsensusVerifier> {
        &self.verifier
    }

    pub fn challenges(&self) -> &Arc<ChallengeManager> {
        &self.challenges
    }

    pub fn reputation(&self) -> &Arc<ReputationLedger> {
        &self.reputation
    }

    /// Propose a settlement; high-value proposals also kick off
    /// semantic verification. A failed kickoff is logged, not fatal:
    /// the proposal is already on the ledger.
    pub async fn propose_settlement(
        &self,
        draft: SettlementDraft,
    ) -> Result<Settlement, LifecycleError> {
        let settlement = self.lifecycle.propose(draft).await?;
        if self.verifier.requires_verification(&settlement) {
            if let Err(e) = self.verifier.initiate_verification(&settlement).await {
                warn!(
                    "could not initiate verification for settlement {}: {}",
                    settlement.id, e
                );
            }
        }
        Ok(settlement)
    }

    /// One contradiction-scan sweep over recent foreign settlements.
    /// Returns how many challenges were filed.
    pub async fn scan_for_contradictions(&self) -> usize {
        let recent = match self
            .chain
            .recent_settlements(self.detector.config().scan_limit)
            .await
        {
            Ok(list) => list,
            Err(e) => {
                warn!("scan: could not list recent settlements: {}", e);
                return 0;
            }
        };

        let mut filed = 0usize;
        for settlement in recent {
            if settlement.mediator_id == self.node_id
                || self.challenges.has_challenged(&settlement.id)
            {
                continue;
            }
            let scan_key = format!("{}:{}", settlement.id, settlement.terms_hash);
            if self.scanned.contains(&scan_key) {
                continue;
            }

            let intent_a = match self.chain.get_intent(&settlement.intent_hash_a).await {
                Ok(i) => i,
                Err(e) => {
                    warn!("scan: intent {} unavailable: {}", settlement.intent_hash_a, e);
                    continue;
                }
            };
            let intent_b = match self.chain.get_intent(&settlement.intent_hash_b).await {
                Ok(i) => i,
                Err(e) => {
                    warn!("scan: intent {} unavailable: {}", settlement.intent_hash_b, e);
                    continue;
                }
            };

            let finding = self
                .detector
                .analyze_settlement(&settlement, &intent_a, &intent_b)
                .await;
            self.scanned.insert(scan_key);

            let Some(finding) = finding else { continue };
            if !self.detector.should_challenge(&finding) {
                continue;
            }
            match self.challenges.submit_challenge(&settlement, finding).await {
                Ok(challenge) => {
                    info!(
                        "scan: filed challenge {} against settlement {}",
                        challenge.id, settlement.id
                    );
                    filed += 1;
                }
                Err(e) => warn!("scan: challenge on settlement {} not filed: {}", settlement.id, e),
            }
        }
        filed
    }

    /// One verification-poll sweep: answer requests naming this node,
    /// then fold accumulated peer responses into our own records.
    pub async fn poll_verification_work(&self) -> usize {
        let mut handled = 0usize;

        match self.chain.pending_verification_requests(&self.node_id).await {
            Ok(requests) => {
                for request in requests {
                    if self.verifier.has_responded(&request.settlement_id) {
                        continue;
                    }
                    let settlement =
                        match self.chain.get_settlement(&request.settlement_id).await {
                            Ok(s) => s,
                            Err(e) => {
                                warn!(
                                    "poll: settlement {} unavailable: {}",
                                    request.settlement_id, e
                                );
                                continue;
                            }
                        };
                    match self
                        .verifier
                        .submit_verification_response(&request, &settlement)
                        .await
                    {
                        Ok(response) => {
                            info!(
                                "poll: responded to verification of settlement {} (approves={})",
                                request.settlement_id, response.approves
                            );
                            handled += 1;
                        }
                        Err(e) => warn!(
                            "poll: response for settlement {} not submitted: {}",
                            request.settlement_id, e
                        ),
                    }
                }
            }
            Err(e) => warn!("poll: could not list pending verification requests: {}", e),
        }

        for settlement_id in self.verifier.undecided_settlements() {
            let responses = match self.chain.fetch_verification_responses(&settlement_id).await {
                Ok(r) => r,
                Err(e) => {
                    warn!("poll: responses for settlement {} unavailable: {}", settlement_id, e);
                    continue;
                }
            };
            for response in responses {
                match self.verifier.record_response(&settlement_id, response) {
                    Ok(_) => handled += 1,
                    // re-polls replay already-ingested responses
                    Err(VerifierError::Record(_)) => {}
                    Err(e) => {
                        warn!("poll: response for settlement {} dropped: {}", settlement_id, e)
                    }
                }
            }
        }
        handled
    }

    /// Spawn the periodic loops. Each observes the shutdown flag.
    pub fn start(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("mediator node {} starting", self.node_id);
        vec![
            self.spawn_loop("settlement-monitor", self.config.monitor_interval_secs, |node| {
                Box::pin(async move {
                    let closed = node.lifecycle.monitor_settlements().await;
                    if closed > 0 {
                        info!("monitor: closed {} settlements", closed);
                    }
                })
            }),
            self.spawn_loop("contradiction-scan", self.config.scan_interval_secs, |node| {
                Box::pin(async move {
                    node.scan_for_contradictions().await;
                    node.challenges.monitor_challenges().await;
                })
            }),
            self.spawn_loop(
                "verification-poll",
                self.config.verification_poll_interval_secs,
                |node| Box::pin(async move { node.poll_verification_work().await; }),
            ),
            self.spawn_loop(
                "verification-timeout-sweep",
                self.config.timeout_sweep_interval_secs,
                |node| {
                    Box::pin(async move {
                        node.verifier.check_verification_timeouts();
                    })
                },
            ),
        ]
    }

    fn spawn_loop<F>(self: &Arc<Self>, name: &'static str, period_secs: u64, tick: F) -> JoinHandle<()>
    where
        F: Fn(Arc<MediatorNode>) -> futures::future::BoxFuture<'static, ()> + Send + 'static,
    {
        let node = Arc::clone(self);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(period_secs.max(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => tick(Arc::clone(&node)).await,
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("{} loop stopping", name);
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Flip the shutdown flag; running loops exit after their
    /// in-flight tick.
    pub fn shutdown(&self) {
        // send only fails when no loop is listening anymore
        self.shutdown.send(true).ok();
    }

    pub fn stats(&self) -> NodeStats {
        NodeStats {
            settlements: self.lifecycle.stats(),
            verifications: self.verifier.get_verification_stats(),
            challenges: self.challenges.get_challenge_stats(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeStats {
    pub settlements: SettlementStats,
    pub verifications: VerificationStats,
    pub challenges: ChallengeStats,
}
