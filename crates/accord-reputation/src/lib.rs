//! Per-mediator reputation tracking, this node's own view.
//!
//! The weight is a pure function of four counters and is recomputed on
//! every read; nothing else is cached, so the weight can never drift
//! from the counters that justify it.

use dashmap::DashMap;
use log::info;
use serde::{Deserialize, Serialize};

/// Historical performance counters for one mediator.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReputationState {
    /// Settlements this mediator closed successfully
    pub successful_closures: u64,

    /// Challenges this mediator filed that were rejected
    pub failed_challenges: u64,

    /// Challenges upheld against this mediator's settlements
    pub upheld_challenges_against: u64,

    /// Fees forfeited through reversals or disputes
    pub forfeited_fees: u64,
}

impl ReputationState {
    /// Derived quorum weight:
    /// (closures + failed_challenges * 2) / (1 + upheld_against + forfeited).
    /// Never negative; an untouched state weighs 0.
    pub fn weight(&self) -> f64 {
        let numerator = self.successful_closures as f64 + self.failed_challenges as f64 * 2.0;
        let denominator = 1.0 + self.upheld_challenges_against as f64 + self.forfeited_fees as f64;
        (numerator / denominator).max(0.0)
    }
}

/// Registry of reputation states keyed by mediator id.
#[derive(Default)]
pub struct ReputationLedger {
    states: DashMap<String, ReputationState>,
}

impl ReputationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current weight for a mediator; unknown mediators weigh 0.
    pub fn weight_of(&self, mediator_id: &str) -> f64 {
        self.states
            .get(mediator_id)
            .map(|s| s.weight())
            .unwrap_or(0.0)
    }

    pub fn state_of(&self, mediator_id: &str) -> ReputationState {
        self.states
            .get(mediator_id)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub fn record_successful_closure(&self, mediator_id: &str) {
        self.states
            .entry(mediator_id.to_string())
            .or_default()
            .successful_closures += 1;
        info!("reputation: closure credited to {}", mediator_id);
    }

    /// A challenge this node filed came back rejected.
    pub fn record_failed_challenge(&self, filer_id: &str) {
        self.states
            .entry(filer_id.to_string())
            .or_default()
            .failed_challenges += 1;
    }

    /// A challenge against `target_id`'s settlement was upheld.
    pub fn record_upheld_challenge_against(&self, target_id: &str) {
        self.states
            .entry(target_id.to_string())
            .or_default()
            .upheld_challenges_against += 1;
    }

    pub fn record_forfeited_fee(&self, mediator_id: &str) {
        self.states
            .entry(mediator_id.to_string())
            .or_default()
            .forfeited_fees += 1;
    }

    pub fn snapshot(&self) -> Vec<(String, ReputationState)> {
        self.states
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}
