// Settlement data model and lifecycle state machine.
//
// SAFETY INVARIANTS:
// 1. Status transitions follow an explicit table and never regress
// 2. Proposed terms are immutable once both parties have accepted
// 3. A settlement with an upheld challenge can never reach Closed
// 4. The terms integrity hash commits to the terms at proposal time

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("invalid settlement: {0}")]
    Invalid(String),

    #[error("settlement not found: {0}")]
    NotFound(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: SettlementStatus, to: SettlementStatus },

    #[error("settlement {0} is immutable in its current state")]
    Immutable(String),

    #[error("actor {actor} is not a party to settlement {settlement_id}")]
    NotAParty { actor: String, settlement_id: String },

    #[error("settlement {0} has an upheld challenge and cannot close")]
    UpheldChallenge(String),
}

/// Lifecycle status of a settlement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SettlementStatus {
    /// Proposed by a mediator, awaiting bilateral acceptance
    Proposed,

    /// Both parties accepted, awaiting closure
    ReadyToClose,

    /// Closed: burn and payout executed, settlement final
    Closed,

    /// Contested via an external dispute
    Contested,

    /// Reversed after closure or a successful contest
    Reversed,
}

impl SettlementStatus {
    /// Terminal states admit no further transitions except Closed -> Reversed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SettlementStatus::Reversed)
    }

    /// Explicit transition table. Anything not listed here is rejected.
    pub fn can_transition_to(&self, next: SettlementStatus) -> bool {
        use SettlementStatus::*;
        matches!(
            (*self, next),
            (Proposed, ReadyToClose)
                | (Proposed, Contested)
                | (ReadyToClose, Closed)
                | (ReadyToClose, Contested)
                | (Contested, Reversed)
                | (Contested, Closed)
                | (Closed, Reversed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Proposed => "proposed",
            SettlementStatus::ReadyToClose => "ready-to-close",
            SettlementStatus::Closed => "closed",
            SettlementStatus::Contested => "contested",
            SettlementStatus::Reversed => "reversed",
        }
    }
}

impl std::fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two parties to a settlement, in intent order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Party {
    A,
    B,
}

/// Resolution status of a challenge, mirrored on the settlement's
/// attached-challenge list so closure checks need no extra lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Pending,
    Upheld,
    Rejected,
}

impl ChallengeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChallengeStatus::Upheld | ChallengeStatus::Rejected)
    }
}

/// Reference to a challenge attached to a settlement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRef {
    pub challenge_id: String,
    pub status: ChallengeStatus,
}

/// A proposed economic agreement between two intents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub id: String,

    /// Hashes of the two source intents
    pub intent_hash_a: String,
    pub intent_hash_b: String,

    /// Parties behind the two intents; only they may accept
    pub party_a: String,
    pub party_b: String,

    /// Free-text reasoning trace from the negotiation
    pub reasoning: String,

    /// Negotiated terms; immutable once both parties accept
    pub proposed_terms: BTreeMap<String, serde_json::Value>,

    /// Fee charged by the proposing mediator
    pub facilitation_fee: f64,

    /// Fee expressed as a percentage of total settlement value
    pub facilitation_fee_percent: f64,

    /// Integrity hash over the model/prompt that produced the terms
    pub generation_integrity_hash: String,

    /// Integrity hash over the proposed terms themselves
    pub terms_hash: String,

    /// Mediator that proposed the settlement
    pub mediator_id: String,

    pub created_at: DateTime<Utc>,
    pub acceptance_deadline: DateTime<Utc>,

    pub party_a_accepted: bool,
    pub party_b_accepted: bool,

    /// Challenges filed against this settlement, in filing order
    pub challenges: Vec<ChallengeRef>,

    /// External dispute id set when the settlement is contested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispute_id: Option<String>,

    /// Id of the reversal settlement, set when reversed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reversal_settlement_id: Option<String>,

    pub status: SettlementStatus,
}

/// Inputs to a settlement proposal, validated before any record exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDraft {
    pub intent_hash_a: String,
    pub intent_hash_b: String,
    pub party_a: String,
    pub party_b: String,
    pub reasoning: String,
    pub proposed_terms: BTreeMap<String, serde_json::Value>,
    pub facilitation_fee: f64,
    pub facilitation_fee_percent: f64,
    pub generation_integrity_hash: String,
    pub acceptance_window_hours: i64,
}

impl SettlementDraft {
    /// Structural validation; nothing is mutated on rejection.
    pub fn validate(&self) -> Result<(), SettlementError> {
        if self.intent_hash_a.trim().is_empty() || self.intent_hash_b.trim().is_empty() {
            return Err(SettlementError::Invalid("intent hashes must be non-empty".into()));
        }
        if self.intent_hash_a == self.intent_hash_b {
            return Err(SettlementError::Invalid(
                "a settlement must join two distinct intents".into(),
            ));
        }
        if self.party_a.trim().is_empty() || self.party_b.trim().is_empty() {
            return Err(SettlementError::Invalid("party ids must be non-empty".into()));
        }
        if self.proposed_terms.is_empty() {
            return Err(SettlementError::Invalid("proposed terms must be non-empty".into()));
        }
        if self.facilitation_fee <= 0.0 {
            return Err(SettlementError::Invalid("facilitation fee must be positive".into()));
        }
        if self.facilitation_fee_percent <= 0.0 || self.facilitation_fee_percent > 100.0 {
            return Err(SettlementError::Invalid(
                "fee percent must be in (0, 100]".into(),
            ));
        }
        if self.acceptance_window_hours <= 0 {
            return Err(SettlementError::Invalid(
                "acceptance window must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Deterministic digest of a terms map, hex-encoded SHA-256 of its
/// canonical JSON encoding. BTreeMap keys give a stable order.
pub fn hash_terms(terms: &BTreeMap<String, serde_json::Value>) -> String {
    let bytes = serde_json::to_vec(terms).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

impl Settlement {
    pub fn from_draft(id: String, mediator_id: String, draft: SettlementDraft) -> Result<Self, SettlementError> {
        draft.validate()?;
        let now = Utc::now();
        let terms_hash = hash_terms(&draft.proposed_terms);
        Ok(Settlement {
            id,
            intent_hash_a: draft.intent_hash_a,
            intent_hash_b: draft.intent_hash_b,
            party_a: draft.party_a,
            party_b: draft.party_b,
            reasoning: draft.reasoning,
            proposed_terms: draft.proposed_terms,
            facilitation_fee: draft.facilitation_fee,
            facilitation_fee_percent: draft.facilitation_fee_percent,
            generation_integrity_hash: draft.generation_integrity_hash,
            terms_hash,
            mediator_id,
            created_at: now,
            acceptance_deadline: now + Duration::hours(draft.acceptance_window_hours),
            party_a_accepted: false,
            party_b_accepted: false,
            challenges: Vec::new(),
            dispute_id: None,
            reversal_settlement_id: None,
            status: SettlementStatus::Proposed,
        })
    }

    /// Total settlement value implied by the fee and fee percentage.
    pub fn computed_value(&self) -> f64 {
        if self.facilitation_fee_percent <= 0.0 {
            return 0.0;
        }
        self.facilitation_fee / (self.facilitation_fee_percent / 100.0)
    }

    pub fn both_accepted(&self) -> bool {
        self.party_a_accepted && self.party_b_accepted
    }

    pub fn has_upheld_challenge(&self) -> bool {
        self.challenges.iter().any(|c| c.status == ChallengeStatus::Upheld)
    }

    /// Apply a status transition, rejecting anything outside the table.
    pub fn transition_to(&mut self, next: SettlementStatus) -> Result<(), SettlementError> {
        if !self.status.can_transition_to(next) {
            return Err(SettlementError::InvalidTransition { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }

    /// Record one party's acceptance. Acceptance is monotonic: once set
    /// it never clears. The actor must be the named party.
    pub fn record_acceptance(&mut self, party: Party, actor: &str) -> Result<(), SettlementError> {
        if self.status.is_terminal() || self.status == SettlementStatus::Closed {
            return Err(SettlementError::Immutable(self.id.clone()));
        }
        let expected = match party {
            Party::A => &self.party_a,
            Party::B => &self.party_b,
        };
        if actor != expected {
            return Err(SettlementError::NotAParty {
                actor: actor.to_string(),
                settlement_id: self.id.clone(),
            });
        }
        match party {
            Party::A => self.party_a_accepted = true,
            Party::B => self.party_b_accepted = true,
        }
        Ok(())
    }

    /// Replace the proposed terms. Only legal while still Proposed and
    /// before bilateral acceptance; re-commits the terms hash.
    pub fn amend_terms(
        &mut self,
        terms: BTreeMap<String, serde_json::Value>,
    ) -> Result<(), SettlementError> {
        if self.status != SettlementStatus::Proposed || self.both_accepted() {
            return Err(SettlementError::Immutable(self.id.clone()));
        }
        if terms.is_empty() {
            return Err(SettlementError::Invalid("proposed terms must be non-empty".into()));
        }
        self.terms_hash = hash_terms(&terms);
        self.proposed_terms = terms;
        Ok(())
    }

    /// Attach or update a challenge reference. Updating an existing
    /// reference keeps filing order.
    pub fn attach_challenge(&mut self, challenge: ChallengeRef) {
        if let Some(existing) = self
            .challenges
            .iter_mut()
            .find(|c| c.challenge_id == challenge.challenge_id)
        {
            existing.status = challenge.status;
        } else {
            self.challenges.push(challenge);
        }
    }
}
