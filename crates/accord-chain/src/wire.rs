// Wire formats for the chain service. POST bodies wrap their payload
// in a single named field, matching the protocol's envelope style.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accord_core::{
    ChallengeStatus, ContradictionAnalysis, VerificationRequest, VerificationResponse,
};

/// Economic success-burn submitted on settlement closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRequest {
    pub settlement_id: String,
    pub mediator_id: String,
    /// Burn amount, proportional to settlement value
    pub amount: f64,
}

/// Payout submitted after the burn step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub settlement_id: String,
    pub mediator_id: String,
    pub amount: f64,
}

/// One active mediator as reported by the chain service, with the
/// ledger's view of its weight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediatorInfo {
    pub id: String,
    pub weight: f64,
}

/// A challenge as filed on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeFiling {
    pub settlement_id: String,
    pub challenger_id: String,
    pub analysis: ContradictionAnalysis,
    pub submitted_at: DateTime<Utc>,
    pub signature: String,
}

/// Ledger acknowledgement of a filed challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeAccepted {
    pub challenge_id: String,
}

/// Current resolution state of a challenge on the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResolution {
    pub challenge_id: String,
    pub status: ChallengeStatus,
}

/// `POST /verifications` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequestEnvelope {
    pub request: VerificationRequest,
}

/// `POST /verifications/{settlementId}/responses` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResponseEnvelope {
    pub response: VerificationResponse,
}

/// `POST /challenges` envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeEnvelope {
    pub challenge: ChallengeFiling,
}
