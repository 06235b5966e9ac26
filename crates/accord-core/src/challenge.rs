// Challenges: formal contests that a settlement contradicts its
// source intents. Grounded on the ledger; this node keeps a local
// record only while a challenge it filed is unresolved.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::ContradictionAnalysis;
use crate::settlement::ChallengeStatus;

#[derive(Debug, Error)]
pub enum ChallengeError {
    #[error("challenge already filed for settlement {0}")]
    Duplicate(String),

    #[error("challenge not found: {0}")]
    NotFound(String),

    #[error("challenge {0} is already resolved")]
    AlreadyResolved(String),

    #[error("cannot challenge own settlement {0}")]
    OwnSettlement(String),

    #[error("analysis does not justify a challenge: {0}")]
    BelowThreshold(String),
}

/// A challenge this node has filed against a foreign settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,

    /// Settlement being contested
    pub settlement_id: String,

    /// Mediator that proposed the contested settlement
    pub challenged_mediator_id: String,

    /// Mediator that filed the challenge (this node)
    pub challenger_id: String,

    /// The analysis that justified filing
    pub analysis: ContradictionAnalysis,

    pub submitted_at: DateTime<Utc>,

    pub status: ChallengeStatus,
}

impl Challenge {
    /// Apply a resolution from the ledger. Resolutions are terminal.
    pub fn resolve(&mut self, status: ChallengeStatus) -> Result<(), ChallengeError> {
        if self.status.is_terminal() {
            return Err(ChallengeError::AlreadyResolved(self.id.clone()));
        }
        self.status = status;
        Ok(())
    }
}
