//! Core data model for the ACCORD mediator node: settlements and their
//! lifecycle state machine, verification records, challenges, and the
//! flat JSON record store shared by all managers.

pub mod analysis;
pub mod challenge;
pub mod intent;
pub mod settlement;
pub mod store;
pub mod verification;

pub use analysis::{ContradictionAnalysis, ContradictionSeverity, HarmedParty};
pub use challenge::{Challenge, ChallengeError};
pub use intent::Intent;
pub use settlement::{
    hash_terms, ChallengeRef, ChallengeStatus, Party, Settlement, SettlementDraft,
    SettlementError, SettlementStatus,
};
pub use store::{FileStore, Record, StoreError};
pub use verification::{
    VerificationError, VerificationRecord, VerificationRequest, VerificationResponse,
    VerificationStatus,
};
