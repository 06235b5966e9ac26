//! Chain-service integration: the `ChainService` trait every manager
//! programs against, its HTTP implementation, the wire envelopes, and
//! node identity signing.

pub mod client;
pub mod signing;
pub mod wire;

pub use client::{ChainError, ChainService, HttpChainClient};
pub use signing::{NodeSigner, SigningError};
pub use wire::{
    BurnRequest, ChallengeAccepted, ChallengeEnvelope, ChallengeFiling, ChallengeResolution,
    MediatorInfo, PayoutRequest, VerificationRequestEnvelope, VerificationResponseEnvelope,
};
