//! Semantic consensus verification for high-value settlements: quorum
//! sampling, request distribution, response collection, equivalence
//! scoring, and the consensus decision itself.

pub mod quorum;
pub mod semantic;
pub mod verifier;

pub use quorum::{select_verifiers, QuorumWeighting};
pub use semantic::{check_semantic_equivalence, cosine_similarity, EquivalenceResult};
pub use verifier::{
    SemanticConsensusVerifier, VerificationConfig, VerificationStats, VerifierError,
    GENERATION_FAILURE_MARKER,
};
