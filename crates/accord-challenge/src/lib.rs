//! Contradiction detection and challenge management.
//!
//! The detector asks the reasoning oracle whether a foreign settlement
//! violates the constraints in its source intents; the manager files
//! signed challenges on the ledger, polls for resolutions, and routes
//! the outcomes into reputation.

pub mod detector;
pub mod manager;

pub use detector::{ChallengeConfig, ChallengeDetector};
pub use manager::{ChallengeManager, ChallengeManagerError, ChallengeStats};
