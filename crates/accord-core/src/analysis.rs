// Contradiction analysis output. Ephemeral: never persisted on its
// own, only embedded in the challenge it justifies.

use serde::{Deserialize, Serialize};

/// Severity tier of a detected contradiction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum ContradictionSeverity {
    Mild,
    Moderate,
    Severe,
}

/// Which party the contradiction harms.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HarmedParty {
    PartyA,
    PartyB,
    Both,
}

/// Result of checking a settlement's terms against its two source
/// intents. Produced by the reasoning oracle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContradictionAnalysis {
    pub has_contradiction: bool,

    /// Oracle confidence in the finding, in [0, 1]
    pub confidence: f64,

    /// Stated constraints the settlement violates
    pub violated_constraints: Vec<String>,

    /// Textual proof of the contradiction
    pub proof: String,

    /// Paraphrase evidence supporting the proof
    pub supporting_evidence: Vec<String>,

    pub harmed_party: HarmedParty,

    pub severity: ContradictionSeverity,
}
