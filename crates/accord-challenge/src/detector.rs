// Contradiction detection: ask the oracle whether a settlement's terms
// violate the constraints stated in its source intents, and decide
// whether the finding is strong enough to stake a challenge on.

use std::sync::Arc;

use log::warn;
use serde::{Deserialize, Serialize};

use accord_core::{ContradictionAnalysis, Intent, Settlement};
use accord_oracle::ReasoningOracle;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChallengeConfig {
    /// Minimum oracle confidence before a finding becomes a challenge
    pub min_confidence_to_challenge: f64,

    /// How many recent settlements each scan sweep pulls
    pub scan_limit: usize,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        ChallengeConfig { min_confidence_to_challenge: 0.8, scan_limit: 20 }
    }
}

pub struct ChallengeDetector {
    config: ChallengeConfig,
    oracle: Arc<dyn ReasoningOracle>,
}

impl ChallengeDetector {
    pub fn new(config: ChallengeConfig, oracle: Arc<dyn ReasoningOracle>) -> Self {
        ChallengeDetector { config, oracle }
    }

    /// Check a settlement against both intents. Oracle degradation is
    /// treated as "no finding", never as an error: a node that cannot
    /// analyze must not file on noise.
    pub async fn analyze_settlement(
        &self,
        settlement: &Settlement,
        intent_a: &Intent,
        intent_b: &Intent,
    ) -> Option<ContradictionAnalysis> {
        match self
            .oracle
            .analyze_contradiction(settlement, intent_a, intent_b)
            .await
        {
            Ok(finding) => finding,
            Err(e) => {
                warn!(
                    "contradiction analysis failed for settlement {}: {}",
                    settlement.id, e
                );
                None
            }
        }
    }

    /// A finding justifies a challenge iff it claims a contradiction
    /// at or above the configured confidence floor.
    pub fn should_challenge(&self, analysis: &ContradictionAnalysis) -> bool {
        analysis.has_contradiction
            && analysis.confidence >= self.config.min_confidence_to_challenge
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accord_core::{ContradictionSeverity, HarmedParty};
    use accord_oracle::{OracleError, SettlementAssessment};
    use async_trait::async_trait;

    struct ScriptedOracle {
        finding: Option<ContradictionAnalysis>,
        fail: bool,
    }

    #[async_trait]
    impl ReasoningOracle for ScriptedOracle {
        async fn assess_settlement(
            &self,
            _settlement: &Settlement,
            _request: &accord_core::VerificationRequest,
        ) -> Result<SettlementAssessment, OracleError> {
            Err(OracleError::Unreachable("not under test".into()))
        }

        async fn analyze_contradiction(
            &self,
            _settlement: &Settlement,
            _intent_a: &Intent,
            _intent_b: &Intent,
        ) -> Result<Option<ContradictionAnalysis>, OracleError> {
            if self.fail {
                return Err(OracleError::Malformed("unstructured reply".into()));
            }
            Ok(self.finding.clone())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, OracleError> {
            Ok(vec![0.0; 4])
        }
    }

    fn analysis(confidence: f64) -> ContradictionAnalysis {
        ContradictionAnalysis {
            has_contradiction: true,
            confidence,
            violated_constraints: vec!["delivery <= 14 days".into()],
            proof: "terms promise 30-day delivery".into(),
            supporting_evidence: vec![],
            harmed_party: HarmedParty::PartyB,
            severity: ContradictionSeverity::Moderate,
        }
    }

    fn detector_with_threshold(threshold: f64) -> ChallengeDetector {
        ChallengeDetector::new(
            ChallengeConfig { min_confidence_to_challenge: threshold, ..Default::default() },
            Arc::new(ScriptedOracle { finding: None, fail: false }),
        )
    }

    #[test]
    fn test_should_challenge_boundaries() {
        for threshold in [0.7, 0.8, 0.9] {
            let detector = detector_with_threshold(threshold);
            assert!(
                !detector.should_challenge(&analysis(threshold - 0.001)),
                "below {threshold}"
            );
            assert!(detector.should_challenge(&analysis(threshold)), "at {threshold}");
            assert!(
                detector.should_challenge(&analysis(threshold + 0.001)),
                "above {threshold}"
            );
        }
    }

    #[test]
    fn test_no_contradiction_never_challenges() {
        let detector = detector_with_threshold(0.5);
        let mut finding = analysis(0.99);
        finding.has_contradiction = false;
        assert!(!detector.should_challenge(&finding));
    }

    fn settlement() -> Settlement {
        use std::collections::BTreeMap;
        let mut terms = BTreeMap::new();
        terms.insert("delivery".to_string(), serde_json::json!("30 days"));
        let draft = accord_core::SettlementDraft {
            intent_hash_a: "a".repeat(64),
            intent_hash_b: "b".repeat(64),
            party_a: "pa".into(),
            party_b: "pb".into(),
            reasoning: String::new(),
            proposed_terms: terms,
            facilitation_fee: 10.0,
            facilitation_fee_percent: 1.0,
            generation_integrity_hash: String::new(),
            acceptance_window_hours: 24,
        };
        Settlement::from_draft("stl-1".into(), "foreign".into(), draft).unwrap()
    }

    fn intent(hash: &str, owner: &str) -> Intent {
        Intent {
            hash: hash.into(),
            owner_id: owner.into(),
            description: "deliver within two weeks".into(),
            constraints: vec!["delivery <= 14 days".into()],
            declared_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_oracle_failure_is_no_finding() {
        let detector = ChallengeDetector::new(
            ChallengeConfig::default(),
            Arc::new(ScriptedOracle { finding: Some(analysis(0.95)), fail: true }),
        );
        let found = detector
            .analyze_settlement(&settlement(), &intent("a", "pa"), &intent("b", "pb"))
            .await;
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_analysis_passes_through_finding() {
        let detector = ChallengeDetector::new(
            ChallengeConfig::default(),
            Arc::new(ScriptedOracle { finding: Some(analysis(0.95)), fail: false }),
        );
        let found = detector
            .analyze_settlement(&settlement(), &intent("a", "pa"), &intent("b", "pb"))
            .await
            .unwrap();
        assert!(found.has_contradiction);
        assert_eq!(found.confidence, 0.95);
    }
}
