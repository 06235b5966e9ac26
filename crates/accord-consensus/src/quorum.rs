// Quorum selection: a deterministic weighted reservoir sample (the
// A-Res exponential-key scheme) seeded from the settlement id, so two
// calls for the same settlement pick the same verifiers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use accord_chain::MediatorInfo;

/// Whether candidates are sampled uniformly or biased by ledger weight.
/// Uniform is the default until reputation-weighted selection is
/// confirmed as protocol behavior.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuorumWeighting {
    #[default]
    Uniform,
    Reputation,
}

/// Weights below this floor still get a sliver of probability so a
/// fresh mediator is not unselectable in weighted mode.
const MIN_WEIGHT: f64 = 1e-6;

fn seed_from(source: &str) -> u64 {
    let digest = Sha256::digest(source.as_bytes());
    u64::from_le_bytes(digest[..8].try_into().unwrap_or_default())
}

/// Sample up to `count` distinct verifier ids from `candidates`,
/// excluding the ids in `exclude`. Returns
/// `min(count, |eligible candidates|)` ids; never more, never a
/// duplicate, never an excluded id.
pub fn select_verifiers(
    candidates: &[MediatorInfo],
    count: usize,
    exclude: &[&str],
    weighting: QuorumWeighting,
    seed_source: &str,
) -> Vec<String> {
    let mut rng = StdRng::seed_from_u64(seed_from(seed_source));

    // Exponential keys: key = ln(u) / w; the k largest keys win.
    // Uniform mode fixes w = 1 for everyone.
    let mut keyed: Vec<(f64, &str)> = candidates
        .iter()
        .filter(|c| !exclude.contains(&c.id.as_str()))
        .map(|c| {
            let weight = match weighting {
                QuorumWeighting::Uniform => 1.0,
                QuorumWeighting::Reputation => c.weight.max(MIN_WEIGHT),
            };
            let u: f64 = rng.gen_range(f64::EPSILON..1.0);
            (u.ln() / weight, c.id.as_str())
        })
        .collect();

    // Ties (practically impossible with float keys) break on id so the
    // result stays deterministic either way.
    keyed.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });

    keyed
        .into_iter()
        .take(count)
        .map(|(_, id)| id.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mediators(n: usize) -> Vec<MediatorInfo> {
        (0..n)
            .map(|i| MediatorInfo { id: format!("m{i}"), weight: 1.0 + i as f64 })
            .collect()
    }

    #[test]
    fn test_excludes_and_count() {
        let candidates = mediators(10);
        let selected = select_verifiers(
            &candidates,
            5,
            &["m0", "m1"],
            QuorumWeighting::Uniform,
            "stl-1",
        );
        assert_eq!(selected.len(), 5);
        assert!(!selected.contains(&"m0".to_string()));
        assert!(!selected.contains(&"m1".to_string()));
    }

    #[test]
    fn test_count_capped_by_candidates() {
        let candidates = mediators(3);
        let selected =
            select_verifiers(&candidates, 5, &["m0"], QuorumWeighting::Uniform, "stl-1");
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn test_no_duplicates() {
        let candidates = mediators(20);
        let selected =
            select_verifiers(&candidates, 10, &[], QuorumWeighting::Uniform, "stl-x");
        let mut unique = selected.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), selected.len());
    }

    #[test]
    fn test_deterministic_per_seed() {
        let candidates = mediators(15);
        let a = select_verifiers(&candidates, 5, &[], QuorumWeighting::Uniform, "stl-1");
        let b = select_verifiers(&candidates, 5, &[], QuorumWeighting::Uniform, "stl-1");
        assert_eq!(a, b);

        let c = select_verifiers(&candidates, 5, &[], QuorumWeighting::Uniform, "stl-2");
        // Different seeds almost surely pick a different quorum; both
        // must still be valid samples.
        assert_eq!(c.len(), 5);
    }

    #[test]
    fn test_weighted_mode_prefers_heavy_candidates() {
        // One candidate with overwhelming weight should appear in
        // essentially every sampled quorum of size 1.
        let mut candidates = mediators(10);
        candidates.push(MediatorInfo { id: "heavy".into(), weight: 1e9 });
        let hits = (0..100)
            .filter(|i| {
                select_verifiers(
                    &candidates,
                    1,
                    &[],
                    QuorumWeighting::Reputation,
                    &format!("seed-{i}"),
                )
                .contains(&"heavy".to_string())
            })
            .count();
        assert!(hits > 90, "heavy candidate selected only {hits}/100 times");
    }

    #[test]
    fn test_zero_weight_still_eligible() {
        let candidates = vec![MediatorInfo { id: "only".into(), weight: 0.0 }];
        let selected =
            select_verifiers(&candidates, 1, &[], QuorumWeighting::Reputation, "s");
        assert_eq!(selected, vec!["only".to_string()]);
    }
}
